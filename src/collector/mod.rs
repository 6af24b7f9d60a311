//! Shared batch state between the ingestion loop and the flush loop.
//!
//! All readings land in one [`Batch`] behind a single lock. The flush side
//! drains it, encodes the shared [`Packet`] and copies the frame out while
//! holding that lock; the network send happens after the lock is released.

pub mod scheduler;

use crate::core::{Clock, Metric, Reading, Result, Timestamp};
use crate::protocol::Packet;
use bytes::Bytes;
use parking_lot::Mutex;

pub use scheduler::Scheduler;

/// Peak value seen for the aggregated key since the last flush.
///
/// A `max` of zero means "no reading yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSlot {
    pub max: i64,
    pub clock: Timestamp,
}

impl AggregateSlot {
    pub fn is_empty(&self) -> bool {
        self.max <= 0
    }

    /// Keep `value` if it beats the current peak.
    fn offer(&mut self, value: i64, clock: Timestamp) {
        if value > self.max {
            self.max = value;
            self.clock = clock;
        }
    }
}

/// What happened to a single ingested reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// Appended to the pending sequence
    Queued,
    /// Folded into the aggregation slot (or ignored by it)
    Aggregated,
    /// Aggregated key with a non-integer value; dropped
    Ignored,
}

/// Pending metrics plus the aggregation slot.
///
/// The aggregated key never appears in `pending` until a drain synthesizes it.
#[derive(Debug)]
pub struct Batch {
    host: String,
    aggregate_key: String,
    aggregate_as: String,
    pending: Vec<Metric>,
    peak: AggregateSlot,
}

impl Batch {
    pub fn new(
        host: impl Into<String>,
        aggregate_key: impl Into<String>,
        aggregate_as: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            aggregate_key: aggregate_key.into(),
            aggregate_as: aggregate_as.into(),
            pending: Vec::new(),
            peak: AggregateSlot::default(),
        }
    }

    pub fn ingest(&mut self, reading: Reading) -> Ingested {
        if reading.key == self.aggregate_key {
            return match reading.value.parse::<i64>() {
                Ok(value) => {
                    self.peak.offer(value, reading.clock);
                    Ingested::Aggregated
                },
                Err(_) => Ingested::Ignored,
            };
        }

        self.pending.push(reading.into_metric(&self.host));
        Ingested::Queued
    }

    /// Move everything pending out, including a synthesized peak metric.
    ///
    /// Leaves the batch empty and the slot reset; capacity is retained.
    pub fn drain_and_reset(&mut self) -> Vec<Metric> {
        if !self.peak.is_empty() {
            let peak = std::mem::take(&mut self.peak);
            self.pending.push(Metric::new(
                self.host.as_str(),
                self.aggregate_as.as_str(),
                peak.max.to_string(),
                peak.clock,
            ));
        }
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> &[Metric] {
        &self.pending
    }

    pub fn peak(&self) -> AggregateSlot {
        self.peak.clone()
    }
}

/// A frame ready to go out, produced by one flush.
#[derive(Debug, Clone)]
pub struct Flushed {
    pub frame: Bytes,
    pub metrics: usize,
}

#[derive(Debug)]
struct State {
    batch: Batch,
    packet: Packet,
}

/// Lock-guarded batch and packet shared by both timelines.
#[derive(Debug)]
pub struct Collector {
    state: Mutex<State>,
}

impl Collector {
    pub fn new(batch: Batch, compress: bool) -> Result<Self> {
        let packet = Packet::new(compress, Vec::new(), 0)?;
        Ok(Self {
            state: Mutex::new(State { batch, packet }),
        })
    }

    /// Parse one input line and fold it into the batch.
    ///
    /// Returns `None` for a malformed line, which leaves the state untouched.
    pub fn ingest_line(&self, line: &str) -> Option<Ingested> {
        let reading = match Reading::parse(line) {
            Ok(reading) => reading,
            Err(e) => {
                tracing::trace!(error = %e, "dropping input line");
                return None;
            },
        };
        Some(self.state.lock().batch.ingest(reading))
    }

    /// Drain the batch, encode it at `clock` and copy the frame out.
    ///
    /// Returns `None` when there was nothing to send.
    pub fn flush(&self, clock: Clock) -> Result<Option<Flushed>> {
        let mut state = self.state.lock();
        let metrics = state.batch.drain_and_reset();
        if metrics.is_empty() {
            return Ok(None);
        }

        let count = metrics.len();
        state.packet.add_metrics(metrics, clock)?;
        Ok(Some(Flushed {
            frame: state.packet.frame(),
            metrics: count,
        }))
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().batch.pending().len()
    }

    pub fn peak(&self) -> AggregateSlot {
        self.state.lock().batch.peak()
    }
}
