//! Sender packet: the `sender data` request and its encoded frame.

use crate::core::{Clock, Metric, Result};
use crate::protocol::write_frame;
use bytes::{Bytes, BytesMut};
use serde::Serialize;

/// Request name the collector expects for pushed values.
pub const SENDER_REQUEST: &str = "sender data";

/// A batch of metrics plus the frame built from it.
///
/// The JSON payload is `{"request", "data", "clock"}` in that order. The
/// encoded frame is rebuilt on every [`Packet::add_metrics`] call and is
/// empty whenever the batch is.
#[derive(Debug, Serialize)]
pub struct Packet {
    request: &'static str,
    data: Vec<Metric>,
    clock: Clock,
    #[serde(skip)]
    compress: bool,
    #[serde(skip)]
    buf: BytesMut,
}

impl Packet {
    /// Create a packet and encode `data` right away.
    pub fn new(compress: bool, data: Vec<Metric>, clock: Clock) -> Result<Self> {
        let mut packet = Self {
            request: SENDER_REQUEST,
            data: Vec::new(),
            clock,
            compress,
            buf: BytesMut::new(),
        };
        packet.add_metrics(data, clock)?;
        Ok(packet)
    }

    /// Replace the batch and rebuild the frame.
    ///
    /// The previous frame is discarded before anything new is written; an
    /// empty batch leaves the frame empty.
    pub fn add_metrics(&mut self, data: Vec<Metric>, clock: Clock) -> Result<()> {
        self.data = data;
        self.clock = clock;
        self.buf.clear();

        if self.data.is_empty() {
            return Ok(());
        }

        let payload = serde_json::to_vec(&*self)?;
        write_frame(&mut self.buf, &payload, self.compress)
    }

    /// Encoded frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Owned copy of the frame, for handing off outside a lock.
    pub fn frame(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn data(&self) -> &[Metric] {
        &self.data
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }
}
