//! Outcome counters for the sender.
//!
//! Both timelines record into one shared [`SenderStats`]; the flush loop
//! logs a [`StatsSnapshot`] after every cycle.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Lock-free sender counters.
#[derive(Debug, Default)]
pub struct SenderStats {
    lines_read: AtomicU64,
    lines_dropped: AtomicU64,
    flushes: AtomicU64,
    metrics_sent: AtomicU64,
    send_failures: AtomicU64,
    /// Unix seconds of the last successful send, 0 when none yet.
    last_success: AtomicI64,
}

/// Point-in-time copy of [`SenderStats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub lines_read: u64,
    pub lines_dropped: u64,
    pub flushes: u64,
    pub metrics_sent: u64,
    pub send_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl SenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self, accepted: bool) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
        if !accepted {
            self.lines_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, metrics: usize) {
        self.metrics_sent.fetch_add(metrics as u64, Ordering::Relaxed);
        self.last_success
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last_success = match self.last_success.load(Ordering::Relaxed) {
            0 => None,
            secs => Utc.timestamp_opt(secs, 0).single(),
        };

        StatsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            metrics_sent: self.metrics_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            last_success,
        }
    }
}
