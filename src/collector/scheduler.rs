//! Periodic flush loop.

use crate::collector::{Collector, Flushed};
use crate::monitoring::SenderStats;
use crate::transport::{self, SenderOptions, SenderResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Drains the collector every `interval` and ships the frame.
///
/// Sends are spawned independently, so a slow collector never holds up the
/// next tick and two cycles' sends may overlap.
#[derive(Clone)]
pub struct Scheduler {
    collector: Arc<Collector>,
    stats: Arc<SenderStats>,
    server: Arc<str>,
    options: SenderOptions,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        collector: Arc<Collector>,
        stats: Arc<SenderStats>,
        server: &str,
        options: SenderOptions,
        interval: Duration,
    ) -> Self {
        Self {
            collector,
            stats,
            server: Arc::from(server),
            options,
            interval,
        }
    }

    /// Run the loop on its own task. It never returns on its own.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.flush_once();
        }
    }

    /// One flush cycle; returns the send task when there was something to send.
    pub fn flush_once(&self) -> Option<JoinHandle<()>> {
        let clock = chrono::Utc::now().timestamp();
        self.stats.record_flush();

        let flushed = match self.collector.flush(clock) {
            Ok(Some(flushed)) => flushed,
            Ok(None) => {
                tracing::trace!("nothing to flush");
                return None;
            },
            Err(e) => {
                self.stats.record_failure();
                tracing::warn!(error = %e, category = e.category(), "failed to encode batch");
                return None;
            },
        };

        tracing::debug!(metrics = flushed.metrics, bytes = flushed.frame.len(), "flushing batch");

        let server = Arc::clone(&self.server);
        let stats = Arc::clone(&self.stats);
        let options = self.options;
        Some(tokio::spawn(async move {
            deliver(&server, flushed, &options, &stats).await;
        }))
    }
}

async fn deliver(server: &str, flushed: Flushed, options: &SenderOptions, stats: &SenderStats) {
    match transport::send_frame(server, &flushed.frame, options).await {
        Ok(reply) => {
            stats.record_sent(flushed.metrics);
            match SenderResponse::parse(&reply) {
                Some(response) if response.is_success() => {
                    tracing::debug!(
                        server,
                        info = response.info.as_deref().unwrap_or_default(),
                        "collector accepted batch"
                    );
                },
                Some(response) => {
                    tracing::warn!(
                        server,
                        response = %response.response,
                        info = response.info.as_deref().unwrap_or_default(),
                        "collector rejected batch"
                    );
                },
                None => {
                    tracing::debug!(server, reply = %String::from_utf8_lossy(&reply), "collector reply");
                },
            }
        },
        Err(e) if e.is_empty_packet() => {
            tracing::debug!("empty packet, nothing sent");
        },
        Err(e) => {
            stats.record_failure();
            tracing::warn!(
                server,
                error = %e,
                category = e.category(),
                recoverable = e.is_recoverable(),
                metrics = flushed.metrics,
                "failed to send batch, dropping it"
            );
        },
    }
    tracing::debug!(stats = ?stats.snapshot(), "flush cycle finished");
}
