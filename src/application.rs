//! Main application wiring.

use crate::collector::{Batch, Collector, Scheduler};
use crate::core::{resolve_hostname, Config, Result};
use crate::ingest;
use crate::monitoring::SenderStats;
use crate::transport::SenderOptions;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};

/// Main application struct that coordinates ingestion and flushing.
pub struct Application {
    /// Shared batch
    collector: Arc<Collector>,
    /// Outcome counters
    stats: Arc<SenderStats>,
    /// Host name reported with every metric
    host: String,
    /// Application configuration
    config: Config,
}

impl Application {
    /// Create a new Application with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let host = resolve_hostname(config.collector.host.as_deref());
        let batch = Batch::new(
            host.as_str(),
            config.collector.aggregate_key.as_str(),
            config.collector.aggregate_as.as_str(),
        );
        let collector = Arc::new(Collector::new(batch, config.sender.compress)?);

        Ok(Self {
            collector,
            stats: Arc::new(SenderStats::new()),
            host,
            config,
        })
    }

    /// Run against standard input until it closes.
    pub async fn run(self) -> Result<()> {
        self.run_with_input(BufReader::new(tokio::io::stdin())).await
    }

    /// Run against an arbitrary line source until it closes.
    ///
    /// The flush loop is torn down when input ends; a partial batch is not
    /// flushed.
    pub async fn run_with_input<R>(self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        tracing::info!(
            server = %self.config.sender.server,
            compress = self.config.sender.compress,
            host = %self.host,
            interval = ?self.config.collector.flush_interval,
            "starting sender"
        );

        let scheduler = Scheduler::new(
            Arc::clone(&self.collector),
            Arc::clone(&self.stats),
            &self.config.sender.server,
            SenderOptions::from(&self.config.sender),
            self.config.collector.flush_interval,
        )
        .spawn();

        let result = ingest::run(input, &self.collector, &self.stats).await;
        scheduler.abort();

        tracing::info!(stats = ?self.stats.snapshot(), "input closed, exiting");
        result
    }

    /// Get a reference to the outcome counters.
    pub fn stats(&self) -> &Arc<SenderStats> {
        &self.stats
    }
}
