//! Ingestion loop.
//!
//! Reads `key value clock` records one line at a time from any buffered
//! async source (stdin in production) and folds them into the collector.
//! Malformed lines are counted and dropped.

use crate::collector::Collector;
use crate::core::Result;
use crate::monitoring::SenderStats;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Consume `reader` until end of input.
///
/// Lines that are not valid UTF-8 are decoded lossily rather than ending
/// the stream. A read error ends ingestion and is returned.
pub async fn run<R>(mut reader: R, collector: &Collector, stats: &SenderStats) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::with_capacity(256);

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            tracing::debug!("end of input");
            return Ok(());
        }

        let line = String::from_utf8_lossy(&raw);
        tracing::trace!(line = %line.trim_end(), "input");

        let accepted = collector.ingest_line(&line).is_some();
        stats.record_line(accepted);
    }
}
