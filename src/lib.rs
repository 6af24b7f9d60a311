//! Trapper - batching metric sender for the ZBXD trapper protocol.
//!
//! Trapper reads `key value clock` lines from a local producer, batches
//! them, and pushes each batch to a monitoring collector as one framed
//! `sender data` request.
//!
//! # Features
//!
//! - **ZBXD framing**: 13-byte header, JSON body, optional zlib compression
//! - **Fixed-interval flushing**: ingestion and sending on independent timelines
//! - **Peak aggregation**: one recurring key is reduced to its maximum per cycle
//! - **Best effort**: malformed input is skipped, failed batches are dropped
//!
//! # Architecture
//!
//! - `protocol`: frame header, packet encoder and response decoder
//! - `transport`: timeout-bounded TCP exchange with the collector
//! - `collector`: shared batch state and the flush loop
//! - `ingest`: line-oriented input loop
//! - `core`: domain types, configuration and errors
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use trapper_lib::core::Config;
//! use trapper_lib::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let app = Application::new(config)?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod application;
pub mod cli;
pub mod collector;
pub mod core;
pub mod ingest;
pub mod monitoring;
pub mod protocol;
pub mod transport;

// Re-export core types for convenience
pub use crate::application::Application;
pub use crate::core::{Config, Result};
