//! Core domain models, configuration and errors.
//!
//! Everything else in the crate builds on the types defined here.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, LogLevel};
pub use error::{Result, TrapperError};
pub use types::{resolve_hostname, Clock, Metric, Reading, Timestamp};
