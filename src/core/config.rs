//! Configuration management for the sender.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable overrides (through the CLI layer)
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{Result, TrapperError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default collector address.
pub const DEFAULT_SERVER: &str = "127.0.0.1:10051";

/// Complete configuration for the sender
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination and wire options
    pub sender: SenderConfig,
    /// Batching and aggregation
    pub collector: CollectorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Destination and wire configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Collector address as `host:port`
    pub server: String,
    /// Use zlib-compressed frames
    pub compress: bool,
    /// Bound on establishing the TCP connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Bound on the whole write-then-read exchange
    #[serde(with = "humantime_serde")]
    pub exchange_timeout: Duration,
}

/// Batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Time between flush cycles
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    /// Input key whose readings are folded into a single peak value
    pub aggregate_key: String,
    /// Key the peak value is reported under
    pub aggregate_as: String,
    /// Host name override; the OS host name is used when unset
    pub host: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Log file path; `stdout` or unset writes to standard output
    pub file: Option<PathBuf>,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            server: DEFAULT_SERVER.to_string(),
            compress: false,
            connect_timeout: Duration::from_secs(5),
            exchange_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            flush_interval: Duration::from_secs(10),
            aggregate_key: "temp.temp".to_string(),
            aggregate_as: "cpu.temp".to_string(),
            host: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let server = self.sender.server.trim();
        if server.is_empty() {
            return Err(TrapperError::config("sender.server must not be empty"));
        }
        match server.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {},
            _ => {
                return Err(TrapperError::config(format!(
                    "sender.server must be host:port, got '{}'",
                    server
                )));
            },
        }

        if self.sender.connect_timeout.is_zero() {
            return Err(TrapperError::config("sender.connect_timeout must be greater than 0"));
        }

        if self.sender.exchange_timeout.is_zero() {
            return Err(TrapperError::config("sender.exchange_timeout must be greater than 0"));
        }

        if self.collector.flush_interval.is_zero() {
            return Err(TrapperError::config("collector.flush_interval must be greater than 0"));
        }

        if self.collector.aggregate_key.trim().is_empty()
            || self.collector.aggregate_as.trim().is_empty()
        {
            return Err(TrapperError::config("aggregation keys must not be empty"));
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| TrapperError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set collector address
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.sender.server = server.into();
        self
    }

    /// Enable or disable frame compression
    pub fn compress(mut self, compress: bool) -> Self {
        self.config.sender.compress = compress;
        self
    }

    /// Set flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.collector.flush_interval = interval;
        self
    }

    /// Override the reported host name
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.collector.host = Some(host.into());
        self
    }

    /// Set log file
    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.config.logging.file = Some(path);
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
