//! Command-line interface for the sender.
//!
//! Reads `key value clock` lines on stdin and forwards them in batches:
//!
//! ```text
//! sensors-poller | trapper -s zabbix.internal:10051 -c -l /var/log/trapper.log
//! ```

use crate::core::{Config, ConfigBuilder, Result, TrapperError};
use crate::Application;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Batching metric sender for the ZBXD trapper protocol
#[derive(Parser, Debug)]
#[command(name = "trapper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Collector address (host:port) [default: 127.0.0.1:10051]
    #[arg(short = 's', long, env = "TRAPPER_SERVER")]
    pub server: Option<String>,

    /// Use the compressed protocol
    #[arg(short = 'c', long, env = "TRAPPER_COMPRESS")]
    pub compress: bool,

    /// Write log into this file ("stdout" for standard output)
    #[arg(short = 'l', long, env = "TRAPPER_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Host name reported with every metric
    #[arg(long, env = "TRAPPER_HOST")]
    pub host: Option<String>,

    /// Time between flushes, e.g. "10s" or "1m"
    #[arg(long, env = "TRAPPER_INTERVAL", value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Configuration file path (default: ~/.config/trapper/config.yaml)
    #[arg(long, env = "TRAPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "TRAPPER_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = match &self.config {
            Some(path) => Some(path.clone()),
            None => dirs::config_dir()
                .map(|d| d.join("trapper").join("config.yaml"))
                .filter(|p| p.exists()),
        };

        if let Some(path) = config_path {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    builder = builder.from_yaml(&content)?;
                    tracing::debug!("Loaded configuration from: {:?}", path);
                },
                Err(e) if self.config.is_some() => {
                    return Err(TrapperError::config(format!(
                        "Failed to read config file {:?}: {}",
                        path, e
                    )));
                },
                Err(_) => {
                    tracing::debug!("No config file found at {:?}, using defaults", path);
                },
            }
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(server) = &self.server {
            builder = builder.server(server.as_str());
        }
        if self.compress {
            builder = builder.compress(true);
        }
        if let Some(path) = &self.log_file {
            builder = builder.log_file(path.clone());
        }
        if let Some(host) = &self.host {
            builder = builder.host(host.as_str());
        }
        if let Some(interval) = self.interval {
            builder = builder.flush_interval(interval);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging.
    ///
    /// Failing to open the log file is fatal.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let log_level = if self.debug || config.debug {
            "debug"
        } else {
            config.logging.level.as_str()
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let file = match config.logging.file.as_deref() {
            Some(path) if path != Path::new("stdout") => Some(open_log_file(path)?),
            _ => None,
        };

        let registry = tracing_subscriber::registry().with(filter);
        let result = match file {
            Some(file) => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::sync::Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .try_init(),
            None => registry
                .with(tracing_subscriber::fmt::layer().with_target(false).compact())
                .try_init(),
        };

        result.map_err(|e| TrapperError::config(format!("Failed to initialize logging: {}", e)))
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TrapperError::config(format!("error opening file {:?}: {}", path, e)))
}

/// Execute the sender.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Server: {}", config.sender.server);
        println!("  Compress: {}", config.sender.compress);
        println!("  Flush interval: {:?}", config.collector.flush_interval);
        println!(
            "  Aggregate: {} -> {}",
            config.collector.aggregate_key, config.collector.aggregate_as
        );
        return Ok(());
    }

    Application::new(config)?.run().await
}
