//! Core domain types for the sender.
//!
//! A [`Metric`] is the unit the collector receives; a [`Reading`] is one
//! parsed `key value clock` line before a host name is attached to it.

use crate::core::{Result, TrapperError};
use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds.
pub type Clock = i64;

/// Clock attached to a single metric.
///
/// Integer clocks go out as JSON numbers. Anything else the producer wrote
/// in the clock column is passed through as text for the collector to judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(Clock),
    Raw(String),
}

impl Timestamp {
    /// Interpret a clock token from an input line.
    pub fn parse(token: &str) -> Self {
        match token.parse::<Clock>() {
            Ok(secs) => Self::Unix(secs),
            Err(_) => Self::Raw(token.to_string()),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::Unix(0)
    }
}


/// A single metric value as sent to the collector.
///
/// The value is always carried as text; the protocol does not care about
/// its semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Host the metric belongs to
    pub host: String,
    /// Item key
    pub key: String,
    /// Value as text
    pub value: String,
    /// When the reading was taken
    pub clock: Timestamp,
}

impl Metric {
    /// Create a new metric.
    pub fn new(
        host: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        clock: Timestamp,
    ) -> Self {
        Self {
            host: host.into(),
            key: key.into(),
            value: value.into(),
            clock,
        }
    }
}

/// One parsed input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub key: String,
    pub value: String,
    pub clock: Timestamp,
}

impl Reading {
    /// Parse a line of exactly three whitespace-separated fields.
    ///
    /// Any other field count yields [`TrapperError::MalformedInputLine`]. The
    /// clock is never a reason to drop a line.
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value), Some(clock), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(TrapperError::malformed(line.trim_end()));
        };

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            clock: Timestamp::parse(clock),
        })
    }

    /// Attach a host name, producing the metric that goes on the wire.
    pub fn into_metric(self, host: &str) -> Metric {
        Metric {
            host: host.to_string(),
            key: self.key,
            value: self.value,
            clock: self.clock,
        }
    }
}

/// Resolve the host name reported with every metric.
///
/// An explicit override wins; otherwise the operating system's host name,
/// and `localhost` only when that lookup fails.
pub fn resolve_hostname(override_name: Option<&str>) -> String {
    if let Some(name) = override_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    match hostname::get() {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        Ok(_) => "localhost".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "unable to read host name, using localhost");
            "localhost".to_string()
        },
    }
}
