//! TCP transport to the collector.
//!
//! One connection per frame: connect with a bounded timeout, write the whole
//! frame, read the framed reply, close. The write and the read share a
//! single deadline covering the exchange.

use crate::core::config::SenderConfig;
use crate::core::{Result, TrapperError};
use crate::protocol::{decoder, Packet};
use serde::Deserialize;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Timeouts applied to every send.
#[derive(Debug, Clone, Copy)]
pub struct SenderOptions {
    pub connect_timeout: Duration,
    pub exchange_timeout: Duration,
}

impl Default for SenderOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            exchange_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SenderConfig> for SenderOptions {
    fn from(config: &SenderConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            exchange_timeout: config.exchange_timeout,
        }
    }
}

/// Send a packet's frame to `addr` and return the decoded reply body.
pub async fn send(addr: &str, packet: &Packet, options: &SenderOptions) -> Result<Vec<u8>> {
    send_frame(addr, packet.as_bytes(), options).await
}

/// Send an already encoded frame to `addr` and return the decoded reply body.
///
/// An empty frame fails with [`TrapperError::EmptyPacket`] before any
/// connection is attempted.
pub async fn send_frame(addr: &str, frame: &[u8], options: &SenderOptions) -> Result<Vec<u8>> {
    if frame.is_empty() {
        return Err(TrapperError::EmptyPacket);
    }

    let mut stream = connect(addr, options.connect_timeout).await?;
    tracing::trace!(addr, bytes = frame.len(), "connected to collector");

    // The stream is dropped, and the socket closed, on every return path.
    match timeout(options.exchange_timeout, exchange(&mut stream, frame)).await {
        Ok(result) => result,
        Err(_) => Err(TrapperError::Timeout {
            timeout_ms: duration_ms(options.exchange_timeout),
        }),
    }
}

async fn connect(addr: &str, connect_timeout: Duration) -> Result<TcpStream> {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(TrapperError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(TrapperError::Connect {
            addr: addr.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {}ms", duration_ms(connect_timeout)),
            ),
        }),
    }
}

async fn exchange(stream: &mut TcpStream, frame: &[u8]) -> Result<Vec<u8>> {
    stream.write_all(frame).await?;
    stream.flush().await?;
    decoder::receive(stream).await
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Collector reply, e.g. `{"response":"success","info":"processed: 3; failed: 0; ..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SenderResponse {
    pub response: String,
    #[serde(default)]
    pub info: Option<String>,
}

impl SenderResponse {
    /// Parse a reply body; returns `None` when it is not the expected JSON.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    pub fn is_success(&self) -> bool {
        self.response == "success"
    }
}
