use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrapperError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout error: operation took longer than {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Empty packet: nothing to send")]
    EmptyPacket,

    #[error("Message is using unsupported protocol")]
    UnsupportedProtocol,

    #[error("Message is using unsupported protocol version")]
    UnsupportedProtocolVersion,

    #[error("Message is missing header: got {received} of {expected} bytes")]
    TruncatedHeader { received: usize, expected: usize },

    #[error("Message size is shorter or longer than expected: got {actual}, expected {expected}")]
    TruncatedBody { expected: usize, actual: usize },

    #[error("Message size {size} exceeds the buffer len {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Message is longer than expected: declared {declared}, already read {received}")]
    MessageTooLong { declared: usize, received: usize },

    #[error("Unable to uncompress message: {0}")]
    Decompress(String),

    #[error("Uncompressed message size {actual} instead of expected {expected}")]
    DecompressedSizeMismatch { expected: usize, actual: usize },

    #[error("Malformed input line: {0}")]
    MalformedInputLine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for sender operations
pub type Result<T> = std::result::Result<T, TrapperError>;

impl TrapperError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new decompression error
    pub fn decompress<S: Into<String>>(msg: S) -> Self {
        Self::Decompress(msg.into())
    }

    /// Creates a new malformed-line error
    pub fn malformed<S: Into<String>>(line: S) -> Self {
        Self::MalformedInputLine(line.into())
    }

    /// Returns true if the next flush cycle could reasonably succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout { .. } | Self::Io(_) | Self::EmptyPacket)
    }

    /// Returns true for the "nothing to send" signal, which is not a failure
    pub fn is_empty_packet(&self) -> bool {
        matches!(self, Self::EmptyPacket)
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::EmptyPacket => "empty",
            Self::UnsupportedProtocol
            | Self::UnsupportedProtocolVersion
            | Self::TruncatedHeader { .. }
            | Self::TruncatedBody { .. }
            | Self::MessageTooLarge { .. }
            | Self::MessageTooLong { .. } => "protocol",
            Self::Decompress(_) | Self::DecompressedSizeMismatch { .. } => "compression",
            Self::MalformedInputLine(_) => "input",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
