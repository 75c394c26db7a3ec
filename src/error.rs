//! Error types for the feed client.
//!
//! Every fallible operation in the crate returns [`FeedError`]. Variants carry
//! enough structured context to tell a caller whether the failure belongs to
//! the handshake, the wire codec, the aggregation layer or the transport.
//!
//! ## Error Categories
//!
//! - **Handshake Errors**: the server did not switch protocols
//! - **Frame Construction Errors**: invalid control bits or oversized payloads at encode time
//! - **Protocol Errors**: the decoder stalled on frames it does not handle
//! - **Malformed Payloads**: a fully buffered frame did not contain JSON
//! - **Invalid Tickers**: a matching trade message lacked a numeric price or quantity
//! - **Connection / Transport Errors**: socket and TLS failures
//! - **Config Errors**: bad URLs, schemes or settings
//!
//! ## Recovery
//!
//! ```rust
//! use vwapfeed::FeedError;
//!
//! let error = FeedError::connection_failed("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for feed operations.
pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Main error type for feed operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FeedError {
    #[error("WebSocket handshake failed: {reason}")]
    Handshake { reason: String },

    #[error("Invalid frame: {reason}")]
    FrameConstruction { reason: String },

    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    #[error("Malformed frame payload ({length} bytes)")]
    MalformedPayload {
        length: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid ticker field '{field}': {details}")]
    InvalidTicker { field: String, details: String },

    #[error("Failed to connect to {target}")]
    Connection {
        target: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transport error during {operation}")]
    Transport {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

impl FeedError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Per-message errors are retryable in the sense that the stream can
    /// continue with the next frame.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Handshake { .. } => false,
            FeedError::FrameConstruction { .. } => false,
            FeedError::Protocol { .. } => false,
            FeedError::MalformedPayload { .. } => true,
            FeedError::InvalidTicker { .. } => true,
            FeedError::Connection { .. } => true,
            FeedError::Transport { .. } => true,
            FeedError::Config { .. } => false,
        }
    }

    /// Errors scoped to a single message. The stream itself is still usable.
    pub fn is_per_message(&self) -> bool {
        matches!(self, FeedError::MalformedPayload { .. } | FeedError::InvalidTicker { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FeedError::Handshake { .. } => vec![
                "Verify the feed URL points at a WebSocket endpoint",
                "Check that the server accepts the chat/superchat subprotocols",
                "Inspect the upgrade response at debug log level",
            ],
            FeedError::FrameConstruction { .. } => vec![
                "Use Frame::text for outbound payloads",
                "Keep fin and reserved bits at 0 or 1",
            ],
            FeedError::Protocol { .. } => vec![
                "Check whether the server sends control or short frames",
                "Raise max_stalled_reads if the feed is bursty",
                "Reconnect to resynchronise the frame boundary",
            ],
            FeedError::MalformedPayload { .. } => vec![
                "Inspect the raw payload at trace log level",
                "Confirm the channel delivers JSON text frames",
            ],
            FeedError::InvalidTicker { .. } => vec![
                "Check the configured price and quantity field names",
                "Verify the channel emits trade data",
            ],
            FeedError::Connection { .. } => vec![
                "Check network connectivity",
                "Verify host name and port",
                "Check TLS certificate trust store",
            ],
            FeedError::Transport { .. } => vec![
                "Reconnect to the feed",
                "Check for network interruptions",
            ],
            FeedError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Use a ws:// or wss:// URL with a host",
            ],
        }
    }

    /// Helper constructor for handshake failures.
    pub fn handshake_failed(reason: impl Into<String>) -> Self {
        FeedError::Handshake { reason: reason.into() }
    }

    /// Helper constructor for frame construction failures.
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        FeedError::FrameConstruction { reason: reason.into() }
    }

    /// Helper constructor for protocol violations seen by the decoder.
    pub fn protocol(reason: impl Into<String>) -> Self {
        FeedError::Protocol { reason: reason.into() }
    }

    /// Helper constructor for ticker field errors.
    pub fn invalid_ticker(field: impl Into<String>, details: impl Into<String>) -> Self {
        FeedError::InvalidTicker { field: field.into(), details: details.into() }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(target: impl Into<String>) -> Self {
        FeedError::Connection { target: target.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        target: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        FeedError::Connection { target: target.into(), source: Some(source) }
    }

    /// Helper constructor for transport I/O errors.
    pub fn transport(operation: impl Into<String>, source: std::io::Error) -> Self {
        FeedError::Transport { operation: operation.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        FeedError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::Transport { operation: "<unknown>".to_string(), source: err }
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::Config { reason: format!("invalid URL: {}", err) }
    }
}

impl From<serde_yaml_ng::Error> for FeedError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        FeedError::Config { reason: format!("invalid YAML: {}", err) }
    }
}
