use thiserror::Error;

/// Main error type for hyperstream
///
/// Every variant carries owned strings so the same error value can be
/// logged, handed to the `on_error` callback, and folded into the
/// reconnection supervisor without losing information.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Underlying socket/stream failure (native or authenticated path)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Authenticated request returned a non-success status
    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    /// Keepalive window elapsed with no traffic
    #[error("Keepalive timed out: {0}")]
    Timeout(String),

    /// Missing or invalid configuration, never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation not allowed in the current connection state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl StreamError {
    /// True for errors that feed the disconnect/reconnect pathway
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::Transport(_) | StreamError::HttpStatus { .. } | StreamError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}

/// Result type for hyperstream operations
pub type Result<T> = std::result::Result<T, StreamError>;
