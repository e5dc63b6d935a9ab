//! Error types for sending messages.

use std::io;

/// Result type alias for send operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Send error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable session: none was established, or its token has expired.
    #[error("Mail service not initialized")]
    NotInitialized,

    /// Message assembly or serialization failed.
    #[error("Message error: {0}")]
    Mime(#[from] mailpost_mime::Error),

    /// The transport rejected or failed to deliver the message.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps a transport failure.
    #[must_use]
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}
