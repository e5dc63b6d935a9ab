//! Error types for message assembly and serialization.

use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed address in a sender or recipient field.
    #[error("Invalid {field} address: {reason}")]
    InvalidAddress {
        /// Header field the address was supplied for (`from`, `to`, `cc`).
        field: &'static str,
        /// What the parser rejected.
        reason: String,
    },

    /// Neither `To` nor `Cc` resolved to an address.
    #[error("No recipient specified")]
    NoRecipient,

    /// Attachment name that does not resolve to a file name.
    #[error("Invalid attachment name: {0:?}")]
    InvalidName(String),

    /// Non-text data offered as the message body.
    #[error("Unsupported body content type: {0}")]
    UnsupportedBodyType(String),

    /// Serialization attempted on a message without parts.
    #[error("Message has no body or attachments")]
    EmptyMessage,

    /// Part declared a transfer encoding the serializer cannot produce.
    #[error("Unsupported transfer encoding: {0}")]
    UnsupportedEncoding(String),

    /// Header name or value that cannot be written safely.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// I/O error from the output sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Creates an address error for the given header field.
    #[must_use]
    pub fn invalid_address(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            field,
            reason: reason.into(),
        }
    }
}
