//! Error types for the hwlink transport

use thiserror::Error;

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while moving messages to and from a device
#[derive(Debug, Error)]
pub enum TransportError {
    /// Physical link failure (device unplugged, permission denied, ...)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report framing was violated (bad magic, truncated header)
    #[error("Framing error: {0}")]
    Framing(String),

    /// The link returned a report of the wrong size
    #[error("Link returned a {actual} byte report, expected {expected}")]
    ChunkSize { expected: usize, actual: usize },

    /// Payload does not fit the 32-bit length field
    #[error("Payload of {0} bytes exceeds the frame length field")]
    PayloadTooLarge(usize),

    /// Message payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Type tag not present in the message registry
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u16),

    /// end_session without a matching begin_session
    #[error("No session is open")]
    SessionNotOpen,
}

impl From<prost::DecodeError> for TransportError {
    fn from(e: prost::DecodeError) -> Self {
        TransportError::Decode(e.to_string())
    }
}
