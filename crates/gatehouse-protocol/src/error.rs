//! Error types for the protocol layer.

/// Errors that can occur while turning requests and responses into bytes
/// and back.
///
/// A `ProtocolError` always means the *shape* of a message was wrong.
/// It never says anything about whether a user or token is valid; that
/// is the session layer's job.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `route`,
    /// missing fields or wrong field types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule, e.g. a response
    /// with a success status and no token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
