//! Unified error type for the Gatehouse server and client.

use gatehouse_protocol::ProtocolError;
use gatehouse_session::AuthError;
use tokio_tungstenite::tungstenite;

/// Top-level error that wraps every layer's errors.
///
/// The `#[from]` attributes generate `From` impls, so `?` lifts a
/// protocol, auth, socket or WebSocket error into this one type.
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    /// A request or response couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The engine refused the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Binding or accepting on the listening socket failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket handshake or a frame send/receive failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The peer closed the connection while a reply was outstanding.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}

impl GatehouseError {
    /// Folds this error into the engine's taxonomy.
    ///
    /// Anything that isn't already an [`AuthError`] means the auth server
    /// couldn't be reached or answered nonsense, which a caller should
    /// treat as a retryable outage rather than a rejected login.
    pub fn into_auth_error(self) -> AuthError {
        match self {
            GatehouseError::Auth(err) => err,
            other => AuthError::BackendUnavailable(other.to_string()),
        }
    }
}
