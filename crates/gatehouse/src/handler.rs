//! Per-connection handler: WebSocket upgrade, then request → response.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   1. Upgrade the TCP stream to a WebSocket
//!   2. Loop: receive a frame → decode a `Request` → ask the
//!      authenticator → send one `Response`
//!   3. Stop on close, on a socket error, or after the idle timeout

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use gatehouse_protocol::{Codec, Request, Response, Status};
use gatehouse_session::{Authenticator, Token, groups};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

use crate::GatehouseError;
use crate::server::ServerState;

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<A, C>(
    stream: TcpStream,
    peer: SocketAddr,
    conn_id: u64,
    state: Arc<ServerState<A, C>>,
) -> Result<(), GatehouseError>
where
    A: Authenticator,
    C: Codec,
{
    let mut ws = tokio_tungstenite::accept_async(stream).await?;
    tracing::debug!(conn_id, %peer, "accepted WebSocket connection");

    loop {
        let msg = match tokio::time::timeout(state.idle_timeout, ws.next()).await {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                tracing::debug!(conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Ok(None) => {
                tracing::debug!(conn_id, "connection closed");
                break;
            }
            Err(_) => {
                tracing::debug!(conn_id, "connection idle, closing");
                let _ = ws.close(None).await;
                break;
            }
        };

        // Answer in the same frame type the caller used.
        let (data, as_text) = match msg {
            Message::Text(text) => (text.as_str().as_bytes().to_vec(), true),
            Message::Binary(data) => (data.to_vec(), false),
            Message::Close(_) => break,
            _ => continue, // ping/pong are answered by tungstenite
        };

        let response = match state.codec.decode::<Request>(&data) {
            Ok(request) => {
                let route = request.route();
                let response = respond(&state.auth, request).await;
                tracing::debug!(conn_id, route, status = %response.status, "request handled");
                response
            }
            Err(e) => {
                tracing::debug!(conn_id, error = %e, "failed to decode request");
                Response::failure(Status::BAD_REQUEST, "Malformed request")
            }
        };

        let bytes = state.codec.encode(&response)?;
        let reply = if as_text {
            match String::from_utf8(bytes) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => Message::Binary(e.into_bytes().into()),
            }
        } else {
            Message::Binary(bytes.into())
        };
        ws.send(reply).await?;
    }

    Ok(())
}

/// Runs one request against the authenticator and builds the reply.
///
/// Never fails: every engine error becomes a status and a detail the
/// caller can show.
pub(crate) async fn respond<A: Authenticator>(auth: &A, request: Request) -> Response {
    let result = match request {
        Request::Token(req) => {
            let required = req.groups_needed.map(groups);
            auth.authenticate(&req.username, &req.password, required.as_ref())
                .await
                .map(|token| Response::token(token.into_string()))
        }
        Request::Check(req) => {
            let required = req.groups_needed.map(groups);
            auth.validate(&Token::new(req.token), required.as_ref())
                .await
                .map(|token| Response::token(token.into_string()))
        }
        Request::Logout(req) => auth
            .logout(&Token::new(req.token))
            .await
            .map(|()| Response::ok()),
    };

    result.unwrap_or_else(|e| Response::failure(e.status(), e.detail()))
}
