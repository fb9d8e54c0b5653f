//! WebSocket client for a remote Gatehouse server.
//!
//! [`AuthClient`] implements [`Authenticator`], so code written against
//! an in-process [`AuthService`](gatehouse_session::AuthService) can be
//! pointed at a server instead without changes.

use futures_util::{SinkExt, StreamExt};
use gatehouse_protocol::{
    CheckRequest, Codec, JsonCodec, LogoutRequest, ProtocolError, Request, Response, Status,
    TokenRequest,
};
use gatehouse_session::{AuthError, Authenticator, Groups, Token};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::GatehouseError;

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The socket plus how many replies are owed to callers that gave up.
struct Connection {
    ws: ClientStream,
    unread: usize,
}

impl Connection {
    async fn read_reply(&mut self) -> Result<Vec<u8>, GatehouseError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().as_bytes().to_vec()),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(String::new, |f| f.reason.to_string());
                    return Err(GatehouseError::ConnectionClosed(reason));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(GatehouseError::ConnectionClosed("stream ended".into())),
            }
        }
    }
}

/// A connection to a Gatehouse server.
///
/// One request is in flight at a time; concurrent callers queue on the
/// socket lock so replies can't be handed to the wrong caller.
///
/// Calls may be cancelled (dropped mid-flight, or raced in a
/// `tokio::select!`). The reply to a cancelled request is read and
/// discarded before the next request goes out.
pub struct AuthClient<C = JsonCodec> {
    conn: Mutex<Connection>,
    codec: C,
}

impl AuthClient<JsonCodec> {
    /// Connects to `url`, e.g. `ws://127.0.0.1:8000`.
    pub async fn connect(url: &str) -> Result<Self, GatehouseError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(url, "connected to auth server");
        Ok(Self {
            conn: Mutex::new(Connection { ws, unread: 0 }),
            codec: JsonCodec,
        })
    }
}

impl<C: Codec> AuthClient<C> {
    /// Sends one request and waits for its reply.
    pub async fn send(&self, request: &Request) -> Result<Response, GatehouseError> {
        let bytes = self.codec.encode(request)?;

        let mut conn = self.conn.lock().await;
        if conn.unread > 0 {
            // A cancelled call may have queued its frame without flushing it.
            conn.ws.flush().await?;
            while conn.unread > 0 {
                conn.read_reply().await?;
                conn.unread -= 1;
                tracing::debug!("discarded reply to a cancelled request");
            }
        }

        // Counted once the frame is queued, so a cancelled flush or read
        // still has its reply drained by the next call.
        conn.ws.feed(Message::Binary(bytes.into())).await?;
        conn.unread += 1;
        conn.ws.flush().await?;
        let data = conn.read_reply().await?;
        conn.unread -= 1;

        Ok(self.codec.decode(&data)?)
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), GatehouseError> {
        self.conn.lock().await.ws.close(None).await?;
        Ok(())
    }
}

impl<C: Codec> Authenticator for AuthClient<C> {
    async fn authenticate(
        &self,
        username: &str,
        credential: &str,
        required: Option<&Groups>,
    ) -> Result<Token, AuthError> {
        let request = Request::Token(TokenRequest {
            username: username.to_string(),
            password: credential.to_string(),
            groups_needed: required.map(|g| g.iter().cloned().collect()),
        });
        let response = self.send(&request).await.map_err(GatehouseError::into_auth_error)?;
        token_outcome(response, AuthError::AuthFailed)
    }

    async fn validate(&self, token: &Token, required: Option<&Groups>) -> Result<Token, AuthError> {
        let request = Request::Check(CheckRequest {
            token: token.as_str().to_string(),
            groups_needed: required.map(|g| g.iter().cloned().collect()),
        });
        let response = self.send(&request).await.map_err(GatehouseError::into_auth_error)?;
        token_outcome(response, AuthError::SessionExpired)
    }

    async fn logout(&self, token: &Token) -> Result<(), AuthError> {
        let request = Request::Logout(LogoutRequest {
            token: token.as_str().to_string(),
        });
        let response = self.send(&request).await.map_err(GatehouseError::into_auth_error)?;
        if response.status == Status::OK {
            Ok(())
        } else {
            Err(AuthError::BackendUnavailable(describe(&response)))
        }
    }
}

/// Turns a token-bearing reply back into the engine's result.
///
/// `rejected` is what a 401 (or a legacy 204) means for this route.
/// Statuses the client doesn't recognise count as a rejection, so a
/// confused server never logs anyone in.
fn token_outcome(response: Response, rejected: AuthError) -> Result<Token, AuthError> {
    match response.status {
        Status::OK => match response.token {
            Some(token) => Ok(Token::new(token)),
            None => Err(GatehouseError::from(ProtocolError::InvalidMessage(
                "success reply carried no token".into(),
            ))
            .into_auth_error()),
        },
        Status::FORBIDDEN => Err(AuthError::InsufficientPermissions),
        Status::SERVICE_UNAVAILABLE => Err(AuthError::BackendUnavailable(describe(&response))),
        Status::UNAUTHORIZED | Status::NO_CONTENT => Err(rejected),
        other => {
            tracing::warn!(status = %other, "unexpected status from auth server");
            Err(rejected)
        }
    }
}

fn describe(response: &Response) -> String {
    match &response.detail {
        Some(detail) => format!("{}: {detail}", response.status),
        None => response.status.to_string(),
    }
}
