//! `GatehouseServer` builder and accept loop.
//!
//! The server owns no auth state of its own. It hands every decoded
//! request to the [`Authenticator`] it was built with, usually an
//! [`AuthService`](gatehouse_session::AuthService).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gatehouse_protocol::{Codec, JsonCodec};
use gatehouse_session::Authenticator;
use tokio::net::TcpListener;

use crate::GatehouseError;
use crate::handler::handle_connection;

/// Counter for per-connection log correlation.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A, C> {
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Gatehouse server.
///
/// # Example
///
/// ```rust,no_run
/// use gatehouse::prelude::*;
///
/// # async fn run() -> Result<(), GatehouseError> {
/// let directory = MemoryDirectory::new([User::new("alice", "secret", groups(["app1"]))]);
/// let auth = AuthService::new(directory, MemorySessionStore::new(), SessionConfig::default());
///
/// let server = GatehouseServerBuilder::new()
///     .bind("0.0.0.0:8000")
///     .build(auth)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GatehouseServerBuilder {
    bind_addr: String,
    idle_timeout: Duration,
}

impl GatehouseServerBuilder {
    /// Creates a builder bound to `127.0.0.1:8000` with a 30 second idle
    /// timeout.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            idle_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the address to listen on. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Closes connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and returns a server ready to [`run`](GatehouseServer::run).
    ///
    /// Uses [`JsonCodec`] on the wire.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<GatehouseServer<A, JsonCodec>, GatehouseError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "Gatehouse listening");

        let state = Arc::new(ServerState {
            auth,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(GatehouseServer { listener, state })
    }
}

impl Default for GatehouseServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gatehouse server.
pub struct GatehouseServer<A, C> {
    listener: TcpListener,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> GatehouseServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The authenticator requests are dispatched to.
    pub fn authenticator(&self) -> &A {
        &self.state.auth
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), GatehouseError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connections already being served keep running to completion; only
    /// new accepts stop.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), GatehouseError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Gatehouse server running");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let conn_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, conn_id, state).await {
                                tracing::debug!(conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
