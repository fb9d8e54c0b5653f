//! A runnable Gatehouse server.
//!
//! ```text
//! cargo run -p portal                 # built-in users, 127.0.0.1:8000
//! cargo run -p portal -- portal.json  # users and settings from a file
//! RUST_LOG=gatehouse=debug cargo run -p portal
//! ```
//!
//! A config file may set any subset of:
//!
//! ```json
//! {
//!   "bind": "0.0.0.0:8000",
//!   "idle_timeout_secs": 30,
//!   "purge_interval_secs": 60,
//!   "session": { "session_ttl_secs": 120 },
//!   "users": [{ "username": "alice", "password": "secret", "groups": ["app1"] }]
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use gatehouse::prelude::*;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PortalConfig {
    bind: String,
    idle_timeout_secs: u64,
    /// Zero disables the sweep.
    purge_interval_secs: u64,
    session: SessionConfig,
    users: MemoryDirectory,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            idle_timeout_secs: 30,
            purge_interval_secs: 60,
            session: SessionConfig::default(),
            users: MemoryDirectory::new([
                User::new("username", "password", groups(["app1", "group1"])),
                User::new("username2", "password2", groups(["app2"])),
            ]),
        }
    }
}

impl PortalConfig {
    fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

type Engine = AuthService<MemoryDirectory, MemorySessionStore>;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Mirrors engine decisions into the log at debug level.
fn spawn_event_logger(auth: &Engine) {
    let mut events = auth.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(?event, "auth event"),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Drops expired sessions every `period` so abandoned logins don't pile up.
fn spawn_sweeper(auth: Arc<Engine>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = auth.purge_expired().await {
                tracing::warn!(error = %e, "session sweep failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(%path, "loading config");
            PortalConfig::load(&path)?
        }
        None => PortalConfig::default(),
    };
    let users = config.users.len();
    let auth = Arc::new(AuthService::new(
        config.users,
        MemorySessionStore::new(),
        config.session,
    ));
    tracing::info!(users, session_ttl = ?auth.session_ttl(), "starting portal");
    spawn_event_logger(&auth);
    if config.purge_interval_secs > 0 {
        spawn_sweeper(Arc::clone(&auth), Duration::from_secs(config.purge_interval_secs));
    }

    let server = GatehouseServerBuilder::new()
        .bind(&config.bind)
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .build(auth)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "portal ready, Ctrl-C to stop");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
