//! # Gatehouse
//!
//! Session-token authentication for web apps.
//!
//! A caller trades a username and password for a short-lived token, then
//! trades that token for a fresh one on every check. Tokens carry a
//! snapshot of the user's groups, so each check can also demand that the
//! user belongs to the groups an app requires.
//!
//! This crate puts the engine from `gatehouse-session` behind a WebSocket
//! server ([`GatehouseServer`]) and provides a matching client
//! ([`AuthClient`]). Both sides implement or consume the same
//! [`Authenticator`](gatehouse_session::Authenticator) trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatehouse::prelude::*;
//!
//! # async fn run() -> Result<(), GatehouseError> {
//! let directory = MemoryDirectory::new([
//!     User::new("username", "password", groups(["app1", "group1"])),
//! ]);
//! let auth = AuthService::new(directory, MemorySessionStore::new(), SessionConfig::default());
//!
//! let server = GatehouseServerBuilder::new()
//!     .bind("0.0.0.0:8000")
//!     .build(auth)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod error;
mod handler;
mod server;

pub use client::AuthClient;
pub use error::GatehouseError;
pub use server::{GatehouseServer, GatehouseServerBuilder};

/// Everything needed to stand up a server or talk to one.
pub mod prelude {
    pub use crate::{AuthClient, GatehouseError, GatehouseServer, GatehouseServerBuilder};
    pub use gatehouse_protocol::{Codec, JsonCodec, Request, Response, Status};
    pub use gatehouse_session::{
        AuthError, AuthEvent, AuthService, Authenticator, Clock, ManualClock, MemoryDirectory,
        MemorySessionStore, SessionConfig, SessionStore, SystemClock, Token, User, UserDirectory,
        Groups, groups,
    };
}
