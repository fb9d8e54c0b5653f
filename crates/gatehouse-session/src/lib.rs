//! Session-based authentication and authorization for Gatehouse.
//!
//! This crate is the engine. It answers two questions:
//!
//! 1. **Login**: are these credentials good, and does this user hold the
//!    groups the caller requires? If so, issue a token
//!    ([`AuthService::authenticate`]).
//! 2. **Revalidation**: is this token alive, and does its session hold
//!    the required groups? If so, swap it for a fresh one
//!    ([`AuthService::validate`]).
//!
//! Everything else (where tokens are stored on the client, how requests
//! arrive) lives above this crate.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / client (gatehouse)  ← speaks the wire protocol, calls the engine
//!     ↕
//! Session layer (this crate)   ← users, sessions, tokens, group checks
//!     ↕
//! Protocol layer (below)       ← provides Status codes for error mapping
//! ```
//!
//! # Components
//!
//! - [`UserDirectory`] / [`MemoryDirectory`]: username → credential + groups
//! - [`CredentialVerifier`] / [`PlainVerifier`]: pluggable secret comparison
//! - [`satisfies`]: required groups ⊆ held groups
//! - [`TokenGenerator`]: unguessable session tokens
//! - [`SessionRecord`]: expiry + group snapshot for one token
//! - [`SessionStore`] / [`MemorySessionStore`]: token → record
//! - [`Clock`]: wall-clock source, swappable in tests
//! - [`AuthService`]: ties the above together

#![allow(async_fn_in_trait)]

mod auth;
mod clock;
mod directory;
mod error;
mod events;
mod permission;
mod service;
mod session;
mod store;
mod token;
mod verify;

pub use auth::Authenticator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{Credential, MemoryDirectory, User, UserDirectory};
pub use error::{AuthError, BackendError};
pub use events::{AuthEvent, RejectReason};
pub use permission::{Groups, groups, satisfies};
pub use service::AuthService;
pub use session::{SessionConfig, SessionRecord};
pub use store::{MemorySessionStore, SessionStore};
pub use token::{MIN_TOKEN_BYTES, Token, TokenGenerator};
pub use verify::{CredentialVerifier, PlainVerifier};
