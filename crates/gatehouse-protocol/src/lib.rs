//! Wire protocol for Gatehouse.
//!
//! This crate defines what callers and the auth server exchange:
//!
//! - **Requests** ([`Request`], [`TokenRequest`], [`CheckRequest`],
//!   [`LogoutRequest`]): "log me in", "is this token still good?",
//!   "forget this token".
//! - **Responses** ([`Response`], [`Status`]): a status code plus either
//!   a (possibly rotated) token or a human-readable detail.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding
//!   or decoding.
//!
//! The protocol layer knows nothing about users, sessions or sockets.
//!
//! ```text
//! Transport (frames) → Protocol (Request/Response) → Session (auth engine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CheckRequest, LogoutRequest, Request, Response, Status, TokenRequest,
};
