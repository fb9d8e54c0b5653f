//! Request and response types for Gatehouse's wire format.
//!
//! Every frame a caller sends is one [`Request`]; every frame the server
//! sends back is one [`Response`]. The JSON shapes mirror the two HTTP
//! style endpoints callers already know (`/auth/token`, `/auth/check`),
//! with a `route` tag in place of the URL path.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// An HTTP-style status code carried in every [`Response`].
///
/// A newtype instead of a bare `u16` so a status can't be confused with
/// any other number, while `#[serde(transparent)]` still puts a plain
/// `403` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub u16);

impl Status {
    /// The request succeeded and the response carries a token.
    pub const OK: Status = Status(200);
    /// No session. Older servers answer this instead of 401.
    pub const NO_CONTENT: Status = Status(204);
    /// The frame could not be decoded as a request.
    pub const BAD_REQUEST: Status = Status(400);
    /// Bad credentials, or an absent/expired token.
    pub const UNAUTHORIZED: Status = Status(401);
    /// Identity is fine, group membership is not.
    pub const FORBIDDEN: Status = Status(403);
    /// The user directory or session store could not be reached.
    pub const SERVICE_UNAVAILABLE: Status = Status(503);

    /// Returns `true` for 2xx codes.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// "Here are my credentials, give me a token."
///
/// `groups_needed` lists the groups the caller's app requires. Missing or
/// `null` means no restriction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub groups_needed: Option<Vec<String>>,
}

/// Hand-written so a stray `{:?}` in a log line can't leak the password.
impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("groups_needed", &self.groups_needed)
            .finish()
    }
}

/// "Is this token still good? If so, give me its replacement."
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub token: String,
    #[serde(default)]
    pub groups_needed: Option<Vec<String>>,
}

impl fmt::Debug for CheckRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRequest")
            .field("token", &"<redacted>")
            .field("groups_needed", &self.groups_needed)
            .finish()
    }
}

/// "Forget this token."
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

impl fmt::Debug for LogoutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutRequest")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// One request frame.
///
/// `#[serde(tag = "route")]` flattens the variant name into the body:
///
/// ```text
/// {"route":"token","username":"alice","password":"secret","groups_needed":["g1"]}
/// {"route":"check","token":"3f1c...","groups_needed":["g1"]}
/// {"route":"logout","token":"3f1c..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "lowercase")]
pub enum Request {
    Token(TokenRequest),
    Check(CheckRequest),
    Logout(LogoutRequest),
}

impl Request {
    /// Short name of the route, for log fields.
    pub fn route(&self) -> &'static str {
        match self {
            Request::Token(_) => "token",
            Request::Check(_) => "check",
            Request::Logout(_) => "logout",
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// One reply frame.
///
/// On success `token` holds the new token (for `check` this is the
/// rotated one, which the caller must store in place of the old).
/// On failure `detail` explains what went wrong in words a UI can show.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Response {
    /// A 200 carrying `token`.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            status: Status::OK,
            token: Some(token.into()),
            detail: None,
        }
    }

    /// A 200 with nothing in it (logout).
    pub fn ok() -> Self {
        Self {
            status: Status::OK,
            token: None,
            detail: None,
        }
    }

    /// A non-success reply.
    pub fn failure(status: Status, detail: impl Into<String>) -> Self {
        Self {
            status,
            token: None,
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("detail", &self.detail)
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================
