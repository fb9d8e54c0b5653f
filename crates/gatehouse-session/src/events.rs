//! Notifications about authentication decisions.
//!
//! A UI layer that wants to pop a login prompt when a session lapses
//! subscribes here instead of polling engine state. Events name users,
//! never tokens or credentials.

/// Why a login attempt was turned away.
///
/// Finer-grained than [`AuthError`](crate::AuthError): the
/// server may want to know an unknown username was tried, the caller
/// must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownUser,
    BadCredential,
    InsufficientPermissions,
}

/// Something the [`AuthService`](crate::AuthService) decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Credentials accepted, a session was issued.
    LoggedIn { username: String },

    /// A login attempt failed.
    LoginRejected {
        username: String,
        reason: RejectReason,
    },

    /// A token was validated and swapped for a fresh one.
    Rotated { username: String },

    /// A token was presented but was unknown or past its expiry.
    /// `username` is `None` when the token was unknown.
    SessionExpired { username: Option<String> },

    /// A live session lacked the required groups.
    PermissionDenied { username: String },

    /// A token was explicitly dropped. `username` is `None` when the
    /// token was already gone.
    LoggedOut { username: Option<String> },

    /// A sweep removed `count` dead sessions.
    Purged { count: usize },
}
