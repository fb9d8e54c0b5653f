//! Error types for the session layer.

use gatehouse_protocol::Status;

/// Why an [`authenticate`](crate::AuthService::authenticate) or
/// [`validate`](crate::AuthService::validate) call was refused.
///
/// The variants are coarse. "No such user" and "wrong
/// password" are both [`AuthFailed`](Self::AuthFailed), and "no such
/// token" and "token expired" are both
/// [`SessionExpired`](Self::SessionExpired), so a caller can't use the
/// error to probe which usernames or tokens exist.
///
/// Every variant is terminal for the call that produced it. The engine
/// never retries internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Unknown user or bad credential.
    #[error("authentication failed")]
    AuthFailed,

    /// The token is absent from the store or past its expiry.
    #[error("session expired")]
    SessionExpired,

    /// Identity checks out, but the held groups don't cover the
    /// required ones.
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// The user directory or session store couldn't be reached. The
    /// caller may retry later.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl AuthError {
    /// The wire status a server should answer with for this error.
    pub fn status(&self) -> Status {
        match self {
            AuthError::AuthFailed | AuthError::SessionExpired => Status::UNAUTHORIZED,
            AuthError::InsufficientPermissions => Status::FORBIDDEN,
            AuthError::BackendUnavailable(_) => Status::SERVICE_UNAVAILABLE,
        }
    }

    /// A message safe to show an end user.
    ///
    /// Never includes backend internals, even for
    /// [`BackendUnavailable`](Self::BackendUnavailable).
    pub fn detail(&self) -> &'static str {
        match self {
            AuthError::AuthFailed => "Username or password is invalid",
            AuthError::SessionExpired => "No authenticated session found",
            AuthError::InsufficientPermissions => "Insufficient permissions",
            AuthError::BackendUnavailable(_) => "Authentication backend unavailable, try again later",
        }
    }

    /// Returns `true` if the same call might succeed later without the
    /// user doing anything differently.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::BackendUnavailable(_))
    }
}

/// A failure inside a [`UserDirectory`](crate::UserDirectory) or
/// [`SessionStore`](crate::SessionStore) implementation.
///
/// The in-memory backends never produce one. Remote-backed
/// implementations return it when the backend can't be reached, and the
/// service surfaces it as [`AuthError::BackendUnavailable`] instead of
/// pretending the credentials were wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        AuthError::BackendUnavailable(err.0)
    }
}
