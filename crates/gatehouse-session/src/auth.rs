//! The caller-facing authentication interface.
//!
//! Callers (a login form, a request handler) need exactly two things:
//! trade credentials for a token, and trade a token for its successor.
//! [`Authenticator`] names those two operations plus logout, so the
//! caller doesn't care whether the engine runs in-process
//! ([`AuthService`]) or behind a socket (`gatehouse::AuthClient`).

use crate::{
    AuthError, AuthService, Clock, CredentialVerifier, Groups, SessionStore, Token, UserDirectory,
};

/// Issues and revalidates session tokens.
///
/// # Trait bounds
///
/// - `Send + Sync` → one authenticator is shared by every connection
///   task, and Tokio may poll those on any thread.
/// - `'static` → it lives as long as the server.
///
/// # Example
///
/// ```rust
/// use gatehouse_session::{AuthError, Authenticator, Groups, Token};
///
/// /// Lets "guest" in with any password and never rotates.
/// /// Only for local UI work!
/// struct GuestAuthenticator;
///
/// impl Authenticator for GuestAuthenticator {
///     async fn authenticate(
///         &self,
///         username: &str,
///         _credential: &str,
///         _required: Option<&Groups>,
///     ) -> Result<Token, AuthError> {
///         if username == "guest" {
///             Ok(Token::new("guest-token"))
///         } else {
///             Err(AuthError::AuthFailed)
///         }
///     }
///
///     async fn validate(
///         &self,
///         token: &Token,
///         _required: Option<&Groups>,
///     ) -> Result<Token, AuthError> {
///         Ok(token.clone())
///     }
///
///     async fn logout(&self, _token: &Token) -> Result<(), AuthError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Exchanges credentials for a new token.
    ///
    /// `required` lists the groups the caller needs; `None` means no
    /// restriction.
    fn authenticate(
        &self,
        username: &str,
        credential: &str,
        required: Option<&Groups>,
    ) -> impl std::future::Future<Output = Result<Token, AuthError>> + Send;

    /// Checks a token and returns its replacement. The presented token
    /// must not be used again after a success.
    fn validate(
        &self,
        token: &Token,
        required: Option<&Groups>,
    ) -> impl std::future::Future<Output = Result<Token, AuthError>> + Send;

    /// Drops a token.
    fn logout(&self, token: &Token) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;
}

impl<D, S, V, C> Authenticator for AuthService<D, S, V, C>
where
    D: UserDirectory,
    S: SessionStore,
    V: CredentialVerifier,
    C: Clock,
{
    async fn authenticate(
        &self,
        username: &str,
        credential: &str,
        required: Option<&Groups>,
    ) -> Result<Token, AuthError> {
        AuthService::authenticate(self, username, credential, required).await
    }

    async fn validate(&self, token: &Token, required: Option<&Groups>) -> Result<Token, AuthError> {
        AuthService::validate(self, token, required).await
    }

    async fn logout(&self, token: &Token) -> Result<(), AuthError> {
        AuthService::logout(self, token).await
    }
}

/// Lets one engine back the server and stay reachable for housekeeping.
impl<A: Authenticator> Authenticator for std::sync::Arc<A> {
    async fn authenticate(
        &self,
        username: &str,
        credential: &str,
        required: Option<&Groups>,
    ) -> Result<Token, AuthError> {
        A::authenticate(self, username, credential, required).await
    }

    async fn validate(&self, token: &Token, required: Option<&Groups>) -> Result<Token, AuthError> {
        A::validate(self, token, required).await
    }

    async fn logout(&self, token: &Token) -> Result<(), AuthError> {
        A::logout(self, token).await
    }
}
