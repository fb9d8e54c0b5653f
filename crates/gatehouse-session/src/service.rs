//! The auth service: issues, validates, rotates and drops sessions.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Checking credentials and group membership at login
//! - Revalidating tokens and rotating them on every success
//! - Evicting expired sessions when they're presented (lazy expiry)
//! - Dropping sessions on logout, and sweeping dead ones on request
//!
//! # Lifecycle
//!
//! ```text
//! authenticate() ──→ [T1 live] ──validate()──→ [T2 live]  (T1 gone)
//!                        │                          │
//!                        │ expires_at passes        │ logout()
//!                        ▼                          ▼
//!                   [T1 dead] ──validate()──→   removed
//!                        │       (evicts, SessionExpired)
//!                        └──purge_expired()──→  removed
//! ```
//!
//! The service owns all of its state. Two services never share users or
//! sessions, so a test or a tenant gets a clean engine by building one.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::{
    AuthError, AuthEvent, Clock, CredentialVerifier, Groups, PlainVerifier, RejectReason,
    SessionConfig, SessionRecord, SessionStore, SystemClock, Token, TokenGenerator,
    UserDirectory, satisfies,
};

/// Orchestrates the directory, verifier, store and clock.
///
/// The verifier and clock are type parameters with production defaults,
/// so `AuthService<MemoryDirectory, MemorySessionStore>` is the common
/// spelling and tests swap in a [`ManualClock`](crate::ManualClock) with
/// [`with_clock`](Self::with_clock).
///
/// The store is private to the service. Every session in it was issued
/// by [`authenticate`](Self::authenticate) or rotated by
/// [`validate`](Self::validate), so there is no way to plant one:
///
/// ```compile_fail
/// use gatehouse_session::{AuthService, MemoryDirectory, MemorySessionStore, SessionConfig};
///
/// let svc = AuthService::new(MemoryDirectory::default(), MemorySessionStore::new(), SessionConfig::default());
/// let _ = &svc.store;
/// ```
pub struct AuthService<D, S, V = PlainVerifier, C = SystemClock> {
    directory: D,
    store: S,
    verifier: V,
    clock: C,
    tokens: TokenGenerator,
    ttl: Duration,
    events: broadcast::Sender<AuthEvent>,
}

impl<D, S> AuthService<D, S>
where
    D: UserDirectory,
    S: SessionStore,
{
    /// Creates a service with plaintext credential comparison and the
    /// system clock.
    pub fn new(directory: D, store: S, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            directory,
            store,
            verifier: PlainVerifier,
            clock: SystemClock,
            tokens: TokenGenerator::new(config.token_bytes),
            ttl: config.session_ttl(),
            events,
        }
    }
}

impl<D, S, V, C> AuthService<D, S, V, C>
where
    D: UserDirectory,
    S: SessionStore,
    V: CredentialVerifier,
    C: Clock,
{
    /// Replaces the credential verifier.
    pub fn with_verifier<V2: CredentialVerifier>(self, verifier: V2) -> AuthService<D, S, V2, C> {
        AuthService {
            directory: self.directory,
            store: self.store,
            verifier,
            clock: self.clock,
            tokens: self.tokens,
            ttl: self.ttl,
            events: self.events,
        }
    }

    /// Replaces the clock.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> AuthService<D, S, V, C2> {
        AuthService {
            directory: self.directory,
            store: self.store,
            verifier: self.verifier,
            clock,
            tokens: self.tokens,
            ttl: self.ttl,
            events: self.events,
        }
    }

    /// Subscribes to [`AuthEvent`]s. Events sent before this call are
    /// not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// How long issued and rotated sessions live.
    pub fn session_ttl(&self) -> Duration {
        self.ttl
    }

    /// Logs a user in.
    ///
    /// On success a new session holding a snapshot of the user's groups
    /// is stored and its token returned. Existing sessions for the same
    /// user are left alone; a user may hold any number of live tokens.
    ///
    /// # Errors
    /// - [`AuthError::AuthFailed`]: unknown user or wrong credential
    /// - [`AuthError::InsufficientPermissions`]: the user lacks a
    ///   required group
    /// - [`AuthError::BackendUnavailable`]: directory or store failed
    pub async fn authenticate(
        &self,
        username: &str,
        credential: &str,
        required: Option<&Groups>,
    ) -> Result<Token, AuthError> {
        let now = self.clock.now();

        let Some(user) = self
            .directory
            .lookup(username)
            .await
            .inspect_err(|e| tracing::warn!(%username, error = %e, "user directory lookup failed"))?
        else {
            tracing::info!(%username, "login rejected: unknown user");
            self.emit(AuthEvent::LoginRejected {
                username: username.to_string(),
                reason: RejectReason::UnknownUser,
            });
            return Err(AuthError::AuthFailed);
        };

        if !self.verifier.verify(&user.credential, credential) {
            tracing::info!(%username, "login rejected: invalid credential");
            self.emit(AuthEvent::LoginRejected {
                username: username.to_string(),
                reason: RejectReason::BadCredential,
            });
            return Err(AuthError::AuthFailed);
        }

        if !satisfies(&user.groups, required) {
            tracing::info!(%username, ?required, "login rejected: insufficient permissions");
            self.emit(AuthEvent::LoginRejected {
                username: username.to_string(),
                reason: RejectReason::InsufficientPermissions,
            });
            return Err(AuthError::InsufficientPermissions);
        }

        let Some(record) = SessionRecord::issue(user.username, user.groups, now, self.ttl) else {
            tracing::error!(%username, ttl = ?self.ttl, "session expiry out of range, refusing login");
            return Err(AuthError::AuthFailed);
        };

        let token = self.tokens.generate();
        self.store
            .insert(token.clone(), record)
            .await
            .inspect_err(|e| tracing::warn!(%username, error = %e, "session store insert failed"))?;

        tracing::info!(%username, token = token.fingerprint(), "login accepted, session created");
        self.emit(AuthEvent::LoggedIn {
            username: username.to_string(),
        });
        Ok(token)
    }

    /// Revalidates a token and rotates it.
    ///
    /// On success the presented token is consumed: its entry is removed
    /// and a new token with a fresh expiry takes its place. The caller
    /// must store the returned token and discard the old one.
    ///
    /// A permission failure leaves the session untouched, so the same
    /// token still works for a check that asks for less.
    ///
    /// # Errors
    /// - [`AuthError::SessionExpired`]: token unknown, expired (and now
    ///   evicted), or consumed by a concurrent validation
    /// - [`AuthError::InsufficientPermissions`]: the session lacks a
    ///   required group
    /// - [`AuthError::BackendUnavailable`]: the store failed
    pub async fn validate(&self, token: &Token, required: Option<&Groups>) -> Result<Token, AuthError> {
        let now = self.clock.now();

        let Some(record) = self
            .store
            .get(token)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "session store lookup failed"))?
        else {
            tracing::info!(token = token.fingerprint(), "session check failed: no session found");
            self.emit(AuthEvent::SessionExpired { username: None });
            return Err(AuthError::SessionExpired);
        };

        if !record.is_valid_at(now) {
            self.store
                .remove(token)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "session store remove failed"))?;
            tracing::info!(username = %record.username, "session check failed: session expired");
            self.emit(AuthEvent::SessionExpired {
                username: Some(record.username),
            });
            return Err(AuthError::SessionExpired);
        }

        if !satisfies(&record.groups, required) {
            tracing::info!(
                username = %record.username,
                ?required,
                "session check failed: insufficient permissions"
            );
            self.emit(AuthEvent::PermissionDenied {
                username: record.username,
            });
            return Err(AuthError::InsufficientPermissions);
        }

        let Some(refreshed) = record.refreshed(now, self.ttl) else {
            tracing::error!(username = %record.username, "session expiry out of range, refusing refresh");
            return Err(AuthError::SessionExpired);
        };

        let next = self.tokens.generate();
        let rotated = self
            .store
            .replace(token, next.clone(), refreshed)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "session store replace failed"))?;

        if !rotated {
            // Someone else validated this token between our read and our
            // swap. Their successor is the only one that counts.
            tracing::info!(
                username = %record.username,
                "session check failed: token already rotated"
            );
            return Err(AuthError::SessionExpired);
        }

        tracing::info!(
            username = %record.username,
            token = next.fingerprint(),
            "session valid, token rotated"
        );
        self.emit(AuthEvent::Rotated {
            username: record.username,
        });
        Ok(next)
    }

    /// Drops a token, live or not. Dropping an unknown token succeeds.
    ///
    /// # Errors
    /// Only [`AuthError::BackendUnavailable`].
    pub async fn logout(&self, token: &Token) -> Result<(), AuthError> {
        let removed = self
            .store
            .remove(token)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "session store remove failed"))?;

        let username = removed.map(|record| record.username);
        match &username {
            Some(username) => tracing::info!(%username, "logged out"),
            None => tracing::debug!(token = token.fingerprint(), "logout for unknown token"),
        }
        self.emit(AuthEvent::LoggedOut { username });
        Ok(())
    }

    /// Removes every session past its expiry and returns how many went.
    ///
    /// Nothing calls this automatically. Expired sessions are otherwise
    /// evicted only when presented, so long-running hosts should call it
    /// on a schedule of their choosing.
    pub async fn purge_expired(&self) -> Result<usize, AuthError> {
        let now = self.clock.now();
        let count = self
            .store
            .purge_expired(now)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "session store purge failed"))?;

        if count > 0 {
            tracing::info!(count, "purged expired sessions");
            self.emit(AuthEvent::Purged { count });
        }
        Ok(count)
    }

    /// Number of sessions held, including expired ones not yet evicted.
    pub async fn session_count(&self) -> Result<usize, AuthError> {
        Ok(self.store.count().await?)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `AuthService`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`.
    //!
    //! Time never passes on its own here. Every service runs on a
    //! `ManualClock`, and tests that care about expiry advance it
    //! explicitly.

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::{BackendError, ManualClock, MemoryDirectory, MemorySessionStore, User, groups};

    type TestService = AuthService<MemoryDirectory, MemorySessionStore, PlainVerifier, ManualClock>;

    // -- Helpers ----------------------------------------------------------

    /// alice / secret / {g1}, bob / hunter2 / {g1, g2}, 2-minute TTL.
    fn service() -> (TestService, ManualClock) {
        let clock = ManualClock::new();
        let directory = MemoryDirectory::new([
            User::new("alice", "secret", groups(["g1"])),
            User::new("bob", "hunter2", groups(["g1", "g2"])),
        ]);
        let service = AuthService::new(directory, MemorySessionStore::new(), SessionConfig::default())
            .with_clock(clock.clone());
        (service, clock)
    }

    fn req(items: &[&str]) -> Groups {
        groups(items.iter().copied())
    }

    async fn count(service: &TestService) -> usize {
        service.session_count().await.unwrap()
    }

    // =====================================================================
    // authenticate()
    // =====================================================================

    #[tokio::test]
    async fn test_authenticate_valid_credentials_returns_token() {
        let (svc, _) = service();

        let token = svc.authenticate("alice", "secret", Some(&req(&["g1"]))).await.unwrap();

        assert_eq!(token.as_str().len(), 32);
        assert_eq!(count(&svc).await, 1);
    }

    #[test]
    fn test_session_ttl_follows_config() {
        let config = SessionConfig {
            session_ttl_secs: 300,
            ..SessionConfig::default()
        };
        let svc = AuthService::new(MemoryDirectory::default(), MemorySessionStore::new(), config);

        assert_eq!(svc.session_ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_authenticate_stores_group_snapshot_and_expiry() {
        let (svc, clock) = service();

        let token = svc.authenticate("bob", "hunter2", None).await.unwrap();

        let record = svc.store.get(&token).await.unwrap().expect("stored");
        assert_eq!(record.username, "bob");
        assert_eq!(record.groups, req(&["g1", "g2"]));
        assert_eq!(record.expires_at, clock.now() + Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_credential_fails_without_session() {
        let (svc, _) = service();

        let result = svc.authenticate("alice", "wrong", Some(&Groups::new())).await;

        assert_eq!(result, Err(AuthError::AuthFailed));
        assert_eq!(count(&svc).await, 0);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user_is_indistinguishable_from_bad_password() {
        let (svc, _) = service();

        let unknown = svc.authenticate("mallory", "secret", None).await;
        let wrong = svc.authenticate("alice", "nope", None).await;

        assert_eq!(unknown, Err(AuthError::AuthFailed));
        assert_eq!(unknown, wrong);
        assert_eq!(count(&svc).await, 0);
    }

    #[tokio::test]
    async fn test_authenticate_missing_group_returns_insufficient_permissions() {
        let (svc, _) = service();

        let result = svc.authenticate("alice", "secret", Some(&req(&["g2"]))).await;

        assert_eq!(result, Err(AuthError::InsufficientPermissions));
        assert_eq!(count(&svc).await, 0);
    }

    #[tokio::test]
    async fn test_authenticate_twice_gives_two_live_sessions() {
        // No single-session-per-user rule: the second login doesn't
        // invalidate the first.
        let (svc, _) = service();

        let first = svc.authenticate("alice", "secret", None).await.unwrap();
        let second = svc.authenticate("alice", "secret", None).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(count(&svc).await, 2);
        assert!(svc.validate(&first, None).await.is_ok());
        assert!(svc.validate(&second, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_uses_injected_verifier() {
        let (svc, _) = service();
        let svc = svc.with_verifier(|stored: &crate::Credential, presented: &str| {
            presented == format!("{}!", stored.expose())
        });

        assert!(svc.authenticate("alice", "secret!", None).await.is_ok());
        assert_eq!(
            svc.authenticate("alice", "secret", None).await,
            Err(AuthError::AuthFailed)
        );
    }

    // =====================================================================
    // validate()
    // =====================================================================

    #[tokio::test]
    async fn test_validate_fresh_token_rotates() {
        let (svc, _) = service();
        let t1 = svc.authenticate("alice", "secret", Some(&req(&["g1"]))).await.unwrap();

        let t2 = svc.validate(&t1, Some(&req(&["g1"]))).await.unwrap();

        assert_ne!(t1, t2);
        assert_eq!(count(&svc).await, 1);
        assert!(svc.store.get(&t1).await.unwrap().is_none());
        assert!(svc.store.get(&t2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_validate_old_token_after_rotation_is_expired() {
        let (svc, _) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        svc.validate(&t1, None).await.unwrap();

        let again = svc.validate(&t1, None).await;

        assert_eq!(again, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_validate_unknown_token_is_expired() {
        let (svc, _) = service();
        let result = svc.validate(&Token::new("made-up"), None).await;
        assert_eq!(result, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_validate_refreshes_expiry_from_now() {
        let (svc, clock) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        clock.advance(Duration::from_secs(100));

        let t2 = svc.validate(&t1, None).await.unwrap();

        let record = svc.store.get(&t2).await.unwrap().unwrap();
        assert_eq!(record.expires_at, clock.now() + Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_validate_after_ttl_is_expired_and_evicted() {
        let (svc, clock) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        clock.advance(Duration::from_secs(180));

        let result = svc.validate(&t1, Some(&Groups::new())).await;

        assert_eq!(result, Err(AuthError::SessionExpired));
        assert_eq!(count(&svc).await, 0, "expired record should be evicted");
        assert_eq!(svc.validate(&t1, None).await, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_validate_exactly_at_expiry_is_expired() {
        let (svc, clock) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        clock.advance(Duration::from_secs(120));

        assert_eq!(svc.validate(&t1, None).await, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_validate_expiry_checked_before_permissions() {
        // A dead session asked for groups it lacks is still just expired.
        let (svc, clock) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        clock.advance(Duration::from_secs(121));

        let result = svc.validate(&t1, Some(&req(&["g2"]))).await;

        assert_eq!(result, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_validate_missing_group_leaves_session_alive() {
        let (svc, _) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        let before = svc.store.get(&t1).await.unwrap();

        let denied = svc.validate(&t1, Some(&req(&["g2"]))).await;

        assert_eq!(denied, Err(AuthError::InsufficientPermissions));
        assert_eq!(svc.store.get(&t1).await.unwrap(), before, "record must be untouched");
        assert!(svc.validate(&t1, Some(&req(&["g1"]))).await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_record_holds_group_snapshot() {
        // The record carries its own copy of alice's groups.
        let (svc, _) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();

        let record = svc.store.get(&t1).await.unwrap().unwrap();
        assert_eq!(record.groups, req(&["g1"]));
    }

    #[tokio::test]
    async fn test_validate_after_clock_rewind_still_valid_until_expiry() {
        let (svc, clock) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        clock.rewind(Duration::from_secs(30));

        assert!(svc.validate(&t1, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_concurrent_same_token_only_one_successor() {
        let (svc, _) = service();
        let svc = std::sync::Arc::new(svc);
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = std::sync::Arc::clone(&svc);
            let t1 = t1.clone();
            handles.push(tokio::spawn(async move { svc.validate(&t1, None).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert_eq!(e, AuthError::SessionExpired),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(count(&svc).await, 1);
    }

    // =====================================================================
    // logout() / purge_expired()
    // =====================================================================

    #[tokio::test]
    async fn test_logout_removes_session() {
        let (svc, _) = service();
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();

        svc.logout(&t1).await.unwrap();

        assert_eq!(count(&svc).await, 0);
        assert_eq!(svc.validate(&t1, None).await, Err(AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_logout_unknown_token_succeeds() {
        let (svc, _) = service();
        assert_eq!(svc.logout(&Token::new("ghost")).await, Ok(()));
    }

    #[tokio::test]
    async fn test_purge_expired_removes_only_dead_sessions() {
        let (svc, clock) = service();
        svc.authenticate("alice", "secret", None).await.unwrap();
        clock.advance(Duration::from_secs(60));
        let fresh = svc.authenticate("bob", "hunter2", None).await.unwrap();
        clock.advance(Duration::from_secs(90));

        let purged = svc.purge_expired().await.unwrap();

        assert_eq!(purged, 1);
        assert_eq!(count(&svc).await, 1);
        assert!(svc.validate(&fresh, None).await.is_ok());
    }

    // =====================================================================
    // Events
    // =====================================================================

    #[tokio::test]
    async fn test_events_follow_session_lifecycle() {
        let (svc, clock) = service();
        let mut events = svc.subscribe();

        let _ = svc.authenticate("mallory", "x", None).await;
        let _ = svc.authenticate("alice", "bad", None).await;
        let t1 = svc.authenticate("alice", "secret", None).await.unwrap();
        let _ = svc.validate(&t1, Some(&req(&["g2"]))).await;
        let t2 = svc.validate(&t1, None).await.unwrap();
        clock.advance(Duration::from_secs(500));
        let _ = svc.validate(&t2, None).await;

        let expected = [
            AuthEvent::LoginRejected {
                username: "mallory".into(),
                reason: RejectReason::UnknownUser,
            },
            AuthEvent::LoginRejected {
                username: "alice".into(),
                reason: RejectReason::BadCredential,
            },
            AuthEvent::LoggedIn { username: "alice".into() },
            AuthEvent::PermissionDenied { username: "alice".into() },
            AuthEvent::Rotated { username: "alice".into() },
            AuthEvent::SessionExpired {
                username: Some("alice".into()),
            },
        ];
        for want in expected {
            assert_eq!(events.recv().await.unwrap(), want);
        }
    }

    #[tokio::test]
    async fn test_events_without_subscribers_do_not_fail() {
        let (svc, _) = service();
        assert!(svc.authenticate("alice", "secret", None).await.is_ok());
    }

    // =====================================================================
    // Backend failures
    // =====================================================================

    /// A directory whose backend is always down.
    struct DownDirectory;

    impl UserDirectory for DownDirectory {
        async fn lookup(&self, _username: &str) -> Result<Option<crate::User>, BackendError> {
            Err(BackendError("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_authenticate_backend_down_is_not_auth_failed() {
        let svc = AuthService::new(DownDirectory, MemorySessionStore::new(), SessionConfig::default());

        let result = svc.authenticate("alice", "secret", None).await;

        assert_eq!(
            result,
            Err(AuthError::BackendUnavailable("connection refused".into()))
        );
    }

    /// A store that works until one of its operations is switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemorySessionStore,
        get_down: AtomicBool,
        insert_down: AtomicBool,
        replace_down: AtomicBool,
    }

    impl FlakyStore {
        fn check(flag: &AtomicBool) -> Result<(), BackendError> {
            if flag.load(Ordering::SeqCst) {
                Err(BackendError("store unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    impl SessionStore for FlakyStore {
        async fn insert(&self, token: Token, record: SessionRecord) -> Result<(), BackendError> {
            Self::check(&self.insert_down)?;
            self.inner.insert(token, record).await
        }

        async fn get(&self, token: &Token) -> Result<Option<SessionRecord>, BackendError> {
            Self::check(&self.get_down)?;
            self.inner.get(token).await
        }

        async fn remove(&self, token: &Token) -> Result<Option<SessionRecord>, BackendError> {
            self.inner.remove(token).await
        }

        async fn replace(
            &self,
            old: &Token,
            new: Token,
            record: SessionRecord,
        ) -> Result<bool, BackendError> {
            Self::check(&self.replace_down)?;
            self.inner.replace(old, new, record).await
        }

        async fn purge_expired(&self, now: std::time::SystemTime) -> Result<usize, BackendError> {
            self.inner.purge_expired(now).await
        }

        async fn count(&self) -> Result<usize, BackendError> {
            self.inner.count().await
        }
    }

    fn flaky_service() -> AuthService<MemoryDirectory, FlakyStore> {
        let directory = MemoryDirectory::new([User::new("alice", "secret", groups(["g1"]))]);
        AuthService::new(directory, FlakyStore::default(), SessionConfig::default())
    }

    fn store_down() -> AuthError {
        AuthError::BackendUnavailable("store unreachable".into())
    }

    #[tokio::test]
    async fn test_authenticate_store_insert_down_is_unavailable_without_token() {
        let svc = flaky_service();
        svc.store.insert_down.store(true, Ordering::SeqCst);

        let result = svc.authenticate("alice", "secret", None).await;

        assert_eq!(result, Err(store_down()));
        assert_eq!(svc.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validate_store_lookup_down_is_unavailable_not_expired() {
        let svc = flaky_service();
        let token = svc.authenticate("alice", "secret", None).await.unwrap();
        svc.store.get_down.store(true, Ordering::SeqCst);

        let result = svc.validate(&token, None).await;

        assert_eq!(result, Err(store_down()));
        assert!(result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_validate_store_replace_down_is_unavailable_and_keeps_token() {
        let svc = flaky_service();
        let token = svc.authenticate("alice", "secret", None).await.unwrap();
        svc.store.replace_down.store(true, Ordering::SeqCst);

        let result = svc.validate(&token, None).await;

        assert_eq!(result, Err(store_down()));

        // Nothing rotated, so the old token still works once the store is back.
        svc.store.replace_down.store(false, Ordering::SeqCst);
        assert!(svc.validate(&token, None).await.is_ok());
    }

    // =====================================================================
    // Full scenario
    // =====================================================================

    #[tokio::test]
    async fn test_full_scenario_rotate_deny_and_continue() {
        let (svc, _) = service();
        let g1 = req(&["g1"]);
        let g2 = req(&["g2"]);

        let t1 = svc.authenticate("alice", "secret", Some(&g1)).await.unwrap();
        let t2 = svc.validate(&t1, Some(&g1)).await.unwrap();
        assert_ne!(t1, t2);

        assert_eq!(svc.validate(&t1, Some(&g1)).await, Err(AuthError::SessionExpired));
        assert_eq!(
            svc.validate(&t2, Some(&g2)).await,
            Err(AuthError::InsufficientPermissions)
        );
        assert!(svc.validate(&t2, Some(&g1)).await.is_ok());
    }
}
