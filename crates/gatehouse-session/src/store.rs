//! The session store: token → session record.
//!
//! # Concurrency note
//!
//! Two browser tabs can present the same token at the same moment. If
//! both rotations went through, one expiring token would turn into two
//! live ones. [`SessionStore::replace`] closes that gap: it removes the
//! old token and inserts the new one as a single step, and only if the
//! old token is still there. Whoever loses the race sees `false` and
//! reports the session as expired.

use std::collections::HashMap;
use std::time::SystemTime;

use tokio::sync::Mutex;

use crate::{BackendError, SessionRecord, Token};

/// Storage for live sessions.
///
/// Only the [`AuthService`](crate::AuthService) that owns a store should
/// mutate it. Implementations must be safe to call from many tasks at
/// once. Expiry is not the store's concern: it hands back whatever it
/// holds and the service decides whether it's still alive.
pub trait SessionStore: Send + Sync + 'static {
    /// Stores `record` under `token`, replacing anything already there.
    fn insert(
        &self,
        token: Token,
        record: SessionRecord,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Returns a copy of the record for `token`, if any.
    fn get(
        &self,
        token: &Token,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, BackendError>> + Send;

    /// Removes `token`, returning its record if it was present.
    fn remove(
        &self,
        token: &Token,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, BackendError>> + Send;

    /// Atomically swaps `old` for `new`.
    ///
    /// If `old` is present it is removed and `record` is stored under
    /// `new`, and the call returns `true`. If `old` is already gone
    /// nothing changes and the call returns `false`.
    fn replace(
        &self,
        old: &Token,
        new: Token,
        record: SessionRecord,
    ) -> impl std::future::Future<Output = Result<bool, BackendError>> + Send;

    /// Removes every record that is no longer valid at `now`, returning
    /// how many went.
    fn purge_expired(
        &self,
        now: SystemTime,
    ) -> impl std::future::Future<Output = Result<usize, BackendError>> + Send;

    /// Number of records held, live or dead.
    fn count(&self) -> impl std::future::Future<Output = Result<usize, BackendError>> + Send;
}

/// A [`SessionStore`] backed by a `HashMap` behind a Tokio mutex.
///
/// Every operation takes the lock once and never awaits while holding
/// it, so `replace` is atomic with respect to every other call.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Token, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn insert(&self, token: Token, record: SessionRecord) -> Result<(), BackendError> {
        self.sessions.lock().await.insert(token, record);
        Ok(())
    }

    async fn get(&self, token: &Token) -> Result<Option<SessionRecord>, BackendError> {
        Ok(self.sessions.lock().await.get(token).cloned())
    }

    async fn remove(&self, token: &Token) -> Result<Option<SessionRecord>, BackendError> {
        Ok(self.sessions.lock().await.remove(token))
    }

    async fn replace(
        &self,
        old: &Token,
        new: Token,
        record: SessionRecord,
    ) -> Result<bool, BackendError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(old).is_none() {
            return Ok(false);
        }
        sessions.insert(new, record);
        Ok(true)
    }

    async fn purge_expired(&self, now: SystemTime) -> Result<usize, BackendError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.is_valid_at(now));
        Ok(before - sessions.len())
    }

    async fn count(&self) -> Result<usize, BackendError> {
        Ok(self.sessions.lock().await.len())
    }
}
