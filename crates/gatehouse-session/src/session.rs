//! Session types: the record behind each token and the knobs that shape it.
//!
//! A session record tracks:
//! - WHO logged in (`username`, a back-reference into the directory)
//! - WHAT they were allowed at login time (`groups`, a snapshot)
//! - WHEN it stops being valid (`expires_at`, an absolute wall-clock time)

use std::time::{Duration, SystemTime};

use serde::Deserialize;

use crate::Groups;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// `#[serde(default)]` lets a config file set only the fields it cares
/// about; everything else falls back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a token stays valid after it is issued or rotated.
    ///
    /// Default: 120 seconds. Every successful validation starts a fresh
    /// window, so an active user is never logged out.
    pub session_ttl_secs: u64,

    /// Random bytes per token. Values below
    /// [`MIN_TOKEN_BYTES`](crate::MIN_TOKEN_BYTES) are raised to it.
    pub token_bytes: usize,

    /// How many [`AuthEvent`](crate::AuthEvent)s a slow subscriber may
    /// fall behind before it starts missing them.
    pub event_capacity: usize,
}

impl SessionConfig {
    /// The session TTL as a `Duration`.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 120,
            token_bytes: crate::MIN_TOKEN_BYTES,
            event_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// The server-side state bound to one token.
///
/// Records are never edited in place. A refresh produces a new record
/// that goes in under a new token, which is what lets the store detect
/// two callers racing to rotate the same token.
///
/// A record whose `expires_at` has passed is dead even if the store
/// still holds it; it is evicted the next time someone presents its
/// token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// The user this session was issued to.
    pub username: String,

    /// The user's groups at issue time. Later directory changes don't
    /// reach live sessions.
    pub groups: Groups,

    /// The first instant at which the session is no longer valid.
    pub expires_at: SystemTime,
}

impl SessionRecord {
    /// Creates a record expiring `ttl` after `now`.
    ///
    /// Returns `None` if `now + ttl` can't be represented, so the caller
    /// can refuse rather than hand out a session that never expires.
    pub fn issue(
        username: impl Into<String>,
        groups: Groups,
        now: SystemTime,
        ttl: Duration,
    ) -> Option<Self> {
        Some(Self {
            username: username.into(),
            groups,
            expires_at: now.checked_add(ttl)?,
        })
    }

    /// Returns `true` while `now` is strictly before `expires_at`.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }

    /// A copy of this record with a fresh expiry of `now + ttl`.
    pub fn refreshed(&self, now: SystemTime, ttl: Duration) -> Option<Self> {
        Self::issue(self.username.clone(), self.groups.clone(), now, ttl)
    }
}
