//! The user directory: who can log in and which groups they hold.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::{BackendError, Groups};

/// A stored secret.
///
/// Compared by a [`CredentialVerifier`](crate::CredentialVerifier),
/// never printed: `Debug` shows a placeholder.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret. Only verifiers should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One directory entry.
///
/// Deserializes from `{"username": .., "password": .., "groups": [..]}`,
/// the same shape a seeded users file uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(rename = "password")]
    pub credential: Credential,
    #[serde(default)]
    pub groups: Groups,
}

impl User {
    pub fn new(username: impl Into<String>, credential: impl Into<String>, groups: Groups) -> Self {
        Self {
            username: username.into(),
            credential: Credential::new(credential),
            groups,
        }
    }
}

/// Looks users up by name.
///
/// Read-only from the engine's point of view. An unknown username is
/// `Ok(None)`, not an error; `Err` is reserved for "couldn't ask".
pub trait UserDirectory: Send + Sync + 'static {
    /// Finds the user with this exact username.
    fn lookup(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, BackendError>> + Send;
}

/// A [`UserDirectory`] held entirely in memory, loaded once at startup.
///
/// Deserializes from a JSON array of [`User`]s.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<User>")]
pub struct MemoryDirectory {
    users: HashMap<String, User>,
}

impl MemoryDirectory {
    /// Builds a directory from a list of users. If a username appears
    /// twice the later entry wins.
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        users.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<User> for MemoryDirectory {
    fn from_iter<I: IntoIterator<Item = User>>(iter: I) -> Self {
        let users = iter
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
        Self { users }
    }
}

impl From<Vec<User>> for MemoryDirectory {
    fn from(users: Vec<User>) -> Self {
        Self::new(users)
    }
}

impl UserDirectory for MemoryDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<User>, BackendError> {
        Ok(self.users.get(username).cloned())
    }
}
