//! Session tokens and how they're generated.

use std::fmt;

use rand::Rng;

/// The fewest random bytes a token may carry (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// An opaque session token.
///
/// Possession of a live token *is* the session, so `Token`
/// has no `Display` impl and its `Debug` output shows only a short
/// prefix. Use [`as_str`](Self::as_str) when the full value really has
/// to leave the process (the wire response).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wraps a token string received from a caller.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The full token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the full value.
    pub fn into_string(self) -> String {
        self.0
    }

    /// The first few characters, for correlating log lines.
    pub fn fingerprint(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(6)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}…)", self.fingerprint())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// TokenGenerator
// ---------------------------------------------------------------------------

/// Produces fresh tokens from the thread-local CSPRNG.
///
/// Each token is `byte_len` random bytes rendered as lowercase hex, so a
/// 16-byte token is 32 URL-safe characters. The service never checks for
/// collisions; at 128 bits or more they don't happen in practice.
#[derive(Debug, Clone, Copy)]
pub struct TokenGenerator {
    byte_len: usize,
}

impl TokenGenerator {
    /// Creates a generator. Lengths below [`MIN_TOKEN_BYTES`] are raised
    /// to it.
    pub fn new(byte_len: usize) -> Self {
        Self {
            byte_len: byte_len.max(MIN_TOKEN_BYTES),
        }
    }

    /// Number of random bytes behind each token.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Generates a new token.
    pub fn generate(&self) -> Token {
        let mut bytes = vec![0u8; self.byte_len];
        rand::rng().fill(bytes.as_mut_slice());
        Token(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(MIN_TOKEN_BYTES)
    }
}
