//! Pluggable credential comparison.
//!
//! How secrets are stored (plain, salted hash, KDF) is up to the host.
//! The engine only asks a [`CredentialVerifier`] "does this match?".

use crate::Credential;

/// Decides whether a presented secret matches a stored credential.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn verify(&self, stored: &Credential, presented: &str) -> bool;
}

/// Compares plaintext secrets in constant time.
///
/// Fine for seeded development directories. Hosts that store hashes
/// plug in their own verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainVerifier;

impl CredentialVerifier for PlainVerifier {
    fn verify(&self, stored: &Credential, presented: &str) -> bool {
        constant_time_eq(stored.expose().as_bytes(), presented.as_bytes())
    }
}

/// Any closure with the right shape is a verifier too.
impl<F> CredentialVerifier for F
where
    F: Fn(&Credential, &str) -> bool + Send + Sync + 'static,
{
    fn verify(&self, stored: &Credential, presented: &str) -> bool {
        self(stored, presented)
    }
}

/// Byte comparison whose running time doesn't depend on where the first
/// difference is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
