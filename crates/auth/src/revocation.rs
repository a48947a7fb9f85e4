//! Revocation store port.
//!
//! Records access credentials invalidated before their natural expiry. Entries
//! carry a TTL equal to the credential's remaining lifetime, so the store never
//! outlives the credentials it blocks and never grows without bound.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevocationStoreError {
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

/// TTL-backed key-value store of revoked access credentials.
///
/// Keys are the raw credential strings. Implementations must make both
/// operations idempotent; `revoke` with a zero TTL is a no-op (the credential
/// is already dead).
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(
        &self,
        credential: &str,
        remaining_ttl_secs: u64,
    ) -> Result<(), RevocationStoreError>;

    async fn is_revoked(&self, credential: &str) -> Result<bool, RevocationStoreError>;
}
