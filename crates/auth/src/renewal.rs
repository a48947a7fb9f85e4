//! Renewal registry: the per-account single slot holding the digest of the one
//! currently valid renewal credential.
//!
//! Two concurrent logins for the same account race on the slot overwrite; the
//! last write wins and the loser's renewal credential silently stops validating
//! on its next refresh. This is a known simplification: multi-device concurrent
//! sessions are out of scope.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use sha2::{Digest, Sha256};
use thiserror::Error;

use backhouse_core::AccountId;

use crate::{CredentialConfig, CredentialIssuer, IssueError, RenewalClaims, Role, validate_window};

/// One-way, non-salted digest of a raw renewal credential.
///
/// The credential's own entropy and signature make salting unnecessary.
pub fn renewal_digest(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotStoreError {
    #[error("account not found")]
    NotFound,

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// The slice of an account record the registry needs for rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalSlot {
    pub hash: Option<String>,
    pub role: Role,
    pub active: bool,
}

/// Port onto the account store's renewal-hash slot.
///
/// `load_slot` returning `Ok(None)` means the account does not exist.
#[async_trait]
pub trait RenewalSlotStore: Send + Sync {
    async fn load_slot(&self, account: AccountId) -> Result<Option<RenewalSlot>, SlotStoreError>;

    async fn store_renewal_hash(
        &self,
        account: AccountId,
        hash: Option<String>,
    ) -> Result<(), SlotStoreError>;
}

#[derive(Debug, Error)]
pub enum RenewalError {
    /// The renewal credential is forged, expired, or no longer the registered
    /// one for its subject. The caller cannot tell which.
    #[error("invalid refresh credential")]
    InvalidRefreshCredential,

    #[error("account store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Signing(#[from] IssueError),
}

/// Validates renewal credentials against the stored slot and mints replacement
/// access credentials. Handles are injected at construction and owned by
/// process bootstrap; there is no ambient global state.
pub struct RenewalRegistry {
    slots: Arc<dyn RenewalSlotStore>,
    issuer: Arc<CredentialIssuer>,
    renewal_decoding: DecodingKey,
    store_timeout: StdDuration,
}

impl RenewalRegistry {
    pub fn new(
        config: &CredentialConfig,
        issuer: Arc<CredentialIssuer>,
        slots: Arc<dyn RenewalSlotStore>,
        store_timeout: StdDuration,
    ) -> Self {
        Self {
            slots,
            issuer,
            renewal_decoding: DecodingKey::from_secret(config.renewal_key()),
            store_timeout,
        }
    }

    /// Record the digest of a freshly issued renewal credential, overwriting
    /// any previous slot content for the account.
    pub async fn record(&self, account: AccountId, raw_renewal: &str) -> Result<(), RenewalError> {
        let digest = renewal_digest(raw_renewal);
        self.bounded(self.slots.store_renewal_hash(account, Some(digest)))
            .await?
            .map_err(slot_error)
    }

    /// Exchange a renewal credential for a fresh access credential.
    ///
    /// The renewal credential itself is not replaced; its digest must still
    /// match the account's slot and the account must be active. The role is
    /// read from the slot so role changes take effect on the next rotation.
    pub async fn rotate_access(
        &self,
        raw_renewal: &str,
        now: DateTime<Utc>,
    ) -> Result<String, RenewalError> {
        let claims = self
            .decode(raw_renewal)
            .ok_or(RenewalError::InvalidRefreshCredential)?;
        validate_window(claims.iat, claims.exp, now)
            .map_err(|_| RenewalError::InvalidRefreshCredential)?;

        let slot = self
            .bounded(self.slots.load_slot(claims.sub))
            .await?
            .map_err(slot_error)?
            .ok_or(RenewalError::InvalidRefreshCredential)?;

        let digest = renewal_digest(raw_renewal);
        if !slot.active || slot.hash.as_deref() != Some(digest.as_str()) {
            return Err(RenewalError::InvalidRefreshCredential);
        }

        Ok(self.issuer.mint_access(claims.sub, slot.role, now)?)
    }

    /// Empty the account's slot, invalidating every outstanding renewal
    /// credential. Used by logout and password change. Idempotent: clearing a
    /// missing account is not an error.
    pub async fn clear(&self, account: AccountId) -> Result<(), RenewalError> {
        match self
            .bounded(self.slots.store_renewal_hash(account, None))
            .await?
        {
            Ok(()) | Err(SlotStoreError::NotFound) => Ok(()),
            Err(e) => Err(slot_error(e)),
        }
    }

    /// Identify the subject of a renewal credential on signature alone.
    ///
    /// Logout uses this so an expired-but-genuine credential still clears its
    /// slot; a forged credential identifies nobody.
    pub fn subject(&self, raw_renewal: &str) -> Option<AccountId> {
        self.decode(raw_renewal).map(|claims| claims.sub)
    }

    fn decode(&self, raw: &str) -> Option<RenewalClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        jsonwebtoken::decode::<RenewalClaims>(raw, &self.renewal_decoding, &validation)
            .ok()
            .map(|data| data.claims)
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, SlotStoreError>>,
    ) -> Result<Result<T, SlotStoreError>, RenewalError> {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .map_err(|_| RenewalError::StoreUnavailable("account store round-trip timed out".into()))
    }
}

fn slot_error(e: SlotStoreError) -> RenewalError {
    match e {
        // An unknown subject is reported exactly like a stale credential.
        SlotStoreError::NotFound => RenewalError::InvalidRefreshCredential,
        SlotStoreError::Unavailable(msg) => RenewalError::StoreUnavailable(msg),
    }
}
