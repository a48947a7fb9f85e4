use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use backhouse_core::AccountId;

use crate::Role;

/// Claims carried by a short-lived access credential (signed with key A).
///
/// Decoded per request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject account.
    pub sub: AccountId,

    /// Role granted at issue time.
    pub role: Role,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl AccessClaims {
    /// Seconds of life left at `now`; zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.exp - now.timestamp()).max(0) as u64
    }
}

/// Claims carried by a renewal credential (signed with the distinct key B).
///
/// Carries no role: the role is re-read from the account at rotation time so a
/// role change takes effect on the next refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalClaims {
    pub sub: AccountId,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindowError {
    #[error("credential has expired")]
    Expired,

    #[error("credential not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid credential time window (exp <= iat)")]
    InvalidWindow,
}

/// Deterministically validate a credential's validity window.
///
/// A credential is accepted for every `now <= exp` and rejected strictly after.
/// Signature verification is the caller's concern.
pub fn validate_window(iat: i64, exp: i64, now: DateTime<Utc>) -> Result<(), TimeWindowError> {
    if exp <= iat {
        return Err(TimeWindowError::InvalidWindow);
    }
    let now = now.timestamp();
    if now < iat {
        return Err(TimeWindowError::NotYetValid);
    }
    if now > exp {
        return Err(TimeWindowError::Expired);
    }
    Ok(())
}

/// Three-way standing of an access credential.
///
/// Callers that care whether a credential is dead-by-expiry or dead-by-forgery
/// (logout does) branch on this data instead of catching decode errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStanding {
    /// Signature and window both check out.
    Valid(AccessClaims),

    /// Signature checks out but the window has closed.
    Expired(AccessClaims),

    /// Malformed, forged, or signed with the wrong key.
    Invalid,
}
