use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::{
    AccessClaims, AuthorizationContext, CredentialConfig, CredentialStanding, RevocationStore,
    TimeWindowError, validate_window,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// No bearer credential was supplied with the request.
    #[error("no bearer credential supplied")]
    Missing,

    /// Signature failure, malformed structure, or expired window.
    #[error("credential is invalid or expired")]
    Invalid,

    /// The credential was explicitly revoked before its natural expiry.
    #[error("credential has been revoked")]
    Revoked,

    /// The revocation store could not answer in time. Callers must treat the
    /// request as unauthenticated (fail closed), never skip the check.
    #[error("revocation store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Validates inbound access credentials.
///
/// All checks except the revocation lookup are CPU-only; the lookup is the
/// single blocking round-trip on the verification path and runs under a
/// bounded timeout.
pub struct CredentialVerifier {
    access_decoding: DecodingKey,
    revocations: Arc<dyn RevocationStore>,
    lookup_timeout: StdDuration,
}

impl CredentialVerifier {
    pub fn new(
        config: &CredentialConfig,
        revocations: Arc<dyn RevocationStore>,
        lookup_timeout: StdDuration,
    ) -> Self {
        Self {
            access_decoding: DecodingKey::from_secret(config.access_key()),
            revocations,
            lookup_timeout,
        }
    }

    /// Verify an access credential and derive the request's context.
    ///
    /// Check order: signature/structure, validity window, revocation.
    pub async fn verify(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationContext, VerifyError> {
        let claims = match self.standing(raw, now) {
            CredentialStanding::Valid(claims) => claims,
            CredentialStanding::Expired(_) | CredentialStanding::Invalid => {
                return Err(VerifyError::Invalid);
            }
        };

        let lookup = tokio::time::timeout(self.lookup_timeout, self.revocations.is_revoked(raw));
        let revoked = match lookup.await {
            Ok(Ok(revoked)) => revoked,
            Ok(Err(e)) => return Err(VerifyError::StoreUnavailable(e.to_string())),
            Err(_) => {
                return Err(VerifyError::StoreUnavailable(
                    "revocation lookup timed out".to_string(),
                ));
            }
        };
        if revoked {
            return Err(VerifyError::Revoked);
        }

        Ok(AuthorizationContext::from(&claims))
    }

    /// CPU-only three-way standing of an access credential.
    ///
    /// Used by logout to distinguish "already expired" from "invalid" without
    /// exception-style control flow. Does not consult the revocation store.
    pub fn standing(&self, raw: &str, now: DateTime<Utc>) -> CredentialStanding {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let decoded =
            jsonwebtoken::decode::<AccessClaims>(raw, &self.access_decoding, &validation);
        let claims = match decoded {
            Ok(data) => data.claims,
            Err(_) => return CredentialStanding::Invalid,
        };

        match validate_window(claims.iat, claims.exp, now) {
            Ok(()) => CredentialStanding::Valid(claims),
            Err(TimeWindowError::Expired) => CredentialStanding::Expired(claims),
            Err(_) => CredentialStanding::Invalid,
        }
    }
}
