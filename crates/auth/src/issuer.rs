use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use thiserror::Error;

use backhouse_core::AccountId;

use crate::{AccessClaims, RenewalClaims, Role};

/// Signing material and lifetimes for both credential types.
///
/// The two keys must differ: a compromise of one signing key must not allow
/// forging the other credential type.
#[derive(Clone)]
pub struct CredentialConfig {
    access_key: Vec<u8>,
    renewal_key: Vec<u8>,
    access_ttl: Duration,
    renewal_ttl: Duration,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialConfigError {
    #[error("signing keys must be non-empty")]
    EmptyKey,

    #[error("access and renewal signing keys must differ")]
    SharedKey,

    #[error("access credential lifetime must be shorter than renewal lifetime")]
    InvertedLifetimes,
}

impl CredentialConfig {
    pub fn new(
        access_key: impl Into<Vec<u8>>,
        renewal_key: impl Into<Vec<u8>>,
        access_ttl_secs: i64,
        renewal_ttl_secs: i64,
    ) -> Result<Self, CredentialConfigError> {
        let access_key = access_key.into();
        let renewal_key = renewal_key.into();

        if access_key.is_empty() || renewal_key.is_empty() {
            return Err(CredentialConfigError::EmptyKey);
        }
        if access_key == renewal_key {
            return Err(CredentialConfigError::SharedKey);
        }
        if access_ttl_secs <= 0 || access_ttl_secs >= renewal_ttl_secs {
            return Err(CredentialConfigError::InvertedLifetimes);
        }

        Ok(Self {
            access_key,
            renewal_key,
            access_ttl: Duration::seconds(access_ttl_secs),
            renewal_ttl: Duration::seconds(renewal_ttl_secs),
        })
    }

    pub fn access_key(&self) -> &[u8] {
        &self.access_key
    }

    pub fn renewal_key(&self) -> &[u8] {
        &self.renewal_key
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn renewal_ttl(&self) -> Duration {
        self.renewal_ttl
    }
}

impl core::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("access_ttl", &self.access_ttl)
            .field("renewal_ttl", &self.renewal_ttl)
            .finish_non_exhaustive()
    }
}

/// A freshly minted access/renewal credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: String,
    pub renewal: String,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("credential signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Mints signed credentials. Pure: deterministic given subject, role, `now`
/// and the signing keys; persistence of the renewal digest is the caller's
/// responsibility ([`crate::RenewalRegistry::record`]).
pub struct CredentialIssuer {
    access_encoding: EncodingKey,
    renewal_encoding: EncodingKey,
    access_ttl: Duration,
    renewal_ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(config: &CredentialConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_key()),
            renewal_encoding: EncodingKey::from_secret(config.renewal_key()),
            access_ttl: config.access_ttl(),
            renewal_ttl: config.renewal_ttl(),
        }
    }

    /// Mint a full credential pair for a login or registration.
    pub fn issue(
        &self,
        subject: AccountId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<CredentialPair, IssueError> {
        let access = self.mint_access(subject, role, now)?;

        let renewal_claims = RenewalClaims {
            sub: subject,
            iat: now.timestamp(),
            exp: (now + self.renewal_ttl).timestamp(),
        };
        let renewal = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &renewal_claims,
            &self.renewal_encoding,
        )?;

        Ok(CredentialPair { access, renewal })
    }

    /// Mint an access credential only (the refresh path).
    pub fn mint_access(
        &self,
        subject: AccountId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        let claims = AccessClaims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access_encoding,
        )?)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }
}
