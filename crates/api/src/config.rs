//! Process configuration, read once at bootstrap and injected downward.
//!
//! No component reads the environment after startup; everything receives its
//! handles and settings from here.

use backhouse_auth::{CredentialConfig, issuer::CredentialConfigError};

/// Default access-credential lifetime: 15 minutes.
const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

/// Default renewal-credential lifetime: 7 days.
const DEFAULT_RENEWAL_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Default bound on any single store round-trip.
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub access_signing_key: String,
    pub renewal_signing_key: String,
    pub access_ttl_secs: i64,
    pub renewal_ttl_secs: i64,
    pub store_timeout_ms: u64,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub redis_url: String,
}

impl AppConfig {
    /// Read configuration from the environment, with insecure-but-workable
    /// development defaults for the signing keys.
    pub fn from_env() -> Self {
        let access_signing_key = std::env::var("ACCESS_SIGNING_KEY").unwrap_or_else(|_| {
            tracing::warn!("ACCESS_SIGNING_KEY not set; using insecure dev default");
            "dev-access-secret".to_string()
        });
        let renewal_signing_key = std::env::var("RENEWAL_SIGNING_KEY").unwrap_or_else(|_| {
            tracing::warn!("RENEWAL_SIGNING_KEY not set; using insecure dev default");
            "dev-renewal-secret".to_string()
        });

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            access_signing_key,
            renewal_signing_key,
            access_ttl_secs: env_i64("ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            renewal_ttl_secs: env_i64("RENEWAL_TTL_SECS", DEFAULT_RENEWAL_TTL_SECS),
            store_timeout_ms: env_i64("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS as i64) as u64,
            use_persistent_stores: std::env::var("USE_PERSISTENT_STORES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        }
    }

    /// Signing keys and lifetimes for the credential subsystem.
    pub fn credential_config(&self) -> Result<CredentialConfig, CredentialConfigError> {
        CredentialConfig::new(
            self.access_signing_key.as_bytes(),
            self.renewal_signing_key.as_bytes(),
            self.access_ttl_secs,
            self.renewal_ttl_secs,
        )
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
