//! Infrastructure wiring: stores, issuer, verifier, registry.
//!
//! Every handle is constructed here at bootstrap and injected into the
//! components that need it; nothing reaches for ambient global state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backhouse_accounts::{AccountStore, AccountStoreError};
use backhouse_auth::{
    CredentialIssuer, CredentialVerifier, RenewalRegistry, RenewalSlotStore, RevocationStore,
};
use backhouse_infra::{InMemoryAccountStore, InMemoryRevocationStore};

use crate::app::errors::ApiError;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<dyn AccountStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub issuer: Arc<CredentialIssuer>,
    pub verifier: Arc<CredentialVerifier>,
    pub registry: Arc<RenewalRegistry>,
    store_timeout: Duration,
}

impl AppServices {
    /// Run an account-store round-trip under the configured bound.
    ///
    /// On timeout the operation is abandoned; every store write is a single
    /// idempotent key update, so an abandoned request leaves no half-applied
    /// change.
    pub async fn store_op<T>(
        &self,
        op: impl Future<Output = Result<T, AccountStoreError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(ApiError::internal("account store round-trip timed out")),
        }
    }
}

/// Build the service graph from configuration.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let credential_config = config.credential_config()?;
    let issuer = Arc::new(CredentialIssuer::new(&credential_config));
    let store_timeout = config.store_timeout();

    let (accounts, slots, revocations): (
        Arc<dyn AccountStore>,
        Arc<dyn RenewalSlotStore>,
        Arc<dyn RevocationStore>,
    ) = if config.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            build_persistent_stores(config).await?
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
            build_in_memory_stores()
        }
    } else {
        build_in_memory_stores()
    };

    let verifier = Arc::new(CredentialVerifier::new(
        &credential_config,
        revocations.clone(),
        store_timeout,
    ));
    let registry = Arc::new(RenewalRegistry::new(
        &credential_config,
        issuer.clone(),
        slots,
        store_timeout,
    ));

    Ok(AppServices {
        accounts,
        revocations,
        issuer,
        verifier,
        registry,
        store_timeout,
    })
}

fn build_in_memory_stores() -> (
    Arc<dyn AccountStore>,
    Arc<dyn RenewalSlotStore>,
    Arc<dyn RevocationStore>,
) {
    let accounts = Arc::new(InMemoryAccountStore::new());
    (
        accounts.clone(),
        accounts,
        Arc::new(InMemoryRevocationStore::new()),
    )
}

#[cfg(feature = "redis")]
async fn build_persistent_stores(
    config: &AppConfig,
) -> anyhow::Result<(
    Arc<dyn AccountStore>,
    Arc<dyn RenewalSlotStore>,
    Arc<dyn RevocationStore>,
)> {
    use backhouse_infra::{PostgresAccountStore, RedisRevocationStore};
    use sqlx::PgPool;

    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set when USE_PERSISTENT_STORES=true"))?;

    let pool = PgPool::connect(&database_url).await?;
    let accounts = Arc::new(PostgresAccountStore::new(pool));
    accounts.ensure_schema().await?;

    let revocations = Arc::new(RedisRevocationStore::new(&config.redis_url)?);

    Ok((accounts.clone(), accounts, revocations))
}
