//! Redis-backed revocation store.
//!
//! Entries are plain keys with a server-side TTL (`SET ... EX`), so the store
//! self-expires each entry at the moment the credential it blocks dies.

use std::sync::Arc;

use async_trait::async_trait;

use backhouse_auth::{RevocationStore, RevocationStoreError};

/// Key prefix for revocation entries.
const REVOKED_KEY_PREFIX: &str = "backhouse:auth:revoked:";

#[derive(Debug, Clone)]
pub struct RedisRevocationStore {
    client: Arc<redis::Client>,
}

impl RedisRevocationStore {
    /// Create a store from a Redis connection URL (e.g. "redis://localhost:6379").
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, RevocationStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RevocationStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    fn key(credential: &str) -> String {
        format!("{REVOKED_KEY_PREFIX}{credential}")
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, RevocationStoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RevocationStoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(
        &self,
        credential: &str,
        remaining_ttl_secs: u64,
    ) -> Result<(), RevocationStoreError> {
        // A credential with no remaining lifetime needs no entry.
        if remaining_ttl_secs == 0 {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(Self::key(credential))
            .arg("1")
            .arg("EX")
            .arg(remaining_ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| RevocationStoreError::Unavailable(e.to_string()))
    }

    async fn is_revoked(&self, credential: &str) -> Result<bool, RevocationStoreError> {
        let mut conn = self.connection().await?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(credential))
            .query_async(&mut conn)
            .await
            .map_err(|e| RevocationStoreError::Unavailable(e.to_string()))?;
        Ok(exists)
    }
}
