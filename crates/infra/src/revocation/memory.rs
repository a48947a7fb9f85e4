//! In-memory TTL revocation store for dev/test.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use backhouse_auth::{RevocationStore, RevocationStoreError};

/// Maps raw credential strings to expiry deadlines. Expired entries are
/// dropped lazily on access, matching the self-expiry of the Redis adapter.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    inner: Mutex<HashMap<String, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Instant>>, RevocationStoreError> {
        self.inner
            .lock()
            .map_err(|_| RevocationStoreError::Unavailable("revocation store lock poisoned".into()))
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(
        &self,
        credential: &str,
        remaining_ttl_secs: u64,
    ) -> Result<(), RevocationStoreError> {
        // A credential with no remaining lifetime needs no entry.
        if remaining_ttl_secs == 0 {
            return Ok(());
        }
        let deadline = Instant::now() + Duration::from_secs(remaining_ttl_secs);
        self.lock()?.insert(credential.to_string(), deadline);
        Ok(())
    }

    async fn is_revoked(&self, credential: &str) -> Result<bool, RevocationStoreError> {
        let mut map = self.lock()?;
        let now = Instant::now();
        map.retain(|_, deadline| *deadline > now);
        Ok(map.contains_key(credential))
    }
}
