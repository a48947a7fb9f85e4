//! In-memory account store for dev/test.
//!
//! A single `RwLock` write section per operation gives the same atomic
//! single-key read/modify/write guarantee the persistent adapters provide.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use backhouse_accounts::{Account, AccountPage, AccountStore, AccountStoreError};
use backhouse_auth::{RenewalSlot, RenewalSlotStore, SlotStoreError};
use backhouse_core::AccountId;

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<AccountId, Account>>, AccountStoreError> {
        self.inner
            .read()
            .map_err(|_| AccountStoreError::Unavailable("account store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<AccountId, Account>>, AccountStoreError> {
        self.inner
            .write()
            .map_err(|_| AccountStoreError::Unavailable("account store lock poisoned".into()))
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<(), AccountStoreError> {
        let mut map = self.write()?;
        if map.values().any(|a| a.email == account.email) {
            return Err(AccountStoreError::EmailTaken);
        }
        map.insert(account.id, account);
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, AccountStoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, AccountStoreError> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .read()?
            .values()
            .find(|a| a.email.as_str() == needle)
            .cloned())
    }

    async fn update(&self, account: Account) -> Result<(), AccountStoreError> {
        let mut map = self.write()?;
        if !map.contains_key(&account.id) {
            return Err(AccountStoreError::NotFound);
        }
        if map
            .values()
            .any(|a| a.id != account.id && a.email == account.email)
        {
            return Err(AccountStoreError::EmailTaken);
        }
        map.insert(account.id, account);
        Ok(())
    }

    async fn remove(&self, id: AccountId) -> Result<(), AccountStoreError> {
        let mut map = self.write()?;
        map.remove(&id).ok_or(AccountStoreError::NotFound)?;
        Ok(())
    }

    async fn count_other_active_admins(
        &self,
        exclude: AccountId,
    ) -> Result<usize, AccountStoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|a| a.id != exclude && a.active && a.role.is_admin())
            .count())
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<AccountPage, AccountStoreError> {
        let map = self.read()?;
        let mut items: Vec<Account> = map.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(AccountPage { items, total })
    }
}

#[async_trait]
impl RenewalSlotStore for InMemoryAccountStore {
    async fn load_slot(&self, account: AccountId) -> Result<Option<RenewalSlot>, SlotStoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| SlotStoreError::Unavailable("account store lock poisoned".into()))?;
        Ok(map.get(&account).map(|a| RenewalSlot {
            hash: a.renewal_hash.clone(),
            role: a.role,
            active: a.active,
        }))
    }

    async fn store_renewal_hash(
        &self,
        account: AccountId,
        hash: Option<String>,
    ) -> Result<(), SlotStoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| SlotStoreError::Unavailable("account store lock poisoned".into()))?;
        let record = map.get_mut(&account).ok_or(SlotStoreError::NotFound)?;
        record.renewal_hash = hash;
        Ok(())
    }
}
