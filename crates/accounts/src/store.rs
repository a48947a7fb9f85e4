//! Account store port.
//!
//! Implementations live in `backhouse-infra`. Every operation is a single
//! atomic key read/modify/write on the backing store; cross-request
//! coordination happens there, never through in-process locks shared between
//! requests.

use async_trait::async_trait;
use thiserror::Error;

use backhouse_core::AccountId;

use crate::Account;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountStoreError {
    /// The email address is already registered to another account.
    #[error("email already registered")]
    EmailTaken,

    #[error("account not found")]
    NotFound,

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// One page of an account listing.
#[derive(Debug, Clone)]
pub struct AccountPage {
    pub items: Vec<Account>,
    pub total: u64,
}

/// Persistence port for account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new record; fails with [`AccountStoreError::EmailTaken`] if
    /// the email is already registered.
    async fn insert(&self, account: Account) -> Result<(), AccountStoreError>;

    async fn get(&self, id: AccountId) -> Result<Option<Account>, AccountStoreError>;

    /// Lookup by (lowercased) email address.
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, AccountStoreError>;

    /// Replace the stored record wholesale. Fails with `NotFound` for unknown
    /// ids and `EmailTaken` when an email change collides.
    async fn update(&self, account: Account) -> Result<(), AccountStoreError>;

    async fn remove(&self, id: AccountId) -> Result<(), AccountStoreError>;

    /// Count active admin accounts other than `exclude`. Feeds the last-admin
    /// guard on deactivation, demotion and deletion.
    async fn count_other_active_admins(&self, exclude: AccountId)
    -> Result<usize, AccountStoreError>;

    /// List accounts ordered by creation time, newest first.
    async fn list(&self, offset: u64, limit: u64) -> Result<AccountPage, AccountStoreError>;
}
