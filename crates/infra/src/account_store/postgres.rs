//! Postgres-backed account store.
//!
//! One row per account; the renewal slot is the nullable `renewal_hash`
//! column on the same row (no separate credential table). Every operation is
//! a single statement, so partial failure cannot leave a half-applied record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use backhouse_accounts::{Account, AccountPage, AccountStore, AccountStoreError};
use backhouse_auth::{RenewalSlot, RenewalSlotStore, Role, SlotStoreError};
use backhouse_core::{AccountId, EmailAddress};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id            UUID PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,
    active        BOOLEAN NOT NULL,
    renewal_hash  TEXT NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
)
"#;

pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the accounts table if it does not exist (idempotent).
    pub async fn ensure_schema(&self) -> Result<(), AccountStoreError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn insert(&self, account: Account) -> Result<(), AccountStoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, name, email, password_hash, role, active, renewal_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.active)
        .bind(&account.renewal_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, AccountStoreError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        row.map(|r| account_from_row(&r)).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, AccountStoreError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        row.map(|r| account_from_row(&r)).transpose()
    }

    async fn update(&self, account: Account) -> Result<(), AccountStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET name = $2, email = $3, password_hash = $4, role = $5,
                active = $6, renewal_hash = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.active)
        .bind(&account.renewal_hash)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountStoreError::NotFound);
        }
        Ok(())
    }

    async fn remove(&self, id: AccountId) -> Result<(), AccountStoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(AccountStoreError::NotFound);
        }
        Ok(())
    }

    async fn count_other_active_admins(
        &self,
        exclude: AccountId,
    ) -> Result<usize, AccountStoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM accounts WHERE role = 'admin' AND active AND id <> $1",
        )
        .bind(*exclude.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        let n: i64 = row.try_get("n").map_err(unavailable)?;
        Ok(n as usize)
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<AccountPage, AccountStoreError> {
        let rows = sqlx::query(
            "SELECT * FROM accounts ORDER BY created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        let total_row = sqlx::query("SELECT COUNT(*) AS n FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        let total: i64 = total_row.try_get("n").map_err(unavailable)?;

        let items = rows
            .iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AccountPage {
            items,
            total: total as u64,
        })
    }
}

#[async_trait]
impl RenewalSlotStore for PostgresAccountStore {
    async fn load_slot(&self, account: AccountId) -> Result<Option<RenewalSlot>, SlotStoreError> {
        let row = sqlx::query("SELECT renewal_hash, role, active FROM accounts WHERE id = $1")
            .bind(*account.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SlotStoreError::Unavailable(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row
            .try_get("role")
            .map_err(|e| SlotStoreError::Unavailable(e.to_string()))?;
        let role: Role = role
            .parse()
            .map_err(|_| SlotStoreError::Unavailable(format!("corrupt role for {account}")))?;

        Ok(Some(RenewalSlot {
            hash: row
                .try_get("renewal_hash")
                .map_err(|e| SlotStoreError::Unavailable(e.to_string()))?,
            role,
            active: row
                .try_get("active")
                .map_err(|e| SlotStoreError::Unavailable(e.to_string()))?,
        }))
    }

    async fn store_renewal_hash(
        &self,
        account: AccountId,
        hash: Option<String>,
    ) -> Result<(), SlotStoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET renewal_hash = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(*account.as_uuid())
        .bind(&hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| SlotStoreError::Unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SlotStoreError::NotFound);
        }
        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, AccountStoreError> {
    let email: String = row.try_get("email").map_err(unavailable)?;
    let email = EmailAddress::parse(&email)
        .map_err(|e| AccountStoreError::Unavailable(format!("corrupt email column: {e}")))?;

    let role: String = row.try_get("role").map_err(unavailable)?;
    let role: Role = role
        .parse()
        .map_err(|_| AccountStoreError::Unavailable(format!("corrupt role column '{role}'")))?;

    let id: uuid::Uuid = row.try_get("id").map_err(unavailable)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(unavailable)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(unavailable)?;

    Ok(Account {
        id: AccountId::from_uuid(id),
        name: row.try_get("name").map_err(unavailable)?,
        email,
        password_hash: row.try_get("password_hash").map_err(unavailable)?,
        role,
        active: row.try_get("active").map_err(unavailable)?,
        renewal_hash: row.try_get("renewal_hash").map_err(unavailable)?,
        created_at,
        updated_at,
    })
}

fn unavailable(e: impl core::fmt::Display) -> AccountStoreError {
    AccountStoreError::Unavailable(e.to_string())
}

fn write_error(e: sqlx::Error) -> AccountStoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AccountStoreError::EmailTaken;
        }
    }
    AccountStoreError::Unavailable(e.to_string())
}
