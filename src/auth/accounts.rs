// Credential store - account rows behind a trait so the saga and login
// can be exercised against any backing store.
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::db::models::{Account, AccountId};
use crate::db::{is_constraint_violation, StoreError};
use crate::state::DbPool;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub identity: String,
    pub handle: String,
    pub email: Option<String>,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. A taken identity is reported as `Conflict`.
    async fn insert(&self, account: &NewAccount) -> Result<AccountId, StoreError>;

    /// Activate or deactivate an account. Returns false if no such account.
    async fn set_active(&self, id: AccountId, active: bool) -> Result<bool, StoreError>;
}

pub type DynCredentialStore = Arc<dyn CredentialStore>;

pub struct SqliteCredentialStore {
    pool: DbPool,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, identity, handle, email, password_hash, is_active, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        identity: row.get(1)?,
        handle: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.pool.get()?;
        let account = conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE identity = ?1"),
                params![identity],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let conn = self.pool.get()?;
        let account = conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    async fn insert(&self, account: &NewAccount) -> Result<AccountId, StoreError> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO accounts (identity, handle, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![
                account.identity,
                account.handle,
                account.email,
                account.password_hash
            ],
        );

        match result {
            Ok(_) => Ok(AccountId(conn.last_insert_rowid())),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::Conflict(format!(
                "identity {} is already registered",
                account.identity
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_active(&self, id: AccountId, active: bool) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE accounts SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(rows > 0)
    }
}
