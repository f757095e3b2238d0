// Profile store - the social service's per-account profile records.
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::models::{AccountId, Profile, ProfileId};
use crate::db::StoreError;
use crate::state::DbPool;

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
}

impl ProfileUpdate {
    fn assignments(&self) -> Vec<(&'static str, &str)> {
        [
            ("full_name", &self.full_name),
            ("bio", &self.bio),
            ("location", &self.location),
            ("birth_date", &self.birth_date),
            ("gender", &self.gender),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.as_deref().map(|v| (column, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create the account's profile unless one exists. Returns whether a
    /// row was inserted; repeated calls for the same account are no-ops.
    async fn create_if_absent(
        &self,
        account_id: AccountId,
        full_name: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn find_by_account(&self, account_id: AccountId)
        -> Result<Option<Profile>, StoreError>;

    async fn find_by_id(&self, profile_id: ProfileId) -> Result<Option<Profile>, StoreError>;

    /// Returns false when the account has no profile.
    async fn update(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<bool, StoreError>;

    async fn set_photo(&self, account_id: AccountId, photo: &str) -> Result<bool, StoreError>;
}

pub type DynProfileStore = Arc<dyn ProfileStore>;

pub struct SqliteProfileStore {
    pool: DbPool,
}

impl SqliteProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str =
    "id, account_id, full_name, bio, location, birth_date, gender, photo, created_at";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        profile_id: row.get(0)?,
        account_id: row.get(1)?,
        full_name: row.get(2)?,
        bio: row.get(3)?,
        location: row.get(4)?,
        birth_date: row.get(5)?,
        gender: row.get(6)?,
        photo: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn create_if_absent(
        &self,
        account_id: AccountId,
        full_name: Option<&str>,
    ) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "INSERT INTO profiles (account_id, full_name) VALUES (?1, ?2)
             ON CONFLICT(account_id) DO NOTHING",
            params![account_id, full_name],
        )?;
        Ok(rows > 0)
    }

    async fn find_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Profile>, StoreError> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE account_id = ?1"),
                params![account_id],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    async fn find_by_id(&self, profile_id: ProfileId) -> Result<Option<Profile>, StoreError> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![profile_id],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    async fn update(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<bool, StoreError> {
        let assignments = update.assignments();
        if assignments.is_empty() {
            return Ok(false);
        }

        // Column names come from the fixed list above, never from input
        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE profiles SET {} WHERE account_id = ?{}",
            set_clause,
            assignments.len() + 1
        );

        let mut values: Vec<&dyn ToSql> = assignments
            .iter()
            .map(|(_, value)| value as &dyn ToSql)
            .collect();
        values.push(&account_id);

        let conn = self.pool.get()?;
        let rows = conn.execute(&sql, values.as_slice())?;
        Ok(rows > 0)
    }

    async fn set_photo(&self, account_id: AccountId, photo: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE profiles SET photo = ?1 WHERE account_id = ?2",
            params![photo, account_id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn store() -> (SqliteProfileStore, tempfile::TempDir) {
        let (pool, tmp) = db::test_pool();
        (SqliteProfileStore::new(pool), tmp)
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let (store, _tmp) = store();

        assert!(store
            .create_if_absent(AccountId(1), Some("Alice"))
            .await
            .unwrap());
        assert!(!store
            .create_if_absent(AccountId(1), Some("Someone Else"))
            .await
            .unwrap());

        let profile = store.find_by_account(AccountId(1)).await.unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn lookups_by_profile_and_account_are_separate() {
        let (store, _tmp) = store();

        // Account 2 gets profile 1, account 1 gets profile 2: the key
        // spaces overlap numerically but must never be conflated.
        store.create_if_absent(AccountId(2), Some("Bob")).await.unwrap();
        store
            .create_if_absent(AccountId(1), Some("Alice"))
            .await
            .unwrap();

        let bob = store.find_by_account(AccountId(2)).await.unwrap().unwrap();
        let alice = store.find_by_account(AccountId(1)).await.unwrap().unwrap();
        assert_eq!(bob.profile_id, ProfileId(1));
        assert_eq!(alice.profile_id, ProfileId(2));

        let by_profile = store.find_by_id(ProfileId(1)).await.unwrap().unwrap();
        assert_eq!(by_profile.full_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn update_only_touches_supplied_fields() {
        let (store, _tmp) = store();
        store
            .create_if_absent(AccountId(1), Some("Alice"))
            .await
            .unwrap();

        let update = ProfileUpdate {
            bio: Some("Loves hiking".into()),
            location: Some("Lisbon".into()),
            ..Default::default()
        };
        assert!(store.update(AccountId(1), &update).await.unwrap());

        let profile = store.find_by_account(AccountId(1)).await.unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Alice"));
        assert_eq!(profile.bio.as_deref(), Some("Loves hiking"));
        assert_eq!(profile.location.as_deref(), Some("Lisbon"));
        assert!(profile.gender.is_none());
    }

    #[tokio::test]
    async fn update_without_profile_reports_false() {
        let (store, _tmp) = store();
        let update = ProfileUpdate {
            bio: Some("x".into()),
            ..Default::default()
        };
        assert!(!store.update(AccountId(5), &update).await.unwrap());
    }

    #[test]
    fn empty_update_detected() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            gender: Some("f".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[tokio::test]
    async fn set_photo_records_reference() {
        let (store, _tmp) = store();
        store.create_if_absent(AccountId(1), None).await.unwrap();
        assert!(store
            .set_photo(AccountId(1), "/uploads/a.png")
            .await
            .unwrap());
        let profile = store.find_by_account(AccountId(1)).await.unwrap().unwrap();
        assert_eq!(profile.photo.as_deref(), Some("/uploads/a.png"));
    }
}
