//! Record store implementation.
//!
//! Provides a SQLite-backed store of JSON records grouped in collections.
//! Each trait call runs under the connection lock, and multi-statement calls
//! run inside a transaction, so read-modify-write sequences on a collection
//! never interleave with another call from this process.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::key::RecordKey;

/// Errors that can occur during record storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Key {key} already exists in '{collection}' (held by '{existing}')")]
    DuplicateKey {
        collection: Collection,
        key: RecordKey,
        existing: String,
    },

    #[error("No record for '{identifier}' in '{collection}'")]
    NotFound {
        collection: Collection,
        identifier: String,
    },

    #[error("Storage path error: {0}")]
    PathError(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A stored record.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub key: RecordKey,
    /// Identifier the key was derived from
    pub identifier: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Deserialize the record value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

/// Record storage trait for abstraction over storage backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::DuplicateKey`] when the
    /// derived key is taken.
    async fn add(
        &self,
        collection: Collection,
        identifier: &str,
        value: &serde_json::Value,
    ) -> Result<RecordKey>;

    /// Get a record. A miss is `Ok(None)`.
    async fn get(&self, collection: Collection, identifier: &str) -> Result<Option<Record>>;

    /// All records of a collection in insertion order.
    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>>;

    /// Replace the value of an existing record, keeping its key and position.
    /// Fails with [`StoreError::NotFound`] when the record does not exist.
    async fn update(
        &self,
        collection: Collection,
        identifier: &str,
        value: &serde_json::Value,
    ) -> Result<()>;

    /// Remove a record. Returns whether a record was removed.
    async fn delete(&self, collection: Collection, identifier: &str) -> Result<bool>;

    /// Number of records in a collection.
    async fn count(&self, collection: Collection) -> Result<usize>;
}

/// Typed helpers over any [`RecordStore`].
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    async fn add_json<T: Serialize + Sync>(
        &self,
        collection: Collection,
        identifier: &str,
        value: &T,
    ) -> Result<RecordKey> {
        let value = serde_json::to_value(value)?;
        self.add(collection, identifier, &value).await
    }

    async fn get_as<T: DeserializeOwned + Send>(
        &self,
        collection: Collection,
        identifier: &str,
    ) -> Result<Option<T>> {
        match self.get(collection, identifier).await? {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    async fn get_all_as<T: DeserializeOwned + Send>(&self, collection: Collection) -> Result<Vec<T>> {
        self.get_all(collection)
            .await?
            .iter()
            .map(Record::decode)
            .collect()
    }

    async fn update_json<T: Serialize + Sync>(
        &self,
        collection: Collection,
        identifier: &str,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.update(collection, identifier, &value).await
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

/// SQLite-backed record storage.
pub struct SqliteRecordStore {
    /// Database connection
    conn: Mutex<Connection>,
    /// Database file, `None` for in-memory stores
    db_path: Option<PathBuf>,
}

impl SqliteRecordStore {
    /// Database file name inside the data directory.
    pub const DB_FILE: &'static str = "records.db";

    /// Create or open the store in `base_dir`.
    ///
    /// Creates the directory and runs migrations if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;

        let db_path = base_dir.join(Self::DB_FILE);
        let conn = Connection::open(&db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.run_migrations()?;

        Ok(store)
    }

    /// Open store at the default data directory.
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| StoreError::PathError("Could not find data directory".into()))?
            .join("azlaunch");
        Self::new(data_dir)
    }

    /// A store that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Path of the database file, if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            debug!("Applying record store migration 001");
            conn.execute_batch(include_str!("../migrations/001_initial.sql"))?;
        }

        Ok(())
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn key_param(key: RecordKey) -> i64 {
        i64::from(key.value())
    }

    fn build_record(row: RawRecord) -> Result<Record> {
        let (key, identifier, value, created_at, updated_at) = row;
        Ok(Record {
            key: RecordKey::from_raw(key as u32),
            identifier,
            value: serde_json::from_str(&value)?,
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
        })
    }
}

type RawRecord = (i64, String, String, String, String);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn add(
        &self,
        collection: Collection,
        identifier: &str,
        value: &serde_json::Value,
    ) -> Result<RecordKey> {
        let key = RecordKey::derive(identifier);
        let json = serde_json::to_string(value)?;
        let now = Self::format_datetime(&Utc::now());

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT identifier FROM records WHERE collection = ?1 AND record_key = ?2",
                params![collection.as_str(), Self::key_param(key)],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing) = existing {
            if existing != identifier {
                warn!(
                    collection = %collection,
                    key = %key,
                    identifier,
                    existing = %existing,
                    "Record key collision between distinct identifiers"
                );
            }
            return Err(StoreError::DuplicateKey {
                collection,
                key,
                existing,
            });
        }

        tx.execute(
            r#"
            INSERT INTO records (collection, record_key, identifier, value, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![collection.as_str(), Self::key_param(key), identifier, json, now],
        )?;
        tx.commit()?;

        debug!(collection = %collection, key = %key, "Record added");
        Ok(key)
    }

    async fn get(&self, collection: Collection, identifier: &str) -> Result<Option<Record>> {
        let key = RecordKey::derive(identifier);
        let conn = self.conn.lock();

        let raw = conn
            .query_row(
                r#"
                SELECT record_key, identifier, value, created_at, updated_at
                FROM records WHERE collection = ?1 AND record_key = ?2
                "#,
                params![collection.as_str(), Self::key_param(key)],
                read_raw,
            )
            .optional()?;

        raw.map(Self::build_record).transpose()
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT record_key, identifier, value, created_at, updated_at
            FROM records WHERE collection = ?1
            ORDER BY seq ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![collection.as_str()], read_raw)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::build_record).collect()
    }

    async fn update(
        &self,
        collection: Collection,
        identifier: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let key = RecordKey::derive(identifier);
        let json = serde_json::to_string(value)?;
        let conn = self.conn.lock();

        let rows = conn.execute(
            "UPDATE records SET value = ?3, updated_at = ?4 WHERE collection = ?1 AND record_key = ?2",
            params![
                collection.as_str(),
                Self::key_param(key),
                json,
                Self::format_datetime(&Utc::now())
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound {
                collection,
                identifier: identifier.to_string(),
            });
        }

        debug!(collection = %collection, key = %key, "Record updated");
        Ok(())
    }

    async fn delete(&self, collection: Collection, identifier: &str) -> Result<bool> {
        let key = RecordKey::derive(identifier);
        let conn = self.conn.lock();

        let rows = conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND record_key = ?2",
            params![collection.as_str(), Self::key_param(key)],
        )?;

        if rows > 0 {
            debug!(collection = %collection, key = %key, "Record deleted");
        }
        Ok(rows > 0)
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteRecordStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteRecordStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let (store, _tmp) = create_test_store();

        let key = store
            .add(Collection::Accounts, "u1", &json!({ "uuid": "u1", "name": "Steve" }))
            .await
            .unwrap();
        assert_eq!(key, RecordKey::derive("u1"));

        let record = store.get(Collection::Accounts, "u1").await.unwrap().unwrap();
        assert_eq!(record.identifier, "u1");
        assert_eq!(record.value["name"], "Steve");
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let store = SqliteRecordStore::in_memory().unwrap();
        assert!(store.get(Collection::Accounts, "nobody").await.unwrap().is_none());
        assert!(store.get(Collection::Ram, "1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_add_fails() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.add(Collection::Accounts, "u3", &json!({ "uuid": "u3" })).await.unwrap();

        let err = store
            .add(Collection::Accounts, "u3", &json!({ "uuid": "u3", "name": "again" }))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());

        // The first value is untouched.
        let record = store.get(Collection::Accounts, "u3").await.unwrap().unwrap();
        assert!(record.value.get("name").is_none());
    }

    #[tokio::test]
    async fn test_same_identifier_in_other_collection() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.add(Collection::Ram, "1234", &json!({ "ramMin": "2" })).await.unwrap();
        store.add(Collection::Screen, "1234", &json!({ "screen": {} })).await.unwrap();
        assert_eq!(store.count(Collection::Ram).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Screen).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order() {
        let store = SqliteRecordStore::in_memory().unwrap();
        // Keys of these identifiers are not in insertion order.
        for id in ["zeta", "alpha", "mid"] {
            store.add(Collection::Accounts, id, &json!({ "uuid": id })).await.unwrap();
        }

        let all = store.get_all(Collection::Accounts).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_update_replaces_value_in_place() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.add(Collection::Accounts, "a", &json!({ "uuid": "a", "token": "old" })).await.unwrap();
        store.add(Collection::Accounts, "b", &json!({ "uuid": "b" })).await.unwrap();

        store
            .update(Collection::Accounts, "a", &json!({ "uuid": "a", "token": "new" }))
            .await
            .unwrap();

        let all = store.get_all(Collection::Accounts).await.unwrap();
        assert_eq!(all[0].identifier, "a");
        assert_eq!(all[0].value["token"], "new");
    }

    #[tokio::test]
    async fn test_update_replaces_whole_value() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .add(Collection::AccountsSelected, "1234", &json!({ "uuid": "1234", "selected": "u1" }))
            .await
            .unwrap();
        store
            .update(Collection::AccountsSelected, "1234", &json!({ "uuid": "1234" }))
            .await
            .unwrap();

        let record = store.get(Collection::AccountsSelected, "1234").await.unwrap().unwrap();
        assert!(record.value.get("selected").is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let err = store
            .update(Collection::Accounts, "ghost", &json!({ "uuid": "ghost" }))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.count(Collection::Accounts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_noop_when_absent() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.add(Collection::Accounts, "u1", &json!({ "uuid": "u1" })).await.unwrap();

        assert!(store.delete(Collection::Accounts, "u1").await.unwrap());
        assert!(!store.delete(Collection::Accounts, "u1").await.unwrap());
        assert!(store.get(Collection::Accounts, "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        #[derive(Debug, PartialEq, serde::Deserialize, Serialize)]
        struct Ram {
            #[serde(rename = "ramMin")]
            min: String,
        }

        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .add_json(Collection::Ram, "1234", &Ram { min: "2".into() })
            .await
            .unwrap();
        store
            .update_json(Collection::Ram, "1234", &Ram { min: "3".into() })
            .await
            .unwrap();

        let ram: Option<Ram> = store.get_as(Collection::Ram, "1234").await.unwrap();
        assert_eq!(ram, Some(Ram { min: "3".into() }));
        let all: Vec<Ram> = store.get_all_as(Collection::Ram).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = SqliteRecordStore::new(temp_dir.path()).unwrap();
            store.add(Collection::Accounts, "u1", &json!({ "uuid": "u1" })).await.unwrap();
            assert!(store.path().unwrap().ends_with(SqliteRecordStore::DB_FILE));
        }

        let store = SqliteRecordStore::new(temp_dir.path()).unwrap();
        let all = store.get_all(Collection::Accounts).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].key, RecordKey::derive("u1"));
    }
}
