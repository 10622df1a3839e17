//! SQLite storage for provider records.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{DataError, DataResult};
use crate::models::{NewProviderRecord, ProviderRecord};
use crate::store::ProviderStore;

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

const RECORD_COLUMNS: &str = "id, user_id, provider_name, api_key_encrypted, nonce, created_at";

/// SQLite database holding the `providers` table.
pub struct ProviderDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl ProviderDatabase {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> DataResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DataError::Config(format!("cannot create {}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> DataResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> DataResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DataError::Lock(format!("failed to acquire lock: {e}")))
    }

    /// Run database migrations.
    fn migrate(&self) -> DataResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Migration(format!("failed to acquire lock: {e}")))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );
            if current_version < 1 {
                Self::migration_v1(&conn)?;
            }
        }

        Ok(())
    }

    /// Migration to version 1: providers table.
    fn migration_v1(conn: &Connection) -> DataResult<()> {
        debug!("Running migration v1: providers");

        conn.execute(
            "CREATE TABLE IF NOT EXISTS providers (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                provider_name TEXT NOT NULL,
                api_key_encrypted TEXT NOT NULL,
                nonce TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, provider_name)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_providers_user
             ON providers(user_id)",
            [],
        )?;

        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;

        info!("Migration v1 completed");
        Ok(())
    }

    /// All records owned by `user_id`, oldest first.
    pub fn records_for_user(&self, user_id: &str) -> DataResult<Vec<ProviderRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM providers WHERE user_id = ?1 ORDER BY rowid"
        ))?;
        let records = stmt
            .query_map(params![user_id], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Point lookup by owner and provider name.
    pub fn record(&self, user_id: &str, provider_name: &str) -> DataResult<Option<ProviderRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM providers
                     WHERE user_id = ?1 AND provider_name = ?2"
                ),
                params![user_id, provider_name],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Insert a record, replacing the credential when the pair already exists.
    pub fn upsert_record(&self, record: &NewProviderRecord) -> DataResult<ProviderRecord> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO providers (id, user_id, provider_name, api_key_encrypted, nonce, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id, provider_name) DO UPDATE SET
                api_key_encrypted = excluded.api_key_encrypted,
                nonce = excluded.nonce",
            params![
                uuid::Uuid::new_v4().to_string(),
                record.user_id,
                record.provider_name,
                record.api_key_encrypted,
                record.nonce,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let stored = conn.query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM providers
                 WHERE user_id = ?1 AND provider_name = ?2"
            ),
            params![record.user_id, record.provider_name],
            row_to_record,
        )?;
        debug!(user_id = %record.user_id, provider = %record.provider_name, "provider record upserted");
        Ok(stored)
    }

    /// Delete records matching owner and provider name.
    pub fn delete_record(&self, user_id: &str, provider_name: &str) -> DataResult<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM providers WHERE user_id = ?1 AND provider_name = ?2",
            params![user_id, provider_name],
        )?;
        Ok(deleted)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ProviderRecord> {
    let created_at: String = row.get(5)?;
    Ok(ProviderRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider_name: row.get(2)?,
        api_key_encrypted: row.get(3)?,
        nonce: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait]
impl ProviderStore for ProviderDatabase {
    async fn select_by_owner(&self, user_id: &str) -> DataResult<Vec<ProviderRecord>> {
        self.records_for_user(user_id)
    }

    async fn find(
        &self,
        user_id: &str,
        provider_name: &str,
    ) -> DataResult<Option<ProviderRecord>> {
        self.record(user_id, provider_name)
    }

    async fn upsert(&self, record: NewProviderRecord) -> DataResult<ProviderRecord> {
        self.upsert_record(&record)
    }

    async fn delete(&self, user_id: &str, provider_name: &str) -> DataResult<usize> {
        self.delete_record(user_id, provider_name)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory_migrates() {
        let db = ProviderDatabase::open_in_memory().unwrap();
        assert!(db.records_for_user("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_upsert_and_lookup() {
        let db = ProviderDatabase::open_in_memory().unwrap();
        let stored = db
            .upsert_record(&NewProviderRecord::new("u-1", "openai", "sk-one"))
            .unwrap();
        assert_eq!(stored.user_id, "u-1");
        assert_eq!(stored.api_key_encrypted, "sk-one");

        let found = db.record("u-1", "openai").unwrap().unwrap();
        assert_eq!(found, stored);
        assert!(db.record("u-2", "openai").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_credential_on_conflict() {
        let db = ProviderDatabase::open_in_memory().unwrap();
        let first = db
            .upsert_record(&NewProviderRecord::new("u-1", "openai", "sk-one"))
            .unwrap();
        let second = db
            .upsert_record(&NewProviderRecord::new("u-1", "openai", "sk-two"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.api_key_encrypted, "sk-two");
        assert_eq!(db.records_for_user("u-1").unwrap().len(), 1);
    }

    #[test]
    fn test_records_scoped_and_ordered() {
        let db = ProviderDatabase::open_in_memory().unwrap();
        for name in ["stripe", "openai", "twilio"] {
            db.upsert_record(&NewProviderRecord::new("u-1", name, "key"))
                .unwrap();
        }
        db.upsert_record(&NewProviderRecord::new("u-2", "anthropic", "key"))
            .unwrap();

        let names: Vec<_> = db
            .records_for_user("u-1")
            .unwrap()
            .into_iter()
            .map(|r| r.provider_name)
            .collect();
        assert_eq!(names, vec!["stripe", "openai", "twilio"]);
    }

    #[test]
    fn test_delete_record() {
        let db = ProviderDatabase::open_in_memory().unwrap();
        db.upsert_record(&NewProviderRecord::new("u-1", "openai", "key"))
            .unwrap();
        assert_eq!(db.delete_record("u-1", "openai").unwrap(), 1);
        assert_eq!(db.delete_record("u-1", "openai").unwrap(), 0);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("pulse.db");
        {
            let db = ProviderDatabase::open(&path).unwrap();
            db.upsert_record(&NewProviderRecord::new("u-1", "openai", "key"))
                .unwrap();
        }
        let db = ProviderDatabase::open(&path).unwrap();
        assert_eq!(db.records_for_user("u-1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_trait_roundtrip() {
        let db = ProviderDatabase::open_in_memory().unwrap();
        let store: &dyn ProviderStore = &db;
        store
            .upsert(NewProviderRecord::new("u-1", "anthropic", "key"))
            .await
            .unwrap();
        assert!(store.find("u-1", "anthropic").await.unwrap().is_some());
        assert_eq!(store.delete("u-1", "anthropic").await.unwrap(), 1);
        assert!(store.select_by_owner("u-1").await.unwrap().is_empty());
        assert_eq!(store.name(), "sqlite");
    }
}
