//! SQLite persistence layer for keyed records
//!
//! One `records` table holds every collection. Each row stores its record as
//! a JSON document; merge-writes read, patch and upsert the document inside
//! a single `BEGIN IMMEDIATE` transaction, so concurrent writers queue on the
//! write lock instead of failing a deferred read-to-write upgrade.

use crate::database::{merge_fields, KeyedDatabase, PushIdGenerator, Record, RecordPath};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool},
    Row,
};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for the database write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite-backed keyed database
#[derive(Debug)]
pub struct SqliteDatabase {
    /// SQLite connection pool for the record database
    pool: SqlitePool,
    ids: PushIdGenerator,
}

impl SqliteDatabase {
    /// Wrap an existing pool; call `init_schema` before use
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            ids: PushIdGenerator::new(),
        }
    }

    /// Open (or create) the database file and initialize the schema
    pub async fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    anyhow::anyhow!("Failed to create database directory '{}': {}", parent.display(), e)
                })?;
            }
        }

        tracing::info!("🗄️ Opening record database: {}", db_path);

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePool::connect_with(options).await?;

        let db = Self::new(pool);
        db.init_schema().await?;
        Ok(db)
    }

    /// Create the records table
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                data JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All records of a collection, ordered by key (push ids sort by creation time)
    pub async fn list(&self, collection: &str) -> Result<Vec<(String, Record)>> {
        let rows = sqlx::query("SELECT key, data FROM records WHERE collection = ? ORDER BY key ASC")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("key");
            let data: String = row.get("data");
            records.push((key, serde_json::from_str(&data)?));
        }

        Ok(records)
    }
}

#[async_trait]
impl KeyedDatabase for SqliteDatabase {
    fn push_key(&self, _collection: &str) -> String {
        self.ids.next_id()
    }

    async fn update(&self, path: &str, fields: &Record) -> Result<()> {
        let path = RecordPath::parse(path)?;
        // Take the write lock before reading so two merges never both hold a
        // read lock and then deadlock on the upgrade
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let existing = sqlx::query("SELECT data FROM records WHERE collection = ? AND key = ?")
            .bind(path.collection)
            .bind(path.key)
            .fetch_optional(&mut *tx)
            .await?;

        let mut record: Record = match existing {
            Some(row) => {
                let data: String = row.get("data");
                serde_json::from_str(&data)?
            }
            None => Record::new(),
        };
        merge_fields(&mut record, fields);
        let data = serde_json::to_string(&record)?;

        sqlx::query(
            r#"
            INSERT INTO records (collection, key, data, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(collection, key) DO UPDATE SET
                data = excluded.data,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(path.collection)
        .bind(path.key)
        .bind(&data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Record>> {
        let path = RecordPath::parse(path)?;
        let row = sqlx::query("SELECT data FROM records WHERE collection = ? AND key = ?")
            .bind(path.collection)
            .bind(path.key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.get("data");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }
}
