//! Keyed database layer
//!
//! Records are JSON objects stored at {collection}/{key}. Writes are
//! merge-patches, not overwrites:
//! - a top-level field in the patch replaces the stored field
//! - a `null` field removes the stored field
//! - fields missing from the patch are left alone

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

// Time-ordered unique key generation
pub mod push_id;

// In-process record map
pub mod memory;

// SQLite persistence with sqlx
pub mod sqlite;

pub use memory::MemoryDatabase;
pub use push_id::PushIdGenerator;
pub use sqlite::SqliteDatabase;

/// A JSON object record
pub type Record = Map<String, Value>;

/// Remote database storing JSON records under generated keys
#[async_trait]
pub trait KeyedDatabase: Send + Sync {
    /// Generate a fresh key under `collection` without writing anything
    fn push_key(&self, collection: &str) -> String;

    /// Merge `fields` into the record at `path`, creating it if absent
    async fn update(&self, path: &str, fields: &Record) -> Result<()>;

    /// Read the record at `path`
    async fn get(&self, path: &str) -> Result<Option<Record>>;
}

/// A parsed {collection}/{key} record path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPath<'a> {
    pub collection: &'a str,
    pub key: &'a str,
}

impl<'a> RecordPath<'a> {
    /// Parse and validate a record path
    ///
    /// Exactly two non-empty segments are accepted; segments may not contain
    /// '.', '#', '$', '[' or ']'.
    pub fn parse(path: &'a str) -> Result<Self> {
        let trimmed = path.trim_matches('/');
        let (collection, key) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("Invalid record path '{}': expected collection/key", path))?;

        for segment in [collection, key] {
            validate_segment(segment)
                .map_err(|e| anyhow::anyhow!("Invalid record path '{}': {}", path, e))?;
        }

        Ok(Self { collection, key })
    }
}

/// Validate a single path segment
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(anyhow::anyhow!("empty path segment"));
    }
    if let Some(c) = segment.chars().find(|c| matches!(c, '.' | '#' | '$' | '[' | ']' | '/')) {
        return Err(anyhow::anyhow!("segment '{}' contains forbidden character '{}'", segment, c));
    }
    Ok(())
}

/// Apply a merge-patch to a stored record
pub fn merge_fields(target: &mut Record, patch: &Record) {
    for (field, value) in patch {
        if value.is_null() {
            target.remove(field);
        } else {
            target.insert(field.clone(), value.clone());
        }
    }
}
