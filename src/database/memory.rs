//! In-process keyed database

use crate::database::{merge_fields, KeyedDatabase, PushIdGenerator, Record, RecordPath};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Record map keyed by collection, then key
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    collections: RwLock<HashMap<String, BTreeMap<String, Record>>>,
    ids: PushIdGenerator,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of a collection in key order
    pub async fn list(&self, collection: &str) -> Vec<(String, Record)> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|records| records.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KeyedDatabase for MemoryDatabase {
    fn push_key(&self, _collection: &str) -> String {
        self.ids.next_id()
    }

    async fn update(&self, path: &str, fields: &Record) -> Result<()> {
        let path = RecordPath::parse(path)?;
        let mut collections = self.collections.write().await;
        let record = collections
            .entry(path.collection.to_string())
            .or_default()
            .entry(path.key.to_string())
            .or_default();
        merge_fields(record, fields);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Record>> {
        let path = RecordPath::parse(path)?;
        Ok(self
            .collections
            .read()
            .await
            .get(path.collection)
            .and_then(|records| records.get(path.key))
            .cloned())
    }
}
