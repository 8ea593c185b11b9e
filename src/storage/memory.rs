//! In-process object store
//!
//! Keeps blobs in a map behind a tokio RwLock. Writes are split into
//! `chunk_size` pieces so progress behaves like a streamed upload.

use crate::storage::{ObjectStore, ProgressSender};
use anyhow::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Blob store held entirely in memory
#[derive(Debug)]
pub struct MemoryObjectStore {
    /// Object path -> contents
    objects: RwLock<HashMap<String, Bytes>>,
    /// Prefix for generated download URLs
    base_url: String,
    /// Bytes written per progress step
    chunk_size: usize,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read back a stored object
    pub async fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.read().await.get(path).cloned()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, data: Bytes, progress: &ProgressSender) -> Result<()> {
        let total = data.len() as u64;
        let mut buffer = BytesMut::with_capacity(data.len());

        progress.report(0, total);
        for chunk in data.chunks(self.chunk_size) {
            buffer.extend_from_slice(chunk);
            progress.report(buffer.len() as u64, total);
            tokio::task::yield_now().await;
        }
        if data.is_empty() {
            progress.report(0, 0);
        }

        self.objects
            .write()
            .await
            .insert(path.to_string(), buffer.freeze());

        tracing::debug!("Stored {} bytes at {}", total, path);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        if !self.objects.read().await.contains_key(path) {
            return Err(anyhow::anyhow!("Object not found: {}", path));
        }
        Ok(format!("{}/{}", self.base_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{progress_channel, UploadEvent};

    #[tokio::test]
    async fn put_reports_progress_per_chunk() {
        let store = MemoryObjectStore::new("https://store/", 4);
        let (sender, stream) = progress_channel();

        store
            .put("project_images/pic.png", Bytes::from_static(b"0123456789"), &sender)
            .await
            .unwrap();
        drop(sender);

        let events = stream.collect().await;
        assert_eq!(
            events,
            vec![
                UploadEvent::Progress(0.0),
                UploadEvent::Progress(40.0),
                UploadEvent::Progress(80.0),
                UploadEvent::Progress(100.0),
            ]
        );
        assert_eq!(
            store.get("project_images/pic.png").await,
            Some(Bytes::from_static(b"0123456789"))
        );
    }

    #[tokio::test]
    async fn same_path_overwrites() {
        let store = MemoryObjectStore::new("https://store", 1024);
        let progress = ProgressSender::disconnected();

        store.put("a/pic.png", Bytes::from_static(b"old"), &progress).await.unwrap();
        store.put("a/pic.png", Bytes::from_static(b"new"), &progress).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("a/pic.png").await, Some(Bytes::from_static(b"new")));
        assert_eq!(
            store.download_url("a/pic.png").await.unwrap(),
            "https://store/a/pic.png"
        );
    }

    #[tokio::test]
    async fn download_url_requires_object() {
        let store = MemoryObjectStore::new("https://store", 1024);
        assert!(store.download_url("missing.png").await.is_err());
    }
}
