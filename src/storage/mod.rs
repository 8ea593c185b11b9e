//! Object storage layer
//!
//! This module handles binary uploads for project images:
//! - `ObjectStore` trait: the seam to the remote blob service
//! - In-memory and S3-compatible backends
//! - Typed upload progress channel
//! - `ImageUploader`: path derivation, progress and URL resolution

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

// Upload progress channel (sender/stream pair)
pub mod progress;

// In-process blob store for tests and offline use
pub mod memory;

// S3-compatible backend built on aws-sdk-s3
pub mod s3;

// Image uploads with deterministic object paths
pub mod uploader;

pub use memory::MemoryObjectStore;
pub use progress::{progress_channel, ProgressSender, ProgressStream, UploadEvent};
pub use s3::S3ObjectStore;
pub use uploader::ImageUploader;

/// Remote blob store addressed by string paths
///
/// Implementations own their connection pooling and retry policy.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` at `path`, overwriting any existing object
    ///
    /// Progress is reported through `progress` at whatever granularity the
    /// backend supports.
    async fn put(&self, path: &str, data: Bytes, progress: &ProgressSender) -> Result<()>;

    /// Resolve a retrievable URL for the object at `path`
    async fn download_url(&self, path: &str) -> Result<String>;
}

/// A binary file handle supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Original file name; determines the object path
    pub name: String,
    /// File contents
    pub data: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Size of the file in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
