//! Image uploads for project records
//!
//! The object path is a pure function of the file name:
//! {prefix}/{file_name}. Uploading two files with the same name overwrites
//! the first one.

use crate::error::{ProjectError, ProjectResult};
use crate::storage::{ImageFile, ObjectStore, ProgressSender};
use std::sync::Arc;

/// Uploads images and resolves their download URLs
#[derive(Clone)]
pub struct ImageUploader {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl std::fmt::Debug for ImageUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUploader")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ImageUploader {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Object path an image with this file name is stored at
    pub fn object_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.prefix, file_name)
    }

    /// Upload `image` and return its download URL
    ///
    /// The progress sender is consumed: it receives `Progress` events while
    /// the store writes, then `Completed` or `Failed`, then the stream closes.
    pub async fn upload(&self, image: &ImageFile, progress: ProgressSender) -> ProjectResult<String> {
        let path = self.object_path(&image.name);

        match self.try_upload(image, &path, &progress).await {
            Ok(url) => {
                tracing::info!("Uploaded image {} ({} bytes)", path, image.len());
                progress.complete(&url);
                Ok(url)
            }
            Err(source) => {
                progress.fail(&format!("{:#}", source));
                Err(ProjectError::Upload { path, source })
            }
        }
    }

    async fn try_upload(&self, image: &ImageFile, path: &str, progress: &ProgressSender) -> anyhow::Result<String> {
        if image.name.trim().is_empty() {
            return Err(anyhow::anyhow!("Image file has no name"));
        }

        self.store.put(path, image.data.clone(), progress).await?;
        self.store.download_url(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{progress_channel, MemoryObjectStore, UploadEvent};
    use anyhow::Result;
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Store whose writes always fail
    struct UnreachableStore;

    #[async_trait]
    impl ObjectStore for UnreachableStore {
        async fn put(&self, _path: &str, _data: Bytes, progress: &ProgressSender) -> Result<()> {
            progress.report(1, 4);
            Err(anyhow::anyhow!("connection reset"))
        }

        async fn download_url(&self, _path: &str) -> Result<String> {
            unreachable!("download_url after failed put")
        }
    }

    /// Store reporting out-of-order and out-of-range progress
    struct JitteryStore;

    #[async_trait]
    impl ObjectStore for JitteryStore {
        async fn put(&self, _path: &str, _data: Bytes, progress: &ProgressSender) -> Result<()> {
            for transferred in [10u64, 5, 60, 40, 120, 100] {
                progress.report(transferred, 100);
            }
            Ok(())
        }

        async fn download_url(&self, path: &str) -> Result<String> {
            Ok(format!("https://store/{}", path))
        }
    }

    #[tokio::test]
    async fn upload_uses_prefixed_path_and_returns_url() {
        let store = Arc::new(MemoryObjectStore::new("https://store", 2));
        let uploader = ImageUploader::new(store.clone(), "project_images/");
        let (sender, stream) = progress_channel();

        let url = uploader
            .upload(&ImageFile::new("pic.png", &b"png!"[..]), sender)
            .await
            .unwrap();

        assert_eq!(url, "https://store/project_images/pic.png");
        assert_eq!(
            store.get("project_images/pic.png").await,
            Some(Bytes::from_static(b"png!"))
        );

        let events = stream.collect().await;
        assert_eq!(
            events.last(),
            Some(&UploadEvent::Completed { url: url.clone() })
        );
    }

    #[tokio::test]
    async fn progress_values_are_monotonic_and_bounded() {
        let uploader = ImageUploader::new(Arc::new(JitteryStore), "project_images");
        let (sender, stream) = progress_channel();

        uploader
            .upload(&ImageFile::new("pic.png", vec![0u8; 100]), sender)
            .await
            .unwrap();

        let values: Vec<f64> = stream
            .collect()
            .await
            .into_iter()
            .filter_map(|event| match event {
                UploadEvent::Progress(value) => Some(value),
                _ => None,
            })
            .collect();

        assert_eq!(values, vec![10.0, 60.0, 100.0]);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[tokio::test]
    async fn failed_upload_terminates_stream_with_error() {
        let uploader = ImageUploader::new(Arc::new(UnreachableStore), "project_images");
        let (sender, stream) = progress_channel();

        let err = uploader
            .upload(&ImageFile::new("pic.png", &b"data"[..]), sender)
            .await
            .unwrap_err();

        match &err {
            ProjectError::Upload { path, .. } => assert_eq!(path, "project_images/pic.png"),
            other => panic!("expected upload error, got {:?}", other),
        }

        let events = stream.collect().await;
        assert_eq!(events.first(), Some(&UploadEvent::Progress(25.0)));
        assert!(matches!(events.last(), Some(UploadEvent::Failed { error }) if error.contains("connection reset")));
    }

    #[tokio::test]
    async fn empty_file_name_is_rejected_before_store_call() {
        let store = Arc::new(MemoryObjectStore::new("https://store", 16));
        let uploader = ImageUploader::new(store.clone(), "project_images");

        let result = uploader
            .upload(&ImageFile::new("", &b"data"[..]), ProgressSender::disconnected())
            .await;

        assert!(matches!(result, Err(ProjectError::Upload { .. })));
        assert!(store.is_empty().await);
    }
}
