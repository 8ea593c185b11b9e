//! S3-compatible object store
//!
//! Small bodies go through a single PutObject. Bodies larger than the part
//! size use a multipart upload, reporting progress after every part and
//! aborting the upload if any part fails.

use crate::config::S3Config;
use crate::storage::{ObjectStore, ProgressSender};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::ops::Range;
use std::time::Duration;

/// S3 rejects non-final multipart parts smaller than 5 MiB
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Build an S3 client with retry and timeout policy
pub async fn init_s3_client(config: &S3Config) -> Result<Client> {
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let retry_config = RetryConfig::standard()
        .with_max_attempts(5)
        .with_initial_backoff(Duration::from_millis(100))
        .with_max_backoff(Duration::from_secs(5));

    let timeout_config = TimeoutConfig::builder()
        .operation_timeout(Duration::from_secs(3600))
        .operation_attempt_timeout(Duration::from_secs(300))
        .build();

    let mut builder = S3ConfigBuilder::from(&shared)
        .retry_config(retry_config)
        .timeout_config(timeout_config);

    if let Some(endpoint) = &config.endpoint {
        // S3-compatible services generally don't support virtual-hosted buckets
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    if let (Some(access_key_id), Some(secret_access_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None, // session token
            None, // expiration
            "projectdock",
        );
        builder = builder.credentials_provider(credentials);
    }

    Ok(Client::from_conf(builder.build()))
}

/// Object store backed by an S3 bucket
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    part_size: usize,
    public_base_url: Option<String>,
    url_expiry: Duration,
}

impl S3ObjectStore {
    /// Wrap an existing client
    pub fn new(client: Client, config: &S3Config, part_size: usize) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            part_size: part_size.max(MIN_PART_SIZE),
            public_base_url: config
                .public_base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            url_expiry: Duration::from_secs(config.url_expiry_secs),
        }
    }

    /// Build the client from config and wrap it
    pub async fn connect(config: &S3Config, part_size: usize) -> Result<Self> {
        let client = init_s3_client(config).await?;
        tracing::info!("Connected S3 object store for bucket '{}'", config.bucket);
        Ok(Self::new(client, config, part_size))
    }

    async fn put_multipart(&self, path: &str, data: Bytes, progress: &ProgressSender) -> Result<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .with_context(|| format!("CreateMultipartUpload failed for '{}'", path))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| anyhow::anyhow!("CreateMultipartUpload returned no upload id for '{}'", path))?
            .to_string();

        let parts = match self.upload_parts(path, &upload_id, &data, progress).await {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(path)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!("Failed to abort multipart upload {} for '{}': {}", upload_id, path, abort_err);
                }
                return Err(e);
            }
        };

        let completed = CompletedMultipartUpload::builder().set_parts(Some(parts)).build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .upload_id(&upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .with_context(|| format!("CompleteMultipartUpload failed for '{}'", path))?;

        Ok(())
    }

    async fn upload_parts(
        &self,
        path: &str,
        upload_id: &str,
        data: &Bytes,
        progress: &ProgressSender,
    ) -> Result<Vec<CompletedPart>> {
        let total = data.len() as u64;
        let mut parts = Vec::new();

        for (index, range) in part_ranges(data.len(), self.part_size).into_iter().enumerate() {
            let part_number = (index + 1) as i32;
            let end = range.end as u64;

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(path)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(data.slice(range)))
                .send()
                .await
                .with_context(|| format!("UploadPart {} failed for '{}'", part_number, path))?;

            let e_tag = output
                .e_tag()
                .ok_or_else(|| anyhow::anyhow!("UploadPart {} returned no ETag for '{}'", part_number, path))?;

            parts.push(
                CompletedPart::builder()
                    .e_tag(e_tag)
                    .part_number(part_number)
                    .build(),
            );
            progress.report(end, total);
        }

        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, path: &str, data: Bytes, progress: &ProgressSender) -> Result<()> {
        let total = data.len() as u64;
        progress.report(0, total);

        if data.len() > self.part_size {
            self.put_multipart(path, data, progress).await?;
        } else {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(path)
                .body(ByteStream::from(data))
                .send()
                .await
                .with_context(|| format!("PutObject failed for '{}'", path))?;
            progress.report(total, total);
        }

        tracing::debug!("Uploaded {} bytes to s3://{}/{}", total, self.bucket, path);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        if let Some(base) = &self.public_base_url {
            return Ok(public_url(base, path));
        }

        let presigning = PresigningConfig::expires_in(self.url_expiry)
            .context("Invalid presigned URL expiry")?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .with_context(|| format!("Presigning GET failed for '{}'", path))?;

        Ok(request.uri().to_string())
    }
}

/// Split `len` bytes into consecutive ranges of at most `part_size`
fn part_ranges(len: usize, part_size: usize) -> Vec<Range<usize>> {
    let part_size = part_size.max(1);
    (0..len)
        .step_by(part_size)
        .map(|start| start..(start + part_size).min(len))
        .collect()
}

fn public_url(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_ranges_cover_body_exactly() {
        assert_eq!(part_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert_eq!(part_ranges(8, 4), vec![0..4, 4..8]);
        assert!(part_ranges(0, 4).is_empty());
    }

    #[test]
    fn public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("https://cdn.example.com", "/project_images/pic.png"),
            "https://cdn.example.com/project_images/pic.png"
        );
    }
}
