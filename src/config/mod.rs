//! Configuration management for projectdock
//!
//! Selects the object store and keyed database backends and carries the
//! path conventions (collection name, image prefix) used by the writer.

use serde::{Deserialize, Serialize};

/// Default database collection for project records
pub const DEFAULT_COLLECTION: &str = "projects";

/// Default object path prefix for uploaded project images
pub const DEFAULT_IMAGE_PREFIX: &str = "project_images";

/// Default upload chunk / multipart part size (8 MiB)
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

/// Default lifetime of presigned download URLs (7 days, the S3 maximum)
pub const DEFAULT_URL_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Object store configuration
    pub storage: StorageConfig,
    /// Keyed database configuration
    pub database: DatabaseConfig,
}

/// Object store configuration for project images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which object store backs image uploads
    pub backend: StorageBackend,
    /// Path prefix for uploaded images (e.g. "project_images")
    /// Objects land at: {image_prefix}/{file_name}
    pub image_prefix: String,
    /// Chunk size for progress reporting, and part size for multipart uploads
    pub part_size: usize,
}

/// Object store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process blob map, download URLs are {base_url}/{path}
    Memory { base_url: String },
    /// S3-compatible bucket
    S3(S3Config),
}

/// S3-compatible object store settings
#[derive(Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, Supabase, R2...)
    pub endpoint: Option<String>,
    /// Static credentials; the SDK default provider chain is used when absent
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Public base URL for download links. Presigned GET URLs are used when absent.
    pub public_base_url: Option<String>,
    /// Lifetime of presigned download URLs
    pub url_expiry_secs: u64,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<redacted>"))
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("public_base_url", &self.public_base_url)
            .field("url_expiry_secs", &self.url_expiry_secs)
            .finish()
    }
}

/// Keyed database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Which database stores project records
    pub backend: DatabaseBackend,
    /// Collection path for project records (records live at {collection}/{key})
    pub collection: String,
}

/// Keyed database backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseBackend {
    /// In-process record map
    Memory,
    /// SQLite file, created if missing
    Sqlite { path: String },
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    ///
    /// Without PROJECTDOCK_S3_BUCKET / PROJECTDOCK_SQLITE_PATH both backends
    /// fall back to their in-memory variants.
    fn default() -> Self {
        let storage_backend = match env_opt("PROJECTDOCK_S3_BUCKET") {
            Some(bucket) => StorageBackend::S3(S3Config {
                bucket,
                region: env_or("PROJECTDOCK_S3_REGION", "us-east-1"),
                endpoint: env_opt("PROJECTDOCK_S3_ENDPOINT"),
                access_key_id: env_opt("PROJECTDOCK_S3_ACCESS_KEY_ID"),
                secret_access_key: env_opt("PROJECTDOCK_S3_SECRET_ACCESS_KEY"),
                public_base_url: env_opt("PROJECTDOCK_S3_PUBLIC_URL"),
                url_expiry_secs: env_parse("PROJECTDOCK_S3_URL_EXPIRY_SECS", DEFAULT_URL_EXPIRY_SECS),
            }),
            None => StorageBackend::Memory {
                base_url: env_or("PROJECTDOCK_MEMORY_BASE_URL", "memory://projectdock"),
            },
        };

        let database_backend = match env_opt("PROJECTDOCK_SQLITE_PATH") {
            Some(path) => DatabaseBackend::Sqlite { path },
            None => DatabaseBackend::Memory,
        };

        Self {
            storage: StorageConfig {
                backend: storage_backend,
                image_prefix: env_or("PROJECTDOCK_IMAGE_PREFIX", DEFAULT_IMAGE_PREFIX),
                part_size: env_parse("PROJECTDOCK_PART_SIZE", DEFAULT_PART_SIZE),
            },
            database: DatabaseConfig {
                backend: database_backend,
                collection: env_or("PROJECTDOCK_COLLECTION", DEFAULT_COLLECTION),
            },
        }
    }
}

impl Config {
    /// Fully in-memory configuration, ignoring the environment
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory {
                    base_url: "memory://projectdock".to_string(),
                },
                image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
                part_size: DEFAULT_PART_SIZE,
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                collection: DEFAULT_COLLECTION.to_string(),
            },
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_config_uses_default_paths() {
        let config = Config::in_memory();
        assert_eq!(config.database.collection, "projects");
        assert_eq!(config.storage.image_prefix, "project_images");
        assert!(matches!(config.database.backend, DatabaseBackend::Memory));
        assert!(matches!(config.storage.backend, StorageBackend::Memory { .. }));
    }

    #[test]
    fn backends_deserialize_from_tagged_json() {
        let json = serde_json::json!({
            "storage": {
                "backend": { "kind": "memory", "base_url": "https://store" },
                "image_prefix": "imgs",
                "part_size": 1024
            },
            "database": {
                "backend": { "kind": "sqlite", "path": "data/projects.db" },
                "collection": "projects"
            }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.storage.part_size, 1024);
        match config.database.backend {
            DatabaseBackend::Sqlite { path } => assert_eq!(path, "data/projects.db"),
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[test]
    fn s3_debug_redacts_credentials() {
        let s3 = S3Config {
            bucket: "b".into(),
            region: "r".into(),
            endpoint: None,
            access_key_id: Some("AKIA-SECRET".into()),
            secret_access_key: Some("very-secret".into()),
            public_base_url: None,
            url_expiry_secs: 60,
        };
        let rendered = format!("{:?}", s3);
        assert!(!rendered.contains("AKIA-SECRET"));
        assert!(!rendered.contains("very-secret"));
    }
}
