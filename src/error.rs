//! Error types surfaced by the project pipeline
//!
//! Backends report failures as `anyhow::Error`; the writer classifies them
//! into upload and database failures without discarding the original cause.

use thiserror::Error;

/// Failure of an `add_project` call or an image upload
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Object store write or download URL resolution failed
    #[error("image upload to '{path}' failed")]
    Upload {
        /// Object path the image was written to
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Merge-write of the record failed
    ///
    /// `image_url` is set when the image was already uploaded; that object is
    /// left in the store and nothing references it.
    #[error("database write to '{path}' failed")]
    Database {
        /// Record path ({collection}/{key})
        path: String,
        /// Generated key that was never committed
        key: String,
        /// Orphaned image, if one was uploaded before the failure
        image_url: Option<String>,
        #[source]
        source: anyhow::Error,
    },
}

impl ProjectError {
    /// URL of an uploaded image left behind by a failed database write
    pub fn orphaned_image_url(&self) -> Option<&str> {
        match self {
            Self::Database { image_url, .. } => image_url.as_deref(),
            Self::Upload { .. } => None,
        }
    }
}

pub type ProjectResult<T> = std::result::Result<T, ProjectError>;
