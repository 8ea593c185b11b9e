//! Project writer: upload, persist, mirror
//!
//! Pipeline for one `add_project` call:
//! 1. copy the caller's fields, minus reserved names
//! 2. upload the image, if any, and record its URL as `imageURL`
//! 3. generate a key under the collection
//! 4. merge-write {id, ...fields, imageURL?} at {collection}/{key}
//! 5. append the same record to the project list
//!
//! Any failure stops the pipeline before step 5. Nothing is rolled back: an
//! uploaded image stays in the store and is reported on the error.

use crate::database::{validate_segment, KeyedDatabase};
use crate::error::{ProjectError, ProjectResult};
use crate::project::{list::ProjectList, types::NewProject, types::ProjectRecord};
use crate::storage::{ImageUploader, ProgressSender};
use std::sync::Arc;

/// Orchestrates image upload, database write and list append
#[derive(Clone)]
pub struct ProjectWriter {
    uploader: ImageUploader,
    database: Arc<dyn KeyedDatabase>,
    projects: Arc<ProjectList>,
    collection: String,
}

impl std::fmt::Debug for ProjectWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectWriter")
            .field("uploader", &self.uploader)
            .field("collection", &self.collection)
            .field("projects", &self.projects.len())
            .finish_non_exhaustive()
    }
}

impl ProjectWriter {
    /// Create a writer for `collection`
    ///
    /// Fails if the collection name is not a valid path segment, so a bad
    /// configuration is caught once instead of on every write.
    pub fn new(
        uploader: ImageUploader,
        database: Arc<dyn KeyedDatabase>,
        projects: Arc<ProjectList>,
        collection: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let collection = collection.into();
        validate_segment(&collection)
            .map_err(|e| anyhow::anyhow!("Invalid project collection '{}': {}", collection, e))?;

        Ok(Self {
            uploader,
            database,
            projects,
            collection,
        })
    }

    /// List this writer appends to
    pub fn projects(&self) -> &Arc<ProjectList> {
        &self.projects
    }

    /// Persist a project and mirror it into the list
    pub async fn add_project(&self, project: &NewProject) -> ProjectResult<ProjectRecord> {
        self.add_project_with_progress(project, ProgressSender::disconnected())
            .await
    }

    /// Same as `add_project`, reporting image upload progress on `progress`
    ///
    /// Without an image the sender is dropped unused and the stream ends
    /// without events.
    pub async fn add_project_with_progress(
        &self,
        project: &NewProject,
        progress: ProgressSender,
    ) -> ProjectResult<ProjectRecord> {
        let result = self.write(project, progress).await;
        if let Err(e) = &result {
            tracing::error!("Error adding project: {}", ErrorChain(e));
        }
        result
    }

    async fn write(&self, project: &NewProject, progress: ProgressSender) -> ProjectResult<ProjectRecord> {
        let fields = project.persistable_fields();

        let image_url = match project.image() {
            Some(image) => Some(self.uploader.upload(image, progress).await?),
            None => None,
        };

        let key = self.database.push_key(&self.collection);
        let path = format!("{}/{}", self.collection, key);
        let record = ProjectRecord::assemble(&key, fields, image_url);

        if let Err(source) = self.database.update(&path, record.fields()).await {
            return Err(ProjectError::Database {
                path,
                key,
                image_url: record.image_url().map(str::to_string),
                source,
            });
        }

        self.projects.append(record.clone());
        tracing::info!("Added project {}", path);

        Ok(record)
    }
}

/// Displays an error followed by its full source chain
struct ErrorChain<'a>(&'a ProjectError);

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(cause) = source {
            write!(f, ": {}", cause)?;
            source = std::error::Error::source(cause);
        }
        Ok(())
    }
}
