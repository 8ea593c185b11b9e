//! Application setup and initialization
//!
//! Wires together all components: object store, keyed database, project list
//! and writer. The `App` is the composition root that owns the reactive list;
//! UI code subscribes through it instead of through a global.

use crate::{
    config::{Config, DatabaseBackend, StorageBackend},
    database::{KeyedDatabase, MemoryDatabase, SqliteDatabase},
    error::ProjectResult,
    project::{NewProject, ProjectList, ProjectListSubscription, ProjectRecord, ProjectWriter},
    storage::{ImageUploader, MemoryObjectStore, ObjectStore, ProgressSender, S3ObjectStore},
};
use anyhow::Result;
use std::sync::Arc;

/// Fully wired project pipeline
#[derive(Clone)]
pub struct App {
    config: Config,
    store: Arc<dyn ObjectStore>,
    database: Arc<dyn KeyedDatabase>,
    projects: Arc<ProjectList>,
    writer: ProjectWriter,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Wire caller-supplied backends using the config's path conventions
    pub fn from_parts(config: Config, store: Arc<dyn ObjectStore>, database: Arc<dyn KeyedDatabase>) -> Result<Self> {
        let projects = Arc::new(ProjectList::new());
        let uploader = ImageUploader::new(Arc::clone(&store), config.storage.image_prefix.clone());
        let writer = ProjectWriter::new(
            uploader,
            Arc::clone(&database),
            Arc::clone(&projects),
            config.database.collection.clone(),
        )?;

        Ok(Self {
            config,
            store,
            database,
            projects,
            writer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn database(&self) -> &Arc<dyn KeyedDatabase> {
        &self.database
    }

    pub fn writer(&self) -> &ProjectWriter {
        &self.writer
    }

    /// The reactive project list owned by this app
    pub fn projects(&self) -> &Arc<ProjectList> {
        &self.projects
    }

    /// Subscribe to project list changes
    pub fn subscribe(&self) -> ProjectListSubscription {
        self.projects.subscribe()
    }

    /// See `ProjectWriter::add_project`
    pub async fn add_project(&self, project: &NewProject) -> ProjectResult<ProjectRecord> {
        self.writer.add_project(project).await
    }

    /// See `ProjectWriter::add_project_with_progress`
    pub async fn add_project_with_progress(
        &self,
        project: &NewProject,
        progress: ProgressSender,
    ) -> ProjectResult<ProjectRecord> {
        self.writer.add_project_with_progress(project, progress).await
    }
}

/// Build the configured backends and wire them into an `App`
pub async fn create_app(config: Config) -> Result<App> {
    tracing::info!("📦 Initializing object store");
    let store: Arc<dyn ObjectStore> = match &config.storage.backend {
        StorageBackend::Memory { base_url } => {
            tracing::debug!("Using in-memory object store at {}", base_url);
            Arc::new(MemoryObjectStore::new(base_url.clone(), config.storage.part_size))
        }
        StorageBackend::S3(s3) => Arc::new(
            S3ObjectStore::connect(s3, config.storage.part_size)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize S3 object store: {:#}", e))?,
        ),
    };

    tracing::info!("🗄️ Initializing keyed database");
    let database: Arc<dyn KeyedDatabase> = match &config.database.backend {
        DatabaseBackend::Memory => {
            tracing::debug!("Using in-memory database");
            Arc::new(MemoryDatabase::new())
        }
        DatabaseBackend::Sqlite { path } => Arc::new(
            SqliteDatabase::open(path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open record database '{}': {:#}", path, e))?,
        ),
    };

    let app = App::from_parts(config, store, database)?;

    tracing::info!(
        "✅ Project pipeline ready (collection '{}', image prefix '{}')",
        app.config.database.collection,
        app.config.storage.image_prefix
    );

    Ok(app)
}

/// Install the fmt tracing subscriber
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .try_init();
}
