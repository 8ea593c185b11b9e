//! projectdock: project records with image uploads
//!
//! Uploads an optional project image to an object store, merge-writes the
//! project record into a keyed database, and mirrors the new record into an
//! observable in-memory list for UI binding.

// Core configuration and backend selection
pub mod config;

// Error taxonomy for uploads and database writes
pub mod error;

// Object storage layer - blob backends, progress channel and image uploader
pub mod storage;

// Keyed database layer - merge-write backends and push id generation
pub mod database;

// Project layer - record types, reactive list and writer
pub mod project;

// Composition root wiring backends, list and writer together
pub mod app;

// Re-export commonly used types for external consumers
pub use app::{create_app, App};
pub use error::{ProjectError, ProjectResult};
pub use project::{NewProject, ProjectList, ProjectRecord, ProjectWriter};
pub use storage::{progress_channel, ImageFile, UploadEvent};
