//! Project management module
//!
//! Handles the project write path and its in-memory mirror:
//! - Record types (`NewProject` in, `ProjectRecord` out)
//! - Append-only reactive list for UI consumers
//! - Writer orchestrating upload, database merge and list append

pub mod list;
pub mod types;
pub mod writer;

pub use list::{ProjectList, ProjectListSubscription, ProjectSnapshot};
pub use types::{NewProject, ProjectRecord};
pub use writer::ProjectWriter;
