//! Jobs: the per-source state, its on-disk layout and persisted manifest.

mod layout;
mod manifest;
mod model;
pub mod naming;

pub use layout::{JobLayout, JobStore};
pub use manifest::{JobManifest, NoChaptersRecord};
pub use model::{Chapter, Job, JobFailure, JobStatus, Snippet, SnippetState};

use crate::error::{ChapsplitError, Result};

/// Run filesystem work on tokio's blocking pool.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ChapsplitError::Io(std::io::Error::other(e)))?
}
