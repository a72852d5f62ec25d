//! Object storage used to stage fixture files for the remote-URI scenarios.
//!
//! This module provides:
//! * [`ObjectStore`] — async trait covering the five calls the harness needs.
//! * [`GcsStore`] — Cloud Storage JSON API client built on `reqwest`.
//! * [`MemoryStore`] — in-process store for tests and `--dry-run`.
//! * [`StorageError`] — error variants shared by every backend.

pub mod gcs;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use gcs::GcsStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to an object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP transport or connection error.
    #[error("storage request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("storage request timed out")]
    Timeout,

    /// The bucket or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The bucket name is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A bucket delete was refused because objects remain in it.
    #[error("bucket {0} is not empty")]
    BucketNotEmpty(String),

    /// Any other non-success HTTP status.
    #[error("storage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Reading a local file for upload failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The response body could not be parsed.
    #[error("failed to parse storage response: {0}")]
    Parse(String),

    /// A forced delete pass finished with per-object failures.
    #[error("{} object(s) could not be deleted: {}", .0.len(), .0.join("; "))]
    Partial(Vec<String>),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StorageError::Timeout
        } else {
            StorageError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// DeleteSummary
// ---------------------------------------------------------------------------

/// Outcome of one successful delete-objects pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Objects the listing returned.
    pub listed: usize,
    /// Objects actually removed.
    pub deleted: usize,
}

// ---------------------------------------------------------------------------
// ObjectStore trait
// ---------------------------------------------------------------------------

/// Async interface to a bucket/object store.
///
/// Implementors must be `Send + Sync` so a single store can be shared by the
/// provisioner and concurrently running tasks (`Arc<dyn ObjectStore>`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create an empty bucket called `bucket`.
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Upload `local` into `bucket` under its base filename and return the
    /// object name.
    async fn upload(&self, bucket: &str, local: &Path) -> Result<String, StorageError>;

    /// Names of the objects currently visible in `bucket`.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StorageError>;

    /// Delete every object the listing returns.
    ///
    /// With `force` a failing object is recorded and the pass continues; the
    /// collected failures come back as [`StorageError::Partial`].  Without
    /// `force` the first failure is returned immediately.  An empty bucket
    /// yields `Ok` with zero deletions.
    async fn delete_objects(&self, bucket: &str, force: bool)
        -> Result<DeleteSummary, StorageError>;

    /// Delete the (empty) bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError>;
}

/// Base filename used as the object name for an uploaded file.
pub fn object_name_for(local: &Path) -> Result<String, StorageError> {
    local
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| StorageError::Io {
            path: local.display().to_string(),
            message: "path has no UTF-8 file name".into(),
        })
}

/// Shared forced/unforced deletion loop over a listing.
///
/// `delete_one` is awaited once per object name.
pub(crate) async fn delete_listed<F, Fut>(
    names: Vec<String>,
    force: bool,
    mut delete_one: F,
) -> Result<DeleteSummary, StorageError>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<(), StorageError>>,
{
    let listed = names.len();
    let mut deleted = 0;
    let mut failures = Vec::new();

    for name in names {
        match delete_one(name.clone()).await {
            Ok(()) => deleted += 1,
            // Another pass (or another deleter) got there first.
            Err(StorageError::NotFound(_)) => {}
            Err(e) if force => {
                log::warn!("storage: failed to delete {name}: {e}");
                failures.push(format!("{name}: {e}"));
            }
            Err(e) => return Err(e),
        }
    }

    if failures.is_empty() {
        Ok(DeleteSummary { listed, deleted })
    } else {
        Err(StorageError::Partial(failures))
    }
}
