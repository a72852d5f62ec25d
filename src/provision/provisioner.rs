//! Fixture provisioner: stages the bucket before a run and removes it after.
//!
//! # Lifecycle
//!
//! ```text
//! setup(ctx)
//!   ├─ every fixture exists on disk?          → MissingFixtures
//!   ├─ create_bucket(ctx.bucket)              → CreateBucket
//!   └─ upload(audio.raw), upload(Gnome.wav)   → Upload
//!
//! teardown(ctx)
//!   ├─ delete_objects(force) × CleanupPolicy::passes
//!   └─ delete_bucket(ctx.bucket)              → DeleteBucket
//! ```
//!
//! Setup never retries.  Teardown runs a bounded number of delete passes
//! because a listing taken right after an upload can miss objects that still
//! block bucket deletion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::RunConfig;
use crate::provision::SuiteContext;
use crate::storage::{DeleteSummary, ObjectStore, StorageError};

// ---------------------------------------------------------------------------
// ProvisionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("fixture file(s) not found: {}", display_paths(.0))]
    MissingFixtures(Vec<PathBuf>),

    #[error("failed to create bucket {bucket}: {source}")]
    CreateBucket {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to upload {} to {bucket}: {source}", .path.display())]
    Upload {
        bucket: String,
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("failed to delete bucket {bucket}: {source}")]
    DeleteBucket {
        bucket: String,
        #[source]
        source: StorageError,
    },
}

impl ProvisionError {
    /// The bucket name was already taken, so the bucket belongs to someone
    /// else and must not be torn down by this run.
    pub fn is_bucket_conflict(&self) -> bool {
        matches!(
            self,
            ProvisionError::CreateBucket {
                source: StorageError::Conflict(_),
                ..
            }
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// CleanupPolicy
// ---------------------------------------------------------------------------

/// Bounded multi-pass object deletion.
///
/// Every pass lists the bucket and force-deletes what it sees.  The first
/// pass always runs; a later pass that lists nothing ends the loop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Maximum number of delete passes (at least 1).
    pub passes: u32,
    /// Pause before every pass after the first.
    pub pass_delay: Duration,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            passes: 2,
            pass_delay: Duration::ZERO,
        }
    }
}

impl CleanupPolicy {
    pub fn from_config(run: &RunConfig) -> Self {
        Self {
            passes: run.cleanup_passes.max(1),
            pass_delay: Duration::from_millis(run.cleanup_pass_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// TeardownReport
// ---------------------------------------------------------------------------

/// Result of one delete-objects pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanupPass {
    Deleted(DeleteSummary),
    /// The pass failed; later passes still run.
    Failed(String),
}

/// What teardown did.
#[derive(Debug, Clone, PartialEq)]
pub struct TeardownReport {
    pub bucket: String,
    pub passes: Vec<CleanupPass>,
    /// `true` when the bucket did not exist any more (nothing to remove).
    pub already_gone: bool,
}

impl TeardownReport {
    /// Total objects removed across all passes.
    pub fn objects_deleted(&self) -> usize {
        self.passes
            .iter()
            .map(|p| match p {
                CleanupPass::Deleted(summary) => summary.deleted,
                CleanupPass::Failed(_) => 0,
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// FixtureProvisioner
// ---------------------------------------------------------------------------

/// Creates and destroys the per-run bucket.
pub struct FixtureProvisioner {
    store: Arc<dyn ObjectStore>,
    policy: CleanupPolicy,
}

impl FixtureProvisioner {
    pub fn new(store: Arc<dyn ObjectStore>, policy: CleanupPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Create `ctx.bucket` and upload the staged fixtures into it.
    ///
    /// The first failure is returned as-is; nothing is retried or rolled
    /// back here (teardown handles a half-provisioned bucket).
    pub async fn setup(&self, ctx: &SuiteContext) -> Result<(), ProvisionError> {
        let missing = ctx.fixtures.missing();
        if !missing.is_empty() {
            return Err(ProvisionError::MissingFixtures(missing));
        }

        log::info!("provision: creating bucket {}", ctx.bucket);
        self.store
            .create_bucket(&ctx.bucket)
            .await
            .map_err(|source| ProvisionError::CreateBucket {
                bucket: ctx.bucket.clone(),
                source,
            })?;

        for path in ctx.fixtures.uploads() {
            let object = self.store.upload(&ctx.bucket, path).await.map_err(|source| {
                ProvisionError::Upload {
                    bucket: ctx.bucket.clone(),
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            log::debug!("provision: uploaded {}", ctx.gcs_uri(&object));
        }

        Ok(())
    }

    /// Empty and delete `ctx.bucket`.
    ///
    /// Individual delete passes may fail without aborting teardown; only the
    /// final bucket deletion is reported as an error.  A bucket that no
    /// longer exists is not an error.
    pub async fn teardown(&self, ctx: &SuiteContext) -> Result<TeardownReport, ProvisionError> {
        let mut report = TeardownReport {
            bucket: ctx.bucket.clone(),
            passes: Vec::new(),
            already_gone: false,
        };

        for pass in 1..=self.policy.passes {
            if pass > 1 && !self.policy.pass_delay.is_zero() {
                tokio::time::sleep(self.policy.pass_delay).await;
            }

            match self.store.delete_objects(&ctx.bucket, true).await {
                Ok(summary) => {
                    log::debug!(
                        "provision: cleanup pass {pass} on {} listed {} deleted {}",
                        ctx.bucket,
                        summary.listed,
                        summary.deleted
                    );
                    let empty = summary.listed == 0;
                    report.passes.push(CleanupPass::Deleted(summary));
                    if pass > 1 && empty {
                        break;
                    }
                }
                Err(StorageError::NotFound(_)) => {
                    log::info!("provision: bucket {} already gone", ctx.bucket);
                    report.already_gone = true;
                    return Ok(report);
                }
                Err(e) => {
                    log::warn!("provision: cleanup pass {pass} on {} failed: {e}", ctx.bucket);
                    report.passes.push(CleanupPass::Failed(e.to_string()));
                }
            }
        }

        match self.store.delete_bucket(&ctx.bucket).await {
            Ok(()) => {
                log::info!(
                    "provision: deleted bucket {} ({} object(s) removed)",
                    ctx.bucket,
                    report.objects_deleted()
                );
                Ok(report)
            }
            Err(StorageError::NotFound(_)) => {
                report.already_gone = true;
                Ok(report)
            }
            Err(source) => {
                log::error!("provision: bucket {} leaked: {source}", ctx.bucket);
                Err(ProvisionError::DeleteBucket {
                    bucket: ctx.bucket.clone(),
                    source,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::storage::MemoryStore;
    use std::path::Path;

    fn context_with_fixtures(dir: &Path) -> SuiteContext {
        let mut config = HarnessConfig::default();
        config.tool.working_dir = Some(dir.to_path_buf());
        let ctx = SuiteContext::new(&config).expect("context");
        std::fs::create_dir_all(dir.join("resources")).expect("mkdir");
        for path in ctx.fixtures.all() {
            std::fs::write(path, b"RIFF....WAVEfmt ").expect("write fixture");
        }
        ctx
    }

    fn provisioner(store: &Arc<MemoryStore>, passes: u32) -> FixtureProvisioner {
        FixtureProvisioner::new(
            store.clone(),
            CleanupPolicy {
                passes,
                pass_delay: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn setup_creates_bucket_with_two_fixtures() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::new());

        provisioner(&store, 2).setup(&ctx).await.expect("setup");

        assert_eq!(store.bucket_names(), vec![ctx.bucket.clone()]);
        assert_eq!(
            store.stored_objects(&ctx.bucket),
            Some(vec!["Google_Gnome.wav".to_string(), "audio.raw".to_string()])
        );
    }

    #[tokio::test]
    async fn setup_refuses_missing_fixtures_before_touching_storage() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = HarnessConfig::default();
        config.tool.working_dir = Some(dir.path().to_path_buf());
        let ctx = SuiteContext::new(&config).expect("context");
        let store = Arc::new(MemoryStore::new());

        let err = provisioner(&store, 2).setup(&ctx).await.unwrap_err();
        match err {
            ProvisionError::MissingFixtures(paths) => assert_eq!(paths.len(), 3),
            other => panic!("expected MissingFixtures, got {other}"),
        }
        assert!(store.bucket_names().is_empty());
    }

    #[tokio::test]
    async fn setup_propagates_bucket_conflict() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::new());
        store.create_bucket(&ctx.bucket).await.unwrap();

        let err = provisioner(&store, 2).setup(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::CreateBucket {
                source: StorageError::Conflict(_),
                ..
            }
        ));
        assert!(err.is_bucket_conflict());
    }

    #[tokio::test]
    async fn missing_fixture_is_not_a_bucket_conflict() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        std::fs::remove_file(&ctx.fixtures.gnome).expect("remove fixture");
        let store = Arc::new(MemoryStore::new());

        let err = provisioner(&store, 2).setup(&ctx).await.unwrap_err();
        assert!(!err.is_bucket_conflict());
    }

    #[tokio::test]
    async fn two_passes_absorb_listing_lag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::with_listing_lag(1));
        let provisioner = provisioner(&store, 2);

        provisioner.setup(&ctx).await.expect("setup");
        let report = provisioner.teardown(&ctx).await.expect("teardown");

        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.passes[0], CleanupPass::Deleted(DeleteSummary::default()));
        assert_eq!(report.objects_deleted(), 2);
        assert!(!report.already_gone);
        assert!(store.bucket_names().is_empty());
    }

    #[tokio::test]
    async fn single_pass_leaks_under_listing_lag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::with_listing_lag(1));
        let provisioner = provisioner(&store, 1);

        provisioner.setup(&ctx).await.expect("setup");
        let err = provisioner.teardown(&ctx).await.unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::DeleteBucket {
                source: StorageError::BucketNotEmpty(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn second_pass_on_clean_bucket_is_harmless() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::new());
        let provisioner = provisioner(&store, 2);

        provisioner.setup(&ctx).await.expect("setup");
        let report = provisioner.teardown(&ctx).await.expect("teardown");

        assert_eq!(
            report.passes,
            vec![
                CleanupPass::Deleted(DeleteSummary { listed: 2, deleted: 2 }),
                CleanupPass::Deleted(DeleteSummary::default()),
            ]
        );
    }

    #[tokio::test]
    async fn later_pass_stops_once_bucket_lists_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::new());
        let provisioner = provisioner(&store, 5);

        provisioner.setup(&ctx).await.expect("setup");
        let report = provisioner.teardown(&ctx).await.expect("teardown");
        assert_eq!(report.passes.len(), 2);
    }

    #[tokio::test]
    async fn teardown_of_never_created_bucket_is_not_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ctx = context_with_fixtures(dir.path());
        let store = Arc::new(MemoryStore::new());

        let report = provisioner(&store, 2).teardown(&ctx).await.expect("teardown");
        assert!(report.already_gone);
        assert!(report.passes.is_empty());
    }

    #[test]
    fn policy_from_config_keeps_at_least_one_pass() {
        let run = RunConfig {
            cleanup_passes: 0,
            cleanup_pass_delay_ms: 250,
            ..RunConfig::default()
        };
        let policy = CleanupPolicy::from_config(&run);
        assert_eq!(policy.passes, 1);
        assert_eq!(policy.pass_delay, Duration::from_millis(250));
    }
}
