//! Per-run suite context: bucket name, fixture paths and tool settings.
//!
//! One [`SuiteContext`] is built per run and passed by reference to setup,
//! every scenario and teardown.  Nothing about a run lives in globals, so two
//! runs in the same process never share a bucket.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::config::{FixtureConfig, HarnessConfig, ToolConfig};

/// Longest bucket name the storage service accepts (without dots).
const MAX_BUCKET_LEN: usize = 63;
const MIN_BUCKET_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketNameError {
    #[error("bucket name {name:?} must be 3-63 characters (got {len})")]
    Length { name: String, len: usize },

    #[error("bucket name {name:?} contains {ch:?}; only lowercase letters, digits, '-', '_' and '.' are allowed")]
    Character { name: String, ch: char },

    #[error("bucket name {0:?} must start and end with a letter or digit")]
    Edge(String),
}

/// Check a bucket name against the storage naming rules.
pub fn validate_bucket_name(name: &str) -> Result<(), BucketNameError> {
    let len = name.chars().count();
    if !(MIN_BUCKET_LEN..=MAX_BUCKET_LEN).contains(&len) {
        return Err(BucketNameError::Length {
            name: name.to_string(),
            len,
        });
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(*c, '-' | '_' | '.')))
    {
        return Err(BucketNameError::Character {
            name: name.to_string(),
            ch,
        });
    }
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(name.chars().next()) || !alnum(name.chars().last()) {
        return Err(BucketNameError::Edge(name.to_string()));
    }
    Ok(())
}

/// `prefix` followed by a random UUID v4, validated as a bucket name.
pub fn unique_bucket_name(prefix: &str) -> Result<String, BucketNameError> {
    let name = format!("{prefix}{}", Uuid::new_v4());
    validate_bucket_name(&name)?;
    Ok(name)
}

// ---------------------------------------------------------------------------
// FixtureSet
// ---------------------------------------------------------------------------

/// Resolved fixture paths.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSet {
    /// "how old is the Brooklyn Bridge", raw LINEAR16.
    pub audio_raw: PathBuf,
    /// "the weather outside is sunny", WAV.
    pub gnome: PathBuf,
    /// Commercial recording used for punctuation and enhanced model.
    pub commercial: PathBuf,
}

impl FixtureSet {
    /// Resolve `fixtures.dir` against `working_dir` when it is relative.
    pub fn resolve(fixtures: &FixtureConfig, working_dir: Option<&Path>) -> Self {
        let dir = match working_dir {
            Some(base) if fixtures.dir.is_relative() => base.join(&fixtures.dir),
            _ => fixtures.dir.clone(),
        };

        Self {
            audio_raw: dir.join(&fixtures.audio_raw),
            gnome: dir.join(&fixtures.gnome),
            commercial: dir.join(&fixtures.commercial),
        }
    }

    /// Files staged in the bucket for the remote-URI scenarios.
    pub fn uploads(&self) -> [&Path; 2] {
        [self.audio_raw.as_path(), self.gnome.as_path()]
    }

    /// Every fixture a full run reads.
    pub fn all(&self) -> [&Path; 3] {
        [
            self.audio_raw.as_path(),
            self.gnome.as_path(),
            self.commercial.as_path(),
        ]
    }

    /// Fixtures that do not exist on disk.
    pub fn missing(&self) -> Vec<PathBuf> {
        self.all()
            .into_iter()
            .filter(|p| !p.is_file())
            .map(Path::to_path_buf)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SuiteContext
// ---------------------------------------------------------------------------

/// Everything a single run needs to know about itself.
#[derive(Debug, Clone)]
pub struct SuiteContext {
    /// Bucket owned exclusively by this run.
    pub bucket: String,
    pub fixtures: FixtureSet,
    pub tool: ToolConfig,
}

impl SuiteContext {
    /// Build a fresh context with a newly generated bucket name.
    pub fn new(config: &HarnessConfig) -> Result<Self, BucketNameError> {
        let bucket = unique_bucket_name(&config.storage.bucket_prefix)?;
        Ok(Self::with_bucket(config, bucket))
    }

    /// Build a context around an existing bucket (used by `cleanup`).
    pub fn with_bucket(config: &HarnessConfig, bucket: impl Into<String>) -> Self {
        let fixtures = FixtureSet::resolve(&config.fixtures, config.tool.working_dir.as_deref());
        Self {
            bucket: bucket.into(),
            fixtures,
            tool: config.tool.clone(),
        }
    }

    /// `gs://{bucket}/{object}`.
    pub fn gcs_uri(&self, object: &str) -> String {
        format!("gs://{}/{}", self.bucket, object)
    }
}
