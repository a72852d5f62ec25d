//! Harness settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the
//! provisioner, the scenario runner and the storage client independently.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::HarnessPaths;

// ---------------------------------------------------------------------------
// ToolConfig
// ---------------------------------------------------------------------------

/// How to launch the command-line tool under test.
///
/// The full command line of a scenario is
/// `program args… <mode> <target> [<model>]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Executable to spawn (looked up on `PATH` when not absolute).
    pub program: String,
    /// Fixed arguments placed before the scenario arguments.
    pub args: Vec<String>,
    /// Working directory of the child process.  `None` inherits the
    /// harness's own working directory.
    pub working_dir: Option<PathBuf>,
    /// Seconds to wait for the child before killing it.  `None` waits until
    /// the process exits on its own.
    pub timeout_secs: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "node".into(),
            args: vec!["recognize.js".into()],
            working_dir: None,
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Connection settings for the Cloud Storage JSON API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Project that owns created buckets.
    pub project: Option<String>,
    /// OAuth2 bearer token.  `None` sends unauthenticated requests (local
    /// emulators).
    pub access_token: Option<String>,
    /// Prefix of every generated bucket name; a UUID v4 is appended.
    pub bucket_prefix: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://storage.googleapis.com".into(),
            project: None,
            access_token: None,
            bucket_prefix: "nodejs-docs-samples-test-".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// FixtureConfig
// ---------------------------------------------------------------------------

/// Location and names of the audio fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Fixture directory.  Relative paths are resolved against
    /// [`ToolConfig::working_dir`].
    pub dir: PathBuf,
    /// Raw LINEAR16 recording of "how old is the Brooklyn Bridge".
    pub audio_raw: String,
    /// WAV recording used by the model-selection scenarios.
    pub gnome: String,
    /// WAV recording used by the punctuation and enhanced-model scenarios.
    pub commercial: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("resources"),
            audio_raw: "audio.raw".into(),
            gnome: "Google_Gnome.wav".into(),
            commercial: "commercial_mono.wav".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Scheduling and cleanup knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of scenarios executing at the same time.
    pub concurrency: usize,
    /// Number of delete-objects passes run during teardown.
    pub cleanup_passes: u32,
    /// Pause between delete-objects passes, in milliseconds.
    pub cleanup_pass_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            cleanup_passes: 2,
            cleanup_pass_delay_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// HarnessConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level harness configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use recognize_harness::config::HarnessConfig;
///
/// // Load (returns Default when file is missing), then overlay env vars.
/// let mut config = HarnessConfig::load().unwrap();
/// config.apply_env();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Tool under test.
    pub tool: ToolConfig,
    /// Object storage connection.
    pub storage: StorageConfig,
    /// Fixture files.
    pub fixtures: FixtureConfig,
    /// Scheduling and cleanup.
    pub run: RunConfig,
}

impl HarnessConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(HarnessConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&HarnessPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill unset storage credentials from the process environment.
    ///
    /// Reads `GOOGLE_ACCESS_TOKEN` and `GCLOUD_PROJECT` (falling back to
    /// `GOOGLE_CLOUD_PROJECT`).  Values already present in the file win.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.storage.access_token.is_none() {
            self.storage.access_token = non_empty("GOOGLE_ACCESS_TOKEN");
        }
        if self.storage.project.is_none() {
            self.storage.project =
                non_empty("GCLOUD_PROJECT").or_else(|| non_empty("GOOGLE_CLOUD_PROJECT"));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn default_values_match_recognize_sample() {
        let cfg = HarnessConfig::default();

        assert_eq!(cfg.tool.program, "node");
        assert_eq!(cfg.tool.args, vec!["recognize.js".to_string()]);
        assert!(cfg.tool.timeout_secs.is_none());
        assert_eq!(cfg.storage.base_url, "https://storage.googleapis.com");
        assert_eq!(cfg.storage.bucket_prefix, "nodejs-docs-samples-test-");
        assert_eq!(cfg.fixtures.dir, PathBuf::from("resources"));
        assert_eq!(cfg.fixtures.audio_raw, "audio.raw");
        assert_eq!(cfg.fixtures.gnome, "Google_Gnome.wav");
        assert_eq!(cfg.fixtures.commercial, "commercial_mono.wav");
        assert_eq!(cfg.run.concurrency, 1);
        assert_eq!(cfg.run.cleanup_passes, 2);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = HarnessConfig::load_from(&path).expect("should not error");
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn modified_values_survive_save_and_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let mut cfg = HarnessConfig::default();
        cfg.tool.program = "python3".into();
        cfg.tool.args = vec!["transcribe.py".into(), "--quiet".into()];
        cfg.tool.working_dir = Some(PathBuf::from("/srv/samples/speech"));
        cfg.tool.timeout_secs = Some(300);
        cfg.storage.project = Some("my-project".into());
        cfg.run.concurrency = 4;

        cfg.save_to(&path).expect("save");
        let loaded = HarnessConfig::load_from(&path).expect("load");

        assert_eq!(loaded, cfg);
    }

    /// Sections omitted from the file fall back to their defaults.
    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[tool]\nprogram = \"deno\"\n").expect("write");

        let cfg = HarnessConfig::load_from(&path).expect("load");
        assert_eq!(cfg.tool.program, "deno");
        assert_eq!(cfg.tool.args, ToolConfig::default().args);
        assert_eq!(cfg.storage, StorageConfig::default());
    }

    #[test]
    fn env_overlay_fills_only_unset_fields() {
        let env: HashMap<&str, &str> = [
            ("GOOGLE_ACCESS_TOKEN", "ya29.token"),
            ("GOOGLE_CLOUD_PROJECT", "fallback-project"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let mut cfg = HarnessConfig::default();
        cfg.apply_env_from(lookup);
        assert_eq!(cfg.storage.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(cfg.storage.project.as_deref(), Some("fallback-project"));

        let mut pinned = HarnessConfig::default();
        pinned.storage.project = Some("from-file".into());
        pinned.apply_env_from(lookup);
        assert_eq!(pinned.storage.project.as_deref(), Some("from-file"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut cfg = HarnessConfig::default();
        cfg.apply_env_from(|_| Some("   ".into()));
        assert!(cfg.storage.access_token.is_none());
        assert!(cfg.storage.project.is_none());
    }
}
