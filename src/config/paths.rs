//! Cross-platform harness paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (`settings.toml`):
//!   Windows: %APPDATA%\recognize-harness\
//!   macOS:   ~/Library/Application Support/recognize-harness/
//!   Linux:   ~/.config/recognize-harness/

use std::path::PathBuf;

/// Holds the resolved harness directory/file paths.
#[derive(Debug, Clone)]
pub struct HarnessPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
}

impl HarnessPaths {
    const APP_NAME: &'static str = "recognize-harness";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard config path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        let settings_file = config_dir.join("settings.toml");

        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for HarnessPaths {
    fn default() -> Self {
        Self::new()
    }
}
