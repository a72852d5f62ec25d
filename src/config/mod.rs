//! Configuration module for the recognition harness.
//!
//! Provides `HarnessConfig` (top-level settings), one sub-config per concern,
//! `HarnessPaths` for the platform config directory, and TOML persistence via
//! `HarnessConfig::load` / `HarnessConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::HarnessPaths;
pub use settings::{FixtureConfig, HarnessConfig, RunConfig, StorageConfig, ToolConfig};
