//! Tool modes, targets and the fixed scenario catalog.
//!
//! The catalog pins the tool's observable output.  Note the spacing in the
//! transcription line: the synchronous modes print `Transcription:  <text>`
//! (two spaces) while the async and streaming modes print
//! `Transcription: <text>` (one space).  Both are matched literally; the
//! difference is a property of the tool, not something to normalise here.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::provision::SuiteContext;
use crate::scenario::Expectation;

/// Spoken in `audio.raw`.
pub const BROOKLYN_BRIDGE: &str = "how old is the Brooklyn Bridge";
/// Spoken in `Google_Gnome.wav`.
pub const WEATHER_SUNNY: &str = "the weather outside is sunny";
/// Punctuated phrase from `commercial_mono.wav`.
pub const PUNCTUATED: &str = "Terrific. It's on the way.";
/// Word the enhanced phone-call model recognises in `commercial_mono.wav`.
pub const ENHANCED_WORD: &str = "Chrome";
/// Model requested by the model-selection scenarios.
pub const VIDEO_MODEL: &str = "video";

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Sub-command passed as the tool's first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Sync,
    SyncGcs,
    SyncWords,
    Async,
    AsyncGcs,
    AsyncGcsWords,
    Stream,
    SyncModel,
    SyncModelGcs,
    SyncAutoPunctuation,
    SyncEnhancedModel,
}

impl Mode {
    pub const ALL: [Mode; 11] = [
        Mode::Sync,
        Mode::SyncGcs,
        Mode::SyncWords,
        Mode::Async,
        Mode::AsyncGcs,
        Mode::AsyncGcsWords,
        Mode::Stream,
        Mode::SyncModel,
        Mode::SyncModelGcs,
        Mode::SyncAutoPunctuation,
        Mode::SyncEnhancedModel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Sync => "sync",
            Mode::SyncGcs => "sync-gcs",
            Mode::SyncWords => "sync-words",
            Mode::Async => "async",
            Mode::AsyncGcs => "async-gcs",
            Mode::AsyncGcsWords => "async-gcs-words",
            Mode::Stream => "stream",
            Mode::SyncModel => "sync-model",
            Mode::SyncModelGcs => "sync-model-gcs",
            Mode::SyncAutoPunctuation => "sync-auto-punctuation",
            Mode::SyncEnhancedModel => "sync-enhanced-model",
        }
    }

    /// Modes whose target is a `gs://` URI instead of a local path.
    pub fn is_remote(self) -> bool {
        matches!(self, Mode::SyncGcs | Mode::AsyncGcs | Mode::AsyncGcsWords | Mode::SyncModelGcs)
    }

    /// Modes that print per-word time offsets.
    pub fn has_word_timing(self) -> bool {
        matches!(self, Mode::SyncWords | Mode::AsyncGcsWords)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode {0:?}")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Audio the tool is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local(PathBuf),
    Remote { bucket: String, object: String },
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Local(path) => write!(f, "{}", path.display()),
            Target::Remote { bucket, object } => write!(f, "gs://{bucket}/{object}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// One tool invocation and what its output must contain.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub mode: Mode,
    pub target: Target,
    pub model: Option<String>,
    pub expect: Expectation,
}

impl Scenario {
    /// `<mode> <target> [<model>]`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.mode.to_string(), self.target.to_string()];
        args.extend(self.model.clone());
        args
    }
}

/// The eleven scenarios, in a stable order.
pub fn catalog(ctx: &SuiteContext) -> Vec<Scenario> {
    let sync_line = format!("Transcription:  {BROOKLYN_BRIDGE}");
    let async_line = format!("Transcription: {BROOKLYN_BRIDGE}");

    let local = |path: &PathBuf| Target::Local(path.clone());
    let remote = |path: &PathBuf| Target::Remote {
        bucket: ctx.bucket.clone(),
        object: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let fx = &ctx.fixtures;

    let scenario = |name, mode, target, model: Option<&str>, expect| Scenario {
        name,
        mode,
        target,
        model: model.map(str::to_string),
        expect,
    };

    vec![
        scenario(
            "sync recognize",
            Mode::Sync,
            local(&fx.audio_raw),
            None,
            Expectation::contains(&sync_line),
        ),
        scenario(
            "sync recognize on a GCS file",
            Mode::SyncGcs,
            remote(&fx.audio_raw),
            None,
            Expectation::contains(&sync_line),
        ),
        scenario(
            "sync recognize with word time offset",
            Mode::SyncWords,
            local(&fx.audio_raw),
            None,
            Expectation::contains(&sync_line).with_word_timing(),
        ),
        scenario(
            "async recognize on a local file",
            Mode::Async,
            local(&fx.audio_raw),
            None,
            Expectation::contains(&async_line),
        ),
        scenario(
            "async recognize on a GCS file",
            Mode::AsyncGcs,
            remote(&fx.audio_raw),
            None,
            Expectation::contains(&async_line),
        ),
        scenario(
            "async recognize on a GCS file with word time offset",
            Mode::AsyncGcsWords,
            remote(&fx.audio_raw),
            None,
            Expectation::contains(&async_line).with_word_timing(),
        ),
        scenario(
            "streaming recognize",
            Mode::Stream,
            local(&fx.audio_raw),
            None,
            Expectation::contains(&async_line),
        ),
        scenario(
            "sync recognize with model selection",
            Mode::SyncModel,
            local(&fx.gnome),
            Some(VIDEO_MODEL),
            Expectation::contains("Transcription:").and(WEATHER_SUNNY),
        ),
        scenario(
            "sync recognize on a GCS file with model selection",
            Mode::SyncModelGcs,
            remote(&fx.gnome),
            Some(VIDEO_MODEL),
            Expectation::contains("Transcription:").and(WEATHER_SUNNY),
        ),
        scenario(
            "sync recognize with auto punctuation",
            Mode::SyncAutoPunctuation,
            local(&fx.commercial),
            None,
            Expectation::contains(PUNCTUATED),
        ),
        scenario(
            "sync recognize with enhanced model",
            Mode::SyncEnhancedModel,
            local(&fx.commercial),
            None,
            Expectation::contains(ENHANCED_WORD),
        ),
    ]
}
