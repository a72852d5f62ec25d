//! Scenario runner — spawns the tool under test and checks its output.
//!
//! Each run is a single blocking request/check pair:
//!
//! ```text
//! program args… <mode> <target> [<model>]
//!   └─▶ wait for exit (optional timeout)
//!         └─▶ stdout ++ stderr ─▶ Expectation::check ─▶ ScenarioOutcome
//! ```
//!
//! A tool that fails to start, times out or exits non-zero fails the scenario
//! with a [`ScenarioError`], even when its output met every expectation.  The
//! captured output is kept on the outcome either way.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

use crate::config::ToolConfig;
use crate::scenario::{Mismatch, Scenario};

// ---------------------------------------------------------------------------
// ScenarioError
// ---------------------------------------------------------------------------

/// Why a tool run counts as failed regardless of its output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("failed to start `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` did not exit within {secs} s")]
    Timeout { command: String, secs: u64 },

    #[error("`{command}` exited with {}", describe_exit(.code))]
    ExitStatus { command: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

// ---------------------------------------------------------------------------
// ScenarioOutcome
// ---------------------------------------------------------------------------

/// Result of running one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    /// Rendered command line, for reports.
    pub command: String,
    /// Exit code, `None` when the process never ran to completion or was
    /// killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout followed by stderr.
    pub output: String,
    pub mismatches: Vec<Mismatch>,
    pub error: Option<ScenarioError>,
    pub elapsed: Duration,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.mismatches.is_empty()
    }
}

/// Raw result of a finished child process.
#[derive(Debug, Clone)]
pub struct Captured {
    pub exit_code: Option<i32>,
    pub text: String,
}

// ---------------------------------------------------------------------------
// ScenarioRunner
// ---------------------------------------------------------------------------

/// Runs scenarios against the configured tool.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    tool: ToolConfig,
}

impl ScenarioRunner {
    pub fn new(tool: ToolConfig) -> Self {
        Self { tool }
    }

    /// `program args… extra…` as a single display string.
    pub fn render(&self, extra: &[String]) -> String {
        std::iter::once(self.tool.program.as_str())
            .chain(self.tool.args.iter().map(String::as_str))
            .chain(extra.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run `scenario` to completion and check its expectations.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioOutcome {
        let args = scenario.args();
        let command = self.render(&args);
        log::info!("scenario: {} -> {command}", scenario.name);

        let started = Instant::now();
        let (exit_code, output, error) = match self.execute(&args).await {
            Ok(captured) if captured.exit_code == Some(0) => (Some(0), captured.text, None),
            Ok(captured) => {
                let error = ScenarioError::ExitStatus {
                    command: command.clone(),
                    code: captured.exit_code,
                };
                (captured.exit_code, captured.text, Some(error))
            }
            Err(e) => (None, String::new(), Some(e)),
        };
        let elapsed = started.elapsed();

        if let Some(e) = &error {
            log::warn!("scenario: {}: {e}", scenario.name);
        }
        let mismatches = scenario.expect.check(&output);
        for m in &mismatches {
            log::debug!("scenario: {}: {m}", scenario.name);
        }

        ScenarioOutcome {
            name: scenario.name.to_string(),
            command,
            exit_code,
            output,
            mismatches,
            error,
            elapsed,
        }
    }

    /// Spawn the tool with `extra` appended to the configured arguments and
    /// wait for it, capturing stdout then stderr as one string.
    pub async fn execute(&self, extra: &[String]) -> Result<Captured, ScenarioError> {
        let command = self.render(extra);

        let mut cmd = Command::new(&self.tool.program);
        cmd.args(&self.tool.args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.tool.working_dir.as_deref() {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| ScenarioError::Spawn {
            command: command.clone(),
            message: describe_spawn_error(&self.tool.program, self.tool.working_dir.as_deref(), &e),
        })?;

        let waited = match self.tool.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                .await
                .map_err(|_| ScenarioError::Timeout {
                    command: command.clone(),
                    secs,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| ScenarioError::Spawn {
            command,
            message: e.to_string(),
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(Captured {
            exit_code: output.status.code(),
            text,
        })
    }
}

fn describe_spawn_error(program: &str, dir: Option<&Path>, e: &std::io::Error) -> String {
    match (e.kind(), dir) {
        (std::io::ErrorKind::NotFound, Some(dir)) if !dir.is_dir() => {
            format!("working directory {} does not exist", dir.display())
        }
        (std::io::ErrorKind::NotFound, _) => format!("{program} not found on PATH"),
        _ => e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
