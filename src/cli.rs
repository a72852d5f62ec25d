//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::scenario::Mode;

/// System-test harness for a speech-recognition command-line sample.
#[derive(Debug, Parser)]
#[command(name = "recognize-harness", version, about)]
pub struct Cli {
    /// Path to settings.toml (defaults to the platform config directory).
    #[arg(short, long, global = true, env = "RECOGNIZE_HARNESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision the bucket, run scenarios, tear the bucket down.
    Run {
        /// Run only these modes (repeatable).  Default: all.
        #[arg(long = "only", value_name = "MODE")]
        only: Vec<Mode>,

        /// Maximum scenarios in flight; overrides the config file.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Stage fixtures in an in-memory store instead of Cloud Storage and
        /// skip the scenarios that read from the bucket.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the scenario catalog.
    List,

    /// Empty and delete a bucket left behind by an interrupted run.
    Cleanup {
        #[arg(long)]
        bucket: String,
    },

    /// Write the default settings.toml.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}
