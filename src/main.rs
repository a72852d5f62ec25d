//! Harness entry point.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging (`info`, or `debug` with `-v`; `RUST_LOG` wins).
//! 3. Load [`HarnessConfig`] from `--config` or the platform config dir and
//!    overlay credentials from the environment.
//! 4. Dispatch the sub-command.  `run` exits with status 1 when any part of
//!    the suite failed.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use recognize_harness::{
    cli::{Cli, Command},
    config::{HarnessConfig, HarnessPaths},
    provision::SuiteContext,
    storage::{GcsStore, MemoryStore, ObjectStore},
    suite::Suite,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings_file = cli
        .config
        .clone()
        .unwrap_or_else(|| HarnessPaths::new().settings_file);
    let mut config = HarnessConfig::load_from(&settings_file)
        .with_context(|| format!("failed to load {}", settings_file.display()))?;
    config.apply_env();

    match cli.command {
        Command::Run {
            only,
            concurrency,
            dry_run,
        } => {
            if let Some(n) = concurrency {
                config.run.concurrency = n;
            }
            let store: Arc<dyn ObjectStore> = if dry_run {
                log::info!("dry run: staging fixtures in memory, skipping gs:// scenarios");
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(GcsStore::from_config(&config.storage))
            };

            let suite = Suite::new(&config, store)?.local_only(dry_run);
            let report = suite.run(&only).await;
            println!("{report}");
            if !report.passed() {
                std::process::exit(1);
            }
        }

        Command::List => {
            let ctx = SuiteContext::with_bucket(&config, "<bucket>");
            let suite = Suite::with_context(&config, ctx, Arc::new(MemoryStore::new()));
            for scenario in suite.scenarios(&[]) {
                println!("{:<55} {}", scenario.name, scenario.args().join(" "));
            }
        }

        Command::Cleanup { bucket } => {
            let store = Arc::new(GcsStore::from_config(&config.storage));
            let ctx = SuiteContext::with_bucket(&config, bucket);
            let suite = Suite::with_context(&config, ctx, store);
            let report = suite.cleanup().await.map_err(anyhow::Error::msg)?;
            if report.already_gone {
                println!("bucket {} does not exist", report.bucket);
            } else {
                println!(
                    "deleted bucket {} ({} object(s))",
                    report.bucket,
                    report.objects_deleted()
                );
            }
        }

        Command::InitConfig { force } => {
            if settings_file.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    settings_file.display()
                );
            }
            HarnessConfig::default().save_to(&settings_file)?;
            println!("wrote {}", settings_file.display());
        }
    }

    Ok(())
}
