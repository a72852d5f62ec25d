//! Suite orchestration: setup → scenarios → teardown.
//!
//! ```text
//! Suite::run(filter)
//!   ├─ provisioner.setup(ctx)           (once; failure skips all scenarios)
//!   ├─ scenarios, ≤ concurrency at once (independent, order-insensitive)
//!   └─ provisioner.teardown(ctx)        (always, even after failures)
//! ```
//!
//! The one exception to "always tear down" is a bucket name that was already
//! taken: that bucket was not created by this run and is left untouched.
//!
//! A local-only suite skips the scenarios that read from the bucket, for
//! stores the tool under test cannot see (see [`Suite::local_only`]).

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::HarnessConfig;
use crate::provision::{
    BucketNameError, CleanupPolicy, FixtureProvisioner, SuiteContext, TeardownReport,
};
use crate::scenario::{catalog, Mode, Scenario, ScenarioOutcome, ScenarioRunner};
use crate::storage::ObjectStore;

// ---------------------------------------------------------------------------
// SuiteReport
// ---------------------------------------------------------------------------

/// Everything that happened during one run.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub bucket: String,
    /// Set when setup failed; no scenarios ran.
    pub setup_error: Option<String>,
    /// Outcomes in catalog order.
    pub outcomes: Vec<ScenarioOutcome>,
    /// Selected scenarios that were not run because they need the bucket.
    pub skipped: Vec<String>,
    /// Teardown result, or the error that leaked the bucket.  `None` when the
    /// bucket was not created by this run.
    pub teardown: Option<Result<TeardownReport, String>>,
}

impl SuiteReport {
    pub fn failed(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn passed(&self) -> bool {
        self.setup_error.is_none()
            && matches!(self.teardown, Some(Ok(_)))
            && self.failed().next().is_none()
    }
}

impl std::fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "bucket: {}", self.bucket)?;
        if let Some(err) = &self.setup_error {
            writeln!(f, "setup FAILED: {err}")?;
        }

        for outcome in &self.outcomes {
            let verdict = if outcome.passed() { "ok" } else { "FAILED" };
            writeln!(
                f,
                "{verdict:>6}  {} ({:.1} s)",
                outcome.name,
                outcome.elapsed.as_secs_f64()
            )?;
            if outcome.passed() {
                continue;
            }
            writeln!(f, "        $ {}", outcome.command)?;
            if let Some(err) = &outcome.error {
                writeln!(f, "        {err}")?;
            }
            for m in &outcome.mismatches {
                writeln!(f, "        {m}")?;
            }
            for line in outcome.output.lines().take(20) {
                writeln!(f, "        | {line}")?;
            }
        }

        for name in &self.skipped {
            writeln!(f, "{:>6}  {name}", "skip")?;
        }

        match &self.teardown {
            None => writeln!(f, "teardown: skipped, bucket not created by this run")?,
            Some(Ok(report)) if report.already_gone => {
                writeln!(f, "teardown: bucket already gone")?
            }
            Some(Ok(report)) => writeln!(
                f,
                "teardown: {} object(s) deleted in {} pass(es)",
                report.objects_deleted(),
                report.passes.len()
            )?,
            Some(Err(err)) => writeln!(f, "teardown FAILED: {err}")?,
        }

        let failed = self.failed().count();
        write!(
            f,
            "{} passed, {} failed",
            self.outcomes.len() - failed,
            failed
        )?;
        if !self.skipped.is_empty() {
            write!(f, ", {} skipped", self.skipped.len())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Suite
// ---------------------------------------------------------------------------

/// One run of the harness against a given store.
pub struct Suite {
    ctx: Arc<SuiteContext>,
    provisioner: FixtureProvisioner,
    runner: Arc<ScenarioRunner>,
    concurrency: usize,
    local_only: bool,
}

impl Suite {
    /// Build a suite with a freshly generated bucket name.
    pub fn new(config: &HarnessConfig, store: Arc<dyn ObjectStore>) -> Result<Self, BucketNameError> {
        let ctx = SuiteContext::new(config)?;
        Ok(Self::with_context(config, ctx, store))
    }

    pub fn with_context(
        config: &HarnessConfig,
        ctx: SuiteContext,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            runner: Arc::new(ScenarioRunner::new(ctx.tool.clone())),
            ctx: Arc::new(ctx),
            provisioner: FixtureProvisioner::new(store, CleanupPolicy::from_config(&config.run)),
            concurrency: config.run.concurrency.max(1),
            local_only: false,
        }
    }

    /// Skip scenarios whose target is a `gs://` URI.
    ///
    /// Used with an in-memory store, where the bucket exists only inside the
    /// harness and the tool under test could never read from it.
    pub fn local_only(mut self, local_only: bool) -> Self {
        self.local_only = local_only;
        self
    }

    pub fn context(&self) -> &SuiteContext {
        &self.ctx
    }

    /// Catalog scenarios, restricted to `only` when it is non-empty.
    pub fn scenarios(&self, only: &[Mode]) -> Vec<Scenario> {
        catalog(&self.ctx)
            .into_iter()
            .filter(|s| only.is_empty() || only.contains(&s.mode))
            .collect()
    }

    /// Provision, run the selected scenarios, deprovision.
    pub async fn run(&self, only: &[Mode]) -> SuiteReport {
        let (selected, skipped): (Vec<Scenario>, Vec<Scenario>) = self
            .scenarios(only)
            .into_iter()
            .partition(|s| !(self.local_only && s.mode.is_remote()));

        let mut report = SuiteReport {
            bucket: self.ctx.bucket.clone(),
            setup_error: None,
            outcomes: Vec::new(),
            skipped: skipped.iter().map(|s| s.name.to_string()).collect(),
            teardown: None,
        };
        for name in &report.skipped {
            log::info!("suite: skipping {name} (needs a bucket the tool can read)");
        }

        let owns_bucket = match self.provisioner.setup(&self.ctx).await {
            Ok(()) => {
                report.outcomes = self.run_scenarios(selected).await;
                true
            }
            Err(e) => {
                log::error!("suite: setup failed: {e}");
                report.setup_error = Some(e.to_string());
                !e.is_bucket_conflict()
            }
        };

        if owns_bucket {
            report.teardown = Some(
                self.provisioner
                    .teardown(&self.ctx)
                    .await
                    .map_err(|e| e.to_string()),
            );
        } else {
            log::warn!(
                "suite: bucket {} already existed, leaving it in place",
                self.ctx.bucket
            );
        }
        report
    }

    /// Only the teardown half, for buckets leaked by an earlier run.
    pub async fn cleanup(&self) -> Result<TeardownReport, String> {
        self.provisioner
            .teardown(&self.ctx)
            .await
            .map_err(|e| e.to_string())
    }

    async fn run_scenarios(&self, scenarios: Vec<Scenario>) -> Vec<ScenarioOutcome> {
        let limit = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, scenario) in scenarios.iter().cloned().enumerate() {
            let runner = Arc::clone(&self.runner);
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = limit.acquire_owned().await.ok();
                (index, runner.run(&scenario).await)
            });
        }

        let mut outcomes: Vec<Option<ScenarioOutcome>> = vec![None; scenarios.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => log::error!("suite: scenario task panicked: {e}"),
            }
        }

        outcomes
            .into_iter()
            .zip(scenarios)
            .map(|(outcome, scenario)| {
                outcome.unwrap_or_else(|| ScenarioOutcome {
                    name: scenario.name.to_string(),
                    command: self.runner.render(&scenario.args()),
                    exit_code: None,
                    output: String::new(),
                    mismatches: scenario.expect.check(""),
                    error: None,
                    elapsed: Default::default(),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
