//! Scenarios: invoke the tool under test and assert on its output.
//!
//! * [`Mode`] / [`Target`] / [`Scenario`] — what to run.
//! * [`catalog`] — the fixed set of eleven scenarios for a run.
//! * [`Expectation`] / [`Mismatch`] — substring and word-timing checks.
//! * [`ScenarioRunner`] — spawns the tool and produces a [`ScenarioOutcome`].

pub mod catalog;
pub mod expect;
pub mod runner;

pub use catalog::{catalog, Mode, Scenario, Target, UnknownMode};
pub use expect::{has_word_timing, Expectation, Mismatch};
pub use runner::{Captured, ScenarioError, ScenarioOutcome, ScenarioRunner};
