//! System-test harness for a speech-recognition command-line sample.
//!
//! A run provisions a uniquely named storage bucket with the audio fixtures,
//! invokes the tool under test once per scenario, checks the captured output
//! and removes the bucket again.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recognize_harness::config::HarnessConfig;
//! use recognize_harness::storage::GcsStore;
//! use recognize_harness::suite::Suite;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = HarnessConfig::load().unwrap();
//!     config.apply_env();
//!
//!     let store = Arc::new(GcsStore::from_config(&config.storage));
//!     let suite = Suite::new(&config, store).unwrap();
//!     let report = suite.run(&[]).await;
//!     println!("{report}");
//! }
//! ```

pub mod cli;
pub mod config;
pub mod provision;
pub mod scenario;
pub mod storage;
pub mod suite;
