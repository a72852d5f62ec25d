//! Per-run provisioning of the remote fixture bucket.
//!
//! * [`SuiteContext`] — explicit run context (bucket name, fixtures, tool).
//! * [`FixtureProvisioner`] — `setup` / `teardown` against any
//!   [`ObjectStore`](crate::storage::ObjectStore).
//! * [`CleanupPolicy`] — bounded multi-pass deletion used by teardown.

pub mod context;
pub mod provisioner;

pub use context::{
    unique_bucket_name, validate_bucket_name, BucketNameError, FixtureSet, SuiteContext,
};
pub use provisioner::{
    CleanupPass, CleanupPolicy, FixtureProvisioner, ProvisionError, TeardownReport,
};
