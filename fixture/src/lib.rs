//! Declarative worker fixtures for a build-orchestration test suite.
//!
//! A worker has two planes of state: a control-plane record in the scheduling
//! database and a runtime-plane set of containers and volumes. This crate
//! composes both from an immutable [`Worker`](core::worker::Worker) builder:
//!
//! - **[`core`]**: Builder, tagged setup operations and authoring checks.
//!   No collaborator calls, fully testable in isolation.
//! - **[`io`]**: The control-plane trait, its in-memory implementation,
//!   configuration and fixture files.
//! - **[`setup`]** / **[`runtime`]**: `Worker::setup` runs a fixture against a
//!   [`Scenario`](scenario::Scenario); `Worker::build` materializes the
//!   runtime plane.
//!
//! ```ignore
//! let mut scenario = Scenario::in_memory(&FixtureConfig::default())?;
//! let mut worker = Worker::new("w1")
//!     .with_containers_created_in_db_and_garden([Container::new("h1")]);
//! worker.setup(&mut scenario)?;
//! let record = scenario.db.lookup_worker("w1")?;
//! let runtime = worker.build(scenario.db.clone(), record);
//! ```
//!
//! Command modules ([`validate`], [`plan`], [`apply`]) back the `fixture` CLI.

pub mod apply;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod plan;
pub mod runtime;
pub mod scenario;
pub mod setup;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
