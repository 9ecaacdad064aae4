//! Deterministic, collaborator-free parts of a worker fixture.
//!
//! Core modules build and inspect fixture descriptions only. Nothing here
//! reads the scheduling database or a runtime backend.

pub mod invariants;
pub mod ops;
pub mod types;
pub mod worker;
