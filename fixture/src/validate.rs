//! Authoring checks for `fixture validate`.

use std::path::Path;

use anyhow::Result;

use crate::core::invariants::validate_worker;
use crate::io::fixture_file::{FixtureFile, load_fixture_file};

/// Authoring errors for every worker in `file`, prefixed with the worker name.
pub fn validate_fixture(file: &FixtureFile) -> Vec<String> {
    let mut errors = Vec::new();
    for worker in file.workers() {
        for error in validate_worker(&worker) {
            errors.push(format!("{}: {}", worker.name(), error));
        }
    }
    errors
}

/// Load and check a fixture file. Decode failures are returned as `Err`,
/// authoring errors as the `Ok` list.
pub fn validate_fixture_path(path: &Path) -> Result<Vec<String>> {
    let file = load_fixture_file(path)?;
    Ok(validate_fixture(&file))
}
