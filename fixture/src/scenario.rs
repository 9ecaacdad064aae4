//! Live context that deferred fixture steps run against.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::types::WorkerDefaults;
use crate::io::config::FixtureConfig;
use crate::io::control_plane::ControlPlane;
use crate::io::memory_db::InMemoryControlPlane;

/// Control-plane accessor plus the ambient identifiers fixture steps need.
///
/// Workers borrow a scenario mutably while their setup runs; a scenario is
/// shared by every worker of one test.
pub struct Scenario {
    pub db: Arc<dyn ControlPlane>,
    pub team_id: u32,
    pub team_name: String,
    pub job_name: String,
    pub defaults: WorkerDefaults,
}

impl Scenario {
    /// Register the configured team and bind the scenario to `db`.
    pub fn new(db: Arc<dyn ControlPlane>, config: &FixtureConfig) -> Result<Self> {
        config.validate()?;
        let team_name = config.scenario.team_name.clone();
        let team_id = db
            .ensure_team(&team_name)
            .with_context(|| format!("register team '{}'", team_name))?;
        Ok(Self {
            db,
            team_id,
            team_name,
            job_name: config.scenario.job_name.clone(),
            defaults: config.worker.clone(),
        })
    }

    /// Scenario backed by a fresh in-memory control plane.
    pub fn in_memory(config: &FixtureConfig) -> Result<Self> {
        Self::new(Arc::new(InMemoryControlPlane::new()), config)
    }
}
