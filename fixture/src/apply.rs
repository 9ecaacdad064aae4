//! Orchestration for `fixture apply`: run every worker of a fixture file
//! against an in-memory control plane and report both planes.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::types::{ContainerRecord, VolumeRecord, WorkerRecord};
use crate::io::config::FixtureConfig;
use crate::io::fixture_file::{FixtureFile, load_fixture_file};
use crate::runtime::RuntimeWorker;
use crate::scenario::Scenario;
use crate::validate::validate_fixture;

/// Structured apply outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every worker was set up.
    Applied(FixtureReport),
    /// Authoring errors; no worker was set up.
    Invalid { errors: Vec<String> },
    /// Setup aborted on `worker`; no report is produced.
    SetupFailed { worker: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureReport {
    pub team: String,
    pub workers: Vec<WorkerReport>,
}

/// Both planes of one worker after setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub record: WorkerRecord,
    pub runtime_containers: Vec<String>,
    pub runtime_volumes: Vec<String>,
    pub db_containers: Vec<ContainerRecord>,
    pub db_volumes: Vec<VolumeRecord>,
}

impl WorkerReport {
    pub fn from_runtime(runtime: &RuntimeWorker) -> Result<Self> {
        let name = runtime.name();
        Ok(Self {
            record: runtime.record().clone(),
            runtime_containers: runtime
                .garden()
                .containers()
                .iter()
                .map(|c| c.handle().to_string())
                .collect(),
            runtime_volumes: runtime
                .baggageclaim()
                .list_volumes()?
                .iter()
                .map(|v| v.handle().to_string())
                .collect(),
            db_containers: runtime.db().containers(name)?,
            db_volumes: runtime.db().volumes(name)?,
        })
    }
}

/// Set up every worker in file order, then build each runtime worker.
///
/// The whole file is checked first; a malformed fixture touches nothing.
pub fn apply_fixture(file: &FixtureFile, config: &FixtureConfig) -> Result<ApplyOutcome> {
    let errors = validate_fixture(file);
    if !errors.is_empty() {
        warn!(errors = errors.len(), "fixture has authoring errors");
        return Ok(ApplyOutcome::Invalid { errors });
    }

    let mut scenario = Scenario::in_memory(config)?;
    let mut workers = file.workers();

    for worker in &mut workers {
        if let Err(err) = worker.setup(&mut scenario) {
            warn!(worker = %worker.name(), error = %format!("{:#}", err), "worker setup failed");
            return Ok(ApplyOutcome::SetupFailed {
                worker: worker.name().to_string(),
                error: format!("{:#}", err),
            });
        }
    }

    let mut reports = Vec::with_capacity(workers.len());
    for worker in &workers {
        let record = scenario
            .db
            .lookup_worker(worker.name())
            .with_context(|| format!("lookup worker '{}'", worker.name()))?;
        let runtime = worker.build(Arc::clone(&scenario.db), record);
        reports.push(WorkerReport::from_runtime(&runtime)?);
    }
    info!(workers = reports.len(), "fixture applied");

    Ok(ApplyOutcome::Applied(FixtureReport {
        team: scenario.team_name,
        workers: reports,
    }))
}

pub fn apply_fixture_path(path: &Path, config: &FixtureConfig) -> Result<ApplyOutcome> {
    let file = load_fixture_file(path)?;
    apply_fixture(&file, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DbState;
    use crate::io::fixture_file::parse_fixture;

    #[test]
    fn report_covers_both_planes() {
        let file = parse_fixture(
            r#"
[[worker]]
name = "w1"
containers_created = ["h1"]
baggageclaim_volumes = ["orphan"]
job_build_container = true
"#,
        )
        .expect("parse");
        let outcome = apply_fixture(&file, &FixtureConfig::default()).expect("apply");
        let ApplyOutcome::Applied(report) = outcome else {
            panic!("expected applied outcome, got {:?}", outcome);
        };
        assert_eq!(report.team, "main");
        let w1 = &report.workers[0];
        assert_eq!(w1.runtime_containers, vec!["h1", "container-1"]);
        assert_eq!(w1.runtime_volumes, vec!["orphan"]);
        assert!(w1.db_volumes.is_empty());
        let handles: Vec<_> = w1.db_containers.iter().map(|c| c.handle.as_str()).collect();
        assert_eq!(handles, vec!["h1", "container-1"]);
        assert!(w1.db_containers.iter().all(|c| c.state == DbState::Created));
        assert_eq!(w1.record.active_containers, 1);
        assert_eq!(w1.record.active_volumes, 1);
    }

    #[test]
    fn setup_failure_names_the_worker() {
        let file = parse_fixture(
            r#"
[[worker]]
name = "good"

[[worker]]
name = "bad"
[[worker.db_container_volumes]]
state = "created"
container = "missing"
paths = ["/a"]
"#,
        )
        .expect("parse");
        match apply_fixture(&file, &FixtureConfig::default()).expect("apply") {
            ApplyOutcome::SetupFailed { worker, error } => {
                assert_eq!(worker, "bad");
                assert!(error.contains("container 'missing' not found"));
            }
            other => panic!("expected setup failure, got {:?}", other),
        }
    }

    #[test]
    fn authoring_errors_stop_apply_before_setup() {
        let file = parse_fixture(
            r#"
[[worker]]
name = "w1"
garden_containers = ["h1", "h1"]
"#,
        )
        .expect("parse");
        match apply_fixture(&file, &FixtureConfig::default()).expect("apply") {
            ApplyOutcome::Invalid { errors } => {
                assert_eq!(errors, vec!["w1: duplicate runtime container handle 'h1'"]);
            }
            other => panic!("expected invalid outcome, got {:?}", other),
        }
    }
}
