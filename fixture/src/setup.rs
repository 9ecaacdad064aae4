//! Setup engine: applies a worker fixture to a live scenario.
//!
//! Order is fixed:
//! 1. Authoring checks ([`validate_worker`]).
//! 2. Base record from the current runtime-plane lists, record mutations applied.
//! 3. Record persisted.
//! 4. Setup steps run one at a time in append order. Each step gets the
//!    worker slot and may rebind it.
//!
//! The first failure aborts setup. Nothing is retried.

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument};

use crate::core::invariants::validate_worker;
use crate::core::ops::SetupOp;
use crate::core::types::{Container, ContainerOwner, DbState, VolumeType};
use crate::core::worker::Worker;
use crate::scenario::Scenario;

impl Worker {
    /// Persist the worker record and run every setup step against `scenario`.
    ///
    /// Steps run from a snapshot taken after the record is persisted, so a
    /// step that rebinds the slot cannot schedule further steps.
    #[instrument(skip_all, fields(worker = %self.name()))]
    pub fn setup(&mut self, scenario: &mut Scenario) -> Result<()> {
        let name = self.name().to_string();
        let errors = validate_worker(self);
        if !errors.is_empty() {
            bail!("invalid fixture for worker '{}': {}", name, errors.join("; "));
        }

        let record = self.base_record(&scenario.defaults);
        debug!(
            active_containers = record.active_containers,
            active_volumes = record.active_volumes,
            mutations = self.record_mutations().len(),
            "persisting base worker record"
        );
        scenario
            .db
            .save_worker(record)
            .with_context(|| format!("save worker '{}'", name))?;

        let steps = self.setup_ops().to_vec();
        for (index, step) in steps.iter().enumerate() {
            debug!(step = index + 1, op = %step.describe(), "running setup step");
            run_step(step, self, scenario).with_context(|| {
                format!(
                    "setup step {} ({}) for worker '{}'",
                    index + 1,
                    step.describe(),
                    name
                )
            })?;
        }

        info!(
            steps = steps.len(),
            containers = self.containers().len(),
            volumes = self.volumes().len(),
            "worker fixture ready"
        );
        Ok(())
    }
}

fn run_step(step: &SetupOp, slot: &mut Worker, scenario: &mut Scenario) -> Result<()> {
    match step {
        SetupOp::DbContainers { state, handles } => {
            for handle in handles {
                container_in_state(scenario, slot.name(), handle, *state)?;
            }
            Ok(())
        }
        SetupOp::DbVolumes { state, handles } => {
            for handle in handles {
                volume_in_state(scenario, slot.name(), handle, *state)?;
            }
            Ok(())
        }
        SetupOp::DbContainerVolumes {
            state,
            container_handle,
            paths,
        } => container_volumes_in_state(scenario, slot.name(), container_handle, paths, *state),
        SetupOp::JobBuildContainer => {
            let container = scenario
                .db
                .create_job_build_container(scenario.team_id, &scenario.job_name, slot.name())?;
            let created = scenario.db.container_created(slot.name(), &container.handle)?;
            debug!(handle = %created.handle, "registering job build container");
            *slot = slot.with_garden_containers([Container::new(created.handle)]);
            Ok(())
        }
        SetupOp::ActiveTasks(count) => {
            scenario.db.lookup_worker(slot.name())?;
            for _ in 0..*count {
                scenario.db.increase_active_tasks(slot.name(), *count)?;
            }
            Ok(())
        }
        SetupOp::Custom { run, .. } => run(slot, scenario),
    }
}

fn container_in_state(
    scenario: &Scenario,
    worker: &str,
    handle: &str,
    state: DbState,
) -> Result<()> {
    let owner = ContainerOwner::fixed_handle(handle);
    scenario.db.create_container(worker, &owner)?;
    if state == DbState::Created {
        scenario.db.container_created(worker, handle)?;
    }
    Ok(())
}

fn volume_in_state(scenario: &Scenario, worker: &str, handle: &str, state: DbState) -> Result<()> {
    scenario
        .db
        .create_volume(scenario.team_id, worker, VolumeType::Container, handle)?;
    if state == DbState::Created {
        scenario.db.volume_created(worker, handle)?;
    }
    Ok(())
}

fn container_volumes_in_state(
    scenario: &Scenario,
    worker: &str,
    container_handle: &str,
    paths: &[String],
    state: DbState,
) -> Result<()> {
    let owner = ContainerOwner::fixed_handle(container_handle);
    let container = scenario
        .db
        .lookup_container(worker, &owner)?
        .ok_or_else(|| anyhow!("container '{}' not found", container_handle))?;
    if container.state != DbState::Creating {
        bail!(
            "container '{}' must be creating to attach volumes (state: {})",
            container_handle,
            container.state
        );
    }
    for path in paths {
        let volume =
            scenario
                .db
                .create_container_volume(scenario.team_id, worker, container_handle, path)?;
        if state == DbState::Created {
            scenario.db.volume_created(worker, &volume.handle)?;
        }
    }
    Ok(())
}
