//! Immutable, chainable description of a worker fixture.
//!
//! Every `with_*` method borrows the receiver and returns a new `Worker`
//! with one sequence extended. The receiver is left untouched, so a partially
//! configured worker can be shared as a template between tests.
//!
//! ```ignore
//! let worker = Worker::new("w1")
//!     .with_team("main")
//!     .with_containers_created_in_db_and_garden([Container::new("h1")]);
//! ```

use std::sync::Arc;

use anyhow::Result;

use crate::core::ops::{RecordMutation, SetupOp};
use crate::core::types::{Container, DbState, Volume, WorkerDefaults, WorkerRecord, WorkerState};
use crate::scenario::Scenario;

#[derive(Debug, Clone)]
pub struct Worker {
    name: String,
    containers: Vec<Container>,
    volumes: Vec<Volume>,
    setup: Vec<SetupOp>,
    record_mutations: Vec<RecordMutation>,
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
            volumes: Vec::new(),
            setup: Vec::new(),
            record_mutations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime-plane containers, in declaration order.
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Runtime-plane volumes, in declaration order.
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn setup_ops(&self) -> &[SetupOp] {
        &self.setup
    }

    pub fn record_mutations(&self) -> &[RecordMutation] {
        &self.record_mutations
    }

    pub fn container_handles(&self) -> Vec<String> {
        container_handles(&self.containers)
    }

    pub fn volume_handles(&self) -> Vec<String> {
        volume_handles(&self.volumes)
    }

    /// The record that setup persists: active counts taken from the current
    /// runtime-plane lists, then every record mutation in order.
    pub fn base_record(&self, defaults: &WorkerDefaults) -> WorkerRecord {
        let mut record = WorkerRecord::base(&self.name, defaults);
        record.active_containers = self.containers.len();
        record.active_volumes = self.volumes.len();
        for mutation in &self.record_mutations {
            mutation.apply(&mut record);
        }
        record
    }

    pub fn with_garden_containers(&self, containers: impl IntoIterator<Item = Container>) -> Self {
        let mut next = self.clone();
        next.containers.extend(containers);
        next
    }

    pub fn with_baggageclaim_volumes(&self, volumes: impl IntoIterator<Item = Volume>) -> Self {
        let mut next = self.clone();
        next.volumes.extend(volumes);
        next
    }

    /// Append a setup closure that receives the worker slot. Assigning to the
    /// slot replaces the worker for every later step and for the caller.
    pub fn with_mutable_setup<F>(&self, setup: F) -> Self
    where
        F: Fn(&mut Worker, &mut Scenario) -> Result<()> + Send + Sync + 'static,
    {
        self.with_op(SetupOp::Custom {
            label: "mutable setup",
            run: Arc::new(setup),
        })
    }

    pub fn with_setup<F>(&self, setup: F) -> Self
    where
        F: Fn(&mut Scenario) -> Result<()> + Send + Sync + 'static,
    {
        self.with_op(SetupOp::Custom {
            label: "setup",
            run: Arc::new(move |_: &mut Worker, scenario: &mut Scenario| setup(scenario)),
        })
    }

    pub fn with_worker_setup<F>(&self, setup: F) -> Self
    where
        F: Fn(&mut WorkerRecord) + Send + Sync + 'static,
    {
        self.with_mutation(RecordMutation::Custom(Arc::new(setup)))
    }

    pub fn with_db_containers_in_state<I, S>(&self, state: DbState, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_op(SetupOp::DbContainers {
            state,
            handles: handles.into_iter().map(Into::into).collect(),
        })
    }

    pub fn with_db_volumes_in_state<I, S>(&self, state: DbState, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_op(SetupOp::DbVolumes {
            state,
            handles: handles.into_iter().map(Into::into).collect(),
        })
    }

    /// Attach one volume per mount path to `container_handle`, which must
    /// already be a creating container when the step runs.
    pub fn with_db_container_volumes_in_state<I, S>(
        &self,
        state: DbState,
        container_handle: impl Into<String>,
        paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_op(SetupOp::DbContainerVolumes {
            state,
            container_handle: container_handle.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        })
    }

    pub fn with_containers_created_in_db_and_garden(
        &self,
        containers: impl IntoIterator<Item = Container>,
    ) -> Self {
        let containers: Vec<Container> = containers.into_iter().collect();
        let handles = container_handles(&containers);
        self.with_garden_containers(containers)
            .with_db_containers_in_state(DbState::Created, handles)
    }

    pub fn with_volumes_created_in_db_and_baggageclaim(
        &self,
        volumes: impl IntoIterator<Item = Volume>,
    ) -> Self {
        let volumes: Vec<Volume> = volumes.into_iter().collect();
        let handles = volume_handles(&volumes);
        self.with_baggageclaim_volumes(volumes)
            .with_db_volumes_in_state(DbState::Created, handles)
    }

    pub fn with_job_build_container_created_in_db_and_garden(&self) -> Self {
        self.with_op(SetupOp::JobBuildContainer)
    }

    pub fn with_active_tasks(&self, active_tasks: u32) -> Self {
        self.with_op(SetupOp::ActiveTasks(active_tasks))
    }

    pub fn with_team(&self, team: impl Into<String>) -> Self {
        self.with_mutation(RecordMutation::Team(team.into()))
    }

    pub fn with_state(&self, state: WorkerState) -> Self {
        self.with_mutation(RecordMutation::State(state))
    }

    pub fn with_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_mutation(RecordMutation::Tags(
            tags.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn with_platform(&self, platform: impl Into<String>) -> Self {
        self.with_mutation(RecordMutation::Platform(platform.into()))
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        self.with_mutation(RecordMutation::Version(version.into()))
    }

    fn with_op(&self, op: SetupOp) -> Self {
        let mut next = self.clone();
        next.setup.push(op);
        next
    }

    fn with_mutation(&self, mutation: RecordMutation) -> Self {
        let mut next = self.clone();
        next.record_mutations.push(mutation);
        next
    }
}

fn container_handles(containers: &[Container]) -> Vec<String> {
    containers.iter().map(|c| c.handle().to_string()).collect()
}

fn volume_handles(volumes: &[Volume]) -> Vec<String> {
    volumes.iter().map(|v| v.handle().to_string()).collect()
}
