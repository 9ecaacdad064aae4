//! Deferred work recorded by the worker builder.
//!
//! Nothing here touches a collaborator. Operations are plain tagged values so
//! the order a builder produced can be inspected and asserted on before any
//! of it runs.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::core::types::{DbState, WorkerRecord, WorkerState};
use crate::core::worker::Worker;
use crate::scenario::Scenario;

/// Setup closure that may rebind the worker slot it is handed.
pub type SetupFn = Arc<dyn Fn(&mut Worker, &mut Scenario) -> Result<()> + Send + Sync>;

/// Edits the worker record before it is persisted.
pub type WorkerSetupFn = Arc<dyn Fn(&mut WorkerRecord) + Send + Sync>;

/// One deferred step run against a live scenario, after the worker record
/// has been persisted.
#[derive(Clone)]
pub enum SetupOp {
    /// Container records for fixed handles, driven to `state`.
    DbContainers { state: DbState, handles: Vec<String> },
    /// Container-type volume records, driven to `state`.
    DbVolumes { state: DbState, handles: Vec<String> },
    /// One volume per mount path, attached to an existing creating container.
    DbContainerVolumes {
        state: DbState,
        container_handle: String,
        paths: Vec<String>,
    },
    /// Job build container created in the database, then registered in the
    /// runtime plane under its generated handle.
    JobBuildContainer,
    /// Raise the worker's active task count to this value.
    ActiveTasks(u32),
    /// Caller-supplied closure.
    Custom { label: &'static str, run: SetupFn },
}

impl SetupOp {
    /// Short, stable label used in logs, plans and error context.
    pub fn describe(&self) -> String {
        match self {
            SetupOp::DbContainers { state, handles } => {
                format!("db containers {} [{}]", state, handles.join(", "))
            }
            SetupOp::DbVolumes { state, handles } => {
                format!("db volumes {} [{}]", state, handles.join(", "))
            }
            SetupOp::DbContainerVolumes {
                state,
                container_handle,
                paths,
            } => format!(
                "db container volumes {} on '{}' [{}]",
                state,
                container_handle,
                paths.join(", ")
            ),
            SetupOp::JobBuildContainer => "job build container".to_string(),
            SetupOp::ActiveTasks(count) => format!("active tasks {}", count),
            SetupOp::Custom { label, .. } => (*label).to_string(),
        }
    }
}

impl fmt::Debug for SetupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupOp::Custom { label, .. } => f.debug_struct("Custom").field("label", label).finish(),
            other => f.write_str(&other.describe()),
        }
    }
}

/// Edit applied to the pre-persist worker record.
#[derive(Clone)]
pub enum RecordMutation {
    Team(String),
    State(WorkerState),
    Tags(Vec<String>),
    Platform(String),
    Version(String),
    Custom(WorkerSetupFn),
}

impl RecordMutation {
    pub fn apply(&self, record: &mut WorkerRecord) {
        match self {
            RecordMutation::Team(team) => record.team = Some(team.clone()),
            RecordMutation::State(state) => record.state = *state,
            RecordMutation::Tags(tags) => record.tags.extend(tags.iter().cloned()),
            RecordMutation::Platform(platform) => record.platform = platform.clone(),
            RecordMutation::Version(version) => record.version = version.clone(),
            RecordMutation::Custom(edit) => edit(record),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RecordMutation::Team(team) => format!("team {}", team),
            RecordMutation::State(state) => format!("state {}", state),
            RecordMutation::Tags(tags) => format!("tags [{}]", tags.join(", ")),
            RecordMutation::Platform(platform) => format!("platform {}", platform),
            RecordMutation::Version(version) => format!("version {}", version),
            RecordMutation::Custom(_) => "worker setup".to_string(),
        }
    }
}

impl fmt::Debug for RecordMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
