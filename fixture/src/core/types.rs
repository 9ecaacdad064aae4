//! Shared value types for both planes of a worker fixture.
//!
//! Descriptors (`Container`, `Volume`) describe runtime-plane resources.
//! Records (`WorkerRecord`, `ContainerRecord`, `VolumeRecord`) describe the
//! control plane. The handle is the only link between the two.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

/// Runtime-plane container, identified by handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container {
    handle: String,
}

impl Container {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Runtime-plane volume, identified by handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Volume {
    handle: String,
}

impl Volume {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Control-plane lifecycle of a container or volume record.
///
/// `Creating` always precedes `Created`. The raw encoding starts at 1 so that
/// a zeroed value is never mistaken for a valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbState {
    Creating = 1,
    Created = 2,
}

impl DbState {
    pub fn as_str(self) -> &'static str {
        match self {
            DbState::Creating => "creating",
            DbState::Created => "created",
        }
    }
}

impl fmt::Display for DbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for DbState {
    type Error = anyhow::Error;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(DbState::Creating),
            2 => Ok(DbState::Created),
            other => Err(anyhow!("invalid state {}", other)),
        }
    }
}

impl FromStr for DbState {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "creating" => Ok(DbState::Creating),
            "created" => Ok(DbState::Created),
            other => bail!("invalid state '{}'", other),
        }
    }
}

/// Lifecycle of the worker record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Running,
    Stalled,
    Landing,
    Landed,
    Retiring,
}

impl WorkerState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Running => "running",
            WorkerState::Stalled => "stalled",
            WorkerState::Landing => "landing",
            WorkerState::Landed => "landed",
            WorkerState::Retiring => "retiring",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defaults for a freshly registered worker record.
///
/// Addresses are derived from the worker name so that two workers in one
/// scenario never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerDefaults {
    pub platform: String,
    pub version: String,
    pub garden_addr_prefix: String,
    pub baggageclaim_url_prefix: String,
    pub resource_types: Vec<String>,
}

impl Default for WorkerDefaults {
    fn default() -> Self {
        Self {
            platform: "linux".to_string(),
            version: "2.5".to_string(),
            garden_addr_prefix: "garden-addr".to_string(),
            baggageclaim_url_prefix: "baggageclaim-url".to_string(),
            resource_types: vec!["some-base-type".to_string()],
        }
    }
}

/// Control-plane registration of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: String,
    pub team: Option<String>,
    pub platform: String,
    pub tags: Vec<String>,
    pub version: String,
    pub state: WorkerState,
    pub garden_addr: String,
    pub baggageclaim_url: String,
    pub resource_types: Vec<String>,
    pub active_containers: usize,
    pub active_volumes: usize,
    pub active_tasks: u32,
}

impl WorkerRecord {
    pub fn base(name: &str, defaults: &WorkerDefaults) -> Self {
        Self {
            name: name.to_string(),
            team: None,
            platform: defaults.platform.clone(),
            tags: Vec::new(),
            version: defaults.version.clone(),
            state: WorkerState::Running,
            garden_addr: format!("{}-{}", defaults.garden_addr_prefix, name),
            baggageclaim_url: format!("{}-{}", defaults.baggageclaim_url_prefix, name),
            resource_types: defaults.resource_types.clone(),
            active_containers: 0,
            active_volumes: 0,
            active_tasks: 0,
        }
    }
}

/// Who a container record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerOwner {
    /// Pins the container to a caller-chosen handle.
    FixedHandle { handle: String },
    /// A step of a job build; the handle is generated.
    BuildStep { build_id: u64, plan_id: String },
}

impl ContainerOwner {
    pub fn fixed_handle(handle: impl Into<String>) -> Self {
        ContainerOwner::FixedHandle {
            handle: handle.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub handle: String,
    pub worker_name: String,
    pub owner: ContainerOwner,
    pub state: DbState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeType {
    Container,
    Resource,
    ResourceType,
    TaskCache,
    Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub handle: String,
    pub worker_name: String,
    pub team_id: u32,
    pub volume_type: VolumeType,
    pub container_handle: Option<String>,
    pub mount_path: Option<String>,
    pub state: DbState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_state_rejects_values_outside_the_enum() {
        assert_eq!(DbState::try_from(1).expect("creating"), DbState::Creating);
        assert_eq!(DbState::try_from(2).expect("created"), DbState::Created);
        for raw in [0u8, 3, 255] {
            let err = DbState::try_from(raw).expect_err("out of range");
            assert!(err.to_string().contains("invalid state"));
        }
    }

    #[test]
    fn db_state_parses_lowercase_names_only() {
        assert_eq!("created".parse::<DbState>().expect("parse"), DbState::Created);
        assert!("Created".parse::<DbState>().is_err());
        assert!("destroying".parse::<DbState>().is_err());
    }

    #[test]
    fn creating_orders_before_created() {
        assert!(DbState::Creating < DbState::Created);
    }

    /// Addresses are derived per worker so two base records never collide.
    #[test]
    fn base_record_derives_addresses_from_name() {
        let defaults = WorkerDefaults::default();
        let a = WorkerRecord::base("a", &defaults);
        let b = WorkerRecord::base("b", &defaults);
        assert_eq!(a.garden_addr, "garden-addr-a");
        assert_ne!(a.baggageclaim_url, b.baggageclaim_url);
        assert_eq!(a.state, WorkerState::Running);
        assert_eq!(a.active_containers, 0);
    }
}
