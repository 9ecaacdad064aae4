//! Worker fixtures described in TOML.
//!
//! ```toml
//! [[worker]]
//! name = "w1"
//! team = "main"
//! tags = ["gpu"]
//! containers_created = ["h1"]
//! active_tasks = 2
//!
//! [[worker.db_containers]]
//! state = "creating"
//! handles = ["pending"]
//! ```
//!
//! Each worker entry maps onto the builder in a fixed order: record
//! mutations, runtime-plane declarations, both-plane declarations,
//! `db_containers`, `db_volumes`, `db_container_volumes`, the job build
//! container, then active tasks.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{Container, DbState, Volume, WorkerState};
use crate::core::worker::Worker;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
    #[serde(default, rename = "worker")]
    pub workers: Vec<WorkerEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerEntry {
    pub name: String,
    pub team: Option<String>,
    pub state: Option<WorkerState>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub tags: Vec<String>,
    /// Runtime plane only.
    pub garden_containers: Vec<String>,
    /// Runtime plane only.
    pub baggageclaim_volumes: Vec<String>,
    /// Both planes, created.
    pub containers_created: Vec<String>,
    /// Both planes, created.
    pub volumes_created: Vec<String>,
    pub db_containers: Vec<DbHandles>,
    pub db_volumes: Vec<DbHandles>,
    pub db_container_volumes: Vec<DbContainerVolumes>,
    pub job_build_container: bool,
    pub active_tasks: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbHandles {
    pub state: DbState,
    pub handles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbContainerVolumes {
    pub state: DbState,
    pub container: String,
    pub paths: Vec<String>,
}

impl WorkerEntry {
    pub fn to_worker(&self) -> Worker {
        let mut worker = Worker::new(self.name.as_str());

        if let Some(team) = &self.team {
            worker = worker.with_team(team.as_str());
        }
        if let Some(state) = self.state {
            worker = worker.with_state(state);
        }
        if let Some(platform) = &self.platform {
            worker = worker.with_platform(platform.as_str());
        }
        if let Some(version) = &self.version {
            worker = worker.with_version(version.as_str());
        }
        if !self.tags.is_empty() {
            worker = worker.with_tags(self.tags.iter().cloned());
        }

        worker = worker
            .with_garden_containers(self.garden_containers.iter().map(Container::new))
            .with_baggageclaim_volumes(self.baggageclaim_volumes.iter().map(Volume::new));
        if !self.containers_created.is_empty() {
            worker = worker.with_containers_created_in_db_and_garden(
                self.containers_created.iter().map(Container::new),
            );
        }
        if !self.volumes_created.is_empty() {
            worker = worker.with_volumes_created_in_db_and_baggageclaim(
                self.volumes_created.iter().map(Volume::new),
            );
        }

        for block in &self.db_containers {
            worker = worker.with_db_containers_in_state(block.state, block.handles.iter().cloned());
        }
        for block in &self.db_volumes {
            worker = worker.with_db_volumes_in_state(block.state, block.handles.iter().cloned());
        }
        for block in &self.db_container_volumes {
            worker = worker.with_db_container_volumes_in_state(
                block.state,
                block.container.as_str(),
                block.paths.iter().cloned(),
            );
        }

        if self.job_build_container {
            worker = worker.with_job_build_container_created_in_db_and_garden();
        }
        if let Some(active_tasks) = self.active_tasks {
            worker = worker.with_active_tasks(active_tasks);
        }
        worker
    }
}

impl FixtureFile {
    /// Builders for every worker entry, in file order.
    pub fn workers(&self) -> Vec<Worker> {
        self.workers.iter().map(WorkerEntry::to_worker).collect()
    }

    /// Worker names must be unique within one fixture file.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for entry in &self.workers {
            if !seen.insert(entry.name.as_str()) && !duplicates.contains(&entry.name) {
                duplicates.push(entry.name.clone());
            }
        }
        duplicates.sort();
        duplicates
    }
}

pub fn parse_fixture(contents: &str) -> Result<FixtureFile> {
    let file: FixtureFile = toml::from_str(contents).context("parse fixture toml")?;
    let duplicates = file.duplicate_names();
    if !duplicates.is_empty() {
        bail!("duplicate worker names: {}", duplicates.join(", "));
    }
    Ok(file)
}

pub fn load_fixture_file(path: &Path) -> Result<FixtureFile> {
    debug!(path = %path.display(), "loading fixture file");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read fixture {}", path.display()))?;
    let file =
        parse_fixture(&contents).with_context(|| format!("load fixture {}", path.display()))?;
    debug!(workers = file.workers.len(), "fixture file loaded");
    Ok(file)
}
