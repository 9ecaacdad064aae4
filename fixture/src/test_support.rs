//! Test-only helpers for building scenarios and descriptors.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{
    Container, ContainerOwner, ContainerRecord, Volume, VolumeRecord, VolumeType, WorkerRecord,
};
use crate::io::config::FixtureConfig;
use crate::io::control_plane::ControlPlane;
use crate::io::memory_db::InMemoryControlPlane;
use crate::scenario::Scenario;

/// Scenario over a fresh in-memory control plane with default config.
pub fn scenario() -> Scenario {
    Scenario::in_memory(&FixtureConfig::default()).expect("in-memory scenario")
}

/// Scenario whose control plane journals every call after construction.
pub fn recording_scenario() -> (Scenario, Arc<RecordingControlPlane>) {
    let db = Arc::new(RecordingControlPlane::default());
    let scenario =
        Scenario::new(db.clone(), &FixtureConfig::default()).expect("recording scenario");
    db.clear();
    (scenario, db)
}

pub fn containers(handles: &[&str]) -> Vec<Container> {
    handles.iter().map(|h| Container::new(*h)).collect()
}

pub fn volumes(handles: &[&str]) -> Vec<Volume> {
    handles.iter().map(|h| Volume::new(*h)).collect()
}

/// Wraps an [`InMemoryControlPlane`] and records each call as
/// `"<method> <worker> <handle-or-argument>"`.
#[derive(Debug, Default)]
pub struct RecordingControlPlane {
    inner: InMemoryControlPlane,
    calls: Mutex<Vec<String>>,
}

impl RecordingControlPlane {
    /// Calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.to_vec()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("call journal lock poisoned"))?
            .push(call);
        Ok(())
    }
}

impl ControlPlane for RecordingControlPlane {
    fn ensure_team(&self, name: &str) -> Result<u32> {
        self.record(format!("ensure_team {}", name))?;
        self.inner.ensure_team(name)
    }

    fn save_worker(&self, record: WorkerRecord) -> Result<()> {
        self.record(format!("save_worker {}", record.name))?;
        self.inner.save_worker(record)
    }

    fn lookup_worker(&self, name: &str) -> Result<WorkerRecord> {
        self.record(format!("lookup_worker {}", name))?;
        self.inner.lookup_worker(name)
    }

    fn create_container(&self, worker: &str, owner: &ContainerOwner) -> Result<ContainerRecord> {
        let label = match owner {
            ContainerOwner::FixedHandle { handle } => handle.clone(),
            ContainerOwner::BuildStep { build_id, .. } => format!("build-{}", build_id),
        };
        self.record(format!("create_container {} {}", worker, label))?;
        self.inner.create_container(worker, owner)
    }

    fn container_created(&self, worker: &str, handle: &str) -> Result<ContainerRecord> {
        self.record(format!("container_created {} {}", worker, handle))?;
        self.inner.container_created(worker, handle)
    }

    fn lookup_container(
        &self,
        worker: &str,
        owner: &ContainerOwner,
    ) -> Result<Option<ContainerRecord>> {
        self.record(format!("lookup_container {}", worker))?;
        self.inner.lookup_container(worker, owner)
    }

    fn create_volume(
        &self,
        team_id: u32,
        worker: &str,
        volume_type: VolumeType,
        handle: &str,
    ) -> Result<VolumeRecord> {
        self.record(format!("create_volume {} {}", worker, handle))?;
        self.inner.create_volume(team_id, worker, volume_type, handle)
    }

    fn create_container_volume(
        &self,
        team_id: u32,
        worker: &str,
        container_handle: &str,
        mount_path: &str,
    ) -> Result<VolumeRecord> {
        self.record(format!(
            "create_container_volume {} {} {}",
            worker, container_handle, mount_path
        ))?;
        self.inner
            .create_container_volume(team_id, worker, container_handle, mount_path)
    }

    fn volume_created(&self, worker: &str, handle: &str) -> Result<VolumeRecord> {
        self.record(format!("volume_created {} {}", worker, handle))?;
        self.inner.volume_created(worker, handle)
    }

    fn increase_active_tasks(&self, worker: &str, limit: u32) -> Result<u32> {
        self.record(format!("increase_active_tasks {} {}", worker, limit))?;
        self.inner.increase_active_tasks(worker, limit)
    }

    fn create_job_build_container(
        &self,
        team_id: u32,
        job_name: &str,
        worker: &str,
    ) -> Result<ContainerRecord> {
        self.record(format!("create_job_build_container {} {}", worker, job_name))?;
        self.inner.create_job_build_container(team_id, job_name, worker)
    }

    fn containers(&self, worker: &str) -> Result<Vec<ContainerRecord>> {
        self.inner.containers(worker)
    }

    fn volumes(&self, worker: &str) -> Result<Vec<VolumeRecord>> {
        self.inner.volumes(worker)
    }
}

/// Fixture file written into a temporary directory.
pub struct TempFixture {
    dir: TempDir,
    path: PathBuf,
}

impl TempFixture {
    pub fn new(contents: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let path = dir.path().join("fixture.toml");
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
