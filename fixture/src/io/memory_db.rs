//! In-memory scheduling database.
//!
//! Cloning an [`InMemoryControlPlane`] yields another handle to the same
//! tables, the way a connection pool would. Generated handles and ids are
//! sequential, so two runs of one fixture produce identical state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

use crate::core::types::{
    ContainerOwner, ContainerRecord, DbState, VolumeRecord, VolumeType, WorkerRecord,
};
use crate::io::control_plane::ControlPlane;

#[derive(Debug, Clone, Default)]
pub struct InMemoryControlPlane {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    teams: Vec<String>,
    jobs: BTreeMap<(u32, String), u64>,
    builds: Vec<u64>,
    workers: BTreeMap<String, WorkerRecord>,
    containers: Vec<ContainerRecord>,
    volumes: Vec<VolumeRecord>,
    next_container: u64,
    next_volume: u64,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("control plane lock poisoned"))
    }
}

impl Tables {
    fn require_worker(&self, name: &str) -> Result<&WorkerRecord> {
        self.workers
            .get(name)
            .ok_or_else(|| anyhow!("worker '{}' not found", name))
    }

    fn require_team(&self, team_id: u32) -> Result<()> {
        let index = team_id
            .checked_sub(1)
            .ok_or_else(|| anyhow!("team {} not found", team_id))?;
        if (index as usize) >= self.teams.len() {
            bail!("team {} not found", team_id);
        }
        Ok(())
    }

    fn insert_container(&mut self, worker: &str, owner: ContainerOwner) -> Result<ContainerRecord> {
        self.require_worker(worker)?;
        let handle = match &owner {
            ContainerOwner::FixedHandle { handle } => handle.clone(),
            ContainerOwner::BuildStep { .. } => self.generate_container_handle(worker),
        };
        if self
            .containers
            .iter()
            .any(|c| c.worker_name == worker && c.handle == handle)
        {
            bail!(
                "container handle '{}' already exists on worker '{}'",
                handle,
                worker
            );
        }
        let record = ContainerRecord {
            handle,
            worker_name: worker.to_string(),
            owner,
            state: DbState::Creating,
        };
        debug!(worker, handle = %record.handle, "container record creating");
        self.containers.push(record.clone());
        Ok(record)
    }

    /// Next `container-N` not already taken on `worker`.
    fn generate_container_handle(&mut self, worker: &str) -> String {
        loop {
            self.next_container += 1;
            let handle = format!("container-{}", self.next_container);
            if !self
                .containers
                .iter()
                .any(|c| c.worker_name == worker && c.handle == handle)
            {
                return handle;
            }
        }
    }

    /// Next `volume-N` not already taken on `worker`.
    fn generate_volume_handle(&mut self, worker: &str) -> String {
        loop {
            self.next_volume += 1;
            let handle = format!("volume-{}", self.next_volume);
            if !self
                .volumes
                .iter()
                .any(|v| v.worker_name == worker && v.handle == handle)
            {
                return handle;
            }
        }
    }

    fn insert_volume(&mut self, record: VolumeRecord) -> Result<VolumeRecord> {
        if self
            .volumes
            .iter()
            .any(|v| v.worker_name == record.worker_name && v.handle == record.handle)
        {
            bail!(
                "volume handle '{}' already exists on worker '{}'",
                record.handle,
                record.worker_name
            );
        }
        debug!(worker = %record.worker_name, handle = %record.handle, "volume record creating");
        self.volumes.push(record.clone());
        Ok(record)
    }
}

impl ControlPlane for InMemoryControlPlane {
    fn ensure_team(&self, name: &str) -> Result<u32> {
        let mut tables = self.tables()?;
        let index = match tables.teams.iter().position(|team| team == name) {
            Some(index) => index,
            None => {
                tables.teams.push(name.to_string());
                tables.teams.len() - 1
            }
        };
        u32::try_from(index + 1).with_context(|| format!("team id overflow for '{}'", name))
    }

    fn save_worker(&self, record: WorkerRecord) -> Result<()> {
        let mut tables = self.tables()?;
        debug!(
            worker = %record.name,
            active_containers = record.active_containers,
            active_volumes = record.active_volumes,
            "saving worker"
        );
        tables.workers.insert(record.name.clone(), record);
        Ok(())
    }

    fn lookup_worker(&self, name: &str) -> Result<WorkerRecord> {
        self.tables()?.require_worker(name).cloned()
    }

    fn create_container(&self, worker: &str, owner: &ContainerOwner) -> Result<ContainerRecord> {
        self.tables()?.insert_container(worker, owner.clone())
    }

    fn container_created(&self, worker: &str, handle: &str) -> Result<ContainerRecord> {
        let mut tables = self.tables()?;
        let record = tables
            .containers
            .iter_mut()
            .find(|c| c.worker_name == worker && c.handle == handle)
            .ok_or_else(|| anyhow!("container '{}' not found on worker '{}'", handle, worker))?;
        if record.state != DbState::Creating {
            bail!(
                "container '{}' is not creating (state: {})",
                handle,
                record.state
            );
        }
        record.state = DbState::Created;
        debug!(worker, handle, "container record created");
        Ok(record.clone())
    }

    fn lookup_container(
        &self,
        worker: &str,
        owner: &ContainerOwner,
    ) -> Result<Option<ContainerRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .containers
            .iter()
            .find(|c| c.worker_name == worker && &c.owner == owner)
            .cloned())
    }

    fn create_volume(
        &self,
        team_id: u32,
        worker: &str,
        volume_type: VolumeType,
        handle: &str,
    ) -> Result<VolumeRecord> {
        let mut tables = self.tables()?;
        tables.require_team(team_id)?;
        tables.require_worker(worker)?;
        tables.insert_volume(VolumeRecord {
            handle: handle.to_string(),
            worker_name: worker.to_string(),
            team_id,
            volume_type,
            container_handle: None,
            mount_path: None,
            state: DbState::Creating,
        })
    }

    fn create_container_volume(
        &self,
        team_id: u32,
        worker: &str,
        container_handle: &str,
        mount_path: &str,
    ) -> Result<VolumeRecord> {
        let mut tables = self.tables()?;
        tables.require_team(team_id)?;
        tables.require_worker(worker)?;
        let container = tables
            .containers
            .iter()
            .find(|c| c.worker_name == worker && c.handle == container_handle)
            .ok_or_else(|| {
                anyhow!(
                    "container '{}' not found on worker '{}'",
                    container_handle,
                    worker
                )
            })?;
        if container.state != DbState::Creating {
            bail!(
                "container '{}' must be creating to attach volumes (state: {})",
                container_handle,
                container.state
            );
        }
        let handle = tables.generate_volume_handle(worker);
        tables.insert_volume(VolumeRecord {
            handle,
            worker_name: worker.to_string(),
            team_id,
            volume_type: VolumeType::Container,
            container_handle: Some(container_handle.to_string()),
            mount_path: Some(mount_path.to_string()),
            state: DbState::Creating,
        })
    }

    fn volume_created(&self, worker: &str, handle: &str) -> Result<VolumeRecord> {
        let mut tables = self.tables()?;
        let record = tables
            .volumes
            .iter_mut()
            .find(|v| v.worker_name == worker && v.handle == handle)
            .ok_or_else(|| anyhow!("volume '{}' not found on worker '{}'", handle, worker))?;
        if record.state != DbState::Creating {
            bail!("volume '{}' is not creating (state: {})", handle, record.state);
        }
        record.state = DbState::Created;
        debug!(worker, handle, "volume record created");
        Ok(record.clone())
    }

    fn increase_active_tasks(&self, worker: &str, limit: u32) -> Result<u32> {
        let mut tables = self.tables()?;
        let record = tables
            .workers
            .get_mut(worker)
            .ok_or_else(|| anyhow!("worker '{}' not found", worker))?;
        if record.active_tasks >= limit {
            bail!(
                "worker '{}' already runs {} active tasks (limit {})",
                worker,
                record.active_tasks,
                limit
            );
        }
        record.active_tasks += 1;
        Ok(record.active_tasks)
    }

    fn create_job_build_container(
        &self,
        team_id: u32,
        job_name: &str,
        worker: &str,
    ) -> Result<ContainerRecord> {
        let mut tables = self.tables()?;
        tables.require_team(team_id)?;
        let next_job_id = tables.jobs.len() as u64 + 1;
        let job_id = *tables
            .jobs
            .entry((team_id, job_name.to_string()))
            .or_insert(next_job_id);
        let build_id = tables.builds.len() as u64 + 1;
        tables.builds.push(job_id);
        debug!(team_id, job_name, job_id, build_id, "job build started");
        tables.insert_container(
            worker,
            ContainerOwner::BuildStep {
                build_id,
                plan_id: format!("plan-{}", build_id),
            },
        )
    }

    fn containers(&self, worker: &str) -> Result<Vec<ContainerRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .containers
            .iter()
            .filter(|c| c.worker_name == worker)
            .cloned()
            .collect())
    }

    fn volumes(&self, worker: &str) -> Result<Vec<VolumeRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .volumes
            .iter()
            .filter(|v| v.worker_name == worker)
            .cloned()
            .collect())
    }
}
