//! Control-plane abstraction for fixture setup.
//!
//! The [`ControlPlane`] trait decouples the setup engine from the scheduling
//! database. [`InMemoryControlPlane`](crate::io::memory_db::InMemoryControlPlane)
//! is the implementation shipped with the crate. Tests can wrap it to observe
//! the exact sequence of calls.

use anyhow::Result;

use crate::core::types::{ContainerOwner, ContainerRecord, VolumeRecord, VolumeType, WorkerRecord};

/// Scheduling-database operations consumed by worker fixtures.
///
/// Calls are synchronous. Every failure is reported as an error; the setup
/// engine never retries.
pub trait ControlPlane: Send + Sync {
    /// Look up a team by name, registering it when missing.
    fn ensure_team(&self, name: &str) -> Result<u32>;

    /// Insert or replace a worker registration.
    fn save_worker(&self, record: WorkerRecord) -> Result<()>;

    fn lookup_worker(&self, name: &str) -> Result<WorkerRecord>;

    /// Insert a container record in the `creating` state.
    fn create_container(&self, worker: &str, owner: &ContainerOwner) -> Result<ContainerRecord>;

    /// Move a creating container record to `created`.
    fn container_created(&self, worker: &str, handle: &str) -> Result<ContainerRecord>;

    fn lookup_container(
        &self,
        worker: &str,
        owner: &ContainerOwner,
    ) -> Result<Option<ContainerRecord>>;

    /// Insert a volume record with a caller-chosen handle in the `creating` state.
    fn create_volume(
        &self,
        team_id: u32,
        worker: &str,
        volume_type: VolumeType,
        handle: &str,
    ) -> Result<VolumeRecord>;

    /// Insert a volume mounted at `mount_path` in a creating container. The
    /// handle is generated.
    fn create_container_volume(
        &self,
        team_id: u32,
        worker: &str,
        container_handle: &str,
        mount_path: &str,
    ) -> Result<VolumeRecord>;

    /// Move a creating volume record to `created`.
    fn volume_created(&self, worker: &str, handle: &str) -> Result<VolumeRecord>;

    /// Add one active task unless the worker already runs `limit` tasks.
    /// Returns the new count.
    fn increase_active_tasks(&self, worker: &str, limit: u32) -> Result<u32>;

    /// Start a build of `job_name` and insert a creating container for one of
    /// its steps on `worker`.
    fn create_job_build_container(
        &self,
        team_id: u32,
        job_name: &str,
        worker: &str,
    ) -> Result<ContainerRecord>;

    /// Container records of a worker, in insertion order.
    fn containers(&self, worker: &str) -> Result<Vec<ContainerRecord>>;

    /// Volume records of a worker, in insertion order.
    fn volumes(&self, worker: &str) -> Result<Vec<VolumeRecord>>;
}
