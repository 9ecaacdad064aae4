//! Runtime-plane doubles and the worker object tests assert against.
//!
//! [`Worker::build`] wires a [`RuntimeWorker`] from a finished fixture. It
//! never checks that the runtime plane agrees with the control plane, so
//! deliberately inconsistent fixtures can be materialized.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use tracing::debug;

use crate::core::types::{Container, Volume, WorkerRecord};
use crate::core::worker::Worker;
use crate::io::control_plane::ControlPlane;

/// Fixed container catalog of one worker.
#[derive(Debug, Clone, Default)]
pub struct Garden {
    containers: Vec<Container>,
}

impl Garden {
    pub fn new(containers: Vec<Container>) -> Self {
        Self { containers }
    }

    pub fn lookup(&self, handle: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.handle() == handle)
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }
}

/// Volume catalog of one worker.
///
/// Every read and write holds the catalog lock. The lock belongs to this
/// instance; two runtime workers never contend.
#[derive(Debug, Default)]
pub struct Baggageclaim {
    volumes: Mutex<Vec<Volume>>,
}

impl Baggageclaim {
    pub fn new(volumes: Vec<Volume>) -> Self {
        Self {
            volumes: Mutex::new(volumes),
        }
    }

    fn catalog(&self) -> Result<MutexGuard<'_, Vec<Volume>>> {
        self.volumes
            .lock()
            .map_err(|_| anyhow!("volume catalog lock poisoned"))
    }

    pub fn lookup_volume(&self, handle: &str) -> Result<Option<Volume>> {
        Ok(self
            .catalog()?
            .iter()
            .find(|v| v.handle() == handle)
            .cloned())
    }

    pub fn list_volumes(&self) -> Result<Vec<Volume>> {
        Ok(self.catalog()?.clone())
    }

    pub fn create_volume(&self, handle: &str) -> Result<Volume> {
        let mut catalog = self.catalog()?;
        if catalog.iter().any(|v| v.handle() == handle) {
            bail!("volume '{}' already exists", handle);
        }
        let volume = Volume::new(handle);
        catalog.push(volume.clone());
        debug!(handle, "runtime volume created");
        Ok(volume)
    }

    /// Returns whether a volume was removed.
    pub fn destroy_volume(&self, handle: &str) -> Result<bool> {
        let mut catalog = self.catalog()?;
        let before = catalog.len();
        catalog.retain(|v| v.handle() != handle);
        Ok(catalog.len() != before)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct P2pConfig {
    pub enabled: bool,
}

/// Artifact streaming settings handed through to the runtime worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streamer {
    pub compression: Compression,
    pub p2p: P2pConfig,
}

impl Default for Streamer {
    fn default() -> Self {
        Self {
            compression: Compression::Gzip,
            p2p: P2pConfig { enabled: false },
        }
    }
}

/// Runtime-plane view of one worker.
pub struct RuntimeWorker {
    record: WorkerRecord,
    garden: Garden,
    baggageclaim: Baggageclaim,
    db: Arc<dyn ControlPlane>,
    streamer: Streamer,
}

impl RuntimeWorker {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &WorkerRecord {
        &self.record
    }

    pub fn garden(&self) -> &Garden {
        &self.garden
    }

    pub fn baggageclaim(&self) -> &Baggageclaim {
        &self.baggageclaim
    }

    pub fn db(&self) -> &Arc<dyn ControlPlane> {
        &self.db
    }

    pub fn streamer(&self) -> Streamer {
        self.streamer
    }

    pub fn find_container(&self, handle: &str) -> Option<&Container> {
        self.garden.lookup(handle)
    }
}

impl Worker {
    /// Materialize the runtime plane for this fixture.
    ///
    /// `record` is normally the persisted record returned by
    /// [`ControlPlane::lookup_worker`] after [`Worker::setup`].
    pub fn build(&self, db: Arc<dyn ControlPlane>, record: WorkerRecord) -> RuntimeWorker {
        debug!(
            worker = %record.name,
            containers = self.containers().len(),
            volumes = self.volumes().len(),
            "building runtime worker"
        );
        RuntimeWorker {
            record,
            garden: Garden::new(self.containers().to_vec()),
            baggageclaim: Baggageclaim::new(self.volumes().to_vec()),
            db,
            streamer: Streamer::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::core::types::DbState;
    use crate::test_support::{containers, scenario, volumes};

    #[test]
    fn build_exposes_declared_catalogs() {
        let mut scenario = scenario();
        let mut worker = Worker::new("w1")
            .with_containers_created_in_db_and_garden(containers(&["h1"]))
            .with_baggageclaim_volumes(volumes(&["v1", "v2"]));
        worker.setup(&mut scenario).expect("setup");

        let record = scenario.db.lookup_worker("w1").expect("worker");
        let runtime = worker.build(Arc::clone(&scenario.db), record);

        assert_eq!(runtime.name(), "w1");
        assert_eq!(runtime.garden().containers().len(), 1);
        assert!(runtime.find_container("h1").is_some());
        assert!(runtime.find_container("missing").is_none());
        let handles: Vec<_> = runtime
            .baggageclaim()
            .list_volumes()
            .expect("volumes")
            .into_iter()
            .map(|v| v.handle().to_string())
            .collect();
        assert_eq!(handles, vec!["v1", "v2"]);
        assert_eq!(runtime.streamer().compression, Compression::Gzip);
        assert!(!runtime.streamer().p2p.enabled);

        let records = runtime.db().containers("w1").expect("containers");
        assert_eq!(records[0].state, DbState::Created);
    }

    /// A container only in the runtime plane is materialized as declared.
    #[test]
    fn build_allows_runtime_only_resources() {
        let mut scenario = scenario();
        let mut worker = Worker::new("w1").with_garden_containers(containers(&["orphan"]));
        worker.setup(&mut scenario).expect("setup");

        let record = scenario.db.lookup_worker("w1").expect("worker");
        let runtime = worker.build(Arc::clone(&scenario.db), record);
        assert!(runtime.find_container("orphan").is_some());
        assert!(scenario.db.containers("w1").expect("containers").is_empty());
    }

    #[test]
    fn volume_catalog_rejects_duplicates_and_destroys() {
        let catalog = Baggageclaim::new(volumes(&["v1"]));
        assert!(catalog.create_volume("v1").is_err());
        catalog.create_volume("v2").expect("create");
        assert!(catalog.destroy_volume("v1").expect("destroy"));
        assert!(!catalog.destroy_volume("v1").expect("destroy again"));
        assert!(catalog.lookup_volume("v1").expect("lookup").is_none());
        assert!(catalog.lookup_volume("v2").expect("lookup").is_some());
    }

    /// Concurrent writers each land exactly once under the catalog lock.
    #[test]
    fn volume_catalog_serializes_concurrent_writers() {
        let catalog = Baggageclaim::new(Vec::new());
        thread::scope(|scope| {
            for thread_id in 0..8 {
                let catalog = &catalog;
                scope.spawn(move || {
                    for n in 0..25 {
                        catalog
                            .create_volume(&format!("v-{}-{}", thread_id, n))
                            .expect("create");
                    }
                });
            }
        });
        assert_eq!(catalog.list_volumes().expect("list").len(), 200);
    }
}
