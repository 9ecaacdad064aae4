//! Scenario-level tests for worker fixtures.
//!
//! These tests set up one or more workers against a shared scenario and then
//! assert on both planes: the persisted control-plane records and the
//! runtime worker produced by `Worker::build`.

use std::collections::BTreeSet;
use std::sync::Arc;

use fixture::core::types::{Container, ContainerOwner, DbState, Volume, WorkerState};
use fixture::core::worker::Worker;
use fixture::io::config::FixtureConfig;
use fixture::scenario::Scenario;
use fixture::test_support::{containers, recording_scenario, scenario, volumes};

/// Every handle declared through the both-planes builders ends up in the
/// runtime catalog and in the control plane, created.
#[test]
fn both_planes_agree_for_compound_builders() {
    let mut scenario = scenario();
    let mut worker = Worker::new("w1")
        .with_containers_created_in_db_and_garden(containers(&["c1", "c2"]))
        .with_volumes_created_in_db_and_baggageclaim(volumes(&["v1", "v2"]));
    worker.setup(&mut scenario).expect("setup");

    let record = scenario.db.lookup_worker("w1").expect("worker");
    let runtime = worker.build(Arc::clone(&scenario.db), record);

    for handle in ["c1", "c2"] {
        assert!(runtime.find_container(handle).is_some(), "runtime {}", handle);
        let db = scenario
            .db
            .lookup_container("w1", &ContainerOwner::fixed_handle(handle))
            .expect("lookup")
            .expect("db record");
        assert_eq!(db.state, DbState::Created);
    }

    let runtime_volumes: BTreeSet<String> = runtime
        .baggageclaim()
        .list_volumes()
        .expect("volumes")
        .iter()
        .map(|v| v.handle().to_string())
        .collect();
    let db_volumes: BTreeSet<String> = scenario
        .db
        .volumes("w1")
        .expect("db volumes")
        .into_iter()
        .filter(|v| v.state == DbState::Created)
        .map(|v| v.handle)
        .collect();
    assert_eq!(runtime_volumes, db_volumes);
}

/// Planes can be declared independently to build orphan scenarios.
///
/// ```text
/// runtime plane: orphan-container, orphan-volume
/// control plane: db-only (creating), db-only-volume (created)
/// ```
#[test]
fn planes_are_independently_declarable() {
    let mut scenario = scenario();
    let mut worker = Worker::new("w1")
        .with_garden_containers([Container::new("orphan-container")])
        .with_baggageclaim_volumes([Volume::new("orphan-volume")])
        .with_db_containers_in_state(DbState::Creating, ["db-only"])
        .with_db_volumes_in_state(DbState::Created, ["db-only-volume"]);
    worker.setup(&mut scenario).expect("setup");

    let record = scenario.db.lookup_worker("w1").expect("worker");
    assert_eq!(record.active_containers, 1);
    assert_eq!(record.active_volumes, 1);

    let runtime = worker.build(Arc::clone(&scenario.db), record);
    assert!(runtime.find_container("db-only").is_none());
    assert!(runtime.find_container("orphan-container").is_some());

    let containers = scenario.db.containers("w1").expect("containers");
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].handle, "db-only");
    assert_eq!(containers[0].state, DbState::Creating);
}

/// Two workers in one scenario keep their resources apart, even with the
/// same handles.
#[test]
fn workers_share_a_scenario_without_interference() {
    let mut scenario = scenario();
    let template = Worker::new("template")
        .with_containers_created_in_db_and_garden(containers(&["shared-handle"]));

    let mut w1 = Worker::new("w1")
        .with_containers_created_in_db_and_garden(containers(&["shared-handle"]))
        .with_team("team-a");
    let mut w2 = Worker::new("w2")
        .with_containers_created_in_db_and_garden(containers(&["shared-handle"]))
        .with_job_build_container_created_in_db_and_garden()
        .with_state(WorkerState::Landing);
    w1.setup(&mut scenario).expect("setup w1");
    w2.setup(&mut scenario).expect("setup w2");

    assert_eq!(scenario.db.containers("w1").expect("w1").len(), 1);
    assert_eq!(scenario.db.containers("w2").expect("w2").len(), 2);
    assert_eq!(w2.container_handles(), vec!["shared-handle", "container-1"]);
    assert_eq!(
        scenario.db.lookup_worker("w1").expect("w1").team.as_deref(),
        Some("team-a")
    );
    assert_eq!(
        scenario.db.lookup_worker("w2").expect("w2").state,
        WorkerState::Landing
    );

    // The template was never set up and still describes one container.
    assert_eq!(template.container_handles(), vec!["shared-handle"]);
    assert!(scenario.db.lookup_worker("template").is_err());
}

/// Full call sequence for a fixture mixing every kind of step.
#[test]
fn setup_calls_follow_append_order() {
    let (mut scenario, db) = recording_scenario();
    let mut worker = Worker::new("w1")
        .with_db_containers_in_state(DbState::Creating, ["c1"])
        .with_active_tasks(2)
        .with_db_container_volumes_in_state(DbState::Creating, "c1", ["/scratch"])
        .with_job_build_container_created_in_db_and_garden()
        .with_tags(["late-tag"]);
    worker.setup(&mut scenario).expect("setup");

    assert_eq!(
        db.calls(),
        vec![
            "save_worker w1",
            "create_container w1 c1",
            "lookup_worker w1",
            "increase_active_tasks w1 2",
            "increase_active_tasks w1 2",
            "lookup_container w1",
            "create_container_volume w1 c1 /scratch",
            "create_job_build_container w1 some-job",
            "container_created w1 container-1",
        ]
    );
    let record = scenario.db.lookup_worker("w1").expect("worker");
    assert_eq!(record.tags, vec!["late-tag"]);
    assert_eq!(record.active_tasks, 2);
}

/// Setup honours the configured team and worker defaults.
#[test]
fn configured_team_and_job_are_used() {
    let mut config = FixtureConfig::default();
    config.scenario.team_name = "ops".to_string();
    config.scenario.job_name = "deploy".to_string();
    config.worker.platform = "windows".to_string();
    let mut scenario = Scenario::in_memory(&config).expect("scenario");

    let mut worker = Worker::new("w1")
        .with_volumes_created_in_db_and_baggageclaim(volumes(&["v1"]))
        .with_job_build_container_created_in_db_and_garden();
    worker.setup(&mut scenario).expect("setup");

    assert_eq!(scenario.team_name, "ops");
    let volumes = scenario.db.volumes("w1").expect("volumes");
    assert_eq!(volumes[0].team_id, scenario.team_id);
    assert_eq!(
        scenario.db.lookup_worker("w1").expect("worker").platform,
        "windows"
    );
}

#[test]
fn setting_up_a_worker_twice_collides_on_fixed_handles() {
    let mut scenario = scenario();
    let mut first = Worker::new("w1").with_db_containers_in_state(DbState::Created, ["h1"]);
    first.setup(&mut scenario).expect("first setup");

    // Setting the same worker up again re-saves the record, then collides.
    let err = first.setup(&mut scenario).expect_err("second setup");
    let message = format!("{:#}", err);
    assert!(message.contains("setup step 1"));
    assert!(message.contains("already exists on worker 'w1'"));
}

/// Handles the control plane generates never collide with handles fixed by
/// the fixture author.
#[test]
fn generated_handles_avoid_fixed_handles() {
    let mut scenario = scenario();
    let mut worker = Worker::new("w1")
        .with_containers_created_in_db_and_garden(containers(&["container-1"]))
        .with_db_volumes_in_state(DbState::Created, ["volume-1"])
        .with_db_containers_in_state(DbState::Creating, ["c1"])
        .with_db_container_volumes_in_state(DbState::Created, "c1", ["/a"])
        .with_job_build_container_created_in_db_and_garden();
    worker.setup(&mut scenario).expect("setup");

    assert_eq!(
        worker.container_handles(),
        vec!["container-1", "container-2"]
    );
    let volume_handles: Vec<String> = scenario
        .db
        .volumes("w1")
        .expect("volumes")
        .into_iter()
        .map(|v| v.handle)
        .collect();
    assert_eq!(volume_handles, vec!["volume-1", "volume-2"]);
}
