//! Authoring checks run before a worker fixture touches any collaborator.

use std::collections::HashSet;

use crate::core::ops::SetupOp;
use crate::core::worker::Worker;

/// Check a worker for mistakes that can only come from a malformed fixture:
/// - Empty worker name or empty handles
/// - A handle declared twice in the runtime plane (per resource kind)
/// - A handle driven through the database twice (per resource kind)
///
/// Container and volume handles are separate namespaces. Returns sorted,
/// de-duplicated messages (empty when the worker is well formed).
pub fn validate_worker(worker: &Worker) -> Vec<String> {
    let mut errors = Vec::new();

    if worker.name().trim().is_empty() {
        errors.push("worker name must not be empty".to_string());
    }

    check_unique(
        "runtime container",
        worker.containers().iter().map(|c| c.handle()),
        &mut errors,
    );
    check_unique(
        "runtime volume",
        worker.volumes().iter().map(|v| v.handle()),
        &mut errors,
    );

    let mut db_containers = Vec::new();
    let mut db_volumes = Vec::new();
    for op in worker.setup_ops() {
        match op {
            SetupOp::DbContainers { handles, .. } => {
                db_containers.extend(handles.iter().map(String::as_str));
            }
            SetupOp::DbVolumes { handles, .. } => {
                db_volumes.extend(handles.iter().map(String::as_str));
            }
            SetupOp::DbContainerVolumes {
                container_handle,
                paths,
                ..
            } => {
                if container_handle.trim().is_empty() {
                    errors.push("container volumes: container handle must not be empty".to_string());
                }
                if paths.iter().any(|path| path.trim().is_empty()) {
                    errors.push(format!(
                        "container volumes on '{}': mount path must not be empty",
                        container_handle
                    ));
                }
            }
            _ => {}
        }
    }
    check_unique("db container", db_containers.into_iter(), &mut errors);
    check_unique("db volume", db_volumes.into_iter(), &mut errors);

    errors.sort();
    errors.dedup();
    errors
}

fn check_unique<'a>(kind: &str, handles: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for handle in handles {
        if handle.trim().is_empty() {
            errors.push(format!("{} handle must not be empty", kind));
            continue;
        }
        if !seen.insert(handle) {
            errors.push(format!("duplicate {} handle '{}'", kind, handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Container, DbState, Volume};
    use crate::test_support::containers;

    #[test]
    fn well_formed_worker_has_no_errors() {
        let worker = Worker::new("w1")
            .with_containers_created_in_db_and_garden(containers(&["h1", "h2"]))
            .with_db_volumes_in_state(DbState::Creating, ["v1"])
            .with_db_container_volumes_in_state(DbState::Created, "h1", ["/scratch"]);
        assert!(validate_worker(&worker).is_empty());
    }

    #[test]
    fn duplicate_runtime_handles_are_reported_once() {
        let worker = Worker::new("w1").with_garden_containers(containers(&["h1", "h1", "h1"]));
        assert_eq!(
            validate_worker(&worker),
            vec!["duplicate runtime container handle 'h1'"]
        );
    }

    /// The same string may name a container and a volume.
    #[test]
    fn container_and_volume_namespaces_are_independent() {
        let worker = Worker::new("w1")
            .with_garden_containers([Container::new("same")])
            .with_baggageclaim_volumes([Volume::new("same")])
            .with_db_containers_in_state(DbState::Created, ["same"])
            .with_db_volumes_in_state(DbState::Created, ["same"]);
        assert!(validate_worker(&worker).is_empty());
    }

    #[test]
    fn handle_driven_through_db_twice_is_reported() {
        let worker = Worker::new("w1")
            .with_db_containers_in_state(DbState::Creating, ["h1"])
            .with_containers_created_in_db_and_garden(containers(&["h1"]));
        let errors = validate_worker(&worker);
        assert_eq!(errors, vec!["duplicate db container handle 'h1'"]);
    }

    #[test]
    fn empty_names_are_reported() {
        let worker = Worker::new(" ")
            .with_baggageclaim_volumes([Volume::new("")])
            .with_db_container_volumes_in_state(DbState::Creating, "c", [""]);
        let errors = validate_worker(&worker);
        assert!(errors.iter().any(|err| err.contains("worker name")));
        assert!(errors.iter().any(|err| err.contains("runtime volume handle")));
        assert!(errors.iter().any(|err| err.contains("mount path")));
    }
}
