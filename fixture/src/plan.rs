//! Human-readable setup plans for `fixture plan`.

use std::fmt::Write as _;

use crate::core::types::WorkerDefaults;
use crate::core::worker::Worker;

/// Describe what setup would do for `worker`, without running anything.
///
/// The first line is the record that would be persisted; each following line
/// is one setup step in execution order.
pub fn render_plan(worker: &Worker, defaults: &WorkerDefaults) -> String {
    let record = worker.base_record(defaults);
    let mut out = String::new();
    let _ = writeln!(out, "worker {}", worker.name());
    let _ = writeln!(
        out,
        "  record: state={} platform={} version={} team={} tags=[{}] active_containers={} active_volumes={}",
        record.state,
        record.platform,
        record.version,
        record.team.as_deref().unwrap_or("-"),
        record.tags.join(", "),
        record.active_containers,
        record.active_volumes,
    );
    for (index, step) in worker.setup_ops().iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index + 1, step.describe());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DbState;
    use crate::test_support::containers;

    #[test]
    fn plan_lists_record_then_steps() {
        let worker = Worker::new("w1")
            .with_team("main")
            .with_containers_created_in_db_and_garden(containers(&["h1"]))
            .with_db_volumes_in_state(DbState::Creating, ["v1"]);
        let plan = render_plan(&worker, &WorkerDefaults::default());
        let lines: Vec<&str> = plan.lines().collect();
        assert_eq!(lines[0], "worker w1");
        assert!(lines[1].contains("team=main"));
        assert!(lines[1].contains("active_containers=1 active_volumes=0"));
        assert_eq!(lines[2], "  1. db containers created [h1]");
        assert_eq!(lines[3], "  2. db volumes creating [v1]");
    }
}
