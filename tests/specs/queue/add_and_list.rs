//! Adding tasks and reading them back through `--list-queue`.

use crate::prelude::Project;

#[test]
fn add_custom_task_appears_in_listing() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-custom", "fix the thing", "--queue-mode", "--queue-priority", "2"])
        .passes();

    project
        .warden()
        .args(&["--list-queue"])
        .passes()
        .stdout_has("priority=2")
        .stdout_has("fix the thing");
}

#[test]
fn three_tasks_all_land_in_the_document() {
    let project = Project::empty();
    for (desc, priority) in [("low", "9"), ("high", "1"), ("mid", "5")] {
        project
            .warden()
            .args(&["--add-custom", desc, "--queue-mode", "--queue-priority", priority])
            .passes();
    }

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(project.queue_doc_path()).unwrap()).unwrap();
    let tasks = doc["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(doc["total_tasks"], 3);
    assert_eq!(doc["pending_tasks"], 3);
}

#[test]
fn empty_queue_reports_empty() {
    let project = Project::empty();
    project.warden().args(&["--list-queue"]).passes().stdout_has("queue is empty");
}
