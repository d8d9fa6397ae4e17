//! `--clear-queue` removes every task regardless of status.

use crate::prelude::Project;

#[test]
fn clear_empties_a_populated_queue() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-custom", "a", "--queue-mode"])
        .passes();
    project
        .warden()
        .args(&["--add-custom", "b", "--queue-mode"])
        .passes();

    project
        .warden()
        .args(&["--clear-queue"])
        .passes()
        .stdout_has("removed 2 task");

    project
        .warden()
        .args(&["--list-queue"])
        .passes()
        .stdout_has("queue is empty");
}

#[test]
fn clear_on_empty_queue_removes_nothing() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--clear-queue"])
        .passes()
        .stdout_has("removed 0 task");
}
