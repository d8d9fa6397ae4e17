//! Out-of-range and conflicting flags are rejected before any queue
//! mutation happens.

use crate::prelude::Project;

#[test]
fn priority_out_of_range_is_rejected() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-custom", "x", "--queue-mode", "--queue-priority", "11"])
        .fails_with(2);

    assert!(!project.queue_doc_path().exists());
}

#[test]
fn timeout_below_minimum_is_rejected() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-custom", "x", "--queue-mode", "--queue-timeout", "1"])
        .fails_with(2);
}

#[test]
fn conflicting_add_flags_are_rejected() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-issue", "1", "--add-pr", "2", "--queue-mode"])
        .fails_with(2);
}

#[test]
fn pause_and_resume_together_are_rejected() {
    let project = Project::empty();
    project.warden().args(&["--pause-queue", "--resume-queue"]).fails_with(2);
}
