//! Pausing and resuming dispatch without touching queued tasks.

use crate::prelude::Project;

#[test]
fn pause_then_resume_round_trips() {
    let project = Project::empty();
    project.warden().args(&["--pause-queue"]).passes();
    project
        .warden()
        .args(&["--list-queue"])
        .passes()
        .stdout_has("queue is paused");

    project.warden().args(&["--resume-queue"]).passes();
    let listing = project.warden().args(&["--list-queue"]).passes().stdout();
    assert!(!listing.contains("queue is paused"));
}

#[test]
fn dry_run_pause_does_not_persist() {
    let project = Project::empty();
    project.warden().args(&["--pause-queue", "--dry-run"]).passes();
    let listing = project.warden().args(&["--list-queue"]).passes().stdout();
    assert!(!listing.contains("queue is paused"));
}
