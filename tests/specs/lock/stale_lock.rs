//! A lock directory left behind by a dead process is reclaimed instead
//! of blocking new writers.

use crate::prelude::Project;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_stale_write_lock(project: &Project) {
    let lock_dir = project.path().join("queue").join(".write.lock.d");
    std::fs::create_dir_all(&lock_dir).unwrap();

    // A pid essentially guaranteed not to be a live process in the test
    // sandbox, combined with a timestamp well past the 10-minute
    // staleness window, so either signal alone would mark it stale.
    let stale_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .saturating_sub(3600);
    let stale_iso = chrono::DateTime::from_timestamp(stale_epoch as i64, 0)
        .unwrap()
        .to_rfc3339();

    std::fs::write(lock_dir.join("pid"), "999999").unwrap();
    std::fs::write(lock_dir.join("timestamp"), stale_iso).unwrap();
    std::fs::write(lock_dir.join("hostname"), "stale-host").unwrap();
    std::fs::write(lock_dir.join("user"), "nobody").unwrap();
    std::fs::write(lock_dir.join("operation"), "add_task").unwrap();
    std::fs::write(lock_dir.join("lock_type"), "write").unwrap();
}

#[test]
fn stale_lock_is_reclaimed_not_blocked_on() {
    let project = Project::empty();
    std::fs::create_dir_all(project.path().join("queue")).unwrap();
    write_stale_write_lock(&project);

    project
        .warden()
        .args(&["--add-custom", "recovered", "--queue-mode"])
        .passes();

    let lock_dir = project.path().join("queue").join(".write.lock.d");
    assert!(!lock_dir.exists(), "lock directory should be released after the write completes");

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(project.queue_doc_path()).unwrap()).unwrap();
    assert_eq!(doc["tasks"].as_array().unwrap().len(), 1);
}
