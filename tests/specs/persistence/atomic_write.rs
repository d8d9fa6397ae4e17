//! The queue document is never observed half-written: every save goes
//! to a tempfile and is renamed into place.

use crate::prelude::Project;

#[test]
fn queue_document_is_valid_json_after_every_write() {
    let project = Project::empty();
    for i in 0..5 {
        project
            .warden()
            .args(&["--add-custom", &format!("task-{i}"), "--queue-mode"])
            .passes();

        let contents = std::fs::read_to_string(project.queue_doc_path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&contents)
            .unwrap_or_else(|e| panic!("queue document was not valid JSON after write {i}: {e}\n{contents}"));
        assert_eq!(doc["tasks"].as_array().unwrap().len(), i + 1);
    }
}

#[test]
fn no_tempfiles_are_left_behind_in_the_queue_dir() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-custom", "a", "--queue-mode"])
        .passes();

    let leftover: Vec<_> = std::fs::read_dir(project.path().join("queue"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".tmp") || name.starts_with(".write"))
        .collect();
    assert!(leftover.is_empty(), "leftover tempfiles/locks: {leftover:?}");
}

#[test]
fn a_backup_is_written_alongside_every_save() {
    let project = Project::empty();
    project
        .warden()
        .args(&["--add-custom", "a", "--queue-mode"])
        .passes();
    project
        .warden()
        .args(&["--add-custom", "b", "--queue-mode"])
        .passes();

    let backups_dir = project.path().join("queue").join("backups");
    let count = std::fs::read_dir(&backups_dir).map(|d| d.count()).unwrap_or(0);
    assert!(count >= 1, "expected at least one backup after two saves");
}
