// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier, project identity derivation, and the session
//! state machine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

crate::define_id! {
    /// Unique identifier for a live assistant session
    /// (`sess-<project_id>-<epoch>-<pid>`).
    pub struct SessionId;
}

impl SessionId {
    /// Build a session id in the documented `sess-<project_id>-<epoch>-<pid>`
    /// format.
    pub fn generate(project_id: &ProjectId, epoch_secs: u64, pid: u32) -> Self {
        Self(format!("sess-{}-{}-{}", project_id.0, epoch_secs, pid))
    }
}

/// Stable identifier for a project, derived from its canonical working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const MAX_BASENAME_LEN: usize = 30;

/// Sanitize a path component into the basename portion of a project id:
/// replace separators with `-`, strip non-alphanumerics except `-`,
/// collapse runs of `-`, and fall back to `"root"` when empty.
pub fn sanitize_basename(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' {
                '-'
            } else if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_dash = false;
    for c in replaced.chars() {
        if c == '-' {
            if !last_dash {
                collapsed.push('-');
            }
            last_dash = true;
        } else {
            collapsed.push(c);
            last_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed.chars().take(MAX_BASENAME_LEN).collect()
    }
}

/// Derive the stable project id for a canonical working-directory path.
///
/// `project_id = sanitize(basename(path))[:30] + "-" + hex6(sha256(path))`
pub fn project_id_for(canonical_path: &Path) -> ProjectId {
    let basename = canonical_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let sanitized = sanitize_basename(basename);

    let mut hasher = Sha256::new();
    hasher.update(canonical_path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let hex6: String = digest[..3].iter().map(|b| format!("{:02x}", b)).collect();

    ProjectId(format!("{}-{}", sanitized, hex6))
}

/// State of a supervised session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unknown,
    Starting,
    Running,
    UsageLimited,
    Error,
    Stopped,
    Recovering,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unknown => "unknown",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::UsageLimited => "usage_limited",
            SessionState::Error => "error",
            SessionState::Stopped => "stopped",
            SessionState::Recovering => "recovering",
        };
        write!(f, "{}", s)
    }
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

/// A timestamped state change, kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: SessionState,
    pub at: String,
}

/// In-process / on-disk record of a supervised session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub project_id: String,
    pub project_name: String,
    pub working_dir: std::path::PathBuf,
    pub state: SessionState,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub recovery_count: u32,
    pub last_seen_epoch: u64,
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
}

impl SessionRecord {
    pub fn new(
        session_id: String,
        project_id: ProjectId,
        project_name: String,
        working_dir: std::path::PathBuf,
        now_iso: &str,
        epoch: u64,
    ) -> Self {
        Self {
            session_id,
            project_id: project_id.0,
            project_name,
            working_dir,
            state: SessionState::Starting,
            restart_count: 0,
            recovery_count: 0,
            last_seen_epoch: epoch,
            transitions: vec![StateTransition {
                state: SessionState::Starting,
                at: now_iso.to_string(),
            }],
        }
    }

    /// Move to a new state, recording the transition only if it actually
    /// changed.
    pub fn set_state(&mut self, new_state: SessionState, now_iso: &str, epoch: u64) {
        if self.state == new_state {
            self.last_seen_epoch = epoch;
            return;
        }
        self.state = new_state;
        self.last_seen_epoch = epoch;
        self.transitions.push(StateTransition {
            state: new_state,
            at: now_iso.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sanitize_replaces_separators_and_collapses() {
        assert_eq!(sanitize_basename("my//weird  repo!!"), "my-weird-repo");
        assert_eq!(sanitize_basename(""), "root");
        assert_eq!(sanitize_basename("---"), "root");
    }

    #[test]
    fn sanitize_truncates_to_30_chars() {
        let long = "a".repeat(50);
        assert_eq!(sanitize_basename(&long).len(), 30);
    }

    #[test]
    fn project_id_is_stable_for_same_path() {
        let path = PathBuf::from("/home/user/my-project");
        let a = project_id_for(&path);
        let b = project_id_for(&path);
        assert_eq!(a, b);
        assert!(a.0.starts_with("my-project-"));
        // basename + "-" + 6 hex chars
        assert_eq!(a.0.len(), "my-project-".len() + 6);
    }

    #[test]
    fn project_id_differs_for_different_paths() {
        let a = project_id_for(&PathBuf::from("/a/repo"));
        let b = project_id_for(&PathBuf::from("/b/repo"));
        assert_ne!(a, b);
    }

    #[test]
    fn session_id_generate_follows_documented_format() {
        let pid = ProjectId("my-project-abc123".to_string());
        let id = SessionId::generate(&pid, 1700000000, 4242);
        assert_eq!(id.as_str(), "sess-my-project-abc123-1700000000-4242");
    }

    #[test]
    fn state_only_records_transition_on_change() {
        let mut rec = SessionRecord::new(
            "sess-1".into(),
            ProjectId("proj-abcdef".into()),
            "proj".into(),
            PathBuf::from("/tmp"),
            "t0",
            0,
        );
        assert_eq!(rec.transitions.len(), 1);
        rec.set_state(SessionState::Starting, "t1", 1);
        assert_eq!(rec.transitions.len(), 1);
        rec.set_state(SessionState::Running, "t2", 2);
        assert_eq!(rec.transitions.len(), 2);
    }
}
