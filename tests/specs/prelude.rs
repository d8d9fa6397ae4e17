//! Test helpers for behavioral specifications.
//!
//! Black-box: invoke the `warden` binary against a temporary project
//! directory and assert on stdout/stderr/exit code plus the queue
//! document it leaves behind.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

fn warden_binary() -> PathBuf {
    binary_path("warden")
}

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(warden_binary());
        cmd.args(&self.args);
        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }
        cmd.env_remove("WARDEN_ASSISTANT_COMMAND");
        cmd
    }

    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("warden should run");
        RunAssert { output }
    }

    pub fn passes(self) -> RunAssert {
        let assert = self.run();
        assert!(
            assert.output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            assert.output.status.code(),
            assert.stdout(),
            assert.stderr()
        );
        assert
    }

    pub fn fails_with(self, code: i32) -> RunAssert {
        let assert = self.run();
        assert_eq!(
            assert.output.status.code(),
            Some(code),
            "stdout: {}\nstderr: {}",
            assert.stdout(),
            assert.stderr()
        );
        assert
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }
}

/// Temporary project directory with a `queue/` subtree.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn queue_doc_path(&self) -> PathBuf {
        self.dir.path().join("queue").join("task-queue.json")
    }

    pub fn warden(&self) -> CliBuilder {
        cli().pwd(self.path())
    }
}
