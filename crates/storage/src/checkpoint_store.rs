// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task checkpoint file I/O.

use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use thiserror::Error;
use warden_core::checkpoint::Checkpoint;

#[derive(Debug, Error)]
pub enum CheckpointStoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes and lists checkpoints under `queue/checkpoints/`.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(queue_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: queue_dir.into().join("checkpoints"),
        }
    }

    /// Write a checkpoint atomically (tmp + rename, same technique as
    /// the queue document).
    pub fn write(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointStoreError> {
        fs::create_dir_all(&self.dir)?;
        let dest = self.dir.join(checkpoint.file_name());
        let tmp = dest.with_extension("json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, checkpoint)?;
            let file = writer.into_inner().map_err(io::Error::from)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &dest)?;
        Ok(dest)
    }

    /// Load every checkpoint for `task_id`, most recent first.
    pub fn list_for_task(&self, task_id: &str) -> Result<Vec<Checkpoint>, CheckpointStoreError> {
        let prefix = format!("{task_id}-");
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Ok(out);
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            let file = File::open(&path)?;
            let checkpoint: Checkpoint = serde_json::from_reader(BufReader::new(file))?;
            out.push(checkpoint);
        }
        out.sort_by_key(|c| std::cmp::Reverse(c.epoch));
        Ok(out)
    }

    /// Most recent checkpoint for a task, if one exists — used to resume
    /// instead of restarting a retried task from scratch.
    pub fn latest_for_task(
        &self,
        task_id: &str,
    ) -> Result<Option<Checkpoint>, CheckpointStoreError> {
        Ok(self.list_for_task(task_id)?.into_iter().next())
    }

    /// Remove checkpoints older than `retention_days`. Returns the count removed.
    pub fn prune(&self, retention_days: u32) -> usize {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(modified) = meta.modified() else { continue };
            let modified: chrono::DateTime<Utc> = modified.into();
            if modified < cutoff && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}
