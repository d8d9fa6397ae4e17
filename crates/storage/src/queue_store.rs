// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical queue document persistence.
//!
//! The document is a single JSON file. Every write goes to a sibling
//! tempfile, gets validated by re-parsing, and is `rename`d over the
//! canonical path — the same atomic-replace technique as a WAL
//! snapshot, just without a sequence number to track.

use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use warden_core::queue_doc::QueueDocument;

#[derive(Debug, Error)]
pub enum QueueStoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialize error: {0}")]
    Serialize(serde_json::Error),
    #[error("corrupt_document: {0}")]
    CorruptDocument(serde_json::Error),
    #[error("transient_read_error: document changed mid-read")]
    TransientRead,
}

/// Reads and writes `task-queue.json`, with backups under `backups/`.
pub struct QueueStore {
    queue_path: PathBuf,
    backups_dir: PathBuf,
}

impl QueueStore {
    pub fn new(queue_dir: impl Into<PathBuf>) -> Self {
        let queue_dir = queue_dir.into();
        Self {
            queue_path: queue_dir.join("task-queue.json"),
            backups_dir: queue_dir.join("backups"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.queue_path
    }

    /// Load the canonical document, creating an empty one on first use.
    /// A single transient parse failure is retried once after a short
    /// delay").
    pub fn load(&self) -> Result<QueueDocument, QueueStoreError> {
        match self.try_load() {
            Ok(doc) => Ok(doc),
            Err(QueueStoreError::CorruptDocument(_)) => {
                thread::sleep(Duration::from_millis(50));
                self.try_load().map_err(|e| match e {
                    QueueStoreError::CorruptDocument(_) => QueueStoreError::TransientRead,
                    other => other,
                })
            }
            Err(other) => Err(other),
        }
    }

    fn try_load(&self) -> Result<QueueDocument, QueueStoreError> {
        if !self.queue_path.exists() {
            return Ok(QueueDocument::new(&now_iso()));
        }
        let file = File::open(&self.queue_path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(QueueStoreError::CorruptDocument)
    }

    /// Atomically persist `doc`, first copying the current canonical
    /// file to a timestamped backup.
    pub fn save(&self, doc: &QueueDocument, backup_reason: &str) -> Result<(), QueueStoreError> {
        if let Some(parent) = self.queue_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if self.queue_path.exists() {
            self.backup(backup_reason)?;
        }

        let tmp_path = self.queue_path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, doc).map_err(QueueStoreError::Serialize)?;
            let file = writer.into_inner().map_err(io::Error::from)?;
            file.sync_all()?;
        }

        // Validate before making it canonical.
        let validation = fs::read_to_string(&tmp_path)?;
        if let Err(e) = serde_json::from_str::<QueueDocument>(&validation) {
            let _ = fs::remove_file(&tmp_path);
            return Err(QueueStoreError::CorruptDocument(e));
        }

        fs::rename(&tmp_path, &self.queue_path)?;
        Ok(())
    }

    /// Copy the current canonical document to `backups/backup-<reason>-<ts>.json`.
    pub fn backup(&self, reason: &str) -> Result<PathBuf, QueueStoreError> {
        fs::create_dir_all(&self.backups_dir)?;
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let dest = self
            .backups_dir
            .join(format!("backup-{reason}-{stamp}.json"));
        fs::copy(&self.queue_path, &dest)?;
        Ok(dest)
    }

    /// Most recent backup file, if any — used to recover from a
    /// `corrupt_document` failure.
    pub fn latest_backup(&self) -> Option<PathBuf> {
        let mut entries: Vec<_> = fs::read_dir(&self.backups_dir)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();
        entries.pop()
    }

    /// Remove backups older than `retention_days`. Returns the number removed.
    pub fn prune_backups(&self, retention_days: u32) -> usize {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
        let Ok(entries) = fs::read_dir(&self.backups_dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(modified) = meta.modified() else { continue };
            let modified: chrono::DateTime<Utc> = modified.into();
            if modified < cutoff {
                if fs::remove_file(&path).is_ok() {
                    removed += 1;
                } else {
                    warn!(path = %path.display(), "failed to prune backup");
                }
            }
        }
        removed
    }
}

fn now_iso() -> String {
    warden_core::time_fmt::iso8601(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64,
    )
}
