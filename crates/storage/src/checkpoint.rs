// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background checkpointing with zstd compression and durable fsync.
//!
//! The checkpointer runs I/O off the main thread while ensuring durability
//! guarantees for crash recovery. The key invariant: the checkpoint
//! directory must be durable (including the checkpoints-root directory
//! fsync) before WAL truncation.
//!
//! ## Design
//!
//! ```text
//! Main Thread                    Background Thread
//! ───────────────────────────    ─────────────────────────────
//! clone state (~10ms)
//!   │
//!   └─────────────────────────→  serialize + compress sessions.json
//!                                write last-active.json, metadata.json
//!                                write all three into checkpoint-<ms>.tmp/
//!                                fsync each file
//!                                rename dir → checkpoint-<ms>/
//!                                fsync checkpoints root directory
//!                                prune to maxCheckpoints most-recent
//!                                  │
//!   ←────────────────────────────┘ (completion signal)
//! truncate WAL (safe now)
//! ```
//!
//! Each checkpoint is a directory (spec.md §4.2.2, §6.1) rather than the
//! teacher's single `.bak.N`-rotated file (`storage/src/checkpoint.rs`),
//! containing `sessions.json` (zstd-compressed `MaterializedState`),
//! `last-active.json` (plain JSON, small and worth keeping inspectable),
//! and `metadata.json` (seq + format version + creation time). The
//! `CheckpointWriter` trait, background-thread/`mpsc`-handle pattern, and
//! fsync ordering are kept from the teacher almost verbatim.
//!
//! ## Testability
//!
//! The `CheckpointWriter` trait abstracts all I/O operations, enabling
//! deterministic unit tests with a fake writer and error injection for
//! crash scenario testing.

use crate::state::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Current on-disk checkpoint format version.
pub const CURRENT_CHECKPOINT_VERSION: u32 = 1;

/// Number of most-recent checkpoint directories retained by default
/// (spec.md §6.4 `MAX_CHECKPOINTS`).
pub const DEFAULT_MAX_CHECKPOINTS: usize = 3;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("checkpoint failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub seq: u64,
    pub dir: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub version: u32,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

/// Trait abstracting checkpoint I/O for testability.
pub trait CheckpointWriter: Send + Sync + 'static {
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;
    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;
    fn remove_dir(&self, path: &Path) -> Result<(), CheckpointError>;
    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError>;
}

/// Production checkpoint writer using real filesystem operations.
#[derive(Clone)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        let file = File::open(path)?;
        file.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        let dir = File::open(path)?;
        dir.sync_all()?;
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// Handle to a running checkpoint operation.
pub struct CheckpointHandle {
    pub seq: u64,
    receiver: mpsc::Receiver<Result<CheckpointResult, CheckpointError>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl CheckpointHandle {
    /// Block until the checkpoint directory is fully durable. Only after
    /// this returns `Ok` is it safe to truncate the WAL.
    pub fn wait(self) -> Result<CheckpointResult, CheckpointError> {
        self.receiver
            .recv()
            .map_err(|_| CheckpointError::Failed("checkpoint thread panicked".into()))?
    }

    pub fn try_wait(&self) -> Option<Result<CheckpointResult, CheckpointError>> {
        self.receiver.try_recv().ok()
    }
}

/// Manages background checkpoint-directory writes and retention.
pub struct Checkpointer<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    checkpoints_dir: PathBuf,
    compression_level: i32,
    max_checkpoints: usize,
}

impl Checkpointer<FsCheckpointWriter> {
    pub fn new(checkpoints_dir: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, checkpoints_dir)
    }
}

impl<W: CheckpointWriter + Clone> Checkpointer<W> {
    pub fn with_writer(writer: W, checkpoints_dir: PathBuf) -> Self {
        Self {
            writer,
            checkpoints_dir,
            compression_level: 3,
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
        }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_max_checkpoints(mut self, max_checkpoints: usize) -> Self {
        self.max_checkpoints = max_checkpoints;
        self
    }

    /// Start a background checkpoint at `unix_ms` (the directory's name
    /// component; passed in rather than read from the clock so tests stay
    /// deterministic under `relay_core::FakeClock`).
    pub fn start(&self, seq: u64, unix_ms: i64, state: &MaterializedState) -> CheckpointHandle {
        let state_clone = state.clone();
        let writer = self.writer.clone();
        let checkpoints_dir = self.checkpoints_dir.clone();
        let compression_level = self.compression_level;
        let max_checkpoints = self.max_checkpoints;

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = checkpoint_blocking(
                &writer,
                seq,
                unix_ms,
                &state_clone,
                &checkpoints_dir,
                compression_level,
                max_checkpoints,
            );
            let _ = tx.send(result);
        });

        CheckpointHandle {
            seq,
            receiver: rx,
            handle,
        }
    }

    /// Synchronous checkpoint (for shutdown, spec.md §5).
    pub fn checkpoint_sync(
        &self,
        seq: u64,
        unix_ms: i64,
        state: &MaterializedState,
    ) -> Result<CheckpointResult, CheckpointError> {
        checkpoint_blocking(
            &self.writer,
            seq,
            unix_ms,
            state,
            &self.checkpoints_dir,
            self.compression_level,
            self.max_checkpoints,
        )
    }
}

fn checkpoint_blocking<W: CheckpointWriter>(
    writer: &W,
    seq: u64,
    unix_ms: i64,
    state: &MaterializedState,
    checkpoints_dir: &Path,
    compression_level: i32,
    max_checkpoints: usize,
) -> Result<CheckpointResult, CheckpointError> {
    let final_dir = checkpoints_dir.join(format!("checkpoint-{unix_ms}"));
    let tmp_dir = checkpoints_dir.join(format!("checkpoint-{unix_ms}.tmp"));
    let _ = writer.remove_dir(&tmp_dir);

    let sessions_json = serde_json::to_vec(state)?;
    let sessions_compressed = zstd::encode_all(sessions_json.as_slice(), compression_level)
        .map_err(|e| CheckpointError::Compress(e.to_string()))?;
    let last_active_json = serde_json::to_vec(&state.last_active)?;
    let metadata_json = serde_json::to_vec(&CheckpointMetadata {
        version: CURRENT_CHECKPOINT_VERSION,
        seq,
        created_at: Utc::now(),
    })?;

    let sessions_path = tmp_dir.join("sessions.json");
    let last_active_path = tmp_dir.join("last-active.json");
    let metadata_path = tmp_dir.join("metadata.json");

    writer.write_file(&sessions_path, &sessions_compressed)?;
    writer.fsync_file(&sessions_path)?;
    writer.write_file(&last_active_path, &last_active_json)?;
    writer.fsync_file(&last_active_path)?;
    writer.write_file(&metadata_path, &metadata_json)?;
    writer.fsync_file(&metadata_path)?;

    // Directory entries for the three files above must themselves be
    // durable before we rename the whole directory into place.
    writer.fsync_dir(&tmp_dir)?;
    writer.rename(&tmp_dir, &final_dir)?;

    // CRITICAL for WAL truncation safety: the rename of the checkpoint
    // directory itself must be durable before the caller truncates the WAL.
    if let Some(parent) = final_dir.parent() {
        writer.fsync_dir(parent)?;
    }

    let size_bytes = writer.file_size(&sessions_path).unwrap_or(sessions_compressed.len() as u64);

    prune_old_checkpoints(checkpoints_dir, max_checkpoints)?;

    Ok(CheckpointResult {
        seq,
        dir: final_dir,
        size_bytes,
    })
}

/// List checkpoint directory names under `checkpoints_dir`, newest first
/// (by the numeric `checkpoint-<unixMs>` suffix).
pub fn list_checkpoints(checkpoints_dir: &Path) -> std::io::Result<Vec<(i64, PathBuf)>> {
    let mut found = Vec::new();
    if !checkpoints_dir.exists() {
        return Ok(found);
    }
    for entry in std::fs::read_dir(checkpoints_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(ms_str) = name.strip_prefix("checkpoint-") {
            if let Ok(ms) = ms_str.parse::<i64>() {
                found.push((ms, path));
            }
        }
    }
    found.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(found)
}

/// Keep only the `max_checkpoints` most-recent checkpoint directories
/// (spec.md §4.2.2, §8 "checkpoints retain at most N most-recent").
fn prune_old_checkpoints(checkpoints_dir: &Path, max_checkpoints: usize) -> std::io::Result<()> {
    let existing = list_checkpoints(checkpoints_dir)?;
    for (_, path) in existing.into_iter().skip(max_checkpoints) {
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Load the newest on-disk checkpoint, if any (spec.md §4.2.3 recovery).
pub fn load_latest_checkpoint(
    checkpoints_dir: &Path,
) -> Result<Option<(CheckpointMetadata, MaterializedState, HashMap<relay_core::SessionId, DateTime<Utc>>)>, CheckpointError>
{
    let checkpoints = list_checkpoints(checkpoints_dir)?;
    let Some((_, dir)) = checkpoints.into_iter().next() else {
        return Ok(None);
    };
    load_checkpoint_dir(&dir).map(Some)
}

fn load_checkpoint_dir(
    dir: &Path,
) -> Result<(CheckpointMetadata, MaterializedState, HashMap<relay_core::SessionId, DateTime<Utc>>), CheckpointError>
{
    let metadata: CheckpointMetadata =
        serde_json::from_slice(&std::fs::read(dir.join("metadata.json"))?)?;

    let compressed = std::fs::read(dir.join("sessions.json"))?;
    let decoder = zstd::stream::read::Decoder::new(compressed.as_slice())
        .map_err(|e| CheckpointError::Compress(e.to_string()))?;
    let mut state: MaterializedState = serde_json::from_reader(decoder)?;

    let last_active: HashMap<relay_core::SessionId, DateTime<Utc>> =
        serde_json::from_slice(&std::fs::read(dir.join("last-active.json"))?)?;
    state.last_active = last_active.clone();

    Ok((metadata, state, last_active))
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
