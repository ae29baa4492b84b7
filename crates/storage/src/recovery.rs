// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-recovery marker and recovery procedure (spec.md §3, §4.2.3, §8).
//!
//! The teacher's `daemon/src/lifecycle.rs` always performs an
//! unconditional snapshot-load + WAL-replay on startup and has no marker
//! file of its own; this module is new, added because spec.md makes
//! "was the last shutdown clean" an explicit, testable invariant: a
//! sentinel file is written at startup and removed only on a clean
//! shutdown, so a dirty marker found on the next startup means the
//! previous run crashed mid-operation. The marker itself is written with
//! the same atomic-write-then-fsync discipline as the teacher's
//! `snapshot.rs::save`.

use crate::atomic::write_atomic;
use crate::checkpoint::{self, CheckpointError, CheckpointMetadata};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Filename of the recovery-marker sentinel, relative to the state dir.
pub const RECOVERY_MARKER_FILE: &str = "recovery-needed";

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Wal(#[from] WalError),
}

/// Full result of a recovery pass: the reconstructed state plus the WAL
/// handle left positioned for further appends.
pub struct RecoveryOutcome {
    pub state: MaterializedState,
    pub wal: Wal,
    pub checkpoint_seq: u64,
    pub replayed_entries: usize,
}

fn marker_path(state_dir: &Path) -> PathBuf {
    state_dir.join(RECOVERY_MARKER_FILE)
}

/// Write the recovery marker. Called at the start of startup, before any
/// state mutation, so a crash anywhere during this run leaves the marker
/// behind for the next startup to find.
pub fn mark_recovery_needed(state_dir: &Path) -> std::io::Result<()> {
    write_atomic(&marker_path(state_dir), b"1")
}

/// Remove the recovery marker. Called only at the end of a clean
/// shutdown (spec.md §5): stop timers, flush WAL, write final checkpoint,
/// unsubscribe, *then* remove the marker last.
pub fn clear_recovery_marker(state_dir: &Path) -> std::io::Result<()> {
    let path = marker_path(state_dir);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// True if the marker from a prior run is still present, meaning the
/// previous process did not shut down cleanly.
pub fn needs_recovery(state_dir: &Path) -> bool {
    marker_path(state_dir).exists()
}

/// Load the newest checkpoint (if any), then replay every WAL entry after
/// the checkpointed sequence number. Idempotent: running this twice over
/// the same on-disk state reproduces the same `MaterializedState`, since
/// `MaterializedState::apply_op` is itself idempotent.
pub fn recover(
    state_dir: &Path,
    wal_path: &Path,
    checkpoints_dir: &Path,
) -> Result<RecoveryOutcome, RecoveryError> {
    mark_recovery_needed(state_dir)?;

    let loaded = checkpoint::load_latest_checkpoint(checkpoints_dir)?;
    let (mut state, checkpoint_seq) = match loaded {
        Some((CheckpointMetadata { seq, .. }, state, _)) => {
            info!(seq, "restored from checkpoint");
            (state, seq)
        }
        None => {
            info!("no checkpoint found, starting from empty state");
            (MaterializedState::new(), 0)
        }
    };

    let mut wal = Wal::open(wal_path, checkpoint_seq)?;
    let entries = wal.entries_after(checkpoint_seq)?;
    let replayed_entries = entries.len();
    for entry in &entries {
        state.apply_op(&entry.op);
        wal.mark_processed(entry.seq);
    }

    info!(replayed_entries, "WAL replay complete");

    Ok(RecoveryOutcome {
        state,
        wal,
        checkpoint_seq,
        replayed_entries,
    })
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
