// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence layer (spec.md §4.2): write-ahead log, directory
//! checkpoints, crash-recovery marker, daily-session reservations, and
//! the materialized session/message/todo state they all operate on.

pub mod atomic;
pub mod aux_state;
pub mod checkpoint;
pub mod daily_session;
pub mod recovery;
pub mod state;
pub mod wal;

pub use aux_state::{
    AuxStateError, JsonBlobStore, ModeState, ModeStore, ModelStore, ParamsStore, SessionContext,
    SessionContextStore, SESSION_CONTEXT_CAP,
};
pub use checkpoint::{
    CheckpointError, CheckpointHandle, CheckpointMetadata, CheckpointResult, CheckpointWriter,
    Checkpointer, FsCheckpointWriter,
};
pub use daily_session::{DailySessionError, DailySessionStore};
pub use recovery::{
    clear_recovery_marker, mark_recovery_needed, needs_recovery, recover, RecoveryError,
    RecoveryOutcome,
};
pub use state::{MaterializedState, MESSAGE_WINDOW_CAP};
pub use wal::{Wal, WalEntry, WalError};
