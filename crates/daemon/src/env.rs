// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use crate::lifecycle::LifecycleError;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: RELAY_STATE_DIR > XDG_STATE_HOME/relay > ~/.local/state/relay
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("RELAY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("relay"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/relay"))
}

fn duration_ms_override(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn usize_override(var: &str) -> Option<usize> {
    std::env::var(var).ok().and_then(|s| s.parse::<usize>().ok())
}

fn bool_override(var: &str) -> Option<bool> {
    std::env::var(var).ok().and_then(|s| s.parse::<bool>().ok())
}

/// spec.md §6.4 configurable thresholds, each read from its own env var
/// when present, else left `None` for [`crate::config::Thresholds::load`]
/// to fill in with the spec's stated default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdOverrides {
    pub stream_stall_warning_ms: Option<Duration>,
    pub stream_stall_timeout_ms: Option<Duration>,
    pub stream_no_content_timeout_ms: Option<Duration>,
    pub heartbeat_timeout_ms: Option<Duration>,
    pub heartbeat_check_interval_ms: Option<Duration>,
    pub checkpoint_interval_ms: Option<Duration>,
    pub max_checkpoints: Option<usize>,
    pub wal_flush_interval_ms: Option<Duration>,
    pub wal_enabled: Option<bool>,
}

pub fn threshold_overrides() -> ThresholdOverrides {
    ThresholdOverrides {
        stream_stall_warning_ms: duration_ms_override("STREAM_STALL_WARNING_MS"),
        stream_stall_timeout_ms: duration_ms_override("STREAM_STALL_TIMEOUT_MS"),
        stream_no_content_timeout_ms: duration_ms_override("STREAM_NO_CONTENT_TIMEOUT_MS"),
        heartbeat_timeout_ms: duration_ms_override("HEARTBEAT_TIMEOUT_MS"),
        heartbeat_check_interval_ms: duration_ms_override("HEARTBEAT_CHECK_INTERVAL_MS"),
        checkpoint_interval_ms: duration_ms_override("CHECKPOINT_INTERVAL_MS"),
        max_checkpoints: usize_override("MAX_CHECKPOINTS"),
        wal_flush_interval_ms: duration_ms_override("WAL_FLUSH_INTERVAL_MS"),
        wal_enabled: bool_override("WAL_ENABLED"),
    }
}
