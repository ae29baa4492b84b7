// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: on-disk path layout (spec.md §6.1) and the
//! env-tunable thresholds (spec.md §6.4).
//!
//! Grounded on the teacher's `lifecycle.rs::Config` (a flat struct of
//! every path the daemon touches, built once in `Config::load()` from
//! `env::state_dir()`).

use crate::env::{self, ThresholdOverrides};
use crate::lifecycle::LifecycleError;
use std::path::PathBuf;
use std::time::Duration;

/// spec.md §6.4 thresholds, resolved from env overrides or their stated
/// defaults.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub stream_stall_warning: Duration,
    pub stream_stall_timeout: Duration,
    pub stream_no_content_timeout: Duration,
    pub heartbeat_timeout: Duration,
    pub heartbeat_check_interval: Duration,
    pub checkpoint_interval: Duration,
    pub max_checkpoints: usize,
    pub wal_flush_interval: Duration,
    pub wal_enabled: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stream_stall_warning: Duration::from_secs(15),
            stream_stall_timeout: Duration::from_secs(60),
            stream_no_content_timeout: Duration::from_secs(120),
            heartbeat_timeout: Duration::from_secs(30),
            heartbeat_check_interval: Duration::from_secs(10),
            checkpoint_interval: Duration::from_secs(300),
            max_checkpoints: 3,
            wal_flush_interval: Duration::from_secs(1),
            wal_enabled: true,
        }
    }
}

impl Thresholds {
    fn load() -> Self {
        let defaults = Self::default();
        let o: ThresholdOverrides = env::threshold_overrides();
        Self {
            stream_stall_warning: o.stream_stall_warning_ms.unwrap_or(defaults.stream_stall_warning),
            stream_stall_timeout: o.stream_stall_timeout_ms.unwrap_or(defaults.stream_stall_timeout),
            stream_no_content_timeout: o
                .stream_no_content_timeout_ms
                .unwrap_or(defaults.stream_no_content_timeout),
            heartbeat_timeout: o.heartbeat_timeout_ms.unwrap_or(defaults.heartbeat_timeout),
            heartbeat_check_interval: o
                .heartbeat_check_interval_ms
                .unwrap_or(defaults.heartbeat_check_interval),
            checkpoint_interval: o.checkpoint_interval_ms.unwrap_or(defaults.checkpoint_interval),
            max_checkpoints: o.max_checkpoints.unwrap_or(defaults.max_checkpoints),
            wal_flush_interval: o.wal_flush_interval_ms.unwrap_or(defaults.wal_flush_interval),
            wal_enabled: o.wal_enabled.unwrap_or(defaults.wal_enabled),
        }
    }
}

/// Every path the daemon reads or writes, plus the resolved thresholds.
/// Built once in [`Config::load`] and then treated as immutable for the
/// life of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub logs_dir: PathBuf,

    pub persistence_dir: PathBuf,
    pub wal_path: PathBuf,
    pub last_active_path: PathBuf,
    pub daily_sessions_path: PathBuf,
    pub session_contexts_path: PathBuf,
    pub checkpoints_dir: PathBuf,

    pub model_path: PathBuf,
    pub mode_path: PathBuf,
    pub params_path: PathBuf,

    pub thresholds: Thresholds,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let persistence_dir = state_dir.join("persistence");
        let logs_dir = state_dir.join("logs");

        Ok(Self {
            socket_path: state_dir.join("relayd.sock"),
            lock_path: state_dir.join("relayd.lock"),
            version_path: state_dir.join("relayd.version"),
            log_path: logs_dir.join("relayd.log"),
            logs_dir,

            wal_path: persistence_dir.join("wal.jsonl"),
            last_active_path: persistence_dir.join("last-active.json"),
            daily_sessions_path: persistence_dir.join("daily-sessions.json"),
            session_contexts_path: persistence_dir.join("session-contexts.json"),
            checkpoints_dir: persistence_dir.join("checkpoints"),
            persistence_dir,

            model_path: state_dir.join("model.json"),
            mode_path: state_dir.join("mode.json"),
            params_path: state_dir.join("params.json"),

            thresholds: Thresholds::load(),
            state_dir,
        })
    }
}
