// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! relayd: the session coordination daemon (spec.md §3).
//!
//! Architecture:
//! - Listener task: accepts Unix socket connections, dispatches each
//!   [`protocol::Request`] and writes back a [`protocol::Response`].
//! - Checkpoint task: periodic durable snapshot + WAL truncation.
//! - Flush task: periodic WAL group-commit flush.
//! - Main task: owns signal handling and the shutdown sequence.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod lifecycle;
mod listener;
mod protocol;
mod protocol_wire;

use lifecycle::{DaemonState, LifecycleError};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("relayd {}", protocol_wire::PROTOCOL_VERSION);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("relayd {}", protocol_wire::PROTOCOL_VERSION);
                println!("Session coordination daemon");
                println!();
                println!("USAGE:");
                println!("    relayd");
                println!();
                println!("relayd listens on a Unix socket for commands from a client and");
                println!("should not normally be invoked directly.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: relayd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = config::Config::load()?;
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting relayd");

    let state = match DaemonState::startup(config.clone()).await {
        Ok(state) => Arc::new(state),
        Err(LifecycleError::LockHeld(lock_path)) => {
            let pid = std::fs::read_to_string(&lock_path).unwrap_or_default();
            eprintln!("relayd is already running");
            if !pid.trim().is_empty() {
                eprintln!("  lock file: {}", lock_path.display());
            }
            std::process::exit(1);
        }
        Err(error) => {
            write_startup_error(&config, &error);
            error!("failed to start relayd: {error}");
            drop(log_guard);
            return Err(error.into());
        }
    };

    let _ = std::fs::remove_file(&config.socket_path);
    let unix_listener = UnixListener::bind(&config.socket_path)?;

    let shutdown_notify = Arc::new(Notify::new());
    tokio::spawn(accept_loop(unix_listener, state.clone(), shutdown_notify.clone()));
    spawn_checkpoint_task(state.clone());
    spawn_flush_task(state.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "relayd ready");
    println!("READY");

    tokio::select! {
        _ = shutdown_notify.notified() => {
            info!("shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    let _ = std::fs::remove_file(&config.socket_path);
    state.shutdown().await?;
    info!("relayd stopped");
    Ok(())
}

async fn accept_loop(listener: UnixListener, state: Arc<DaemonState>, shutdown_notify: Arc<Notify>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let state = state.clone();
                let shutdown_notify = shutdown_notify.clone();
                tokio::spawn(handle_connection(stream, state, shutdown_notify));
            }
            Err(error) => {
                warn!(%error, "failed to accept connection");
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, state: Arc<DaemonState>, shutdown_notify: Arc<Notify>) {
    loop {
        let request = match protocol_wire::read_request(&mut stream, protocol_wire::DEFAULT_TIMEOUT).await {
            Ok(request) => request,
            Err(protocol_wire::ProtocolError::ConnectionClosed) => return,
            Err(error) => {
                warn!(%error, "failed to read request");
                return;
            }
        };

        let is_shutdown = matches!(request, protocol::Request::Shutdown);
        let response = listener::dispatch(&state, request).await;
        if let Err(error) = protocol_wire::write_response(&mut stream, &response, protocol_wire::DEFAULT_TIMEOUT).await {
            warn!(%error, "failed to write response");
            return;
        }
        if is_shutdown {
            shutdown_notify.notify_one();
            return;
        }
    }
}

fn spawn_flush_task(state: Arc<DaemonState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.thresholds.wal_flush_interval);
        loop {
            ticker.tick().await;
            if !state.config.thresholds.wal_enabled {
                continue;
            }
            let mut wal = state.wal.lock();
            if wal.needs_flush() {
                if let Err(error) = wal.flush() {
                    error!(%error, "WAL flush failed");
                }
            }
        }
    });
}

fn spawn_checkpoint_task(state: Arc<DaemonState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.thresholds.checkpoint_interval);
        loop {
            ticker.tick().await;

            let (snapshot, processed_seq) = {
                let snapshot = state.state.lock().clone();
                let wal = state.wal.lock();
                (snapshot, wal.write_seq())
            };

            if processed_seq == 0 {
                continue;
            }

            let unix_ms = chrono::Utc::now().timestamp_millis();
            let handle = state.checkpointer.start(processed_seq, unix_ms, &snapshot);
            let result = tokio::task::spawn_blocking(move || handle.wait()).await;

            match result {
                Ok(Ok(checkpoint_result)) => {
                    tracing::debug!(seq = checkpoint_result.seq, size_bytes = checkpoint_result.size_bytes, "checkpoint complete");
                    let mut wal = state.wal.lock();
                    wal.mark_processed(processed_seq);
                    if let Err(error) = wal.truncate_before(processed_seq) {
                        warn!(%error, "failed to truncate WAL after checkpoint");
                    }
                }
                Ok(Err(error)) => warn!(%error, "checkpoint failed, WAL not truncated"),
                Err(error) => warn!(%error, "checkpoint task panicked"),
            }
        }
    });
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Shifts `relayd.log` → `relayd.log.1` → ... → `relayd.log.3`, deleting
/// the oldest. Best-effort: rotation failures are silently ignored so the
/// daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

const STARTUP_MARKER_PREFIX: &str = "--- relayd: starting (pid: ";

fn write_startup_marker(config: &config::Config) -> Result<(), LifecycleError> {
    use std::io::Write;
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

fn write_startup_error(config: &config::Config, error: &LifecycleError) {
    use std::io::Write;
    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start relayd: {error}");
}

fn setup_logging(config: &config::Config) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
