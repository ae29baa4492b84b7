// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for driving a real `relayd` process end to end over its
//! Unix socket. Per-subsystem behavior (WAL replay, stall detection,
//! heartbeat expiry, message-window eviction, ...) already has direct
//! unit coverage in each crate; these specs exercise the one thing unit
//! tests cannot: the binary actually starting, accepting connections,
//! persisting across a restart, and shutting down cleanly.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use relay_daemon::{Request, Response};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Resolves a sibling binary built alongside the test harness.
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

pub fn relayd_binary_path() -> PathBuf {
    binary_path("relayd")
}

pub fn wait_for<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

/// A running `relayd` instance over an isolated state directory.
pub struct Daemon {
    child: Option<Child>,
    state_dir: tempfile::TempDir,
    socket_path: PathBuf,
}

impl Daemon {
    /// Start a fresh daemon with its own state directory.
    pub fn start() -> Self {
        Self::start_with_envs(&[])
    }

    /// Start a daemon whose threshold env overrides are `envs` (spec.md
    /// §6.4), e.g. `[("HEARTBEAT_TIMEOUT_MS", "50")]` for fast tests.
    pub fn start_with_envs(envs: &[(&str, &str)]) -> Self {
        let state_dir = tempfile::tempdir().expect("tempdir");
        Self::start_in(state_dir, envs)
    }

    /// Start a daemon rooted at a specific, already-existing state
    /// directory (used to restart against prior state after a crash).
    pub fn start_in(state_dir: tempfile::TempDir, envs: &[(&str, &str)]) -> Self {
        let socket_path = state_dir.path().join("relayd.sock");
        let mut command = Command::new(binary_path("relayd"));
        command
            .env("RELAY_STATE_DIR", state_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in envs {
            command.env(key, value);
        }
        let child = command.spawn().expect("relayd should start");

        let started = wait_for(Duration::from_secs(5), || socket_path.exists());
        assert!(started, "relayd did not create its socket in time");

        Self {
            child: Some(child),
            state_dir,
            socket_path,
        }
    }

    pub fn state_dir(&self) -> &Path {
        self.state_dir.path()
    }

    /// Connect a fresh client. The daemon handles one request per
    /// connection turn, so tests open a new connection per call or reuse
    /// one across several sequential calls as needed.
    pub fn connect(&self) -> Client {
        let stream = UnixStream::connect(&self.socket_path).expect("connect to relayd socket");
        stream.set_read_timeout(Some(Duration::from_secs(5))).expect("set timeout");
        Client { stream }
    }

    /// Ask the daemon to shut down, then wait for the process to exit.
    pub fn shutdown(mut self) {
        let response = self.connect().call(&Request::Shutdown);
        assert_eq!(response, Response::ShuttingDown);
        if let Some(mut child) = self.child.take() {
            let exited = wait_for(Duration::from_secs(5), || {
                matches!(child.try_wait(), Ok(Some(_)))
            });
            assert!(exited, "relayd did not exit after a shutdown request");
        }
    }

    /// Simulate a crash: SIGKILL, no graceful shutdown sequence, leaving
    /// the recovery marker in place.
    pub fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Hand back the state directory so a new [`Daemon`] can restart over
    /// the same on-disk state (simulating recovery after a crash).
    pub fn into_state_dir(mut self) -> tempfile::TempDir {
        self.kill();
        // Swap out a throwaway TempDir so Drop doesn't also try to clean
        // up a directory whose ownership we're handing to the caller.
        std::mem::replace(&mut self.state_dir, tempfile::tempdir().expect("tempdir"))
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.kill();
    }
}

pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub fn call(&mut self, request: &Request) -> Response {
        let payload = serde_json::to_vec(request).expect("encode request");
        let len = (payload.len() as u32).to_be_bytes();
        self.stream.write_all(&len).expect("write length prefix");
        self.stream.write_all(&payload).expect("write payload");
        self.stream.flush().expect("flush");

        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).expect("read length prefix");
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).expect("read payload");
        serde_json::from_slice(&buf).expect("decode response")
    }
}
