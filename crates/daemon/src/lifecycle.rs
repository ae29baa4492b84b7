// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup, event wiring, and shutdown (spec.md §3, §5).
//!
//! Grounded on the teacher's `daemon/src/lifecycle.rs`: a single
//! `DaemonState` bundling every subsystem handle, built once in
//! `startup()` and torn down in the exact order `shutdown()` enforces.
//! The teacher acquires a PID lock via `fs2::FileExt::try_lock_exclusive`
//! before touching any other state; that acquisition is kept verbatim.

use crate::config::Config;
use parking_lot::Mutex;
use relay_bus::EventBus;
use relay_core::{Event, WalOp};
use relay_health::{spawn as spawn_stall_detector, HealthConfig, StallDetectorHandle, StreamRegistry};
use relay_registry::{spawn_expiration, ExpirationHandle, ProcessRegistry};
use relay_storage::{
    recover, Checkpointer, DailySessionStore, MaterializedState, ModeStore, ModelStore,
    ParamsStore, SessionContextStore, Wal,
};
use relay_store::{BootstrapSnapshot, SessionStore};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine the state directory (no RELAY_STATE_DIR, XDG_STATE_HOME, or HOME)")]
    NoStateDir,
    #[error("another relayd instance is already running (lock held at {0})")]
    LockHeld(std::path::PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Recovery(#[from] relay_storage::RecoveryError),
    #[error(transparent)]
    DailySession(#[from] relay_storage::DailySessionError),
    #[error(transparent)]
    AuxState(#[from] relay_storage::AuxStateError),
}

/// Every bus topic the session store's `apply_batch` projects (spec.md
/// §4.5); there is no wildcard subscription, so each is registered
/// individually. `"custom"` is left out: it carries no payload the store
/// can project.
const SESSION_STORE_TOPICS: &[&str] = &[
    "session.created",
    "session.updated",
    "session.deleted",
    "session.status",
    "session.idle",
    "session.diff",
    "message.updated",
    "message.removed",
    "message.part.updated",
    "message.part.removed",
    "todo.updated",
    "permission.asked",
    "permission.replied",
    "question.asked",
    "question.replied",
    "question.rejected",
    "lsp.updated",
    "vcs.branch.updated",
    "mcp",
    "provider",
    "process.registered",
    "process.deregistered",
    "process.heartbeat",
    "process.status_changed",
    "process.offline",
    "process.event",
    "stream.stall_warning",
    "stream.timeout",
    "stream.completed",
    "stream.failed",
    "server.instance.disposed",
];

/// Bus topics that also translate to a durable [`WalOp`] (spec.md §4.2,
/// §6.2 "durable operations"). `session.deleted`, process-registry, and
/// stream-health events are in-memory only and never hit the WAL.
const WAL_DURABLE_TOPICS: &[&str] = &["session.created", "session.updated", "message.updated", "todo.updated"];

fn event_to_wal_op(event: &Event) -> Option<WalOp> {
    match event {
        Event::SessionCreated { session } => Some(WalOp::SessionCreate {
            session: session.clone(),
        }),
        Event::SessionUpdated { session } => Some(WalOp::SessionUpdate {
            session: session.clone(),
        }),
        Event::MessageUpdated { message } => Some(WalOp::MessageCreate {
            message: message.clone(),
        }),
        Event::TodoUpdated { session_id, todos } => Some(WalOp::TodoUpdate {
            session_id: session_id.clone(),
            todos: todos.clone(),
        }),
        _ => None,
    }
}

/// Every long-lived handle the daemon process holds (spec.md §5).
pub struct DaemonState {
    pub config: Config,
    pub bus: EventBus,
    pub session_store: SessionStore,
    /// The WAL-durable subset of state, kept in lockstep with every WAL
    /// append so a checkpoint always reflects exactly what has been
    /// buffered (spec.md §4.2.2).
    pub state: Arc<Mutex<MaterializedState>>,
    pub wal: Arc<Mutex<Wal>>,
    pub checkpointer: Arc<Checkpointer>,
    pub stream_registry: Arc<StreamRegistry>,
    pub process_registry: Arc<ProcessRegistry>,
    pub daily_sessions: Arc<DailySessionStore>,
    pub model_store: Arc<ModelStore>,
    pub mode_store: Arc<ModeStore>,
    pub params_store: Arc<ParamsStore>,
    pub session_contexts: Arc<SessionContextStore>,
    pub started_at: std::time::Instant,
    pub recovered: bool,
    pub replayed_entries: usize,

    /// Held for the life of the process; dropping it releases the lock.
    lock_file: Mutex<Option<File>>,
    /// `Option` so shutdown can take the handle through `&self` even
    /// while other `Arc<DaemonState>` clones are held by listener tasks.
    stall_detector: Mutex<Option<StallDetectorHandle>>,
    expiration: Mutex<Option<ExpirationHandle>>,
    unsubscribes: Mutex<Vec<relay_bus::Unsubscribe>>,
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    fs2::FileExt::try_lock_exclusive(&file).map_err(|_| LifecycleError::LockHeld(config.lock_path.clone()))?;
    Ok(file)
}

fn write_version_file(config: &Config) -> std::io::Result<()> {
    let mut file = File::create(&config.version_path)?;
    write!(file, "{}", crate::protocol_wire::PROTOCOL_VERSION)
}

impl DaemonState {
    /// Acquire the PID lock, run crash recovery, and wire every subsystem
    /// onto the bus. On return, the daemon is fully live: published events
    /// are already flowing into the session store and (for the durable
    /// subset) the WAL.
    pub async fn startup(config: Config) -> Result<Self, LifecycleError> {
        let lock_file = acquire_lock(&config)?;
        write_version_file(&config)?;

        let recovered = relay_storage::needs_recovery(&config.state_dir);
        if recovered {
            info!("recovery marker present, recovering from an unclean shutdown");
        } else {
            info!("no recovery marker, starting cleanly");
        }

        let outcome = recover(&config.state_dir, &config.wal_path, &config.checkpoints_dir)?;
        let sessions = outcome.state.sessions.as_slice().to_vec();
        let state = Arc::new(Mutex::new(outcome.state));

        let bus = EventBus::new();
        let session_store = SessionStore::new();
        session_store.bootstrap(BootstrapSnapshot {
            sessions: Some(sessions),
            ..Default::default()
        });

        let mut unsubscribes = Vec::with_capacity(SESSION_STORE_TOPICS.len() + WAL_DURABLE_TOPICS.len());
        for topic in SESSION_STORE_TOPICS {
            let store = session_store.clone();
            unsubscribes.push(bus.subscribe(topic, move |events| store.apply_batch(events)));
        }

        let wal = Arc::new(Mutex::new(outcome.wal));
        for topic in WAL_DURABLE_TOPICS {
            let wal = wal.clone();
            let state = state.clone();
            unsubscribes.push(bus.subscribe(topic, move |events| {
                let ops: Vec<WalOp> = events.iter().filter_map(event_to_wal_op).collect();
                if ops.is_empty() {
                    return;
                }
                let mut wal = wal.lock();
                let mut state = state.lock();
                for op in &ops {
                    state.apply_op(op);
                    if let Err(error) = wal.append(op) {
                        warn!(%error, "failed to buffer WAL entry");
                    }
                }
            }));
        }

        let checkpointer = Arc::new(
            Checkpointer::new(config.checkpoints_dir.clone())
                .with_max_checkpoints(config.thresholds.max_checkpoints),
        );

        let stream_registry = Arc::new(StreamRegistry::new());
        let health_config = HealthConfig {
            stall_warning: config.thresholds.stream_stall_warning,
            stall_timeout: config.thresholds.stream_stall_timeout,
            no_content_timeout: config.thresholds.stream_no_content_timeout,
            ..HealthConfig::default()
        };
        let stall_detector = spawn_stall_detector(stream_registry.clone(), bus.clone(), health_config);

        let process_registry = Arc::new(ProcessRegistry::new(bus.clone()));
        let expiration = spawn_expiration(
            process_registry.clone(),
            bus.clone(),
            config.thresholds.heartbeat_check_interval,
            config.thresholds.heartbeat_timeout,
        );

        let daily_sessions = Arc::new(DailySessionStore::load(config.daily_sessions_path.clone())?);
        let model_store = Arc::new(ModelStore::load(config.model_path.clone())?);
        let mode_store = Arc::new(ModeStore::load(config.mode_path.clone())?);
        let params_store = Arc::new(ParamsStore::load(config.params_path.clone())?);
        let session_contexts = Arc::new(SessionContextStore::load(config.session_contexts_path.clone())?);

        Ok(Self {
            config,
            bus,
            session_store,
            wal,
            checkpointer,
            stream_registry,
            process_registry,
            daily_sessions,
            model_store,
            mode_store,
            params_store,
            session_contexts,
            started_at: std::time::Instant::now(),
            recovered,
            replayed_entries: outcome.replayed_entries,
            lock_file: Mutex::new(Some(lock_file)),
            stall_detector: Mutex::new(Some(stall_detector)),
            expiration: Mutex::new(Some(expiration)),
            unsubscribes: Mutex::new(unsubscribes),
        })
    }

    /// Graceful shutdown, in the exact order spec.md §5 requires: stop
    /// timers, flush the WAL, write a final checkpoint, unsubscribe from
    /// the bus, then remove the recovery marker last. If any step fails,
    /// the marker is left in place so the next startup runs recovery.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        if let Some(handle) = self.stall_detector.lock().take() {
            handle.shutdown();
        }
        if let Some(handle) = self.expiration.lock().take() {
            handle.shutdown();
        }

        let seq = {
            let mut wal = self.wal.lock();
            if let Err(error) = wal.flush() {
                warn!(%error, "final WAL flush failed, retaining recovery marker");
                return Ok(());
            }
            wal.write_seq()
        };

        let unix_ms = chrono::Utc::now().timestamp_millis();
        let snapshot = self.state.lock().clone();
        if let Err(error) = self.checkpointer.checkpoint_sync(seq, unix_ms, &snapshot) {
            warn!(%error, "final checkpoint failed, retaining recovery marker");
            return Ok(());
        }
        self.wal.lock().mark_processed(seq);

        for unsub in self.unsubscribes.lock().drain(..) {
            unsub.unsubscribe();
        }

        relay_storage::clear_recovery_marker(&self.config.state_dir)?;
        self.lock_file.lock().take();
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
