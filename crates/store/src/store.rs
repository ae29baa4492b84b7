// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reactive session state store (spec.md §4.5).
//!
//! Grounded on `storage/src/state.rs`'s "apply an op, mutate the struct"
//! idiom, generalized from a single committed-op type (`WalOp`) to the
//! full bus `Event` surface, and using `relay_core::ordered::OrderedSeq`
//! for the ordered/binary-search/windowed-cap projections the teacher's
//! plain `HashMap`-based state doesn't need.

use parking_lot::Mutex;
use relay_core::{
    Event, Message, MessageId, OrderedSeq, Part, Permission, Process, Question, Session,
    SessionId, SessionStatus, Todo,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;
use tracing::warn;

/// Same cap as `relay_storage::MESSAGE_WINDOW_CAP` (spec.md §4.5.1); kept
/// as an independent constant since this crate does not depend on
/// `relay-storage` — the store is a read-side projection, not the
/// durable copy.
pub const MESSAGE_WINDOW_CAP: usize = 100;

/// Snapshot passed to [`SessionStore::bootstrap`] (spec.md §4.5.4).
#[derive(Debug, Clone, Default)]
pub struct BootstrapSnapshot {
    pub providers: Option<Value>,
    pub provider_list: Option<Value>,
    pub agents: Option<Value>,
    pub config: Option<Value>,
    pub sessions: Option<Vec<Session>>,
}

/// Data applied in one shot by [`SessionStore::deep_sync`] (spec.md
/// §4.5.5).
#[derive(Debug, Clone, Default)]
pub struct DeepSyncData {
    pub messages: Vec<Message>,
    pub todos: Vec<Todo>,
    pub diff: Option<Value>,
}

struct Inner {
    sessions: OrderedSeq<Session>,
    session_status: HashMap<SessionId, SessionStatus>,
    messages_by_session: HashMap<SessionId, OrderedSeq<Message>>,
    parts_by_message: HashMap<MessageId, OrderedSeq<Part>>,
    todos_by_session: HashMap<SessionId, OrderedSeq<Todo>>,
    permissions_by_session: HashMap<SessionId, OrderedSeq<Permission>>,
    questions_by_session: HashMap<SessionId, OrderedSeq<Question>>,
    diff_by_session: HashMap<SessionId, Value>,
    processes: OrderedSeq<Process>,
    mcp: Option<Value>,
    lsp: Option<Value>,
    provider: Option<Value>,
    provider_list: Option<Value>,
    agents: Option<Value>,
    config: Option<Value>,
    vcs: Option<Value>,
    path: Option<Value>,
    daemon: Option<Value>,
    health: Option<Value>,
    /// One-shot pending-mode-change signals (spec.md §4.5.3
    /// `message.part.updated`), drained by [`SessionStore::take_pending_mode_changes`].
    pending_mode_changes: Vec<Part>,
}

impl Inner {
    fn new() -> Self {
        Self {
            sessions: OrderedSeq::new(),
            session_status: HashMap::new(),
            messages_by_session: HashMap::new(),
            parts_by_message: HashMap::new(),
            todos_by_session: HashMap::new(),
            permissions_by_session: HashMap::new(),
            questions_by_session: HashMap::new(),
            diff_by_session: HashMap::new(),
            processes: OrderedSeq::new(),
            mcp: None,
            lsp: None,
            provider: None,
            provider_list: None,
            agents: None,
            config: None,
            vcs: None,
            path: None,
            daemon: None,
            health: None,
            pending_mode_changes: Vec::new(),
        }
    }

    fn apply(&mut self, event: &Event) {
        match event {
            Event::SessionCreated { session } | Event::SessionUpdated { session } => {
                self.sessions.upsert(session.clone());
            }
            Event::SessionDeleted { session_id } => {
                self.sessions.remove(session_id);
                self.session_status.remove(session_id);
                self.messages_by_session.remove(session_id);
                self.todos_by_session.remove(session_id);
                self.permissions_by_session.remove(session_id);
                self.questions_by_session.remove(session_id);
                self.diff_by_session.remove(session_id);
            }
            Event::SessionStatusChanged { session_id, status } => {
                self.session_status.insert(session_id.clone(), *status);
            }
            Event::SessionIdle { session_id } => {
                self.session_status.insert(session_id.clone(), SessionStatus::Idle);
            }
            Event::SessionDiff { session_id, diff } => {
                self.diff_by_session.insert(session_id.clone(), diff.clone());
            }
            Event::MessageUpdated { message } => {
                let seq = self.messages_by_session.entry(message.session_id.clone()).or_default();
                for evicted_id in seq.upsert_capped(message.clone(), MESSAGE_WINDOW_CAP) {
                    self.parts_by_message.remove(&evicted_id);
                }
            }
            Event::MessageRemoved { session_id, message_id } => {
                if let Some(seq) = self.messages_by_session.get_mut(session_id) {
                    seq.remove(message_id);
                }
                self.parts_by_message.remove(message_id);
            }
            Event::MessagePartUpdated { part } => {
                if part.is_completed_mode_change() {
                    self.pending_mode_changes.push(part.clone());
                }
                self.parts_by_message.entry(part.message_id.clone()).or_default().upsert(part.clone());
            }
            Event::MessagePartRemoved { message_id, part_id } => {
                if let Some(seq) = self.parts_by_message.get_mut(message_id) {
                    seq.remove(part_id);
                }
            }
            Event::TodoUpdated { session_id, todos } => {
                let seq = self.todos_by_session.entry(session_id.clone()).or_default();
                *seq = OrderedSeq::new();
                for todo in todos {
                    seq.upsert(todo.clone());
                }
            }
            Event::PermissionAsked { permission } => {
                self.permissions_by_session
                    .entry(permission.session_id.clone())
                    .or_default()
                    .upsert(permission.clone());
            }
            Event::PermissionReplied { session_id, id } => {
                if let Some(seq) = self.permissions_by_session.get_mut(session_id) {
                    seq.remove(id);
                }
            }
            Event::QuestionAsked { question } => {
                self.questions_by_session
                    .entry(question.session_id.clone())
                    .or_default()
                    .upsert(question.clone());
            }
            Event::QuestionReplied { session_id, id } | Event::QuestionRejected { session_id, id } => {
                if let Some(seq) = self.questions_by_session.get_mut(session_id) {
                    seq.remove(id);
                }
            }
            Event::LspUpdated { payload } => self.lsp = Some(payload.clone()),
            Event::VcsBranchUpdated { payload } => self.vcs = Some(payload.clone()),
            Event::Mcp { payload } => self.mcp = Some(payload.clone()),
            Event::Provider { payload } => self.provider = Some(payload.clone()),
            Event::ProcessRegistered { process } | Event::ProcessHeartbeat { process } => {
                self.processes.upsert(process.clone());
            }
            Event::ProcessDeregistered { process_id } => {
                self.processes.remove(process_id);
            }
            Event::ProcessStatusChanged { .. } | Event::ProcessOffline { .. } | Event::ProcessEvent { .. } => {
                // Surfaced through `process.registered`/`process.heartbeat`
                // snapshots; no separate store-side projection needed.
            }
            Event::StreamStallWarning { .. }
            | Event::StreamTimeout { .. }
            | Event::StreamCompleted { .. }
            | Event::StreamFailed { .. } => {
                // Stream health is observability, not session state
                // (spec.md §4.3 Non-goals) — not projected here.
            }
            Event::ServerInstanceDisposed => {
                warn!("server instance disposed; caller must rebuild via bootstrap");
                *self = Inner::new();
            }
            Event::Custom => {}
        }
    }
}

/// The reactive projection. Cheaply cloneable; all clones share state and
/// the same change-notification channel.
#[derive(Clone)]
pub struct SessionStore {
    inner: std::sync::Arc<Mutex<Inner>>,
    version_tx: std::sync::Arc<watch::Sender<u64>>,
    deep_synced: std::sync::Arc<Mutex<HashSet<SessionId>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            inner: std::sync::Arc::new(Mutex::new(Inner::new())),
            version_tx: std::sync::Arc::new(version_tx),
            deep_synced: std::sync::Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// A receiver that resolves once per applied batch; consumers should
    /// re-read whatever projections they care about after each signal
    /// rather than trying to diff the event payload themselves (spec.md
    /// §4.5.3 "single coherent transition").
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    /// Apply every event in `events` under one lock acquisition, then
    /// bump the version and notify watchers exactly once — the "single
    /// atomic batch per emitted event window" guarantee (spec.md §4.5,
    /// §4.5.3).
    pub fn apply_batch(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        {
            let mut inner = self.inner.lock();
            for event in events {
                inner.apply(event);
            }
        }
        self.bump_version();
    }

    fn bump_version(&self) {
        let next = *self.version_tx.borrow() + 1;
        let _ = self.version_tx.send(next);
    }

    /// Atomically replace the bootstrap-scoped projections in one
    /// transition (spec.md §4.5.4): providers, provider list, agents,
    /// config, and optionally the full session list.
    pub fn bootstrap(&self, snapshot: BootstrapSnapshot) {
        {
            let mut inner = self.inner.lock();
            if let Some(providers) = snapshot.providers {
                inner.provider = Some(providers);
            }
            if let Some(provider_list) = snapshot.provider_list {
                inner.provider_list = Some(provider_list);
            }
            if let Some(agents) = snapshot.agents {
                inner.agents = Some(agents);
            }
            if let Some(config) = snapshot.config {
                inner.config = Some(config);
            }
            if let Some(sessions) = snapshot.sessions {
                inner.sessions = OrderedSeq::new();
                for session in sessions {
                    inner.sessions.upsert(session);
                }
            }
        }
        self.bump_version();
    }

    /// One-shot per-session deep sync (spec.md §4.5.5): a no-op if this
    /// session id was already deep-synced during this store's lifetime.
    /// Returns whether the sync actually applied.
    pub fn deep_sync(&self, session_id: &SessionId, data: DeepSyncData) -> bool {
        {
            let mut synced = self.deep_synced.lock();
            if synced.contains(session_id) {
                return false;
            }
            synced.insert(session_id.clone());
        }

        {
            let mut inner = self.inner.lock();
            let seq = inner.messages_by_session.entry(session_id.clone()).or_default();
            *seq = OrderedSeq::new();
            for message in data.messages {
                seq.upsert_capped(message, MESSAGE_WINDOW_CAP);
            }
            let todos = inner.todos_by_session.entry(session_id.clone()).or_default();
            *todos = OrderedSeq::new();
            for todo in data.todos {
                todos.upsert(todo);
            }
            if let Some(diff) = data.diff {
                inner.diff_by_session.insert(session_id.clone(), diff);
            }
        }
        self.bump_version();
        true
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.lock().sessions.iter().cloned().collect()
    }

    pub fn session_status(&self, session_id: &SessionId) -> Option<SessionStatus> {
        self.inner.lock().session_status.get(session_id).copied()
    }

    pub fn messages(&self, session_id: &SessionId) -> Vec<Message> {
        self.inner
            .lock()
            .messages_by_session
            .get(session_id)
            .map(|seq| seq.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn parts(&self, message_id: &MessageId) -> Vec<Part> {
        self.inner
            .lock()
            .parts_by_message
            .get(message_id)
            .map(|seq| seq.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn todos(&self, session_id: &SessionId) -> Vec<Todo> {
        self.inner
            .lock()
            .todos_by_session
            .get(session_id)
            .map(|seq| seq.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn permissions(&self, session_id: &SessionId) -> Vec<Permission> {
        self.inner
            .lock()
            .permissions_by_session
            .get(session_id)
            .map(|seq| seq.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn questions(&self, session_id: &SessionId) -> Vec<Question> {
        self.inner
            .lock()
            .questions_by_session
            .get(session_id)
            .map(|seq| seq.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn diff(&self, session_id: &SessionId) -> Option<Value> {
        self.inner.lock().diff_by_session.get(session_id).cloned()
    }

    pub fn processes(&self) -> Vec<Process> {
        self.inner.lock().processes.iter().cloned().collect()
    }

    /// Drain and return any one-shot pending-mode-change signals
    /// accumulated since the last call (spec.md §4.5.3).
    pub fn take_pending_mode_changes(&self) -> Vec<Part> {
        std::mem::take(&mut self.inner.lock().pending_mode_changes)
    }

    pub fn is_deep_synced(&self, session_id: &SessionId) -> bool {
        self.deep_synced.lock().contains(session_id)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
