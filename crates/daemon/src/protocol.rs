// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication (spec.md §6.3: the surface a
//! transport binding sits behind).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload, kept
//! from the teacher's `protocol.rs`/`protocol_wire.rs` split; only the
//! `Request`/`Response` payloads are re-scoped, from job/cron/workspace
//! operations to the process-registry surface (spec.md §6.3) plus the
//! minimal session-store and stream-health queries a client needs.

use chrono::NaiveDate;
use relay_core::{Event, ProcessStatus, ProcessType};
use relay_health::{ActivityKind, StreamPhase, StreamState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Request from a client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping.
    Ping,
    /// Version handshake.
    Hello { version: String },
    /// Daemon status (uptime, recovery outcome, WAL/checkpoint counters).
    Status,
    /// Request graceful shutdown (spec.md §5 shutdown ordering).
    Shutdown,

    /// Publish an event onto the bus (spec.md §4.1, §6.2): applied to the
    /// session store, and to the WAL if it falls in the durable subset.
    PublishEvent { event: Event },

    /// spec.md §4.4.1 `register`.
    ProcessRegister {
        id: Option<String>,
        process_type: ProcessType,
        name: String,
        parent_id: Option<String>,
        swarm_id: Option<String>,
        capabilities: Vec<String>,
        #[serde(default)]
        metadata: HashMap<String, Value>,
        host: Option<String>,
    },
    /// spec.md §4.4.1 `deregister`.
    ProcessDeregister { id: String },
    /// spec.md §4.4.1 `heartbeat`.
    ProcessHeartbeat { id: String },
    /// spec.md §4.4.1 `update`.
    ProcessUpdate {
        id: String,
        status: Option<ProcessStatus>,
        capabilities: Option<Vec<String>>,
        metadata: Option<HashMap<String, Value>>,
    },
    /// spec.md §4.4.1 `get`.
    ProcessGet { id: String },
    /// spec.md §4.4.3 `list(filter)`.
    ProcessList {
        process_type: Option<ProcessType>,
        swarm_id: Option<String>,
        status: Option<ProcessStatus>,
        parent_id: Option<String>,
        #[serde(default)]
        capabilities: Vec<String>,
    },
    /// spec.md §4.4.1 `getBySwarm`.
    ProcessGetBySwarm { swarm_id: String },
    /// spec.md §4.4.1 `getSwarms`.
    ProcessGetSwarms,
    /// spec.md §4.4.1 `findAvailable`.
    ProcessFindAvailable { capabilities: Vec<String> },
    /// spec.md §6.3 `stats`: totals, counts by type/status, swarm count,
    /// active-agent count.
    ProcessStats,

    /// spec.md §4.2.5 `getOrCreateDailySession(persona)`.
    GetOrCreateDailySession { persona: String, date: NaiveDate },

    /// spec.md §4.3: record an activity signal (content chunk, tool call,
    /// reasoning delta) for a message's stream. Creates the monitor on
    /// first call for a given (session, message) pair.
    StreamRecordActivity {
        session_id: String,
        message_id: String,
        phase: StreamPhase,
        kind: ActivityKind,
        /// Size of the chunk this signal carries, for the report's
        /// `bytes_received` counter (spec.md §3). `0` for signals that
        /// carry no payload, e.g. a bare tool-call start.
        #[serde(default)]
        bytes: u64,
    },
    /// spec.md §4.3.4: mark a stream finished; publishes `stream.completed`
    /// and clears the monitor.
    StreamComplete { session_id: String, message_id: String },
    /// spec.md §4.3.4: mark a stream errored; publishes `stream.failed` and
    /// clears the monitor.
    StreamFail {
        session_id: String,
        message_id: String,
        error: String,
    },
    /// Current state/phase of a tracked stream, if any.
    StreamGetState { session_id: String, message_id: String },

    /// spec.md §4.5.1 projected session list.
    SessionsList,
    /// spec.md §4.5.1 `messagesBySession[id]`.
    SessionMessages { session_id: String },
    /// spec.md §4.5.1 `todosBySession[id]`.
    SessionTodos { session_id: String },

    /// `model.json` read/write (spec.md §6.1).
    GetModel,
    SetModel { value: Value },
    /// `mode.json` read/write (spec.md §6.1).
    GetMode,
    SetMode { hold: bool },
    /// `params.json` per-session read/write (spec.md §6.1).
    GetParams { session_id: String },
    SetParams { session_id: String, value: Value },
    /// `session-contexts.json` per-session read/write (spec.md §4.2.4, §6.1).
    GetSessionContext { session_id: String },
    SetSessionContext {
        session_id: String,
        memories: Vec<Value>,
    },
}

/// Process snapshot as returned over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessEntry {
    pub id: String,
    pub process_type: ProcessType,
    pub name: String,
    pub parent_id: Option<String>,
    pub swarm_id: Option<String>,
    pub capabilities: Vec<String>,
    pub status: ProcessStatus,
    pub metadata: HashMap<String, Value>,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub host: Option<String>,
}

impl From<relay_core::Process> for ProcessEntry {
    fn from(p: relay_core::Process) -> Self {
        Self {
            id: p.id.as_str().to_string(),
            process_type: p.process_type,
            name: p.name,
            parent_id: p.parent_id.map(|id| id.as_str().to_string()),
            swarm_id: p.swarm_id,
            capabilities: p.capabilities,
            status: p.status,
            metadata: p.metadata,
            last_heartbeat: p.last_heartbeat,
            registered_at: p.registered_at,
            host: p.host,
        }
    }
}

/// spec.md §6.3 `stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessStats {
    pub total: usize,
    pub by_type: HashMap<String, usize>,
    pub by_status: HashMap<String, usize>,
    pub swarm_count: usize,
    pub active_agent_count: usize,
}

/// Daemon status snapshot (spec.md §7 "user-visible failures" status bar).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub uptime_secs: u64,
    pub recovered: bool,
    pub replayed_entries: usize,
    pub wal_write_seq: u64,
    pub wal_processed_seq: u64,
    pub session_count: usize,
    pub process_count: usize,
}

/// Response from the daemon to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello { version: String },
    Status { status: StatusSnapshot },
    ShuttingDown,
    Ok,
    Error { message: String },

    Process { process: Option<ProcessEntry> },
    Processes { processes: Vec<ProcessEntry> },
    Deregistered { found: bool },
    Swarms { swarms: Vec<String> },
    Stats { stats: ProcessStats },

    DailySession { session_id: String, is_new: bool },

    Sessions { sessions: Vec<relay_core::Session> },
    Messages { messages: Vec<relay_core::Message> },
    Todos { todos: Vec<relay_core::Todo> },

    Model { value: Value },
    Mode { hold: bool },
    Params { value: Option<Value> },
    SessionContext {
        timestamp: Option<chrono::DateTime<chrono::Utc>>,
        memories: Vec<Value>,
    },

    StreamState {
        state: Option<StreamState>,
        phase: Option<StreamPhase>,
        /// Full Stream Health Report (spec.md §3) for the tracked stream,
        /// if any is currently being tracked.
        report: Option<relay_core::StreamHealthReport>,
    },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
