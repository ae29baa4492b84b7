// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity types for the data model (spec.md §3).

use crate::ids::{MessageId, PartId, ProcessId, SessionId, TodoId};
use crate::ordered::Keyed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A share descriptor attached to a session (opaque to the core; carried
/// for the terminal-UI/transport layers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareDescriptor {
    pub url: String,
}

/// A session: a conversation with a streaming model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub slug: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub directory: String,
    pub parent_id: Option<SessionId>,
    pub share: Option<ShareDescriptor>,
}

impl Keyed for Session {
    type Key = SessionId;

    fn key(&self) -> SessionId {
        self.id.clone()
    }
}

/// Role of a message within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    SystemSynthetic,
}

/// A message within a session, ordered by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub provider_id: Option<String>,
    pub model_id: Option<String>,
}

impl Keyed for Message {
    type Key = MessageId;

    fn key(&self) -> MessageId {
        self.id.clone()
    }
}

/// The kind of a message part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Text,
    Reasoning,
    ToolInvocation,
    FileAttachment,
    Snapshot,
}

/// State of a tool-invocation part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolInvocationState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A part within a message, ordered by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub message_id: MessageId,
    pub kind: PartKind,
    pub tool_state: Option<ToolInvocationState>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Keyed for Part {
    type Key = PartId;

    fn key(&self) -> PartId {
        self.id.clone()
    }
}

impl Part {
    /// True if this is a completed tool-invocation part carrying a
    /// mode-change metadata value (spec.md §4.5.3, `message.part.updated`).
    pub fn is_completed_mode_change(&self) -> bool {
        self.kind == PartKind::ToolInvocation
            && self.tool_state == Some(ToolInvocationState::Completed)
            && self.metadata.contains_key("modeChange")
    }
}

/// Status of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// A todo belonging to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub session_id: SessionId,
    pub status: TodoStatus,
}

impl Keyed for Todo {
    type Key = TodoId;

    fn key(&self) -> TodoId {
        self.id.clone()
    }
}

/// Type of a cooperating process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Agent,
    Swarm,
    Worker,
    Daemon,
    Queen,
}

/// Liveness/activity status of a registered process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Active,
    Busy,
    Idle,
    Offline,
    Error,
}

/// A cooperating process registered with the process registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub process_type: ProcessType,
    pub name: String,
    pub parent_id: Option<ProcessId>,
    pub swarm_id: Option<String>,
    pub capabilities: Vec<String>,
    pub status: ProcessStatus,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    pub host: Option<String>,
}

impl Keyed for Process {
    type Key = ProcessId;

    fn key(&self) -> ProcessId {
        self.id.clone()
    }
}

impl Process {
    pub fn has_capabilities(&self, required: &[String]) -> bool {
        required.iter().all(|c| self.capabilities.contains(c))
    }
}

/// A daily-session reservation, keyed by (persona, date) at the storage
/// layer; the record itself just carries the reserved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySessionRecord {
    pub session_id: SessionId,
    pub chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity status of a session, as projected by the session state store
/// (spec.md §4.5.1 `sessionStatus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Busy,
    Retry,
}

/// A permission request awaiting a reply, ordered by id within its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub session_id: SessionId,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Keyed for Permission {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A question posed to the user, ordered by id within its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub session_id: SessionId,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Keyed for Question {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[cfg(test)]
#[path = "entities_tests.rs"]
mod tests;
