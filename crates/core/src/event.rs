// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The domain event enum: one variant per bus topic (spec.md §6.2).
//!
//! Tagged `#[serde(tag = "type")]` enum in the teacher's idiom
//! (`core/src/event.rs`), re-scoped from the teacher's job/runbook/cron
//! namespaces to the session/message/part/process/stream namespaces this
//! daemon coordinates.

use crate::entities::{
    Message, Part, Permission, Process, ProcessId, ProcessStatus, Question, Session,
    SessionStatus, Todo,
};
use crate::ids::{MessageId, SessionId};
use crate::stream_health::StreamHealthReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single published event, carrying its topic-specific payload.
///
/// `#[serde(other)]` on the trailing catch-all keeps this forward
/// compatible with payloads this build doesn't yet know about, matching
/// the teacher's `Event::Custom` idiom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "session.created")]
    SessionCreated { session: Session },
    #[serde(rename = "session.updated")]
    SessionUpdated { session: Session },
    #[serde(rename = "session.deleted")]
    SessionDeleted { session_id: SessionId },
    #[serde(rename = "session.status")]
    SessionStatusChanged {
        session_id: SessionId,
        status: SessionStatus,
    },
    #[serde(rename = "session.idle")]
    SessionIdle { session_id: SessionId },
    #[serde(rename = "session.diff")]
    SessionDiff { session_id: SessionId, diff: Value },

    #[serde(rename = "message.updated")]
    MessageUpdated { message: Message },
    #[serde(rename = "message.removed")]
    MessageRemoved {
        session_id: SessionId,
        message_id: MessageId,
    },
    #[serde(rename = "message.part.updated")]
    MessagePartUpdated { part: Part },
    #[serde(rename = "message.part.removed")]
    MessagePartRemoved {
        message_id: MessageId,
        part_id: crate::ids::PartId,
    },

    #[serde(rename = "todo.updated")]
    TodoUpdated {
        session_id: SessionId,
        todos: Vec<Todo>,
    },

    #[serde(rename = "permission.asked")]
    PermissionAsked { permission: Permission },
    #[serde(rename = "permission.replied")]
    PermissionReplied { session_id: SessionId, id: String },

    #[serde(rename = "question.asked")]
    QuestionAsked { question: Question },
    #[serde(rename = "question.replied")]
    QuestionReplied { session_id: SessionId, id: String },
    #[serde(rename = "question.rejected")]
    QuestionRejected { session_id: SessionId, id: String },

    #[serde(rename = "lsp.updated")]
    LspUpdated { payload: Value },
    #[serde(rename = "vcs.branch.updated")]
    VcsBranchUpdated { payload: Value },
    #[serde(rename = "mcp")]
    Mcp { payload: Value },
    #[serde(rename = "provider")]
    Provider { payload: Value },

    #[serde(rename = "process.registered")]
    ProcessRegistered { process: Process },
    #[serde(rename = "process.deregistered")]
    ProcessDeregistered { process_id: ProcessId },
    #[serde(rename = "process.heartbeat")]
    ProcessHeartbeat { process: Process },
    #[serde(rename = "process.status_changed")]
    ProcessStatusChanged {
        process_id: ProcessId,
        from: ProcessStatus,
        to: ProcessStatus,
    },
    #[serde(rename = "process.offline")]
    ProcessOffline { process_id: ProcessId },
    #[serde(rename = "process.event")]
    ProcessEvent { process_id: ProcessId, payload: Value },

    #[serde(rename = "stream.stall_warning")]
    StreamStallWarning {
        session_id: SessionId,
        message_id: MessageId,
    },
    #[serde(rename = "stream.timeout")]
    StreamTimeout {
        session_id: SessionId,
        message_id: MessageId,
    },
    /// spec.md §4.3.4: published with the full report on `complete()`.
    #[serde(rename = "stream.completed")]
    StreamCompleted { report: StreamHealthReport },
    /// Published with the full report (its `error` field populated) on
    /// `fail()`.
    #[serde(rename = "stream.failed")]
    StreamFailed { report: StreamHealthReport },

    #[serde(rename = "server.instance.disposed")]
    ServerInstanceDisposed,

    #[serde(other)]
    Custom,
}

impl Event {
    /// The bus topic string this event publishes under (spec.md §6.2).
    pub fn topic(&self) -> &'static str {
        match self {
            Event::SessionCreated { .. } => "session.created",
            Event::SessionUpdated { .. } => "session.updated",
            Event::SessionDeleted { .. } => "session.deleted",
            Event::SessionStatusChanged { .. } => "session.status",
            Event::SessionIdle { .. } => "session.idle",
            Event::SessionDiff { .. } => "session.diff",
            Event::MessageUpdated { .. } => "message.updated",
            Event::MessageRemoved { .. } => "message.removed",
            Event::MessagePartUpdated { .. } => "message.part.updated",
            Event::MessagePartRemoved { .. } => "message.part.removed",
            Event::TodoUpdated { .. } => "todo.updated",
            Event::PermissionAsked { .. } => "permission.asked",
            Event::PermissionReplied { .. } => "permission.replied",
            Event::QuestionAsked { .. } => "question.asked",
            Event::QuestionReplied { .. } => "question.replied",
            Event::QuestionRejected { .. } => "question.rejected",
            Event::LspUpdated { .. } => "lsp.updated",
            Event::VcsBranchUpdated { .. } => "vcs.branch.updated",
            Event::Mcp { .. } => "mcp",
            Event::Provider { .. } => "provider",
            Event::ProcessRegistered { .. } => "process.registered",
            Event::ProcessDeregistered { .. } => "process.deregistered",
            Event::ProcessHeartbeat { .. } => "process.heartbeat",
            Event::ProcessStatusChanged { .. } => "process.status_changed",
            Event::ProcessOffline { .. } => "process.offline",
            Event::ProcessEvent { .. } => "process.event",
            Event::StreamStallWarning { .. } => "stream.stall_warning",
            Event::StreamTimeout { .. } => "stream.timeout",
            Event::StreamCompleted { .. } => "stream.completed",
            Event::StreamFailed { .. } => "stream.failed",
            Event::ServerInstanceDisposed => "server.instance.disposed",
            Event::Custom => "custom",
        }
    }
}

/// The subset of events that are durable WAL operations (spec.md §3 "WAL
/// Entry"). Not every bus event is persisted: stream-health and
/// process-registry events are in-memory-only and never written to the WAL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum WalOp {
    #[serde(rename = "session-create")]
    SessionCreate { session: Session },
    #[serde(rename = "session-update")]
    SessionUpdate { session: Session },
    #[serde(rename = "message-create")]
    MessageCreate { message: Message },
    #[serde(rename = "todo-update")]
    TodoUpdate {
        session_id: SessionId,
        todos: Vec<Todo>,
    },
    #[serde(rename = "session-activate")]
    SessionActivate { session_id: SessionId },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
