// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream Health Report entity (spec.md §3, §4.3.4): the payload
//! published alongside `Event::StreamCompleted`/`Event::StreamFailed`.
//! Lives in `relay-core` rather than `relay-health` since it rides on
//! `Event`, and `relay-health` is the one that depends on `relay-core`,
//! not the other way around.

use crate::ids::{MessageId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single message's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Streaming,
    /// Still streaming, but no activity observed past a warning
    /// threshold. A transient overlay on `Streaming`, not terminal:
    /// further activity returns to `Streaming`.
    Stalled,
    Completed,
    TimedOut,
    Errored,
}

/// What an activity signal represents, for the §4.3.4 completion
/// classification counters and the report's `last_event_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    TextDelta,
    ToolCall,
    Other,
}

/// Full snapshot of one stream's health (spec.md §3 "Stream Health
/// Report"), published on completion/failure and returned by
/// `StreamGetState` queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHealthReport {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub state: StreamState,

    // Timing block.
    pub started_at: DateTime<Utc>,
    pub last_event_at: DateTime<Utc>,
    pub last_meaningful_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    // Progress block.
    pub events_received: u32,
    pub text_delta_events: u32,
    pub tool_call_events: u32,
    pub bytes_received: u64,

    pub last_event_kind: Option<ActivityKind>,
    pub stall_warnings: u32,
    pub error: Option<String>,
    /// Set at completion when the stream received fewer than 5 events
    /// total or produced no text/tool-call content (spec.md §4.3.4).
    /// Observability-only, never read by control flow.
    pub suspicious: bool,
}
