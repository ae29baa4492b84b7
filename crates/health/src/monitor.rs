// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-stream state machine and stall classification (spec.md §4.3).
//!
//! Adapted from the poll-loop/incremental-classification idiom used by
//! the teacher's `adapters/src/agent/watcher.rs` (a `tokio::select!` loop
//! that reads incremental lines off a JSONL log and reclassifies state on
//! each one): here there is no log file, only in-process activity
//! callbacks, but the same "classify on each signal, re-derive phase"
//! shape applies.

use chrono::{DateTime, Utc};
use relay_core::{MessageId, SessionId};
pub use relay_core::{ActivityKind, StreamHealthReport, StreamState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What kind of work the stream is currently doing, used to pick the
/// right stall threshold (spec.md §4.3.2 "extended thinking").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamPhase {
    #[default]
    Starting,
    Thinking,
    ToolCalling,
    Generating,
}

/// Thresholds driving stall classification (spec.md §6.4).
#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    /// No activity for this long while still `Starting`: treat as an
    /// early stall candidate (spec.md §4.3.2 `earlyStallMs`).
    pub early_stall: Duration,
    /// No activity for this long: emit a stall warning.
    pub stall_warning: Duration,
    /// No activity for this long in a non-thinking phase: time out.
    pub stall_timeout: Duration,
    /// No activity for this long while `Thinking`: time out. Longer than
    /// `stall_timeout` since extended reasoning legitimately produces no
    /// visible content for a while.
    pub no_content_timeout: Duration,
    /// How often the stall detector polls every monitor.
    pub tick_interval: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            early_stall: Duration::from_secs(5),
            stall_warning: Duration::from_secs(15),
            stall_timeout: Duration::from_secs(60),
            no_content_timeout: Duration::from_secs(120),
            tick_interval: Duration::from_secs(2),
        }
    }
}

/// A stall-detector verdict for one tick, if anything changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallVerdict {
    Warning,
    Timeout,
}

/// Tracks one message's stream health from first activity to completion.
pub struct StreamMonitor {
    pub session_id: SessionId,
    pub message_id: MessageId,
    state: StreamState,
    phase: StreamPhase,
    started_at: DateTime<Utc>,
    /// Reset by any event, meaningful or not (spec.md §4.3.3 `last-event-at`).
    last_event_at: DateTime<Utc>,
    /// Reset only by `text-delta`/`tool-call` activity (spec.md §4.3.3
    /// `last-meaningful-at`). Stays stale while reasoning events keep
    /// `last_event_at` fresh, which is what lets the extended-thinking
    /// branch in `tick` eventually time out.
    last_meaningful_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    warned: bool,
    events_received: u32,
    text_delta_events: u32,
    tool_call_events: u32,
    bytes_received: u64,
    last_event_kind: Option<ActivityKind>,
    stall_warnings: u32,
    error: Option<String>,
    /// Observability-only: set at `complete()` time, never read by
    /// control flow (DESIGN.md Open Question decision).
    pub suspicious: bool,
}

impl StreamMonitor {
    pub fn new(session_id: SessionId, message_id: MessageId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            message_id,
            state: StreamState::Streaming,
            phase: StreamPhase::Starting,
            started_at: now,
            last_event_at: now,
            last_meaningful_at: now,
            completed_at: None,
            warned: false,
            events_received: 0,
            text_delta_events: 0,
            tool_call_events: 0,
            bytes_received: 0,
            last_event_kind: None,
            stall_warnings: 0,
            error: None,
            suspicious: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Record an activity signal (a content chunk, a tool call starting,
    /// a reasoning delta, ...). Resumes a stalled stream to `Streaming`.
    /// Only `TextDelta`/`ToolCall` count as meaningful content (spec.md
    /// §4.3.2); `Other` (reasoning deltas, routed here with kind `Other`
    /// from `crates/daemon/src/listener.rs`) keeps the stream alive
    /// without resetting the no-content clock.
    pub fn record_activity(
        &mut self,
        phase: StreamPhase,
        kind: ActivityKind,
        bytes: u64,
        now: DateTime<Utc>,
    ) {
        self.phase = phase;
        self.last_event_at = now;
        self.last_event_kind = Some(kind);
        self.bytes_received += bytes;
        self.warned = false;
        self.events_received += 1;
        match kind {
            ActivityKind::TextDelta => {
                self.text_delta_events += 1;
                self.last_meaningful_at = now;
            }
            ActivityKind::ToolCall => {
                self.tool_call_events += 1;
                self.last_meaningful_at = now;
            }
            ActivityKind::Other => {}
        }
        if self.state == StreamState::Stalled {
            self.state = StreamState::Streaming;
        }
    }

    /// Mark the stream finished. `suspicious` is set, never acted on, when
    /// the stream completed having received fewer than 5 events total or
    /// with no text/tool-call content at all (spec.md §4.3.4).
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.state = StreamState::Completed;
        self.completed_at = Some(now);
        self.suspicious =
            self.events_received < 5 || (self.text_delta_events + self.tool_call_events == 0);
    }

    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.state = StreamState::Errored;
        self.completed_at = Some(now);
        self.error = Some(error);
    }

    /// Snapshot the Stream Health Report (spec.md §3) for this monitor.
    pub fn report(&self) -> StreamHealthReport {
        StreamHealthReport {
            session_id: self.session_id.clone(),
            message_id: self.message_id.clone(),
            state: self.state,
            started_at: self.started_at,
            last_event_at: self.last_event_at,
            last_meaningful_at: self.last_meaningful_at,
            completed_at: self.completed_at,
            events_received: self.events_received,
            text_delta_events: self.text_delta_events,
            tool_call_events: self.tool_call_events,
            bytes_received: self.bytes_received,
            last_event_kind: self.last_event_kind,
            stall_warnings: self.stall_warnings,
            error: self.error.clone(),
            suspicious: self.suspicious,
        }
    }

    /// Advance the stall detector by one tick. Returns a verdict only on
    /// the tick a warning or timeout first fires (not on every tick
    /// after). Mirrors spec.md §4.3.3's per-tick algorithm.
    pub fn tick(&mut self, now: DateTime<Utc>, config: &HealthConfig) -> Option<StallVerdict> {
        if !matches!(self.state, StreamState::Streaming | StreamState::Stalled) {
            return None;
        }

        let elapsed = to_std(now.signed_duration_since(self.last_event_at));
        let elapsed_since_meaningful = to_std(now.signed_duration_since(self.last_meaningful_at));

        if elapsed >= config.stall_timeout {
            self.state = StreamState::TimedOut;
            return Some(StallVerdict::Timeout);
        }

        // isExtendedThinking: more than 10 events received and the stream
        // is still receiving *some* activity, just none of it meaningful.
        let is_extended_thinking = self.events_received > 10 && elapsed < config.stall_warning;
        if is_extended_thinking {
            if elapsed_since_meaningful >= config.no_content_timeout {
                self.state = StreamState::TimedOut;
                return Some(StallVerdict::Timeout);
            }
            if elapsed_since_meaningful >= config.stall_timeout && !self.warned {
                self.warned = true;
                self.stall_warnings += 1;
                self.state = StreamState::Stalled;
                return Some(StallVerdict::Warning);
            }
        }

        let warning_threshold = if self.phase == StreamPhase::Starting {
            config.early_stall
        } else {
            config.stall_warning
        };

        if elapsed >= warning_threshold && !self.warned {
            self.warned = true;
            self.stall_warnings += 1;
            self.state = StreamState::Stalled;
            return Some(StallVerdict::Warning);
        }

        None
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

fn to_std(duration: chrono::Duration) -> Duration {
    duration.to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
