// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The materialized, checkpoint-and-replay-derived state: sessions,
//! per-session messages (windowed), and per-session todos (spec.md §3,
//! §4.2, §6.1).
//!
//! Grounded on the teacher's `storage/src/state.rs` `MaterializedState`:
//! a single struct of keyed collections, mutated idempotently by
//! `apply_op`, `Clone` so it can be checkpointed off the hot path. The
//! teacher's collections are `HashMap`s; these are `relay_core::OrderedSeq`
//! since spec.md requires a total order on sessions/messages/todos and a
//! capped eviction window on messages (spec.md §4.5.2, §6.1).

use chrono::{DateTime, Utc};
use relay_core::{Message, OrderedSeq, Part, Session, SessionId, Todo, WalOp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Most recent messages retained per session before the oldest is
/// evicted (spec.md §4.5.2, §8 scenario 5).
pub const MESSAGE_WINDOW_CAP: usize = 100;

/// The full, checkpointable materialized state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub sessions: OrderedSeq<Session>,
    #[serde(default)]
    pub messages: HashMap<SessionId, OrderedSeq<Message>>,
    #[serde(default)]
    pub parts: HashMap<relay_core::MessageId, Vec<Part>>,
    #[serde(default)]
    pub todos: HashMap<SessionId, OrderedSeq<Todo>>,
    #[serde(default)]
    pub last_active: HashMap<SessionId, DateTime<Utc>>,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn messages_for(&self, session_id: &SessionId) -> &[Message] {
        self.messages
            .get(session_id)
            .map(|seq| seq.as_slice())
            .unwrap_or(&[])
    }

    pub fn todos_for(&self, session_id: &SessionId) -> &[Todo] {
        self.todos
            .get(session_id)
            .map(|seq| seq.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_active_for(&self, session_id: &SessionId) -> Option<DateTime<Utc>> {
        self.last_active.get(session_id).copied()
    }

    /// Apply a durable operation. Idempotent: replaying the same
    /// operation twice (e.g. once for immediate visibility, once during
    /// WAL replay after a crash) must leave the state unchanged the
    /// second time, per spec.md §4.2's crash-consistency requirement.
    pub fn apply_op(&mut self, op: &WalOp) {
        match op {
            WalOp::SessionCreate { session } | WalOp::SessionUpdate { session } => {
                self.sessions.upsert(session.clone());
            }

            WalOp::MessageCreate { message } => {
                let evicted = self
                    .messages
                    .entry(message.session_id.clone())
                    .or_default()
                    .upsert_capped(message.clone(), MESSAGE_WINDOW_CAP);
                for evicted_id in evicted {
                    self.parts.remove(&evicted_id);
                }
            }

            WalOp::TodoUpdate { session_id, todos } => {
                let seq = self.todos.entry(session_id.clone()).or_default();
                for todo in todos {
                    seq.upsert(todo.clone());
                }
            }

            WalOp::SessionActivate { session_id } => {
                self.last_active.insert(session_id.clone(), Utc::now());
            }
        }
    }

    /// Drop daily-activity entries older than `retain_days` (spec.md
    /// §6.1 "30-day retention on daily-sessions state").
    pub fn purge_stale_activity(&mut self, retain_days: i64) {
        let cutoff = Utc::now() - chrono::Duration::days(retain_days);
        self.last_active.retain(|_, at| *at >= cutoff);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
