// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry of active stream monitors, keyed by
//! `(session_id, message_id)`. Mirrors the teacher's in-memory
//! `HashMap`-behind-a-`Mutex` registries (e.g. `runner/src/state.rs`'s
//! job table) rather than anything persisted: stream health is
//! observability, not durable state (spec.md §4.3 Non-goals).

use crate::monitor::StreamMonitor;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{MessageId, SessionId};
use std::collections::HashMap;

type Key = (SessionId, MessageId);

#[derive(Default)]
pub struct StreamRegistry {
    monitors: Mutex<HashMap<Key, StreamMonitor>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: returns the existing monitor for this key if present,
    /// otherwise creates and inserts one, so concurrent callers racing on
    /// the first activity signal for a message never clobber each other.
    pub fn get_or_create(
        &self,
        session_id: SessionId,
        message_id: MessageId,
        now: DateTime<Utc>,
    ) -> Key {
        let key = (session_id.clone(), message_id.clone());
        self.monitors
            .lock()
            .entry(key.clone())
            .or_insert_with(|| StreamMonitor::new(session_id, message_id, now));
        key
    }

    pub fn with_monitor<R>(&self, key: &Key, f: impl FnOnce(&mut StreamMonitor) -> R) -> Option<R> {
        self.monitors.lock().get_mut(key).map(f)
    }

    /// Drop a monitor once its stream has reached a terminal state and
    /// downstream consumers no longer need it.
    pub fn clear(&self, key: &Key) {
        self.monitors.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.monitors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every tracked key, for the stall-detector tick to
    /// iterate over without holding the registry lock across each
    /// monitor's `tick()` call.
    pub fn keys(&self) -> Vec<Key> {
        self.monitors.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
