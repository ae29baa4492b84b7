// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Typed, in-process publish-subscribe (spec.md §4.1).
//!
//! Generalizes the teacher's `daemon/src/event_bus.rs` wake-channel idiom
//! (one WAL-backed channel, one kind of wake signal) to N typed topics with
//! per-topic subscriber lists and a bounded coalescing window, since every
//! event here already carries a compile-time-known payload (`relay_core::Event`)
//! rather than being read back off a WAL.

use parking_lot::Mutex;
use relay_core::Event;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::error;

/// Upper bound on how long delivery may be delayed to coalesce a burst of
/// publishes into a single batch (spec.md §4.1).
pub const COALESCE_WINDOW: Duration = Duration::from_millis(16);

type Handler = Arc<dyn Fn(&[Event]) + Send + Sync>;

struct Subscription {
    id: u64,
    handler: Handler,
}

struct Inner {
    subscribers: Mutex<HashMap<&'static str, Vec<Subscription>>>,
    next_id: AtomicU64,
    tx: mpsc::UnboundedSender<Event>,
}

/// Typed publish-subscribe bus. Cheaply cloneable; all clones share the
/// same subscriber table and delivery task.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

/// A handle returned by [`EventBus::subscribe`]. Dropping it does nothing;
/// call [`Unsubscribe::unsubscribe`] explicitly to remove the handler.
/// Safe to call at any time, including from within a handler invoked
/// during delivery to other subscribers.
pub struct Unsubscribe {
    inner: Arc<Inner>,
    topic: &'static str,
    id: u64,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        let mut subs = self.inner.subscribers.lock();
        if let Some(list) = subs.get_mut(self.topic) {
            list.retain(|s| s.id != self.id);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            tx,
        });
        tokio::spawn(delivery_loop(inner.clone(), rx));
        Self { inner }
    }

    /// Synchronous enqueue; delivery order within a topic matches publish
    /// order. Never blocks on subscriber handlers.
    pub fn publish(&self, event: Event) {
        // An unbounded channel to a task that never exits while `self` is
        // alive only fails if the receiver task has already been dropped,
        // which cannot happen while any `EventBus` clone is held.
        let _ = self.inner.tx.send(event);
    }

    /// Register a handler for `topic`. Returns an unsubscribe handle.
    pub fn subscribe<F>(&self, topic: &'static str, handler: F) -> Unsubscribe
    where
        F: Fn(&[Event]) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .entry(topic)
            .or_default()
            .push(Subscription {
                id,
                handler: Arc::new(handler),
            });
        Unsubscribe {
            inner: self.inner.clone(),
            topic,
            id,
        }
    }
}

async fn delivery_loop(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        let deadline = Instant::now() + COALESCE_WINDOW;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(ev)) => batch.push(ev),
                Ok(None) | Err(_) => break,
            }
        }
        flush(&inner, batch);
    }
}

fn flush(inner: &Arc<Inner>, batch: Vec<Event>) {
    // Group by topic, preserving publish order within each topic.
    let mut by_topic: HashMap<&'static str, Vec<Event>> = HashMap::new();
    for event in batch {
        by_topic.entry(event.topic()).or_default().push(event);
    }

    for (topic, events) in by_topic {
        let handlers: Vec<Handler> = {
            let subs = inner.subscribers.lock();
            match subs.get(topic) {
                Some(list) => list.iter().map(|s| s.handler.clone()).collect(),
                None => continue,
            }
        };
        for handler in handlers {
            // Per-handler fault isolation: a panicking handler must not
            // affect other handlers or the publisher (spec.md §4.1).
            let events_ref = &events;
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(events_ref)));
            if result.is_err() {
                error!(topic, "event bus handler panicked; continuing");
            }
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
