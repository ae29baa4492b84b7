// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background stall-detector tick loop.
//!
//! Grounded on the teacher's `adapters/src/agent/watcher.rs` shape: a
//! `tokio::spawn`ed task holding a `oneshot::Receiver<()>` shutdown signal,
//! polling inside `tokio::select!` rather than blocking forever. There the
//! poll read a JSONL log for new lines; here it re-evaluates every tracked
//! monitor against the stall thresholds.

use crate::monitor::{HealthConfig, StallVerdict};
use crate::registry::StreamRegistry;
use chrono::Utc;
use relay_bus::EventBus;
use relay_core::Event;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::interval;
use tracing::{info, warn};

/// Handle to a running stall detector. Dropping it does not stop the
/// detector; call [`StallDetectorHandle::shutdown`] explicitly.
pub struct StallDetectorHandle {
    shutdown_tx: oneshot::Sender<()>,
}

impl StallDetectorHandle {
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Spawn the background tick loop. Ticks every `config.tick_interval`,
/// re-evaluating each tracked stream and publishing
/// `stream.stall_warning` / `stream.timeout` events as thresholds cross.
/// Streams that time out or complete are cleared from the registry so the
/// table only ever holds in-flight streams.
pub fn spawn(
    registry: Arc<StreamRegistry>,
    bus: EventBus,
    config: HealthConfig,
) -> StallDetectorHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(run(registry, bus, config, shutdown_rx));
    StallDetectorHandle { shutdown_tx }
}

async fn run(
    registry: Arc<StreamRegistry>,
    bus: EventBus,
    config: HealthConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval(config.tick_interval);
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("stall detector shutting down");
                return;
            }
            _ = ticker.tick() => {
                tick_once(&registry, &bus, &config);
            }
        }
    }
}

fn tick_once(registry: &StreamRegistry, bus: &EventBus, config: &HealthConfig) {
    let now = Utc::now();
    for key in registry.keys() {
        let (session_id, message_id) = key.clone();
        let verdict = registry.with_monitor(&key, |monitor| monitor.tick(now, config));
        match verdict {
            Some(Some(StallVerdict::Warning)) => {
                warn!(%session_id, %message_id, "stream stalled");
                bus.publish(Event::StreamStallWarning {
                    session_id,
                    message_id,
                });
            }
            Some(Some(StallVerdict::Timeout)) => {
                warn!(%session_id, %message_id, "stream timed out");
                bus.publish(Event::StreamTimeout {
                    session_id,
                    message_id,
                });
                registry.clear(&key);
            }
            Some(None) | None => {}
        }
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
