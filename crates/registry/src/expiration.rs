// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat-expiration ticker (spec.md §4.4.2).
//!
//! Same `tokio::select!`-over-`oneshot`-shutdown shape as
//! `relay-health`'s stall detector, itself grounded on the teacher's
//! `adapters/src/agent/watcher.rs` poll loop.

use crate::registry::ProcessRegistry;
use chrono::{Duration as ChronoDuration, Utc};
use relay_bus::EventBus;
use relay_core::{Event, ProcessStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::interval;
use tracing::{info, warn};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ExpirationHandle {
    shutdown_tx: oneshot::Sender<()>,
}

impl ExpirationHandle {
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

pub fn spawn(
    registry: Arc<ProcessRegistry>,
    bus: EventBus,
    tick_interval: Duration,
    heartbeat_timeout: Duration,
) -> ExpirationHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(run(
        registry,
        bus,
        tick_interval,
        heartbeat_timeout,
        shutdown_rx,
    ));
    ExpirationHandle { shutdown_tx }
}

async fn run(
    registry: Arc<ProcessRegistry>,
    bus: EventBus,
    tick_interval: Duration,
    heartbeat_timeout: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let timeout = ChronoDuration::from_std(heartbeat_timeout).unwrap_or(ChronoDuration::zero());
    let mut ticker = interval(tick_interval);
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("heartbeat expiration ticker shutting down");
                return;
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                for (process_id, prev_status) in registry.expire_stale(now, timeout) {
                    warn!(%process_id, "process heartbeat expired, marking offline");
                    bus.publish(Event::ProcessOffline {
                        process_id: process_id.clone(),
                    });
                    bus.publish(Event::ProcessStatusChanged {
                        process_id,
                        from: prev_status,
                        to: ProcessStatus::Offline,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "expiration_tests.rs"]
mod tests;
