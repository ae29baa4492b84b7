// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process registry proper (spec.md §4.4.1–§4.4.3).
//!
//! Grounded on the teacher's general `Arc<parking_lot::Mutex<HashMap<Id,
//! Record>>>` registry idiom (the shape behind every in-memory table in
//! `storage/src/state.rs`), generalized from a single record type to the
//! heterogeneous `Process` entity this daemon tracks.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_bus::EventBus;
use relay_core::{Event, IdGen, Process, ProcessId, ProcessStatus, ProcessType, UuidIdGen};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Input to [`ProcessRegistry::register`].
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub id: Option<ProcessId>,
    pub process_type: ProcessType,
    pub name: String,
    pub parent_id: Option<ProcessId>,
    pub swarm_id: Option<String>,
    pub capabilities: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub host: Option<String>,
}

impl RegisterInput {
    pub fn new(process_type: ProcessType, name: impl Into<String>) -> Self {
        Self {
            id: None,
            process_type,
            name: name.into(),
            parent_id: None,
            swarm_id: None,
            capabilities: Vec::new(),
            metadata: HashMap::new(),
            host: None,
        }
    }
}

/// Partial update applied by [`ProcessRegistry::update`]. `None` fields
/// leave the corresponding `Process` field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatch {
    pub status: Option<ProcessStatus>,
    pub capabilities: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Conjunctive query for [`ProcessRegistry::list`] (spec.md §4.4.3): every
/// `Some` field narrows the result set further.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub process_type: Option<ProcessType>,
    pub swarm_id: Option<String>,
    pub status: Option<ProcessStatus>,
    pub parent_id: Option<ProcessId>,
    pub capabilities: Vec<String>,
}

impl ListFilter {
    fn matches(&self, process: &Process) -> bool {
        if let Some(process_type) = self.process_type {
            if process.process_type != process_type {
                return false;
            }
        }
        if let Some(swarm_id) = &self.swarm_id {
            if process.swarm_id.as_deref() != Some(swarm_id.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if process.status != status {
                return false;
            }
        }
        if let Some(parent_id) = &self.parent_id {
            if process.parent_id.as_ref() != Some(parent_id) {
                return false;
            }
        }
        process.has_capabilities(&self.capabilities)
    }
}

pub struct ProcessRegistry {
    processes: Mutex<HashMap<ProcessId, Process>>,
    id_gen: Arc<dyn IdGen>,
    bus: EventBus,
}

impl ProcessRegistry {
    pub fn new(bus: EventBus) -> Self {
        Self::with_id_gen(bus, Arc::new(UuidIdGen))
    }

    pub fn with_id_gen(bus: EventBus, id_gen: Arc<dyn IdGen>) -> Self {
        Self {
            processes: Mutex::new(HashMap::new()),
            id_gen,
            bus,
        }
    }

    /// Register a new process, or fold into an update of an existing one
    /// if `input.id` already names a registered process (spec.md §4.4.1).
    pub fn register(&self, input: RegisterInput, now: DateTime<Utc>) -> Process {
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| ProcessId::new(self.id_gen.next()));

        let mut processes = self.processes.lock();
        if processes.contains_key(&id) {
            drop(processes);
            let patch = UpdatePatch {
                status: Some(ProcessStatus::Active),
                capabilities: Some(input.capabilities),
                metadata: Some(input.metadata),
            };
            return self
                .update(&id, patch, now)
                .expect("just checked this id exists");
        }

        let process = Process {
            id: id.clone(),
            process_type: input.process_type,
            name: input.name,
            parent_id: input.parent_id,
            swarm_id: input.swarm_id,
            capabilities: input.capabilities,
            status: ProcessStatus::Active,
            metadata: input.metadata,
            last_heartbeat: now,
            registered_at: now,
            host: input.host,
        };
        processes.insert(id, process.clone());
        drop(processes);

        self.bus.publish(Event::ProcessRegistered {
            process: process.clone(),
        });
        process
    }

    /// Returns `false` if `id` was not registered.
    pub fn deregister(&self, id: &ProcessId) -> bool {
        let removed = self.processes.lock().remove(id);
        match removed {
            Some(_) => {
                self.bus.publish(Event::ProcessDeregistered {
                    process_id: id.clone(),
                });
                true
            }
            None => false,
        }
    }

    /// Refresh `lastHeartbeat`; if the process was offline, transitions it
    /// back to active and publishes `status_changed`. Always publishes
    /// `heartbeat`. Returns `None` if `id` is not registered.
    pub fn heartbeat(&self, id: &ProcessId, now: DateTime<Utc>) -> Option<Process> {
        let (process, came_back_online) = {
            let mut processes = self.processes.lock();
            let process = processes.get_mut(id)?;
            let was_offline = process.status == ProcessStatus::Offline;
            process.last_heartbeat = now;
            if was_offline {
                process.status = ProcessStatus::Active;
            }
            (process.clone(), was_offline)
        };

        if came_back_online {
            self.bus.publish(Event::ProcessStatusChanged {
                process_id: id.clone(),
                from: ProcessStatus::Offline,
                to: ProcessStatus::Active,
            });
        }
        self.bus.publish(Event::ProcessHeartbeat {
            process: process.clone(),
        });
        Some(process)
    }

    /// Partial update of status/capabilities/metadata; refreshes
    /// heartbeat unconditionally. Publishes `status_changed` iff the
    /// status field actually transitioned.
    pub fn update(&self, id: &ProcessId, patch: UpdatePatch, now: DateTime<Utc>) -> Option<Process> {
        let (process, transition) = {
            let mut processes = self.processes.lock();
            let process = processes.get_mut(id)?;
            let prev_status = process.status;
            if let Some(status) = patch.status {
                process.status = status;
            }
            if let Some(capabilities) = patch.capabilities {
                process.capabilities = capabilities;
            }
            if let Some(metadata) = patch.metadata {
                process.metadata = metadata;
            }
            process.last_heartbeat = now;
            let transition = (process.status != prev_status).then_some((prev_status, process.status));
            (process.clone(), transition)
        };

        if let Some((from, to)) = transition {
            self.bus.publish(Event::ProcessStatusChanged {
                process_id: id.clone(),
                from,
                to,
            });
        }
        Some(process)
    }

    pub fn get(&self, id: &ProcessId) -> Option<Process> {
        self.processes.lock().get(id).cloned()
    }

    pub fn list(&self, filter: &ListFilter) -> Vec<Process> {
        self.processes
            .lock()
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }

    pub fn get_by_swarm(&self, swarm_id: &str) -> Vec<Process> {
        self.processes
            .lock()
            .values()
            .filter(|p| p.swarm_id.as_deref() == Some(swarm_id))
            .cloned()
            .collect()
    }

    pub fn get_swarms(&self) -> Vec<String> {
        let swarms: HashSet<String> = self
            .processes
            .lock()
            .values()
            .filter_map(|p| p.swarm_id.clone())
            .collect();
        let mut swarms: Vec<String> = swarms.into_iter().collect();
        swarms.sort();
        swarms
    }

    pub fn find_available(&self, capabilities: &[String]) -> Vec<Process> {
        self.processes
            .lock()
            .values()
            .filter(|p| p.status == ProcessStatus::Active && p.has_capabilities(capabilities))
            .cloned()
            .collect()
    }

    /// Used by the heartbeat-expiration ticker: every id whose status is
    /// not already `offline` and whose last heartbeat has aged past
    /// `timeout` (spec.md §4.4.2).
    pub(crate) fn expire_stale(
        &self,
        now: DateTime<Utc>,
        timeout: chrono::Duration,
    ) -> Vec<(ProcessId, ProcessStatus)> {
        let mut expired = Vec::new();
        let mut processes = self.processes.lock();
        for process in processes.values_mut() {
            if process.status == ProcessStatus::Offline {
                continue;
            }
            if now.signed_duration_since(process.last_heartbeat) > timeout {
                let prev = process.status;
                process.status = ProcessStatus::Offline;
                expired.push((process.id.clone(), prev));
            }
        }
        expired
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
