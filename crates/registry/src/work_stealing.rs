// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work-stealing tracker (spec.md §4.4.4): "policy, not hard engineering"
//! per spec — implemented with reasonable, swappable defaults rather
//! than grounded on a specific teacher file.

use parking_lot::Mutex;
use relay_core::{Process, ProcessId};
use std::collections::HashMap;
use std::time::Duration;

/// Per-process workload sample, updated as tasks complete.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub task_count: u64,
    pub total_duration: Duration,
    pub cpu_percent: f32,
    pub mem_bytes: u64,
}

impl Workload {
    pub fn average_duration(&self) -> Duration {
        if self.task_count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.task_count as u32
        }
    }
}

/// Rebalancing metrics surfaced for observability (spec.md §4.4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct RebalanceMetrics {
    pub imbalance: f32,
    pub steal_requests: u64,
}

pub struct WorkStealingTracker {
    workloads: Mutex<HashMap<ProcessId, Workload>>,
    metrics: Mutex<RebalanceMetrics>,
}

impl Default for WorkStealingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkStealingTracker {
    pub fn new() -> Self {
        Self {
            workloads: Mutex::new(HashMap::new()),
            metrics: Mutex::new(RebalanceMetrics::default()),
        }
    }

    pub fn record_task_started(&self, process_id: ProcessId) {
        self.workloads.lock().entry(process_id).or_default().task_count += 1;
    }

    pub fn record_task_completed(&self, process_id: &ProcessId, duration: Duration) {
        if let Some(workload) = self.workloads.lock().get_mut(process_id) {
            workload.total_duration += duration;
        }
    }

    pub fn record_sample(&self, process_id: ProcessId, cpu_percent: f32, mem_bytes: u64) {
        let mut workloads = self.workloads.lock();
        let workload = workloads.entry(process_id).or_default();
        workload.cpu_percent = cpu_percent;
        workload.mem_bytes = mem_bytes;
    }

    pub fn workload(&self, process_id: &ProcessId) -> Workload {
        self.workloads.lock().get(process_id).cloned().unwrap_or_default()
    }

    /// Selects the least-loaded candidate (fewest in-flight tasks, ties
    /// broken by lower average duration) among processes whose
    /// capabilities satisfy `required`.
    pub fn select_least_loaded<'a>(
        &self,
        candidates: &'a [Process],
        required: &[String],
    ) -> Option<&'a Process> {
        let workloads = self.workloads.lock();
        self.metrics.lock().steal_requests += 1;
        candidates
            .iter()
            .filter(|p| p.has_capabilities(required))
            .min_by(|a, b| {
                let wa = workloads.get(&a.id).cloned().unwrap_or_default();
                let wb = workloads.get(&b.id).cloned().unwrap_or_default();
                wa.task_count
                    .cmp(&wb.task_count)
                    .then(wa.average_duration().cmp(&wb.average_duration()))
            })
    }

    /// Coefficient-of-variation style imbalance across current task
    /// counts, refreshed on read, surfaced alongside `steal_requests`.
    pub fn metrics(&self) -> RebalanceMetrics {
        let workloads = self.workloads.lock();
        let counts: Vec<f64> = workloads.values().map(|w| w.task_count as f64).collect();
        let imbalance = if counts.len() < 2 {
            0.0
        } else {
            let mean = counts.iter().sum::<f64>() / counts.len() as f64;
            if mean == 0.0 {
                0.0
            } else {
                let variance =
                    counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
                (variance.sqrt() / mean) as f32
            }
        };
        let mut metrics = self.metrics.lock();
        metrics.imbalance = imbalance;
        *metrics
    }
}

#[cfg(test)]
#[path = "work_stealing_tests.rs"]
mod tests;
