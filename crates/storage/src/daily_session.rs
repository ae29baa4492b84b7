// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOCTOU-safe daily-session reservation (spec.md §4.2.5
//! `getOrCreateDailySession(persona)`).
//!
//! Two concurrent callers asking for the same `(persona, date)` must not
//! both observe "missing" and both create a session: the second caller
//! has to wait for the first caller's in-flight creation and then see its
//! result. No direct teacher file implements this; grounded on the
//! `tokio::sync::Notify` + `parking_lot::Mutex` combination the teacher
//! uses for async coordination elsewhere (`daemon/src/lifecycle.rs`'s
//! shutdown signaling), generalized here into a per-key pending-future map.

use crate::atomic::write_atomic;
use chrono::NaiveDate;
use parking_lot::Mutex;
use relay_core::DailySessionRecord;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

type Key = (String, NaiveDate);

#[derive(Debug, Error)]
pub enum DailySessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

struct Inner {
    records: HashMap<Key, DailySessionRecord>,
    pending: HashMap<Key, Arc<Notify>>,
}

/// Persisted, TOCTOU-safe daily-session reservations, keyed by
/// `(persona, date)`.
pub struct DailySessionStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl DailySessionStore {
    pub fn load(path: PathBuf) -> Result<Self, DailySessionError> {
        let records = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let flat: Vec<(String, NaiveDate, DailySessionRecord)> =
                serde_json::from_slice(&bytes)?;
            flat.into_iter()
                .map(|(persona, date, record)| ((persona, date), record))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                records,
                pending: HashMap::new(),
            }),
        })
    }

    fn persist(&self, records: &HashMap<Key, DailySessionRecord>) -> Result<(), DailySessionError> {
        let flat: Vec<(&String, &NaiveDate, &DailySessionRecord)> = records
            .iter()
            .map(|((persona, date), record)| (persona, date, record))
            .collect();
        let bytes = serde_json::to_vec_pretty(&flat)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    /// Get the existing reservation for `(persona, date)`, or create one
    /// via `create` if none exists. Safe under concurrent callers for the
    /// same key: only one call to `create` ever runs per key; the rest
    /// wait on the in-flight creation and observe its result.
    pub async fn get_or_create<F>(
        &self,
        persona: &str,
        date: NaiveDate,
        create: F,
    ) -> Result<DailySessionRecord, DailySessionError>
    where
        F: FnOnce() -> DailySessionRecord,
    {
        enum Slot {
            Found(DailySessionRecord),
            Reserved,
            WaitOn(Arc<Notify>),
        }

        let key: Key = (persona.to_string(), date);
        let mut create = Some(create);

        loop {
            let slot = {
                let mut inner = self.inner.lock();
                if let Some(existing) = inner.records.get(&key) {
                    Slot::Found(existing.clone())
                } else if let Some(notify) = inner.pending.get(&key) {
                    Slot::WaitOn(notify.clone())
                } else {
                    inner.pending.insert(key.clone(), Arc::new(Notify::new()));
                    Slot::Reserved
                }
            };

            match slot {
                Slot::Found(record) => return Ok(record),
                Slot::WaitOn(notify) => {
                    notify.notified().await;
                    continue;
                }
                Slot::Reserved => {
                    let record =
                        (create.take().expect("create only runs for the reserving caller"))();

                    let mut inner = self.inner.lock();
                    inner.records.insert(key.clone(), record.clone());
                    let records_snapshot = inner.records.clone();
                    if let Some(waiter) = inner.pending.remove(&key) {
                        waiter.notify_waiters();
                    }
                    drop(inner);

                    self.persist(&records_snapshot)?;
                    return Ok(record);
                }
            }
        }
    }

    pub fn get(&self, persona: &str, date: NaiveDate) -> Option<DailySessionRecord> {
        self.inner
            .lock()
            .records
            .get(&(persona.to_string(), date))
            .cloned()
    }

    /// Drop reservations older than `retain_days` (spec.md §6.1 30-day
    /// retention).
    pub fn purge_stale(&self, today: NaiveDate, retain_days: i64) -> Result<(), DailySessionError> {
        let cutoff = today - chrono::Duration::days(retain_days);
        let mut inner = self.inner.lock();
        inner.records.retain(|(_, date), _| *date >= cutoff);
        let snapshot = inner.records.clone();
        drop(inner);
        self.persist(&snapshot)
    }
}

#[cfg(test)]
#[path = "daily_session_tests.rs"]
mod tests;
