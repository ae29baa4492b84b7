// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small opaque-blob state files under the state directory root and
//! `persistence/` (spec.md §4.2.4, §6.1): `session-contexts.json`,
//! `model.json`, `mode.json`, `params.json`.
//!
//! None of these carry algorithmic weight of their own — they are
//! latest-value-wins or capped-map blobs — so they share one generic,
//! mutex-guarded, atomically-persisted wrapper rather than four bespoke
//! structs. Grounded on [`crate::daily_session::DailySessionStore`]'s
//! load/mutate/persist shape, minus the TOCTOU reservation protocol that
//! module needs and this one does not.

use crate::atomic::write_atomic;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuxStateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single JSON value, persisted whole on every write. Backs `model.json`
/// (recents/favorites/variants, opaque to this crate) and `mode.json`
/// (`{hold: bool}`).
pub struct JsonBlobStore<T> {
    path: PathBuf,
    value: Mutex<T>,
}

impl<T> JsonBlobStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    pub fn load(path: PathBuf) -> Result<Self, AuxStateError> {
        let value = if path.exists() {
            serde_json::from_slice(&std::fs::read(&path)?)?
        } else {
            T::default()
        };
        Ok(Self {
            path,
            value: Mutex::new(value),
        })
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    pub fn set(&self, value: T) -> Result<(), AuxStateError> {
        *self.value.lock() = value.clone();
        write_atomic(&self.path, &serde_json::to_vec_pretty(&value)?)?;
        Ok(())
    }
}

/// `mode.json`: `{hold: bool}` (spec.md §6.1).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModeState {
    pub hold: bool,
}

pub type ModeStore = JsonBlobStore<ModeState>;

/// `model.json`: persisted model recents/favorites/variants. The shape is
/// opaque to the daemon (owned by the client layer), so it is carried as
/// a raw JSON value rather than a typed struct.
pub type ModelStore = JsonBlobStore<Value>;

/// One session's sampling-parameter override, as stored in `params.json`
/// (sessionId → overrides).
pub struct ParamsStore {
    path: PathBuf,
    overrides: Mutex<HashMap<String, Value>>,
}

impl ParamsStore {
    pub fn load(path: PathBuf) -> Result<Self, AuxStateError> {
        let overrides = if path.exists() {
            serde_json::from_slice(&std::fs::read(&path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            overrides: Mutex::new(overrides),
        })
    }

    pub fn get(&self, session_id: &str) -> Option<Value> {
        self.overrides.lock().get(session_id).cloned()
    }

    pub fn set(&self, session_id: &str, value: Value) -> Result<(), AuxStateError> {
        let snapshot = {
            let mut overrides = self.overrides.lock();
            overrides.insert(session_id.to_string(), value);
            overrides.clone()
        };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    pub fn remove(&self, session_id: &str) -> Result<(), AuxStateError> {
        let snapshot = {
            let mut overrides = self.overrides.lock();
            overrides.remove(session_id);
            overrides.clone()
        };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }
}

/// One session's remembered context, as stored in `session-contexts.json`
/// (spec.md §4.2.4, §6.1: `sessionId → {timestamp, memories[]}, cap 100`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub memories: Vec<Value>,
}

/// At most this many sessions retain a context entry; the oldest (by
/// `timestamp`) is evicted when a write would exceed the cap.
pub const SESSION_CONTEXT_CAP: usize = 100;

pub struct SessionContextStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, SessionContext>>,
}

impl SessionContextStore {
    pub fn load(path: PathBuf) -> Result<Self, AuxStateError> {
        let entries = if path.exists() {
            serde_json::from_slice(&std::fs::read(&path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn get(&self, session_id: &str) -> Option<SessionContext> {
        self.entries.lock().get(session_id).cloned()
    }

    /// Insert or replace the context for `session_id`, evicting the
    /// oldest entry if this write would exceed [`SESSION_CONTEXT_CAP`].
    pub fn set(&self, session_id: &str, context: SessionContext) -> Result<(), AuxStateError> {
        let snapshot = {
            let mut entries = self.entries.lock();
            entries.insert(session_id.to_string(), context);
            while entries.len() > SESSION_CONTEXT_CAP {
                let Some(oldest_id) = entries
                    .iter()
                    .min_by_key(|(_, ctx)| ctx.timestamp)
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                entries.remove(&oldest_id);
            }
            entries.clone()
        };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    pub fn remove(&self, session_id: &str) -> Result<(), AuxStateError> {
        let snapshot = {
            let mut entries = self.entries.lock();
            entries.remove(session_id);
            entries.clone()
        };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "aux_state_tests.rs"]
mod tests;
