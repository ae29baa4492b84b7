// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file write and backup-rotation primitives shared by
//! `wal`, `checkpoint`, `recovery`, and `state`.
//!
//! Grounded on the teacher's `storage/src/snapshot.rs::save` (write to a
//! temp path, fsync, rename) and its `rotate_bak_path` numbered-backup
//! idiom.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Maximum numbered backups kept by [`rotate_bak_path`] before the oldest
/// is discarded.
pub const MAX_BAK_FILES: u32 = 3;

/// Write `bytes` to `path` via a temp file + `fsync` + rename, so a crash
/// mid-write never leaves a partially-written file at `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_path_for(path);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// `fsync` the directory containing `path`, ordering the rename in
/// [`write_atomic`] durably with respect to the directory entry itself.
/// Critical for WAL/checkpoint crash consistency: without this, a crash
/// right after rename can leave the directory entry unsynced.
pub fn fsync_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        let dir = File::open(parent)?;
        dir.sync_all()?;
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_owned();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Rotate `path` into numbered backups (`path.bak`, `path.bak.2`, ...,
/// up to [`MAX_BAK_FILES`]), shifting existing backups up and dropping
/// the oldest. Returns the destination path for the caller to rename
/// the corrupt/stale file into. Does not touch `path` itself.
pub fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak_n = |n: u32| -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_owned();
        if n <= 1 {
            name.push(".bak");
        } else {
            name.push(format!(".bak.{n}"));
        }
        path.with_file_name(name)
    };

    let oldest = bak_n(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    let mut n = MAX_BAK_FILES;
    while n > 1 {
        let from = bak_n(n - 1);
        let to = bak_n(n);
        if from.exists() {
            let _ = fs::rename(&from, &to);
        }
        n -= 1;
    }

    bak_n(1)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
