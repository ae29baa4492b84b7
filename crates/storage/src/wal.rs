// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable session/message/todo operations
//! (spec.md §4.2.1).
//!
//! Entries are appended as line-delimited JSON to a single WAL file.
//! The caller is expected to hold `&mut self` exclusively (see
//! `relay-storage::state`'s wrapping mutex) while appending or flushing.
//! Group commit batches writes for a configurable interval (default 1s,
//! spec.md §6.4 `WAL_FLUSH_INTERVAL_MS`).
//!
//! Grounded on the teacher's `storage/src/wal.rs`, adapted from the
//! teacher's full `Event` payload to the narrower [`WalOp`] the spec
//! defines for durable operations, and adapted to re-prepend buffered
//! entries on flush failure (spec.md §4.2 "Failure semantics") into a
//! capacity-bounded buffer (the Open Question decision recorded in
//! DESIGN.md).

use relay_core::WalOp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, warn};

/// Default flush interval (spec.md §6.4 `WAL_FLUSH_INTERVAL_MS`).
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum entries to buffer before forcing a flush.
const FLUSH_THRESHOLD: usize = 100;

/// Maximum buffered entries retained across flush failures before the
/// oldest is dropped (bounded re-queue; see DESIGN.md Open Question).
const MAX_REQUEUE: usize = 10_000;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt entry at offset {offset}: {message}")]
    Corrupt { offset: u64, message: String },
}

#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    op: &'a WalOp,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    op: WalOp,
}

/// A single WAL entry with its assigned sequence number.
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub op: WalOp,
}

/// JSONL WAL for durable operation storage with group commit.
pub struct Wal {
    file: File,
    read_file: File,
    path: PathBuf,
    write_seq: u64,
    processed_seq: u64,
    /// Buffered, not-yet-durable entries, oldest first. Re-prepended on
    /// flush failure rather than lost.
    write_buffer: VecDeque<(u64, Vec<u8>)>,
    flush_interval: Duration,
    last_flush: Instant,
    read_offset: u64,
}

impl Wal {
    /// Open or create a WAL at `path`. `processed_seq` should come from
    /// the last checkpoint (0 if none exists yet).
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        Self::open_with_interval(path, processed_seq, DEFAULT_FLUSH_INTERVAL)
    }

    pub fn open_with_interval(
        path: &Path,
        processed_seq: u64,
        flush_interval: Duration,
    ) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (mut write_seq, mut read_offset, corrupt) = Self::scan_wal(&file, processed_seq)?;

        if corrupt {
            let valid_lines = Self::read_valid_lines(&file)?;
            drop(file);

            let bak_path = crate::atomic::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = valid_lines.len(),
                "corrupt WAL detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            {
                let mut new_file = File::create(path)?;
                for line in &valid_lines {
                    new_file.write_all(line.as_bytes())?;
                    new_file.write_all(b"\n")?;
                }
                new_file.sync_all()?;
            }

            file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?;

            let scan = Self::scan_wal(&file, processed_seq)?;
            write_seq = scan.0;
            read_offset = scan.1;
        }

        let read_file = file.try_clone()?;

        Ok(Self {
            file,
            read_file,
            path: path.to_owned(),
            write_seq,
            processed_seq,
            write_buffer: VecDeque::new(),
            flush_interval,
            last_flush: Instant::now(),
            read_offset,
        })
    }

    fn scan_wal(file: &File, processed_seq: u64) -> Result<(u64, u64, bool), WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut max_seq = 0u64;
        let mut read_offset = 0u64;
        let mut current_offset = 0u64;
        let mut corrupt = false;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                current_offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => {
                    corrupt = true;
                    break;
                }
            };

            max_seq = max_seq.max(record.seq);
            if record.seq > processed_seq && read_offset == 0 {
                read_offset = current_offset;
            }
            current_offset += bytes_read as u64;
        }

        if read_offset == 0 {
            read_offset = current_offset;
        }

        Ok((max_seq, read_offset, corrupt))
    }

    fn read_valid_lines(file: &File) -> Result<Vec<String>, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut valid_lines = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let _: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => break,
            };

            valid_lines.push(trimmed.to_string());
        }

        Ok(valid_lines)
    }

    /// Buffer `op`. Not durable until [`Wal::flush`] succeeds.
    pub fn append(&mut self, op: &WalOp) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, op };
        let json_bytes = serde_json::to_vec(&record)?;
        if self.write_buffer.len() >= MAX_REQUEUE {
            if let Some((dropped_seq, _)) = self.write_buffer.pop_front() {
                error!(
                    seq = dropped_seq,
                    "WAL re-queue buffer full, dropping oldest unflushed entry"
                );
            }
        }
        self.write_buffer.push_back((seq, json_bytes));
        Ok(seq)
    }

    pub fn needs_flush(&self) -> bool {
        !self.write_buffer.is_empty()
            && (self.last_flush.elapsed() >= self.flush_interval
                || self.write_buffer.len() >= FLUSH_THRESHOLD)
    }

    /// Flush buffered entries to disk with a single fsync.
    ///
    /// On failure, drained entries are re-prepended to the buffer head so
    /// the next tick retries them in their original order (spec.md §4.2
    /// "Failure semantics"): no entry is lost on a transient I/O error.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        let pending: Vec<(u64, Vec<u8>)> = self.write_buffer.drain(..).collect();
        let result = (|| -> Result<(), WalError> {
            for (_, json_bytes) in &pending {
                self.file.write_all(json_bytes)?;
                self.file.write_all(b"\n")?;
            }
            self.file.sync_all()?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.last_flush = Instant::now();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, entries = pending.len(), "WAL flush failed, re-queuing");
                for entry in pending.into_iter().rev() {
                    self.write_buffer.push_front(entry);
                }
                Err(e)
            }
        }
    }

    /// Read the next unprocessed entry, if any.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        self.flush()?;

        let mut reader = BufReader::new(&self.read_file);
        reader.seek(SeekFrom::Start(self.read_offset))?;

        let mut line = String::new();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let record: WalRecord = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(offset = self.read_offset, error = %e, "corrupt WAL entry, skipping");
                self.read_offset += bytes_read as u64;
                return Ok(None);
            }
        };

        self.read_offset += bytes_read as u64;
        Ok(Some(WalEntry {
            seq: record.seq,
            op: record.op,
        }))
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = seq;
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Drop entries before `seq`, rewriting the WAL file to contain only
    /// `seq..=write_seq`. Called after a durable checkpoint.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;

        let tmp_path = self.path.with_extension("tmp");

        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut kept_lines: Vec<(u64, String)> = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => break,
            };

            if record.seq >= seq {
                kept_lines.push((record.seq, trimmed.to_string()));
            }
        }

        let new_read_offset;
        {
            let mut tmp_file = File::create(&tmp_path)?;
            let mut current_offset = 0u64;
            let mut found_unprocessed = false;
            let mut first_unprocessed_offset = 0u64;

            for (entry_seq, kept_line) in &kept_lines {
                if *entry_seq > self.processed_seq && !found_unprocessed {
                    first_unprocessed_offset = current_offset;
                    found_unprocessed = true;
                }
                tmp_file.write_all(kept_line.as_bytes())?;
                tmp_file.write_all(b"\n")?;
                current_offset += kept_line.len() as u64 + 1;
            }

            new_read_offset = if found_unprocessed {
                first_unprocessed_offset
            } else {
                current_offset
            };

            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        self.read_file = self.file.try_clone()?;
        self.read_offset = new_read_offset;

        Ok(())
    }

    /// All entries with `seq > seq`, in file order. Used for recovery replay.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut line = String::new();
        let mut current_offset = 0u64;

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                current_offset += bytes_read as u64;
                continue;
            }

            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        offset = current_offset,
                        error = %e,
                        "corrupt WAL entry during replay, stopping at corruption point",
                    );
                    break;
                }
            };

            current_offset += bytes_read as u64;

            if record.seq > seq {
                entries.push(WalEntry {
                    seq: record.seq,
                    op: record.op,
                });
            }
        }

        Ok(entries)
    }

    /// Remove the WAL file entirely (called after a successful full
    /// replay during recovery, spec.md §4.2.1).
    pub fn remove_file(path: &Path) -> Result<(), WalError> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
