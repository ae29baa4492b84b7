// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::{Session, SessionId, WalOp};
use std::io::Read as _;
use tempfile::tempdir;

fn sample_op(n: u64) -> WalOp {
    WalOp::SessionUpdate {
        session: Session {
            id: SessionId::new(format!("s{n}")),
            slug: format!("session-{n}"),
            title: format!("session {n}"),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            archived_at: None,
            directory: "/tmp".to_string(),
            parent_id: None,
            share: None,
        },
    }
}

#[test]
fn append_then_flush_makes_entries_durable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();

    let seq1 = wal.append(&sample_op(1)).unwrap();
    let seq2 = wal.append(&sample_op(2)).unwrap();
    assert_eq!(seq1, 1);
    assert_eq!(seq2, 2);

    wal.flush().unwrap();

    let mut contents = String::new();
    File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn next_unprocessed_reads_entries_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();

    wal.append(&sample_op(1)).unwrap();
    wal.append(&sample_op(2)).unwrap();

    let first = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(first.seq, 1);
    wal.mark_processed(first.seq);

    let second = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(second.seq, 2);
    wal.mark_processed(second.seq);

    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn reopen_resumes_from_processed_seq() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&sample_op(1)).unwrap();
        wal.append(&sample_op(2)).unwrap();
        wal.append(&sample_op(3)).unwrap();
        wal.flush().unwrap();
    }

    let mut wal = Wal::open(&path, 1).unwrap();
    assert_eq!(wal.write_seq(), 3);

    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 2);
}

#[test]
fn truncate_before_drops_earlier_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();

    for n in 1..=5 {
        wal.append(&sample_op(n)).unwrap();
    }
    wal.flush().unwrap();
    wal.mark_processed(5);

    wal.truncate_before(4).unwrap();

    let entries = wal.entries_after(0).unwrap();
    let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![4, 5]);
}

#[test]
fn corrupt_tail_is_rotated_and_valid_prefix_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&sample_op(1)).unwrap();
        wal.append(&sample_op(2)).unwrap();
        wal.flush().unwrap();
    }

    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{not valid json\n").unwrap();
    }

    let wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 2);

    let bak_path = path.with_extension("jsonl.bak");
    assert!(bak_path.exists(), "corrupt file should be rotated to .bak");
}

#[test]
fn flush_with_empty_buffer_is_a_no_op() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();
    wal.flush().unwrap();
    assert_eq!(wal.write_seq(), 0);
}

#[test]
fn entries_after_excludes_at_and_below_seq() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();

    for n in 1..=3 {
        wal.append(&sample_op(n)).unwrap();
    }
    wal.flush().unwrap();

    let entries = wal.entries_after(1).unwrap();
    let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![2, 3]);
}

#[test]
fn remove_file_deletes_an_existing_wal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&sample_op(1)).unwrap();
        wal.flush().unwrap();
    }
    assert!(path.exists());
    Wal::remove_file(&path).unwrap();
    assert!(!path.exists());
}
