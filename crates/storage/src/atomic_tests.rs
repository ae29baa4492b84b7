// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn write_atomic_creates_file_with_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub").join("file.json");
    write_atomic(&path, b"hello").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"hello");
    assert!(!tmp_path_for(&path).exists());
}

#[test]
fn write_atomic_overwrites_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.json");
    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"second");
}

#[test]
fn rotate_bak_path_shifts_existing_backups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.json");
    fs::write(path.with_file_name("file.json.bak"), b"gen1").unwrap();
    fs::write(path.with_file_name("file.json.bak.2"), b"gen2").unwrap();

    let dest = rotate_bak_path(&path);
    assert_eq!(dest, path.with_file_name("file.json.bak"));
    assert_eq!(
        fs::read(path.with_file_name("file.json.bak.2")).unwrap(),
        b"gen1"
    );
    assert_eq!(
        fs::read(path.with_file_name("file.json.bak.3")).unwrap(),
        b"gen2"
    );
}

#[test]
fn rotate_bak_path_drops_oldest_at_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.json");
    fs::write(path.with_file_name("file.json.bak"), b"gen1").unwrap();
    fs::write(path.with_file_name("file.json.bak.2"), b"gen2").unwrap();
    fs::write(path.with_file_name("file.json.bak.3"), b"gen3").unwrap();

    rotate_bak_path(&path);

    assert_eq!(
        fs::read(path.with_file_name("file.json.bak.3")).unwrap(),
        b"gen2"
    );
}
