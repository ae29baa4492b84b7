// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: String,
    value: u32,
}

impl Keyed for Item {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

fn item(id: &str, value: u32) -> Item {
    Item {
        id: id.to_string(),
        value,
    }
}

#[test]
fn preserves_order_by_key() {
    let mut seq = OrderedSeq::new();
    seq.upsert(item("m003", 3));
    seq.upsert(item("m001", 1));
    seq.upsert(item("m002", 2));
    let ids: Vec<&str> = seq.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m001", "m002", "m003"]);
}

#[test]
fn upsert_replaces_whole_record() {
    let mut seq = OrderedSeq::new();
    seq.upsert(item("m001", 1));
    seq.upsert(item("m001", 99));
    assert_eq!(seq.len(), 1);
    assert_eq!(seq.get(&"m001".to_string()).unwrap().value, 99);
}

#[test]
fn remove_by_key() {
    let mut seq = OrderedSeq::new();
    seq.upsert(item("m001", 1));
    seq.upsert(item("m002", 2));
    let removed = seq.remove(&"m001".to_string());
    assert_eq!(removed.map(|i| i.value), Some(1));
    assert_eq!(seq.len(), 1);
    assert!(seq.get(&"m001".to_string()).is_none());
}

#[test]
fn remove_missing_is_none() {
    let mut seq: OrderedSeq<Item> = OrderedSeq::new();
    assert!(seq.remove(&"missing".to_string()).is_none());
}

#[test]
fn upsert_capped_evicts_oldest() {
    let mut seq = OrderedSeq::new();
    for i in 1..=101u32 {
        let id = format!("m{:03}", i);
        let evicted = seq.upsert_capped(item(&id, i), 100);
        if i <= 100 {
            assert!(evicted.is_empty());
        } else {
            assert_eq!(evicted, vec!["m001".to_string()]);
        }
    }
    assert_eq!(seq.len(), 100);
    assert_eq!(seq.iter().next().unwrap().id, "m002");
}

#[test]
fn total_order_holds_after_interleaved_ops() {
    let mut seq = OrderedSeq::new();
    for id in ["b", "a", "d", "c"] {
        seq.upsert(item(id, 0));
    }
    seq.remove(&"c".to_string());
    seq.upsert(item("e", 0));
    let ids: Vec<&str> = seq.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "d", "e"]);
}
