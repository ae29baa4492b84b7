// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An ordered sequence with binary-search insertion and whole-record
//! reconciliation, keyed by a total-order sort key (an identifier).
//!
//! Used wherever a stored collection must preserve a total order by id
//! (session list, message list, part list, todo list, ...): insertion
//! either replaces an existing element in place (reconciliation) or
//! inserts at the position that preserves order.

/// A value with a comparable sort key.
pub trait Keyed {
    type Key: Ord + Clone;

    fn key(&self) -> Self::Key;
}

/// An ordered, deduplicated-by-key sequence.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent, bound = "T: serde::Serialize + serde::de::DeserializeOwned")]
pub struct OrderedSeq<T: Keyed> {
    items: Vec<T>,
}

impl<T: Keyed> OrderedSeq<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn position_of(&self, key: &T::Key) -> Result<usize, usize> {
        self.items.binary_search_by(|item| item.key().cmp(key))
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.position_of(key).ok().map(|idx| &self.items[idx])
    }

    /// Insert `item`, or replace the existing element with the same key
    /// in place (reconciliation: whole-record replacement, not merge).
    /// Returns the index the element now occupies.
    pub fn upsert(&mut self, item: T) -> usize {
        let key = item.key();
        match self.position_of(&key) {
            Ok(idx) => {
                self.items[idx] = item;
                idx
            }
            Err(idx) => {
                self.items.insert(idx, item);
                idx
            }
        }
    }

    /// Remove the element with the given key, returning it if present.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        match self.position_of(key) {
            Ok(idx) => Some(self.items.remove(idx)),
            Err(_) => None,
        }
    }

    /// Drop the oldest (lowest-key) element, returning it.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Upsert, then evict the oldest element(s) until `len() <= cap`.
    /// Returns the keys of any evicted elements, oldest first.
    pub fn upsert_capped(&mut self, item: T, cap: usize) -> Vec<T::Key>
    where
        T::Key: Clone,
    {
        self.upsert(item);
        let mut evicted = Vec::new();
        while self.items.len() > cap {
            if let Some(front) = self.pop_front() {
                evicted.push(front.key());
            } else {
                break;
            }
        }
        evicted
    }
}

#[cfg(test)]
#[path = "ordered_tests.rs"]
mod tests;
