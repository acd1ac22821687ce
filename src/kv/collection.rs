//! A named, ordered mapping from key to optional byte string (spec §3.1).

use super::entry::{EntryState, History};
use crate::types::{Key, Sequence};
use std::collections::BTreeMap;

/// One collection's in-memory state: an ordered key -> version-history map.
#[derive(Debug, Default)]
pub struct Collection {
    entries: BTreeMap<Key, History>,
}

impl Collection {
    /// A fresh, empty collection.
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Current (HEAD) sequence number of `key`, or `0` if it has never been
    /// written.
    pub fn current_sequence(&self, key: Key) -> Sequence {
        self.entries.get(&key).map(|h| h.current_sequence()).unwrap_or(0)
    }

    /// Current (HEAD) state of `key`, or `None` if it has never been
    /// written.
    pub fn current(&self, key: Key) -> Option<&EntryState> {
        self.entries.get(&key).and_then(History::current)
    }

    /// State of `key` as of `as_of`, or `None` if it had no version that
    /// old.
    pub fn as_of(&self, key: Key, as_of: Sequence) -> Option<&EntryState> {
        self.entries.get(&key).and_then(|h| h.as_of(as_of))
    }

    /// Stamp a new version for `key`. Callers (the commit protocol) are
    /// responsible for conflict checks before calling this.
    pub fn append(&mut self, key: Key, sequence: Sequence, state: EntryState) {
        self.entries.entry(key).or_insert_with(History::new).append(sequence, state);
    }

    /// Keys with a present HEAD value in `[min, max)`, ascending, capped at
    /// `limit`.
    pub fn scan_head(&self, min: Key, max: Key, limit: usize) -> Vec<Key> {
        self.entries
            .range(min..max)
            .filter(|(_, h)| matches!(h.current(), Some(EntryState::Present(_))))
            .map(|(k, _)| *k)
            .take(limit)
            .collect()
    }

    /// All keys with a present HEAD value in `[min, max)`, for sampling and
    /// measurement.
    pub fn live_keys_in(&self, min: Key, max: Key) -> Vec<Key> {
        self.entries
            .range(min..max)
            .filter(|(_, h)| matches!(h.current(), Some(EntryState::Present(_))))
            .map(|(k, _)| *k)
            .collect()
    }

    /// Total value bytes held by present entries in `[min, max)`.
    pub fn value_bytes_in(&self, min: Key, max: Key) -> u64 {
        self.entries
            .range(min..max)
            .filter_map(|(_, h)| match h.current() {
                Some(EntryState::Present(v)) => Some(v.len() as u64),
                _ => None,
            })
            .sum()
    }

    /// Seed a key with a baseline value at sequence `0`, used only when
    /// reloading from the persisted file substrate.
    pub fn seed_entry(&mut self, key: Key, value: Vec<u8>) {
        self.entries
            .entry(key)
            .or_insert_with(History::new)
            .seed(EntryState::Present(std::sync::Arc::from(value.into_boxed_slice())));
    }

    /// Iterate every key with a present HEAD value, for persistence.
    pub fn iter_live(&self) -> impl Iterator<Item = (Key, &[u8])> {
        self.entries.iter().filter_map(|(k, h)| match h.current() {
            Some(EntryState::Present(v)) => Some((*k, v.as_ref())),
            _ => None,
        })
    }
}
