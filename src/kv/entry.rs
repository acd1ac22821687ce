//! Per-key version history (spec §3.2: snapshots see "the most recent
//! committed version whose sequence ≤ snapshot sequence", which requires
//! retaining prior versions, not just the latest value).
//!
//! Source pattern note (spec §9): modeled as the sum type the redesign
//! flags ask for — `EntryState::Present | Tombstone` — rather than a
//! value-plus-`is_deleted`-flag struct. Absence of a key entirely is the
//! absence of a map entry, never a third `EntryState` variant.

use crate::types::Sequence;
use std::sync::Arc;

/// The state an entry held as of one committed sequence number.
#[derive(Debug, Clone)]
pub enum EntryState {
    /// A value was present, possibly empty.
    Present(Arc<[u8]>),
    /// The key was deleted as of this sequence.
    Tombstone,
}

impl EntryState {
    /// Byte length of the value, or `None` for a tombstone.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            EntryState::Present(v) => Some(v),
            EntryState::Tombstone => None,
        }
    }
}

/// One committed version of an entry.
#[derive(Debug, Clone)]
pub struct VersionedEntry {
    /// Sequence number this version was stamped with on commit.
    pub sequence: Sequence,
    /// State as of that sequence.
    pub state: EntryState,
}

/// Append-only, sequence-ascending history for one key. New versions are
/// always appended with a strictly greater sequence than the last (the
/// commit protocol enforces this before calling `append`).
#[derive(Debug, Default)]
pub struct History {
    versions: Vec<VersionedEntry>,
}

impl History {
    /// An empty history (no versions yet).
    pub fn new() -> Self {
        Self { versions: Vec::new() }
    }

    /// The sequence number of the latest version, or `0` if none exist.
    pub fn current_sequence(&self) -> Sequence {
        self.versions.last().map(|v| v.sequence).unwrap_or(0)
    }

    /// The latest committed state, or `None` if no version has ever been
    /// written for this key.
    pub fn current(&self) -> Option<&EntryState> {
        self.versions.last().map(|v| &v.state)
    }

    /// The state as of the most recent version with `sequence <= as_of`, or
    /// `None` if the key had no version that old (or no versions at all).
    pub fn as_of(&self, as_of: Sequence) -> Option<&EntryState> {
        // Versions are sequence-ascending; partition_point finds the first
        // index past every version <= as_of.
        let idx = self.versions.partition_point(|v| v.sequence <= as_of);
        idx.checked_sub(1).map(|i| &self.versions[i].state)
    }

    /// Append a new version. Caller guarantees `sequence` is strictly
    /// greater than `current_sequence()`.
    pub fn append(&mut self, sequence: Sequence, state: EntryState) {
        debug_assert!(sequence > self.current_sequence());
        self.versions.push(VersionedEntry { sequence, state });
    }

    /// Seed an empty history with a baseline version at sequence `0`, used
    /// when reloading from the persisted file substrate (spec §6: sequence
    /// numbers aren't persisted, so a reloaded key starts at the sentinel
    /// "never independently written" sequence).
    pub fn seed(&mut self, state: EntryState) {
        debug_assert!(self.versions.is_empty());
        self.versions.push(VersionedEntry { sequence: 0, state });
    }

    /// Whether this key has ever had a version recorded (even if the
    /// latest one is a tombstone).
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_of_finds_most_recent_at_or_before() {
        let mut h = History::new();
        h.append(2, EntryState::Present(Arc::from(&b"a"[..])));
        h.append(5, EntryState::Present(Arc::from(&b"b"[..])));
        h.append(9, EntryState::Tombstone);

        assert!(h.as_of(1).is_none());
        assert_eq!(h.as_of(2).unwrap().value(), Some(&b"a"[..]));
        assert_eq!(h.as_of(4).unwrap().value(), Some(&b"a"[..]));
        assert_eq!(h.as_of(5).unwrap().value(), Some(&b"b"[..]));
        assert_eq!(h.as_of(8).unwrap().value(), Some(&b"b"[..]));
        assert!(h.as_of(9).unwrap().value().is_none());
        assert!(h.as_of(100).unwrap().value().is_none());
    }

    #[test]
    fn current_sequence_is_zero_when_untouched() {
        let h = History::new();
        assert_eq!(h.current_sequence(), 0);
        assert!(h.current().is_none());
    }
}
