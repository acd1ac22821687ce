//! Read-only views pinned to a sequence number (spec §3.2).

use crate::types::{Sequence, SnapshotId};

/// A snapshot of `youngest_sequence` at creation time. Reads through a
/// snapshot see the most recent committed version of each key whose
/// sequence is `<= sequence()`.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    id: SnapshotId,
    sequence: Sequence,
}

impl Snapshot {
    pub(crate) fn new(id: SnapshotId, sequence: Sequence) -> Self {
        Self { id, sequence }
    }

    /// This snapshot's handle id.
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// The sequence number this snapshot is pinned to.
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }
}
