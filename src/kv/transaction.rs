//! Transaction state (spec §3.3, §4.3.6).
//!
//! Source pattern note (spec §9): kept as three disjoint collections —
//! `watched`, `upserted`, `removed` — rather than one map of tri-state
//! entries, with (I1) enforced on every mutation below: a key can never
//! appear in both `upserted` and `removed` at once.

use crate::types::{CollectionId, Key, Result, Sequence, StoreError, TxnId};
use std::collections::{HashMap, HashSet};

/// A `(collection, key)` pair, the unit every transaction-local set keys on.
pub type CollectionKey = (CollectionId, Key);

/// Transaction lifecycle states (spec §4.3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Created but never begun.
    Fresh,
    /// Begun; reads/writes are allowed.
    Active,
    /// Commit succeeded; can be reused after another `begin`.
    Committed,
    /// Commit aborted (conflict, double-commit, or explicit free); can be
    /// reused after another `begin`.
    Aborted,
    /// Permanently released; no further operations are allowed.
    Freed,
}

/// What a transaction-local lookup found for a `(collection, key)` pair
/// before falling through to HEAD/snapshot.
pub enum Local<'a> {
    /// Staged for deletion: read as absent regardless of HEAD.
    Removed,
    /// Staged with a new value: read this value regardless of HEAD.
    Upserted(&'a [u8]),
}

/// A staged set of reads, upserts and tombstones, committed atomically
/// under optimistic concurrency control.
pub struct Transaction {
    id: TxnId,
    state: TxnState,
    /// Assigned at `begin`; `youngest_sequence + 1` at that moment, or an
    /// explicitly supplied number for deterministic replay.
    sequence_number: Sequence,
    watched: HashMap<CollectionKey, Sequence>,
    upserted: HashMap<CollectionKey, Vec<u8>>,
    removed: HashSet<CollectionKey>,
}

impl Transaction {
    /// Create a fresh, not-yet-begun transaction handle.
    pub fn new(id: TxnId) -> Self {
        Self {
            id,
            state: TxnState::Fresh,
            sequence_number: 0,
            watched: HashMap::new(),
            upserted: HashMap::new(),
            removed: HashSet::new(),
        }
    }

    /// This transaction's handle id.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TxnState {
        self.state
    }

    /// Sequence number assigned at `begin` (meaningless before that).
    pub fn sequence_number(&self) -> Sequence {
        self.sequence_number
    }

    /// `begin`: `Fresh` or `Aborted`/`Committed` (i.e. resettable) -> `Active`.
    pub fn begin(&mut self, sequence_number: Sequence) -> Result<()> {
        match self.state {
            TxnState::Fresh | TxnState::Committed | TxnState::Aborted => {
                self.watched.clear();
                self.upserted.clear();
                self.removed.clear();
                self.sequence_number = sequence_number;
                self.state = TxnState::Active;
                Ok(())
            }
            TxnState::Active => Err(StoreError::ArgsCombo(
                "transaction is already active; commit or free it first".into(),
            )),
            TxnState::Freed => Err(StoreError::Uninitialized("transaction has been freed".into())),
        }
    }

    /// Fail fast unless this transaction is `Active`.
    pub fn require_active(&self) -> Result<()> {
        match self.state {
            TxnState::Active => Ok(()),
            TxnState::Freed => Err(StoreError::Uninitialized("transaction has been freed".into())),
            _ => Err(StoreError::ArgsCombo("transaction is not active".into())),
        }
    }

    /// Record an observed sequence for a read, unless already watched (a
    /// key is watched at its first-read sequence within the transaction).
    pub fn watch(&mut self, ck: CollectionKey, observed: Sequence) {
        self.watched.entry(ck).or_insert(observed);
    }

    /// Stage a new value for `ck`, enforcing (I1).
    pub fn stage_upsert(&mut self, ck: CollectionKey, value: Vec<u8>) {
        self.removed.remove(&ck);
        self.upserted.insert(ck, value);
    }

    /// Stage a tombstone for `ck`, enforcing (I1).
    pub fn stage_remove(&mut self, ck: CollectionKey) {
        self.upserted.remove(&ck);
        self.removed.insert(ck);
    }

    /// Look up `ck` in this transaction's local staging (not HEAD).
    pub fn local(&self, ck: CollectionKey) -> Option<Local<'_>> {
        if self.removed.contains(&ck) {
            return Some(Local::Removed);
        }
        self.upserted.get(&ck).map(|v| Local::Upserted(v.as_slice()))
    }

    /// Read-only view of the watched set, for the commit protocol.
    pub fn watched(&self) -> &HashMap<CollectionKey, Sequence> {
        &self.watched
    }

    /// Read-only view of staged upserts, for the commit protocol and scan
    /// merge (spec §4.3.5).
    pub fn upserted(&self) -> &HashMap<CollectionKey, Vec<u8>> {
        &self.upserted
    }

    /// Read-only view of staged removals.
    pub fn removed(&self) -> &HashSet<CollectionKey> {
        &self.removed
    }

    /// Mark the transaction committed and reset its staged sets so it can
    /// be reused after another `begin`.
    pub fn finish_committed(&mut self) {
        self.state = TxnState::Committed;
        self.watched.clear();
        self.upserted.clear();
        self.removed.clear();
    }

    /// Mark the transaction aborted. Staged sets are retained for
    /// diagnostics (spec §7): no substrate mutation occurred, so there is
    /// nothing unsafe about leaving them readable until the next `begin`.
    pub fn finish_aborted(&mut self) {
        self.state = TxnState::Aborted;
    }

    /// Free the transaction, implicitly aborting it if it was active.
    pub fn free(&mut self) {
        self.state = TxnState::Freed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_remove_collapses_per_i1() {
        let mut txn = Transaction::new(1);
        txn.begin(1).unwrap();
        let ck = (0u64, 7u64);
        txn.stage_upsert(ck, b"abc".to_vec());
        assert!(matches!(txn.local(ck), Some(Local::Upserted(_))));
        txn.stage_remove(ck);
        assert!(matches!(txn.local(ck), Some(Local::Removed)));
        assert!(!txn.upserted().contains_key(&ck));
    }

    #[test]
    fn begin_requires_inactive_state() {
        let mut txn = Transaction::new(1);
        txn.begin(5).unwrap();
        assert!(txn.begin(6).is_err());
    }

    #[test]
    fn reads_writes_require_active() {
        let txn = Transaction::new(1);
        assert!(txn.require_active().is_err());
    }
}
