//! The process-wide database: HEAD-state collections under a single
//! reader/writer lock, plus transaction and snapshot bookkeeping (spec §4.3,
//! §5).

use super::collection::Collection;
use super::entry::EntryState;
use super::persist;
use super::snapshot::Snapshot;
use super::transaction::{CollectionKey, Transaction};
use crate::core::Config;
use crate::types::{CollectionId, Result, Sequence, SnapshotId, StoreError, TxnId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One collection's storage plus the metadata the registry tracks about it.
pub(crate) struct CollectionEntry {
    pub name: Option<String>,
    pub data: Collection,
}

/// HEAD-state metadata: the collection registry and the commit clock. Held
/// behind one `RwLock`; reads/scans/measures take it shared, writes/commits
/// take it exclusive (spec §5).
pub(crate) struct HeadState {
    pub collections: HashMap<CollectionId, CollectionEntry>,
    pub name_to_id: HashMap<String, CollectionId>,
    pub youngest_sequence: Sequence,
    pub next_collection_id: CollectionId,
}

impl HeadState {
    pub fn collection(&self, id: CollectionId) -> Result<&Collection> {
        self.collections
            .get(&id)
            .map(|e| &e.data)
            .ok_or_else(|| StoreError::ArgsWrong(format!("no such collection: {id}")))
    }

    pub fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection> {
        self.collections
            .get_mut(&id)
            .map(|e| &mut e.data)
            .ok_or_else(|| StoreError::ArgsWrong(format!("no such collection: {id}")))
    }
}

/// The three modes `collection_drop` accepts (spec §4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionDropMode {
    /// Clear every value but keep the collection's identity and history.
    ValuesOnly,
    /// Clear every key and value, resetting the collection to empty.
    KeysAndValues,
    /// Clear everything and release the collection handle itself. Invalid
    /// for the main collection.
    KeysValuesAndHandle,
}

/// One entry of `collection_list`'s output.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    /// Collection identifier.
    pub id: CollectionId,
    /// `None` for the main collection, `Some(name)` otherwise.
    pub name: Option<String>,
}

/// The process-wide database instance.
pub struct Database {
    state: RwLock<HeadState>,
    config: Config,
    snapshots: parking_lot::Mutex<HashMap<SnapshotId, Sequence>>,
    next_snapshot_id: AtomicU64,
    next_txn_id: AtomicU64,
}

impl Database {
    /// Open (or create) a database under `config`. If `config.data_dir` is
    /// set, the main collection's file is loaded if present.
    pub fn open(config: Config) -> Result<Self> {
        let mut collections = HashMap::new();
        let main = if let Some(dir) = &config.data_dir {
            let path = persist::path_for(dir, None);
            persist::load_collection(&path)?
        } else {
            Collection::new()
        };
        collections.insert(crate::constants::COL_MAIN, CollectionEntry { name: None, data: main });

        tracing::info!(data_dir = ?config.data_dir, "database opened");

        Ok(Self {
            state: RwLock::new(HeadState {
                collections,
                name_to_id: HashMap::new(),
                youngest_sequence: 0,
                next_collection_id: 1,
            }),
            config,
            snapshots: parking_lot::Mutex::new(HashMap::new()),
            next_snapshot_id: AtomicU64::new(1),
            next_txn_id: AtomicU64::new(1),
        })
    }

    pub(crate) fn state(&self) -> &RwLock<HeadState> {
        &self.state
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// The current `youngest_sequence`.
    pub fn youngest_sequence(&self) -> Sequence {
        self.state.read().youngest_sequence
    }

    // ---- collections -----------------------------------------------

    /// Create a named collection. `config` is accepted for
    /// forward-compatibility with backend-specific tuning but unused by
    /// this in-memory/file substrate.
    pub fn collection_create(&self, name: &str, _config: &str) -> Result<CollectionId> {
        if name.is_empty() || name.contains('\0') {
            return Err(StoreError::ArgsWrong(
                "collection name must be non-empty and contain no NUL bytes".into(),
            ));
        }
        let mut state = self.state.write();
        if state.name_to_id.contains_key(name) {
            return Err(StoreError::ArgsWrong(format!("collection already exists: {name}")));
        }
        let id = state.next_collection_id;
        state.next_collection_id += 1;

        let data = if let Some(dir) = &self.config.data_dir {
            persist::load_collection(&persist::path_for(dir, Some(name)))?
        } else {
            Collection::new()
        };

        state.collections.insert(id, CollectionEntry { name: Some(name.to_string()), data });
        state.name_to_id.insert(name.to_string(), id);
        tracing::info!(%name, id, "collection created");
        Ok(id)
    }

    /// Drop a collection per `mode` (spec §4.3.1).
    pub fn collection_drop(&self, id: CollectionId, mode: CollectionDropMode) -> Result<()> {
        if id == crate::constants::COL_MAIN && mode == CollectionDropMode::KeysValuesAndHandle {
            return Err(StoreError::ArgsCombo("the main collection's handle cannot be dropped".into()));
        }
        let mut state = self.state.write();
        match mode {
            CollectionDropMode::ValuesOnly => {
                let entry = state.collection_mut(id)?;
                let keys: Vec<_> = entry.live_keys_in(0, crate::constants::KEY_MAX);
                let seq = state.youngest_sequence + 1;
                state.youngest_sequence = seq;
                let entry = state.collection_mut(id)?;
                for key in keys {
                    entry.append(key, seq, EntryState::Tombstone);
                }
            }
            CollectionDropMode::KeysAndValues => {
                let entry = state.collections.get_mut(&id).ok_or_else(|| {
                    StoreError::ArgsWrong(format!("no such collection: {id}"))
                })?;
                entry.data = Collection::new();
            }
            CollectionDropMode::KeysValuesAndHandle => {
                let removed = state.collections.remove(&id).ok_or_else(|| {
                    StoreError::ArgsWrong(format!("no such collection: {id}"))
                })?;
                if let Some(name) = removed.name {
                    state.name_to_id.remove(&name);
                }
            }
        }
        tracing::info!(id, ?mode, "collection dropped");
        Ok(())
    }

    /// List every live collection.
    pub fn collection_list(&self) -> Vec<CollectionInfo> {
        let state = self.state.read();
        let mut out: Vec<_> = state
            .collections
            .iter()
            .map(|(id, e)| CollectionInfo { id: *id, name: e.name.clone() })
            .collect();
        out.sort_by_key(|c| c.id);
        out
    }

    // ---- snapshots ---------------------------------------------------

    /// Pin a new read-only view at the current `youngest_sequence`.
    pub fn snapshot_create(&self) -> Snapshot {
        let sequence = self.youngest_sequence();
        let id = self.next_snapshot_id.fetch_add(1, Ordering::Relaxed);
        self.snapshots.lock().insert(id, sequence);
        Snapshot::new(id, sequence)
    }

    /// Release a snapshot handle.
    pub fn snapshot_drop(&self, snapshot: Snapshot) {
        self.snapshots.lock().remove(&snapshot.id());
    }

    /// List every snapshot currently outstanding.
    pub fn snapshot_list(&self) -> Vec<Snapshot> {
        self.snapshots
            .lock()
            .iter()
            .map(|(&id, &seq)| Snapshot::new(id, seq))
            .collect()
    }

    // ---- transactions --------------------------------------------------

    /// Begin a new transaction. `explicit_sequence` supports deterministic
    /// replay (spec §3.3); otherwise `youngest_sequence + 1` is assigned.
    pub fn transaction_begin(&self, explicit_sequence: Option<Sequence>) -> Transaction {
        let id: TxnId = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        let mut txn = Transaction::new(id);
        let sequence = explicit_sequence.unwrap_or_else(|| self.youngest_sequence() + 1);
        // Fresh transactions always accept `begin`.
        txn.begin(sequence).expect("fresh transaction accepts begin");
        txn
    }

    /// Commit protocol (spec §4.3.4), executed under the exclusive HEAD
    /// lock.
    pub fn transaction_commit(
        &self,
        txn: &mut Transaction,
        options: crate::request::CommitOptions,
    ) -> Result<Option<Sequence>> {
        txn.require_active()?;
        let mut state = self.state.write();

        // 1. Watch check.
        for (&ck, &observed) in txn.watched() {
            let cur = current_sequence(&state, ck)?;
            if cur != observed {
                txn.finish_aborted();
                tracing::warn!(?ck, observed, cur, "transaction conflict on watched entry");
                return Err(StoreError::Conflict(format!(
                    "watched entry ({}, {}) changed from sequence {} to {}",
                    ck.0, ck.1, observed, cur
                )));
            }
        }

        // 2 & 3. Self-commit guard + overwrite guard for mutated keys. Any
        // commit between `begin` and now stamped a sequence >=
        // `txn.sequence_number()`; exactly equal means this same
        // transaction already committed, strictly greater means a
        // concurrent commit raced us.
        let mutated: Vec<CollectionKey> =
            txn.upserted().keys().copied().chain(txn.removed().iter().copied()).collect();
        for ck in &mutated {
            let cur = current_sequence(&state, *ck)?;
            if cur == txn.sequence_number() {
                txn.finish_aborted();
                return Err(StoreError::DoubleCommit);
            }
            if cur > txn.sequence_number() {
                txn.finish_aborted();
                return Err(StoreError::Conflict(format!(
                    "mutated entry ({}, {}) was overwritten since the transaction began",
                    ck.0, ck.1
                )));
            }
        }

        // 4. Apply.
        let commit_sequence = txn.sequence_number();
        for (&ck, value) in txn.upserted() {
            let collection = state.collection_mut(ck.0)?;
            collection.append(ck.1, commit_sequence, EntryState::Present(std::sync::Arc::from(value.clone())));
        }
        for &ck in txn.removed() {
            let collection = state.collection_mut(ck.0)?;
            collection.append(ck.1, commit_sequence, EntryState::Tombstone);
        }
        if state.youngest_sequence < commit_sequence {
            state.youngest_sequence = commit_sequence;
        }

        // 5. Durability.
        if options.flush || self.config.flush_on_commit {
            self.flush_locked(&state)?;
        }

        txn.finish_committed();
        tracing::info!(sequence = commit_sequence, "transaction committed");
        Ok(Some(commit_sequence))
    }

    /// Abort without committing. A no-op if the transaction wasn't active.
    pub fn transaction_free(&self, txn: &mut Transaction) {
        txn.free();
    }

    /// Flush every collection with `data_dir` set to disk.
    pub(crate) fn flush_locked(&self, state: &HeadState) -> Result<()> {
        let Some(dir) = &self.config.data_dir else { return Ok(()) };
        for entry in state.collections.values() {
            let path = persist::path_for(dir, entry.name.as_deref());
            persist::write_collection(&path, &entry.data)?;
        }
        Ok(())
    }
}

fn current_sequence(state: &HeadState, ck: CollectionKey) -> Result<Sequence> {
    Ok(state.collection(ck.0)?.current_sequence(ck.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::request::{CommitOptions, ReadOptions, ReadTask, ReadWant, WriteOptions, WriteTask};

    fn db() -> Database {
        Database::open(Config::default()).unwrap()
    }

    #[test]
    fn scenario_1_write_then_read() {
        let db = db();
        let arena = crate::arena::Arena::new();
        db.write(
            crate::kv::ops::WriteCtx::Head,
            &[WriteTask { collection: 0, key: 7, value: Some(b"abc") }],
            WriteOptions::default(),
        )
        .unwrap();
        let out = db
            .read(
                crate::kv::ops::ReadCtx::Head,
                &[ReadTask { collection: 0, key: 7 }],
                ReadWant::all(),
                ReadOptions::default(),
                &arena,
            )
            .unwrap();
        assert!(crate::request::bitmap_get(out.presences.unwrap(), 0));
        assert_eq!(out.lengths.unwrap()[0], 3);
        assert_eq!(out.values.unwrap(), b"abc");
    }

    #[test]
    fn scenario_2_watch_conflict_aborts() {
        let db = db();
        let arena = crate::arena::Arena::new();
        db.write(
            crate::kv::ops::WriteCtx::Head,
            &[WriteTask { collection: 0, key: 7, value: Some(b"orig") }],
            WriteOptions::default(),
        )
        .unwrap();

        let mut t1 = db.transaction_begin(None);
        let _ = db
            .read(
                crate::kv::ops::ReadCtx::Txn(&mut t1),
                &[ReadTask { collection: 0, key: 7 }],
                ReadWant::all(),
                ReadOptions::default(),
                &arena,
            )
            .unwrap();

        // Concurrent commit from an independent write.
        db.write(
            crate::kv::ops::WriteCtx::Head,
            &[WriteTask { collection: 0, key: 7, value: Some(b"xyz") }],
            WriteOptions::default(),
        )
        .unwrap();

        // A no-op write to force the mutated-set check is unnecessary; the
        // watch alone must already conflict.
        let result = db.transaction_commit(&mut t1, CommitOptions::default());
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn scenario_3_delete_then_read_absent() {
        let db = db();
        let arena = crate::arena::Arena::new();

        let mut t1 = db.transaction_begin(None);
        db.write(
            crate::kv::ops::WriteCtx::Txn(&mut t1),
            &[WriteTask { collection: 0, key: 7, value: Some(b"abc") }],
            WriteOptions::default(),
        )
        .unwrap();
        db.transaction_commit(&mut t1, CommitOptions::default()).unwrap();

        let mut t2 = db.transaction_begin(None);
        db.write(
            crate::kv::ops::WriteCtx::Txn(&mut t2),
            &[WriteTask { collection: 0, key: 7, value: None }],
            WriteOptions::default(),
        )
        .unwrap();
        db.transaction_commit(&mut t2, CommitOptions::default()).unwrap();

        let out = db
            .read(
                crate::kv::ops::ReadCtx::Head,
                &[ReadTask { collection: 0, key: 7 }],
                ReadWant::all(),
                ReadOptions::default(),
                &arena,
            )
            .unwrap();
        assert!(!crate::request::bitmap_get(out.presences.unwrap(), 0));
        assert_eq!(out.lengths.unwrap()[0], crate::constants::LENGTH_MISSING);
    }

    #[test]
    fn collection_create_and_list() {
        let db = db();
        let id = db.collection_create("widgets", "").unwrap();
        assert_ne!(id, 0);
        let names: Vec<_> = db.collection_list().into_iter().map(|c| c.name).collect();
        assert!(names.contains(&Some("widgets".to_string())));
    }

    #[test]
    fn main_collection_handle_cannot_be_dropped() {
        let db = db();
        let result = db.collection_drop(crate::constants::COL_MAIN, CollectionDropMode::KeysValuesAndHandle);
        assert!(result.is_err());
    }
}
