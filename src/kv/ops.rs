//! Read, write, scan, sample and measure (spec §4.3.2 – §4.3.5): the
//! operations every higher-level engine (document, graph) is built from.

use super::database::{Database, HeadState};
use super::entry::EntryState;
use super::persist;
use super::snapshot::Snapshot;
use super::transaction::{Local, Transaction};
use crate::arena::Arena;
use crate::constants::{KEY_MAX, LENGTH_MISSING};
use crate::request::{
    MeasureOutputs, MeasureTask, ReadOptions, ReadOutputs, ReadTask, ReadWant, SampleTask, ScanTask, WriteOptions,
    WriteTask,
};
use crate::types::{CollectionId, Key, Result, StoreError};
use std::collections::BTreeSet;

/// Which view a `read` is taken through (spec §4.3.2).
pub enum ReadCtx<'a> {
    /// HEAD: the latest committed state of each key.
    Head,
    /// Through a transaction: local staging first, then HEAD, recording
    /// each observed sequence into the transaction's watch set (unless
    /// [`ReadOptions::dont_watch`]).
    Txn(&'a mut Transaction),
    /// Through a pinned snapshot.
    Snapshot(&'a Snapshot),
    /// Through a transaction, additionally pinned to a snapshot. Valid only
    /// when the snapshot's sequence matches the transaction's own
    /// `sequence_number - 1` (its implicit view at `begin`); anything else
    /// is an invalid combination (spec §3.3).
    TxnAndSnapshot(&'a mut Transaction, &'a Snapshot),
}

/// Which view a `write` targets (spec §4.3.3).
pub enum WriteCtx<'a> {
    /// Apply directly to HEAD, each task its own implicit commit.
    Head,
    /// Stage into a transaction; visible to that transaction only until
    /// commit.
    Txn(&'a mut Transaction),
}

/// Shared "HEAD or transaction" context for the document and graph engines
/// (spec §4.4, §4.5), which only ever read-then-write through a single
/// target within one call — never a bare snapshot, since neither engine
/// writes through one. Kept distinct from [`ReadCtx`]/[`WriteCtx`] (which
/// also cover scan/sample/measure and the snapshot-only read path) so the
/// upper engines have exactly the two states they can actually be in.
pub enum EngineCtx<'a> {
    /// Apply directly to HEAD.
    Head,
    /// Stage into a transaction.
    Txn(&'a mut Transaction),
}

impl<'a> EngineCtx<'a> {
    /// Reborrow as a [`ReadCtx`] for one substrate call.
    pub(crate) fn as_read(&mut self) -> ReadCtx<'_> {
        match self {
            EngineCtx::Head => ReadCtx::Head,
            EngineCtx::Txn(txn) => ReadCtx::Txn(txn),
        }
    }

    /// Reborrow as a [`WriteCtx`] for one substrate call.
    pub(crate) fn as_write(&mut self) -> WriteCtx<'_> {
        match self {
            EngineCtx::Head => WriteCtx::Head,
            EngineCtx::Txn(txn) => WriteCtx::Txn(txn),
        }
    }
}

fn entry_state_as_of(state: &HeadState, collection: CollectionId, key: Key, as_of: Option<crate::types::Sequence>) -> Result<Option<EntryState>> {
    let col = state.collection(collection)?;
    let found = match as_of {
        Some(seq) => col.as_of(key, seq).cloned(),
        None => col.current(key).cloned(),
    };
    Ok(found)
}

impl Database {
    /// Batched read (spec §4.3.2). `tasks` drive the output order; `want`
    /// selects which of `presences`/`lengths`/`offsets`/`values` are
    /// materialized. All outputs are carved out of `arena`.
    pub fn read<'a>(
        &self,
        ctx: ReadCtx<'_>,
        tasks: &[ReadTask],
        want: ReadWant,
        options: ReadOptions,
        arena: &'a Arena,
    ) -> Result<ReadOutputs<'a>> {
        let n = tasks.len();
        let presences = arena.alloc_or_dummy::<u8>(crate::request::bitmap_bytes_for(n), want.presences);
        let lengths = arena.alloc_or_dummy::<u32>(n, want.lengths);
        for l in lengths.iter_mut() {
            *l = LENGTH_MISSING;
        }

        let mut values_buf: Vec<u8> = Vec::new();
        let mut offsets_buf: Vec<u32> = Vec::with_capacity(n + 1);
        offsets_buf.push(0);

        let snapshot_seq = match &ctx {
            ReadCtx::Snapshot(s) => Some(s.sequence()),
            ReadCtx::TxnAndSnapshot(txn, s) => {
                let implicit = txn.sequence_number().saturating_sub(1);
                if s.sequence() != implicit {
                    return Err(StoreError::ArgsCombo(
                        "snapshot does not match the transaction's implicit view".into(),
                    ));
                }
                Some(s.sequence())
            }
            _ => None,
        };

        let state = self.state().read();

        for (i, task) in tasks.iter().enumerate() {
            let ck = (task.collection, task.key);

            let local = match &ctx {
                ReadCtx::Txn(txn) => txn.local(ck),
                ReadCtx::TxnAndSnapshot(txn, _) => txn.local(ck),
                _ => None,
            };

            let resolved: Option<Vec<u8>> = match local {
                Some(Local::Removed) => None,
                Some(Local::Upserted(v)) => Some(v.to_vec()),
                None => entry_state_as_of(&state, task.collection, task.key, snapshot_seq)?
                    .and_then(|s| s.value().map(|v| v.to_vec())),
            };

            match &resolved {
                Some(v) => {
                    crate::request::bitmap_set(presences, i);
                    lengths[i] = v.len() as u32;
                    values_buf.extend_from_slice(v);
                }
                None => {
                    lengths[i] = LENGTH_MISSING;
                }
            }
            offsets_buf.push(values_buf.len() as u32);
        }

        // Watch recording happens after the borrow of `local` above to
        // avoid holding two mutable borrows of `txn` at once.
        if !options.dont_watch {
            match ctx {
                ReadCtx::Txn(txn) | ReadCtx::TxnAndSnapshot(txn, _) => {
                    for task in tasks {
                        let ck = (task.collection, task.key);
                        if txn.local(ck).is_none() {
                            let observed = state.collection(task.collection)?.current_sequence(task.key);
                            txn.watch(ck, observed);
                        }
                    }
                }
                _ => {}
            }
        }

        let offsets = if want.offsets { Some(arena.alloc_copy(&offsets_buf)) } else { None };
        let values = if want.values { Some(arena.alloc_bytes(&values_buf)) } else { None };

        Ok(ReadOutputs {
            presences: if want.presences { Some(presences) } else { None },
            lengths: if want.lengths { Some(lengths) } else { None },
            offsets,
            values,
        })
    }

    /// Batched write (spec §4.3.3). Tasks apply in order; a later task
    /// targeting the same `(collection, key)` as an earlier one wins.
    pub fn write(&self, ctx: WriteCtx<'_>, tasks: &[WriteTask<'_>], options: WriteOptions) -> Result<()> {
        match ctx {
            WriteCtx::Txn(txn) => {
                txn.require_active()?;
                for task in tasks {
                    let ck = (task.collection, task.key);
                    match task.value {
                        Some(v) => txn.stage_upsert(ck, v.to_vec()),
                        None => txn.stage_remove(ck),
                    }
                }
                Ok(())
            }
            WriteCtx::Head => {
                let mut state = self.state().write();
                let sequence = state.youngest_sequence + 1;
                for task in tasks {
                    let collection = state.collection_mut(task.collection)?;
                    let entry_state = match task.value {
                        Some(v) => EntryState::Present(std::sync::Arc::from(v)),
                        None => EntryState::Tombstone,
                    };
                    collection.append(task.key, sequence, entry_state);
                }
                state.youngest_sequence = sequence;
                if options.flush || self.config().flush_on_commit {
                    self.flush_locked(&state)?;
                }
                tracing::debug!(count = tasks.len(), sequence, "head write applied");
                Ok(())
            }
        }
    }

    /// Ordered key scan over `[min_key, max_key)`, merging HEAD/snapshot
    /// state with a transaction's local staging when present (spec §4.3.5):
    /// staged removals hide HEAD keys, staged upserts surface keys HEAD
    /// doesn't yet have, and on overlap the staged value wins.
    pub fn scan(&self, ctx: ReadCtx<'_>, task: ScanTask) -> Result<Vec<Key>> {
        let snapshot_seq = match &ctx {
            ReadCtx::Snapshot(s) => Some(s.sequence()),
            ReadCtx::TxnAndSnapshot(txn, s) => {
                let implicit = txn.sequence_number().saturating_sub(1);
                if s.sequence() != implicit {
                    return Err(StoreError::ArgsCombo(
                        "snapshot does not match the transaction's implicit view".into(),
                    ));
                }
                Some(s.sequence())
            }
            _ => None,
        };
        let state = self.state().read();
        let collection = state.collection(task.collection)?;

        let mut keys: BTreeSet<Key> = match snapshot_seq {
            Some(seq) => {
                // Snapshot scans walk the full key range and re-resolve
                // each live HEAD key as of `seq`; no dedicated snapshot
                // index is maintained (spec §9: acceptable given History
                // retains full per-key version chains).
                collection
                    .scan_head(task.min_key, task.max_key, usize::MAX)
                    .into_iter()
                    .filter(|&k| matches!(collection.as_of(k, seq), Some(EntryState::Present(_))))
                    .collect()
            }
            None => collection.scan_head(task.min_key, task.max_key, usize::MAX).into_iter().collect(),
        };

        match ctx {
            ReadCtx::Txn(txn) | ReadCtx::TxnAndSnapshot(txn, _) => {
                for (&(col, key), _) in txn.upserted() {
                    if col == task.collection && key >= task.min_key && key < task.max_key {
                        keys.insert(key);
                    }
                }
                for &(col, key) in txn.removed() {
                    if col == task.collection {
                        keys.remove(&key);
                    }
                }
            }
            _ => {}
        }

        Ok(keys.into_iter().take(task.limit).collect())
    }

    /// Uniform reservoir sample of up to `task.limit` live keys (spec
    /// §4.3.5, supplemented from the original `ukv_sample` surface: see
    /// SPEC_FULL.md §A.5).
    pub fn sample(&self, task: SampleTask) -> Result<Vec<Key>> {
        use rand::Rng;
        let state = self.state().read();
        let collection = state.collection(task.collection)?;
        let population = collection.live_keys_in(0, KEY_MAX);

        if population.len() <= task.limit {
            return Ok(population);
        }

        let mut rng = rand::rng();
        let mut reservoir: Vec<Key> = population[..task.limit].to_vec();
        for (i, &key) in population.iter().enumerate().skip(task.limit) {
            let j = rng.random_range(0..=i);
            if j < task.limit {
                reservoir[j] = key;
            }
        }
        Ok(reservoir)
    }

    /// Cardinality and size estimate over `[min_key, max_key)` (spec
    /// §4.3.5, supplemented from `ukv_measure`: see SPEC_FULL.md). The
    /// in-memory substrate holds exact state, so `min_cardinality ==
    /// max_cardinality`; `bytes_on_disk` reflects the persisted file's size
    /// when `Config::data_dir` is set, or `0` otherwise.
    pub fn measure(&self, task: MeasureTask) -> Result<MeasureOutputs> {
        let state = self.state().read();
        let collection = state.collection(task.collection)?;
        let count = collection.live_keys_in(task.min_key, task.max_key).len() as u64;
        let bytes_in_values = collection.value_bytes_in(task.min_key, task.max_key);
        let bytes_on_disk = match &self.config().data_dir {
            Some(dir) => {
                let name = state.collections.get(&task.collection).and_then(|e| e.name.clone());
                std::fs::metadata(persist::path_for(dir, name.as_deref())).map(|m| m.len()).unwrap_or(0)
            }
            None => 0,
        };
        Ok(MeasureOutputs { min_cardinality: count, max_cardinality: count, bytes_in_values, bytes_on_disk })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::kv::database::Database;

    fn db() -> Database {
        Database::open(Config::default()).unwrap()
    }

    #[test]
    fn scan_merges_transaction_staging() {
        let db = db();
        db.write(WriteCtx::Head, &[WriteTask { collection: 0, key: 1, value: Some(b"a") }], WriteOptions::default())
            .unwrap();
        db.write(WriteCtx::Head, &[WriteTask { collection: 0, key: 2, value: Some(b"b") }], WriteOptions::default())
            .unwrap();

        let mut txn = db.transaction_begin(None);
        db.write(
            WriteCtx::Txn(&mut txn),
            &[
                WriteTask { collection: 0, key: 2, value: None },
                WriteTask { collection: 0, key: 3, value: Some(b"c") },
            ],
            WriteOptions::default(),
        )
        .unwrap();

        let keys = db.scan(ReadCtx::Txn(&mut txn), ScanTask { collection: 0, min_key: 0, max_key: KEY_MAX, limit: 10 }).unwrap();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn measure_counts_and_sizes_live_entries_only() {
        let db = db();
        db.write(
            WriteCtx::Head,
            &[
                WriteTask { collection: 0, key: 1, value: Some(b"ab") },
                WriteTask { collection: 0, key: 2, value: Some(b"cde") },
            ],
            WriteOptions::default(),
        )
        .unwrap();
        db.write(WriteCtx::Head, &[WriteTask { collection: 0, key: 1, value: None }], WriteOptions::default()).unwrap();

        let measured = db.measure(MeasureTask { collection: 0, min_key: 0, max_key: KEY_MAX }).unwrap();
        assert_eq!(measured.min_cardinality, 1);
        assert_eq!(measured.max_cardinality, 1);
        assert_eq!(measured.bytes_in_values, 3);
        assert_eq!(measured.bytes_on_disk, 0);
    }

    #[test]
    fn sample_never_exceeds_population() {
        let db = db();
        db.write(
            WriteCtx::Head,
            &[WriteTask { collection: 0, key: 1, value: Some(b"a") }, WriteTask { collection: 0, key: 2, value: Some(b"b") }],
            WriteOptions::default(),
        )
        .unwrap();
        let sampled = db.sample(SampleTask { collection: 0, limit: 10 }).unwrap();
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn measure_reports_disk_size_once_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(Config { data_dir: Some(dir.path().to_path_buf()), ..Config::default() }).unwrap();
        db.write(
            WriteCtx::Head,
            &[WriteTask { collection: 0, key: 1, value: Some(b"abc") }],
            WriteOptions { flush: true },
        )
        .unwrap();

        let measured = db.measure(MeasureTask { collection: 0, min_key: 0, max_key: KEY_MAX }).unwrap();
        assert!(measured.bytes_on_disk > 0);
    }
}
