//! Transactional KV substrate: collections, entries, MVCC, transactions,
//! snapshots, scans, measure (spec §4.3 — "the interesting part").

mod collection;
pub(crate) mod database;
mod entry;
mod ops;
/// Persisted file substrate (spec §6).
pub mod persist;
mod snapshot;
mod transaction;

pub use collection::Collection;
pub use database::{CollectionDropMode, CollectionInfo, Database};
pub use entry::EntryState;
pub use ops::{EngineCtx, ReadCtx, WriteCtx};
pub use snapshot::Snapshot;
pub use transaction::{CollectionKey, Local, Transaction, TxnState};
