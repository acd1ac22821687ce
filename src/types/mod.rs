//! Shared type definitions used across the substrate, document and graph
//! engines.

/// Error taxonomy (spec §7).
pub mod error;
/// Identifier aliases (keys, collections, sequences).
pub mod ids;

pub use error::{Result, StoreError};
pub use ids::{CollectionId, Key, Sequence, SnapshotId, TxnId, SEQUENCE_NEVER};
