//! Fixed-width identifiers. `Key` and `CollectionId` stay thin `u64` aliases
//! rather than wrapped newtypes: unlike the base62 `ID8`/`ID16`/`ID32` used
//! for document/user identifiers in the ancestor codebase, the substrate's
//! key space is a plain integer total order, and wrapping it would only get
//! in the way of arithmetic range scans.

/// A key within a collection. `KEY_UNKNOWN` (`u64::MAX`) is reserved.
pub type Key = u64;

/// An opaque collection identifier. `0` (`COL_MAIN`) is reserved for the
/// collection that always exists; identifiers returned by
/// `collection_create` are non-zero.
pub type CollectionId = u64;

/// A monotonically assigned commit sequence number.
pub type Sequence = u64;

/// A transaction identifier, also used as the transaction's assigned
/// sequence number at `begin`.
pub type TxnId = u64;

/// A snapshot identifier.
pub type SnapshotId = u64;

/// Sequence number one below the smallest possible value; no committed
/// entry ever carries this, so it safely means "never written".
pub const SEQUENCE_NEVER: Sequence = 0;
