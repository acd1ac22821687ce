//! Sentinels and fixed identifiers shared across the substrate, document and
//! graph engines.

/// Sentinel key meaning "no such key" in outputs that return keys.
pub const KEY_UNKNOWN: u64 = u64::MAX;

/// Sentinel key used as the open end of an unbounded scan.
pub const KEY_MAX: u64 = u64::MAX;

/// Sentinel length meaning "value absent" in length outputs.
pub const LENGTH_MISSING: u32 = u32::MAX;

/// Sentinel degree meaning "vertex absent" in degree outputs.
pub const DEGREE_MISSING: u32 = u32::MAX;

/// Identifier of the collection that always exists.
pub const COL_MAIN: u64 = 0;

/// Reserved edge identifier for unweighted / unlabeled edges.
pub const EDGE_DEFAULT: u64 = 0;

/// Byte length of an empty adjacency value (two zero 32-bit counts).
pub const ADJACENCY_HEADER_LEN: usize = 8;
