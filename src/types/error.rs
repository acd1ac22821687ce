//! Error taxonomy for the store (spec §7).
//!
//! Variants are error *kinds*, not one-per-call-site types: callers match on
//! the kind and read the payload for context, the way `GraphError` is
//! consumed in `rfdb-server`.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The error kinds produced by the core. See spec §7 for the contract each
/// variant honors (in particular: transactional operations never mutate
/// state on an error path).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed input: unknown format, invalid path expression, etc.
    #[error("invalid argument: {0}")]
    ArgsWrong(String),

    /// Internally consistent arguments that are inconsistent with each other.
    #[error("invalid argument combination: {0}")]
    ArgsCombo(String),

    /// Arena or allocator failed to satisfy a request.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A required handle was null / unset.
    #[error("uninitialized handle: {0}")]
    Uninitialized(String),

    /// A stored value failed to decode under its modality's invariant.
    #[error("corrupted value in collection {collection} at key {key}: {reason}")]
    Corruption {
        /// Collection the corrupt entry lives in.
        collection: u64,
        /// Key of the corrupt entry.
        key: u64,
        /// What invariant check failed.
        reason: String,
    },

    /// A transactional commit lost an optimistic-concurrency race.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// The same transaction sequence number was committed twice without an
    /// intervening `begin`.
    #[error("transaction already committed")]
    DoubleCommit,

    /// The caller asked for an option this build doesn't implement.
    #[error("feature not implemented: {0}")]
    MissingFeature(String),

    /// Reserved for the RPC front-end; never produced by this crate.
    #[error("network error: {0}")]
    Network(String),

    /// Fallback for conditions with no dedicated kind.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Stable string code, for callers (e.g. a future C ABI or RPC layer)
    /// that want to branch without matching the Rust enum.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::ArgsWrong(_) => "ARGS_WRONG",
            StoreError::ArgsCombo(_) => "ARGS_COMBO",
            StoreError::OutOfMemory(_) => "OUT_OF_MEMORY",
            StoreError::Uninitialized(_) => "UNINITIALIZED",
            StoreError::Corruption { .. } => "CORRUPTION",
            StoreError::Conflict(_) => "CONFLICT",
            StoreError::DoubleCommit => "DOUBLE_COMMIT",
            StoreError::MissingFeature(_) => "MISSING_FEATURE",
            StoreError::Network(_) => "NETWORK",
            StoreError::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unknown(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::ArgsWrong(format!("invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(StoreError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(StoreError::DoubleCommit.code(), "DOUBLE_COMMIT");
        assert_eq!(
            StoreError::Corruption { collection: 0, key: 7, reason: "short header".into() }.code(),
            "CORRUPTION"
        );
    }
}
