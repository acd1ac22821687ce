//! Request orchestration: strided batch inputs, bitmaps, and the options /
//! output-discipline types shared by every public operation (spec §4.6).

mod bitmap;
mod strided;

pub use bitmap::{bytes_for as bitmap_bytes_for, clear as bitmap_clear, get as bitmap_get, set as bitmap_set};
pub use strided::{Strided, StridedIter};

use crate::types::{CollectionId, Key};

/// Options accepted by `read`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Skip recording observed sequences into the transaction's `watched`
    /// set for this read (spec §4.3.2 step 4).
    pub dont_watch: bool,
}

/// Options accepted by `write`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Block until the new state is durable before returning (spec §4.3.3).
    pub flush: bool,
}

/// Options accepted by `transaction_commit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    /// Block until the commit is durable before returning.
    pub flush: bool,
}

/// One `(collection, key)` read task.
#[derive(Debug, Clone, Copy)]
pub struct ReadTask {
    /// Collection to read from.
    pub collection: CollectionId,
    /// Key to read.
    pub key: Key,
}

/// One write task. `value: None` is a tombstone (delete); `Some(&[])` is a
/// present-but-empty value, distinct from deletion (spec §4.3.3).
#[derive(Debug, Clone, Copy)]
pub struct WriteTask<'a> {
    /// Collection to write into.
    pub collection: CollectionId,
    /// Key to write.
    pub key: Key,
    /// New value, or `None` to delete.
    pub value: Option<&'a [u8]>,
}

/// One scan task: up to `limit` keys in `[min_key, max_key)`, ascending
/// (spec §4.3.5).
#[derive(Debug, Clone, Copy)]
pub struct ScanTask {
    /// Collection to scan.
    pub collection: CollectionId,
    /// Inclusive lower bound.
    pub min_key: Key,
    /// Exclusive upper bound.
    pub max_key: Key,
    /// Maximum number of keys to return.
    pub limit: usize,
}

/// One sample task: up to `limit` uniformly sampled keys from a collection.
#[derive(Debug, Clone, Copy)]
pub struct SampleTask {
    /// Collection to sample.
    pub collection: CollectionId,
    /// Maximum number of keys to return.
    pub limit: usize,
}

/// One measure task: cardinality / size estimate for a collection (or a
/// sub-range, when `min_key`/`max_key` narrow it).
#[derive(Debug, Clone, Copy)]
pub struct MeasureTask {
    /// Collection to measure.
    pub collection: CollectionId,
    /// Inclusive lower bound.
    pub min_key: Key,
    /// Exclusive upper bound.
    pub max_key: Key,
}

/// Output of one `measure` task (spec §4.3.1, supplemented per
/// SPEC_FULL.md: the reference backend holds no approximate structures, so
/// `min_cardinality == max_cardinality` always; `bytes_on_disk` is `0` for
/// a purely in-memory database).
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasureOutputs {
    /// Smallest plausible live-key count in the measured range.
    pub min_cardinality: u64,
    /// Largest plausible live-key count in the measured range.
    pub max_cardinality: u64,
    /// Total bytes held by live values in the measured range.
    pub bytes_in_values: u64,
    /// Size of the collection's persisted file, or `0` if in-memory.
    pub bytes_on_disk: u64,
}

/// Which optional outputs a `read` caller wants produced. Mirrors the C
/// surface's "pass null to skip this output" discipline (spec §4.3.2): the
/// engine always computes every value internally but only materializes and
/// returns the columns actually requested.
#[derive(Debug, Clone, Copy)]
pub struct ReadWant {
    /// Produce the presence bitmap.
    pub presences: bool,
    /// Produce per-task lengths.
    pub lengths: bool,
    /// Produce per-task offsets into the concatenated values buffer.
    pub offsets: bool,
    /// Produce the concatenated values buffer.
    pub values: bool,
}

impl ReadWant {
    /// Request every output.
    pub fn all() -> Self {
        Self { presences: true, lengths: true, offsets: true, values: true }
    }

    /// Request only the presence bitmap (a fast "does this key exist" check).
    pub fn presence_only() -> Self {
        Self { presences: true, lengths: false, offsets: false, values: false }
    }

    /// Request only per-task lengths (a fast "how big is this value" check,
    /// also how §4.5.4's degree-only graph queries are expressed).
    pub fn lengths_only() -> Self {
        Self { presences: false, lengths: true, offsets: false, values: false }
    }
}

impl Default for ReadWant {
    fn default() -> Self {
        Self::all()
    }
}

/// The output of a batched `read`: any field the caller didn't request in
/// `ReadWant` is `None`.
pub struct ReadOutputs<'a> {
    /// Bit `i` set iff task `i`'s key was present.
    pub presences: Option<&'a [u8]>,
    /// `lengths[i]` is the byte length of task `i`'s value, or
    /// `LENGTH_MISSING` if absent.
    pub lengths: Option<&'a [u32]>,
    /// `offsets[i+1] - offsets[i]` equals `lengths[i]` (or 0 if absent);
    /// `offsets[count]` is the total byte length (spec §4.3.2).
    pub offsets: Option<&'a [u32]>,
    /// Concatenated values for every present task, in task order.
    pub values: Option<&'a [u8]>,
}
