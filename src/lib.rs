//! unigraph-store — a transactional key-value substrate with document and
//! graph modalities layered on top.
//!
//! The substrate ([`kv`]) is the only thing that owns storage: an MVCC
//! key-value collection registry under a single reader/writer lock, with
//! watch-set based optimistic transactions. The document engine
//! ([`document`]) and graph engine ([`graph`]) add no storage of their
//! own — they parse substrate values into a richer shape (a JSON-like tree,
//! an adjacency list), operate on that shape, and write the result straight
//! back through the substrate. Request orchestration types shared by every
//! operation (strided batch inputs, bitmaps, options) live in [`request`].
#![warn(missing_docs)]

/// Per-batch scratch allocator and packed output tape.
pub mod arena;
/// Sentinels and fixed identifiers shared across every module.
pub mod constants;
/// Configuration, logging, and other ambient plumbing.
pub mod core;
/// The document modality: documents as disciplined substrate values.
pub mod document;
/// The graph modality: vertices and edges as disciplined substrate values.
pub mod graph;
/// The transactional key-value substrate.
pub mod kv;
/// Batch request types shared across every operation.
pub mod request;
/// Shared identifier and error types.
pub mod types;

pub use core::Config;
pub use document::{DocumentEngine, DocumentFormat, DocumentReadResult, DocumentReadTask, DocumentWriteTask};
pub use graph::{DegreeTask, EdgeRemoveTask, EdgeTask, EdgeTriple, GraphEngine, VertexRemoveTask, VertexRole};
pub use kv::{Database, EngineCtx};
pub use types::{CollectionId, Key, Result, Sequence, StoreError};

/// Crate version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `tracing` subscriber reading `RUST_LOG` (or the crate's default
/// filter). Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    core::logging::init();
}
