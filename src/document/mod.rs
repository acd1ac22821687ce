//! The document modality (spec §3.5, §4.4): documents are disciplined
//! encodings of the transactional KV substrate. A document value is the
//! canonical `Node` tree's [`value::encode`]d bytes; everything in this
//! module is "read substrate bytes, parse, operate on the tree, serialize,
//! write substrate bytes" (spec §9 source-pattern note: "parse → mutate
//! tree → serialize").

mod engine;
/// Gather: columnar projection with validity/conversion/collision bitmaps.
pub mod gather;
/// Gist: sorted distinct field paths across a document batch.
pub mod gist;
/// JSON <-> canonical tree conversion.
pub mod json;
/// JSON Patch (RFC 6902) and JSON Merge Patch (RFC 7386).
pub mod patch;
/// Field-path addressing (dotted name or RFC 6901 pointer).
pub mod path;
/// The canonical in-memory document tree and its wire encoding.
pub mod value;

pub use engine::{DocumentEngine, DocumentFormat, DocumentReadResult, DocumentReadTask, DocumentWriteTask};
pub use value::Node;
