//! Patch semantics (spec §3.5, §4.4.1): RFC 6902 JSON Patch and RFC 7386
//! JSON Merge Patch, operating on the canonical `Node` tree.

use super::path::{self, Segment};
use super::value::Node;
use crate::types::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// One RFC 6902 JSON Patch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: JsonValue },
    Remove { path: String },
    Replace { path: String, value: JsonValue },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: JsonValue },
}

/// `serde_json::Value` re-exported under a document-local name so patch
/// bodies (which travel as JSON per RFC 6902) don't force every caller to
/// depend on `serde_json` directly.
pub type JsonValue = serde_json::Value;

fn node_of(value: &JsonValue) -> Node {
    super::json::node_from_json_value(value)
}

/// Apply a sequence of RFC 6902 operations to `doc` in order. On any
/// operation's failure (path not found, `test` mismatch) the whole patch is
/// rejected and `doc` is left unmodified — partial application would leave
/// a document that doesn't satisfy I5 under some other reader's view mid
/// batch.
pub fn apply_json_patch(doc: &Node, ops: &[PatchOp]) -> Result<Node> {
    let mut working = doc.clone();
    for op in ops {
        apply_one(&mut working, op)?;
    }
    Ok(working)
}

fn apply_one(doc: &mut Node, op: &PatchOp) -> Result<()> {
    match op {
        PatchOp::Add { path, value } => {
            let segments = path::parse(path)?;
            path::insert(doc, &segments, node_of(value))
        }
        PatchOp::Remove { path } => {
            let segments = path::parse(path)?;
            path::remove(doc, &segments).map(|_| ())
        }
        PatchOp::Replace { path, value } => {
            let segments = path::parse(path)?;
            if path::get(doc, &segments).is_none() {
                return Err(StoreError::ArgsWrong(format!("replace target does not exist: {path}")));
            }
            path::set(doc, &segments, node_of(value))
        }
        PatchOp::Move { from, path } => {
            let from_segments = path::parse(from)?;
            let to_segments = path::parse(path)?;
            let moved = path::remove(doc, &from_segments)?;
            // RFC 6902 §4.4: the destination is added exactly as `add` would.
            path::insert(doc, &to_segments, moved)
        }
        PatchOp::Copy { from, path } => {
            let from_segments = path::parse(from)?;
            let to_segments = path::parse(path)?;
            let value = path::get(doc, &from_segments)
                .ok_or_else(|| StoreError::ArgsWrong(format!("copy source does not exist: {from}")))?
                .clone();
            // RFC 6902 §4.5: the destination is added exactly as `add` would.
            path::insert(doc, &to_segments, value)
        }
        PatchOp::Test { path, value } => {
            let segments = path::parse(path)?;
            let expected = node_of(value);
            match path::get(doc, &segments) {
                Some(actual) if *actual == expected => Ok(()),
                _ => Err(StoreError::ArgsWrong(format!("test failed at {path}"))),
            }
        }
    }
}

/// Apply an RFC 7386 JSON Merge Patch: recursively merge `patch` into
/// `doc`. A `null` leaf in `patch` deletes the corresponding field; any
/// other scalar or array replaces wholesale; objects merge key-by-key.
pub fn apply_merge_patch(doc: &Node, patch: &Node) -> Node {
    match (doc, patch) {
        (Node::Object(doc_fields), Node::Object(patch_fields)) => {
            let mut merged = doc_fields.clone();
            for (key, patch_value) in patch_fields {
                if matches!(patch_value, Node::Null) {
                    merged.retain(|(k, _)| k != key);
                } else if let Some(existing) = merged.iter_mut().find(|(k, _)| k == key) {
                    existing.1 = apply_merge_patch(&existing.1, patch_value);
                } else {
                    merged.push((key.clone(), patch_value.clone()));
                }
            }
            Node::Object(merged)
        }
        _ => patch.clone(),
    }
}

/// Parse a path segment list referring to a single root-level field and
/// build a one-field object around `value`, used by the "replace sub-tree
/// at field" write mode when no patch format was requested (spec §4.4.1
/// step 4).
pub fn replace_at(doc: &Node, field: &str, value: Node) -> Result<Node> {
    let mut working = doc.clone();
    let segments = path::parse(field)?;
    path::set(&mut working, &segments, value)?;
    Ok(working)
}
