//! Canonical internal document representation (spec §3.5): a tree of null,
//! bool, signed/unsigned integers at four widths, float32/float64, string,
//! binary, array, object. `Node` is the in-memory tree; [`encode`]/[`decode`]
//! are its on-the-wire (substrate-value) form.
//!
//! Grounded on the teacher's `types::value::{ValueType, Value}` wire parser
//! (a zero-copy tagged-byte view): this crate needs an owned, mutable tree
//! instead (write paths parse-mutate-serialize per spec §4.4.1), so `Node`
//! is the owned counterpart, serialized with `bincode` rather than the
//! teacher's hand-rolled varint-length framing.

use crate::types::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// One node of a document tree. Object fields preserve insertion order (a
/// `Vec`, not a hash map) so re-serializing an unmodified document is
/// byte-for-byte stable, which the gather-idempotence property (spec §8)
/// and JSON-Patch round-tripping both depend on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
}

impl Node {
    /// Look up a field of an object by name, or `None` if this isn't an
    /// object or has no such field.
    pub fn field(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Object(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Insert or replace a field on an object in place. Panics on
    /// non-objects; callers only call this after confirming the node is an
    /// object (or is being initialized as one).
    pub fn set_field(&mut self, name: &str, value: Node) {
        match self {
            Node::Object(fields) => {
                if let Some(existing) = fields.iter_mut().find(|(k, _)| k == name) {
                    existing.1 = value;
                } else {
                    fields.push((name.to_string(), value));
                }
            }
            other => *other = Node::Object(vec![(name.to_string(), value)]),
        }
    }

    /// Whether this node is the JSON `null` literal.
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }
}

/// Serialize a `Node` to the canonical internal byte representation stored
/// in document collections.
pub fn encode(node: &Node) -> Vec<u8> {
    bincode::serialize(node).expect("Node encoding is infallible for in-memory trees")
}

/// Parse the canonical internal byte representation back into a `Node`
/// (spec I5: document values must parse without error).
pub fn decode(bytes: &[u8]) -> Result<Node> {
    bincode::deserialize(bytes)
        .map_err(|e| StoreError::Corruption { collection: 0, key: 0, reason: format!("invalid document encoding: {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_nested_object() {
        let doc = Node::Object(vec![(
            "a".to_string(),
            Node::Object(vec![("b".to_string(), Node::I32(1)), ("c".to_string(), Node::String("3.5".to_string()))]),
        )]);
        let bytes = encode(&doc);
        let back = decode(&bytes).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn corrupted_bytes_report_corruption_not_panic() {
        let err = decode(&[0xff, 0xff, 0xff]).unwrap_err();
        assert_eq!(err.code(), "CORRUPTION");
    }

    #[test]
    fn set_field_preserves_insertion_order() {
        let mut doc = Node::Object(vec![]);
        doc.set_field("z", Node::I32(1));
        doc.set_field("a", Node::I32(2));
        doc.set_field("z", Node::I32(3));
        match &doc {
            Node::Object(fields) => {
                assert_eq!(fields[0].0, "z");
                assert_eq!(fields[1].0, "a");
                assert_eq!(fields.len(), 2);
            }
            _ => panic!("expected object"),
        }
    }
}
