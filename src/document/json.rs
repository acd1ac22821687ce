//! Conversion between the canonical `Node` tree and `serde_json::Value`
//! (spec §3.5: "accepted input/output encodings: the canonical internal one
//! plus JSON").

use super::value::Node;
use crate::types::{Result, StoreError};
use serde_json::{Number, Value};

/// Parse a JSON document into a `Node` tree. Integers fit the narrowest
/// signed/unsigned width that holds them; floats become `F64` (JSON has no
/// narrower float literal).
pub fn from_json(raw: &str) -> Result<Node> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(node_from_json_value(&value))
}

/// Convert an already-parsed `serde_json::Value` to a `Node`, for callers
/// (JSON Patch bodies) that parsed JSON for an unrelated reason and would
/// otherwise have to stringify-and-reparse.
pub(crate) fn node_from_json_value(value: &Value) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Number(n) => number_to_node(n),
        Value::String(s) => Node::String(s.clone()),
        Value::Array(items) => Node::Array(items.iter().map(node_from_json_value).collect()),
        Value::Object(fields) => Node::Object(fields.iter().map(|(k, v)| (k.clone(), node_from_json_value(v))).collect()),
    }
}

fn number_to_node(n: &Number) -> Node {
    if let Some(u) = n.as_u64() {
        if u <= u8::MAX as u64 {
            Node::U8(u as u8)
        } else if u <= u16::MAX as u64 {
            Node::U16(u as u16)
        } else if u <= u32::MAX as u64 {
            Node::U32(u as u32)
        } else {
            Node::U64(u)
        }
    } else if let Some(i) = n.as_i64() {
        if i >= i8::MIN as i64 && i <= i8::MAX as i64 {
            Node::I8(i as i8)
        } else if i >= i16::MIN as i64 && i <= i16::MAX as i64 {
            Node::I16(i as i16)
        } else if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
            Node::I32(i as i32)
        } else {
            Node::I64(i)
        }
    } else {
        Node::F64(n.as_f64().unwrap_or(0.0))
    }
}

/// Serialize a `Node` tree to a JSON string. Binary values are base64-free:
/// they round-trip as an array of byte values, since JSON has no native
/// byte-string type.
pub fn to_json(node: &Node) -> Result<String> {
    let value = json_value_from_node(node);
    serde_json::to_string(&value).map_err(StoreError::from)
}

fn json_value_from_node(node: &Node) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::I8(v) => Value::Number((*v).into()),
        Node::I16(v) => Value::Number((*v).into()),
        Node::I32(v) => Value::Number((*v).into()),
        Node::I64(v) => Value::Number((*v).into()),
        Node::U8(v) => Value::Number((*v).into()),
        Node::U16(v) => Value::Number((*v).into()),
        Node::U32(v) => Value::Number((*v).into()),
        Node::U64(v) => Value::Number((*v).into()),
        Node::F32(v) => Number::from_f64(*v as f64).map(Value::Number).unwrap_or(Value::Null),
        Node::F64(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        Node::String(s) => Value::String(s.clone()),
        Node::Binary(bytes) => Value::Array(bytes.iter().map(|b| Value::Number((*b).into())).collect()),
        Node::Array(items) => Value::Array(items.iter().map(json_value_from_node).collect()),
        Node::Object(fields) => {
            Value::Object(fields.iter().map(|(k, v)| (k.clone(), json_value_from_node(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_nested_document() {
        let raw = r#"{"a":{"b":1,"c":"3.5"},"d":[1,2,3]}"#;
        let node = from_json(raw).unwrap();
        let back = to_json(&node).unwrap();
        let reparsed = from_json(&back).unwrap();
        assert_eq!(node, reparsed);
    }

    #[test]
    fn picks_narrowest_integer_width() {
        assert_eq!(from_json("5").unwrap(), Node::U8(5));
        assert_eq!(from_json("-5").unwrap(), Node::I8(-5));
        assert_eq!(from_json("90000").unwrap(), Node::U32(90000));
    }
}
