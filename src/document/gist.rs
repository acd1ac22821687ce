//! Gist: the sorted distinct set of field paths appearing across a batch of
//! documents (spec §4.4.3), grounded on the original `ukv_docs_gist`'s
//! two-pass collect-then-sort-and-dedup approach (see SPEC_FULL.md).

use super::path::{self, Segment};
use super::value::Node;
use std::collections::BTreeSet;

/// Every RFC 6901 pointer path reachable inside `doc`, including array
/// indices, but not the root path itself.
fn collect_paths(node: &Node, prefix: &mut Vec<Segment>, out: &mut BTreeSet<String>) {
    match node {
        Node::Object(fields) => {
            for (key, value) in fields {
                prefix.push(Segment::Key(key.clone()));
                out.insert(path::to_pointer(prefix));
                collect_paths(value, prefix, out);
                prefix.pop();
            }
        }
        Node::Array(items) => {
            for (i, value) in items.iter().enumerate() {
                prefix.push(Segment::Index(i));
                out.insert(path::to_pointer(prefix));
                collect_paths(value, prefix, out);
                prefix.pop();
            }
        }
        _ => {}
    }
}

/// Compute the sorted distinct set of field paths across `documents`.
pub fn gist(documents: &[Node]) -> Vec<String> {
    let mut paths = BTreeSet::new();
    for doc in documents {
        let mut prefix = Vec::new();
        collect_paths(doc, &mut prefix, &mut paths);
    }
    paths.into_iter().collect()
}

/// Pack a gist result as null-terminated strings with an offset array (spec
/// §4.4.3: "concatenated null-terminated strings with offsets").
pub fn pack(paths: &[String]) -> (Vec<u32>, Vec<u8>) {
    let mut offsets = Vec::with_capacity(paths.len() + 1);
    let mut bytes = Vec::new();
    offsets.push(0u32);
    for p in paths {
        bytes.extend_from_slice(p.as_bytes());
        bytes.push(0);
        offsets.push(bytes.len() as u32);
    }
    (offsets, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_sorted_distinct_paths() {
        let d1 = Node::Object(vec![("a".to_string(), Node::I32(1))]);
        let d2 = Node::Object(vec![(
            "a".to_string(),
            Node::Object(vec![("b".to_string(), Node::I32(2))]),
        )]);
        let d3 = Node::Object(vec![("arr".to_string(), Node::Array(vec![Node::I32(1), Node::I32(2)]))]);
        let paths = gist(&[d1, d2, d3]);
        assert_eq!(paths, vec!["/a", "/a/b", "/arr", "/arr/0", "/arr/1"]);
    }

    #[test]
    fn pack_null_terminates_and_offsets_match() {
        let paths = vec!["/a".to_string(), "/b".to_string()];
        let (offsets, bytes) = pack(&paths);
        assert_eq!(offsets, vec![0, 3, 6]);
        assert_eq!(bytes, b"/a\0/b\0");
    }
}
