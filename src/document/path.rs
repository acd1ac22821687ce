//! Field-path addressing (spec §3.5): a bare name addresses a child of the
//! root object; a leading `/` addresses an RFC 6901 JSON Pointer, including
//! array indices and the `-` "end of array" marker used by JSON Patch
//! `add`.

use super::value::Node;
use crate::types::{Result, StoreError};

/// One step of a parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// The RFC 6902 `-` marker: "one past the last element of the array".
    ArrayEnd,
}

/// Parse a field expression into path segments. An empty string addresses
/// the whole document (no segments).
pub fn parse(field: &str) -> Result<Vec<Segment>> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = field.strip_prefix('/') else {
        return Ok(vec![Segment::Key(field.to_string())]);
    };
    if rest.is_empty() {
        // "/" addresses the object field named "".
        return Ok(vec![Segment::Key(String::new())]);
    }
    rest.split('/')
        .map(|raw| {
            let unescaped = raw.replace("~1", "/").replace("~0", "~");
            Ok(if unescaped == "-" {
                Segment::ArrayEnd
            } else if let Ok(index) = unescaped.parse::<usize>() {
                Segment::Index(index)
            } else {
                Segment::Key(unescaped)
            })
        })
        .collect()
}

/// Re-render path segments as an RFC 6901 pointer string, for gist output.
pub fn to_pointer(path: &[Segment]) -> String {
    let mut out = String::new();
    for seg in path {
        out.push('/');
        match seg {
            Segment::Key(k) => out.push_str(&k.replace('~', "~0").replace('/', "~1")),
            Segment::Index(i) => out.push_str(&i.to_string()),
            Segment::ArrayEnd => out.push('-'),
        }
    }
    out
}

/// Look up `path` inside `node`. Returns `None` if any step is missing or
/// type-mismatched.
pub fn get<'a>(node: &'a Node, path: &[Segment]) -> Option<&'a Node> {
    let mut cur = node;
    for seg in path {
        cur = match (seg, cur) {
            (Segment::Key(k), Node::Object(fields)) => &fields.iter().find(|(key, _)| key == k)?.1,
            (Segment::Index(i), Node::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Replace (or create, including intermediate objects) the sub-tree at
/// `path`, used by the "replace sub-tree at field" write mode (spec
/// §4.4.1).
pub fn set(node: &mut Node, path: &[Segment], value: Node) -> Result<()> {
    let Some((last, init)) = path.split_last() else {
        *node = value;
        return Ok(());
    };
    let mut cur = node;
    for seg in init {
        cur = match seg {
            Segment::Key(k) => {
                if !matches!(cur, Node::Object(_)) {
                    *cur = Node::Object(Vec::new());
                }
                let Node::Object(fields) = cur else { unreachable!() };
                if !fields.iter().any(|(key, _)| key == k) {
                    fields.push((k.clone(), Node::Null));
                }
                &mut fields.iter_mut().find(|(key, _)| key == k).unwrap().1
            }
            Segment::Index(i) => {
                let Node::Array(items) = cur else {
                    return Err(StoreError::ArgsWrong("path traverses a non-array with an index segment".into()));
                };
                items.get_mut(*i).ok_or_else(|| StoreError::ArgsWrong(format!("array index {i} out of bounds")))?
            }
            Segment::ArrayEnd => {
                return Err(StoreError::ArgsWrong("'-' is only valid as the final path segment".into()));
            }
        };
    }
    match last {
        Segment::Key(k) => {
            if !matches!(cur, Node::Object(_)) {
                *cur = Node::Object(Vec::new());
            }
            cur.set_field(k, value);
        }
        Segment::Index(i) => match cur {
            Node::Array(items) if *i < items.len() => items[*i] = value,
            Node::Array(items) if *i == items.len() => items.push(value),
            Node::Array(_) => return Err(StoreError::ArgsWrong(format!("array index {i} out of bounds"))),
            _ => return Err(StoreError::ArgsWrong("path's final segment is an index into a non-array".into())),
        },
        Segment::ArrayEnd => match cur {
            Node::Array(items) => items.push(value),
            _ => return Err(StoreError::ArgsWrong("'-' used on a non-array".into())),
        },
    }
    Ok(())
}

/// Insert `value` at `path`, used by JSON-Patch `add` (spec §4.4.2): unlike
/// `set`, an array-index final segment shifts subsequent elements right
/// instead of overwriting them. Every other final segment (object field,
/// `-`) behaves exactly as `set` does.
pub fn insert(node: &mut Node, path: &[Segment], value: Node) -> Result<()> {
    let Some((last, init)) = path.split_last() else {
        *node = value;
        return Ok(());
    };
    let mut cur = node;
    for seg in init {
        cur = match seg {
            Segment::Key(k) => {
                if !matches!(cur, Node::Object(_)) {
                    *cur = Node::Object(Vec::new());
                }
                let Node::Object(fields) = cur else { unreachable!() };
                if !fields.iter().any(|(key, _)| key == k) {
                    fields.push((k.clone(), Node::Null));
                }
                &mut fields.iter_mut().find(|(key, _)| key == k).unwrap().1
            }
            Segment::Index(i) => {
                let Node::Array(items) = cur else {
                    return Err(StoreError::ArgsWrong("path traverses a non-array with an index segment".into()));
                };
                items.get_mut(*i).ok_or_else(|| StoreError::ArgsWrong(format!("array index {i} out of bounds")))?
            }
            Segment::ArrayEnd => {
                return Err(StoreError::ArgsWrong("'-' is only valid as the final path segment".into()));
            }
        };
    }
    match last {
        Segment::Key(k) => {
            if !matches!(cur, Node::Object(_)) {
                *cur = Node::Object(Vec::new());
            }
            cur.set_field(k, value);
        }
        Segment::Index(i) => match cur {
            Node::Array(items) if *i <= items.len() => items.insert(*i, value),
            Node::Array(_) => return Err(StoreError::ArgsWrong(format!("array index {i} out of bounds"))),
            _ => return Err(StoreError::ArgsWrong("path's final segment is an index into a non-array".into())),
        },
        Segment::ArrayEnd => match cur {
            Node::Array(items) => items.push(value),
            _ => return Err(StoreError::ArgsWrong("'-' used on a non-array".into())),
        },
    }
    Ok(())
}

/// Remove and return the sub-tree at `path`.
pub fn remove(node: &mut Node, path: &[Segment]) -> Result<Node> {
    let Some((last, init)) = path.split_last() else {
        return Ok(std::mem::replace(node, Node::Null));
    };
    let mut cur = node;
    for seg in init {
        cur = match seg {
            Segment::Key(k) => match cur {
                Node::Object(fields) => {
                    &mut fields.iter_mut().find(|(key, _)| key == k).ok_or_else(|| {
                        StoreError::ArgsWrong(format!("no such field: {k}"))
                    })?.1
                }
                _ => return Err(StoreError::ArgsWrong("path traverses a non-object".into())),
            },
            Segment::Index(i) => match cur {
                Node::Array(items) => {
                    items.get_mut(*i).ok_or_else(|| StoreError::ArgsWrong(format!("array index {i} out of bounds")))?
                }
                _ => return Err(StoreError::ArgsWrong("path traverses a non-array".into())),
            },
            Segment::ArrayEnd => return Err(StoreError::ArgsWrong("'-' is only valid as the final path segment".into())),
        };
    }
    match last {
        Segment::Key(k) => match cur {
            Node::Object(fields) => {
                let idx = fields.iter().position(|(key, _)| key == k).ok_or_else(|| {
                    StoreError::ArgsWrong(format!("no such field: {k}"))
                })?;
                Ok(fields.remove(idx).1)
            }
            _ => Err(StoreError::ArgsWrong("path's final segment addresses a field of a non-object".into())),
        },
        Segment::Index(i) => match cur {
            Node::Array(items) if *i < items.len() => Ok(items.remove(*i)),
            Node::Array(_) => Err(StoreError::ArgsWrong(format!("array index {i} out of bounds"))),
            _ => Err(StoreError::ArgsWrong("path's final segment is an index into a non-array".into())),
        },
        Segment::ArrayEnd => Err(StoreError::ArgsWrong("'-' is not removable".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::Object(vec![(
            "a".to_string(),
            Node::Object(vec![("b".to_string(), Node::I32(1)), ("c".to_string(), Node::String("3.5".to_string()))]),
        )])
    }

    #[test]
    fn parses_bare_name_as_root_child() {
        assert_eq!(parse("widgets").unwrap(), vec![Segment::Key("widgets".to_string())]);
    }

    #[test]
    fn parses_json_pointer_with_escapes() {
        let path = parse("/a~1b/0/c~0d").unwrap();
        assert_eq!(path, vec![Segment::Key("a/b".to_string()), Segment::Index(0), Segment::Key("c~d".to_string())]);
    }

    #[test]
    fn get_resolves_nested_path() {
        let doc = sample();
        let path = parse("/a/b").unwrap();
        assert_eq!(get(&doc, &path), Some(&Node::I32(1)));
    }

    #[test]
    fn set_creates_missing_intermediate_objects() {
        let mut doc = Node::Null;
        set(&mut doc, &parse("/a/b").unwrap(), Node::I32(7)).unwrap();
        assert_eq!(get(&doc, &parse("/a/b").unwrap()), Some(&Node::I32(7)));
    }

    #[test]
    fn array_end_appends() {
        let mut doc = Node::Array(vec![Node::I32(1)]);
        set(&mut doc, &parse("/-").unwrap(), Node::I32(2)).unwrap();
        assert_eq!(doc, Node::Array(vec![Node::I32(1), Node::I32(2)]));
    }

    #[test]
    fn insert_shifts_subsequent_elements() {
        let mut doc = Node::Array(vec![Node::I32(1), Node::I32(2), Node::I32(3)]);
        insert(&mut doc, &parse("/1").unwrap(), Node::I32(9)).unwrap();
        assert_eq!(doc, Node::Array(vec![Node::I32(1), Node::I32(9), Node::I32(2), Node::I32(3)]));
    }

    #[test]
    fn set_overwrites_instead_of_shifting() {
        let mut doc = Node::Array(vec![Node::I32(1), Node::I32(2), Node::I32(3)]);
        set(&mut doc, &parse("/1").unwrap(), Node::I32(9)).unwrap();
        assert_eq!(doc, Node::Array(vec![Node::I32(1), Node::I32(9), Node::I32(3)]));
    }

    #[test]
    fn remove_takes_field_out() {
        let mut doc = sample();
        let removed = remove(&mut doc, &parse("/a/b").unwrap()).unwrap();
        assert_eq!(removed, Node::I32(1));
        assert_eq!(get(&doc, &parse("/a/b").unwrap()), None);
    }
}
