//! Document write/read entry points (spec §4.4.1, §4.4.2): "read substrate
//! bytes, parse, mutate/project, serialize, write substrate bytes" for
//! every document operation, built entirely on [`crate::kv::Database::read`]
//! and [`crate::kv::Database::write`] — the document modality adds no
//! storage of its own.

use super::gather::{gather, ColumnSpec, GatherColumn};
use super::gist::gist;
use super::json;
use super::patch::{self, PatchOp};
use super::path;
use super::value::{self, Node};
use crate::arena::Arena;
use crate::kv::{Database, EngineCtx};
use crate::request::{bitmap_get, ReadOptions, ReadTask, ReadWant, WriteOptions, WriteTask};
use crate::types::{CollectionId, Key, Result, StoreError};
use std::collections::HashMap;

/// Accepted input/output encodings for document operations (spec §3.5):
/// the canonical internal format, plain JSON, and the two write-only patch
/// formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// The canonical internal tree encoding.
    Internal,
    /// Plain JSON.
    Json,
    /// RFC 6902 JSON Patch (write-only; the payload is a patch document,
    /// not the document itself).
    JsonPatch,
    /// RFC 7386 JSON Merge Patch (write-only).
    JsonMergePatch,
}

/// One document write task (spec §4.4.1).
pub struct DocumentWriteTask<'a> {
    /// Collection to write into.
    pub collection: CollectionId,
    /// Key of the document.
    pub key: Key,
    /// Bare name or RFC 6901 pointer to replace a sub-tree; `None` targets
    /// the whole document. Must be `None` for the two patch formats, which
    /// carry their own paths inside the patch body.
    pub field: Option<&'a str>,
    /// Payload bytes: canonical internal bytes, a JSON document, or a JSON
    /// Patch / JSON Merge Patch document, depending on `format`.
    pub payload: &'a [u8],
    /// How to interpret `payload`.
    pub format: DocumentFormat,
}

/// One document read task (spec §4.4.2).
pub struct DocumentReadTask<'a> {
    /// Collection to read from.
    pub collection: CollectionId,
    /// Key of the document.
    pub key: Key,
    /// Bare name or RFC 6901 pointer to project; `None` reads the whole
    /// document.
    pub field: Option<&'a str>,
    /// Requested output encoding: `Internal` or `Json`.
    pub format: DocumentFormat,
}

/// One document read result. `Absent` covers both "no such key" and "the
/// projected field does not exist" — a stored JSON `null` is `Present`
/// (spec §4.4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReadResult {
    /// The key or projected field was not found.
    Absent,
    /// The key/field was found and serialized into the requested format.
    Present(Vec<u8>),
}

/// The document modality's entry point: every operation reads through
/// `ctx`, operates on an in-memory [`Node`] tree, and writes back through
/// the same `ctx`.
pub struct DocumentEngine<'a> {
    db: &'a Database,
}

impl<'a> DocumentEngine<'a> {
    /// Build a document engine over `db`.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn read_doc(&self, ctx: &mut EngineCtx<'_>, collection: CollectionId, key: Key) -> Result<Option<Node>> {
        let arena = Arena::new();
        let out = self.db.read(
            ctx.as_read(),
            &[ReadTask { collection, key }],
            ReadWant::all(),
            ReadOptions::default(),
            &arena,
        )?;
        let present = out.presences.map(|p| bitmap_get(p, 0)).unwrap_or(false);
        if !present {
            return Ok(None);
        }
        let bytes = out.values.unwrap_or(&[]);
        Ok(Some(value::decode(bytes)?))
    }

    fn write_doc(&self, ctx: &mut EngineCtx<'_>, collection: CollectionId, key: Key, node: &Node) -> Result<()> {
        let bytes = value::encode(node);
        self.db.write(
            ctx.as_write(),
            &[WriteTask { collection, key, value: Some(&bytes) }],
            WriteOptions::default(),
        )
    }

    /// Batched write (spec §4.4.1). Repeated `(collection, key)` targets
    /// within the batch are coalesced: the existing document is parsed
    /// once, every task targeting that key mutates the same in-memory
    /// tree in task order, and the tree is serialized and written back
    /// exactly once per key.
    pub fn write(&self, mut ctx: EngineCtx<'_>, tasks: &[DocumentWriteTask<'_>]) -> Result<()> {
        let mut working: HashMap<(CollectionId, Key), Node> = HashMap::new();
        let mut order: Vec<(CollectionId, Key)> = Vec::new();

        for task in tasks {
            let ck = (task.collection, task.key);
            if !working.contains_key(&ck) {
                order.push(ck);
                if task.field.is_none() && task.format == DocumentFormat::Internal {
                    // spec §4.4.1 step 1: forward directly, no read needed.
                    working.insert(ck, value::decode(task.payload)?);
                    continue;
                }
                let existing = self.read_doc(&mut ctx, task.collection, task.key)?.unwrap_or(Node::Null);
                working.insert(ck, existing);
            } else if task.field.is_none() && task.format == DocumentFormat::Internal {
                working.insert(ck, value::decode(task.payload)?);
                continue;
            }

            let current = working.remove(&ck).unwrap();
            let mutated = apply_write(&current, task)?;
            working.insert(ck, mutated);
        }

        for ck in order {
            let node = working.get(&ck).expect("every queued key was written into `working`");
            self.write_doc(&mut ctx, ck.0, ck.1, node)?;
        }
        Ok(())
    }

    /// Batched read (spec §4.4.2).
    pub fn read(&self, mut ctx: EngineCtx<'_>, tasks: &[DocumentReadTask<'_>]) -> Result<Vec<DocumentReadResult>> {
        let mut cache: HashMap<(CollectionId, Key), Option<Node>> = HashMap::new();
        let mut out = Vec::with_capacity(tasks.len());

        for task in tasks {
            if !matches!(task.format, DocumentFormat::Internal | DocumentFormat::Json) {
                return Err(StoreError::ArgsCombo("document reads only accept Internal or Json output format".into()));
            }
            let ck = (task.collection, task.key);
            if !cache.contains_key(&ck) {
                let doc = self.read_doc(&mut ctx, task.collection, task.key)?;
                cache.insert(ck, doc);
            }
            let Some(Some(doc)) = cache.get(&ck) else {
                out.push(DocumentReadResult::Absent);
                continue;
            };

            let projected = match task.field {
                Some(field) => {
                    let segments = path::parse(field)?;
                    path::get(doc, &segments)
                }
                None => Some(doc),
            };
            let Some(projected) = projected else {
                out.push(DocumentReadResult::Absent);
                continue;
            };

            let bytes = match task.format {
                DocumentFormat::Internal => value::encode(projected),
                DocumentFormat::Json => json::to_json(projected)?.into_bytes(),
                _ => unreachable!("checked above"),
            };
            out.push(DocumentReadResult::Present(bytes));
        }
        Ok(out)
    }

    /// Gist across the documents at `refs` (spec §4.4.3). Keys with no
    /// stored document simply contribute no paths.
    pub fn gist(&self, mut ctx: EngineCtx<'_>, refs: &[(CollectionId, Key)]) -> Result<Vec<String>> {
        let mut docs = Vec::with_capacity(refs.len());
        for &(collection, key) in refs {
            if let Some(doc) = self.read_doc(&mut ctx, collection, key)? {
                docs.push(doc);
            }
        }
        Ok(gist(&docs))
    }

    /// Gather across the documents at `refs` (spec §4.4.4). A key with no
    /// stored document projects as if every field were missing (`Node::Null`).
    pub fn gather(&self, mut ctx: EngineCtx<'_>, refs: &[(CollectionId, Key)], headers: &[ColumnSpec]) -> Result<Vec<GatherColumn>> {
        let mut docs = Vec::with_capacity(refs.len());
        for &(collection, key) in refs {
            docs.push(self.read_doc(&mut ctx, collection, key)?.unwrap_or(Node::Null));
        }
        Ok(gather(&docs, headers))
    }
}

fn non_empty_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| StoreError::ArgsWrong(format!("payload is not valid UTF-8: {e}")))
}

fn apply_write(current: &Node, task: &DocumentWriteTask<'_>) -> Result<Node> {
    match task.format {
        DocumentFormat::Internal => {
            let payload = value::decode(task.payload)?;
            match task.field {
                Some(field) => patch::replace_at(current, field, payload),
                None => Ok(payload),
            }
        }
        DocumentFormat::Json => {
            let payload = json::from_json(non_empty_utf8(task.payload)?)?;
            match task.field {
                Some(field) => patch::replace_at(current, field, payload),
                None => Ok(payload),
            }
        }
        DocumentFormat::JsonPatch => {
            if task.field.is_some() {
                return Err(StoreError::ArgsCombo(
                    "JSON Patch carries its own paths; a field projection on the write task is invalid".into(),
                ));
            }
            let ops: Vec<PatchOp> = serde_json::from_str(non_empty_utf8(task.payload)?).map_err(StoreError::from)?;
            patch::apply_json_patch(current, &ops)
        }
        DocumentFormat::JsonMergePatch => {
            if task.field.is_some() {
                return Err(StoreError::ArgsCombo(
                    "JSON Merge Patch carries its own paths; a field projection on the write task is invalid".into(),
                ));
            }
            let patch_node = json::from_json(non_empty_utf8(task.payload)?)?;
            Ok(patch::apply_merge_patch(current, &patch_node))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::kv::Database;

    fn db() -> Database {
        Database::open(Config::default()).unwrap()
    }

    #[test]
    fn write_whole_document_then_read_it_back() {
        let db = db();
        let engine = DocumentEngine::new(&db);
        let payload = br#"{"a":{"b":1,"c":"3.5"}}"#;
        engine
            .write(
                EngineCtx::Head,
                &[DocumentWriteTask { collection: 0, key: 5, field: None, payload, format: DocumentFormat::Json }],
            )
            .unwrap();

        let out = engine
            .read(EngineCtx::Head, &[DocumentReadTask { collection: 0, key: 5, field: Some("/a/b"), format: DocumentFormat::Json }])
            .unwrap();
        assert_eq!(out, vec![DocumentReadResult::Present(b"1".to_vec())]);
    }

    #[test]
    fn missing_field_is_absent_but_stored_null_is_present() {
        let db = db();
        let engine = DocumentEngine::new(&db);
        engine
            .write(
                EngineCtx::Head,
                &[DocumentWriteTask { collection: 0, key: 1, field: None, payload: br#"{"a":null}"#, format: DocumentFormat::Json }],
            )
            .unwrap();

        let out = engine
            .read(
                EngineCtx::Head,
                &[
                    DocumentReadTask { collection: 0, key: 1, field: Some("/a"), format: DocumentFormat::Json },
                    DocumentReadTask { collection: 0, key: 1, field: Some("/missing"), format: DocumentFormat::Json },
                ],
            )
            .unwrap();
        assert_eq!(out[0], DocumentReadResult::Present(b"null".to_vec()));
        assert_eq!(out[1], DocumentReadResult::Absent);
    }

    #[test]
    fn json_patch_write_applies_in_place() {
        let db = db();
        let engine = DocumentEngine::new(&db);
        engine
            .write(
                EngineCtx::Head,
                &[DocumentWriteTask { collection: 0, key: 1, field: None, payload: br#"{"a":1}"#, format: DocumentFormat::Json }],
            )
            .unwrap();
        engine
            .write(
                EngineCtx::Head,
                &[DocumentWriteTask {
                    collection: 0,
                    key: 1,
                    field: None,
                    payload: br#"[{"op":"add","path":"/b","value":2}]"#,
                    format: DocumentFormat::JsonPatch,
                }],
            )
            .unwrap();

        let out = engine
            .read(EngineCtx::Head, &[DocumentReadTask { collection: 0, key: 1, field: None, format: DocumentFormat::Json }])
            .unwrap();
        let DocumentReadResult::Present(bytes) = &out[0] else { panic!("expected present") };
        let node = json::from_json(std::str::from_utf8(bytes).unwrap()).unwrap();
        assert_eq!(node.field("a"), Some(&Node::U8(1)));
        assert_eq!(node.field("b"), Some(&Node::U8(2)));
    }

    #[test]
    fn repeated_key_in_one_batch_coalesces() {
        let db = db();
        let engine = DocumentEngine::new(&db);
        engine
            .write(
                EngineCtx::Head,
                &[
                    DocumentWriteTask { collection: 0, key: 1, field: Some("a"), payload: b"1", format: DocumentFormat::Json },
                    DocumentWriteTask { collection: 0, key: 1, field: Some("b"), payload: b"2", format: DocumentFormat::Json },
                ],
            )
            .unwrap();

        let out = engine
            .read(EngineCtx::Head, &[DocumentReadTask { collection: 0, key: 1, field: None, format: DocumentFormat::Json }])
            .unwrap();
        let DocumentReadResult::Present(bytes) = &out[0] else { panic!("expected present") };
        let node = json::from_json(std::str::from_utf8(bytes).unwrap()).unwrap();
        assert_eq!(node.field("a"), Some(&Node::U8(1)));
        assert_eq!(node.field("b"), Some(&Node::U8(2)));
    }

    #[test]
    fn absent_key_reads_absent() {
        let db = db();
        let engine = DocumentEngine::new(&db);
        let out = engine
            .read(EngineCtx::Head, &[DocumentReadTask { collection: 0, key: 999, field: None, format: DocumentFormat::Internal }])
            .unwrap();
        assert_eq!(out, vec![DocumentReadResult::Absent]);
    }
}
