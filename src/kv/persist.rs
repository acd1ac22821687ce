//! Reference persisted substrate (spec §6): one flat file per collection,
//! `<collection>.kv` (`.kv` for the main collection), holding only live
//! entries — tombstones are never persisted, and reloading resets
//! sequence numbers to zero.

use super::collection::Collection;
use crate::types::Result;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Filename for a collection inside `data_dir`.
pub fn file_name_for(name: Option<&str>) -> String {
    match name {
        Some(n) => format!("{n}.kv"),
        None => ".kv".to_string(),
    }
}

/// Full path for a collection inside `data_dir`.
pub fn path_for(data_dir: &Path, name: Option<&str>) -> PathBuf {
    data_dir.join(file_name_for(name))
}

/// Serialize every live entry of `collection` to `path`:
/// `u32 entry_count` then `entry_count` times `(u64 key, u32 value_length,
/// value bytes)`.
pub fn write_collection(path: &Path, collection: &Collection) -> Result<()> {
    let entries: Vec<(u64, &[u8])> = collection.iter_live().collect();
    let mut buf = Vec::with_capacity(4 + entries.len() * 16);
    buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (key, value) in &entries {
        buf.extend_from_slice(&key.to_le_bytes());
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(value);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(&buf)?;
    Ok(())
}

/// Load a collection file written by [`write_collection`]. Each loaded key
/// is seeded at sequence `0`.
pub fn load_collection(path: &Path) -> Result<Collection> {
    let mut collection = Collection::new();
    if !path.exists() {
        return Ok(collection);
    }
    let mut raw = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut raw)?;
    let mut cursor = 0usize;
    let read_u32 = |raw: &[u8], at: usize| -> Result<u32> {
        raw.get(at..at + 4)
            .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
            .ok_or_else(|| crate::types::StoreError::Corruption {
                collection: 0,
                key: 0,
                reason: "truncated collection file header".into(),
            })
    };
    let entry_count = read_u32(&raw, cursor)?;
    cursor += 4;
    for _ in 0..entry_count {
        let key_bytes = raw.get(cursor..cursor + 8).ok_or_else(|| crate::types::StoreError::Corruption {
            collection: 0,
            key: 0,
            reason: "truncated key".into(),
        })?;
        let key = u64::from_le_bytes(key_bytes.try_into().unwrap());
        cursor += 8;
        let value_len = read_u32(&raw, cursor)? as usize;
        cursor += 4;
        let value = raw
            .get(cursor..cursor + value_len)
            .ok_or_else(|| crate::types::StoreError::Corruption {
                collection: 0,
                key,
                reason: "truncated value".into(),
            })?
            .to_vec();
        cursor += value_len;
        collection.seed_entry(key, value);
    }
    Ok(collection)
}
