//! The adjacency value codec (spec §3.6, §2 item 2 "value codec"): the
//! binary layout stored in a vertex's entry inside a graph collection —
//! two 32-bit little-endian counts followed by the outgoing and then the
//! incoming neighborship lists, each strictly ordered by `(neighbor_id,
//! edge_id)` with no duplicates (spec I4, §8's at-rest invariant).

use crate::constants::ADJACENCY_HEADER_LEN;
use crate::types::{Key, Result, StoreError};

/// A `(neighbor_id, edge_id)` pair in a vertex's adjacency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighborship {
    /// The vertex on the other end of the edge.
    pub neighbor: Key,
    /// The edge identifier (possibly [`crate::constants::EDGE_DEFAULT`]).
    pub edge: Key,
}

/// One vertex's decoded adjacency. An absent vertex value is represented
/// by the caller as `None`, not by this type — `Adjacency::default()` is
/// the *present-but-empty* 8-zero-byte encoding (spec §3.6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    /// Outgoing neighborships: this vertex is the source.
    pub out: Vec<Neighborship>,
    /// Incoming neighborships: this vertex is the target.
    pub inn: Vec<Neighborship>,
}

impl Adjacency {
    /// The empty adjacency (degree 0 in both directions).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Outgoing degree.
    pub fn degree_out(&self) -> u32 {
        self.out.len() as u32
    }

    /// Incoming degree.
    pub fn degree_in(&self) -> u32 {
        self.inn.len() as u32
    }

    /// Insert `n` into the outgoing list, keeping it sorted; a no-op if
    /// already present (spec §4.5.1 step 2: "if already present, leave as-is").
    pub fn insert_out(&mut self, n: Neighborship) {
        insert_sorted(&mut self.out, n);
    }

    /// Insert `n` into the incoming list, keeping it sorted; a no-op if
    /// already present (spec §4.5.1 step 3).
    pub fn insert_in(&mut self, n: Neighborship) {
        insert_sorted(&mut self.inn, n);
    }

    /// Remove the exact neighborship `n` from the outgoing list, if present.
    pub fn remove_out(&mut self, n: Neighborship) {
        self.out.retain(|&x| x != n);
    }

    /// Remove the exact neighborship `n` from the incoming list, if present.
    pub fn remove_in(&mut self, n: Neighborship) {
        self.inn.retain(|&x| x != n);
    }

    /// Remove every outgoing neighborship to `neighbor`, regardless of edge
    /// id (spec §4.5.2: "if edge_id is unspecified, remove all").
    pub fn remove_out_by_neighbor(&mut self, neighbor: Key) {
        self.out.retain(|x| x.neighbor != neighbor);
    }

    /// Remove every incoming neighborship from `neighbor`, regardless of
    /// edge id.
    pub fn remove_in_by_neighbor(&mut self, neighbor: Key) {
        self.inn.retain(|x| x.neighbor != neighbor);
    }
}

fn insert_sorted(list: &mut Vec<Neighborship>, n: Neighborship) {
    match list.binary_search(&n) {
        Ok(_) => {}
        Err(pos) => list.insert(pos, n),
    }
}

/// Encode an adjacency to its substrate value bytes (spec §3.6).
pub fn encode(adj: &Adjacency) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ADJACENCY_HEADER_LEN + (adj.out.len() + adj.inn.len()) * 16);
    buf.extend_from_slice(&(adj.out.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(adj.inn.len() as u32).to_le_bytes());
    for n in &adj.out {
        buf.extend_from_slice(&n.neighbor.to_le_bytes());
        buf.extend_from_slice(&n.edge.to_le_bytes());
    }
    for n in &adj.inn {
        buf.extend_from_slice(&n.neighbor.to_le_bytes());
        buf.extend_from_slice(&n.edge.to_le_bytes());
    }
    buf
}

/// Decode a vertex's stored adjacency bytes, reporting [`StoreError::Corruption`]
/// on a truncated header or a length that doesn't match the declared counts
/// (spec §7: "stored value fails invariant decode").
pub fn decode(bytes: &[u8]) -> Result<Adjacency> {
    if bytes.len() < ADJACENCY_HEADER_LEN {
        return Err(StoreError::Corruption { collection: 0, key: 0, reason: "truncated adjacency header".into() });
    }
    let degree_out = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let degree_in = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let needed = ADJACENCY_HEADER_LEN + (degree_out + degree_in) * 16;
    if bytes.len() != needed {
        return Err(StoreError::Corruption {
            collection: 0,
            key: 0,
            reason: format!("adjacency value is {} bytes, header declares {}", bytes.len(), needed),
        });
    }

    let mut cursor = ADJACENCY_HEADER_LEN;
    let mut read_list = |count: usize| -> Vec<Neighborship> {
        let mut list = Vec::with_capacity(count);
        for _ in 0..count {
            let neighbor = u64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
            let edge = u64::from_le_bytes(bytes[cursor + 8..cursor + 16].try_into().unwrap());
            list.push(Neighborship { neighbor, edge });
            cursor += 16;
        }
        list
    };
    let out = read_list(degree_out);
    let inn = read_list(degree_in);
    Ok(Adjacency { out, inn })
}
