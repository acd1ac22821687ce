//! The graph modality (spec §3.6, §4.5): vertices are ordinary substrate
//! keys; a vertex's value is its adjacency-list encoding (see
//! [`adjacency`]). Like the document modality, graph operations add no
//! storage of their own — every operation is substrate reads and writes.

mod adjacency;
mod engine;

pub use adjacency::{decode as decode_adjacency, encode as encode_adjacency, Adjacency, Neighborship};
pub use engine::{
    DegreeTask, EdgeRemoveTask, EdgeTask, EdgeTriple, GraphEngine, VertexRemoveTask, VertexRole,
};
