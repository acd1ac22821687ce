//! Graph operations (spec §4.5): upsert/remove edges, vertex removal with
//! cascading neighbor cleanup, and degree/edge lookup. Built entirely on
//! [`crate::kv::Database::read`] and [`crate::kv::Database::write`] against
//! the adjacency encoding in [`super::adjacency`] — the graph modality, like
//! the document modality, adds no storage of its own.

use super::adjacency::{self, Adjacency, Neighborship};
use crate::arena::Arena;
use crate::constants::DEGREE_MISSING;
use crate::kv::{Database, EngineCtx};
use crate::request::{bitmap_get, ReadOptions, ReadTask, ReadWant, WriteOptions, WriteTask};
use crate::types::{CollectionId, Key, Result};
use std::collections::{BTreeSet, HashMap};

/// Which side(s) of a vertex's adjacency an operation considers (spec
/// §4.5.3, §4.5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexRole {
    /// Only edges where the vertex is the source.
    Source,
    /// Only edges where the vertex is the target.
    Target,
    /// Both.
    Any,
}

/// One edge upsert task (spec §4.5.1).
#[derive(Debug, Clone, Copy)]
pub struct EdgeTask {
    /// Collection holding the graph.
    pub collection: CollectionId,
    /// Source vertex.
    pub source: Key,
    /// Target vertex.
    pub target: Key,
    /// Edge identifier ([`crate::constants::EDGE_DEFAULT`] for unweighted edges).
    pub edge: Key,
}

/// One edge removal task (spec §4.5.2). `edge: None` removes every
/// neighborship between `source` and `target`, regardless of edge id.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRemoveTask {
    /// Collection holding the graph.
    pub collection: CollectionId,
    /// Source vertex.
    pub source: Key,
    /// Target vertex.
    pub target: Key,
    /// Specific edge to remove, or `None` to remove all matching edges.
    pub edge: Option<Key>,
}

/// One vertex removal task (spec §4.5.3).
#[derive(Debug, Clone, Copy)]
pub struct VertexRemoveTask {
    /// Collection holding the graph.
    pub collection: CollectionId,
    /// Vertex to remove.
    pub vertex: Key,
    /// Which of its neighbor lists to cascade-clean.
    pub role: VertexRole,
}

/// One degree/edge-lookup task (spec §4.5.4).
#[derive(Debug, Clone, Copy)]
pub struct DegreeTask {
    /// Collection holding the graph.
    pub collection: CollectionId,
    /// Vertex to inspect.
    pub vertex: Key,
    /// Which of its neighbor lists to report.
    pub role: VertexRole,
}

/// One materialized edge, as returned by [`GraphEngine::edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTriple {
    /// Source vertex.
    pub source: Key,
    /// Target vertex.
    pub target: Key,
    /// Edge identifier.
    pub edge: Key,
}

/// The graph modality's entry point.
pub struct GraphEngine<'a> {
    db: &'a Database,
}

impl<'a> GraphEngine<'a> {
    /// Build a graph engine over `db`.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Read a vertex's adjacency, or `None` if the vertex is absent (spec
    /// §3.6: "Absent vertex value means the vertex is implicitly absent").
    fn read_adjacency(&self, ctx: &mut EngineCtx<'_>, collection: CollectionId, vertex: Key) -> Result<Option<Adjacency>> {
        let arena = Arena::new();
        let out = self.db.read(
            ctx.as_read(),
            &[ReadTask { collection, key: vertex }],
            ReadWant::all(),
            ReadOptions::default(),
            &arena,
        )?;
        let present = out.presences.map(|p| bitmap_get(p, 0)).unwrap_or(false);
        if !present {
            return Ok(None);
        }
        Ok(Some(adjacency::decode(out.values.unwrap_or(&[]))?))
    }

    fn write_adjacencies(&self, ctx: &mut EngineCtx<'_>, writes: &[(CollectionId, Key, Adjacency)]) -> Result<()> {
        let encoded: Vec<(CollectionId, Key, Vec<u8>)> =
            writes.iter().map(|(c, k, a)| (*c, *k, adjacency::encode(a))).collect();
        let tasks: Vec<WriteTask> =
            encoded.iter().map(|(c, k, v)| WriteTask { collection: *c, key: *k, value: Some(v.as_slice()) }).collect();
        self.db.write(ctx.as_write(), &tasks, WriteOptions::default())
    }

    fn delete_vertex(&self, ctx: &mut EngineCtx<'_>, collection: CollectionId, vertex: Key) -> Result<()> {
        self.db.write(ctx.as_write(), &[WriteTask { collection, key: vertex, value: None }], WriteOptions::default())
    }

    /// Read every vertex touched by `tasks` exactly once (spec §4.5.1 step
    /// 1: "deduplicated; vertices touched more than once are read once per
    /// batch"), defaulting a never-written vertex to the empty adjacency.
    fn read_touched(
        &self,
        ctx: &mut EngineCtx<'_>,
        touches: impl Iterator<Item = (CollectionId, Key)>,
    ) -> Result<(Vec<(CollectionId, Key)>, HashMap<(CollectionId, Key), Adjacency>)> {
        let mut order = Vec::new();
        let mut cache = HashMap::new();
        for ck in touches {
            if !cache.contains_key(&ck) {
                order.push(ck);
                let adj = self.read_adjacency(ctx, ck.0, ck.1)?.unwrap_or_default();
                cache.insert(ck, adj);
            }
        }
        Ok((order, cache))
    }

    /// Upsert edges (spec §4.5.1). Each tuple inserts `(target, edge)` into
    /// `source`'s outgoing list and `(source, edge)` into `target`'s
    /// incoming list, creating either vertex fresh if it didn't exist.
    pub fn upsert_edges(&self, mut ctx: EngineCtx<'_>, tasks: &[EdgeTask]) -> Result<()> {
        let touches = tasks.iter().flat_map(|t| [(t.collection, t.source), (t.collection, t.target)]);
        let (order, mut cache) = self.read_touched(&mut ctx, touches)?;

        for t in tasks {
            cache.get_mut(&(t.collection, t.source)).unwrap().insert_out(Neighborship { neighbor: t.target, edge: t.edge });
            cache.get_mut(&(t.collection, t.target)).unwrap().insert_in(Neighborship { neighbor: t.source, edge: t.edge });
        }

        let writes: Vec<_> = order.iter().map(|ck| (ck.0, ck.1, cache.remove(ck).unwrap())).collect();
        self.write_adjacencies(&mut ctx, &writes)
    }

    /// Remove edges (spec §4.5.2): the dual of [`Self::upsert_edges`].
    /// Writing an empty adjacency back is retained — the vertex itself
    /// still exists until [`Self::remove_vertices`] deletes it.
    pub fn remove_edges(&self, mut ctx: EngineCtx<'_>, tasks: &[EdgeRemoveTask]) -> Result<()> {
        let touches = tasks.iter().flat_map(|t| [(t.collection, t.source), (t.collection, t.target)]);
        let (order, mut cache) = self.read_touched(&mut ctx, touches)?;

        for t in tasks {
            let source_adj = cache.get_mut(&(t.collection, t.source)).unwrap();
            match t.edge {
                Some(edge) => source_adj.remove_out(Neighborship { neighbor: t.target, edge }),
                None => source_adj.remove_out_by_neighbor(t.target),
            }
            let target_adj = cache.get_mut(&(t.collection, t.target)).unwrap();
            match t.edge {
                Some(edge) => target_adj.remove_in(Neighborship { neighbor: t.source, edge }),
                None => target_adj.remove_in_by_neighbor(t.source),
            }
        }

        let writes: Vec<_> = order.iter().map(|ck| (ck.0, ck.1, cache.remove(ck).unwrap())).collect();
        self.write_adjacencies(&mut ctx, &writes)
    }

    /// Remove vertices, cascading the cleanup to every neighbor referenced
    /// in the selected role(s) (spec §4.5.3). Leaves every remaining
    /// vertex's adjacency consistent under I4.
    pub fn remove_vertices(&self, mut ctx: EngineCtx<'_>, tasks: &[VertexRemoveTask]) -> Result<()> {
        for t in tasks {
            let adj = self.read_adjacency(&mut ctx, t.collection, t.vertex)?.unwrap_or_default();
            let consider_out = matches!(t.role, VertexRole::Source | VertexRole::Any);
            let consider_in = matches!(t.role, VertexRole::Target | VertexRole::Any);

            let mut neighbors: BTreeSet<Key> = BTreeSet::new();
            if consider_out {
                neighbors.extend(adj.out.iter().map(|n| n.neighbor));
            }
            if consider_in {
                neighbors.extend(adj.inn.iter().map(|n| n.neighbor));
            }

            let mut writes = Vec::with_capacity(neighbors.len());
            for neighbor in neighbors {
                let mut neighbor_adj = self.read_adjacency(&mut ctx, t.collection, neighbor)?.unwrap_or_default();
                // `t.vertex`'s outgoing edges to `neighbor` live in
                // `neighbor`'s incoming list; its incoming edges from
                // `neighbor` live in `neighbor`'s outgoing list.
                if consider_out {
                    neighbor_adj.remove_in_by_neighbor(t.vertex);
                }
                if consider_in {
                    neighbor_adj.remove_out_by_neighbor(t.vertex);
                }
                writes.push((t.collection, neighbor, neighbor_adj));
            }
            self.write_adjacencies(&mut ctx, &writes)?;
            self.delete_vertex(&mut ctx, t.collection, t.vertex)?;
        }
        Ok(())
    }

    /// Report degrees (spec §4.5.4). A missing vertex reports
    /// [`DEGREE_MISSING`].
    pub fn degrees(&self, mut ctx: EngineCtx<'_>, tasks: &[DegreeTask]) -> Result<Vec<u32>> {
        let mut out = Vec::with_capacity(tasks.len());
        for t in tasks {
            let degree = match self.read_adjacency(&mut ctx, t.collection, t.vertex)? {
                None => DEGREE_MISSING,
                Some(adj) => match t.role {
                    VertexRole::Source => adj.degree_out(),
                    VertexRole::Target => adj.degree_in(),
                    VertexRole::Any => adj.degree_out() + adj.degree_in(),
                },
            };
            out.push(degree);
        }
        Ok(out)
    }

    /// Report concrete edges (spec §4.5.4), row-aligned with `tasks`. A
    /// missing vertex reports an empty edge list.
    pub fn edges(&self, mut ctx: EngineCtx<'_>, tasks: &[DegreeTask]) -> Result<Vec<Vec<EdgeTriple>>> {
        let mut out = Vec::with_capacity(tasks.len());
        for t in tasks {
            let adj = self.read_adjacency(&mut ctx, t.collection, t.vertex)?.unwrap_or_default();
            let mut triples = Vec::new();
            if matches!(t.role, VertexRole::Source | VertexRole::Any) {
                triples.extend(adj.out.iter().map(|n| EdgeTriple { source: t.vertex, target: n.neighbor, edge: n.edge }));
            }
            if matches!(t.role, VertexRole::Target | VertexRole::Any) {
                triples.extend(adj.inn.iter().map(|n| EdgeTriple { source: n.neighbor, target: t.vertex, edge: n.edge }));
            }
            out.push(triples);
        }
        Ok(out)
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
    fn concrete_scenario_four_upsert_then_read_adjacency() {
        let db = db();
        let engine = GraphEngine::new(&db);
        engine
            .upsert_edges(
                EngineCtx::Head,
                &[
                    EdgeTask { collection: 0, source: 1, target: 2, edge: 100 },
                    EdgeTask { collection: 0, source: 1, target: 3, edge: 101 },
                    EdgeTask { collection: 0, source: 2, target: 3, edge: 102 },
                ],
            )
            .unwrap();

        let edges = engine.edges(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 3, role: VertexRole::Any }]).unwrap();
        assert_eq!(
            edges[0],
            vec![
                EdgeTriple { source: 1, target: 3, edge: 101 },
                EdgeTriple { source: 2, target: 3, edge: 102 },
            ]
        );
        let degrees = engine
            .degrees(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 3, role: VertexRole::Target }])
            .unwrap();
        assert_eq!(degrees[0], 2);
    }

    #[test]
    fn concrete_scenario_five_remove_vertex_cascades() {
        let db = db();
        let engine = GraphEngine::new(&db);
        engine
            .upsert_edges(
                EngineCtx::Head,
                &[
                    EdgeTask { collection: 0, source: 1, target: 2, edge: 100 },
                    EdgeTask { collection: 0, source: 1, target: 3, edge: 101 },
                    EdgeTask { collection: 0, source: 2, target: 3, edge: 102 },
                ],
            )
            .unwrap();

        engine
            .remove_vertices(EngineCtx::Head, &[VertexRemoveTask { collection: 0, vertex: 1, role: VertexRole::Any }])
            .unwrap();

        let vertex_one = engine
            .degrees(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 1, role: VertexRole::Any }])
            .unwrap();
        assert_eq!(vertex_one[0], DEGREE_MISSING);

        let three = engine.edges(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 3, role: VertexRole::Target }]).unwrap();
        assert_eq!(three[0], vec![EdgeTriple { source: 2, target: 3, edge: 102 }]);

        let two = engine.edges(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 2, role: VertexRole::Target }]).unwrap();
        assert!(two[0].is_empty());
    }

    #[test]
    fn upsert_then_remove_restores_adjacency_byte_for_byte() {
        let db = db();
        let engine = GraphEngine::new(&db);
        let edge = EdgeTask { collection: 0, source: 1, target: 2, edge: 5 };
        engine.upsert_edges(EngineCtx::Head, &[edge]).unwrap();
        engine
            .remove_edges(EngineCtx::Head, &[EdgeRemoveTask { collection: 0, source: 1, target: 2, edge: Some(5) }])
            .unwrap();

        let degrees = engine
            .degrees(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 1, role: VertexRole::Any }])
            .unwrap();
        assert_eq!(degrees[0], 0);
    }

    #[test]
    fn duplicate_upsert_is_idempotent() {
        let db = db();
        let engine = GraphEngine::new(&db);
        let edge = EdgeTask { collection: 0, source: 1, target: 2, edge: 5 };
        engine.upsert_edges(EngineCtx::Head, &[edge]).unwrap();
        engine.upsert_edges(EngineCtx::Head, &[edge]).unwrap();

        let degrees = engine
            .degrees(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 1, role: VertexRole::Source }])
            .unwrap();
        assert_eq!(degrees[0], 1);
    }

    #[test]
    fn remove_edges_without_edge_id_removes_every_match() {
        let db = db();
        let engine = GraphEngine::new(&db);
        engine
            .upsert_edges(
                EngineCtx::Head,
                &[
                    EdgeTask { collection: 0, source: 1, target: 2, edge: 1 },
                    EdgeTask { collection: 0, source: 1, target: 2, edge: 2 },
                ],
            )
            .unwrap();
        engine
            .remove_edges(EngineCtx::Head, &[EdgeRemoveTask { collection: 0, source: 1, target: 2, edge: None }])
            .unwrap();
        let degrees = engine
            .degrees(EngineCtx::Head, &[DegreeTask { collection: 0, vertex: 1, role: VertexRole::Source }])
            .unwrap();
        assert_eq!(degrees[0], 0);
    }
}
