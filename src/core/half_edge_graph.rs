//! The half-edge arena: vertices, directed edge pairs, and faces.
//!
//! The diagram's planar subdivision is inherently cyclic (twin and next
//! references, face back-references), so it is stored as flat slotmap arenas
//! with typed keys instead of owned links. Handles stay valid across
//! unrelated insertions and deletions elsewhere; a deleted element's key
//! simply stops resolving.
//!
//! The graph maintains a per-vertex list of outgoing half-edges so adjacency
//! queries (neighbors, incident faces) are O(degree). Topological surgery is
//! expressed through a small set of primitives:
//!
//! - [`HalfEdgeGraph::add_twin_edges`] — edges only ever exist in twin pairs;
//! - [`HalfEdgeGraph::add_vertex_in_edge`] — split a pair at a vertex,
//!   subdividing the parametric curves;
//! - [`HalfEdgeGraph::merge_edges_at`] — the inverse, removing a degree-2
//!   vertex;
//! - [`HalfEdgeGraph::delete_vertex`] — remove a vertex and every incident
//!   pair (the caller must have spliced the surviving cycles first).

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use thiserror::Error;

use super::collections::{SmallBuffer, VERTEX_DEGREE_BUFFER_SIZE};
use super::edge::{EdgeCurve, HalfEdge};
use super::face::{Face, FaceStatus};
use super::vertex::{VertexKind, VertexStatus, VoronoiVertex};
use crate::geometry::point::Point;
use crate::geometry::site::Site;

new_key_type! {
    /// Stable handle to a vertex in the graph arena.
    pub struct VertexKey;
}

new_key_type! {
    /// Stable handle to a half-edge in the graph arena.
    pub struct EdgeKey;
}

new_key_type! {
    /// Stable handle to a face in the graph arena.
    pub struct FaceKey;
}

/// Errors from graph surgery primitives.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A next-pointer walk did not return to its starting edge.
    #[error("half-edge cycle through {edge:?} does not close")]
    UnclosedCycle {
        /// The edge whose cycle walk failed.
        edge: EdgeKey,
    },
    /// A merge was requested at a vertex that is not a plain degree-2
    /// subdivision point.
    #[error("vertex {vertex:?} cannot be merged away (degree {degree})")]
    NotMergeable {
        /// The vertex that was to be removed.
        vertex: VertexKey,
        /// Its actual degree.
        degree: usize,
    },
    /// The curves meeting at a merge vertex do not form one curve.
    #[error("curves at {vertex:?} do not join")]
    CurveJoinFailed {
        /// The vertex whose flanking curves were incompatible.
        vertex: VertexKey,
    },
}

/// Arena-backed half-edge planar subdivision.
#[derive(Clone, Debug, Default)]
pub struct HalfEdgeGraph {
    vertices: SlotMap<VertexKey, VoronoiVertex>,
    edges: SlotMap<EdgeKey, HalfEdge>,
    faces: SlotMap<FaceKey, Face>,
    out_edges: SecondaryMap<VertexKey, SmallBuffer<EdgeKey, VERTEX_DEGREE_BUFFER_SIZE>>,
    next_vertex_index: u32,
}

impl HalfEdgeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    /// Adds a vertex, assigning the next monotonic index.
    pub fn add_vertex(
        &mut self,
        position: Point,
        clearance: f64,
        status: VertexStatus,
        kind: VertexKind,
    ) -> VertexKey {
        let index = self.next_vertex_index;
        self.next_vertex_index += 1;
        let key = self.vertices.insert(VoronoiVertex {
            position,
            clearance,
            status,
            kind,
            index,
        });
        self.out_edges.insert(key, SmallBuffer::new());
        key
    }

    /// Adds a face for `site` with no boundary edge yet.
    pub fn add_face(&mut self, site: Site) -> FaceKey {
        self.faces.insert(Face {
            edge: EdgeKey::default(),
            site,
            status: FaceStatus::Nonincident,
        })
    }

    /// Creates a twin pair of half-edges from `src` to `trg`.
    ///
    /// `curve` is the geometry from `src` to `trg`; the twin stores the
    /// reversed curve. Next pointers are left unlinked for the caller to
    /// splice. Returns `(forward, reverse)`.
    pub fn add_twin_edges(
        &mut self,
        src: VertexKey,
        trg: VertexKey,
        curve: EdgeCurve,
        face_fwd: Option<FaceKey>,
        face_rev: Option<FaceKey>,
    ) -> (EdgeKey, EdgeKey) {
        let reversed = curve.reversed();
        let fwd = self.edges.insert(HalfEdge {
            source: src,
            twin: EdgeKey::default(),
            next: EdgeKey::default(),
            face: face_fwd,
            curve,
        });
        let rev = self.edges.insert(HalfEdge {
            source: trg,
            twin: fwd,
            next: EdgeKey::default(),
            face: face_rev,
            curve: reversed,
        });
        self.edges[fwd].twin = rev;
        self.out_edges[src].push(fwd);
        self.out_edges[trg].push(rev);
        (fwd, rev)
    }

    // =========================================================================
    // ACCESS
    // =========================================================================

    /// Vertex payload. Panics if the handle is stale.
    #[must_use]
    pub fn vertex(&self, v: VertexKey) -> &VoronoiVertex {
        &self.vertices[v]
    }

    /// Mutable vertex payload. Panics if the handle is stale.
    pub fn vertex_mut(&mut self, v: VertexKey) -> &mut VoronoiVertex {
        &mut self.vertices[v]
    }

    /// Vertex payload, or `None` for a stale handle.
    #[must_use]
    pub fn try_vertex(&self, v: VertexKey) -> Option<&VoronoiVertex> {
        self.vertices.get(v)
    }

    /// Half-edge payload. Panics if the handle is stale.
    #[must_use]
    pub fn edge(&self, e: EdgeKey) -> &HalfEdge {
        &self.edges[e]
    }

    /// Mutable half-edge payload. Panics if the handle is stale.
    pub fn edge_mut(&mut self, e: EdgeKey) -> &mut HalfEdge {
        &mut self.edges[e]
    }

    /// Half-edge payload, or `None` for a stale handle.
    #[must_use]
    pub fn try_edge(&self, e: EdgeKey) -> Option<&HalfEdge> {
        self.edges.get(e)
    }

    /// Face payload. Panics if the handle is stale.
    #[must_use]
    pub fn face(&self, f: FaceKey) -> &Face {
        &self.faces[f]
    }

    /// Mutable face payload. Panics if the handle is stale.
    pub fn face_mut(&mut self, f: FaceKey) -> &mut Face {
        &mut self.faces[f]
    }

    /// Face payload, or `None` for a stale handle.
    #[must_use]
    pub fn try_face(&self, f: FaceKey) -> Option<&Face> {
        self.faces.get(f)
    }

    /// Whether `v` still resolves.
    #[must_use]
    pub fn contains_vertex(&self, v: VertexKey) -> bool {
        self.vertices.contains_key(v)
    }

    /// Whether `e` still resolves.
    #[must_use]
    pub fn contains_edge(&self, e: EdgeKey) -> bool {
        self.edges.contains_key(e)
    }

    /// Source vertex of a half-edge.
    #[must_use]
    pub fn source(&self, e: EdgeKey) -> VertexKey {
        self.edges[e].source
    }

    /// Target vertex of a half-edge (the twin's source).
    #[must_use]
    pub fn target(&self, e: EdgeKey) -> VertexKey {
        self.edges[self.edges[e].twin].source
    }

    /// Twin of a half-edge.
    #[must_use]
    pub fn twin(&self, e: EdgeKey) -> EdgeKey {
        self.edges[e].twin
    }

    /// Next half-edge around the owning face.
    #[must_use]
    pub fn next(&self, e: EdgeKey) -> EdgeKey {
        self.edges[e].next
    }

    /// Points `e`'s next pointer at `n`.
    pub fn set_next(&mut self, e: EdgeKey, n: EdgeKey) {
        self.edges[e].next = n;
    }

    /// Iterates all vertices.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &VoronoiVertex)> {
        self.vertices.iter()
    }

    /// Iterates all half-edges.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &HalfEdge)> {
        self.edges.iter()
    }

    /// Iterates all faces.
    pub fn faces(&self) -> impl Iterator<Item = (FaceKey, &Face)> {
        self.faces.iter()
    }

    /// Number of vertices, including isolated point-site markers.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of half-edges (twice the number of edge pairs).
    #[must_use]
    pub fn num_half_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of faces (the unbounded outer region is not a face).
    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    // =========================================================================
    // ADJACENCY
    // =========================================================================

    /// Outgoing half-edges of `v`.
    #[must_use]
    pub fn vertex_out_edges(&self, v: VertexKey) -> &[EdgeKey] {
        self.out_edges.get(v).map_or(&[], |buf| buf.as_slice())
    }

    /// Degree of `v` (number of incident edge pairs).
    #[must_use]
    pub fn vertex_degree(&self, v: VertexKey) -> usize {
        self.vertex_out_edges(v).len()
    }

    /// Vertices connected to `v` by an edge pair.
    #[must_use]
    pub fn neighbors(&self, v: VertexKey) -> SmallBuffer<VertexKey, VERTEX_DEGREE_BUFFER_SIZE> {
        self.vertex_out_edges(v)
            .iter()
            .map(|&e| self.target(e))
            .collect()
    }

    /// Faces incident to `v`, deduplicated; the unbounded outer region is
    /// skipped.
    #[must_use]
    pub fn vertex_faces(&self, v: VertexKey) -> SmallBuffer<FaceKey, VERTEX_DEGREE_BUFFER_SIZE> {
        let mut faces = SmallBuffer::new();
        for &e in self.vertex_out_edges(v) {
            for key in [self.edges[e].face, self.edges[self.edges[e].twin].face] {
                if let Some(f) = key {
                    if !faces.contains(&f) {
                        faces.push(f);
                    }
                }
            }
        }
        faces
    }

    /// Iterates the boundary cycle of `f`, starting at its stored edge.
    ///
    /// The walk is bounded by the total edge count, so a corrupted cycle
    /// terminates instead of looping; the checker reports the corruption.
    #[must_use]
    pub fn face_edges(&self, f: FaceKey) -> FaceEdgeIter<'_> {
        let start = self.faces[f].edge;
        FaceEdgeIter {
            graph: self,
            start,
            current: self.edges.contains_key(start).then_some(start),
            steps: 0,
        }
    }

    /// Source vertices along the boundary cycle of `f`.
    pub fn face_vertices(&self, f: FaceKey) -> impl Iterator<Item = VertexKey> + '_ {
        self.face_edges(f).map(|e| self.source(e))
    }

    /// The edge whose next pointer is `e`, found by walking `e`'s cycle.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnclosedCycle`] when the walk does not return to `e`.
    pub fn previous_edge(&self, e: EdgeKey) -> Result<EdgeKey, GraphError> {
        let mut current = e;
        for _ in 0..=self.edges.len() {
            let next = self.edges[current].next;
            if next == e {
                return Ok(current);
            }
            if !self.edges.contains_key(next) {
                break;
            }
            current = next;
        }
        Err(GraphError::UnclosedCycle { edge: e })
    }

    // =========================================================================
    // SURGERY
    // =========================================================================

    /// Splits the edge pair of `e` at vertex `v`, placed at curve parameter
    /// `t`. Both half-edge cycles are re-spliced locally and the parametric
    /// curves subdivided. Returns the two new half-edges leaving `v`:
    /// `(continuation of e's cycle, continuation of the twin's cycle)`.
    pub fn add_vertex_in_edge(
        &mut self,
        v: VertexKey,
        e: EdgeKey,
        t: f64,
    ) -> (EdgeKey, EdgeKey) {
        let tw = self.edges[e].twin;
        let (c1, c2) = self.edges[e].curve.split_at(t);
        let trg = self.edges[tw].source;
        let face_f = self.edges[e].face;
        let face_g = self.edges[tw].face;
        let e_next = self.edges[e].next;
        let tw_next = self.edges[tw].next;

        let e2 = self.edges.insert(HalfEdge {
            source: v,
            twin: tw,
            next: e_next,
            face: face_f,
            curve: c2.clone(),
        });
        let tw2 = self.edges.insert(HalfEdge {
            source: v,
            twin: e,
            next: tw_next,
            face: face_g,
            curve: c1.reversed(),
        });

        {
            let head = &mut self.edges[e];
            head.curve = c1;
            head.next = e2;
            head.twin = tw2;
        }
        {
            let head = &mut self.edges[tw];
            head.curve = c2.reversed();
            head.next = tw2;
            head.twin = e2;
        }

        self.out_edges[v].push(e2);
        self.out_edges[v].push(tw2);
        debug_assert_eq!(self.target(e), v);
        debug_assert_eq!(self.target(e2), trg);
        (e2, tw2)
    }

    /// Removes a degree-2 vertex by fusing its two flanking edge pairs back
    /// into one, rejoining the subdivided curves.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotMergeable`] when the vertex degree is not 2 or the
    /// cycles through it are inconsistent, [`GraphError::CurveJoinFailed`]
    /// when the flanking curves are not two halves of one curve.
    pub fn merge_edges_at(&mut self, v: VertexKey) -> Result<(), GraphError> {
        let out: SmallBuffer<EdgeKey, VERTEX_DEGREE_BUFFER_SIZE> =
            self.vertex_out_edges(v).iter().copied().collect();
        if out.len() != 2 {
            return Err(GraphError::NotMergeable {
                vertex: v,
                degree: out.len(),
            });
        }
        let (mut a, mut b) = (out[0], out[1]);
        // orient so that twin(a) -> b is a cycle continuation through v
        if self.edges[self.edges[a].twin].next != b {
            std::mem::swap(&mut a, &mut b);
        }
        let ein = self.edges[a].twin;
        let tb = self.edges[b].twin;
        if self.edges[ein].next != b || self.edges[tb].next != a {
            return Err(GraphError::NotMergeable { vertex: v, degree: 2 });
        }

        let joined = self.edges[ein]
            .curve
            .join(&self.edges[b].curve)
            .ok_or(GraphError::CurveJoinFailed { vertex: v })?;
        let joined_rev = self.edges[tb]
            .curve
            .join(&self.edges[a].curve)
            .ok_or(GraphError::CurveJoinFailed { vertex: v })?;

        let b_next = self.edges[b].next;
        let a_next = self.edges[a].next;
        {
            let head = &mut self.edges[ein];
            head.curve = joined;
            head.next = b_next;
            head.twin = tb;
        }
        {
            let head = &mut self.edges[tb];
            head.curve = joined_rev;
            head.next = a_next;
            head.twin = ein;
        }

        // repoint faces that referenced a removed half-edge
        let a_face = self.edges[a].face;
        let b_face = self.edges[b].face;
        if let Some(f) = a_face {
            if self.faces[f].edge == a {
                self.faces[f].edge = tb;
            }
        }
        if let Some(f) = b_face {
            if self.faces[f].edge == b {
                self.faces[f].edge = ein;
            }
        }

        self.edges.remove(a);
        self.edges.remove(b);
        self.out_edges.remove(v);
        self.vertices.remove(v);
        Ok(())
    }

    /// Deletes `v` and every incident edge pair.
    ///
    /// Surviving cycles must already have been spliced around the deleted
    /// region; this routine does not repair next pointers of surviving
    /// edges.
    pub fn delete_vertex(&mut self, v: VertexKey) {
        let out: SmallBuffer<EdgeKey, VERTEX_DEGREE_BUFFER_SIZE> =
            self.vertex_out_edges(v).iter().copied().collect();
        for e in out {
            if !self.edges.contains_key(e) {
                continue;
            }
            let tw = self.edges[e].twin;
            let other = self.edges[tw].source;
            if let Some(list) = self.out_edges.get_mut(other) {
                list.retain(|&mut k| k != tw);
            }
            self.edges.remove(e);
            self.edges.remove(tw);
        }
        self.out_edges.remove(v);
        self.vertices.remove(v);
    }
}

/// Iterator over one face's boundary cycle.
pub struct FaceEdgeIter<'a> {
    graph: &'a HalfEdgeGraph,
    start: EdgeKey,
    current: Option<EdgeKey>,
    steps: usize,
}

impl Iterator for FaceEdgeIter<'_> {
    type Item = EdgeKey;

    fn next(&mut self) -> Option<EdgeKey> {
        let e = self.current?;
        if self.steps > self.graph.edges.len() {
            return None;
        }
        self.steps += 1;
        let next = self.graph.edges.get(e).map(|he| he.next)?;
        self.current = (next != self.start && self.graph.edges.contains_key(next)).then_some(next);
        Some(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::edge::EdgeKind;
    use approx::assert_relative_eq;

    fn graph_with_triangle() -> (HalfEdgeGraph, FaceKey, [VertexKey; 3]) {
        let mut g = HalfEdgeGraph::new();
        let a = g.add_vertex(Point::new(0.0, 0.0), 1.0, VertexStatus::Undecided, VertexKind::Normal);
        let b = g.add_vertex(Point::new(1.0, 0.0), 1.0, VertexStatus::Undecided, VertexKind::Normal);
        let c = g.add_vertex(Point::new(0.0, 1.0), 1.0, VertexStatus::Undecided, VertexKind::Normal);
        let f = g.add_face(Site::point(Point::new(0.3, 0.3)));
        let (e1, _) = g.add_twin_edges(a, b, EdgeCurve::line(g.vertex(a).position, g.vertex(b).position), Some(f), None);
        let (e2, _) = g.add_twin_edges(b, c, EdgeCurve::line(g.vertex(b).position, g.vertex(c).position), Some(f), None);
        let (e3, _) = g.add_twin_edges(c, a, EdgeCurve::line(g.vertex(c).position, g.vertex(a).position), Some(f), None);
        g.set_next(e1, e2);
        g.set_next(e2, e3);
        g.set_next(e3, e1);
        g.face_mut(f).edge = e1;
        (g, f, [a, b, c])
    }

    #[test]
    fn vertex_indices_are_monotonic() {
        let (g, _, [a, b, c]) = graph_with_triangle();
        assert_eq!(g.vertex(a).index, 0);
        assert_eq!(g.vertex(b).index, 1);
        assert_eq!(g.vertex(c).index, 2);
    }

    #[test]
    fn twins_are_mutual() {
        let (g, f, _) = graph_with_triangle();
        for e in g.face_edges(f) {
            assert_eq!(g.twin(g.twin(e)), e);
            assert_ne!(g.twin(e), e);
        }
    }

    #[test]
    fn face_cycle_closes() {
        let (g, f, [a, b, c]) = graph_with_triangle();
        let cycle: Vec<VertexKey> = g.face_vertices(f).collect();
        assert_eq!(cycle, vec![a, b, c]);
    }

    #[test]
    fn previous_edge_walks_the_cycle() {
        let (g, f, _) = graph_with_triangle();
        let edges: Vec<EdgeKey> = g.face_edges(f).collect();
        assert_eq!(g.previous_edge(edges[0]).unwrap(), edges[2]);
        assert_eq!(g.previous_edge(edges[2]).unwrap(), edges[1]);
    }

    #[test]
    fn adjacency_queries() {
        let (g, f, [a, b, _]) = graph_with_triangle();
        assert_eq!(g.vertex_degree(a), 2);
        let n = g.neighbors(a);
        assert!(n.contains(&b));
        assert_eq!(g.vertex_faces(a), SmallBuffer::<FaceKey, 8>::from_slice(&[f]));
    }

    #[test]
    fn split_preserves_cycles_and_curves() {
        let (mut g, f, [a, b, _c]) = graph_with_triangle();
        let edges: Vec<EdgeKey> = g.face_edges(f).collect();
        let e_ab = edges[0];
        let mid = g.add_vertex(Point::new(0.5, 0.0), 1.0, VertexStatus::New, VertexKind::Normal);
        let (e2, tw2) = g.add_vertex_in_edge(mid, e_ab, 0.5);

        assert_eq!(g.target(e_ab), mid);
        assert_eq!(g.source(e2), mid);
        assert_eq!(g.target(e2), b);
        assert_eq!(g.target(tw2), a);
        assert_eq!(g.twin(e_ab), tw2);
        // the face cycle now has four edges
        assert_eq!(g.face_edges(f).count(), 4);
        assert_relative_eq!(g.edge(e_ab).curve.point(1.0).x, 0.5);
        assert_relative_eq!(g.edge(e2).curve.point(0.0).x, 0.5);
    }

    #[test]
    fn merge_undoes_a_split() {
        let (mut g, f, _) = graph_with_triangle();
        let edges: Vec<EdgeKey> = g.face_edges(f).collect();
        let mid = g.add_vertex(Point::new(0.5, 0.0), 1.0, VertexStatus::Undecided, VertexKind::Split);
        g.add_vertex_in_edge(mid, edges[0], 0.5);
        assert_eq!(g.face_edges(f).count(), 4);

        g.merge_edges_at(mid).unwrap();
        assert_eq!(g.face_edges(f).count(), 3);
        assert!(!g.contains_vertex(mid));
        // cycle still closes and the merged curve spans the original edge
        let merged: Vec<EdgeKey> = g.face_edges(f).collect();
        assert_eq!(merged.len(), 3);
        for e in merged {
            assert_eq!(g.edge(e).curve.kind(), EdgeKind::Line);
            assert_eq!(g.twin(g.twin(e)), e);
        }
    }

    #[test]
    fn merge_rejects_higher_degree() {
        let (mut g, _, [a, _, _]) = graph_with_triangle();
        assert!(matches!(
            g.merge_edges_at(a),
            Err(GraphError::NotMergeable { .. })
        ));
    }

    #[test]
    fn delete_vertex_removes_incident_pairs() {
        let (mut g, _, [a, b, c]) = graph_with_triangle();
        g.delete_vertex(a);
        assert!(!g.contains_vertex(a));
        assert_eq!(g.num_half_edges(), 2); // only the b-c pair survives
        assert_eq!(g.vertex_degree(b), 1);
        assert_eq!(g.vertex_degree(c), 1);
    }
}
