//! The incremental Voronoi diagram engine.
//!
//! [`VoronoiDiagram`] maintains a bounded planar Voronoi diagram of point
//! and line-segment sites under one-site-at-a-time insertion. Every
//! insertion follows the same protocol:
//!
//! 1. locate a seed face through the face grid and a seed vertex on it;
//! 2. flood-fill the set of IN (to-be-deleted) vertices, ordered by the
//!    magnitude of the signed in-circle predicate and constrained by the
//!    topological predicates C4 and C5;
//! 3. create a NEW vertex on every edge crossing the IN/OUT boundary, placed
//!    by the vertex positioner;
//! 4. allocate the new face(s) and re-stitch every incident face, splicing
//!    the NEW boundary path in place of the detached IN arc (segment
//!    insertion additionally wires separators at the endpoints and handles
//!    split vertices on degenerate collinear bisectors);
//! 5. delete the IN set, reset all transient state, and register the new
//!    face(s) in the grid.
//!
//! Recoverable failures (invalid input, an undecidable predicate, a
//! positioner failure) surface before any topology is mutated, so resetting
//! the transient statuses restores the pre-insertion diagram. After each
//! insertion in debug builds the checker audits the full invariant set.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::Write as _;

use ordered_float::OrderedFloat;
use thiserror::Error;
use tracing::{debug, trace};

use super::checker::{self, DiagramValidationError, DiagramView};
use super::collections::{FastHashMap, FastHashSet, SmallBuffer, FACE_CYCLE_BUFFER_SIZE};
use super::edge::{EdgeCurve, EdgeKind, ParabolaParams};
use super::face::FaceStatus;
use super::face_grid::FaceGrid;
use super::half_edge_graph::{EdgeKey, FaceKey, HalfEdgeGraph, VertexKey};
use super::vertex::{VertexKind, VertexStatus};
use crate::geometry::point::Point;
use crate::geometry::positioner::{PositionerError, Solution, VertexPositioner};
use crate::geometry::predicates::coincidence_tolerance;
use crate::geometry::root_finding::{brent, DEFAULT_MAX_ITERATIONS};
use crate::geometry::site::{LineSite, Site};

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by site insertion.
///
/// The first three kinds are recoverable: the diagram is restored to its
/// pre-insertion state before they are returned. [`InsertionError::InvariantViolated`]
/// indicates a bug; the diagram is not guaranteed restorable.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InsertionError {
    /// The input site is unusable: outside the far circle, coincident with
    /// existing geometry, a degenerate segment, or a crossing segment.
    #[error("invalid site: {reason}")]
    InvalidSite {
        /// Why the site was rejected.
        reason: String,
    },
    /// The flood fill could not classify the affected region.
    #[error("in-circle predicate undecidable: {message}")]
    PredicateUndecidable {
        /// What stalled.
        message: String,
    },
    /// The bisector solver failed to place a new vertex.
    #[error("vertex positioner failed: {0}")]
    PositionerFailed(#[from] PositionerError),
    /// The post-insertion audit failed, or the update found the topology
    /// inconsistent mid-flight.
    #[error("diagram invariant violated: {0}")]
    InvariantViolated(#[from] DiagramValidationError),
}

fn corrupted(message: impl Into<String>) -> InsertionError {
    InsertionError::InvariantViolated(DiagramValidationError::TopologyCorrupted {
        message: message.into(),
    })
}

// =============================================================================
// FLOOD-FILL QUEUE
// =============================================================================

/// Queue entry: vertices pop in order of decreasing predicate magnitude, so
/// the most numerically certain classifications happen first; ties break by
/// insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    magnitude: OrderedFloat<f64>,
    order: Reverse<u64>,
    predicate: OrderedFloat<f64>,
    vertex: VertexKey,
}

/// Boundary crossings of one incident face, as found by
/// [`VoronoiDiagram::find_edge_data`]: the two NEW vertices where the face
/// cycle enters and leaves the IN region, with the surviving edges just
/// before and after each crossing.
#[derive(Clone, Copy, Debug)]
struct EdgeData {
    /// Surviving edge into the entry crossing.
    v1_prv: EdgeKey,
    /// NEW vertex where the cycle enters the IN region.
    v1: VertexKey,
    /// First edge of the detached IN arc.
    v1_nxt: EdgeKey,
    /// Last edge of the detached IN arc.
    v2_prv: EdgeKey,
    /// NEW vertex where the cycle leaves the IN region.
    v2: VertexKey,
    /// Surviving edge out of the exit crossing.
    v2_nxt: EdgeKey,
    /// The face these crossings belong to.
    face: FaceKey,
}

/// Anchor recording an inserted point site for later segment attachment.
#[derive(Clone, Copy, Debug)]
struct SiteAnchor {
    marker: VertexKey,
    face: FaceKey,
    position: Point,
}

/// Which new faces a reconstruction step wires to.
enum NewFaces {
    /// Point insertion: one new face on the far side of every new edge.
    One(FaceKey),
    /// Segment insertion: a face per side, chosen by the right-of-line test
    /// against the segment.
    Two {
        left: FaceKey,
        right: FaceKey,
        seg: LineSite,
    },
}

impl NewFaces {
    fn side_of(&self, p: Point) -> FaceKey {
        match self {
            Self::One(f) => *f,
            Self::Two { left, right, seg } => {
                if p.is_right(seg.start, seg.end) {
                    *right
                } else {
                    *left
                }
            }
        }
    }
}

// =============================================================================
// THE DIAGRAM
// =============================================================================

/// Incremental Voronoi diagram of point and line-segment sites inside a
/// circular domain.
///
/// # Examples
///
/// ```
/// use voronoi::core::diagram::VoronoiDiagram;
/// use voronoi::geometry::point::Point;
///
/// let mut vd = VoronoiDiagram::new(10.0, 50);
/// let a = vd.insert_point_site(Point::new(1.0, 1.0)).unwrap();
/// let b = vd.insert_point_site(Point::new(1.0, -1.0)).unwrap();
/// vd.insert_line_site(a, b).unwrap();
/// assert_eq!(vd.num_point_sites(), 2);
/// assert_eq!(vd.num_line_sites(), 1);
/// assert!(vd.is_valid().is_ok());
/// ```
#[derive(Debug)]
pub struct VoronoiDiagram {
    g: HalfEdgeGraph,
    grid: FaceGrid,
    positioner: VertexPositioner,
    far_radius: f64,
    num_psites: usize,
    num_lsites: usize,

    // scratch state, cleared at the start of each insertion and on every
    // exit path
    incident_faces: Vec<FaceKey>,
    modified_vertices: Vec<VertexKey>,
    v0: Vec<VertexKey>,
    vertex_queue: BinaryHeap<QueueEntry>,
    queued: FastHashSet<VertexKey>,
    queue_order: u64,
    split_scaffold: Vec<VertexKey>,

    // persistent anchors: site handle -> marker vertex and face
    vertex_map: FastHashMap<usize, SiteAnchor>,
    line_sites: Vec<LineSite>,
}

impl VoronoiDiagram {
    /// Creates a diagram bounded by the circle of radius `far_radius` at the
    /// origin, with an `n_bins × n_bins` face grid.
    ///
    /// All sites must lie strictly inside the far circle. The initial
    /// diagram is the three-generator frame: three internal point sites far
    /// outside the domain whose faces bound everything a real site can
    /// claim.
    #[must_use]
    pub fn new(far_radius: f64, n_bins: usize) -> Self {
        let far_radius = if far_radius > 0.0 { far_radius } else { 1.0 };
        let mut vd = Self {
            g: HalfEdgeGraph::new(),
            grid: FaceGrid::new(far_radius, n_bins),
            positioner: VertexPositioner::new(far_radius),
            far_radius,
            num_psites: 0,
            num_lsites: 0,
            incident_faces: Vec::new(),
            modified_vertices: Vec::new(),
            v0: Vec::new(),
            vertex_queue: BinaryHeap::new(),
            queued: FastHashSet::default(),
            queue_order: 0,
            split_scaffold: Vec::new(),
            vertex_map: FastHashMap::default(),
            line_sites: Vec::new(),
        };
        vd.initialize();
        vd
    }

    /// Builds the initial frame: three generators at radius `3R`, the
    /// central Voronoi vertex, three outer vertices at radius `8R`, three
    /// generator faces, and the outer boundary cycle.
    fn initialize(&mut self) {
        let r = self.far_radius;
        let gen_radius = 3.0 * r;
        let out_radius = 8.0 * r;
        let at = |angle_deg: f64, radius: f64| {
            let a = angle_deg.to_radians();
            Point::new(radius * a.cos(), radius * a.sin())
        };

        // generators at 90°, 210°, 330°; outer vertices on the bisector
        // directions 30°, 150°, 270°
        let gen = [at(90.0, gen_radius), at(210.0, gen_radius), at(330.0, gen_radius)];
        let center = self.g.add_vertex(
            Point::origin(),
            gen_radius,
            VertexStatus::Undecided,
            VertexKind::Normal,
        );
        // each outer vertex is equidistant from its two flanking generators:
        // sqrt(64 + 9 - 2·8·3·cos 60°) = 7 in units of the far radius
        let out_clearance = 7.0 * r;
        let out30 = self.g.add_vertex(
            at(30.0, out_radius),
            out_clearance,
            VertexStatus::Undecided,
            VertexKind::Outer,
        );
        let out150 = self.g.add_vertex(
            at(150.0, out_radius),
            out_clearance,
            VertexStatus::Undecided,
            VertexKind::Outer,
        );
        let out270 = self.g.add_vertex(
            at(270.0, out_radius),
            out_clearance,
            VertexStatus::Undecided,
            VertexKind::Outer,
        );

        let f1 = self.g.add_face(Site::point(gen[0]));
        let f2 = self.g.add_face(Site::point(gen[1]));
        let f3 = self.g.add_face(Site::point(gen[2]));

        let pos = |vd: &Self, v: VertexKey| vd.g.vertex(v).position;

        // bisector rays, one twin pair per ray: the forward half keeps the
        // face on its left
        let (b30_out, b30_in) = self.g.add_twin_edges(
            center,
            out30,
            EdgeCurve::line(pos(self, center), pos(self, out30)),
            Some(f1),
            Some(f3),
        );
        let (b150_out, b150_in) = self.g.add_twin_edges(
            center,
            out150,
            EdgeCurve::line(pos(self, center), pos(self, out150)),
            Some(f2),
            Some(f1),
        );
        let (b270_out, b270_in) = self.g.add_twin_edges(
            center,
            out270,
            EdgeCurve::line(pos(self, center), pos(self, out270)),
            Some(f3),
            Some(f2),
        );

        // far-frame chords; the outside twins border the unbounded region
        let (c1, t1) = self.g.add_twin_edges(
            out30,
            out150,
            EdgeCurve::line(pos(self, out30), pos(self, out150)),
            Some(f1),
            None,
        );
        let (c2, t2) = self.g.add_twin_edges(
            out150,
            out270,
            EdgeCurve::line(pos(self, out150), pos(self, out270)),
            Some(f2),
            None,
        );
        let (c3, t3) = self.g.add_twin_edges(
            out270,
            out30,
            EdgeCurve::line(pos(self, out270), pos(self, out30)),
            Some(f3),
            None,
        );

        // f1: center -> out30 -> out150 -> center
        self.g.set_next(b30_out, c1);
        self.g.set_next(c1, b150_in);
        self.g.set_next(b150_in, b30_out);
        self.g.face_mut(f1).edge = b30_out;
        // f2: center -> out150 -> out270 -> center
        self.g.set_next(b150_out, c2);
        self.g.set_next(c2, b270_in);
        self.g.set_next(b270_in, b150_out);
        self.g.face_mut(f2).edge = b150_out;
        // f3: center -> out270 -> out30 -> center
        self.g.set_next(b270_out, c3);
        self.g.set_next(c3, b30_in);
        self.g.set_next(b30_in, b270_out);
        self.g.face_mut(f3).edge = b270_out;
        // outer boundary, clockwise seen from inside
        self.g.set_next(t1, t3);
        self.g.set_next(t3, t2);
        self.g.set_next(t2, t1);

        self.num_psites = 3;
        self.grid.add(f1, gen[0]);
        self.grid.add(f2, gen[1]);
        self.grid.add(f3, gen[2]);
    }

    // =========================================================================
    // PUBLIC QUERIES
    // =========================================================================

    /// Radius of the far circle.
    #[must_use]
    pub fn get_far_radius(&self) -> f64 {
        self.far_radius
    }

    /// Crate version string.
    #[must_use]
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Number of point sites inserted by the caller (the three frame
    /// generators do not count).
    #[must_use]
    pub fn num_point_sites(&self) -> usize {
        self.num_psites - 3
    }

    /// Number of line-segment sites.
    #[must_use]
    pub fn num_line_sites(&self) -> usize {
        self.num_lsites
    }

    /// Number of Voronoi vertices (point-site marker vertices excluded).
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.g.num_vertices() - self.num_point_sites()
    }

    /// Number of split vertices remaining in the diagram; scaffolding is
    /// normally merged away before an insertion returns.
    #[must_use]
    pub fn num_split_vertices(&self) -> usize {
        self.g
            .vertices()
            .filter(|(_, v)| v.kind == VertexKind::Split)
            .count()
    }

    /// Runs the full invariant audit.
    ///
    /// # Errors
    ///
    /// The first violated invariant, as a [`DiagramValidationError`].
    pub fn is_valid(&self) -> Result<(), DiagramValidationError> {
        checker::is_valid(self)
    }

    /// Human-readable dump of faces and their boundary cycles.
    #[must_use]
    pub fn print(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "VoronoiDiagram: far_radius={}, point_sites={}, line_sites={}, vertices={}",
            self.far_radius,
            self.num_point_sites(),
            self.num_line_sites(),
            self.num_vertices(),
        );
        for (f, face) in self.g.faces() {
            let _ = write!(out, "  face {f:?} [{}] {}:", face.status, face.site);
            for e in self.g.face_edges(f) {
                let v = self.g.vertex(self.g.source(e));
                let _ = write!(out, " {}({})", v.index, v.kind);
            }
            let _ = writeln!(out);
        }
        out
    }

    // =========================================================================
    // POINT-SITE INSERTION
    // =========================================================================

    /// Inserts a point site and returns its handle.
    ///
    /// # Errors
    ///
    /// [`InsertionError::InvalidSite`] when `p` lies outside the far circle
    /// or coincides with existing geometry; the other kinds per their
    /// documentation. Recoverable errors leave the diagram unchanged.
    pub fn insert_point_site(&mut self, p: Point) -> Result<usize, InsertionError> {
        self.validate_point_site(p)?;
        self.clear_scratch();
        debug!(x = p.x, y = p.y, "inserting point site");

        let site = Site::point(p);
        let seed_face = self
            .grid
            .find_closest_face(p)
            .map_err(|e| corrupted(format!("face grid lookup failed: {e}")))?;
        let seed = match self.find_seed_vertex(seed_face, &site) {
            Ok(seed) => seed,
            Err(e) => {
                self.reset_status();
                return Err(e);
            }
        };
        trace!(seed_index = self.g.vertex(seed).index, "seed vertex chosen");
        self.mark_vertex(seed, &site);

        if let Err(e) = self
            .augment_vertex_set(&site)
            .and_then(|()| self.add_vertices(&site))
        {
            self.reset_status();
            return Err(e);
        }

        let new_face = self.g.add_face(site.clone());
        let wiring = NewFaces::One(new_face);
        for f in self.incident_faces.clone() {
            let ed = self.find_edge_data(f)?;
            self.add_edge(&ed, &wiring, &site)?;
        }
        self.repair_face(new_face)?;
        self.remove_vertex_set();
        self.reset_status();

        let marker = self
            .g
            .add_vertex(p, 0.0, VertexStatus::Undecided, VertexKind::PointSite);
        self.num_psites += 1;
        let handle = self.num_psites;
        self.vertex_map.insert(
            handle,
            SiteAnchor {
                marker,
                face: new_face,
                position: p,
            },
        );
        self.grid.add(new_face, p);
        debug!(handle, "point site inserted");

        if cfg!(debug_assertions) {
            self.is_valid()?;
        }
        Ok(handle)
    }

    fn validate_point_site(&self, p: Point) -> Result<(), InsertionError> {
        let tol = coincidence_tolerance(self.far_radius);
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(InsertionError::InvalidSite {
                reason: format!("coordinates of {p} are not finite"),
            });
        }
        if p.norm() >= self.far_radius {
            return Err(InsertionError::InvalidSite {
                reason: format!(
                    "{p} does not lie strictly inside the far circle of radius {}",
                    self.far_radius
                ),
            });
        }
        for (_, face) in self.g.faces() {
            if let Site::Point(ps) = &face.site {
                if p.distance(ps.position) <= tol {
                    return Err(InsertionError::InvalidSite {
                        reason: format!("{p} coincides with an existing point site"),
                    });
                }
            }
        }
        // a site on an existing vertex or edge is rejected rather than
        // resolved by perturbation
        for (_, v) in self.g.vertices() {
            if v.kind != VertexKind::PointSite && p.distance(v.position) <= tol {
                return Err(InsertionError::InvalidSite {
                    reason: format!("{p} coincides with an existing Voronoi vertex"),
                });
            }
        }
        for (_, he) in self.g.edges() {
            let near = match he.curve.kind() {
                EdgeKind::Null => false,
                EdgeKind::Parabola => (0..=4)
                    .map(|i| he.curve.point(f64::from(i) / 4.0))
                    .any(|q| p.distance(q) <= tol),
                _ => {
                    let t = he.curve.parameter_of(p).clamp(0.0, 1.0);
                    p.distance(he.curve.point(t)) <= tol
                }
            };
            if near {
                return Err(InsertionError::InvalidSite {
                    reason: format!("{p} lies on an existing edge"),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // LINE-SITE INSERTION
    // =========================================================================

    /// Inserts the line segment between two previously inserted point sites.
    ///
    /// # Errors
    ///
    /// [`InsertionError::InvalidSite`] for unknown handles, degenerate or
    /// crossing segments; the other kinds per their documentation.
    /// Recoverable errors leave the diagram unchanged.
    pub fn insert_line_site(&mut self, idx1: usize, idx2: usize) -> Result<(), InsertionError> {
        let (a1, a2) = self.validate_line_site(idx1, idx2)?;
        self.clear_scratch();
        debug_assert!(self.g.contains_vertex(a1.marker));
        debug_assert!(self.g.contains_vertex(a2.marker));
        let (p1, p2) = (a1.position, a2.position);
        debug!(idx1, idx2, "inserting line site");

        let site_left = Site::line(p1, p2);
        let site_right = Site::line(p2, p1);
        let seg = LineSite { start: p1, end: p2 };

        // seed from the endpoint faces, restricted to the segment's slab
        let seed = match self.find_line_seed(&[a1.face, a2.face], &site_left) {
            Ok(seed) => seed,
            Err(e) => {
                self.reset_status();
                return Err(e);
            }
        };
        self.mark_vertex(seed, &site_left);

        let fill = self.augment_vertex_set(&site_left).and_then(|()| {
            for f in [a1.face, a2.face] {
                if self.g.face(f).status != FaceStatus::Incident {
                    return Err(InsertionError::PredicateUndecidable {
                        message: "segment endpoint face was not reached by the flood fill"
                            .to_string(),
                    });
                }
            }
            Ok(())
        });
        if let Err(e) = fill {
            self.reset_status();
            return Err(e);
        }

        // split vertices on faces of collinear segments, then re-drain the
        // queue they may have extended
        let tol = coincidence_tolerance(self.far_radius);
        let collinear_faces: Vec<FaceKey> = self
            .incident_faces
            .iter()
            .copied()
            .filter(|&f| {
                f != a1.face
                    && f != a2.face
                    && self
                        .g
                        .face(f)
                        .site
                        .as_line()
                        .is_some_and(|l| l.collinear_with(&seg, tol))
            })
            .collect();
        let prepared = collinear_faces
            .iter()
            .try_for_each(|&f| self.add_split_vertex(f, &site_left))
            .and_then(|()| self.augment_vertex_set(&site_left))
            .and_then(|()| self.add_vertices(&site_left));
        if let Err(e) = prepared {
            self.rollback_split_scaffold();
            self.reset_status();
            return Err(e);
        }

        let f_left = self.g.add_face(site_left.clone());
        let f_right = self.g.add_face(site_right);
        let endp1 = self
            .g
            .add_vertex(p1, 0.0, VertexStatus::New, VertexKind::Endpoint);
        let endp2 = self
            .g
            .add_vertex(p2, 0.0, VertexStatus::New, VertexKind::Endpoint);
        self.modified_vertices.push(endp1);
        self.modified_vertices.push(endp2);
        // the segment edge pair joins the two new faces along the site
        self.g.add_twin_edges(
            endp1,
            endp2,
            EdgeCurve::line_site(p1, p2),
            Some(f_left),
            Some(f_right),
        );

        let wiring = NewFaces::Two {
            left: f_left,
            right: f_right,
            seg,
        };
        // endpoint faces first: separators snap their crossings onto the
        // separator line before neighboring faces build curves from them
        let mut ordered = self.incident_faces.clone();
        ordered.sort_by_key(|&f| usize::from(f != a1.face && f != a2.face));
        for f in ordered {
            if f == a1.face {
                self.add_separator(f, endp1, &wiring)?;
            } else if f == a2.face {
                self.add_separator(f, endp2, &wiring)?;
            } else {
                let ed = self.find_edge_data(f)?;
                self.add_edge(&ed, &wiring, &site_left)?;
            }
        }
        self.repair_face(f_left)?;
        self.repair_face(f_right)?;
        self.remove_vertex_set();
        for f in collinear_faces {
            self.remove_split_vertex(f)?;
        }
        self.reset_status();

        self.num_lsites += 1;
        self.line_sites.push(seg);
        let midpoint = p1.lerp(p2, 0.5);
        self.grid.add(f_left, midpoint);
        self.grid.add(f_right, midpoint);
        debug!(idx1, idx2, "line site inserted");

        if cfg!(debug_assertions) {
            self.is_valid()?;
        }
        Ok(())
    }

    fn validate_line_site(
        &self,
        idx1: usize,
        idx2: usize,
    ) -> Result<(SiteAnchor, SiteAnchor), InsertionError> {
        let lookup = |idx: usize| {
            self.vertex_map
                .get(&idx)
                .copied()
                .ok_or_else(|| InsertionError::InvalidSite {
                    reason: format!("{idx} is not a point-site handle"),
                })
        };
        let a1 = lookup(idx1)?;
        let a2 = lookup(idx2)?;
        let tol = coincidence_tolerance(self.far_radius);
        if idx1 == idx2 || a1.position.distance(a2.position) <= tol {
            return Err(InsertionError::InvalidSite {
                reason: "segment endpoints coincide".to_string(),
            });
        }
        let candidate = LineSite {
            start: a1.position,
            end: a2.position,
        };
        for existing in &self.line_sites {
            if segments_cross(&candidate, existing, tol) {
                return Err(InsertionError::InvalidSite {
                    reason: "segment crosses an existing line site".to_string(),
                });
            }
            if candidate.collinear_with(existing, tol) && segments_overlap(&candidate, existing, tol)
            {
                return Err(InsertionError::InvalidSite {
                    reason: "segment overlaps an existing collinear line site".to_string(),
                });
            }
            for p in [candidate.start, candidate.end] {
                if point_in_segment_interior(existing, p, tol) {
                    return Err(InsertionError::InvalidSite {
                        reason: "segment endpoint lies inside an existing line site".to_string(),
                    });
                }
            }
            for p in [existing.start, existing.end] {
                if point_in_segment_interior(&candidate, p, tol) {
                    return Err(InsertionError::InvalidSite {
                        reason: "segment passes through an existing endpoint".to_string(),
                    });
                }
            }
        }
        Ok((a1, a2))
    }

    // =========================================================================
    // SEEDING
    // =========================================================================

    /// Picks the vertex of `f` (or, failing that, of a neighboring face)
    /// with the largest positive in-circle predicate against `site`.
    fn find_seed_vertex(
        &self,
        f: FaceKey,
        site: &Site,
    ) -> Result<VertexKey, InsertionError> {
        if let Some((v, h)) = self.best_face_vertex(f, site) {
            if h > 0.0 {
                return Ok(v);
            }
        }
        // one-ring fallback: the grid ranks faces by representative site
        // position, which can miss the true nearest region
        let neighbors: SmallBuffer<FaceKey, FACE_CYCLE_BUFFER_SIZE> = self
            .g
            .face_edges(f)
            .filter_map(|e| self.g.edge(self.g.twin(e)).face)
            .collect();
        let best = neighbors
            .iter()
            .filter_map(|&nf| self.best_face_vertex(nf, site))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match best {
            Some((v, h)) if h > 0.0 => Ok(v),
            _ => Err(InsertionError::PredicateUndecidable {
                message: "no seed vertex with a positive in-circle predicate".to_string(),
            }),
        }
    }

    fn best_face_vertex(&self, f: FaceKey, site: &Site) -> Option<(VertexKey, f64)> {
        self.g
            .face_vertices(f)
            .filter(|&v| {
                let vert = self.g.vertex(v);
                vert.status == VertexStatus::Undecided && site.in_region(vert.position)
            })
            .map(|v| (v, self.g.vertex(v).in_circle(site)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn find_line_seed(
        &self,
        faces: &[FaceKey],
        site: &Site,
    ) -> Result<VertexKey, InsertionError> {
        let mut best: Option<(VertexKey, f64)> = None;
        for &f in faces {
            if let Some((v, h)) = self.best_face_vertex(f, site) {
                if best.map_or(true, |(_, bh)| h > bh) {
                    best = Some((v, h));
                }
            }
        }
        match best {
            Some((v, h)) if h > 0.0 => Ok(v),
            _ => self.find_seed_vertex(faces[0], site),
        }
    }

    // =========================================================================
    // FLOOD FILL
    // =========================================================================

    /// Marks `v` IN: records it for deletion, marks its faces incident, and
    /// enqueues its undecided neighbors keyed by predicate magnitude.
    fn mark_vertex(&mut self, v: VertexKey, site: &Site) {
        self.g.vertex_mut(v).status = VertexStatus::In;
        self.v0.push(v);
        self.modified_vertices.push(v);
        self.mark_adjacent_faces(v);
        for w in self.g.neighbors(v) {
            if self.g.vertex(w).status != VertexStatus::Undecided || self.queued.contains(&w) {
                continue;
            }
            let h = self.g.vertex(w).in_circle(site);
            self.queue_order += 1;
            self.vertex_queue.push(QueueEntry {
                magnitude: OrderedFloat(h.abs()),
                order: Reverse(self.queue_order),
                predicate: OrderedFloat(h),
                vertex: w,
            });
            self.queued.insert(w);
        }
    }

    /// Marks every face incident to `v` as INCIDENT, once.
    fn mark_adjacent_faces(&mut self, v: VertexKey) {
        for f in self.g.vertex_faces(v) {
            if self.g.face(f).status == FaceStatus::Nonincident {
                self.g.face_mut(f).status = FaceStatus::Incident;
                self.incident_faces.push(f);
            }
        }
    }

    /// Drains the priority queue, growing the IN set subject to C4 and C5.
    ///
    /// Vertices pop most-certain-first; near-zero predicates surface last,
    /// by which time the topological predicates usually decide them. Two
    /// consecutive within-tolerance candidates that C4/C5 reject while the
    /// queue is still loaded mean the fill cannot classify the region.
    fn augment_vertex_set(&mut self, site: &Site) -> Result<(), InsertionError> {
        // ties (a vertex exactly on the boundary circle, or in the
        // degenerate half-plane beyond a segment endpoint) stay OUT
        let tie = self.undecidable_tolerance();
        let stall_window = 1e-9 * self.far_radius.max(1.0);
        let mut stalled = 0usize;
        while let Some(entry) = self.vertex_queue.pop() {
            let v = entry.vertex;
            let h = entry.predicate.0;
            debug_assert_eq!(self.g.vertex(v).status, VertexStatus::Undecided);
            if h > tie {
                if self.predicate_c4(v) && self.predicate_c5(v) {
                    self.mark_vertex(v, site);
                    stalled = 0;
                } else {
                    self.g.vertex_mut(v).status = VertexStatus::Out;
                    self.modified_vertices.push(v);
                    if h <= stall_window && !self.vertex_queue.is_empty() {
                        stalled += 1;
                        if stalled >= 2 {
                            return Err(InsertionError::PredicateUndecidable {
                                message: format!(
                                    "fill stalled on consecutive near-zero predicates (|h| <= {stall_window:e})"
                                ),
                            });
                        }
                    }
                }
            } else {
                self.g.vertex_mut(v).status = VertexStatus::Out;
                self.modified_vertices.push(v);
            }
        }
        if self.v0.is_empty() {
            return Err(InsertionError::PredicateUndecidable {
                message: "flood fill produced an empty IN set".to_string(),
            });
        }
        trace!(in_set = self.v0.len(), incident = self.incident_faces.len(), "flood fill done");
        Ok(())
    }

    /// C4: accepting `v` must keep the IN vertices of every incident face a
    /// single contiguous arc of the face cycle.
    fn predicate_c4(&self, v: VertexKey) -> bool {
        for f in self.g.vertex_faces(v) {
            let flags: SmallBuffer<bool, FACE_CYCLE_BUFFER_SIZE> = self
                .g
                .face_vertices(f)
                .map(|w| w == v || self.g.vertex(w).status == VertexStatus::In)
                .collect();
            let mut runs = 0usize;
            for i in 0..flags.len() {
                let prev = flags[(i + flags.len() - 1) % flags.len()];
                if flags[i] && !prev {
                    runs += 1;
                }
            }
            if runs > 1 {
                return false;
            }
        }
        true
    }

    /// C5: accepting `v` must leave every incident face at least one vertex
    /// that is not IN, so no pre-existing face is wholly engulfed.
    fn predicate_c5(&self, v: VertexKey) -> bool {
        for f in self.g.vertex_faces(v) {
            let survivor = self
                .g
                .face_vertices(f)
                .any(|w| w != v && self.g.vertex(w).status != VertexStatus::In);
            if !survivor {
                return false;
            }
        }
        true
    }

    // =========================================================================
    // NEW VERTICES
    // =========================================================================

    /// Edges leaving the IN set for the OUT set; each will receive a NEW
    /// vertex.
    fn find_in_out_edges(&self) -> Vec<EdgeKey> {
        let mut crossings = Vec::new();
        for &v in &self.v0 {
            for &e in self.g.vertex_out_edges(v) {
                if self.g.vertex(self.g.target(e)).status == VertexStatus::Out {
                    crossings.push(e);
                }
            }
        }
        crossings
    }

    /// Creates a NEW vertex on every IN/OUT crossing edge.
    ///
    /// All positions are solved before any edge is split, so a positioner
    /// failure aborts with the topology untouched.
    fn add_vertices(&mut self, new_site: &Site) -> Result<(), InsertionError> {
        let crossings = self.find_in_out_edges();
        let mut solutions: Vec<Solution> = Vec::with_capacity(crossings.len());
        for &e in &crossings {
            let curve = self.g.edge(e).curve.clone();
            let f_a = self
                .g
                .edge(e)
                .face
                .ok_or_else(|| corrupted("crossing edge borders the unbounded region"))?;
            let f_b = self
                .g
                .edge(self.g.twin(e))
                .face
                .ok_or_else(|| corrupted("crossing edge twin borders the unbounded region"))?;
            let site_a = self.g.face(f_a).site.clone();
            let site_b = self.g.face(f_b).site.clone();
            let sol = if curve.kind() == EdgeKind::Null {
                // both endpoints coincide; the new vertex does too
                let position = curve.point(0.5);
                Solution {
                    position,
                    clearance: site_a.distance(position),
                    t: 0.5,
                }
            } else {
                self.positioner.position(&curve, &site_a, &site_b, new_site)?
            };
            solutions.push(sol);
        }
        for (e, sol) in crossings.into_iter().zip(solutions) {
            let v = self.g.add_vertex(
                sol.position,
                sol.clearance,
                VertexStatus::New,
                VertexKind::Normal,
            );
            self.modified_vertices.push(v);
            self.g.add_vertex_in_edge(v, e, sol.t);
        }
        Ok(())
    }

    // =========================================================================
    // FACE RECONSTRUCTION
    // =========================================================================

    /// Walks the cycle of `f` and locates its two boundary crossings.
    fn find_edge_data(&self, f: FaceKey) -> Result<EdgeData, InsertionError> {
        let cycle: Vec<EdgeKey> = self.g.face_edges(f).collect();
        let n = cycle.len();
        if n < 3 {
            return Err(corrupted(format!("incident face {f:?} has a short cycle")));
        }
        let status = |i: usize| self.g.vertex(self.g.source(cycle[i % n])).status;
        let mut entry = None;
        let mut exit = None;
        for i in 0..n {
            if status(i) == VertexStatus::New {
                if status(i + 1) == VertexStatus::In {
                    entry = Some(i);
                } else if status((i + n - 1) % n) == VertexStatus::In {
                    exit = Some(i);
                } else {
                    return Err(corrupted(
                        "boundary crossing is not adjacent to the IN arc",
                    ));
                }
            }
        }
        let (Some(i1), Some(i2)) = (entry, exit) else {
            return Err(corrupted(format!(
                "incident face {f:?} does not have two boundary crossings"
            )));
        };
        Ok(EdgeData {
            v1_prv: cycle[(i1 + n - 1) % n],
            v1: self.g.source(cycle[i1]),
            v1_nxt: cycle[i1],
            v2_prv: cycle[(i2 + n - 1) % n],
            v2: self.g.source(cycle[i2]),
            v2_nxt: cycle[i2],
            face: f,
        })
    }

    /// Splices the new boundary edge pair of one incident face: the forward
    /// half bypasses the detached IN arc inside `ed.face`, the twin borders
    /// the new face. Parabolic edges are split at an interior apex.
    fn add_edge(
        &mut self,
        ed: &EdgeData,
        wiring: &NewFaces,
        new_site: &Site,
    ) -> Result<(), InsertionError> {
        debug_assert_eq!(self.g.source(ed.v1_nxt), ed.v1);
        debug_assert_eq!(self.g.source(ed.v2_nxt), ed.v2);
        debug_assert_eq!(self.g.target(ed.v2_prv), ed.v2);
        let f_site = self.g.face(ed.face).site.clone();
        let pa = self.g.vertex(ed.v1).position;
        let pb = self.g.vertex(ed.v2).position;
        let curve = bisector_curve(&f_site, new_site, pa, pb, self.far_radius)?;
        let twin_face = wiring.side_of(curve.point(0.5));

        let (e_fwd, e_rev) =
            self.g
                .add_twin_edges(ed.v1, ed.v2, curve.clone(), Some(ed.face), Some(twin_face));
        self.g.set_next(ed.v1_prv, e_fwd);
        self.g.set_next(e_fwd, ed.v2_nxt);
        self.g.face_mut(ed.face).edge = e_fwd;
        self.g.face_mut(twin_face).edge = e_rev;

        if let Some(t_apex) = curve.apex_t() {
            let position = curve.point(t_apex);
            let clearance = f_site.distance(position);
            let apex =
                self.g
                    .add_vertex(position, clearance, VertexStatus::New, VertexKind::Apex);
            self.modified_vertices.push(apex);
            self.g.add_vertex_in_edge(apex, e_fwd, t_apex);
        }
        Ok(())
    }

    /// Wires the two separator rays at a segment endpoint, splitting the
    /// endpoint's point-site face off from the two new segment faces.
    fn add_separator(
        &mut self,
        f: FaceKey,
        endp: VertexKey,
        wiring: &NewFaces,
    ) -> Result<(), InsertionError> {
        let seg = match wiring {
            NewFaces::Two { seg, .. } => *seg,
            NewFaces::One(_) => {
                return Err(corrupted("separator requested outside a segment insertion"));
            }
        };
        let normal = seg
            .normal()
            .ok_or_else(|| corrupted("separator for a degenerate segment"))?;
        let ed = self.find_edge_data(f)?;
        let endp_pos = self.g.vertex(endp).position;

        // crossings on an endpoint face sit on the separator line; snap them
        // exactly onto it and re-type
        for v in [ed.v1, ed.v2] {
            let vert = self.g.vertex_mut(v);
            let d = (vert.position - endp_pos).dot(normal);
            vert.position = endp_pos + normal * d;
            vert.clearance = d.abs();
            vert.kind = VertexKind::SepPoint;
        }
        let p1 = self.g.vertex(ed.v1).position;
        let p2 = self.g.vertex(ed.v2).position;

        let (s1, s1t) = self.g.add_twin_edges(
            ed.v1,
            endp,
            EdgeCurve::separator(p1, endp_pos),
            Some(f),
            Some(wiring.side_of(p1)),
        );
        let (s2, s2t) = self.g.add_twin_edges(
            endp,
            ed.v2,
            EdgeCurve::separator(endp_pos, p2),
            Some(f),
            Some(wiring.side_of(p2)),
        );
        self.g.set_next(ed.v1_prv, s1);
        self.g.set_next(s1, s2);
        self.g.set_next(s2, ed.v2_nxt);
        self.g.face_mut(f).edge = s1;
        self.g.face_mut(wiring.side_of(p1)).edge = s1t;
        self.g.face_mut(wiring.side_of(p2)).edge = s2t;
        Ok(())
    }

    /// Links the boundary cycle of a freshly built face by walking from
    /// vertex to vertex; every vertex on a new face has exactly one outgoing
    /// half-edge owned by it.
    fn repair_face(&mut self, f: FaceKey) -> Result<(), InsertionError> {
        let start = self.g.face(f).edge;
        if !self.g.contains_edge(start) {
            return Err(corrupted(format!("new face {f:?} has no boundary edge")));
        }
        let mut e = start;
        for _ in 0..=self.g.num_half_edges() {
            let target = self.g.target(e);
            let next = self
                .g
                .vertex_out_edges(target)
                .iter()
                .copied()
                .find(|&oe| self.g.edge(oe).face == Some(f))
                .ok_or_else(|| {
                    corrupted(format!("face {f:?} boundary breaks at vertex {target:?}"))
                })?;
            self.g.set_next(e, next);
            if next == start {
                return Ok(());
            }
            e = next;
        }
        Err(corrupted(format!("face {f:?} boundary does not close")))
    }

    // =========================================================================
    // SPLIT VERTICES
    // =========================================================================

    /// Edges of `f` whose endpoints straddle the supporting line through
    /// `pt1` and `pt2`; candidates for a split vertex.
    fn find_split_edges(&self, f: FaceKey, pt1: Point, pt2: Point) -> Vec<EdgeKey> {
        self.g
            .face_edges(f)
            .filter(|&e| {
                let he = self.g.edge(e);
                matches!(he.curve.kind(), EdgeKind::Line | EdgeKind::Parabola) && {
                    let a = self.g.vertex(he.source).position;
                    let b = self.g.vertex(self.g.target(e)).position;
                    a.is_right(pt1, pt2) != b.is_right(pt1, pt2)
                }
            })
            .collect()
    }

    /// Splits the edges of `f` where a degenerate collinear bisector of the
    /// new segment would cross them, at the root of the signed distance to
    /// the segment's supporting line.
    fn add_split_vertex(&mut self, f: FaceKey, new_site: &Site) -> Result<(), InsertionError> {
        let Some(seg) = new_site.as_line().copied() else {
            return Ok(());
        };
        let (pt1, pt2) = (seg.start, seg.end);
        for e in self.find_split_edges(f, pt1, pt2) {
            let curve = self.g.edge(e).curve.clone();
            // signed distance from the curve point to the pt1-pt2 line, sign
            // from the right-of-line test
            let signed_distance = |t: f64| {
                let p = curve.point(t);
                let d = pt2 - pt1;
                let dist = d.cross(p - pt1).abs() / d.norm();
                if p.is_right(pt1, pt2) {
                    dist
                } else {
                    -dist
                }
            };
            let f0 = signed_distance(0.0);
            let f1 = signed_distance(1.0);
            if f0 == 0.0 || f1 == 0.0 || f0.signum() == f1.signum() {
                continue;
            }
            let t = brent(
                signed_distance,
                0.0,
                1.0,
                1e-12 * self.far_radius.max(1.0),
                DEFAULT_MAX_ITERATIONS,
            )
            .map_err(PositionerError::from)?;
            let position = curve.point(t);
            let clearance = self.g.face(f).site.distance(position);
            let v = self.g.add_vertex(
                position,
                clearance,
                VertexStatus::Undecided,
                VertexKind::Split,
            );
            self.modified_vertices.push(v);
            self.split_scaffold.push(v);
            self.g.add_vertex_in_edge(v, e, t);
            // classify the scaffold vertex like any fill candidate
            let h = self.g.vertex(v).in_circle(new_site);
            if h > self.undecidable_tolerance() && self.predicate_c4(v) && self.predicate_c5(v) {
                self.mark_vertex(v, new_site);
            } else {
                self.g.vertex_mut(v).status = VertexStatus::Out;
            }
        }
        Ok(())
    }

    /// Merges away leftover degree-2 split scaffolding on `f`.
    fn remove_split_vertex(&mut self, f: FaceKey) -> Result<(), InsertionError> {
        loop {
            let leftover = self.g.face_vertices(f).find(|&v| {
                self.g.vertex(v).kind == VertexKind::Split && self.g.vertex_degree(v) == 2
            });
            let Some(v) = leftover else {
                return Ok(());
            };
            self.g
                .merge_edges_at(v)
                .map_err(|e| corrupted(format!("split vertex removal failed: {e}")))?;
        }
    }

    fn rollback_split_scaffold(&mut self) {
        let scaffold = std::mem::take(&mut self.split_scaffold);
        for v in scaffold {
            if self.g.contains_vertex(v) && self.g.vertex_degree(v) == 2 {
                // best effort: scaffolding that cannot be merged is left for
                // the audit to report
                let _ = self.g.merge_edges_at(v);
            }
        }
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Deletes every IN vertex together with its incident edges.
    fn remove_vertex_set(&mut self) {
        let doomed = std::mem::take(&mut self.v0);
        for v in &doomed {
            debug_assert_ne!(self.g.vertex(*v).kind, VertexKind::Outer);
        }
        for v in doomed {
            if self.g.contains_vertex(v) {
                self.g.delete_vertex(v);
            }
        }
    }

    /// Returns every touched vertex to UNDECIDED and every touched face to
    /// NONINCIDENT, and releases the per-insertion scratch state.
    fn reset_status(&mut self) {
        let modified = std::mem::take(&mut self.modified_vertices);
        for v in modified {
            if self.g.contains_vertex(v) {
                self.g.vertex_mut(v).status = VertexStatus::Undecided;
            }
        }
        let incident = std::mem::take(&mut self.incident_faces);
        for f in incident {
            self.g.face_mut(f).status = FaceStatus::Nonincident;
        }
        self.v0.clear();
        self.vertex_queue.clear();
        self.queued.clear();
        self.split_scaffold.clear();
    }

    fn undecidable_tolerance(&self) -> f64 {
        1e-12 * self.far_radius.max(1.0)
    }

    fn clear_scratch(&mut self) {
        self.incident_faces.clear();
        self.modified_vertices.clear();
        self.v0.clear();
        self.vertex_queue.clear();
        self.queued.clear();
        self.split_scaffold.clear();
    }
}

impl DiagramView for VoronoiDiagram {
    fn graph(&self) -> &HalfEdgeGraph {
        &self.g
    }

    fn far_radius(&self) -> f64 {
        self.far_radius
    }
}

// =============================================================================
// FREE GEOMETRY HELPERS
// =============================================================================

/// The bisector curve between an existing face's site and the new site,
/// running between two already-positioned NEW vertices.
fn bisector_curve(
    f_site: &Site,
    new_site: &Site,
    pa: Point,
    pb: Point,
    far_radius: f64,
) -> Result<EdgeCurve, InsertionError> {
    if pa.distance(pb) <= coincidence_tolerance(far_radius) {
        return Ok(EdgeCurve::null(pa));
    }
    match (f_site, new_site) {
        (Site::Point(_), Site::Point(_)) | (Site::Line(_), Site::Line(_)) => {
            Ok(EdgeCurve::line(pa, pb))
        }
        (Site::Point(p), Site::Line(l)) | (Site::Line(l), Site::Point(p)) => {
            ParabolaParams::from_sites(p.position, l, pa, pb)
                .map(EdgeCurve::Parabola)
                .ok_or_else(|| {
                    InsertionError::PositionerFailed(PositionerError::Degenerate {
                        message: format!(
                            "bisector of {} and a collinear segment degenerates",
                            p.position
                        ),
                    })
                })
        }
    }
}

/// Proper crossing test: the open interiors of the two segments intersect.
fn segments_cross(a: &LineSite, b: &LineSite, tolerance: f64) -> bool {
    let orient = |p: Point, q: Point, r: Point| (q - p).cross(r - p);
    let d1 = orient(a.start, a.end, b.start);
    let d2 = orient(a.start, a.end, b.end);
    let d3 = orient(b.start, b.end, a.start);
    let d4 = orient(b.start, b.end, a.end);
    let scale = a.length().max(b.length()).max(1.0) * tolerance;
    d1.abs() > scale
        && d2.abs() > scale
        && d3.abs() > scale
        && d4.abs() > scale
        && (d1 > 0.0) != (d2 > 0.0)
        && (d3 > 0.0) != (d4 > 0.0)
}

/// Do two collinear segments share more than an endpoint?
fn segments_overlap(a: &LineSite, b: &LineSite, tolerance: f64) -> bool {
    let lo = a.projection_parameter(b.start).min(a.projection_parameter(b.end));
    let hi = a.projection_parameter(b.start).max(a.projection_parameter(b.end));
    let margin = tolerance / a.length().max(f64::MIN_POSITIVE);
    lo < 1.0 - margin && hi > margin
}

/// Is `p` strictly inside `seg` (near the segment, away from both
/// endpoints)?
fn point_in_segment_interior(seg: &LineSite, p: Point, tolerance: f64) -> bool {
    seg.closest_point(p).distance(p) <= tolerance
        && p.distance(seg.start) > tolerance
        && p.distance(seg.end) > tolerance
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checker::check_edge_midpoints;
    use approx::assert_relative_eq;

    fn diagram() -> VoronoiDiagram {
        VoronoiDiagram::new(10.0, 32)
    }

    #[test]
    fn initial_frame_satisfies_every_invariant() {
        let vd = diagram();
        assert_eq!(vd.num_point_sites(), 0);
        assert_eq!(vd.num_line_sites(), 0);
        // one central vertex plus three outer vertices
        assert_eq!(vd.num_vertices(), 4);
        assert!(vd.is_valid().is_ok());
    }

    #[test]
    fn first_insertion_replaces_the_central_vertex() {
        let mut vd = diagram();
        let handle = vd.insert_point_site(Point::new(1.0, 2.0)).unwrap();
        assert_eq!(vd.num_point_sites(), 1);
        // the central vertex is gone; three NEW vertices ring the site
        assert_eq!(vd.num_vertices(), 6);
        assert!(vd.is_valid().is_ok());
        assert!(check_edge_midpoints(&vd).is_ok());
        assert!(handle > 3);
    }

    #[test]
    fn handles_are_monotonic() {
        let mut vd = diagram();
        let a = vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
        let b = vd.insert_point_site(Point::new(-1.0, 0.0)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn queue_orders_by_magnitude_with_fifo_ties() {
        let mut heap = BinaryHeap::new();
        let mut arena: slotmap::SlotMap<VertexKey, ()> = slotmap::SlotMap::with_key();
        let v1 = arena.insert(());
        let v2 = arena.insert(());
        let v3 = arena.insert(());
        heap.push(QueueEntry {
            magnitude: OrderedFloat(1.0),
            order: Reverse(1),
            predicate: OrderedFloat(-1.0),
            vertex: v1,
        });
        heap.push(QueueEntry {
            magnitude: OrderedFloat(2.5),
            order: Reverse(2),
            predicate: OrderedFloat(2.5),
            vertex: v2,
        });
        heap.push(QueueEntry {
            magnitude: OrderedFloat(1.0),
            order: Reverse(3),
            predicate: OrderedFloat(1.0),
            vertex: v3,
        });
        assert_eq!(heap.pop().unwrap().vertex, v2);
        // tie on magnitude: earlier insertion first
        assert_eq!(heap.pop().unwrap().vertex, v1);
        assert_eq!(heap.pop().unwrap().vertex, v3);
    }

    #[test]
    fn rejects_sites_outside_the_far_circle() {
        let mut vd = diagram();
        let err = vd.insert_point_site(Point::new(10.0, 0.0));
        assert!(matches!(err, Err(InsertionError::InvalidSite { .. })));
        let err = vd.insert_point_site(Point::new(12.0, 3.0));
        assert!(matches!(err, Err(InsertionError::InvalidSite { .. })));
        assert!(vd.is_valid().is_ok());
    }

    #[test]
    fn rejects_coincident_point_sites() {
        let mut vd = diagram();
        vd.insert_point_site(Point::new(1.0, 1.0)).unwrap();
        let err = vd.insert_point_site(Point::new(1.0, 1.0));
        assert!(matches!(err, Err(InsertionError::InvalidSite { .. })));
        assert_eq!(vd.num_point_sites(), 1);
        assert!(vd.is_valid().is_ok());
    }

    #[test]
    fn rejects_sites_on_existing_vertices() {
        let mut vd = diagram();
        vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
        vd.insert_point_site(Point::new(-1.0, 0.0)).unwrap();
        vd.insert_point_site(Point::new(0.0, 1.0)).unwrap();
        // (0, 0) is the Voronoi vertex of the three sites
        let err = vd.insert_point_site(Point::new(0.0, 0.0));
        assert!(matches!(err, Err(InsertionError::InvalidSite { .. })));
        assert!(vd.is_valid().is_ok());
    }

    #[test]
    fn rejects_degenerate_and_unknown_segments() {
        let mut vd = diagram();
        let a = vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
        assert!(matches!(
            vd.insert_line_site(a, a),
            Err(InsertionError::InvalidSite { .. })
        ));
        assert!(matches!(
            vd.insert_line_site(a, 999),
            Err(InsertionError::InvalidSite { .. })
        ));
        assert_eq!(vd.num_line_sites(), 0);
        assert!(vd.is_valid().is_ok());
    }

    #[test]
    fn rejects_crossing_segments() {
        let mut vd = diagram();
        let a = vd.insert_point_site(Point::new(-2.0, 0.0)).unwrap();
        let b = vd.insert_point_site(Point::new(2.0, 0.0)).unwrap();
        let c = vd.insert_point_site(Point::new(0.0, -2.0)).unwrap();
        let d = vd.insert_point_site(Point::new(0.0, 2.0)).unwrap();
        vd.insert_line_site(a, b).unwrap();
        assert!(matches!(
            vd.insert_line_site(c, d),
            Err(InsertionError::InvalidSite { .. })
        ));
        assert_eq!(vd.num_line_sites(), 1);
        assert!(vd.is_valid().is_ok());
    }

    #[test]
    fn failed_insertion_restores_all_statuses() {
        let mut vd = diagram();
        vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
        let _ = vd.insert_point_site(Point::new(1.0, 0.0));
        for (_, v) in vd.graph().vertices() {
            assert_eq!(v.status, VertexStatus::Undecided);
        }
        for (_, f) in vd.graph().faces() {
            assert_eq!(f.status, FaceStatus::Nonincident);
        }
    }

    #[test]
    fn segment_insertion_builds_two_faces_and_separators() {
        let mut vd = diagram();
        let a = vd.insert_point_site(Point::new(1.0, 1.0)).unwrap();
        let b = vd.insert_point_site(Point::new(1.0, -1.0)).unwrap();
        let faces_before = vd.graph().num_faces();
        vd.insert_line_site(a, b).unwrap();
        assert_eq!(vd.graph().num_faces(), faces_before + 2);
        assert_eq!(vd.num_line_sites(), 1);
        assert!(vd.is_valid().is_ok());
        assert!(check_edge_midpoints(&vd).is_ok());

        let kinds: Vec<VertexKind> = vd.graph().vertices().map(|(_, v)| v.kind).collect();
        assert_eq!(
            kinds.iter().filter(|k| **k == VertexKind::Endpoint).count(),
            2
        );
        assert!(kinds.iter().any(|k| *k == VertexKind::SepPoint));
        let separators = vd
            .graph()
            .edges()
            .filter(|(_, he)| he.curve.kind() == EdgeKind::Separator)
            .count();
        // two rays per endpoint, each a twin pair
        assert_eq!(separators, 8);
    }

    #[test]
    fn segment_endpoint_separators_lie_on_the_perpendicular() {
        let mut vd = diagram();
        let a = vd.insert_point_site(Point::new(1.0, 1.0)).unwrap();
        let b = vd.insert_point_site(Point::new(1.0, -1.0)).unwrap();
        vd.insert_line_site(a, b).unwrap();
        for (_, v) in vd.graph().vertices() {
            if v.kind == VertexKind::SepPoint {
                // separator lines of the vertical segment are y = 1 and y = -1
                assert_relative_eq!(v.position.y.abs(), 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn print_mentions_the_counters() {
        let mut vd = diagram();
        vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
        let dump = vd.print();
        assert!(dump.contains("point_sites=1"));
        assert!(dump.contains("face"));
    }

    #[test]
    fn version_is_the_crate_version() {
        let vd = diagram();
        assert_eq!(vd.version(), env!("CARGO_PKG_VERSION"));
    }
}
