//! Post-insertion sanity audit of the diagram.
//!
//! The checker sees the diagram only through the read-only [`DiagramView`]
//! trait, which exposes the same adjacency and attribute queries the
//! insertion code itself uses — no privileged access. It verifies every
//! structural invariant the engine promises to restore after each insertion:
//!
//! - twin and next consistency on every half-edge, with closed face cycles;
//! - a single closed outer boundary cycle beyond the far-circle frame;
//! - vertex degrees (≥ 2, with isolated point-site markers exempt);
//! - fully reset statuses (every vertex `Undecided`, every face
//!   `Nonincident`);
//! - clearance agreement: each vertex is equidistant, within tolerance, from
//!   the sites of all its incident faces;
//! - the Euler characteristic `V − E + F = 2` of the planar subdivision.
//!
//! [`check_edge_midpoints`] is the more expensive Voronoi-property audit used
//! by tests: each edge's midpoint must be closer to its two bordering sites
//! than to any third.

use thiserror::Error;

use super::half_edge_graph::{EdgeKey, FaceKey, HalfEdgeGraph};
use super::vertex::{VertexKind, VertexStatus};
use crate::core::collections::FastHashSet;
use crate::core::face::FaceStatus;

/// Relative tolerance for clearance and equidistance comparisons.
const AUDIT_TOLERANCE: f64 = 1e-6;

/// Read-only view of a diagram, the checker's only window into it.
pub trait DiagramView {
    /// The half-edge graph.
    fn graph(&self) -> &HalfEdgeGraph;
    /// Radius of the far circle all sites lie inside.
    fn far_radius(&self) -> f64;
}

/// Invariant violations found by the checker.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DiagramValidationError {
    /// A half-edge's twin pairing is broken.
    #[error("half-edge {edge:?} has a broken twin pairing")]
    BrokenTwin {
        /// The offending half-edge.
        edge: EdgeKey,
    },
    /// A next pointer is unlinked or disagrees with the twin structure.
    #[error("half-edge {edge:?} has a broken next link: {message}")]
    BrokenNext {
        /// The offending half-edge.
        edge: EdgeKey,
        /// What was wrong.
        message: String,
    },
    /// A face's boundary walk does not return to its starting edge.
    #[error("face {face:?} boundary cycle does not close")]
    UnclosedFaceCycle {
        /// The offending face.
        face: FaceKey,
    },
    /// The outer boundary beyond the frame is not one closed cycle.
    #[error("outer boundary is not a single closed cycle")]
    OuterBoundaryBroken,
    /// A vertex has fewer incident edges than a planar subdivision allows.
    #[error("vertex {index} has degree {degree}, expected at least 2")]
    DegreeTooLow {
        /// Monotonic index of the vertex.
        index: u32,
        /// Its degree.
        degree: usize,
    },
    /// A vertex status was not reset after the insertion.
    #[error("vertex {index} still has status {status}")]
    StatusNotReset {
        /// Monotonic index of the vertex.
        index: u32,
        /// The leftover status.
        status: VertexStatus,
    },
    /// A face incidence flag was not reset after the insertion.
    #[error("face {face:?} is still marked incident")]
    IncidenceNotReset {
        /// The offending face.
        face: FaceKey,
    },
    /// A vertex is not equidistant from the sites of its incident faces.
    #[error(
        "vertex {index} clearance {clearance} disagrees with distance {distance} to an incident site"
    )]
    ClearanceMismatch {
        /// Monotonic index of the vertex.
        index: u32,
        /// Stored clearance radius.
        clearance: f64,
        /// Measured distance to the disagreeing site.
        distance: f64,
    },
    /// The subdivision does not satisfy Euler's formula.
    #[error("Euler characteristic is {characteristic}, expected 2")]
    EulerCharacteristic {
        /// The computed `V - E + F`.
        characteristic: i64,
    },
    /// An edge midpoint is closer to a third site than to its own faces'.
    #[error("edge {edge:?} midpoint violates the nearest-site property")]
    MidpointNotNearest {
        /// The offending half-edge.
        edge: EdgeKey,
    },
    /// The incremental update left the topology in an inconsistent state.
    #[error("topology corrupted: {message}")]
    TopologyCorrupted {
        /// What the update found inconsistent.
        message: String,
    },
}

/// Runs the full structural audit.
///
/// # Errors
///
/// The first invariant violation found, as a [`DiagramValidationError`].
pub fn is_valid(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    check_edges(view)?;
    check_faces(view)?;
    check_outer_boundary(view)?;
    check_vertices(view)?;
    check_clearances(view)?;
    check_euler(view)
}

fn check_edges(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    for (e, he) in g.edges() {
        let Some(twin) = g.try_edge(he.twin) else {
            return Err(DiagramValidationError::BrokenTwin { edge: e });
        };
        if twin.twin != e || he.twin == e {
            return Err(DiagramValidationError::BrokenTwin { edge: e });
        }
        let Some(next) = g.try_edge(he.next) else {
            return Err(DiagramValidationError::BrokenNext {
                edge: e,
                message: "next pointer is unlinked".to_string(),
            });
        };
        if next.source != twin.source {
            return Err(DiagramValidationError::BrokenNext {
                edge: e,
                message: "next edge does not start at this edge's target".to_string(),
            });
        }
        if next.face != he.face {
            return Err(DiagramValidationError::BrokenNext {
                edge: e,
                message: "next edge belongs to a different face".to_string(),
            });
        }
    }
    Ok(())
}

fn check_faces(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    for (f, face) in g.faces() {
        if face.status != FaceStatus::Nonincident {
            return Err(DiagramValidationError::IncidenceNotReset { face: f });
        }
        let start = face.edge;
        if g.try_edge(start).is_none() {
            return Err(DiagramValidationError::UnclosedFaceCycle { face: f });
        }
        let mut e = start;
        let mut closed = false;
        for _ in 0..=g.num_half_edges() {
            if g.edge(e).face != Some(f) {
                return Err(DiagramValidationError::UnclosedFaceCycle { face: f });
            }
            e = g.next(e);
            if e == start {
                closed = true;
                break;
            }
        }
        if !closed {
            return Err(DiagramValidationError::UnclosedFaceCycle { face: f });
        }
    }
    Ok(())
}

fn check_outer_boundary(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    let outer: Vec<EdgeKey> = g
        .edges()
        .filter(|(_, he)| he.face.is_none())
        .map(|(e, _)| e)
        .collect();
    let Some(&start) = outer.first() else {
        return Err(DiagramValidationError::OuterBoundaryBroken);
    };
    let mut visited: FastHashSet<EdgeKey> = FastHashSet::default();
    let mut e = start;
    for _ in 0..=outer.len() {
        if !visited.insert(e) {
            break;
        }
        e = g.next(e);
    }
    if e == start && visited.len() == outer.len() {
        Ok(())
    } else {
        Err(DiagramValidationError::OuterBoundaryBroken)
    }
}

fn check_vertices(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    for (v, vertex) in g.vertices() {
        if vertex.status != VertexStatus::Undecided {
            return Err(DiagramValidationError::StatusNotReset {
                index: vertex.index,
                status: vertex.status,
            });
        }
        let degree = g.vertex_degree(v);
        if vertex.kind == VertexKind::PointSite {
            continue; // isolated marker anchors
        }
        if degree < 2 {
            return Err(DiagramValidationError::DegreeTooLow {
                index: vertex.index,
                degree,
            });
        }
    }
    Ok(())
}

fn check_clearances(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    for (v, vertex) in g.vertices() {
        for f in g.vertex_faces(v) {
            let distance = g.face(f).site.distance(vertex.position);
            let tolerance = AUDIT_TOLERANCE * vertex.clearance.abs().max(1.0);
            if (distance - vertex.clearance).abs() > tolerance {
                return Err(DiagramValidationError::ClearanceMismatch {
                    index: vertex.index,
                    clearance: vertex.clearance,
                    distance,
                });
            }
        }
    }
    Ok(())
}

fn check_euler(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    let markers = g
        .vertices()
        .filter(|(_, v)| v.kind == VertexKind::PointSite)
        .count();
    let v = (g.num_vertices() - markers) as i64;
    let e = (g.num_half_edges() / 2) as i64;
    // the unbounded outer region counts as a face
    let f = g.num_faces() as i64 + 1;
    let characteristic = v - e + f;
    if characteristic == 2 {
        Ok(())
    } else {
        Err(DiagramValidationError::EulerCharacteristic { characteristic })
    }
}

/// Voronoi-property audit: every edge midpoint must be closer to its two
/// bordering sites than to any third site. O(edges × faces); meant for
/// tests.
///
/// # Errors
///
/// [`DiagramValidationError::MidpointNotNearest`] for the first violating
/// edge.
pub fn check_edge_midpoints(view: &impl DiagramView) -> Result<(), DiagramValidationError> {
    let g = view.graph();
    for (e, he) in g.edges() {
        let (Some(f1), Some(f2)) = (he.face, g.edge(he.twin).face) else {
            continue; // frame chords border the unbounded region
        };
        let m = he.curve.point(0.5);
        let d1 = g.face(f1).site.distance(m);
        let d2 = g.face(f2).site.distance(m);
        let tolerance = AUDIT_TOLERANCE * d1.max(1.0);
        if (d1 - d2).abs() > tolerance {
            return Err(DiagramValidationError::MidpointNotNearest { edge: e });
        }
        for (f3, face) in g.faces() {
            if f3 == f1 || f3 == f2 {
                continue;
            }
            if face.site.distance(m) < d1 - tolerance {
                return Err(DiagramValidationError::MidpointNotNearest { edge: e });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagram::VoronoiDiagram;
    use crate::geometry::point::Point;

    #[test]
    fn freshly_initialized_diagram_is_valid() {
        let vd = VoronoiDiagram::new(10.0, 16);
        assert!(is_valid(&vd).is_ok());
        assert!(check_edge_midpoints(&vd).is_ok());
    }

    #[test]
    fn diagram_after_insertions_is_valid() {
        let mut vd = VoronoiDiagram::new(10.0, 16);
        vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
        vd.insert_point_site(Point::new(-1.0, 0.0)).unwrap();
        vd.insert_point_site(Point::new(0.0, 1.0)).unwrap();
        assert!(is_valid(&vd).is_ok());
        assert!(check_edge_midpoints(&vd).is_ok());
    }
}
