//! Data and operations on Voronoi vertices.
//!
//! A vertex carries its position, its clearance radius (the common distance
//! to the sites of its incident faces), a transient status used only while
//! an insertion is in flight, a structural kind, and a monotonically
//! assigned index local to the owning graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::point::Point;
use crate::geometry::predicates::in_circle;
use crate::geometry::site::Site;

/// Transient per-insertion classification of a vertex.
///
/// Between insertions every vertex is `Undecided`; the other states exist
/// only while an insertion is rewriting the diagram.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexStatus {
    /// Not yet classified (the resting state).
    #[default]
    Undecided,
    /// Inside the new site's region; scheduled for deletion.
    In,
    /// Outside the new site's region; survives the insertion.
    Out,
    /// Created by the current insertion on the IN/OUT boundary.
    New,
}

impl fmt::Display for VertexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undecided => write!(f, "UNDECIDED"),
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
            Self::New => write!(f, "NEW"),
        }
    }
}

/// Structural kind of a vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexKind {
    /// Frame vertex beyond the far circle; never deleted.
    Outer,
    /// Ordinary Voronoi vertex.
    #[default]
    Normal,
    /// Isolated marker recording an inserted point site's position, the
    /// anchor for later segment insertion.
    PointSite,
    /// Vertex at a segment endpoint, where separators and the segment edges
    /// meet.
    Endpoint,
    /// Vertex lying on a separator line at a segment endpoint.
    SepPoint,
    /// Vertex at the extremum of a parabolic bisector, splitting it into
    /// monotone arcs.
    Apex,
    /// Scaffolding vertex splitting an edge that a degenerate collinear
    /// bisector would cross; normally removed before the insertion ends.
    Split,
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outer => write!(f, "OUTER"),
            Self::Normal => write!(f, "NORMAL"),
            Self::PointSite => write!(f, "POINTSITE"),
            Self::Endpoint => write!(f, "ENDPOINT"),
            Self::SepPoint => write!(f, "SEPPOINT"),
            Self::Apex => write!(f, "APEX"),
            Self::Split => write!(f, "SPLIT"),
        }
    }
}

/// One vertex of the Voronoi diagram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoronoiVertex {
    /// Position in the plane.
    pub position: Point,
    /// Distance to the nearest site (common to all incident faces).
    pub clearance: f64,
    /// Transient insertion status; `Undecided` between insertions.
    pub status: VertexStatus,
    /// Structural kind.
    pub kind: VertexKind,
    /// Monotonic index assigned by the owning graph at creation.
    pub index: u32,
}

impl VoronoiVertex {
    /// Signed in-circle predicate of this vertex against a candidate site.
    ///
    /// Positive when the candidate is strictly closer than the vertex's
    /// clearance (the vertex must be deleted), negative when the vertex
    /// survives; the magnitude is the numerical confidence.
    #[must_use]
    pub fn in_circle(&self, site: &Site) -> f64 {
        in_circle(self.position, self.clearance, site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex_at(position: Point, clearance: f64) -> VoronoiVertex {
        VoronoiVertex {
            position,
            clearance,
            status: VertexStatus::default(),
            kind: VertexKind::default(),
            index: 0,
        }
    }

    #[test]
    fn defaults_are_the_resting_state() {
        let v = vertex_at(Point::origin(), 1.0);
        assert_eq!(v.status, VertexStatus::Undecided);
        assert_eq!(v.kind, VertexKind::Normal);
    }

    #[test]
    fn in_circle_delegates_to_the_predicate() {
        let v = vertex_at(Point::origin(), 2.0);
        assert_relative_eq!(v.in_circle(&Site::point(Point::new(1.0, 0.0))), 1.0);
        assert!(v.in_circle(&Site::point(Point::new(5.0, 0.0))) < 0.0);
    }

    #[test]
    fn display_matches_diagram_dump_vocabulary() {
        assert_eq!(VertexStatus::In.to_string(), "IN");
        assert_eq!(VertexKind::SepPoint.to_string(), "SEPPOINT");
    }
}
