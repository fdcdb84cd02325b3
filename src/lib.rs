//! # voronoi
//!
//! Incremental Voronoi diagrams of planar point and line-segment sites,
//! bounded by a circular domain of configurable radius.
//!
//! The diagram is built site by site. Each insertion locates the affected
//! region through a nearest-face grid, flood-fills the set of Voronoi
//! vertices that cannot survive the new site — ordered by the magnitude of a
//! signed in-circle predicate, so the numerically certain decisions happen
//! first and the topological predicates C4/C5 settle the near-zero ones —
//! then positions new vertices on the region boundary and re-stitches the
//! half-edge topology around the new face(s).
//!
//! # Basic usage
//!
//! ```rust
//! use voronoi::prelude::*;
//!
//! // all sites must lie strictly inside the far circle (radius 10 here)
//! let mut vd = VoronoiDiagram::new(10.0, 50);
//!
//! let a = vd.insert_point_site(Point::new(1.0, 0.0)).unwrap();
//! let b = vd.insert_point_site(Point::new(-1.0, 0.0)).unwrap();
//! let c = vd.insert_point_site(Point::new(0.0, 1.0)).unwrap();
//! assert_eq!(vd.num_point_sites(), 3);
//!
//! // segments connect previously inserted point sites by handle
//! vd.insert_line_site(a, b).unwrap();
//! assert_eq!(vd.num_line_sites(), 1);
//!
//! // the full invariant audit is available at any time
//! assert!(vd.is_valid().is_ok());
//! # let _ = c;
//! ```
//!
//! # Structural invariants
//!
//! After every successful insertion the engine re-establishes, and
//! [`core::checker`] audits:
//!
//! - **Twin/next consistency** — `twin(twin(e)) = e` and every face is a
//!   closed cycle of half-edges;
//! - **One outer boundary** — the half-edges beyond the far-circle frame
//!   form a single closed cycle (the unbounded face equivalent);
//! - **Degrees** — every topological vertex has degree ≥ 2 (isolated
//!   point-site markers anchor segment insertion and are exempt);
//! - **Quiescence** — every vertex status is `UNDECIDED` and every face is
//!   `NONINCIDENT` between insertions;
//! - **Clearance agreement** — each vertex is equidistant, within
//!   tolerance, from the sites of all faces meeting at it;
//! - **Euler characteristic** — `V − E + F = 2`, counting the outer face.
//!
//! Failed insertions are transactional for recoverable errors (invalid
//! input, undecidable predicate, positioner failure): the diagram is
//! restored to its pre-insertion state and the error is returned.
//!
//! # References
//!
//! - Held, M. "VRONI: An engineering approach to the reliable and efficient
//!   computation of Voronoi diagrams of points and line segments."
//!   Computational Geometry 18.2 (2001): 95-123
//! - Sugihara, K., and Iri, M. "Construction of the Voronoi diagram for
//!   'one million' generators in single-precision arithmetic." Proceedings
//!   of the IEEE 80.9 (1992): 1471-1484

#![forbid(unsafe_code)]

/// Core data structures and the incremental insertion engine.
pub mod core {
    /// Collection aliases for hot paths.
    pub mod collections;
    /// Post-insertion invariant audit over a read-only diagram view.
    pub mod checker;
    /// The incremental Voronoi diagram engine.
    pub mod diagram;
    /// Half-edges and parametric curve geometry.
    pub mod edge;
    /// Faces and their incidence flag.
    pub mod face;
    /// Nearest-face bucket grid for seeding insertions.
    pub mod face_grid;
    /// Arena-backed half-edge planar subdivision.
    pub mod half_edge_graph;
    /// Voronoi vertices and their attributes.
    pub mod vertex;

    pub use checker::*;
    pub use diagram::*;
    pub use edge::*;
    pub use face::*;
    pub use face_grid::*;
    pub use half_edge_graph::*;
    pub use vertex::*;
}

/// Geometric primitives, sites, predicates, and solvers.
pub mod geometry {
    /// Planar points and vectors.
    pub mod point;
    /// Vertex positioning by bisector intersection.
    pub mod positioner;
    /// The signed in-circle predicate.
    pub mod predicates;
    /// Bracketed 1-D root finding.
    pub mod root_finding;
    /// Point and line-segment sites.
    pub mod site;

    pub use point::*;
    pub use positioner::*;
    pub use predicates::*;
    pub use root_finding::*;
    pub use site::*;
}

/// Re-exports of the commonly used types.
pub mod prelude {
    pub use crate::core::{
        checker::{check_edge_midpoints, is_valid, DiagramValidationError, DiagramView},
        diagram::{InsertionError, VoronoiDiagram},
        edge::{EdgeCurve, EdgeKind},
        face::FaceStatus,
        half_edge_graph::{EdgeKey, FaceKey, HalfEdgeGraph, VertexKey},
        vertex::{VertexKind, VertexStatus, VoronoiVertex},
    };
    pub use crate::geometry::{
        point::Point,
        site::{LineSite, PointSite, Site},
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn is_normal<T: Sized + Send + Sync + Unpin>() {}

    #[test]
    fn public_types_are_normal() {
        is_normal::<Point>();
        is_normal::<Site>();
        is_normal::<VoronoiVertex>();
        is_normal::<VoronoiDiagram>();
        is_normal::<InsertionError>();
    }

    #[test]
    fn prelude_covers_the_basic_workflow() {
        let mut vd = VoronoiDiagram::new(5.0, 10);
        let h = vd.insert_point_site(Point::new(0.5, 0.5)).unwrap();
        assert!(h > 3);
        assert_eq!(vd.num_point_sites(), 1);
        assert!(is_valid(&vd).is_ok());
    }
}
