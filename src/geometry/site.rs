//! Voronoi sites: the generators that faces grow around.
//!
//! A site is either a point or an oriented line segment, modeled as a tagged
//! variant rather than a trait-object hierarchy so the insertion algorithms
//! can dispatch by matching. Segment sites are oriented: the face they
//! generate lies on the **left** of the `start → end` direction, and the two
//! faces of one inserted segment carry the two opposite orientations.
//!
//! The geometric queries here are the ones the incremental engine consumes:
//! the closest point of the site to a query point ([`Site::apex_point`],
//! which makes the in-circle predicate uniform across site kinds), the
//! distance derived from it, and the perpendicular-slab test
//! ([`Site::in_region`]) that scopes segment flood fills.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::point::Point;

// =============================================================================
// SITE VARIANTS
// =============================================================================

/// A point generator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSite {
    /// Location of the generator.
    pub position: Point,
}

/// An oriented line-segment generator.
///
/// The generated face lies on the left of the `start → end` direction;
/// [`LineSite::normal`] points into that face.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSite {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
}

impl LineSite {
    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Unit direction from `start` to `end`.
    ///
    /// Returns `None` for a degenerate zero-length segment.
    #[must_use]
    pub fn direction(&self) -> Option<Point> {
        (self.end - self.start).normalized()
    }

    /// Oriented unit normal, pointing left of `start → end` (into the face
    /// this site generates). `None` for a degenerate segment.
    #[must_use]
    pub fn normal(&self) -> Option<Point> {
        self.direction().map(Point::perpendicular)
    }

    /// Parameter of the orthogonal projection of `p` onto the supporting
    /// line, with `start` at 0 and `end` at 1 (not clamped).
    #[must_use]
    pub fn projection_parameter(&self, p: Point) -> f64 {
        let d = self.end - self.start;
        let len_sq = d.norm_squared();
        if len_sq > 0.0 {
            (p - self.start).dot(d) / len_sq
        } else {
            0.0
        }
    }

    /// Closest point of the segment to `p` (projection clamped to the
    /// endpoints).
    #[must_use]
    pub fn closest_point(&self, p: Point) -> Point {
        let u = self.projection_parameter(p).clamp(0.0, 1.0);
        self.start.lerp(self.end, u)
    }

    /// True when both segments lie on the same supporting line, within
    /// `tolerance` of perpendicular deviation per unit length.
    #[must_use]
    pub fn collinear_with(&self, other: &LineSite, tolerance: f64) -> bool {
        let d = self.end - self.start;
        let n = d.norm();
        if n <= 0.0 {
            return false;
        }
        let deviation = |p: Point| (d.cross(p - self.start) / n).abs();
        deviation(other.start) <= tolerance && deviation(other.end) <= tolerance
    }
}

/// A Voronoi site: the generator of one face of the diagram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Site {
    /// A point generator.
    Point(PointSite),
    /// An oriented line-segment generator.
    Line(LineSite),
}

impl Site {
    /// Creates a point site.
    #[must_use]
    pub const fn point(position: Point) -> Self {
        Self::Point(PointSite { position })
    }

    /// Creates an oriented segment site with its face on the left of
    /// `start → end`.
    #[must_use]
    pub const fn line(start: Point, end: Point) -> Self {
        Self::Line(LineSite { start, end })
    }

    /// True for segment sites.
    #[must_use]
    pub const fn is_line(&self) -> bool {
        matches!(self, Self::Line(_))
    }

    /// True for point sites.
    #[must_use]
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Point(_))
    }

    /// The segment payload, if this is a segment site.
    #[must_use]
    pub const fn as_line(&self) -> Option<&LineSite> {
        match self {
            Self::Line(l) => Some(l),
            Self::Point(_) => None,
        }
    }

    /// Representative position used by the face grid: the point itself, or
    /// the segment midpoint.
    #[must_use]
    pub fn position(&self) -> Point {
        match self {
            Self::Point(p) => p.position,
            Self::Line(l) => l.start.lerp(l.end, 0.5),
        }
    }

    /// The closest point of the site to `p`.
    ///
    /// For a point site this is the site itself; for a segment it is the
    /// clamped orthogonal projection. Named after the apex of the parabolic
    /// bisector, whose extremum lies over exactly this point.
    #[must_use]
    pub fn apex_point(&self, p: Point) -> Point {
        match self {
            Self::Point(ps) => ps.position,
            Self::Line(l) => l.closest_point(p),
        }
    }

    /// Euclidean distance from `p` to the site.
    #[must_use]
    pub fn distance(&self, p: Point) -> f64 {
        p.distance(self.apex_point(p))
    }

    /// For segments: does `p` lie in the infinite slab spanned by the
    /// perpendiculars at the two endpoints? Always true for point sites.
    ///
    /// Seed searches for segment insertion restrict themselves to in-region
    /// vertices; outside the slab the segment is never closer than its own
    /// endpoint sites.
    #[must_use]
    pub fn in_region(&self, p: Point) -> bool {
        match self {
            Self::Point(_) => true,
            Self::Line(l) => {
                let u = l.projection_parameter(p);
                (0.0..=1.0).contains(&u)
            }
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(p) => write!(f, "PointSite{}", p.position),
            Self::Line(l) => write!(f, "LineSite[{} -> {}]", l.start, l.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_site_queries() {
        let s = Site::point(Point::new(2.0, 0.0));
        let q = Point::new(0.0, 0.0);
        assert!(s.is_point());
        assert_relative_eq!(s.distance(q), 2.0);
        assert_eq!(s.apex_point(q), Point::new(2.0, 0.0));
        assert!(s.in_region(q));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let s = Site::line(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        // inside the slab: perpendicular distance
        assert_relative_eq!(s.distance(Point::new(1.0, 3.0)), 3.0);
        // beyond an endpoint: distance to the endpoint
        assert_relative_eq!(s.distance(Point::new(5.0, 4.0)), 5.0);
    }

    #[test]
    fn slab_test() {
        let s = Site::line(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        assert!(s.in_region(Point::new(1.0, 5.0)));
        assert!(s.in_region(Point::new(0.0, -1.0)));
        assert!(!s.in_region(Point::new(-0.1, 0.0)));
        assert!(!s.in_region(Point::new(2.5, 1.0)));
    }

    #[test]
    fn orientation_normal_points_left() {
        let l = LineSite {
            start: Point::new(0.0, 0.0),
            end: Point::new(1.0, 0.0),
        };
        let n = l.normal().unwrap();
        assert_relative_eq!(n.x, 0.0);
        assert_relative_eq!(n.y, 1.0);
    }

    #[test]
    fn collinearity() {
        let a = LineSite {
            start: Point::new(0.0, 0.0),
            end: Point::new(2.0, 2.0),
        };
        let b = LineSite {
            start: Point::new(3.0, 3.0),
            end: Point::new(5.0, 5.0),
        };
        let c = LineSite {
            start: Point::new(0.0, 1.0),
            end: Point::new(2.0, 2.0),
        };
        assert!(a.collinear_with(&b, 1e-9));
        assert!(!a.collinear_with(&c, 1e-9));
    }

    #[test]
    fn degenerate_segment_has_no_direction() {
        let l = LineSite {
            start: Point::new(1.0, 1.0),
            end: Point::new(1.0, 1.0),
        };
        assert!(l.direction().is_none());
        assert!(l.normal().is_none());
    }
}
