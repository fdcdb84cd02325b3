//! The signed in-circle predicate that drives the flood fill.
//!
//! For a Voronoi vertex `v` with clearance radius `r(v)` (the common distance
//! to the sites of its incident faces) and a candidate site `s`, the
//! predicate is
//!
//! ```text
//! h(v, s) = r(v) − distance(v, s)
//! ```
//!
//! - `h > 0`: `s` is strictly closer to `v` than `v`'s defining sites; `v`
//!   cannot remain a Voronoi vertex and is a deletion candidate (IN).
//! - `h < 0`: `v` keeps its clearance circle empty; it stays (OUT).
//! - `h ≈ 0`: `v` lies on the boundary circle; the decision is numerically
//!   uncertain and is deferred by the magnitude-ordered queue until the
//!   topological predicates can resolve it.
//!
//! The distance form works uniformly for every site-kind combination because
//! [`Site::apex_point`] clamps segment projections, so only the sign
//! convention matters to callers; the magnitude is the confidence consumed by
//! the priority queue.

use super::point::Point;
use super::site::Site;

/// Signed in-circle predicate of a vertex against a candidate site.
///
/// `position` and `clearance` are the vertex attributes; see the module docs
/// for the sign convention.
#[must_use]
pub fn in_circle(position: Point, clearance: f64, site: &Site) -> f64 {
    clearance - site.distance(position)
}

/// Tolerance scale for coincidence and undecidability tests, relative to the
/// diagram extent.
#[must_use]
pub fn coincidence_tolerance(far_radius: f64) -> f64 {
    1e-10 * far_radius.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sign_convention_point_site() {
        // vertex at origin with clearance 2
        let inside = Site::point(Point::new(1.0, 0.0));
        let outside = Site::point(Point::new(5.0, 0.0));
        let boundary = Site::point(Point::new(0.0, 2.0));
        assert!(in_circle(Point::origin(), 2.0, &inside) > 0.0);
        assert!(in_circle(Point::origin(), 2.0, &outside) < 0.0);
        assert_relative_eq!(in_circle(Point::origin(), 2.0, &boundary), 0.0);
    }

    #[test]
    fn segment_site_uses_clamped_distance() {
        let seg = Site::line(Point::new(3.0, -1.0), Point::new(3.0, 1.0));
        // distance from origin to the segment is 3 (perpendicular foot in-slab)
        assert_relative_eq!(in_circle(Point::origin(), 4.0, &seg), 1.0);
        // beyond the slab the endpoint distance governs
        let q = Point::new(3.0, 5.0);
        assert_relative_eq!(in_circle(q, 5.0, &seg), 1.0);
    }
}
