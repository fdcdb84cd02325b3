//! Vertex positioning: solving bisector intersections for new Voronoi
//! vertices.
//!
//! A NEW vertex lives on an existing bisector edge, at the point equidistant
//! from the edge's two defining sites and the site being inserted. When all
//! three sites are points this is the classical circumcenter, solved in
//! closed form. Any combination involving a segment is solved by sliding
//! along the hint edge's parametric curve with the bracketed root finder:
//! the IN endpoint of a crossing edge is strictly closer to the new site
//! than its clearance and the OUT endpoint strictly farther, so the two
//! parameter ends bracket the root by construction.

use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

use super::point::Point;
use super::root_finding::{brent, RootFindingError, DEFAULT_MAX_ITERATIONS};
use super::site::Site;
use crate::core::edge::EdgeCurve;

/// Slack allowed when checking that a solution parameter falls on the hint
/// edge.
const PARAMETER_SLACK: f64 = 1e-7;

/// Errors from vertex positioning.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PositionerError {
    /// The three defining sites admit no unique equidistant point.
    #[error("degenerate site configuration: {message}")]
    Degenerate {
        /// What made the configuration degenerate.
        message: String,
    },
    /// The solution does not lie on the hint edge.
    #[error("solution parameter {t} falls outside the hint edge")]
    OutOfRange {
        /// The offending parameter value.
        t: f64,
    },
    /// The 1-D solve along the hint edge failed.
    #[error("root finding failed: {0}")]
    RootFinding(#[from] RootFindingError),
}

/// A positioned Voronoi vertex: where it sits, its clearance radius, and the
/// parameter on the hint edge it was found at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Solution {
    /// Vertex position.
    pub position: Point,
    /// Common distance to the three defining sites.
    pub clearance: f64,
    /// Parameter on the hint edge, in `[0, 1]`.
    pub t: f64,
}

/// Solver for new vertex positions.
#[derive(Clone, Copy, Debug)]
pub struct VertexPositioner {
    root_tolerance: f64,
    coincidence_tolerance: f64,
}

impl VertexPositioner {
    /// Creates a positioner scaled to the diagram extent.
    #[must_use]
    pub fn new(far_radius: f64) -> Self {
        let scale = far_radius.max(1.0);
        Self {
            root_tolerance: 1e-13 * scale,
            coincidence_tolerance: 1e-10 * scale,
        }
    }

    /// Positions the vertex equidistant from `site_a`, `site_b`, and
    /// `new_site` on the bisector edge `curve` (which separates the faces of
    /// `site_a` and `site_b`).
    ///
    /// When the new site is a segment and the edge borders the face of one of
    /// its endpoint point sites, the equidistance equation degenerates (the
    /// whole half-plane beyond the endpoint ties), so the vertex is placed
    /// where the edge crosses the separator line instead.
    ///
    /// # Errors
    ///
    /// [`PositionerError::Degenerate`] for configurations without a unique
    /// solution, [`PositionerError::OutOfRange`] when the solution misses the
    /// hint edge, [`PositionerError::RootFinding`] when the 1-D solve fails.
    pub fn position(
        &self,
        curve: &EdgeCurve,
        site_a: &Site,
        site_b: &Site,
        new_site: &Site,
    ) -> Result<Solution, PositionerError> {
        if let Some(solution) = self.position_on_separator(curve, site_a, site_b, new_site)? {
            return Ok(solution);
        }
        if let (Site::Point(a), Site::Point(b), Site::Point(n)) = (site_a, site_b, new_site) {
            let center = circumcenter(a.position, b.position, n.position)?;
            let t = curve.parameter_of(center);
            if !(-PARAMETER_SLACK..=1.0 + PARAMETER_SLACK).contains(&t) {
                return Err(PositionerError::OutOfRange { t });
            }
            return Ok(Solution {
                position: center,
                clearance: center.distance(a.position),
                t: t.clamp(0.0, 1.0),
            });
        }

        let t = self.position_on_edge(curve, site_a, new_site)?;
        let position = curve.point(t);
        Ok(Solution {
            position,
            clearance: site_a.distance(position),
            t,
        })
    }

    /// Separator placement: when `new_site` is a segment and either face
    /// site is the point site at one of its endpoints, the new vertex sits
    /// where the hint edge crosses the perpendicular through that endpoint.
    fn position_on_separator(
        &self,
        curve: &EdgeCurve,
        site_a: &Site,
        site_b: &Site,
        new_site: &Site,
    ) -> Result<Option<Solution>, PositionerError> {
        let Site::Line(seg) = new_site else {
            return Ok(None);
        };
        let Some(dir) = seg.direction() else {
            return Ok(None);
        };
        for endpoint in [seg.start, seg.end] {
            let owns_endpoint = [site_a, site_b].iter().any(|s| {
                matches!(s, Site::Point(ps)
                    if ps.position.distance(endpoint) <= self.coincidence_tolerance)
            });
            if !owns_endpoint {
                continue;
            }
            // signed position along the segment axis, zero on the separator
            let along = |t: f64| (curve.point(t) - endpoint).dot(dir);
            let (g0, g1) = (along(0.0), along(1.0));
            if g0 != 0.0 && g1 != 0.0 && g0.signum() == g1.signum() {
                continue;
            }
            let t = brent(along, 0.0, 1.0, self.root_tolerance, DEFAULT_MAX_ITERATIONS)?;
            let position = curve.point(t);
            return Ok(Some(Solution {
                position,
                clearance: position.distance(endpoint),
                t: t.clamp(0.0, 1.0),
            }));
        }
        Ok(None)
    }

    /// Finds the parameter on `curve` where the distance to `new_site`
    /// equals the distance to `site_a` (one of the edge's defining sites).
    ///
    /// # Errors
    ///
    /// [`PositionerError::RootFinding`] when the endpoint values do not
    /// bracket a root or the solve fails to converge.
    pub fn position_on_edge(
        &self,
        curve: &EdgeCurve,
        site_a: &Site,
        new_site: &Site,
    ) -> Result<f64, PositionerError> {
        let f = |t: f64| {
            let p = curve.point(t);
            new_site.distance(p) - site_a.distance(p)
        };
        let t = brent(f, 0.0, 1.0, self.root_tolerance, DEFAULT_MAX_ITERATIONS)?;
        Ok(t.clamp(0.0, 1.0))
    }
}

/// Circumcenter of three points, via the 2×2 linear system of the two
/// perpendicular-bisector equations.
fn circumcenter(a: Point, b: Point, c: Point) -> Result<Point, PositionerError> {
    let m = Matrix2::new(
        2.0 * (b.x - a.x),
        2.0 * (b.y - a.y),
        2.0 * (c.x - a.x),
        2.0 * (c.y - a.y),
    );
    let rhs = Vector2::new(
        b.norm_squared() - a.norm_squared(),
        c.norm_squared() - a.norm_squared(),
    );
    m.lu()
        .solve(&rhs)
        .map(|x| Point::new(x[0], x[1]))
        .ok_or_else(|| PositionerError::Degenerate {
            message: format!("collinear sites {a}, {b}, {c}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::site::LineSite;
    use approx::assert_relative_eq;

    #[test]
    fn circumcenter_of_reference_triangle() {
        let c = circumcenter(
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            Point::new(0.0, 1.0),
        )
        .unwrap();
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let err = circumcenter(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!(matches!(err, Err(PositionerError::Degenerate { .. })));
    }

    #[test]
    fn point_point_point_solution_on_edge() {
        // hint edge on the bisector of (-1,0) and (1,0)
        let curve = EdgeCurve::line(Point::new(0.0, -3.0), Point::new(0.0, 3.0));
        let a = Site::point(Point::new(-1.0, 0.0));
        let b = Site::point(Point::new(1.0, 0.0));
        let n = Site::point(Point::new(0.0, 2.0));
        let pos = VertexPositioner::new(10.0);
        let sol = pos.position(&curve, &a, &b, &n).unwrap();
        assert_relative_eq!(sol.position.y, 0.75, epsilon = 1e-12);
        assert_relative_eq!(sol.t, 0.625, epsilon = 1e-12);
        assert_relative_eq!(sol.clearance, Point::new(0.0, 0.75).distance(Point::new(1.0, 0.0)));
    }

    #[test]
    fn solution_off_the_edge_is_rejected() {
        let curve = EdgeCurve::line(Point::new(0.0, 10.0), Point::new(0.0, 20.0));
        let a = Site::point(Point::new(-1.0, 0.0));
        let b = Site::point(Point::new(1.0, 0.0));
        let n = Site::point(Point::new(0.0, 2.0));
        let pos = VertexPositioner::new(10.0);
        assert!(matches!(
            pos.position(&curve, &a, &b, &n),
            Err(PositionerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn endpoint_face_crossing_lands_on_the_separator() {
        // vertical segment; the separator at its start endpoint is y = 1
        let seg = LineSite {
            start: Point::new(1.0, 1.0),
            end: Point::new(1.0, -1.0),
        };
        let curve = EdgeCurve::line(Point::new(1.5, 0.5), Point::new(2.0, 2.0));
        let endpoint_face = Site::point(Point::new(1.0, 1.0));
        let other = Site::point(Point::new(4.0, 4.0));
        let pos = VertexPositioner::new(10.0);
        let sol = pos
            .position(&curve, &endpoint_face, &other, &Site::Line(seg))
            .unwrap();
        assert_relative_eq!(sol.position.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(sol.t, 1.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(sol.clearance, sol.position.x - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn segment_case_slides_along_parabola() {
        // parabola with focus (0,1) over directrix y = 0, arc x in [-1, 1]
        let seg = LineSite {
            start: Point::new(-5.0, 0.0),
            end: Point::new(5.0, 0.0),
        };
        let curve = EdgeCurve::Parabola(
            crate::core::edge::ParabolaParams::from_sites(
                Point::new(0.0, 1.0),
                &seg,
                Point::new(-1.0, 1.0),
                Point::new(1.0, 1.0),
            )
            .unwrap(),
        );
        let focus_site = Site::point(Point::new(0.0, 1.0));
        let new_site = Site::point(Point::new(1.0, 1.0));
        let pos = VertexPositioner::new(10.0);
        let sol = pos.position(&curve, &focus_site, &Site::Line(seg), &new_site).unwrap();
        assert_relative_eq!(sol.t, 0.75, epsilon = 1e-9);
        assert_relative_eq!(sol.position.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(sol.position.y, 0.625, epsilon = 1e-9);
    }
}
