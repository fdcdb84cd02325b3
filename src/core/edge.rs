//! Half-edges and their parametric curve geometry.
//!
//! Every edge of the diagram is stored as a pair of directed half-edges with
//! mutual `twin` references. A half-edge knows its source vertex, the next
//! half-edge around its face, its owning face (`None` beyond the far-circle
//! frame, the unbounded outer face equivalent), and the parametric curve it
//! lies on.
//!
//! Curves are evaluated through [`EdgeCurve::point`] with `t ∈ [0, 1]` from
//! the half-edge's source to its target. Point/point and segment/segment
//! bisectors are straight ([`EdgeCurve::Line`]); point/segment bisectors are
//! parabolic arcs parameterized by position along the directrix; separators
//! and the edges lying on a segment site itself are straight with their own
//! kinds; zero-length connections between coincident vertices are
//! [`EdgeCurve::Null`].

use serde::{Deserialize, Serialize};

use super::half_edge_graph::{EdgeKey, FaceKey, VertexKey};
use crate::geometry::point::Point;
use crate::geometry::site::LineSite;

// =============================================================================
// CURVE GEOMETRY
// =============================================================================

/// Geometric kind of an edge, exposed for queries and audits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Straight bisector (point/point or segment/segment).
    Line,
    /// Parabolic bisector (point/segment).
    Parabola,
    /// Separator ray at a segment endpoint.
    Separator,
    /// Edge lying on a segment site, joining its two faces.
    LineSite,
    /// Zero-length edge between coincident vertices.
    Null,
}

/// Endpoints of a straight curve segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineParams {
    /// Position at `t = 0`.
    pub p0: Point,
    /// Position at `t = 1`.
    pub p1: Point,
}

/// A parabolic bisector arc between a focus (point site) and a directrix
/// (the supporting line of a segment site).
///
/// Points are generated from the directrix parameter `u` (arc position along
/// the directrix, with the perpendicular offset determined by the parabola
/// equation); `t ∈ [0, 1]` maps linearly onto `[u0, u1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParabolaParams {
    /// The focus of the parabola (the point site).
    pub focus: Point,
    /// A point on the directrix line.
    pub directrix_origin: Point,
    /// Unit direction of the directrix line.
    pub directrix_dir: Point,
    /// Directrix parameter of the focus foot point.
    pub focus_u: f64,
    /// Signed perpendicular distance from the directrix to the focus.
    pub focus_offset: f64,
    /// Directrix parameter at `t = 0`.
    pub u0: f64,
    /// Directrix parameter at `t = 1`.
    pub u1: f64,
}

impl ParabolaParams {
    /// Builds the arc of the bisector of `focus` and `seg` running from
    /// `p_start` to `p_end` (both already equidistant from the two sites).
    ///
    /// Returns `None` when the segment is degenerate or the focus lies on
    /// its supporting line (the bisector degenerates; split vertices handle
    /// that case).
    #[must_use]
    pub fn from_sites(focus: Point, seg: &LineSite, p_start: Point, p_end: Point) -> Option<Self> {
        let dir = seg.direction()?;
        let normal = dir.perpendicular();
        let origin = seg.start;
        let focus_offset = (focus - origin).dot(normal);
        if focus_offset.abs() <= f64::EPSILON * (1.0 + focus.norm()) {
            return None;
        }
        Some(Self {
            focus,
            directrix_origin: origin,
            directrix_dir: dir,
            focus_u: (focus - origin).dot(dir),
            focus_offset,
            u0: (p_start - origin).dot(dir),
            u1: (p_end - origin).dot(dir),
        })
    }

    /// Perpendicular offset of the parabola over directrix parameter `u`.
    #[must_use]
    pub fn offset(&self, u: f64) -> f64 {
        let w = u - self.focus_u;
        (w * w + self.focus_offset * self.focus_offset) / (2.0 * self.focus_offset)
    }

    /// Point on the parabola at directrix parameter `u`.
    #[must_use]
    pub fn point_at(&self, u: f64) -> Point {
        self.directrix_origin
            + self.directrix_dir * u
            + self.directrix_dir.perpendicular() * self.offset(u)
    }

    fn u_of_t(&self, t: f64) -> f64 {
        self.u0 + (self.u1 - self.u0) * t
    }
}

/// Parametric curve of a half-edge, evaluated from source to target over
/// `t ∈ [0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EdgeCurve {
    /// Straight bisector.
    Line(LineParams),
    /// Parabolic point/segment bisector.
    Parabola(ParabolaParams),
    /// Separator ray segment at a segment endpoint.
    Separator(LineParams),
    /// Edge along a segment site.
    LineSite(LineParams),
    /// Degenerate zero-length edge.
    Null(Point),
}

impl EdgeCurve {
    /// Straight bisector between `p0` and `p1`.
    #[must_use]
    pub const fn line(p0: Point, p1: Point) -> Self {
        Self::Line(LineParams { p0, p1 })
    }

    /// Separator segment from `p0` to `p1`.
    #[must_use]
    pub const fn separator(p0: Point, p1: Point) -> Self {
        Self::Separator(LineParams { p0, p1 })
    }

    /// Segment-site edge from `p0` to `p1`.
    #[must_use]
    pub const fn line_site(p0: Point, p1: Point) -> Self {
        Self::LineSite(LineParams { p0, p1 })
    }

    /// Zero-length edge at `p`.
    #[must_use]
    pub const fn null(p: Point) -> Self {
        Self::Null(p)
    }

    /// The geometric kind of this curve.
    #[must_use]
    pub const fn kind(&self) -> EdgeKind {
        match self {
            Self::Line(_) => EdgeKind::Line,
            Self::Parabola(_) => EdgeKind::Parabola,
            Self::Separator(_) => EdgeKind::Separator,
            Self::LineSite(_) => EdgeKind::LineSite,
            Self::Null(_) => EdgeKind::Null,
        }
    }

    /// Position on the curve at parameter `t ∈ [0, 1]`.
    #[must_use]
    pub fn point(&self, t: f64) -> Point {
        match self {
            Self::Line(l) | Self::Separator(l) | Self::LineSite(l) => l.p0.lerp(l.p1, t),
            Self::Parabola(p) => p.point_at(p.u_of_t(t)),
            Self::Null(p) => *p,
        }
    }

    /// The same curve traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Line(l) => Self::line(l.p1, l.p0),
            Self::Separator(l) => Self::separator(l.p1, l.p0),
            Self::LineSite(l) => Self::line_site(l.p1, l.p0),
            Self::Parabola(p) => Self::Parabola(ParabolaParams {
                u0: p.u1,
                u1: p.u0,
                ..*p
            }),
            Self::Null(p) => Self::Null(*p),
        }
    }

    /// Parameter of the projection of `p` onto the curve (not clamped).
    ///
    /// For parabolic arcs the projection is taken along the directrix, which
    /// is exact for points on the parabola.
    #[must_use]
    pub fn parameter_of(&self, p: Point) -> f64 {
        match self {
            Self::Line(l) | Self::Separator(l) | Self::LineSite(l) => {
                let d = l.p1 - l.p0;
                let len_sq = d.norm_squared();
                if len_sq > 0.0 {
                    (p - l.p0).dot(d) / len_sq
                } else {
                    0.0
                }
            }
            Self::Parabola(pp) => {
                let u = (p - pp.directrix_origin).dot(pp.directrix_dir);
                let span = pp.u1 - pp.u0;
                if span.abs() > 0.0 {
                    (u - pp.u0) / span
                } else {
                    0.0
                }
            }
            Self::Null(_) => 0.0,
        }
    }

    /// Splits the curve at parameter `t` into the `[0, t]` and `[t, 1]`
    /// sub-curves, each renormalized to `[0, 1]`.
    #[must_use]
    pub fn split_at(&self, t: f64) -> (Self, Self) {
        match self {
            Self::Line(l) => {
                let m = l.p0.lerp(l.p1, t);
                (Self::line(l.p0, m), Self::line(m, l.p1))
            }
            Self::Separator(l) => {
                let m = l.p0.lerp(l.p1, t);
                (Self::separator(l.p0, m), Self::separator(m, l.p1))
            }
            Self::LineSite(l) => {
                let m = l.p0.lerp(l.p1, t);
                (Self::line_site(l.p0, m), Self::line_site(m, l.p1))
            }
            Self::Parabola(p) => {
                let um = p.u_of_t(t);
                (
                    Self::Parabola(ParabolaParams { u1: um, ..*p }),
                    Self::Parabola(ParabolaParams { u0: um, ..*p }),
                )
            }
            Self::Null(p) => (Self::Null(*p), Self::Null(*p)),
        }
    }

    /// Rejoins two sub-curves previously produced by [`EdgeCurve::split_at`].
    ///
    /// Returns `None` when the curves are of different kinds or do not meet
    /// at a shared endpoint.
    #[must_use]
    pub fn join(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Line(a), Self::Line(b)) if a.p1 == b.p0 => Some(Self::line(a.p0, b.p1)),
            (Self::Separator(a), Self::Separator(b)) if a.p1 == b.p0 => {
                Some(Self::separator(a.p0, b.p1))
            }
            (Self::LineSite(a), Self::LineSite(b)) if a.p1 == b.p0 => {
                Some(Self::line_site(a.p0, b.p1))
            }
            (Self::Parabola(a), Self::Parabola(b))
                if a.focus == b.focus && (a.u1 - b.u0).abs() <= f64::EPSILON.sqrt() =>
            {
                Some(Self::Parabola(ParabolaParams { u1: b.u1, ..*a }))
            }
            _ => None,
        }
    }

    /// Parameter of the parabola apex, when this is a parabolic arc whose
    /// apex lies strictly inside the arc.
    #[must_use]
    pub fn apex_t(&self) -> Option<f64> {
        const MARGIN: f64 = 1e-9;
        match self {
            Self::Parabola(p) => {
                let span = p.u1 - p.u0;
                if span.abs() <= 0.0 {
                    return None;
                }
                let t = (p.focus_u - p.u0) / span;
                if t > MARGIN && t < 1.0 - MARGIN {
                    Some(t)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

// =============================================================================
// HALF-EDGE RECORD
// =============================================================================

/// One directed half-edge of the diagram.
#[derive(Clone, Debug)]
pub struct HalfEdge {
    /// Vertex this half-edge leaves from; the target is the twin's source.
    pub source: VertexKey,
    /// Oppositely directed partner; always valid after pair creation.
    pub twin: EdgeKey,
    /// Next half-edge counterclockwise around the owning face.
    pub next: EdgeKey,
    /// Owning face, or `None` outside the far-circle frame.
    pub face: Option<FaceKey>,
    /// Parametric geometry from source to target.
    pub curve: EdgeCurve,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_parabola() -> EdgeCurve {
        // focus (0, 1), directrix y = 0: the parabola y = (x^2 + 1) / 2
        let seg = LineSite {
            start: Point::new(-5.0, 0.0),
            end: Point::new(5.0, 0.0),
        };
        let p_start = Point::new(-1.0, 1.0);
        let p_end = Point::new(1.0, 1.0);
        EdgeCurve::Parabola(
            ParabolaParams::from_sites(Point::new(0.0, 1.0), &seg, p_start, p_end).unwrap(),
        )
    }

    #[test]
    fn line_curve_interpolates() {
        let c = EdgeCurve::line(Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        assert_eq!(c.kind(), EdgeKind::Line);
        assert_relative_eq!(c.point(0.5).x, 1.0);
        assert_relative_eq!(c.reversed().point(0.0).x, 2.0);
    }

    #[test]
    fn parabola_points_are_equidistant() {
        let c = unit_parabola();
        let focus = Point::new(0.0, 1.0);
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let p = c.point(t);
            // distance to focus equals distance to the directrix y = 0
            assert_relative_eq!(p.distance(focus), p.y, epsilon = 1e-12);
        }
        // endpoints are reproduced exactly
        assert_relative_eq!(c.point(0.0).x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(c.point(1.0).x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn parabola_apex_detected_in_interior() {
        let c = unit_parabola();
        let t = c.apex_t().unwrap();
        assert_relative_eq!(t, 0.5, epsilon = 1e-12);
        let apex = c.point(t);
        assert_relative_eq!(apex.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(apex.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_focus_on_directrix_rejected() {
        let seg = LineSite {
            start: Point::new(-1.0, 0.0),
            end: Point::new(1.0, 0.0),
        };
        let p = Point::new(0.5, 0.0);
        assert!(ParabolaParams::from_sites(p, &seg, p, p).is_none());
    }

    #[test]
    fn split_then_join_roundtrips() {
        let c = EdgeCurve::line(Point::new(0.0, 0.0), Point::new(4.0, 0.0));
        let (a, b) = c.split_at(0.25);
        assert_relative_eq!(a.point(1.0).x, 1.0);
        assert_relative_eq!(b.point(0.0).x, 1.0);
        assert_eq!(a.join(&b), Some(c));

        let p = unit_parabola();
        let (pa, pb) = p.split_at(0.5);
        let rejoined = pa.join(&pb).unwrap();
        assert_relative_eq!(rejoined.point(1.0).x, p.point(1.0).x, epsilon = 1e-12);
    }

    #[test]
    fn parameter_of_recovers_positions() {
        let c = EdgeCurve::line(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        assert_relative_eq!(c.parameter_of(Point::new(0.5, 0.0)), 0.25);
        let p = unit_parabola();
        let mid = p.point(0.5);
        assert_relative_eq!(p.parameter_of(mid), 0.5, epsilon = 1e-12);
    }
}
