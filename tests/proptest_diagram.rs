//! Property-based tests for the diagram invariants.
//!
//! For arbitrary valid insertion sequences the engine must re-establish the
//! full invariant set after every insertion: twin/next consistency, reset
//! statuses, the Euler characteristic, clearance agreement, and the counter
//! round-trips of the public API.

use proptest::prelude::*;
use voronoi::prelude::*;

const FAR_RADIUS: f64 = 10.0;

/// Strategy for a coordinate pair strictly inside the domain, away from the
/// boundary so shrinking cannot push sites onto the far circle.
fn site_point() -> impl Strategy<Value = Point> {
    (
        (-8.0..8.0_f64).prop_filter("finite", |x: &f64| x.is_finite()),
        (-8.0..8.0_f64).prop_filter("finite", |y: &f64| y.is_finite()),
    )
        .prop_map(|(x, y)| Point::new(x, y))
}

fn insert_all(points: &[Point]) -> (VoronoiDiagram, usize) {
    let mut vd = VoronoiDiagram::new(FAR_RADIUS, 32);
    let mut accepted = 0usize;
    for &p in points {
        match vd.insert_point_site(p) {
            Ok(_) => accepted += 1,
            // near-duplicate samples are rejected without mutating the diagram
            Err(InsertionError::InvalidSite { .. }) => {}
            Err(e) => panic!("unexpected insertion failure: {e}"),
        }
    }
    (vd, accepted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn insertions_preserve_every_invariant(points in prop::collection::vec(site_point(), 1..24)) {
        let (vd, _) = insert_all(&points);
        prop_assert!(is_valid(&vd).is_ok());
    }

    #[test]
    fn counters_round_trip(points in prop::collection::vec(site_point(), 1..24)) {
        let (vd, accepted) = insert_all(&points);
        prop_assert_eq!(vd.num_point_sites(), accepted);
        prop_assert_eq!(vd.num_line_sites(), 0);
        // marker vertices are excluded from the vertex count
        prop_assert_eq!(vd.num_vertices(), vd.graph().num_vertices() - accepted);
    }

    #[test]
    fn euler_characteristic_holds(points in prop::collection::vec(site_point(), 1..24)) {
        let (vd, accepted) = insert_all(&points);
        let v = vd.num_vertices() as i64;
        let e = (vd.graph().num_half_edges() / 2) as i64;
        // +1 counts the unbounded outer face
        let f = vd.graph().num_faces() as i64 + 1;
        prop_assert_eq!(v - e + f, 2);
        // one face per accepted site plus the three frame generators
        prop_assert_eq!(vd.graph().num_faces(), accepted + 3);
    }

    #[test]
    fn edge_midpoints_stay_nearest_to_their_sites(
        points in prop::collection::vec(site_point(), 1..12)
    ) {
        let (vd, _) = insert_all(&points);
        prop_assert!(check_edge_midpoints(&vd).is_ok());
    }

    #[test]
    fn vertices_are_equidistant_from_incident_sites(
        points in prop::collection::vec(site_point(), 1..16)
    ) {
        let (vd, _) = insert_all(&points);
        let g = vd.graph();
        for (v, vert) in g.vertices() {
            for f in g.vertex_faces(v) {
                let d = g.face(f).site.distance(vert.position);
                prop_assert!((d - vert.clearance).abs() <= 1e-6 * vert.clearance.max(1.0));
            }
        }
    }

    #[test]
    fn segment_insertion_keeps_invariants(
        (x, half) in ((-5.0..5.0_f64), (0.5..3.0_f64))
    ) {
        let mut vd = VoronoiDiagram::new(FAR_RADIUS, 32);
        let a = vd.insert_point_site(Point::new(x, half)).unwrap();
        let b = vd.insert_point_site(Point::new(x, -half)).unwrap();
        vd.insert_line_site(a, b).unwrap();
        prop_assert_eq!(vd.num_line_sites(), 1);
        prop_assert!(is_valid(&vd).is_ok());
        prop_assert!(check_edge_midpoints(&vd).is_ok());
    }
}
