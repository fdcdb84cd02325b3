//! Bucket grid for nearest-face lookups.
//!
//! Insertion seeds face searches with the existing face whose representative
//! site position is closest to the query point. A uniform bin grid over the
//! diagram extent gives expected O(1) lookups: search rings of bins outward
//! from the query's bin, then keep scanning a safety margin of two more
//! rings, since the nearest representative can sit one ring beyond the first
//! hit.

use thiserror::Error;

use super::half_edge_graph::FaceKey;
use crate::geometry::point::Point;

/// Errors from grid lookups.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// No face has been registered yet.
    #[error("face grid is empty")]
    Empty,
}

/// Uniform bucket grid over `[-extent, extent]²`.
#[derive(Clone, Debug)]
pub struct FaceGrid {
    n_bins: usize,
    extent: f64,
    bins: Vec<Vec<(FaceKey, Point)>>,
}

impl FaceGrid {
    /// Creates an empty grid covering the diagram frame (the initial
    /// generators sit at three times the far radius).
    #[must_use]
    pub fn new(far_radius: f64, n_bins: usize) -> Self {
        let n_bins = n_bins.max(1);
        Self {
            n_bins,
            extent: 4.0 * far_radius.max(f64::MIN_POSITIVE),
            bins: vec![Vec::new(); n_bins * n_bins],
        }
    }

    fn bin_coordinate(&self, x: f64) -> usize {
        let normalized = (x + self.extent) / (2.0 * self.extent);
        let i = (normalized * self.n_bins as f64).floor();
        (i.max(0.0) as usize).min(self.n_bins - 1)
    }

    fn bin_index(&self, p: Point) -> (usize, usize) {
        (self.bin_coordinate(p.x), self.bin_coordinate(p.y))
    }

    /// Registers a face under its representative site position.
    pub fn add(&mut self, face: FaceKey, position: Point) {
        let (i, j) = self.bin_index(position);
        self.bins[j * self.n_bins + i].push((face, position));
    }

    /// The face whose registered position is closest to `q`.
    ///
    /// # Errors
    ///
    /// [`GridError::Empty`] when no face has been registered.
    pub fn find_closest_face(&self, q: Point) -> Result<FaceKey, GridError> {
        let (qi, qj) = self.bin_index(q);
        let mut best: Option<(f64, FaceKey)> = None;
        let mut rings_after_hit = 0usize;

        for ring in 0..self.n_bins {
            if best.is_some() {
                rings_after_hit += 1;
                if rings_after_hit > 2 {
                    break;
                }
            }
            self.scan_ring(qi, qj, ring, q, &mut best);
        }

        best.map(|(_, f)| f).ok_or(GridError::Empty)
    }

    fn scan_ring(
        &self,
        qi: usize,
        qj: usize,
        ring: usize,
        q: Point,
        best: &mut Option<(f64, FaceKey)>,
    ) {
        let lo_i = qi.saturating_sub(ring);
        let hi_i = (qi + ring).min(self.n_bins - 1);
        let lo_j = qj.saturating_sub(ring);
        let hi_j = (qj + ring).min(self.n_bins - 1);
        for j in lo_j..=hi_j {
            for i in lo_i..=hi_i {
                // only the boundary of the ring; inner bins were already seen
                let on_boundary = ring == 0
                    || i == lo_i
                    || i == hi_i
                    || j == lo_j
                    || j == hi_j;
                if !on_boundary {
                    continue;
                }
                for &(face, position) in &self.bins[j * self.n_bins + i] {
                    let d = q.distance(position);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        *best = Some((d, face));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    use crate::core::half_edge_graph::FaceKey;

    fn keys(n: usize) -> Vec<FaceKey> {
        let mut arena: SlotMap<FaceKey, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn empty_grid_errors() {
        let grid = FaceGrid::new(10.0, 8);
        assert_eq!(grid.find_closest_face(Point::origin()), Err(GridError::Empty));
    }

    #[test]
    fn finds_the_nearest_registered_face() {
        let ks = keys(3);
        let mut grid = FaceGrid::new(10.0, 16);
        grid.add(ks[0], Point::new(-5.0, -5.0));
        grid.add(ks[1], Point::new(0.5, 0.5));
        grid.add(ks[2], Point::new(7.0, 7.0));
        assert_eq!(grid.find_closest_face(Point::new(0.0, 0.0)), Ok(ks[1]));
        assert_eq!(grid.find_closest_face(Point::new(8.0, 8.0)), Ok(ks[2]));
        assert_eq!(grid.find_closest_face(Point::new(-9.0, -9.0)), Ok(ks[0]));
    }

    #[test]
    fn positions_outside_the_extent_are_clamped() {
        let ks = keys(2);
        let mut grid = FaceGrid::new(1.0, 4);
        grid.add(ks[0], Point::new(100.0, 100.0));
        grid.add(ks[1], Point::new(-100.0, -100.0));
        assert_eq!(grid.find_closest_face(Point::new(50.0, 50.0)), Ok(ks[0]));
    }

    #[test]
    fn single_bin_grid_degenerates_to_linear_scan() {
        let ks = keys(2);
        let mut grid = FaceGrid::new(10.0, 1);
        grid.add(ks[0], Point::new(1.0, 0.0));
        grid.add(ks[1], Point::new(-3.0, 0.0));
        assert_eq!(grid.find_closest_face(Point::new(-1.0, 0.0)), Ok(ks[1]));
    }
}
