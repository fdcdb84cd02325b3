//! Faces of the diagram and their incidence flag.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::half_edge_graph::EdgeKey;
use crate::geometry::site::Site;

/// Transient per-insertion flag on a face; `Nonincident` between insertions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceStatus {
    /// The face borders a vertex marked IN by the running flood fill and
    /// will be repaired.
    Incident,
    /// Untouched by the running insertion (the resting state).
    #[default]
    Nonincident,
}

impl fmt::Display for FaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incident => write!(f, "INCIDENT"),
            Self::Nonincident => write!(f, "NONINCIDENT"),
        }
    }
}

/// One face of the diagram: the region generated by a site.
///
/// Faces are created once per inserted site (plus the three frame generator
/// faces) and never destroyed. The unbounded region beyond the far-circle
/// frame is not a `Face`; half-edges bordering it carry `face: None`.
#[derive(Clone, Debug)]
pub struct Face {
    /// One half-edge of the face's boundary cycle.
    pub edge: EdgeKey,
    /// The generating site.
    pub site: Site,
    /// Transient incidence flag.
    pub status: FaceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_state_is_nonincident() {
        assert_eq!(FaceStatus::default(), FaceStatus::Nonincident);
        assert_eq!(FaceStatus::Incident.to_string(), "INCIDENT");
    }
}
