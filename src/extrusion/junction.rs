//! Extrusion junction for variable-width toolpaths.

use crate::geometry::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// A junction (vertex) in a variable-width extrusion path.
///
/// Each junction specifies a position and the extrusion width at that point.
/// The width can vary along the path, allowing for adaptive wall thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrusionJunction {
    /// The position of the centerline at this junction (micrometers).
    pub p: Point,

    /// The extrusion width at this junction (micrometers).
    pub w: Coord,

    /// Which perimeter/wall index this junction belongs to.
    /// Perimeters are counted from outside inwards (0 = outermost wall).
    pub perimeter_index: usize,
}

impl ExtrusionJunction {
    /// Create a new extrusion junction.
    pub fn new(p: Point, w: Coord, perimeter_index: usize) -> Self {
        Self {
            p,
            w,
            perimeter_index,
        }
    }

    /// Distance to another junction in micrometers.
    pub fn distance_to(&self, other: &ExtrusionJunction) -> f64 {
        self.p.distance(&other.p)
    }

    /// Check if this junction is on the external (outer) perimeter.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.perimeter_index == 0
    }
}

impl From<(Point, Coord, usize)> for ExtrusionJunction {
    fn from((p, w, perimeter_index): (Point, Coord, usize)) -> Self {
        Self::new(p, w, perimeter_index)
    }
}

/// The junctions generated along one graph edge, ordered from high to low
/// distance-to-boundary.
pub type LineJunctions = Vec<ExtrusionJunction>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junction_new() {
        let j = ExtrusionJunction::new(Point::new(10_000, 20_000), 450, 0);
        assert_eq!(j.p.x, 10_000);
        assert_eq!(j.w, 450);
        assert!(j.is_external());
        assert!(!ExtrusionJunction::new(Point::new(0, 0), 450, 1).is_external());
    }

    #[test]
    fn test_junction_distance() {
        let j1 = ExtrusionJunction::new(Point::new(0, 0), 400, 0);
        let j2 = ExtrusionJunction::new(Point::new(3_000, 4_000), 400, 0);
        assert!((j1.distance_to(&j2) - 5_000.0).abs() < 1e-9);
    }
}
