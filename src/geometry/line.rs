//! Line segment type.

use super::{cross2, Point};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// A line segment defined by two endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    /// Create a new line segment from two points.
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Get the direction vector (b - a).
    #[inline]
    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    /// Get the squared length of the line segment.
    #[inline]
    pub fn length_squared(&self) -> i128 {
        self.a.distance_squared(&self.b)
    }

    /// Get the length of the line segment in micrometers.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    /// Calculate the distance from a point to this line segment.
    pub fn distance_to_point(&self, p: &Point) -> CoordF {
        let proj = p.project_onto_segment(self.a, self.b);
        p.distance(&proj)
    }

    /// Squared distance from `p` to the segment from `a` to `b`.
    pub fn distance_to_squared(p: Point, a: Point, b: Point) -> CoordF {
        let proj = p.project_onto_segment(a, b);
        p.distance_squared(&proj) as CoordF
    }
}

/// Test whether `query` lies inside the interior corner formed at polygon
/// vertex `b` between the incoming edge `a -> b` and the outgoing edge
/// `b -> c`. The polygon interior is to the left of the direction of travel.
///
/// For a convex corner the query must be left of both edges; for a reflex
/// corner left of either suffices.
pub fn is_inside_corner(a: Point, b: Point, c: Point, query: Point) -> bool {
    let ba = b - a;
    let cb = c - b;
    let bq = query - b;
    let left_of_incoming = cross2(ba, bq) > 0;
    let left_of_outgoing = cross2(cb, bq) > 0;
    if cross2(ba, cb) >= 0 {
        // Convex (or straight) corner
        left_of_incoming && left_of_outgoing
    } else {
        // Reflex corner
        left_of_incoming || left_of_outgoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_point() {
        let line = Line::new(Point::new(0, 0), Point::new(1000, 0));
        assert!((line.distance_to_point(&Point::new(500, 250)) - 250.0).abs() < 1e-9);
        assert!((line.distance_to_point(&Point::new(-300, 400)) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_inside_convex_corner() {
        // CCW square corner at the origin: incoming from (0,-10), outgoing to (10,0).
        // Interior (left of travel) is the upper-right quadrant... for edges
        // (0,-10)->(0,0)->(10,0) the interior is x>0, y<0 side? Left of upward
        // travel is -x; left of rightward travel is +y. Reflex corner.
        let a = Point::new(0, -10);
        let b = Point::new(0, 0);
        let c = Point::new(10, 0);
        // cross(ba, cb) = cross((0,10),(10,0)) = -100 < 0: reflex
        assert!(is_inside_corner(a, b, c, Point::new(-5, -5)));
        assert!(is_inside_corner(a, b, c, Point::new(5, 5)));
        assert!(!is_inside_corner(a, b, c, Point::new(5, -5)));
    }

    #[test]
    fn test_inside_reflex_corner() {
        // CCW turn: incoming rightward, outgoing upward; interior above-left.
        let a = Point::new(-10, 0);
        let b = Point::new(0, 0);
        let c = Point::new(0, 10);
        // cross(ba, cb) = cross((10,0),(0,10)) = 100 > 0: convex
        assert!(is_inside_corner(a, b, c, Point::new(-5, 5)));
        assert!(!is_inside_corner(a, b, c, Point::new(5, -5)));
        assert!(!is_inside_corner(a, b, c, Point::new(5, 5)));
    }
}
