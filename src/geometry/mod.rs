//! Geometry primitives for wall toolpath generation.
//!
//! This module provides the fundamental geometric types used throughout the
//! pipeline:
//! - [`Point`] and [`PointF`] - 2D points with integer (micrometer) and
//!   floating-point coordinates
//! - [`Line`] - Line segment between two points
//! - [`Polygon`] - Closed polygon ring
//! - [`Shape`] - Collection of rings under the even-odd fill rule
//!
//! ## Coordinate System
//!
//! Coordinates are signed 64-bit integers in micrometers. Use `scale()` /
//! `unscale()` from the crate root to convert to and from millimeters.

mod line;
mod point;
mod polygon;
mod shape;
pub mod simplify;

pub use line::{is_inside_corner, Line};
pub use point::{Point, PointF, Points};
pub use polygon::Polygon;
pub use shape::Shape;
pub use simplify::{simplify_points, SimplifyConfig};

use crate::{Coord, CoordF};

/// Cross product of two 2D vectors (returns a scalar).
/// Useful for determining the orientation of three points.
#[inline]
pub fn cross2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.y as i128 - v1.y as i128 * v2.x as i128
}

/// Dot product of two 2D vectors.
#[inline]
pub fn dot2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.x as i128 + v1.y as i128 * v2.y as i128
}

/// Linear interpolation between two points.
#[inline]
pub fn lerp(a: Point, b: Point, t: CoordF) -> Point {
    Point::new(
        (a.x as CoordF + (b.x - a.x) as CoordF * t).round() as Coord,
        (a.y as CoordF + (b.y - a.y) as CoordF * t).round() as Coord,
    )
}

/// The point at distance `dist` from `a` along the segment toward `b`.
pub fn point_along(a: Point, b: Point, dist: Coord) -> Point {
    let ab = b - a;
    a + ab.with_length(dist)
}

/// A rotation frame mapping a direction vector onto the positive x-axis.
///
/// `unapply` converts local coordinates (x along the direction, y along its
/// counter-clockwise perpendicular) back to world space.
#[derive(Debug, Clone, Copy)]
pub struct RotationFrame {
    cos: CoordF,
    sin: CoordF,
}

impl RotationFrame {
    /// Build the frame from a (non-zero) direction vector.
    pub fn new(dir: PointF) -> Self {
        let unit = dir.normalize();
        Self {
            cos: unit.x,
            sin: unit.y,
        }
    }

    /// World -> local.
    pub fn apply(&self, p: PointF) -> PointF {
        PointF::new(
            p.x * self.cos + p.y * self.sin,
            p.y * self.cos - p.x * self.sin,
        )
    }

    /// Local -> world.
    pub fn unapply(&self, p: PointF) -> PointF {
        PointF::new(
            p.x * self.cos - p.y * self.sin,
            p.y * self.cos + p.x * self.sin,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross2() {
        let v1 = Point::new(1, 0);
        let v2 = Point::new(0, 1);
        assert_eq!(cross2(v1, v2), 1); // Counter-clockwise
        assert_eq!(cross2(v1, Point::new(0, -1)), -1); // Clockwise
    }

    #[test]
    fn test_lerp() {
        let a = Point::new(0, 0);
        let b = Point::new(100, 100);
        assert_eq!(lerp(a, b, 0.5), Point::new(50, 50));
    }

    #[test]
    fn test_point_along() {
        let a = Point::new(0, 0);
        let b = Point::new(1000, 0);
        assert_eq!(point_along(a, b, 300), Point::new(300, 0));
    }

    #[test]
    fn test_rotation_frame_roundtrip() {
        let frame = RotationFrame::new(PointF::new(3.0, 4.0));
        let p = PointF::new(7.0, -2.0);
        let back = frame.unapply(frame.apply(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);

        // The direction itself maps onto the x-axis.
        let local = frame.apply(PointF::new(3.0, 4.0));
        assert!((local.x - 5.0).abs() < 1e-9);
        assert!(local.y.abs() < 1e-9);
    }
}
