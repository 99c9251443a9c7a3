//! 2D point types with integer (micrometer) and floating-point coordinates.

use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A 2D point with integer micrometer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    /// Create a new point from integer micrometer coordinates.
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from millimeter coordinates.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self {
            x: crate::scale(x),
            y: crate::scale(y),
        }
    }

    /// Convert to a floating-point point (micrometer units).
    #[inline]
    pub fn to_f64(self) -> PointF {
        PointF::new(self.x as CoordF, self.y as CoordF)
    }

    /// Squared distance to another point, in i128 to avoid overflow.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (other.x - self.x) as i128;
        let dy = (other.y - self.y) as i128;
        dx * dx + dy * dy
    }

    /// Distance to another point in micrometers.
    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    /// Length of this point interpreted as a vector, in micrometers.
    #[inline]
    pub fn vsize(&self) -> Coord {
        let sq = (self.x as i128) * (self.x as i128) + (self.y as i128) * (self.y as i128);
        (sq as CoordF).sqrt().round() as Coord
    }

    /// Squared length of this point interpreted as a vector.
    #[inline]
    pub fn vsize2(&self) -> i128 {
        (self.x as i128) * (self.x as i128) + (self.y as i128) * (self.y as i128)
    }

    /// Whether this vector is shorter than the given length.
    #[inline]
    pub fn shorter_than(&self, len: Coord) -> bool {
        if self.x.abs() > len || self.y.abs() > len {
            return false;
        }
        self.vsize2() < (len as i128) * (len as i128)
    }

    /// Rotate 90 degrees counter-clockwise.
    #[inline]
    pub fn turn_90_ccw(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Scale this vector to the given length, keeping its direction.
    /// Returns the zero vector unchanged.
    pub fn with_length(self, len: Coord) -> Self {
        let size = self.vsize();
        if size == 0 {
            return self;
        }
        Self::new(
            ((self.x as i128 * len as i128) / size as i128) as Coord,
            ((self.y as i128 * len as i128) / size as i128) as Coord,
        )
    }

    /// The closest point to `self` on the segment from `a` to `b`.
    pub fn project_onto_segment(&self, a: Point, b: Point) -> Point {
        let ab = b - a;
        let ap = *self - a;
        let ab_len2 = ab.vsize2();
        if ab_len2 == 0 {
            return a;
        }
        let dot = (ap.x as i128) * (ab.x as i128) + (ap.y as i128) * (ab.y as i128);
        if dot <= 0 {
            return a;
        }
        if dot >= ab_len2 {
            return b;
        }
        let t = dot as CoordF / ab_len2 as CoordF;
        Point::new(
            a.x + (ab.x as CoordF * t).round() as Coord,
            a.y + (ab.y as CoordF * t).round() as Coord,
        )
    }

    /// The closest point to `self` on the infinite line through `a` and `b`.
    pub fn project_onto_line(&self, a: Point, b: Point) -> Point {
        let ab = b - a;
        let ap = *self - a;
        let ab_len2 = ab.vsize2();
        if ab_len2 == 0 {
            return a;
        }
        let dot = (ap.x as i128) * (ab.x as i128) + (ap.y as i128) * (ab.y as i128);
        let t = dot as CoordF / ab_len2 as CoordF;
        Point::new(
            a.x + (ab.x as CoordF * t).round() as Coord,
            a.y + (ab.y as CoordF * t).round() as Coord,
        )
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Point {
    type Output = Point;
    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    #[inline]
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    #[inline]
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Point {
    type Output = Point;
    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<Coord> for Point {
    type Output = Point;
    #[inline]
    fn mul(self, rhs: Coord) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<Coord> for Point {
    type Output = Point;
    #[inline]
    fn div(self, rhs: Coord) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// A 2D point with floating-point micrometer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

impl PointF {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    /// Round to an integer point.
    #[inline]
    pub fn to_point(self) -> Point {
        Point::new(self.x.round() as Coord, self.y.round() as Coord)
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Normalize to unit length. The zero vector is returned unchanged.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return self;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Rotate 90 degrees counter-clockwise.
    #[inline]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }
}

impl fmt::Debug for PointF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

impl Add for PointF {
    type Output = PointF;
    #[inline]
    fn add(self, rhs: PointF) -> PointF {
        PointF::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PointF {
    type Output = PointF;
    #[inline]
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<CoordF> for PointF {
    type Output = PointF;
    #[inline]
    fn mul(self, rhs: CoordF) -> PointF {
        PointF::new(self.x * rhs, self.y * rhs)
    }
}

/// A collection of points.
pub type Points = Vec<Point>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3000, 4000);
        assert_eq!(a.distance_squared(&b), 25_000_000);
        assert!((a.distance(&b) - 5000.0).abs() < 1e-9);
        assert_eq!((b - a).vsize(), 5000);
    }

    #[test]
    fn test_shorter_than() {
        let v = Point::new(3, 4);
        assert!(v.shorter_than(6));
        assert!(!v.shorter_than(5));
        assert!(!v.shorter_than(4));
    }

    #[test]
    fn test_project_onto_segment() {
        let a = Point::new(0, 0);
        let b = Point::new(1000, 0);

        // Projection inside the segment
        let p = Point::new(500, 300);
        assert_eq!(p.project_onto_segment(a, b), Point::new(500, 0));

        // Clamped to segment ends
        let q = Point::new(-200, 100);
        assert_eq!(q.project_onto_segment(a, b), a);
        let r = Point::new(1500, 100);
        assert_eq!(r.project_onto_segment(a, b), b);
    }

    #[test]
    fn test_with_length() {
        let v = Point::new(3000, 4000);
        let w = v.with_length(1000);
        assert_eq!(w, Point::new(600, 800));
    }
}
