//! Shape: an ordered collection of polygon rings under the even-odd rule.

use super::{Point, Polygon};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// An ordered collection of simple closed polygons with even-odd fill.
///
/// A ring at even containment depth is an outer contour, a ring at odd
/// depth a hole. The even-odd rule makes the fill independent of the
/// winding direction of the individual rings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    polygons: Vec<Polygon>,
}

impl Shape {
    #[inline]
    pub fn new() -> Self {
        Self {
            polygons: Vec::new(),
        }
    }

    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    #[inline]
    pub fn polygons_mut(&mut self) -> &mut Vec<Polygon> {
        &mut self.polygons
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    #[inline]
    pub fn push(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.polygons.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.polygons.iter()
    }

    /// Total signed area in square micrometers.
    ///
    /// With consistently wound rings (outer CCW, holes CW) this equals the
    /// enclosed area.
    pub fn area(&self) -> CoordF {
        self.polygons.iter().map(|p| p.signed_area()).sum()
    }

    /// Total area in square millimeters.
    pub fn area_mm2(&self) -> CoordF {
        self.area() / (crate::SCALING_FACTOR * crate::SCALING_FACTOR)
    }

    /// Containment depth of a point: the number of rings it falls inside.
    /// Even depth means outside the shape, odd inside (even-odd rule).
    pub fn depth_of(&self, p: Point) -> usize {
        self.polygons.iter().filter(|ring| ring.contains(p)).count()
    }

    /// Even-odd point containment.
    pub fn contains(&self, p: Point) -> bool {
        self.depth_of(p) % 2 == 1
    }

    /// Remove rings with an absolute area below `min_area_mm2`.
    pub fn remove_small_areas(&mut self, min_area_mm2: CoordF) {
        self.polygons.retain(|p| p.area_mm2() >= min_area_mm2);
    }

    /// Remove rings with fewer than 3 vertices or repeated vertices.
    pub fn remove_degenerate_verts(&mut self) {
        for poly in &mut self.polygons {
            poly.remove_duplicate_points();
        }
        self.polygons.retain(|p| p.len() >= 3);
    }

    /// Remove near-collinear vertices from every ring.
    pub fn remove_collinear_edges(&mut self, max_angle: CoordF) {
        for poly in &mut self.polygons {
            poly.remove_collinear_points(max_angle);
        }
        self.polygons.retain(|p| p.len() >= 3);
    }

    /// Re-derive consistent winding from the even-odd rule: rings at even
    /// containment depth become counter-clockwise outer contours, rings at
    /// odd depth clockwise holes. Input winding is ignored.
    pub fn process_even_odd(&self) -> Shape {
        let mut result = Vec::with_capacity(self.polygons.len());
        for (idx, ring) in self.polygons.iter().enumerate() {
            let Some(rep) = ring.representative_point() else {
                continue;
            };
            let depth = self
                .polygons
                .iter()
                .enumerate()
                .filter(|(other_idx, other)| *other_idx != idx && other.contains(rep))
                .count();
            let mut ring = ring.clone();
            let want_ccw = depth % 2 == 0;
            if ring.is_ccw() != want_ccw {
                ring.reverse();
            }
            result.push(ring);
        }
        Shape::from_polygons(result)
    }

    /// Keep only parts meeting the given circumference and area thresholds.
    /// Holes of removed contours are removed along with them by the depth
    /// rule (a hole smaller than its contour is smaller than the threshold
    /// whenever the contour is).
    pub fn filter_parts(&self, min_circumference: Coord, min_area_mm2: CoordF) -> Shape {
        let kept = self
            .polygons
            .iter()
            .filter(|p| {
                p.perimeter() >= min_circumference as CoordF && p.area_mm2() >= min_area_mm2
            })
            .cloned()
            .collect();
        Shape::from_polygons(kept)
    }

    /// Total number of vertices over all rings.
    pub fn point_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len()).sum()
    }
}

impl Index<usize> for Shape {
    type Output = Polygon;
    #[inline]
    fn index(&self, i: usize) -> &Polygon {
        &self.polygons[i]
    }
}

impl IndexMut<usize> for Shape {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut Polygon {
        &mut self.polygons[i]
    }
}

impl IntoIterator for Shape {
    type Item = Polygon;
    type IntoIter = std::vec::IntoIter<Polygon>;
    fn into_iter(self) -> Self::IntoIter {
        self.polygons.into_iter()
    }
}

impl<'a> IntoIterator for &'a Shape {
    type Item = &'a Polygon;
    type IntoIter = std::slice::Iter<'a, Polygon>;
    fn into_iter(self) -> Self::IntoIter {
        self.polygons.iter()
    }
}

impl FromIterator<Polygon> for Shape {
    fn from_iter<T: IntoIterator<Item = Polygon>>(iter: T) -> Self {
        Self::from_polygons(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(Coord, Coord)]) -> Polygon {
        Polygon::from_points(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn annulus() -> Shape {
        let outer = ring(&[(0, 0), (10_000, 0), (10_000, 10_000), (0, 10_000)]);
        let inner = ring(&[(3_000, 3_000), (7_000, 3_000), (7_000, 7_000), (3_000, 7_000)]);
        Shape::from_polygons(vec![outer, inner])
    }

    #[test]
    fn test_even_odd_containment() {
        let shape = annulus();
        assert!(shape.contains(Point::new(1_000, 1_000)));
        assert!(!shape.contains(Point::new(5_000, 5_000))); // inside the hole
        assert!(!shape.contains(Point::new(20_000, 5_000)));
    }

    #[test]
    fn test_process_even_odd_windings() {
        // Both rings CCW on input; the hole must come out CW.
        let processed = annulus().process_even_odd();
        assert_eq!(processed.len(), 2);
        assert!(processed[0].is_ccw());
        assert!(!processed[1].is_ccw());
        // Signed area now subtracts the hole: 100 - 16 = 84 mm².
        assert!((processed.area_mm2() - 84.0).abs() < 1e-6);
    }

    #[test]
    fn test_filter_parts() {
        let mut shape = annulus();
        shape.push(ring(&[(20_000, 0), (21_000, 0), (21_000, 1_000), (20_000, 1_000)]));
        let filtered = shape.filter_parts(5_000, 0.0);
        // The 1x1mm square (4mm circumference) is dropped.
        assert_eq!(filtered.len(), 2);
    }
}
