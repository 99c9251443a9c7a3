//! Polygon boolean and offset operations.
//!
//! This module provides the boolean operations (union, difference) and
//! offsetting used by outline preprocessing and the simple-offset wall
//! path, backed by the geo-clipper library.
//!
//! Shapes are flat ring lists under the even-odd rule; at this boundary
//! they are assembled into contour/hole polygons by containment depth,
//! converted to millimeter f64 geometry, and converted back afterwards.

use crate::geometry::{Point, Polygon, Shape};
use crate::{unscale, Coord, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    Round,
    /// Mitered corners
    #[default]
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25),
            OffsetJoinType::Miter => JoinType::Miter(2.0),
        }
    }
}

fn ring_to_linestring(ring: &Polygon) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = ring
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

fn linestring_to_ring(ls: &LineString<f64>) -> Polygon {
    let points: Vec<Point> = ls
        .coords()
        .map(|c| Point::new(crate::scale(c.x), crate::scale(c.y)))
        .collect();
    Polygon::from_points(points)
}

/// Assemble the flat ring list into contour/hole polygons by containment
/// depth: rings at even depth become exteriors, each odd-depth ring becomes
/// a hole of the smallest even-depth ring containing it.
pub fn shape_to_geo(shape: &Shape) -> MultiPolygon<f64> {
    let n = shape.len();
    let mut depth = vec![0usize; n];
    for i in 0..n {
        let Some(rep) = shape[i].representative_point() else {
            continue;
        };
        depth[i] = (0..n)
            .filter(|&j| j != i && shape[j].contains(rep))
            .count();
    }

    let mut polygons: Vec<GeoPolygon<f64>> = Vec::new();
    let mut exterior_of: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        if depth[i] % 2 == 0 {
            exterior_of[i] = Some(polygons.len());
            polygons.push(GeoPolygon::new(ring_to_linestring(&shape[i]), vec![]));
        }
    }
    for i in 0..n {
        if depth[i] % 2 == 1 {
            let Some(rep) = shape[i].representative_point() else {
                continue;
            };
            // The immediate parent is the smallest even ring containing it.
            let parent = (0..n)
                .filter(|&j| depth[j] % 2 == 0 && shape[j].contains(rep))
                .min_by(|&a, &b| {
                    shape[a]
                        .signed_area()
                        .abs()
                        .partial_cmp(&shape[b].signed_area().abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(parent) = parent {
                if let Some(poly_idx) = exterior_of[parent] {
                    polygons[poly_idx]
                        .interiors_push(ring_to_linestring(&shape[i]).0);
                }
            }
        }
    }
    MultiPolygon::new(polygons)
}

/// Flatten a geo MultiPolygon back into a ring list with consistent
/// winding (exteriors counter-clockwise, holes clockwise).
pub fn geo_to_shape(multi: &MultiPolygon<f64>) -> Shape {
    let mut shape = Shape::new();
    for poly in &multi.0 {
        let mut exterior = linestring_to_ring(poly.exterior());
        if exterior.len() < 3 {
            continue;
        }
        if !exterior.is_ccw() {
            exterior.reverse();
        }
        shape.push(exterior);
        for interior in poly.interiors() {
            let mut hole = linestring_to_ring(interior);
            if hole.len() < 3 {
                continue;
            }
            if hole.is_ccw() {
                hole.reverse();
            }
            shape.push(hole);
        }
    }
    shape
}

/// Compute the union of two shapes.
pub fn union(subject: &Shape, clip: &Shape) -> Shape {
    if subject.is_empty() {
        return clip.clone();
    }
    if clip.is_empty() {
        // Self-union still resolves overlaps and winding.
        let geo = shape_to_geo(subject);
        let result = geo.union(&MultiPolygon::new(vec![]), 1000.0);
        return geo_to_shape(&result);
    }
    let subject_geo = shape_to_geo(subject);
    let clip_geo = shape_to_geo(clip);
    let result = subject_geo.union(&clip_geo, 1000.0);
    geo_to_shape(&result)
}

/// Union a shape with itself, resolving self-overlaps and normalizing
/// winding.
pub fn union_self(shape: &Shape) -> Shape {
    if shape.is_empty() {
        return Shape::new();
    }
    let geo = shape_to_geo(shape);
    let result = geo.union(&geo, 1000.0);
    geo_to_shape(&result)
}

/// Compute the difference of two shapes (subject - clip).
pub fn difference(subject: &Shape, clip: &Shape) -> Shape {
    if subject.is_empty() {
        return Shape::new();
    }
    if clip.is_empty() {
        return subject.clone();
    }
    let subject_geo = shape_to_geo(subject);
    let clip_geo = shape_to_geo(clip);
    let result = subject_geo.difference(&clip_geo, 1000.0);
    geo_to_shape(&result)
}

/// Offset a shape by a signed distance in micrometers.
/// Positive delta grows the shape, negative shrinks it.
pub fn offset(shape: &Shape, delta: Coord, join_type: OffsetJoinType) -> Shape {
    if shape.is_empty() {
        return Shape::new();
    }
    let geo = shape_to_geo(shape);
    let delta_mm: CoordF = unscale(delta);
    let mut accumulated: Vec<GeoPolygon<f64>> = Vec::new();
    for poly in &geo.0 {
        let jt: JoinType = join_type.into();
        let result = poly.offset(delta_mm, jt, EndType::ClosedPolygon, 1000.0);
        accumulated.extend(result.0);
    }
    let multi = MultiPolygon::new(accumulated);
    if delta > 0 && multi.0.len() > 1 {
        // Grown parts may have merged.
        let unioned = multi.union(&multi, 1000.0);
        geo_to_shape(&unioned)
    } else {
        geo_to_shape(&multi)
    }
}

/// Morphological open-close: offset inward, outward twice, inward again.
/// Removes slivers thinner than `2 * distance` while keeping the remaining
/// outline in place.
pub fn open_close(shape: &Shape, distance: Coord, join_type: OffsetJoinType) -> Shape {
    if distance <= 0 {
        return union_self(shape);
    }
    let opened = offset(shape, -distance, join_type);
    let closed = offset(&opened, 2 * distance, join_type);
    offset(&closed, -distance, join_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(x0: Coord, y0: Coord, side: Coord) -> Polygon {
        Polygon::from_points(vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ])
    }

    #[test]
    fn test_offset_shrink_square() {
        let shape = Shape::from_polygons(vec![square(0, 0, 10_000)]);
        let shrunk = offset(&shape, -1_000, OffsetJoinType::Miter);
        assert_eq!(shrunk.len(), 1);
        // 10mm square shrunk by 1mm per side: 8x8mm = 64mm²
        assert!((shrunk.area_mm2() - 64.0).abs() < 0.5);
    }

    #[test]
    fn test_offset_grow_square() {
        let shape = Shape::from_polygons(vec![square(0, 0, 10_000)]);
        let grown = offset(&shape, 1_000, OffsetJoinType::Miter);
        assert!((grown.area_mm2() - 144.0).abs() < 1.0);
    }

    #[test]
    fn test_union_disjoint() {
        let shape_a = Shape::from_polygons(vec![square(0, 0, 10_000)]);
        let shape_b = Shape::from_polygons(vec![square(20_000, 0, 10_000)]);
        let result = union(&shape_a, &shape_b);
        assert_eq!(result.len(), 2);
        assert!((result.area_mm2() - 200.0).abs() < 0.5);
    }

    #[test]
    fn test_union_with_hole_roundtrip() {
        let shape = Shape::from_polygons(vec![
            square(0, 0, 10_000),
            square(3_000, 3_000, 4_000),
        ]);
        let result = union_self(&shape);
        assert_eq!(result.len(), 2);
        // Hole subtracts: 100 - 16 = 84 mm²
        assert!((result.area_mm2() - 84.0).abs() < 0.5);
    }

    #[test]
    fn test_open_close_removes_sliver() {
        // 10mm square with a 0.05mm wide spike that open-close should erase.
        let mut spiky = square(0, 0, 10_000);
        let points = spiky.points_mut();
        points.insert(2, Point::new(10_000, 4_975));
        points.insert(3, Point::new(14_000, 5_000));
        points.insert(4, Point::new(10_000, 5_025));
        let shape = Shape::from_polygons(vec![spiky]);
        let cleaned = open_close(&shape, 150, OffsetJoinType::Miter);
        assert_eq!(cleaned.len(), 1);
        assert!((cleaned.area_mm2() - 100.0).abs() < 1.0);
    }
}
