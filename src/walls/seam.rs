//! Z-seam point interpolation.
//!
//! Users can draw a seam curve as a list of 3D points; each layer gets a
//! 2D seam target interpolated between the two points bracketing its z.
//! The target is pre-inserted as a vertex into the outline so later seam
//! placement can snap to it exactly.

use crate::geometry::{Point, Polygon};
use crate::settings::{SeamPoint, WallSettings};
use crate::Coord;

/// Squared snap distance under which the target counts as an existing
/// vertex (10 um).
const ENDPOINT_SNAP_DIST_SQ: i128 = 100;

/// The interpolated 2D seam position for a layer at `layer_z`.
///
/// Below the lowest seam point the lowest is used; above the highest the
/// result is None when `draw_z_seam_grow` (fall back to default seam
/// handling), else the highest point.
pub fn interpolated_seam_position(settings: &WallSettings, layer_z: Coord) -> Option<Point> {
    if !settings.draw_z_seam_enable || settings.draw_z_seam_points.is_empty() {
        return None;
    }
    if settings.draw_z_seam_points.len() == 1 {
        return Some(settings.draw_z_seam_points[0].xy());
    }

    let mut sorted: Vec<SeamPoint> = settings.draw_z_seam_points.clone();
    sorted.sort_by_key(|p| p.z);

    let min_z = sorted.first().unwrap().z;
    let max_z = sorted.last().unwrap().z;

    if layer_z < min_z {
        return Some(sorted.first().unwrap().xy());
    }
    if layer_z > max_z {
        if settings.draw_z_seam_grow {
            return None;
        }
        return Some(sorted.last().unwrap().xy());
    }

    for pair in sorted.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);
        if layer_z >= p1.z && layer_z <= p2.z {
            if layer_z == p1.z {
                return Some(p1.xy());
            }
            if layer_z == p2.z {
                return Some(p2.xy());
            }
            let t = (layer_z - p1.z) as f64 / (p2.z - p1.z) as f64;
            return Some(Point::new(
                p1.x + (t * (p2.x - p1.x) as f64) as Coord,
                p1.y + (t * (p2.y - p1.y) as f64) as Coord,
            ));
        }
    }
    None
}

/// Insert the seam target into the polygon edge nearest to it, unless the
/// nearest boundary point is an existing vertex already.
pub fn insert_seam_point(polygon: &Polygon, target: Point) -> Polygon {
    if polygon.len() < 3 {
        return polygon.clone();
    }

    let mut min_distance_sq = i128::MAX;
    let mut best_segment_idx = 0;
    let mut closest_on_segment = target;
    let mut need_insert = false;

    let n = polygon.len();
    for i in 0..n {
        let segment_start = polygon[i];
        let segment_end = polygon[(i + 1) % n];
        let closest = target.project_onto_segment(segment_start, segment_end);
        let distance_sq = target.distance_squared(&closest);
        if distance_sq < min_distance_sq {
            min_distance_sq = distance_sq;
            best_segment_idx = i;
            closest_on_segment = closest;
            let dist_to_start = closest.distance_squared(&segment_start);
            let dist_to_end = closest.distance_squared(&segment_end);
            need_insert =
                dist_to_start > ENDPOINT_SNAP_DIST_SQ && dist_to_end > ENDPOINT_SNAP_DIST_SQ;
        }
    }

    if !need_insert {
        return polygon.clone();
    }
    let mut result = polygon.clone();
    result.insert(best_segment_idx + 1, closest_on_segment);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_points(points: Vec<SeamPoint>, grow: bool) -> WallSettings {
        WallSettings {
            draw_z_seam_enable: true,
            z_seam_point_interpolation: true,
            draw_z_seam_grow: grow,
            draw_z_seam_points: points,
            ..Default::default()
        }
    }

    #[test]
    fn test_interpolation_between_points() {
        let settings = settings_with_points(
            vec![
                SeamPoint::new(0, 0, 0),
                SeamPoint::new(10_000, 0, 10_000),
            ],
            true,
        );
        let mid = interpolated_seam_position(&settings, 5_000).unwrap();
        assert_eq!(mid, Point::new(5_000, 0));
    }

    #[test]
    fn test_below_lowest_uses_lowest() {
        let settings = settings_with_points(
            vec![
                SeamPoint::new(1_000, 2_000, 5_000),
                SeamPoint::new(9_000, 2_000, 10_000),
            ],
            true,
        );
        assert_eq!(
            interpolated_seam_position(&settings, 0),
            Some(Point::new(1_000, 2_000))
        );
    }

    #[test]
    fn test_above_highest_grow_behavior() {
        let points = vec![
            SeamPoint::new(1_000, 2_000, 5_000),
            SeamPoint::new(9_000, 2_000, 10_000),
        ];
        let grow = settings_with_points(points.clone(), true);
        assert_eq!(interpolated_seam_position(&grow, 20_000), None);
        let pinned = settings_with_points(points, false);
        assert_eq!(
            interpolated_seam_position(&pinned, 20_000),
            Some(Point::new(9_000, 2_000))
        );
    }

    #[test]
    fn test_disabled_returns_none() {
        let settings = WallSettings::default();
        assert_eq!(interpolated_seam_position(&settings, 0), None);
    }

    #[test]
    fn test_insert_point_on_nearest_edge() {
        let square = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10_000),
            Point::new(0, 10_000),
        ]);
        let inserted = insert_seam_point(&square, Point::new(5_000, -300));
        assert_eq!(inserted.len(), 5);
        assert_eq!(inserted[1], Point::new(5_000, 0));
    }

    #[test]
    fn test_insert_skipped_near_vertex() {
        let square = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10_000),
            Point::new(0, 10_000),
        ]);
        let unchanged = insert_seam_point(&square, Point::new(3, 3));
        assert_eq!(unchanged.len(), 4);
    }
}
