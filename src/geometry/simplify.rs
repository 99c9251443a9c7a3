//! Path simplification.
//!
//! Douglas-Peucker simplification plus short-segment removal, used by
//! outline preprocessing and toolpath post-processing. Tolerances are the
//! `meshfix_maximum_resolution` / `meshfix_maximum_deviation` pair: segments
//! shorter than the resolution may be removed as long as the path stays
//! within the deviation.

use super::{Line, Point, Polygon, Shape};
use crate::Coord;

/// Configuration for path simplification, in micrometers.
#[derive(Debug, Clone, Copy)]
pub struct SimplifyConfig {
    /// Segments shorter than this may be removed.
    pub max_resolution: Coord,

    /// Points can be removed if the resulting path deviates by less than
    /// this.
    pub max_deviation: Coord,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            max_resolution: 250,
            max_deviation: 25,
        }
    }
}

impl SimplifyConfig {
    pub fn new(max_resolution: Coord, max_deviation: Coord) -> Self {
        Self {
            max_resolution,
            max_deviation,
        }
    }
}

/// Douglas-Peucker simplification of an open point sequence.
/// The first and last points are always preserved.
pub fn douglas_peucker(points: &[Point], tolerance: Coord) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let tolerance_sq = tolerance as f64 * tolerance as f64;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    // Stack-based rather than recursive to avoid deep call stacks.
    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((anchor, floater)) = stack.pop() {
        if anchor + 1 >= floater {
            continue;
        }
        let mut max_dist_sq = 0.0;
        let mut furthest = anchor;
        for i in (anchor + 1)..floater {
            let dist_sq = Line::distance_to_squared(points[i], points[anchor], points[floater]);
            if dist_sq > max_dist_sq {
                max_dist_sq = dist_sq;
                furthest = i;
            }
        }
        if max_dist_sq > tolerance_sq {
            keep[furthest] = true;
            stack.push((anchor, furthest));
            stack.push((furthest, floater));
        }
    }

    points
        .iter()
        .enumerate()
        .filter(|(i, _)| keep[*i])
        .map(|(_, p)| *p)
        .collect()
}

/// Remove vertices between segments shorter than the resolution when the
/// removal keeps the path within the deviation, then run Douglas-Peucker
/// with the deviation tolerance.
///
/// For closed paths the caller passes the ring without a duplicated closing
/// point; the wrap-around segment is considered.
pub fn simplify_points(points: &[Point], config: &SimplifyConfig, is_closed: bool) -> Vec<Point> {
    let min_len = if is_closed { 3 } else { 2 };
    if points.len() < min_len {
        return points.to_vec();
    }

    // Short-segment pass: drop a vertex when one of its segments is below
    // the resolution and the vertex is within the deviation of the chord.
    let mut result: Vec<Point> = Vec::with_capacity(points.len());
    let n = points.len();
    let deviation_sq = config.max_deviation as f64 * config.max_deviation as f64;
    for i in 0..n {
        if !is_closed && (i == 0 || i == n - 1) {
            result.push(points[i]);
            continue;
        }
        let prev = if result.is_empty() {
            points[(i + n - 1) % n]
        } else {
            *result.last().unwrap()
        };
        let here = points[i];
        let next = points[(i + 1) % n];
        let short = (here - prev).shorter_than(config.max_resolution)
            || (next - here).shorter_than(config.max_resolution);
        if short && Line::distance_to_squared(here, prev, next) <= deviation_sq {
            continue;
        }
        result.push(here);
    }
    if result.len() < min_len {
        return points.to_vec();
    }

    douglas_peucker(&result, config.max_deviation)
}

/// Simplify a polygon ring in place. Rings collapsing below 3 vertices are
/// left unchanged.
pub fn simplify_polygon(polygon: &Polygon, config: &SimplifyConfig) -> Polygon {
    let simplified = simplify_points(polygon.points(), config, true);
    if simplified.len() < 3 {
        return polygon.clone();
    }
    Polygon::from_points(simplified)
}

/// Simplify every ring of a shape, dropping rings that degenerate.
pub fn simplify_shape(shape: &Shape, config: &SimplifyConfig) -> Shape {
    shape
        .iter()
        .map(|p| simplify_polygon(p, config))
        .filter(|p| p.len() >= 3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_douglas_peucker_collinear() {
        let points = vec![
            Point::new(0, 0),
            Point::new(5_000, 2), // 2 µm off the line
            Point::new(10_000, 0),
        ];
        let simplified = douglas_peucker(&points, 25);
        assert_eq!(simplified.len(), 2);
    }

    #[test]
    fn test_douglas_peucker_keeps_corners() {
        let points = vec![
            Point::new(0, 0),
            Point::new(5_000, 5_000),
            Point::new(10_000, 0),
        ];
        let simplified = douglas_peucker(&points, 25);
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn test_simplify_removes_tiny_segments() {
        let poly = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10), // 10 µm stub
            Point::new(10_000, 10_000),
            Point::new(0, 10_000),
        ]);
        let config = SimplifyConfig::new(250, 25);
        let simplified = simplify_polygon(&poly, &config);
        assert_eq!(simplified.len(), 4);
    }

    #[test]
    fn test_simplify_idempotent() {
        let poly = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10_000),
            Point::new(0, 10_000),
        ]);
        let config = SimplifyConfig::default();
        let once = simplify_polygon(&poly, &config);
        let twice = simplify_polygon(&once, &config);
        assert_eq!(once, twice);
    }
}
