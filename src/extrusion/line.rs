//! Variable-width extrusion polylines.

use super::ExtrusionJunction;
use crate::geometry::{simplify::SimplifyConfig, Line, Point, Polygon};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};

/// A polyline of extrusion junctions belonging to one perimeter ring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionLine {
    /// Which inset (wall ring) this line belongs to; 0 is the outer wall.
    pub inset_idx: usize,

    /// Whether this line is a single-bead thin segment running along the
    /// middle of an odd-count region, rather than one side of an even pair.
    pub is_odd: bool,

    /// Whether this line loops back on itself.
    pub is_closed: bool,

    /// The junctions of the path, in order.
    pub junctions: Vec<ExtrusionJunction>,
}

impl ExtrusionLine {
    pub fn new(inset_idx: usize, is_odd: bool) -> Self {
        Self {
            inset_idx,
            is_odd,
            is_closed: false,
            junctions: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    /// Whether this is the outermost wall ring.
    #[inline]
    pub fn is_outer_wall(&self) -> bool {
        self.inset_idx == 0
    }

    #[inline]
    pub fn front(&self) -> Option<&ExtrusionJunction> {
        self.junctions.first()
    }

    #[inline]
    pub fn back(&self) -> Option<&ExtrusionJunction> {
        self.junctions.last()
    }

    /// Total polyline length in micrometers.
    pub fn length(&self) -> Coord {
        let mut total = 0.0;
        for pair in self.junctions.windows(2) {
            total += pair[0].distance_to(&pair[1]);
        }
        total.round() as Coord
    }

    /// Whether the total length is below the given threshold.
    pub fn shorter_than(&self, len: Coord) -> bool {
        self.length() < len
    }

    /// The smallest junction width along the line.
    pub fn min_width(&self) -> Coord {
        self.junctions.iter().map(|j| j.w).min().unwrap_or(0)
    }

    /// The largest junction width along the line.
    pub fn max_width(&self) -> Coord {
        self.junctions.iter().map(|j| j.w).max().unwrap_or(0)
    }

    /// Reverse the path in place.
    pub fn reverse(&mut self) {
        self.junctions.reverse();
    }

    /// Convert to a plain polygon of the junction positions.
    /// A duplicated closing junction is not repeated.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::from_points(self.junctions.iter().map(|j| j.p).collect())
    }

    /// Simplify the line with the given tolerances, respecting `is_closed`:
    /// closed lines are treated as rings, open lines keep their endpoints.
    ///
    /// The junction kept for each surviving position retains its width.
    pub fn simplify(&self, config: &SimplifyConfig) -> ExtrusionLine {
        let min_len = if self.is_closed { 3 } else { 2 };
        if self.junctions.len() <= min_len {
            return self.clone();
        }

        // Drop a duplicated closing junction for ring processing.
        let mut junctions: Vec<ExtrusionJunction> = self.junctions.clone();
        let mut reclose = false;
        if self.is_closed && junctions.len() > 1 && junctions.first().map(|j| j.p) == junctions.last().map(|j| j.p) {
            junctions.pop();
            reclose = true;
        }

        let deviation_sq = config.max_deviation as f64 * config.max_deviation as f64;
        let n = junctions.len();
        let mut result: Vec<ExtrusionJunction> = Vec::with_capacity(n);
        for i in 0..n {
            if !self.is_closed && (i == 0 || i == n - 1) {
                result.push(junctions[i]);
                continue;
            }
            let prev = if result.is_empty() {
                junctions[(i + n - 1) % n].p
            } else {
                result.last().unwrap().p
            };
            let here = junctions[i];
            let next = junctions[(i + 1) % n].p;
            let short = (here.p - prev).shorter_than(config.max_resolution)
                || (next - here.p).shorter_than(config.max_resolution);
            if short && Line::distance_to_squared(here.p, prev, next) <= deviation_sq {
                continue;
            }
            result.push(here);
        }
        if result.len() < min_len {
            return self.clone();
        }

        let mut out = ExtrusionLine {
            inset_idx: self.inset_idx,
            is_odd: self.is_odd,
            is_closed: self.is_closed,
            junctions: result,
        };
        if reclose || self.is_closed {
            if let Some(&first) = out.junctions.first() {
                if out.junctions.last().map(|j| j.p) != Some(first.p) {
                    out.junctions.push(first);
                }
            }
        }
        out
    }

    /// Area covered by extruding each segment at its average width, in
    /// square micrometers. An approximation used by coverage checks.
    pub fn covered_area(&self) -> CoordF {
        let mut area = 0.0;
        for pair in self.junctions.windows(2) {
            let len = pair[0].distance_to(&pair[1]);
            let w = (pair[0].w + pair[1].w) as CoordF / 2.0;
            area += len * w;
        }
        area
    }
}

/// All extrusion lines of one inset (wall ring index).
pub type VariableWidthLines = Vec<ExtrusionLine>;

/// Helper to append a junction position iterator as a line.
impl FromIterator<ExtrusionJunction> for ExtrusionLine {
    fn from_iter<T: IntoIterator<Item = ExtrusionJunction>>(iter: T) -> Self {
        let junctions: Vec<ExtrusionJunction> = iter.into_iter().collect();
        let inset_idx = junctions.first().map(|j| j.perimeter_index).unwrap_or(0);
        ExtrusionLine {
            inset_idx,
            is_odd: false,
            is_closed: false,
            junctions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn junction(x: Coord, y: Coord, w: Coord) -> ExtrusionJunction {
        ExtrusionJunction::new(Point::new(x, y), w, 0)
    }

    #[test]
    fn test_length() {
        let mut line = ExtrusionLine::new(0, false);
        line.junctions.push(junction(0, 0, 400));
        line.junctions.push(junction(3_000, 4_000, 400));
        assert_eq!(line.length(), 5_000);
        assert!(line.shorter_than(5_001));
        assert!(!line.shorter_than(5_000));
    }

    #[test]
    fn test_min_max_width() {
        let mut line = ExtrusionLine::new(1, false);
        line.junctions.push(junction(0, 0, 380));
        line.junctions.push(junction(1_000, 0, 450));
        line.junctions.push(junction(2_000, 0, 420));
        assert_eq!(line.min_width(), 380);
        assert_eq!(line.max_width(), 450);
    }

    #[test]
    fn test_simplify_open_keeps_ends() {
        let mut line = ExtrusionLine::new(0, true);
        line.junctions.push(junction(0, 0, 400));
        line.junctions.push(junction(5_000, 3, 400)); // negligible deviation
        line.junctions.push(junction(10_000, 0, 400));
        let simplified = line.simplify(&SimplifyConfig::new(6_000, 25));
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified.front().unwrap().p, Point::new(0, 0));
        assert_eq!(simplified.back().unwrap().p, Point::new(10_000, 0));
    }

    #[test]
    fn test_simplify_closed_recloses() {
        let mut line = ExtrusionLine::new(0, false);
        line.is_closed = true;
        line.junctions.push(junction(0, 0, 400));
        line.junctions.push(junction(10_000, 0, 400));
        line.junctions.push(junction(10_000, 10_000, 400));
        line.junctions.push(junction(0, 10_000, 400));
        line.junctions.push(junction(0, 0, 400));
        let simplified = line.simplify(&SimplifyConfig::default());
        assert!(simplified.is_closed);
        assert_eq!(
            simplified.front().map(|j| j.p),
            simplified.back().map(|j| j.p)
        );
    }
}
