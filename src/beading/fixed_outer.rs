//! Fixed-outer-wall meta-strategy.
//!
//! Pins the two outermost beads at a fixed width and delegates only the
//! interior portion of the cross-section to the parent strategy. Used when
//! the outer wall must keep a constant width for surface quality while the
//! inner walls absorb all thickness variation.

use super::{Beading, BeadingStrategy};
use crate::Coord;

#[derive(Debug, Clone)]
pub struct FixedOuterWallStrategy {
    pub parent: Box<BeadingStrategy>,

    /// The pinned width of the outermost bead on each side.
    pub fixed_outer_width: Coord,

    /// Fraction of a line width below which no variable line is emitted.
    pub minimum_variable_line_ratio: f64,
}

impl FixedOuterWallStrategy {
    pub fn new(
        fixed_outer_width: Coord,
        minimum_variable_line_ratio: f64,
        parent: Box<BeadingStrategy>,
    ) -> Self {
        Self {
            parent,
            fixed_outer_width,
            minimum_variable_line_ratio,
        }
    }

    fn min_thickness(&self) -> Coord {
        (self.minimum_variable_line_ratio * self.fixed_outer_width as f64).round() as Coord
    }

    pub fn optimal_thickness(&self, bead_count: i64) -> Coord {
        match bead_count {
            i64::MIN..=0 => 0,
            1 => self.fixed_outer_width,
            2 => 2 * self.fixed_outer_width,
            _ => 2 * self.fixed_outer_width + self.parent.optimal_thickness(bead_count - 2),
        }
    }

    pub fn transition_thickness(&self, lower_bead_count: i64) -> Coord {
        match lower_bead_count {
            0 => self.min_thickness(),
            1 => self.fixed_outer_width + self.min_thickness(),
            2 => {
                2 * self.fixed_outer_width
                    + (self.minimum_variable_line_ratio * self.parent.optimal_width() as f64).round()
                        as Coord
            }
            _ => {
                2 * self.fixed_outer_width + self.parent.transition_thickness(lower_bead_count - 2)
            }
        }
    }

    pub fn optimal_bead_count(&self, thickness: Coord) -> i64 {
        if thickness < self.min_thickness() {
            return 0;
        }
        if thickness <= self.fixed_outer_width {
            return 1;
        }
        if thickness <= 2 * self.fixed_outer_width {
            return 2;
        }
        let inner_thickness = thickness - 2 * self.fixed_outer_width;
        2 + self.parent.optimal_bead_count(inner_thickness)
    }

    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        let mut ret = Beading {
            total_thickness: thickness,
            ..Default::default()
        };

        if bead_count == 0 || thickness < self.min_thickness() {
            ret.left_over = thickness;
            return ret;
        }

        if bead_count == 1 {
            ret.bead_widths.push(self.fixed_outer_width);
            ret.toolpath_locations.push(thickness / 2);
            ret.left_over = thickness - self.fixed_outer_width;
            return ret;
        }

        if bead_count == 2 {
            ret.bead_widths.push(self.fixed_outer_width);
            ret.bead_widths.push(self.fixed_outer_width);
            ret.toolpath_locations.push(self.fixed_outer_width / 2);
            ret.toolpath_locations
                .push(thickness - self.fixed_outer_width / 2);
            ret.left_over = thickness - 2 * self.fixed_outer_width;
            return ret;
        }

        // Three or more beads: two fixed outer beads plus an inner section
        // delegated to the parent, shifted inward past the first bead.
        let inner_bead_count = bead_count - 2;
        let inner_thickness = thickness - 2 * self.fixed_outer_width;

        if inner_thickness > 0 && inner_bead_count > 0 {
            let mut inner = self.parent.compute(inner_thickness, inner_bead_count);
            for location in &mut inner.toolpath_locations {
                *location += self.fixed_outer_width;
            }
            ret.bead_widths = inner.bead_widths;
            ret.toolpath_locations = inner.toolpath_locations;
            ret.flow_ratios = inner.flow_ratios;
            ret.left_over = inner.left_over;
        }

        ret.bead_widths.insert(0, self.fixed_outer_width);
        ret.toolpath_locations.insert(0, self.fixed_outer_width / 2);
        ret.bead_widths.push(self.fixed_outer_width);
        ret.toolpath_locations
            .push(thickness - self.fixed_outer_width / 2);
        if !ret.flow_ratios.is_empty() {
            ret.flow_ratios.insert(0, 1.0);
            ret.flow_ratios.push(1.0);
        }

        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::DistributedStrategy;

    fn strategy() -> FixedOuterWallStrategy {
        let base = BeadingStrategy::Distributed(DistributedStrategy::new(500, 400, 0.5, 0.5, 0.5, 2));
        FixedOuterWallStrategy::new(400, 0.5, Box::new(base))
    }

    #[test]
    fn test_four_beads_1600() {
        // 1600 um total at 4 beads: two fixed 400 outer beads, two inner
        // beads filling the remaining 800.
        let b = strategy().compute(1_600, 4);
        assert_eq!(b.bead_widths, vec![400, 400, 400, 400]);
        assert_eq!(b.toolpath_locations, vec![200, 600, 1_000, 1_400]);
        assert_eq!(b.left_over, 0);
    }

    #[test]
    fn test_single_bead_fixed_width() {
        let b = strategy().compute(500, 1);
        assert_eq!(b.bead_widths, vec![400]);
        assert_eq!(b.toolpath_locations, vec![250]);
        assert_eq!(b.left_over, 100);
    }

    #[test]
    fn test_two_beads_pinned_at_edges() {
        let b = strategy().compute(1_000, 2);
        assert_eq!(b.bead_widths, vec![400, 400]);
        assert_eq!(b.toolpath_locations, vec![200, 800]);
        assert_eq!(b.left_over, 200);
    }

    #[test]
    fn test_transition_thicknesses() {
        let s = strategy();
        assert_eq!(s.transition_thickness(0), 200); // 0.5 * 400
        assert_eq!(s.transition_thickness(1), 600); // 400 + 0.5 * 400
        assert_eq!(s.transition_thickness(2), 1_050); // 800 + 0.5 * 500
    }

    #[test]
    fn test_bead_count_shifts_into_parent() {
        let s = strategy();
        assert_eq!(s.optimal_bead_count(100), 0);
        assert_eq!(s.optimal_bead_count(400), 1);
        assert_eq!(s.optimal_bead_count(800), 2);
        assert_eq!(s.optimal_bead_count(1_400), 3); // 600 inner: one 500-wide parent bead
    }
}
