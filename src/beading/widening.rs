//! Widening meta-strategy: make thin features printable.
//!
//! Features thinner than one nominal bead are either widened to a single
//! printable bead or dropped entirely when below the minimum input width.

use super::{Beading, BeadingStrategy};
use crate::Coord;

#[derive(Debug, Clone)]
pub struct WideningStrategy {
    pub parent: Box<BeadingStrategy>,

    /// Features thinner than this are not printed at all.
    pub min_input_width: Coord,

    /// The minimum width a widened single bead may have.
    pub min_output_width: Coord,
}

impl WideningStrategy {
    pub fn new(parent: Box<BeadingStrategy>, min_input_width: Coord, min_output_width: Coord) -> Self {
        if min_output_width < parent.optimal_width() / 4 {
            log::warn!(
                "Widening strategy min_output_width ({} um) is far below the optimal width; widened beads may be unprintable.",
                min_output_width
            );
        }
        Self {
            parent,
            min_input_width,
            min_output_width,
        }
    }

    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        let optimal_width = self.parent.optimal_width();
        if thickness < optimal_width {
            let mut ret = Beading {
                total_thickness: thickness,
                ..Default::default()
            };
            if thickness >= self.min_input_width {
                let width = thickness.max(self.min_output_width).min(optimal_width);
                ret.bead_widths.push(width);
                ret.toolpath_locations.push(thickness / 2);
                ret.left_over = (thickness - width).max(0);
            } else {
                ret.left_over = thickness;
            }
            ret
        } else {
            self.parent.compute(thickness, bead_count)
        }
    }

    pub fn transition_thickness(&self, lower_bead_count: i64) -> Coord {
        if lower_bead_count == 0 {
            self.min_input_width
        } else {
            self.parent.transition_thickness(lower_bead_count)
        }
    }

    pub fn optimal_bead_count(&self, thickness: Coord) -> i64 {
        if thickness < self.min_input_width {
            return 0;
        }
        let ret = self.parent.optimal_bead_count(thickness);
        if ret < 1 {
            1
        } else {
            ret
        }
    }

    pub fn nonlinear_thicknesses(&self, lower_bead_count: i64) -> Vec<Coord> {
        let mut ret = vec![self.min_output_width];
        ret.extend(self.parent.nonlinear_thicknesses(lower_bead_count));
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::DistributedStrategy;

    fn strategy() -> WideningStrategy {
        let base = BeadingStrategy::Distributed(DistributedStrategy::new(400, 400, 0.5, 0.5, 0.5, 2));
        WideningStrategy::new(Box::new(base), 150, 300)
    }

    #[test]
    fn test_thin_feature_widened() {
        let s = strategy();
        let b = s.compute(200, 1);
        assert_eq!(b.bead_widths, vec![300]); // clamped up to min_output_width
        assert_eq!(b.toolpath_locations, vec![100]);
        assert_eq!(b.left_over, 0); // never negative
    }

    #[test]
    fn test_too_thin_left_over() {
        let s = strategy();
        let b = s.compute(100, 1);
        assert!(b.bead_widths.is_empty());
        assert_eq!(b.left_over, 100);
        assert_eq!(s.optimal_bead_count(100), 0);
    }

    #[test]
    fn test_forces_single_bead_above_input_width() {
        let s = strategy();
        assert_eq!(s.optimal_bead_count(160), 1);
        assert_eq!(s.transition_thickness(0), 150);
    }

    #[test]
    fn test_delegates_above_optimal() {
        let s = strategy();
        let b = s.compute(900, 2);
        assert_eq!(b.bead_widths, vec![450, 450]);
    }
}
