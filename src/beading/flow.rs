//! Flow-compensated meta-strategy.
//!
//! Very thin sections are printed with the narrowest width the extrusion
//! stays stable at, and the flow rate is reduced instead so the deposited
//! volume matches the true thickness.

use super::{Beading, BeadingStrategy};
use crate::Coord;

#[derive(Debug, Clone)]
pub struct FlowCompensatedStrategy {
    pub parent: Box<BeadingStrategy>,

    /// Thinnest section the strategy fills at all.
    pub min_target_width: Coord,

    /// Narrowest width the extrusion is stable at; thinner sections are
    /// computed at this width with a flow ratio attached.
    pub min_stable_width: Coord,

    /// Lower clamp for the attached flow ratios.
    pub max_flow_compensation_ratio: f64,
}

impl FlowCompensatedStrategy {
    pub fn new(
        parent: Box<BeadingStrategy>,
        min_target_width: Coord,
        min_stable_width: Coord,
        max_flow_compensation_ratio: f64,
    ) -> Self {
        let min_stable_width = if min_stable_width < min_target_width {
            log::warn!(
                "Flow compensation min_stable_width ({} um) below min_target_width ({} um); raising it.",
                min_stable_width,
                min_target_width
            );
            min_target_width
        } else {
            min_stable_width
        };
        Self {
            parent,
            min_target_width,
            min_stable_width,
            max_flow_compensation_ratio,
        }
    }

    fn needs_compensation(&self, thickness: Coord) -> bool {
        thickness < self.min_stable_width && thickness >= self.min_target_width
    }

    fn flow_ratio(&self, target_width: Coord, stable_width: Coord) -> f64 {
        if stable_width <= 0 {
            return 1.0;
        }
        let raw = target_width as f64 / stable_width as f64;
        raw.clamp(self.max_flow_compensation_ratio, 1.0)
    }

    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        if thickness < self.min_target_width {
            return Beading::empty(thickness);
        }
        if !self.needs_compensation(thickness) {
            return self.parent.compute(thickness, bead_count);
        }

        let stable = self.parent.compute(self.min_stable_width, bead_count);
        self.apply_compensation(stable, thickness)
    }

    fn apply_compensation(&self, beading: Beading, target_thickness: Coord) -> Beading {
        let mut result = beading;
        result.total_thickness = target_thickness;

        let total_stable_width: Coord = result.bead_widths.iter().sum();
        if result.bead_widths.is_empty() || total_stable_width <= 0 {
            result.left_over = target_thickness;
            result.bead_widths.clear();
            result.toolpath_locations.clear();
            result.flow_ratios.clear();
            return result;
        }

        let flow_ratio = self.flow_ratio(target_thickness, total_stable_width);
        let mut adjusted_total: Coord = 0;
        result.flow_ratios = vec![flow_ratio; result.bead_widths.len()];
        for width in &mut result.bead_widths {
            *width = ((*width as f64 * flow_ratio) as Coord).max(1);
            adjusted_total += *width;
        }
        result.left_over = (target_thickness - adjusted_total).max(0);
        result
    }

    pub fn transition_thickness(&self, lower_bead_count: i64) -> Coord {
        let parent_transition = self.parent.transition_thickness(lower_bead_count);
        parent_transition.max(self.min_stable_width)
    }

    pub fn optimal_bead_count(&self, thickness: Coord) -> i64 {
        if thickness >= self.min_target_width && thickness < self.min_stable_width {
            return 1;
        }
        self.parent.optimal_bead_count(thickness)
    }

    pub fn nonlinear_thicknesses(&self, lower_bead_count: i64) -> Vec<Coord> {
        let mut result = self.parent.nonlinear_thicknesses(lower_bead_count);
        result.push(self.min_target_width);
        result.push(self.min_stable_width);
        result.sort_unstable();
        result.dedup();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::DistributedStrategy;

    fn strategy() -> FlowCompensatedStrategy {
        let base = BeadingStrategy::Distributed(DistributedStrategy::new(400, 400, 0.5, 0.5, 0.5, 2));
        FlowCompensatedStrategy::new(Box::new(base), 100, 300, 0.25)
    }

    #[test]
    fn test_below_target_empty() {
        let b = strategy().compute(80, 1);
        assert!(b.bead_widths.is_empty());
        assert_eq!(b.left_over, 80);
    }

    #[test]
    fn test_compensated_band_attaches_flow() {
        let b = strategy().compute(200, 1);
        assert_eq!(b.bead_widths.len(), 1);
        assert_eq!(b.flow_ratios.len(), 1);
        // 200 / 300 stable
        assert!((b.flow_ratios[0] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(b.total_thickness, 200);
    }

    #[test]
    fn test_ratio_clamped() {
        let b = strategy().compute(100, 1);
        assert!((b.flow_ratios[0] - 1.0 / 3.0).abs() < 1e-9);
        let strict = FlowCompensatedStrategy::new(
            Box::new(BeadingStrategy::Distributed(DistributedStrategy::new(
                400, 400, 0.5, 0.5, 0.5, 2,
            ))),
            100,
            300,
            0.5,
        );
        let clamped = strict.compute(100, 1);
        assert!((clamped.flow_ratios[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stable_band_delegates() {
        let b = strategy().compute(800, 2);
        assert!(b.flow_ratios.is_empty());
        assert_eq!(b.bead_widths, vec![400, 400]);
    }

    #[test]
    fn test_forces_single_bead_in_band() {
        assert_eq!(strategy().optimal_bead_count(150), 1);
    }
}
