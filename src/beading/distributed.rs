//! The distributed base strategy.
//!
//! Surplus or deficit thickness is distributed over the innermost beads
//! with a quadratic falloff: the middle bead absorbs most of the variation,
//! beads further out progressively less, and beads beyond the distribution
//! radius keep their nominal width.

use super::Beading;
use crate::Coord;

/// Base strategy: evenly spread beads with centered width redistribution.
#[derive(Debug, Clone)]
pub struct DistributedStrategy {
    /// The ideal bead width.
    pub optimal_width: Coord,

    /// Transition length used for bead counts above zero.
    pub default_transition_length: Coord,

    /// The angle a wall can make before a transition is needed (radians).
    pub transitioning_angle: f64,

    /// How far between even-count optima the central bead splits in two.
    pub split_middle_threshold: f64,

    /// How far between odd-count optima a new central bead is added.
    pub add_middle_threshold: f64,

    one_over_distribution_radius_squared: f64,
}

impl DistributedStrategy {
    pub fn new(
        optimal_width: Coord,
        default_transition_length: Coord,
        transitioning_angle: f64,
        split_middle_threshold: f64,
        add_middle_threshold: f64,
        distribution_radius: i64,
    ) -> Self {
        let one_over_distribution_radius_squared = if distribution_radius >= 2 {
            let r = (distribution_radius - 1) as f64;
            1.0 / (r * r)
        } else {
            1.0
        };
        Self {
            optimal_width,
            default_transition_length,
            transitioning_angle,
            split_middle_threshold,
            add_middle_threshold,
            one_over_distribution_radius_squared,
        }
    }

    pub fn optimal_thickness(&self, bead_count: i64) -> Coord {
        self.optimal_width * bead_count.max(0)
    }

    pub fn transition_thickness(&self, lower_bead_count: i64) -> Coord {
        let lower_ideal = self.optimal_thickness(lower_bead_count);
        let higher_ideal = self.optimal_thickness(lower_bead_count + 1);
        let threshold = if lower_bead_count % 2 == 1 {
            self.split_middle_threshold
        } else {
            self.add_middle_threshold
        };
        lower_ideal + (threshold * (higher_ideal - lower_ideal) as f64).round() as Coord
    }

    pub fn optimal_bead_count(&self, thickness: Coord) -> i64 {
        let naive_count = thickness / self.optimal_width;
        let remainder = thickness - naive_count * self.optimal_width;
        let threshold = if naive_count % 2 == 1 {
            self.split_middle_threshold
        } else {
            self.add_middle_threshold
        };
        let minimum_line_width = (self.optimal_width as f64 * threshold).round() as Coord;
        naive_count + i64::from(remainder >= minimum_line_width)
    }

    pub fn transitioning_length(&self, lower_bead_count: i64) -> Coord {
        if lower_bead_count == 0 {
            return 10;
        }
        self.default_transition_length
    }

    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        let mut ret = Beading {
            total_thickness: thickness,
            ..Default::default()
        };

        if bead_count > 2 {
            let to_be_divided = thickness - bead_count * self.optimal_width;
            let middle = (bead_count - 1) as f64 / 2.0;

            let weight = |bead_idx: i64| -> f64 {
                let dev_from_middle = bead_idx as f64 - middle;
                (1.0 - self.one_over_distribution_radius_squared * dev_from_middle * dev_from_middle)
                    .max(0.0)
            };

            let total_weight: f64 = (0..bead_count).map(weight).sum();
            for bead_idx in 0..bead_count {
                let weight_fraction = weight(bead_idx) / total_weight;
                let splitup_left_over = (to_be_divided as f64 * weight_fraction) as Coord;
                let width = self.optimal_width + splitup_left_over;
                if bead_idx == 0 {
                    ret.toolpath_locations.push(width / 2);
                } else {
                    let prev_location = *ret.toolpath_locations.last().unwrap();
                    let prev_width = *ret.bead_widths.last().unwrap();
                    ret.toolpath_locations
                        .push(prev_location + (prev_width + width) / 2);
                }
                ret.bead_widths.push(width);
            }
            ret.left_over = thickness - ret.bead_widths.iter().sum::<Coord>();
        } else if bead_count == 2 {
            let outer_width = thickness / 2;
            ret.bead_widths.push(outer_width);
            ret.bead_widths.push(outer_width);
            ret.toolpath_locations.push(outer_width / 2);
            ret.toolpath_locations.push(thickness - outer_width / 2);
            ret.left_over = thickness - 2 * outer_width;
        } else if bead_count == 1 {
            ret.bead_widths.push(thickness);
            ret.toolpath_locations.push(thickness / 2);
            ret.left_over = 0;
        } else {
            ret.left_over = thickness;
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> DistributedStrategy {
        DistributedStrategy::new(400, 400, 0.5, 0.5, 0.5, 2)
    }

    #[test]
    fn test_optimal_bead_count() {
        let s = strategy();
        assert_eq!(s.optimal_bead_count(400), 1);
        assert_eq!(s.optimal_bead_count(800), 2);
        // Just below the add threshold (0.5 * 400 = 200 past 800)
        assert_eq!(s.optimal_bead_count(999), 2);
        assert_eq!(s.optimal_bead_count(1000), 3);
    }

    #[test]
    fn test_compute_single_bead_fills_thickness() {
        let b = strategy().compute(350, 1);
        assert_eq!(b.bead_widths, vec![350]);
        assert_eq!(b.toolpath_locations, vec![175]);
        assert_eq!(b.left_over, 0);
    }

    #[test]
    fn test_compute_two_beads_split_evenly() {
        let b = strategy().compute(900, 2);
        assert_eq!(b.bead_widths, vec![450, 450]);
        assert_eq!(b.toolpath_locations, vec![225, 675]);
        assert_eq!(b.left_over, 0);
    }

    #[test]
    fn test_compute_distributes_surplus_to_middle() {
        // 3 beads at optimal 400 would be 1200; surplus of 150 goes to the
        // middle bead under distribution radius 2.
        let b = strategy().compute(1350, 3);
        assert_eq!(b.bead_widths.len(), 3);
        assert!(b.bead_widths[1] > b.bead_widths[0]);
        assert_eq!(b.bead_widths[0], b.bead_widths[2]);
        // Everything accounted for
        let sum: Coord = b.bead_widths.iter().sum();
        assert_eq!(sum + b.left_over, 1350);
        // Locations strictly increasing
        assert!(b.toolpath_locations.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_compute_zero_beads() {
        let b = strategy().compute(120, 0);
        assert!(b.bead_widths.is_empty());
        assert_eq!(b.left_over, 120);
    }

    #[test]
    fn test_invariant_widths_and_locations_parallel() {
        let s = strategy();
        for n in 0..6 {
            let t = s.optimal_thickness(n) + 37;
            let b = s.compute(t, n);
            assert_eq!(b.bead_widths.len(), b.toolpath_locations.len());
        }
    }
}
