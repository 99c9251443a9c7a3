//! Limited meta-strategy: cap the bead count.
//!
//! Beyond the cap the outer beads hold the optimal profile and zero-width
//! marker beads are inserted at the innermost locations. These markers
//! delimit the filled wall region; downstream they become the inner
//! contour rather than printed paths.

use super::{Beading, BeadingStrategy};
use crate::Coord;

/// Arbitrarily large thickness reported for bead counts beyond the cap.
const INFINITE_THICKNESS: Coord = 10_000_000;

#[derive(Debug, Clone)]
pub struct LimitedStrategy {
    pub max_bead_count: i64,
    pub parent: Box<BeadingStrategy>,
}

impl LimitedStrategy {
    pub fn new(max_bead_count: i64, parent: Box<BeadingStrategy>) -> Self {
        Self {
            max_bead_count,
            parent,
        }
    }

    pub fn optimal_thickness(&self, bead_count: i64) -> Coord {
        if bead_count <= self.max_bead_count {
            return self.parent.optimal_thickness(bead_count);
        }
        INFINITE_THICKNESS
    }

    pub fn transition_thickness(&self, lower_bead_count: i64) -> Coord {
        if lower_bead_count < self.max_bead_count {
            return self.parent.transition_thickness(lower_bead_count);
        }
        if lower_bead_count == self.max_bead_count {
            return self.parent.optimal_thickness(lower_bead_count + 1) - 10;
        }
        INFINITE_THICKNESS - 1_000_000
    }

    pub fn optimal_bead_count(&self, thickness: Coord) -> i64 {
        let parent_bead_count = self.parent.optimal_bead_count(thickness);
        if parent_bead_count <= self.max_bead_count {
            parent_bead_count
        } else if parent_bead_count == self.max_bead_count + 1 {
            self.max_bead_count + 1
        } else {
            self.max_bead_count + 2
        }
    }

    pub fn transitioning_length(&self, lower_bead_count: i64) -> Coord {
        if lower_bead_count < self.max_bead_count {
            return self.parent.transitioning_length(lower_bead_count);
        }
        10
    }

    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        if bead_count <= self.max_bead_count {
            let mut ret = self.parent.compute(thickness, bead_count);
            let actual_count = ret.toolpath_locations.len() as i64;

            // At exactly the cap with an even count, mark the middle so the
            // inner contour is still delimited.
            if actual_count % 2 == 0 && actual_count == self.max_bead_count {
                let inner = (self.max_bead_count / 2 - 1) as usize;
                let location = ret.toolpath_locations[inner];
                let width = ret.bead_widths[inner];
                insert_marker(&mut ret, inner + 1, location + width / 2);
            }
            return ret;
        }

        if bead_count != self.max_bead_count + 1 {
            log::warn!(
                "Too many beads: {} != {}; computing the capped profile.",
                bead_count,
                self.max_bead_count + 1
            );
        }
        let optimal_thickness = self.parent.optimal_thickness(self.max_bead_count);
        let mut ret = self.parent.compute(optimal_thickness, self.max_bead_count);
        let actual_count = ret.toolpath_locations.len() as i64;
        ret.left_over += thickness - ret.total_thickness;
        ret.total_thickness = thickness;

        // Enforce symmetry around the section center. With an odd cap the
        // middle bead cannot span the unfilled center; it degrades to a
        // zero-width marker there and its width moves to the left-over.
        if actual_count % 2 == 1 {
            let mid = (actual_count / 2) as usize;
            ret.toolpath_locations[mid] = thickness / 2;
            ret.left_over += ret.bead_widths[mid];
            ret.bead_widths[mid] = 0;
        }
        for idx in 0..((actual_count + 1) / 2) as usize {
            let mirrored = actual_count as usize - 1 - idx;
            ret.toolpath_locations[mirrored] = thickness - ret.toolpath_locations[idx];
        }

        // Zero-width marker beads on both sides of the unfilled middle.
        let half = (self.max_bead_count / 2) as usize;
        if half == 0 || half > ret.toolpath_locations.len() {
            return ret;
        }
        let inner_location = ret.toolpath_locations[half - 1];
        let inner_width = ret.bead_widths[half - 1];
        insert_marker(&mut ret, half, inner_location + inner_width / 2);

        let mirror_idx = ret.toolpath_locations.len() - half;
        let inner_location_r = ret.toolpath_locations[mirror_idx];
        let inner_width_r = ret.bead_widths[mirror_idx];
        insert_marker(&mut ret, mirror_idx, inner_location_r - inner_width_r / 2);

        ret
    }
}

fn insert_marker(beading: &mut Beading, index: usize, location: Coord) {
    beading.toolpath_locations.insert(index, location);
    beading.bead_widths.insert(index, 0);
    if !beading.flow_ratios.is_empty() {
        beading.flow_ratios.insert(index, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::DistributedStrategy;

    fn strategy(max: i64) -> LimitedStrategy {
        let base = BeadingStrategy::Distributed(DistributedStrategy::new(400, 400, 0.5, 0.5, 0.5, 2));
        LimitedStrategy::new(max, Box::new(base))
    }

    #[test]
    fn test_count_capped() {
        let s = strategy(4);
        assert_eq!(s.optimal_bead_count(1_600), 4);
        assert_eq!(s.optimal_bead_count(2_000), 5);
        assert_eq!(s.optimal_bead_count(10_000), 6);
    }

    #[test]
    fn test_markers_above_cap() {
        let s = strategy(4);
        // Thickness well above the cap: 4 real beads + 2 zero markers.
        let b = s.compute(10_000, 5);
        assert_eq!(b.total_thickness, 10_000);
        assert_eq!(b.bead_widths.len(), 6);
        assert_eq!(b.bead_widths[2], 0);
        assert_eq!(b.bead_widths[3], 0);
        // Real beads hold the optimal profile on both sides.
        assert_eq!(b.bead_widths[0], 400);
        assert_eq!(b.bead_widths[1], 400);
        assert_eq!(b.toolpath_locations[0], 200);
        assert_eq!(b.toolpath_locations[1], 600);
        // Markers delimit the filled band: 800 from each boundary.
        assert_eq!(b.toolpath_locations[2], 800);
        assert_eq!(b.toolpath_locations[3], 10_000 - 800);
        // Mirrored real beads.
        assert_eq!(b.toolpath_locations[4], 10_000 - 600);
        assert_eq!(b.toolpath_locations[5], 10_000 - 200);
        // Locations strictly increasing.
        assert!(b.toolpath_locations.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_odd_cap_center_becomes_marker() {
        let s = strategy(3);
        let b = s.compute(5_000, 4);
        // One real bead per side; the center and the band edges are markers.
        let real: Vec<Coord> = b.bead_widths.iter().copied().filter(|&w| w > 0).collect();
        assert_eq!(real, vec![400, 400]);
        // Width bookkeeping still holds.
        let sum: Coord = b.bead_widths.iter().sum();
        assert_eq!(sum + b.left_over, 5_000);
        assert!(b.toolpath_locations.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_below_cap_delegates() {
        let s = strategy(4);
        let b = s.compute(800, 2);
        assert_eq!(b.bead_widths, vec![400, 400]);
    }
}
