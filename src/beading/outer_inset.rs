//! Outer-wall offset meta-strategy.
//!
//! Shifts the outermost toolpath location inward by a constant, never past
//! the middle of the filled section. Compensates for the outer wall being
//! printed with a deliberate inset.

use super::{Beading, BeadingStrategy};
use crate::Coord;

#[derive(Debug, Clone)]
pub struct OuterWallInsetStrategy {
    pub parent: Box<BeadingStrategy>,

    /// How far the outermost centerline moves inward.
    pub outer_wall_offset: Coord,
}

impl OuterWallInsetStrategy {
    pub fn new(outer_wall_offset: Coord, parent: Box<BeadingStrategy>) -> Self {
        Self {
            parent,
            outer_wall_offset,
        }
    }

    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        let mut ret = self.parent.compute(thickness, bead_count);

        // Count extant beads, not zero-width markers.
        let real_beads = ret.bead_widths.iter().filter(|&&w| w > 0).count();
        let filled = thickness - ret.left_over;

        // No need to apply any inset if there is just a single wall.
        if real_beads < 2 {
            return ret;
        }

        if let Some(first) = ret.toolpath_locations.first_mut() {
            *first = (*first + self.outer_wall_offset).min(filled / 2);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::DistributedStrategy;

    fn strategy(offset: Coord) -> OuterWallInsetStrategy {
        let base = BeadingStrategy::Distributed(DistributedStrategy::new(400, 400, 0.5, 0.5, 0.5, 2));
        OuterWallInsetStrategy::new(offset, Box::new(base))
    }

    #[test]
    fn test_outer_location_shifted() {
        let b = strategy(50).compute(800, 2);
        assert_eq!(b.toolpath_locations[0], 250);
        assert_eq!(b.toolpath_locations[1], 600); // inner beads untouched
    }

    #[test]
    fn test_single_bead_not_shifted() {
        let b = strategy(50).compute(400, 1);
        assert_eq!(b.toolpath_locations[0], 200);
    }

    #[test]
    fn test_shift_clamped_to_middle() {
        let b = strategy(10_000).compute(800, 2);
        assert_eq!(b.toolpath_locations[0], 400);
    }
}
