//! Beading: decomposition of a local cross-section thickness into beads.
//!
//! A *bead* is one extruded line of thermoplastic, characterized by a width
//! and a centerline. A [`Beading`] describes how a given total thickness is
//! filled by a sequence of beads, and the [`BeadingStrategy`] stack decides
//! bead counts and widths for any thickness.

mod distributed;
mod factory;
mod fixed_outer;
mod flow;
mod limited;
mod outer_inset;
mod strategy;
mod widening;

pub use distributed::DistributedStrategy;
pub use factory::{make_fixed_outer_strategy, make_strategy, StrategyParams};
pub use fixed_outer::FixedOuterWallStrategy;
pub use flow::FlowCompensatedStrategy;
pub use limited::LimitedStrategy;
pub use outer_inset::OuterWallInsetStrategy;
pub use strategy::BeadingStrategy;
pub use widening::WideningStrategy;

use crate::Coord;
use serde::{Deserialize, Serialize};

/// The decomposition of a cross-section thickness into beads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Beading {
    /// The cross-section thickness this beading fills, in micrometers.
    pub total_thickness: Coord,

    /// Width of each bead, outermost first. A zero width marks a 0-width
    /// contour line used for inner-contour extraction.
    pub bead_widths: Vec<Coord>,

    /// Offset of each bead's centerline from the section's zero edge.
    /// Strictly increasing, parallel to `bead_widths`.
    pub toolpath_locations: Vec<Coord>,

    /// Thickness not filled by any bead.
    pub left_over: Coord,

    /// Optional per-bead flow multipliers, parallel to `bead_widths`.
    /// Empty means a ratio of 1.0 for every bead.
    pub flow_ratios: Vec<f64>,
}

impl Beading {
    /// A beading filling nothing: all thickness is left over.
    pub fn empty(total_thickness: Coord) -> Self {
        Self {
            total_thickness,
            left_over: total_thickness,
            ..Default::default()
        }
    }

    /// Number of beads.
    #[inline]
    pub fn bead_count(&self) -> usize {
        self.bead_widths.len()
    }

    /// The flow ratio for bead `i` (1.0 when no ratios are attached).
    #[inline]
    pub fn flow_ratio(&self, i: usize) -> f64 {
        self.flow_ratios.get(i).copied().unwrap_or(1.0)
    }
}

/// Component-wise weighted blend of two beadings.
///
/// The result starts from whichever side has the greater total thickness;
/// the first `min(len, len)` beads are averaged. Zero-width beads stay zero
/// so contour markers survive interpolation.
pub fn interpolate(left: &Beading, ratio_left_to_whole: f64, right: &Beading) -> Beading {
    let ratio_left_to_whole = ratio_left_to_whole.clamp(0.0, 1.0);
    let ratio_right_to_whole = 1.0 - ratio_left_to_whole;

    let mut ret = if left.total_thickness > right.total_thickness {
        left.clone()
    } else {
        right.clone()
    };
    let count = left.bead_widths.len().min(right.bead_widths.len());
    for inset_idx in 0..count {
        if left.bead_widths[inset_idx] == 0 || right.bead_widths[inset_idx] == 0 {
            ret.bead_widths[inset_idx] = 0; // 0-width wall markers stay 0-width.
        } else {
            ret.bead_widths[inset_idx] = (ratio_left_to_whole * left.bead_widths[inset_idx] as f64
                + ratio_right_to_whole * right.bead_widths[inset_idx] as f64)
                .round() as Coord;
        }
        ret.toolpath_locations[inset_idx] = (ratio_left_to_whole
            * left.toolpath_locations[inset_idx] as f64
            + ratio_right_to_whole * right.toolpath_locations[inset_idx] as f64)
            .round() as Coord;
    }
    ret
}

/// Blend two beadings around a radius at which one bead disappears.
///
/// If the interpolated location of the inset immediately outside the
/// switching radius still exceeds it, the ratio is re-solved so that inset
/// aligns with the switching radius (with a +0.1 bias, clamped to [0, 1])
/// and the blend repeated. This prevents an inset from jumping inward
/// across a transition.
pub fn interpolate_switching(
    left: &Beading,
    ratio_left_to_whole: f64,
    right: &Beading,
    switching_radius: Coord,
) -> Beading {
    let ret = interpolate(left, ratio_left_to_whole, right);

    let mut next_inset_idx: isize = left.toolpath_locations.len() as isize - 1;
    while next_inset_idx >= 0 {
        if switching_radius > left.toolpath_locations[next_inset_idx as usize] {
            break;
        }
        next_inset_idx -= 1;
    }
    if next_inset_idx < 0 {
        // There is no next inset, because there is only one.
        return ret;
    }
    let next_inset_idx = next_inset_idx as usize;
    if next_inset_idx + 1 == left.toolpath_locations.len() {
        // We can't adjust to fit the next edge because there is no previous one.
        return ret;
    }
    if ret.toolpath_locations[next_inset_idx] > switching_radius {
        // One inset disappeared between left and the merged one.
        // Solve f*l + (1-f)*r = s for f.
        let l = left.toolpath_locations[next_inset_idx] as f64;
        let r = right.toolpath_locations[next_inset_idx] as f64;
        let s = switching_radius as f64;
        let denom = l - r;
        if denom.abs() < f64::EPSILON {
            log::warn!("Zero denominator while re-solving a switching-radius interpolation; keeping the midpoint blend.");
            return interpolate(left, 0.5, right);
        }
        let new_ratio = ((s - r) / denom + 0.1).min(1.0);
        return interpolate(left, new_ratio, right);
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beading(thickness: Coord, widths: &[Coord], locations: &[Coord]) -> Beading {
        Beading {
            total_thickness: thickness,
            bead_widths: widths.to_vec(),
            toolpath_locations: locations.to_vec(),
            left_over: thickness - widths.iter().sum::<Coord>(),
            flow_ratios: Vec::new(),
        }
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = beading(800, &[400, 400], &[200, 600]);
        let b = beading(800, &[300, 500], &[150, 550]);
        let mid = interpolate(&a, 0.5, &b);
        assert_eq!(mid.bead_widths, vec![350, 450]);
        assert_eq!(mid.toolpath_locations, vec![175, 575]);
    }

    #[test]
    fn test_interpolate_keeps_zero_width_markers() {
        let a = beading(1000, &[400, 0], &[200, 500]);
        let b = beading(1000, &[500, 0], &[250, 500]);
        let mid = interpolate(&a, 0.5, &b);
        assert_eq!(mid.bead_widths[1], 0);
    }

    #[test]
    fn test_interpolate_extremes() {
        let a = beading(800, &[400, 400], &[200, 600]);
        let b = beading(800, &[300, 500], &[150, 550]);
        assert_eq!(interpolate(&a, 1.0, &b).bead_widths, a.bead_widths);
        assert_eq!(interpolate(&a, 0.0, &b).bead_widths, b.bead_widths);
    }

    #[test]
    fn test_interpolate_switching_pulls_inset_to_radius() {
        // The inset just outside the switching radius (idx 1, at 550 on the
        // left) would land at 740 under a plain 0.2 blend; the re-solved
        // ratio must pull it back to the switching radius.
        let left = beading(2000, &[400, 400, 400], &[200, 550, 900]);
        let right = beading(2000, &[400, 400, 400], &[400, 800, 1000]);
        let plain = interpolate(&left, 0.2, &right);
        assert!(plain.toolpath_locations[1] > 600);
        let blended = interpolate_switching(&left, 0.2, &right, 600);
        assert!(blended.toolpath_locations[1] <= 600);
    }
}
