//! The beading strategy stack.
//!
//! A strategy answers the four questions of a beading engine: at which
//! thickness do `n` beads fit optimally, at which thickness does the engine
//! flip from `n` to `n + 1` beads, how many beads to use for a thickness,
//! and how a thickness decomposes into bead widths and centerline radii.
//!
//! The base [`DistributedStrategy`] is decorated by meta-strategies that
//! each wrap a parent and override some of the queries. The set of
//! strategies is closed, so the stack is a tagged enum rather than trait
//! objects.

use super::{
    Beading, DistributedStrategy, FixedOuterWallStrategy, FlowCompensatedStrategy,
    LimitedStrategy, OuterWallInsetStrategy, WideningStrategy,
};
use crate::Coord;

/// A composed stack of beading strategies.
#[derive(Debug, Clone)]
pub enum BeadingStrategy {
    Distributed(DistributedStrategy),
    Widening(WideningStrategy),
    Limited(LimitedStrategy),
    OuterWallInset(OuterWallInsetStrategy),
    FixedOuterWall(FixedOuterWallStrategy),
    FlowCompensated(FlowCompensatedStrategy),
}

impl BeadingStrategy {
    /// The ideal bead width of the underlying base strategy.
    pub fn optimal_width(&self) -> Coord {
        match self {
            Self::Distributed(s) => s.optimal_width,
            Self::Widening(s) => s.parent.optimal_width(),
            Self::Limited(s) => s.parent.optimal_width(),
            Self::OuterWallInset(s) => s.parent.optimal_width(),
            Self::FixedOuterWall(s) => s.parent.optimal_width(),
            Self::FlowCompensated(s) => s.parent.optimal_width(),
        }
    }

    /// The angle (radians) a wall can make before a transition is needed.
    pub fn transitioning_angle(&self) -> f64 {
        match self {
            Self::Distributed(s) => s.transitioning_angle,
            Self::Widening(s) => s.parent.transitioning_angle(),
            Self::Limited(s) => s.parent.transitioning_angle(),
            Self::OuterWallInset(s) => s.parent.transitioning_angle(),
            Self::FixedOuterWall(s) => s.parent.transitioning_angle(),
            Self::FlowCompensated(s) => s.parent.transitioning_angle(),
        }
    }

    /// The thickness at which `bead_count` beads of nominal width fit
    /// exactly.
    pub fn optimal_thickness(&self, bead_count: i64) -> Coord {
        match self {
            Self::Distributed(s) => s.optimal_thickness(bead_count),
            Self::Widening(s) => s.parent.optimal_thickness(bead_count),
            Self::Limited(s) => s.optimal_thickness(bead_count),
            Self::OuterWallInset(s) => s.parent.optimal_thickness(bead_count),
            Self::FixedOuterWall(s) => s.optimal_thickness(bead_count),
            Self::FlowCompensated(s) => s.parent.optimal_thickness(bead_count),
        }
    }

    /// The thickness at which the engine flips from `lower_bead_count` to
    /// `lower_bead_count + 1` beads.
    pub fn transition_thickness(&self, lower_bead_count: i64) -> Coord {
        match self {
            Self::Distributed(s) => s.transition_thickness(lower_bead_count),
            Self::Widening(s) => s.transition_thickness(lower_bead_count),
            Self::Limited(s) => s.transition_thickness(lower_bead_count),
            Self::OuterWallInset(s) => s.parent.transition_thickness(lower_bead_count),
            Self::FixedOuterWall(s) => s.transition_thickness(lower_bead_count),
            Self::FlowCompensated(s) => s.transition_thickness(lower_bead_count),
        }
    }

    /// The chosen bead count at the given thickness.
    pub fn optimal_bead_count(&self, thickness: Coord) -> i64 {
        match self {
            Self::Distributed(s) => s.optimal_bead_count(thickness),
            Self::Widening(s) => s.optimal_bead_count(thickness),
            Self::Limited(s) => s.optimal_bead_count(thickness),
            Self::OuterWallInset(s) => s.parent.optimal_bead_count(thickness),
            Self::FixedOuterWall(s) => s.optimal_bead_count(thickness),
            Self::FlowCompensated(s) => s.optimal_bead_count(thickness),
        }
    }

    /// Produce a full beading for `thickness` at `bead_count` beads.
    pub fn compute(&self, thickness: Coord, bead_count: i64) -> Beading {
        match self {
            Self::Distributed(s) => s.compute(thickness, bead_count),
            Self::Widening(s) => s.compute(thickness, bead_count),
            Self::Limited(s) => s.compute(thickness, bead_count),
            Self::OuterWallInset(s) => s.compute(thickness, bead_count),
            Self::FixedOuterWall(s) => s.compute(thickness, bead_count),
            Self::FlowCompensated(s) => s.compute(thickness, bead_count),
        }
    }

    /// The length over which a transition from `lower_bead_count` to one
    /// more bead is spread along the skeleton.
    pub fn transitioning_length(&self, lower_bead_count: i64) -> Coord {
        match self {
            Self::Distributed(s) => s.transitioning_length(lower_bead_count),
            Self::Widening(s) => s.parent.transitioning_length(lower_bead_count),
            Self::Limited(s) => s.transitioning_length(lower_bead_count),
            Self::OuterWallInset(s) => s.parent.transitioning_length(lower_bead_count),
            Self::FixedOuterWall(s) => s.parent.transitioning_length(lower_bead_count),
            Self::FlowCompensated(s) => s.parent.transitioning_length(lower_bead_count),
        }
    }

    /// Fraction in [0, 1] locating the transition middle along the
    /// transition length.
    pub fn transition_anchor_pos(&self, lower_bead_count: i64) -> f64 {
        match self {
            Self::Distributed(_) => self.default_transition_anchor_pos(lower_bead_count),
            Self::Widening(s) => s.parent.transition_anchor_pos(lower_bead_count),
            Self::Limited(s) => {
                if lower_bead_count < s.max_bead_count {
                    s.parent.transition_anchor_pos(lower_bead_count)
                } else {
                    1.0
                }
            }
            Self::OuterWallInset(s) => s.parent.transition_anchor_pos(lower_bead_count),
            Self::FixedOuterWall(s) => s.parent.transition_anchor_pos(lower_bead_count),
            Self::FlowCompensated(s) => s.parent.transition_anchor_pos(lower_bead_count),
        }
    }

    /// Extra thicknesses at which rib edges should be inserted to capture
    /// nonlinear width changes.
    pub fn nonlinear_thicknesses(&self, lower_bead_count: i64) -> Vec<Coord> {
        match self {
            Self::Distributed(_) => Vec::new(),
            Self::Widening(s) => s.nonlinear_thicknesses(lower_bead_count),
            Self::Limited(s) => s.parent.nonlinear_thicknesses(lower_bead_count),
            Self::OuterWallInset(s) => s.parent.nonlinear_thicknesses(lower_bead_count),
            Self::FixedOuterWall(s) => s.parent.nonlinear_thicknesses(lower_bead_count),
            Self::FlowCompensated(s) => s.nonlinear_thicknesses(lower_bead_count),
        }
    }

    /// Human-readable name of the composed stack, outermost first.
    pub fn name(&self) -> String {
        match self {
            Self::Distributed(_) => "Distributed".to_string(),
            Self::Widening(s) => format!("Widening+{}", s.parent.name()),
            Self::Limited(s) => format!("Limited+{}", s.parent.name()),
            Self::OuterWallInset(s) => format!("OuterWallInset+{}", s.parent.name()),
            Self::FixedOuterWall(s) => format!("FixedOuterWall+{}", s.parent.name()),
            Self::FlowCompensated(s) => format!("FlowCompensated+{}", s.parent.name()),
        }
    }

    /// Default anchor position: derived from how far the transition
    /// thickness sits between the neighboring optima, clamped into
    /// [0.1, 0.9] against degenerate thickness relations.
    fn default_transition_anchor_pos(&self, lower_bead_count: i64) -> f64 {
        let lower_optimum = self.optimal_thickness(lower_bead_count);
        let transition_point = self.transition_thickness(lower_bead_count);
        let upper_optimum = self.optimal_thickness(lower_bead_count + 1);

        let denominator = upper_optimum - lower_optimum;
        if denominator <= 0 {
            log::warn!(
                "Degenerate thickness relation in transition anchor: lower={}, transition={}, upper={}",
                lower_optimum,
                transition_point,
                upper_optimum
            );
            return 0.5;
        }

        let raw = 1.0 - (transition_point - lower_optimum) as f64 / denominator as f64;
        raw.clamp(0.1, 0.9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BeadingStrategy {
        BeadingStrategy::Distributed(DistributedStrategy::new(400, 400, 0.5, 0.5, 0.5, 2))
    }

    #[test]
    fn test_transition_thickness_between_optima() {
        let strategy = base();
        for n in 0..6 {
            let t = strategy.transition_thickness(n);
            assert!(t >= strategy.optimal_thickness(n));
            assert!(t <= strategy.optimal_thickness(n + 1));
        }
    }

    #[test]
    fn test_anchor_pos_in_range() {
        let strategy = base();
        for n in 0..6 {
            let anchor = strategy.transition_anchor_pos(n);
            assert!((0.1..=0.9).contains(&anchor));
        }
    }

    #[test]
    fn test_name_composition() {
        let strategy = BeadingStrategy::Limited(LimitedStrategy::new(4, Box::new(base())));
        assert_eq!(strategy.name(), "Limited+Distributed");
    }
}
