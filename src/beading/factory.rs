//! Composition of the beading strategy stack.

use super::{
    BeadingStrategy, DistributedStrategy, FixedOuterWallStrategy, FlowCompensatedStrategy,
    LimitedStrategy, OuterWallInsetStrategy, WideningStrategy,
};
use crate::Coord;

/// Inputs for composing a strategy stack.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    /// Preferred width of the outermost bead (micrometers).
    pub bead_width_0: Coord,

    /// Preferred width of the inner beads (micrometers).
    pub bead_width_x: Coord,

    /// Length over which bead-count transitions are spread.
    pub transition_length: Coord,

    /// The angle a wall can make before a transition is needed (radians).
    pub transitioning_angle: f64,

    /// Whether features thinner than one bead should still be printed.
    pub print_thin_walls: bool,

    /// Minimum printable bead width for thin features.
    pub min_bead_width: Coord,

    /// Features thinner than this are not printed at all.
    pub min_feature_size: Coord,

    /// How far between even-count optima the central bead splits in two.
    pub split_middle_threshold: f64,

    /// How far between odd-count optima a new central bead is added.
    pub add_middle_threshold: f64,

    /// Bead-count cap; 0 disables the limit.
    pub max_bead_count: i64,

    /// Offset applied to the outermost centerline; 0 disables.
    pub outer_wall_offset: Coord,

    /// How many inner beads participate in a distributed transition.
    pub distribution_count: i64,

    /// Fraction of a line width below which no variable line is emitted.
    pub minimum_variable_line_ratio: f64,

    /// Width below which flow compensation takes over; 0 disables.
    pub flow_stable_width: Coord,

    /// Lower clamp for compensated flow ratios.
    pub max_flow_compensation_ratio: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            bead_width_0: 400,
            bead_width_x: 400,
            transition_length: 400,
            transitioning_angle: std::f64::consts::PI / 4.0,
            print_thin_walls: false,
            min_bead_width: 0,
            min_feature_size: 0,
            split_middle_threshold: 0.5,
            add_middle_threshold: 0.5,
            max_bead_count: 0,
            outer_wall_offset: 0,
            distribution_count: 2,
            minimum_variable_line_ratio: 0.5,
            flow_stable_width: 0,
            max_flow_compensation_ratio: 0.25,
        }
    }
}

fn make_base(params: &StrategyParams) -> BeadingStrategy {
    let mut ret = BeadingStrategy::Distributed(DistributedStrategy::new(
        params.bead_width_x,
        params.transition_length,
        params.transitioning_angle,
        params.split_middle_threshold,
        params.add_middle_threshold,
        params.distribution_count,
    ));
    if params.flow_stable_width > 0 {
        log::debug!(
            "Applying the flow-compensated meta-strategy with stable width {} um",
            params.flow_stable_width
        );
        ret = BeadingStrategy::FlowCompensated(FlowCompensatedStrategy::new(
            Box::new(ret),
            params.min_bead_width.max(1),
            params.flow_stable_width,
            params.max_flow_compensation_ratio,
        ));
    }
    if params.print_thin_walls {
        log::debug!(
            "Applying the widening meta-strategy with minimum input width {} and minimum output width {}",
            params.min_feature_size,
            params.min_bead_width
        );
        ret = BeadingStrategy::Widening(WideningStrategy::new(
            Box::new(ret),
            params.min_feature_size,
            params.min_bead_width,
        ));
    }
    if params.max_bead_count > 0 {
        log::debug!(
            "Applying the limited meta-strategy with maximum bead count {}",
            params.max_bead_count
        );
        ret = BeadingStrategy::Limited(LimitedStrategy::new(params.max_bead_count, Box::new(ret)));
    }
    ret
}

/// Compose the regular strategy stack:
/// Distributed -> (FlowCompensated) -> (Widening) -> (Limited) ->
/// (OuterWallInset).
pub fn make_strategy(params: &StrategyParams) -> BeadingStrategy {
    let mut ret = make_base(params);
    if params.outer_wall_offset > 0 {
        log::debug!(
            "Applying the outer-wall offset meta-strategy with offset {}",
            params.outer_wall_offset
        );
        ret = BeadingStrategy::OuterWallInset(OuterWallInsetStrategy::new(
            params.outer_wall_offset,
            Box::new(ret),
        ));
    }
    ret
}

/// Compose the stack for sections whose outer wall must keep a constant
/// width: the fixed-outer-wall decorator pins the two outermost beads at
/// `bead_width_0` and delegates the interior to the regular stack.
pub fn make_fixed_outer_strategy(params: &StrategyParams) -> BeadingStrategy {
    let inner = make_base(params);
    BeadingStrategy::FixedOuterWall(FixedOuterWallStrategy::new(
        params.bead_width_0,
        params.minimum_variable_line_ratio,
        Box::new(inner),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_stack() {
        let params = StrategyParams::default();
        let strategy = make_strategy(&params);
        assert_eq!(strategy.name(), "Distributed");
        assert_eq!(strategy.optimal_width(), 400);
    }

    #[test]
    fn test_full_stack_composition() {
        let params = StrategyParams {
            print_thin_walls: true,
            min_bead_width: 200,
            min_feature_size: 100,
            max_bead_count: 4,
            outer_wall_offset: 20,
            ..Default::default()
        };
        let strategy = make_strategy(&params);
        assert_eq!(
            strategy.name(),
            "OuterWallInset+Limited+Widening+Distributed"
        );
    }

    #[test]
    fn test_fixed_outer_stack() {
        let params = StrategyParams {
            max_bead_count: 4,
            ..Default::default()
        };
        let strategy = make_fixed_outer_strategy(&params);
        assert_eq!(strategy.name(), "FixedOuterWall+Limited+Distributed");
    }
}
