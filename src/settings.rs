//! Wall generation settings.
//!
//! A configuration record of the recognized wall options. Hosts typically
//! populate this from their own profile system; all fields are plain data
//! and serializable.

use crate::geometry::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// What kind of section the walls are generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    Wall,
    Skin,
    Support,
    Infill,
}

/// Which sections the beading engine applies to; everything else uses
/// plain fixed-width concentric offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BeadingStrategyScope {
    /// Never use the beading engine.
    Off,
    /// Beading for skin sections only.
    OnlySkin,
    /// Beading for skin always; for walls only when there are inner walls.
    /// The outer wall keeps a fixed width.
    #[default]
    InnerWallSkin,
    /// Beading everywhere.
    All,
}

/// A seam point in 3D, micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeamPoint {
    pub x: Coord,
    pub y: Coord,
    pub z: Coord,
}

impl SeamPoint {
    pub fn new(x: Coord, y: Coord, z: Coord) -> Self {
        Self { x, y, z }
    }

    pub fn xy(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Configuration for wall toolpath generation.
///
/// Lengths are micrometers unless noted; angles are radians.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSettings {
    // === Widths ===
    /// Features thinner than this are not considered printable at all.
    pub min_feature_size: Coord,

    /// Minimum width a thin-wall bead may be widened or narrowed to.
    pub min_bead_width: Coord,

    /// Smallest line width before an even pair of walls merges into one.
    pub min_even_wall_line_width: Coord,

    /// Smallest line width before a central odd wall is removed.
    pub min_odd_wall_line_width: Coord,

    /// Line width of the outer wall.
    pub wall_line_width_0: Coord,

    /// Line width of the inner walls.
    pub wall_line_width_x: Coord,

    // === Transitions ===
    /// Length over which a bead-count transition is spread.
    pub wall_transition_length: Coord,

    /// Search distance for merging nearby opposite transitions.
    pub wall_transition_filter_distance: Coord,

    /// Maximum line-width deviation a dissolved transition may cause.
    pub wall_transition_filter_deviation: Coord,

    /// The angle a wall can make before a transition is needed (radians).
    pub wall_transition_angle: f64,

    /// How many inner walls participate in a distributed transition.
    pub wall_distribution_count: i64,

    // === Engine selection ===
    /// Which sections the beading engine applies to.
    pub beading_strategy_scope: BeadingStrategyScope,

    /// Whether features thinner than one bead should still be printed.
    pub fill_outline_gaps: bool,

    /// Width below which flow compensation takes over; 0 disables it.
    pub flow_compensation_stable_width: Coord,

    // === Outline repair ===
    /// Maximum deviation allowed when simplifying outlines and toolpaths.
    pub meshfix_maximum_deviation: Coord,

    /// Segments shorter than this may be simplified away.
    pub meshfix_maximum_resolution: Coord,

    /// Whether to smooth small outline wobbles before wall generation.
    pub meshfix_fluid_motion_enabled: bool,

    // === Z seam ===
    /// Whether user-drawn seam points are active.
    pub draw_z_seam_enable: bool,

    /// The user-drawn seam points, micrometers.
    pub draw_z_seam_points: Vec<SeamPoint>,

    /// Whether to interpolate a seam position between the bracketing seam
    /// points and pre-insert it into the outline.
    pub z_seam_point_interpolation: bool,

    /// Above the highest seam point: fall back to the default seam
    /// handling (true) or keep using the highest point (false).
    pub draw_z_seam_grow: bool,

    /// Layer height used when the caller passes a negative layer z.
    pub layer_height: Coord,

    // === Caller-side pre-filters ===
    /// Parts with a circumference below this are dropped by the caller
    /// before wall generation.
    pub minimum_polygon_circumference: Coord,

    /// Parts with an area below this (mm^2) are dropped by the caller.
    pub minimum_polygon_area: f64,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            min_feature_size: 100,
            min_bead_width: 0,
            min_even_wall_line_width: 340,
            min_odd_wall_line_width: 340,
            wall_line_width_0: 400,
            wall_line_width_x: 400,
            wall_transition_length: 400,
            wall_transition_filter_distance: 100_000,
            wall_transition_filter_deviation: 100,
            wall_transition_angle: 10.0_f64.to_radians(),
            wall_distribution_count: 1,
            beading_strategy_scope: BeadingStrategyScope::default(),
            fill_outline_gaps: false,
            flow_compensation_stable_width: 0,
            meshfix_maximum_deviation: 25,
            meshfix_maximum_resolution: 250,
            meshfix_fluid_motion_enabled: false,
            draw_z_seam_enable: false,
            draw_z_seam_points: Vec::new(),
            z_seam_point_interpolation: false,
            draw_z_seam_grow: true,
            layer_height: 200,
            minimum_polygon_circumference: 0,
            minimum_polygon_area: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sane() {
        let s = WallSettings::default();
        assert!(s.wall_line_width_0 > 0);
        assert!(s.wall_transition_angle > 0.0);
        assert_eq!(s.beading_strategy_scope, BeadingStrategyScope::InnerWallSkin);
    }

    #[test]
    fn test_seam_point_projection() {
        let p = SeamPoint::new(1_000, 2_000, 5_000);
        assert_eq!(p.xy(), Point::new(1_000, 2_000));
    }
}
