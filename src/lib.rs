//! # Arachne
//!
//! Variable-width wall toolpath generation for fused-filament 3D printing.
//!
//! Given the 2D cross-section of a printable region on a single layer (a set
//! of simple polygons with holes), this library computes a set of concentric,
//! variable-width extrusion paths ("walls") that fill the wall region: outer
//! walls close to a target width for surface quality, inner walls widened or
//! narrowed to exactly fill the available thickness without leaving gaps or
//! overlapping.
//!
//! The pipeline consists of:
//! - A composable stack of beading strategies deciding bead count and widths
//!   for a local thickness ([`beading`])
//! - A skeletal trapezoidation of the region interior, built from the Voronoi
//!   diagram of the polygon edges, that places bead centerlines and stitches
//!   them into toolpaths ([`skeletal`])
//! - A wall orchestrator that prepares input polygons, chooses between the
//!   beading engine and plain concentric offsets, and post-processes the
//!   resulting toolpaths ([`walls`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use arachne::{generate_walls, SectionType, Shape, WallSettings};
//!
//! let settings = WallSettings::default();
//! let (toolpaths, inner_contour) =
//!     generate_walls(&outline, 400, 400, 2, 0, &settings, 0, SectionType::Wall, -1);
//! ```

pub mod beading;
pub mod clipper;
pub mod extrusion;
pub mod geometry;
pub mod settings;
pub mod skeletal;
pub mod walls;

// Re-export commonly used types
pub use beading::{
    make_fixed_outer_strategy, make_strategy, Beading, BeadingStrategy, StrategyParams,
};
pub use extrusion::{ExtrusionJunction, ExtrusionLine, VariableWidthLines};
pub use geometry::{Point, PointF, Polygon, Shape};
pub use settings::{BeadingStrategyScope, SectionType, WallSettings};
pub use skeletal::SkeletalTrapezoidation;
pub use walls::{filter_small_parts, generate_walls, WallToolPaths};

/// Coordinate type used throughout the library.
/// Coordinates are signed 64-bit integers in micrometers.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled (millimeter) values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integer micrometers.
/// 1 mm = 1000 units.
pub const SCALING_FACTOR: f64 = 1000.0;

/// Scale a floating-point millimeter value to integer micrometers.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale integer micrometers to floating-point millimeters.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for wall generation operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Voronoi construction failed: {0}")]
    Voronoi(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        // 1mm should scale to 1000 micrometers
        assert_eq!(scale(1.0), 1000);

        // And back
        assert!((unscale(1000) - 1.0).abs() < 1e-10);

        // Sub-millimeter precision
        assert_eq!(scale(0.4), 400);
        assert_eq!(scale(0.001), 1);
    }
}
