//! Variable-width extrusion path types.
//!
//! The output of wall generation: [`ExtrusionLine`]s of [`ExtrusionJunction`]s
//! bundled per inset into [`VariableWidthLines`], plus the stitching pass
//! that assembles the raw trapezoidation segments into printable paths.

mod junction;
mod line;
pub mod stitch;

pub use junction::{ExtrusionJunction, LineJunctions};
pub use line::{ExtrusionLine, VariableWidthLines};
pub use stitch::stitch;
