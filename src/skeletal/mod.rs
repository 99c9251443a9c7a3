//! Skeletal trapezoidation: the variable-width toolpath engine.
//!
//! The interior of a polygon region is decomposed along its medial axis
//! into quads, bead-count transitions are marked where the local thickness
//! crosses the strategy's thresholds, and bead centerlines are placed and
//! stitched into extrusion paths.
//!
//! - [`graph`]: the arena-allocated half-edge graph
//! - [`voronoi`]: the adapter over the segment Voronoi builder
//! - [`SkeletalTrapezoidation`]: the engine itself

pub mod graph;
mod segments;
mod transitions;
mod trapezoidation;
pub mod voronoi;

pub use graph::{
    BeadingHandle, BeadingPropagation, EdgeId, EdgeKind, NodeId, SkeletalEdge, SkeletalGraph,
    SkeletalNode, TransitionEnd, TransitionMiddle,
};
pub use trapezoidation::SkeletalTrapezoidation;
