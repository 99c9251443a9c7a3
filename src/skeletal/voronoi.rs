//! Adapter over the boostvoronoi segment Voronoi builder.
//!
//! The diagram is lowered into plain indexed records immediately after
//! construction so the rest of the skeletal code is decoupled from the
//! external API. Cells that cannot be sourced are dropped here with a
//! debug log rather than aborting the build.

use crate::geometry::{Point, PointF};
use crate::{Error, Result};
use boostvoronoi::Builder;

/// A directed input segment of the outline.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Index sentinel for absent links.
pub const NO_INDEX: usize = usize::MAX;

/// A half-edge of the lowered Voronoi diagram.
#[derive(Debug, Clone, Copy)]
pub struct VdEdge {
    pub cell: usize,
    /// Start vertex; None for infinite edges.
    pub vertex0: Option<usize>,
    pub twin: usize,
    /// Next edge counter-clockwise around the cell.
    pub next: usize,
    pub prev: usize,
    /// Secondary edges connect a segment cell to its endpoint cells.
    pub is_secondary: bool,
    /// Curved edges are parabolic arcs between a point and a segment.
    pub is_curved: bool,
}

/// A cell of the lowered Voronoi diagram.
#[derive(Debug, Clone, Copy)]
pub struct VdCell {
    /// Index into the input segment list.
    pub source_index: usize,
    pub contains_point: bool,
    pub contains_segment: bool,
    pub incident_edge: Option<usize>,
}

/// The lowered diagram: everything construction needs, nothing more.
#[derive(Debug, Default)]
pub struct VoronoiSlice {
    pub vertices: Vec<PointF>,
    pub edges: Vec<VdEdge>,
    pub cells: Vec<VdCell>,
}

impl VoronoiSlice {
    /// Build the Voronoi diagram of the given polygon segments.
    pub fn build(segments: &[Segment]) -> Result<Self> {
        let input: Vec<[i64; 4]> = segments
            .iter()
            .map(|s| [s.from.x, s.from.y, s.to.x, s.to.y])
            .collect();

        let builder = Builder::<i64, f64>::default()
            .with_segments(input.iter())
            .map_err(|e| Error::Voronoi(e.to_string()))?;
        let diagram = builder.build().map_err(|e| Error::Voronoi(e.to_string()))?;

        let vertices: Vec<PointF> = diagram
            .vertices()
            .iter()
            .map(|v| {
                let v = v.get();
                PointF::new(v.x(), v.y())
            })
            .collect();

        let edges: Vec<VdEdge> = diagram
            .edges()
            .iter()
            .map(|e| {
                let e = e.get();
                VdEdge {
                    cell: e.cell().map(|c| c.0).unwrap_or(NO_INDEX),
                    vertex0: e.vertex0().map(|v| v.0),
                    twin: e.twin().map(|t| t.0).unwrap_or(NO_INDEX),
                    next: e.next().map(|n| n.0).unwrap_or(NO_INDEX),
                    prev: e.prev().map(|p| p.0).unwrap_or(NO_INDEX),
                    is_secondary: e.is_secondary(),
                    is_curved: e.is_curved(),
                }
            })
            .collect();

        let cells: Vec<VdCell> = diagram
            .cells()
            .iter()
            .map(|c| {
                let c = c.get();
                VdCell {
                    source_index: c.source_index(),
                    contains_point: c.contains_point(),
                    contains_segment: c.contains_segment(),
                    incident_edge: c.get_incident_edge().map(|e| e.0),
                }
            })
            .collect();

        Ok(Self {
            vertices,
            edges,
            cells,
        })
    }

    /// The end vertex of an edge (the start vertex of its twin).
    pub fn vertex1(&self, edge: usize) -> Option<usize> {
        let twin = self.edges[edge].twin;
        if twin == NO_INDEX {
            return None;
        }
        self.edges[twin].vertex0
    }

    /// Whether both endpoints of the edge are finite.
    pub fn edge_is_finite(&self, edge: usize) -> bool {
        self.edges[edge].vertex0.is_some() && self.vertex1(edge).is_some()
    }

    /// The position of an edge's start vertex, rounded to micrometers.
    pub fn vertex0_point(&self, edge: usize) -> Option<Point> {
        self.edges[edge].vertex0.map(|v| self.vertices[v].to_point())
    }

    /// The position of an edge's end vertex, rounded to micrometers.
    pub fn vertex1_point(&self, edge: usize) -> Option<Point> {
        self.vertex1(edge).map(|v| self.vertices[v].to_point())
    }

    /// The source point of a point cell: the endpoint of the source
    /// segment that appears among the cell's edge vertices. Falls back to
    /// the nearer endpoint when rounding obscured the match.
    pub fn source_point(&self, cell: usize, segments: &[Segment]) -> Option<Point> {
        let cell_data = &self.cells[cell];
        if !cell_data.contains_point || cell_data.source_index >= segments.len() {
            return None;
        }
        let segment = segments[cell_data.source_index];
        let start = self.cells[cell].incident_edge?;

        let mut exact_match: Option<Point> = None;
        let mut nearest: Option<(f64, Point)> = None;
        let mut edge = start;
        let mut guard = 0;
        loop {
            for candidate in [segment.from, segment.to] {
                if let Some(v) = self.vertex0_point(edge) {
                    let dist = v.distance(&candidate);
                    if v == candidate {
                        exact_match = Some(candidate);
                    }
                    if nearest.map(|(d, _)| dist < d).unwrap_or(true) {
                        nearest = Some((dist, candidate));
                    }
                }
            }
            edge = self.edges[edge].next;
            guard += 1;
            if edge == NO_INDEX || edge == start || guard > 1000 {
                break;
            }
        }
        exact_match.or(nearest.map(|(_, p)| p))
    }

    /// The source segment of a segment cell.
    pub fn source_segment(&self, cell: usize, segments: &[Segment]) -> Option<Segment> {
        let cell_data = &self.cells[cell];
        if !cell_data.contains_segment || cell_data.source_index >= segments.len() {
            return None;
        }
        Some(segments[cell_data.source_index])
    }
}
