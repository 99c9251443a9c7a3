//! Skeletal trapezoidation: from polygons to a half-edge skeleton.
//!
//! The interior of the outline is decomposed by the Voronoi diagram of its
//! segments. Every Voronoi cell that lies inside the polygon contributes a
//! chain of edges to the half-edge graph; ribs connect each chain vertex
//! down to the boundary, cutting the interior into quads. Later passes mark
//! the central (medial-axis) edges, place bead-count transitions, and
//! generate the variable-width toolpaths.

use super::graph::{EdgeId, EdgeKind, NodeId, SkeletalGraph};
use super::voronoi::{Segment, VoronoiSlice, NO_INDEX};
use crate::beading::BeadingStrategy;
use crate::extrusion::VariableWidthLines;
use crate::geometry::{is_inside_corner, Point, PointF, RotationFrame, Shape};
use crate::{Coord, Result};
use std::collections::HashMap;

/// Granularity for merging graph vertices that nearly coincide.
const COLLAPSE_GRANULARITY: Coord = 20;

/// Distance under which central stubs at region ends are dissolved.
pub(super) const CENTRAL_FILTER_DIST: Coord = 20;

/// Snapping distance for transition ends near existing nodes.
pub(super) const SNAP_DIST: Coord = 20;

/// The trapezoidation engine for one polygon region.
pub struct SkeletalTrapezoidation<'a> {
    pub(super) graph: SkeletalGraph,
    pub(super) strategy: &'a BeadingStrategy,
    pub(super) transitioning_angle: f64,
    pub(super) discretization_step_size: Coord,
    pub(super) transition_filter_dist: Coord,
    pub(super) allowed_filter_deviation: Coord,
    pub(super) beading_propagation_transition_dist: Coord,
    pub(super) toolpaths: Vec<VariableWidthLines>,
}

struct CellRange {
    start_source_point: Point,
    end_source_point: Point,
    starting_vd_edge: usize,
    ending_vd_edge: usize,
}

impl<'a> SkeletalTrapezoidation<'a> {
    /// Build the skeleton of `outline`. The outline must be preprocessed:
    /// no self-intersections, consistent winding (interior to the left of
    /// travel).
    pub fn new(
        outline: &Shape,
        strategy: &'a BeadingStrategy,
        transitioning_angle: f64,
        discretization_step_size: Coord,
        transition_filter_dist: Coord,
        allowed_filter_deviation: Coord,
        beading_propagation_transition_dist: Coord,
    ) -> Result<Self> {
        let mut st = Self {
            graph: SkeletalGraph::new(),
            strategy,
            transitioning_angle,
            discretization_step_size,
            transition_filter_dist,
            allowed_filter_deviation,
            beading_propagation_transition_dist,
            toolpaths: Vec::new(),
        };
        st.construct_from_polygons(outline)?;
        Ok(st)
    }

    /// Run the full pipeline and return the generated toolpaths, bucketed
    /// by inset index.
    pub fn generate_toolpaths(
        &mut self,
        filter_outermost_central_edges: bool,
    ) -> Vec<VariableWidthLines> {
        self.update_is_central();
        self.filter_central(CENTRAL_FILTER_DIST);
        if filter_outermost_central_edges {
            self.filter_outer_central();
        }
        self.update_bead_count();
        self.filter_noncentral_regions();
        self.generate_transitioning_ribs();
        self.generate_extra_ribs();
        self.generate_segments();
        std::mem::take(&mut self.toolpaths)
    }

    /// Read-only access to the skeleton, mainly for inspection and tests.
    pub fn graph(&self) -> &SkeletalGraph {
        &self.graph
    }

    // =====================================================================
    //    INITIALIZATION
    // =====================================================================

    fn construct_from_polygons(&mut self, outline: &Shape) -> Result<()> {
        let mut segments: Vec<Segment> = Vec::new();
        // Neighbor vertices around each polygon vertex, for the
        // inside-corner test at point cells.
        let mut corners: HashMap<Point, (Point, Point)> = HashMap::new();
        for poly in outline.iter() {
            let n = poly.len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                let prev = poly[(i + n - 1) % n];
                let here = poly[i];
                let next = poly[(i + 1) % n];
                segments.push(Segment {
                    from: here,
                    to: next,
                });
                corners.entry(here).or_insert((prev, next));
            }
        }
        if segments.is_empty() {
            return Ok(());
        }

        let slice = VoronoiSlice::build(&segments)?;

        let mut vd_edge_to_he: HashMap<usize, EdgeId> = HashMap::new();
        let mut vd_node_to_he: HashMap<usize, NodeId> = HashMap::new();

        for cell_idx in 0..slice.cells.len() {
            let cell = slice.cells[cell_idx];
            if cell.incident_edge.is_none() {
                continue;
            }

            let range = if cell.contains_point {
                self.compute_point_cell_range(&slice, cell_idx, &segments, &corners)
            } else {
                self.compute_segment_cell_range(&slice, cell_idx, &segments)
            };
            let Some(range) = range else {
                continue;
            };

            // Copy the cell's interior arc of Voronoi edges into the graph.
            let mut prev_edge: Option<EdgeId> = None;
            let Some(start_v1) = slice.vertex1_point(range.starting_vd_edge) else {
                log::debug!("Voronoi cell arc starts in an infinite edge; skipping cell.");
                continue;
            };
            self.transfer_edge(
                range.start_source_point,
                start_v1,
                range.starting_vd_edge,
                &mut prev_edge,
                range.start_source_point,
                range.end_source_point,
                &slice,
                &segments,
                &mut vd_edge_to_he,
                &mut vd_node_to_he,
            );

            if let Some(v0) = slice.edges[range.starting_vd_edge].vertex0 {
                if let Some(&starting_node) = vd_node_to_he.get(&v0) {
                    self.graph.node_mut(starting_node).distance_to_boundary = 0;
                }
            }
            let Some(mut prev) = prev_edge else {
                continue;
            };
            self.graph
                .make_rib(&mut prev, range.start_source_point, range.end_source_point);
            prev_edge = Some(prev);

            let mut vd_edge = slice.edges[range.starting_vd_edge].next;
            let mut guard = 0;
            let mut aborted = false;
            while vd_edge != range.ending_vd_edge && vd_edge != NO_INDEX {
                guard += 1;
                if guard > 10_000 {
                    log::warn!("Runaway Voronoi cell arc; abandoning cell.");
                    aborted = true;
                    break;
                }
                let (Some(v1), Some(v2)) = (
                    slice.vertex0_point(vd_edge),
                    slice.vertex1_point(vd_edge),
                ) else {
                    log::debug!("Infinite edge inside a kept Voronoi cell; abandoning cell.");
                    aborted = true;
                    break;
                };
                self.transfer_edge(
                    v1,
                    v2,
                    vd_edge,
                    &mut prev_edge,
                    range.start_source_point,
                    range.end_source_point,
                    &slice,
                    &segments,
                    &mut vd_edge_to_he,
                    &mut vd_node_to_he,
                );
                if let Some(mut prev) = prev_edge {
                    self.graph
                        .make_rib(&mut prev, range.start_source_point, range.end_source_point);
                    prev_edge = Some(prev);
                }
                vd_edge = slice.edges[vd_edge].next;
            }
            if aborted || vd_edge == NO_INDEX {
                continue;
            }

            let Some(end_v0) = slice.vertex0_point(range.ending_vd_edge) else {
                continue;
            };
            self.transfer_edge(
                end_v0,
                range.end_source_point,
                range.ending_vd_edge,
                &mut prev_edge,
                range.start_source_point,
                range.end_source_point,
                &slice,
                &segments,
                &mut vd_edge_to_he,
                &mut vd_node_to_he,
            );
            if let Some(prev) = prev_edge {
                let to = self.graph.edge(prev).to;
                self.graph.node_mut(to).distance_to_boundary = 0;
            }
        }

        self.graph.separate_pointy_quad_end_nodes();
        self.graph.collapse_small_edges(COLLAPSE_GRANULARITY);

        // Set the representative edge of every quad-start node so all
        // reachable edges can be iterated from node.incident_edge.
        for e in self.graph.edge_ids() {
            if self.graph.edge(e).prev.is_none() {
                let from = self.graph.edge(e).from;
                self.graph.node_mut(from).incident_edge = Some(e);
            }
        }

        self.graph.repair_missing_twins();

        // Clamp any radius the construction left unset or negative.
        for n in self.graph.node_ids() {
            if self.graph.node(n).distance_to_boundary < 0 {
                log::warn!("Node radius left unset by construction; clamping to 0.");
                self.graph.node_mut(n).distance_to_boundary = 0;
            }
        }
        Ok(())
    }

    /// Range of Voronoi edges belonging to the interior at a polygon
    /// vertex. Returns None for cells outside the polygon corner.
    fn compute_point_cell_range(
        &self,
        slice: &VoronoiSlice,
        cell_idx: usize,
        segments: &[Segment],
        corners: &HashMap<Point, (Point, Point)>,
    ) -> Option<CellRange> {
        let incident = slice.cells[cell_idx].incident_edge?;
        if !slice.edge_is_finite(incident) {
            // Infinite edges only occur outside of the polygon.
            return None;
        }
        let source_point = slice.source_point(cell_idx, segments)?;
        let &(corner_prev, corner_next) = corners.get(&source_point)?;

        let mut some_point = slice.vertex0_point(incident)?;
        if some_point == source_point {
            some_point = slice.vertex1_point(incident)?;
        }
        // Cells outside the interior corner peel off to infinity; don't
        // copy any part of them.
        if !is_inside_corner(corner_prev, source_point, corner_next, some_point) {
            return None;
        }

        let mut starting_vd_edge = None;
        let mut ending_vd_edge = None;
        let mut edge = incident;
        let mut guard = 0;
        loop {
            if slice.edge_is_finite(edge) {
                if slice.vertex1_point(edge) == Some(source_point) {
                    starting_vd_edge = Some(slice.edges[edge].next).filter(|&e| e != NO_INDEX);
                    ending_vd_edge = Some(edge);
                }
            }
            edge = slice.edges[edge].next;
            guard += 1;
            if edge == NO_INDEX || edge == incident || guard > 1000 {
                break;
            }
        }
        let (starting_vd_edge, ending_vd_edge) = (starting_vd_edge?, ending_vd_edge?);
        if starting_vd_edge == ending_vd_edge {
            return None;
        }
        Some(CellRange {
            start_source_point: source_point,
            end_source_point: source_point,
            starting_vd_edge,
            ending_vd_edge,
        })
    }

    /// Range of Voronoi edges on the interior side of a polygon segment.
    fn compute_segment_cell_range(
        &self,
        slice: &VoronoiSlice,
        cell_idx: usize,
        segments: &[Segment],
    ) -> Option<CellRange> {
        let source_segment = slice.source_segment(cell_idx, segments)?;
        let from = source_segment.from;
        let to = source_segment.to;

        let incident = slice.cells[cell_idx].incident_edge?;
        let mut seen_possible_start = false;
        let mut after_start = false;
        let mut ending_edge_is_set_before_start = false;
        let mut starting_vd_edge = None;
        let mut ending_vd_edge = None;

        let mut edge = incident;
        let mut guard = 0;
        loop {
            if slice.edge_is_finite(edge) {
                let v0 = slice.vertex0_point(edge);
                let v1 = slice.vertex1_point(edge);
                if v0 == Some(to) && !after_start {
                    // Use the last edge which starts in the segment's end.
                    starting_vd_edge = Some(edge);
                    seen_possible_start = true;
                } else if seen_possible_start {
                    after_start = true;
                }
                if v1 == Some(from) && (ending_vd_edge.is_none() || ending_edge_is_set_before_start)
                {
                    ending_edge_is_set_before_start = !after_start;
                    ending_vd_edge = Some(edge);
                }
            }
            edge = slice.edges[edge].next;
            guard += 1;
            if edge == NO_INDEX || edge == incident || guard > 1000 {
                break;
            }
        }

        let (starting_vd_edge, ending_vd_edge) = match (starting_vd_edge, ending_vd_edge) {
            (Some(s), Some(e)) if s != e => (s, e),
            _ => {
                log::debug!("Voronoi cell does not start and end at its source segment; skipping.");
                return None;
            }
        };
        Some(CellRange {
            start_source_point: to,
            end_source_point: from,
            starting_vd_edge,
            ending_vd_edge,
        })
    }

    /// Copy one Voronoi edge (possibly discretized into several graph
    /// edges) into the half-edge graph, chaining it after `prev_edge`.
    #[allow(clippy::too_many_arguments)]
    fn transfer_edge(
        &mut self,
        from: Point,
        to: Point,
        vd_edge: usize,
        prev_edge: &mut Option<EdgeId>,
        start_source: Point,
        end_source: Point,
        slice: &VoronoiSlice,
        segments: &[Segment],
        vd_edge_to_he: &mut HashMap<usize, EdgeId>,
        vd_node_to_he: &mut HashMap<usize, NodeId>,
    ) {
        let vd_twin = slice.edges[vd_edge].twin;
        if let Some(&source_twin) = vd_edge_to_he.get(&vd_twin) {
            // The twin chain was already copied; mirror it piecewise.
            let end_node = slice
                .vertex1(vd_edge)
                .and_then(|v| vd_node_to_he.get(&v).copied());
            let mut twin = source_twin;
            let mut guard = 0;
            loop {
                guard += 1;
                if guard > 1000 {
                    log::warn!("Runaway twin chain while transferring an edge.");
                    return;
                }
                let twin_from = self.graph.edge(twin).from;
                let twin_to = self.graph.edge(twin).to;
                let edge = self.graph.add_edge(twin_to, twin_from, EdgeKind::Normal);
                self.graph.edge_mut(edge).twin = Some(twin);
                self.graph.edge_mut(twin).twin = Some(edge);
                self.graph.node_mut(twin_to).incident_edge = Some(edge);

                if let Some(prev) = *prev_edge {
                    self.graph.edge_mut(edge).prev = Some(prev);
                    self.graph.edge_mut(prev).next = Some(edge);
                }
                *prev_edge = Some(edge);

                if Some(twin_from) == end_node {
                    return;
                }

                let next_twin = self
                    .graph
                    .edge(twin)
                    .prev
                    .and_then(|p| self.graph.edge(p).twin)
                    .and_then(|t| self.graph.edge(t).prev);
                let Some(next_twin) = next_twin else {
                    log::warn!("Discretized twin chain ends unexpectedly.");
                    return;
                };
                let mut prev = prev_edge.unwrap();
                self.graph.make_rib(&mut prev, start_source, end_source);
                *prev_edge = Some(prev);
                twin = next_twin;
            }
        }

        let discretized = self.discretize(vd_edge, slice, segments, from, to);
        if discretized.len() < 2 {
            log::warn!("Discretized Voronoi edge is degenerate.");
            return;
        }

        let mut v0 = match *prev_edge {
            Some(prev) => self.graph.edge(prev).to,
            None => {
                let vd_v0 = slice.edges[vd_edge].vertex0;
                self.make_node(vd_v0, from, vd_node_to_he)
            }
        };
        for p1_idx in 1..discretized.len() {
            let p1 = discretized[p1_idx];
            let v1 = if p1_idx < discretized.len() - 1 {
                self.graph.add_node(p1)
            } else {
                self.make_node(slice.vertex1(vd_edge), to, vd_node_to_he)
            };

            let edge = self.graph.add_edge(v0, v1, EdgeKind::Normal);
            self.graph.node_mut(v0).incident_edge = Some(edge);
            if let Some(prev) = *prev_edge {
                self.graph.edge_mut(edge).prev = Some(prev);
                self.graph.edge_mut(prev).next = Some(edge);
            }
            *prev_edge = Some(edge);
            v0 = v1;

            if p1_idx < discretized.len() - 1 {
                // The rib for the last segment gets introduced by the
                // caller.
                let mut prev = prev_edge.unwrap();
                self.graph.make_rib(&mut prev, start_source, end_source);
                *prev_edge = Some(prev);
            }
        }
        vd_edge_to_he.insert(vd_edge, prev_edge.unwrap());
    }

    fn make_node(
        &mut self,
        vd_vertex: Option<usize>,
        p: Point,
        vd_node_to_he: &mut HashMap<usize, NodeId>,
    ) -> NodeId {
        match vd_vertex {
            Some(v) => {
                if let Some(&node) = vd_node_to_he.get(&v) {
                    node
                } else {
                    let node = self.graph.add_node(p);
                    vd_node_to_he.insert(v, node);
                    node
                }
            }
            None => self.graph.add_node(p),
        }
    }

    /// Discretize one Voronoi edge into graph vertices.
    ///
    /// Parabolic edges (point vs. segment) sample the parabola; straight
    /// edges between two point sites sample linearly. Both insert extra
    /// vertices where the transitioning-angle cones of the sources meet,
    /// because the local thickness changes regime there.
    fn discretize(
        &self,
        vd_edge: usize,
        slice: &VoronoiSlice,
        segments: &[Segment],
        start: Point,
        end: Point,
    ) -> Vec<Point> {
        let left_cell = slice.edges[vd_edge].cell;
        let twin = slice.edges[vd_edge].twin;
        if left_cell == NO_INDEX || twin == NO_INDEX {
            return vec![start, end];
        }
        let right_cell = slice.edges[twin].cell;
        if right_cell == NO_INDEX {
            return vec![start, end];
        }

        let point_left = slice.cells[left_cell].contains_point;
        let point_right = slice.cells[right_cell].contains_point;

        if (!point_left && !point_right) || slice.edges[vd_edge].is_secondary {
            // Source vertex is directly connected to a source segment.
            return vec![start, end];
        }

        if point_left != point_right {
            // Parabolic edge between a point and a segment.
            let (point_cell, segment_cell) = if point_left {
                (left_cell, right_cell)
            } else {
                (right_cell, left_cell)
            };
            let Some(p) = slice.source_point(point_cell, segments) else {
                return vec![start, end];
            };
            let Some(s) = slice.source_segment(segment_cell, segments) else {
                return vec![start, end];
            };
            return discretize_parabola(
                p,
                s,
                start,
                end,
                self.discretization_step_size,
                self.transitioning_angle,
            );
        }

        // Straight edge between two point sites. Still discretized: the
        // part narrows between the two points, so it may need different
        // beadings along the way.
        let Some(left_point) = slice.source_point(left_cell, segments) else {
            return vec![start, end];
        };
        let Some(right_point) = slice.source_point(right_cell, segments) else {
            return vec![start, end];
        };
        let d = (right_point - left_point).vsize();
        if d == 0 {
            return vec![start, end];
        }
        let middle = Point::new(
            (left_point.x + right_point.x) / 2,
            (left_point.y + right_point.y) / 2,
        );
        let x_axis_dir = (right_point - left_point).turn_90_ccw();
        let x_axis_length = x_axis_dir.vsize();
        if x_axis_length == 0 {
            return vec![start, end];
        }

        let projected_x = |from: Point| -> Coord {
            let vec = from - middle;
            ((vec.x as i128 * x_axis_dir.x as i128 + vec.y as i128 * x_axis_dir.y as i128)
                / x_axis_length as i128) as Coord
        };

        let start_x = projected_x(start);
        let end_x = projected_x(end);

        // Part of the edge is bound to the markings at its sources.
        let bound = 0.5 / ((std::f64::consts::PI - self.transitioning_angle) * 0.5).tan();
        let mut marking_start_x = (-(d as f64) * bound) as Coord;
        let mut marking_end_x = (d as f64 * bound) as Coord;
        let mut marking_start =
            middle + Point::new(
                ((x_axis_dir.x as i128 * marking_start_x as i128) / x_axis_length as i128) as Coord,
                ((x_axis_dir.y as i128 * marking_start_x as i128) / x_axis_length as i128) as Coord,
            );
        let mut marking_end =
            middle + Point::new(
                ((x_axis_dir.x as i128 * marking_end_x as i128) / x_axis_length as i128) as Coord,
                ((x_axis_dir.y as i128 * marking_end_x as i128) / x_axis_length as i128) as Coord,
            );
        let mut direction: Coord = 1;
        if start_x > end_x {
            // The Voronoi edge is the other way around.
            direction = -1;
            std::mem::swap(&mut marking_start, &mut marking_end);
            std::mem::swap(&mut marking_start_x, &mut marking_end_x);
        }

        let a = start;
        let b = end;
        let ab = b - a;
        let ab_size = ab.vsize();
        let mut ret = vec![a];

        let mut add_marking_start = marking_start_x * direction > start_x * direction;
        let mut add_marking_end = marking_end_x * direction > start_x * direction;

        // An integer step count distributes the vertices evenly.
        let mut step_count =
            (ab_size + self.discretization_step_size / 2) / self.discretization_step_size;
        if step_count % 2 == 1 {
            step_count += 1; // Enforce a discretization point in the middle.
        }
        for step in 1..step_count {
            let here = a + Point::new(
                ((ab.x as i128 * step as i128) / step_count as i128) as Coord,
                ((ab.y as i128 * step as i128) / step_count as i128) as Coord,
            );
            let x_here = projected_x(here);
            if add_marking_start && marking_start_x * direction < x_here * direction {
                ret.push(marking_start);
                add_marking_start = false;
            }
            if add_marking_end && marking_end_x * direction < x_here * direction {
                ret.push(marking_end);
                add_marking_end = false;
            }
            ret.push(here);
        }
        if add_marking_end && marking_end_x * direction < end_x * direction {
            ret.push(marking_end);
        }
        ret.push(b);
        ret
    }

    // =====================================================================
    //    CENTRALITY AND BEAD COUNTS
    // =====================================================================

    /// Mark edges that lie along the medial axis proper: the local
    /// thickness changes slowly along them.
    pub(super) fn update_is_central(&mut self) {
        //          _.-'^`    A and B are the endpoints of an edge.
        //    _.-'^`  \ dR    The edge is central iff the thickness change
        //  A`--------`B      dR stays below |AB| * sin(transitioning_angle/2).
        let outer_edge_filter_length = self.strategy.transition_thickness(0) / 2;
        let cap = (self.strategy.transitioning_angle() / 2.0).sin();

        for e in self.graph.edge_ids() {
            let twin = self.graph.edge(e).twin;
            let Some(twin) = twin else {
                log::warn!("Encountered an edge without twin while marking centrality.");
                continue;
            };
            if let Some(twin_central) = self.graph.edge(twin).is_central {
                self.graph.edge_mut(e).is_central = Some(twin_central);
                continue;
            }
            let edge = self.graph.edge(e);
            let central = if edge.kind == EdgeKind::Extra {
                false
            } else {
                let r_from = self.graph.radius(edge.from);
                let r_to = self.graph.radius(edge.to);
                if r_from.max(r_to) < outer_edge_filter_length {
                    false
                } else {
                    let d_r = (r_to - r_from).abs();
                    let d_d = self.graph.edge_length(e);
                    (d_r as f64) < d_d as f64 * cap
                }
            };
            self.graph.edge_mut(e).is_central = Some(central);
        }
    }

    /// Whether `e` is central and no central edge continues past its end.
    pub(super) fn is_end_of_central(&self, e: EdgeId) -> bool {
        if !self.graph.edge(e).is_central() {
            return false;
        }
        if self.graph.edge(e).next.is_none() {
            return true;
        }
        for outgoing in self.graph.outgoing_edges(e) {
            if self.graph.edge(outgoing).is_central() {
                return false;
            }
        }
        true
    }

    /// Clear centrality on short stubs hanging off the ends of central
    /// regions, unless they contain a local maximum.
    fn filter_central(&mut self, max_length: Coord) {
        for e in self.graph.edge_ids() {
            if self.is_end_of_central(e) && !self.graph.is_local_maximum(self.graph.edge(e).to, false)
            {
                let twin = self.graph.twin(e);
                self.filter_central_rec(twin, 0, max_length);
            }
        }
    }

    fn filter_central_rec(&mut self, starting_edge: EdgeId, traveled: Coord, max_length: Coord) -> bool {
        let length = self.graph.edge_length(starting_edge);
        if traveled + length > max_length {
            return false;
        }

        let mut should_dissolve = true;
        for next_edge in self.graph.outgoing_edges(starting_edge) {
            if self.graph.edge(next_edge).is_central() {
                should_dissolve &= self.filter_central_rec(next_edge, traveled + length, max_length);
            }
        }

        // Don't filter central regions with a local maximum.
        should_dissolve &= !self
            .graph
            .is_local_maximum(self.graph.edge(starting_edge).to, false);
        if should_dissolve {
            let twin = self.graph.twin(starting_edge);
            self.graph.edge_mut(starting_edge).is_central = Some(false);
            self.graph.edge_mut(twin).is_central = Some(false);
        }
        should_dissolve
    }

    /// Clear centrality on quad-start edges, keeping only interior spine.
    fn filter_outer_central(&mut self) {
        for e in self.graph.edge_ids() {
            if self.graph.edge(e).prev.is_none() {
                let twin = self.graph.twin(e);
                self.graph.edge_mut(e).is_central = Some(false);
                self.graph.edge_mut(twin).is_central = Some(false);
            }
        }
    }

    /// Decide the bead count at the end of every central edge, and at
    /// every local maximum of the radius.
    fn update_bead_count(&mut self) {
        for e in self.graph.edge_ids() {
            if self.graph.edge(e).is_central() {
                let to = self.graph.edge(e).to;
                let r = self.graph.radius(to);
                let count = self.strategy.optimal_bead_count(r * 2);
                self.graph.node_mut(to).bead_count = count;
            }
        }

        for n in self.graph.node_ids() {
            if self.graph.is_local_maximum(n, false) {
                if self.graph.node(n).distance_to_boundary < 0 {
                    log::warn!("Distance to boundary not yet computed for local maximum!");
                    let mut dist = Coord::MAX;
                    for e in self.graph.node_outgoing(n) {
                        let to = self.graph.edge(e).to;
                        dist = dist
                            .min(self.graph.radius(to) + self.graph.edge_length(e));
                    }
                    if dist == Coord::MAX {
                        dist = 0;
                    }
                    self.graph.node_mut(n).distance_to_boundary = dist.max(0);
                }
                let r = self.graph.node(n).distance_to_boundary;
                let count = self.strategy.optimal_bead_count(r * 2);
                self.graph.node_mut(n).bead_count = count;
            }
        }
    }

    /// Close small non-central gaps between central regions whose bead
    /// counts agree (or differ by one within the transition distance), so
    /// thickness oscillations don't produce spurious transitions.
    fn filter_noncentral_regions(&mut self) {
        for e in self.graph.edge_ids() {
            if !self.is_end_of_central(e) {
                continue;
            }
            let to = self.graph.edge(e).to;
            if self.graph.node(to).bead_count < 0 && self.graph.node(to).distance_to_boundary != 0 {
                log::warn!("Encountered an uninitialized bead count at the end of a central region.");
            }
            let max_dist = 400;
            let bead_count = self.graph.node(to).bead_count;
            self.filter_noncentral_rec(e, bead_count, 0, max_dist);
        }
    }

    fn filter_noncentral_rec(
        &mut self,
        to_edge: EdgeId,
        bead_count: i64,
        traveled: Coord,
        max_dist: Coord,
    ) -> bool {
        let r = self.graph.radius(self.graph.edge(to_edge).to);

        // Find the (single) upward continuation.
        let mut next_edge = None;
        for candidate in self.graph.outgoing_edges(to_edge) {
            let candidate_edge = self.graph.edge(candidate);
            let upward = self.graph.radius(candidate_edge.to) >= r;
            let tiny = (self.graph.node(candidate_edge.to).p
                - self.graph.node(candidate_edge.from).p)
                .shorter_than(10);
            if upward || tiny {
                next_edge = Some(candidate);
                break;
            }
        }
        let Some(next_edge) = next_edge else {
            return false;
        };

        let length = self.graph.edge_length(next_edge);
        let next_to = self.graph.edge(next_edge).to;
        let next_count = self.graph.node(next_to).bead_count;

        let dissolve = if next_count == bead_count {
            true
        } else if next_count < 0 {
            self.filter_noncentral_rec(next_edge, bead_count, traveled + length, max_dist)
        } else {
            // Dissolve if two regions with different bead counts sit closer
            // together than the transition distance.
            traveled + length < max_dist && (next_count - bead_count).abs() == 1
        };

        if dissolve {
            let twin = self.graph.twin(next_edge);
            self.graph.edge_mut(next_edge).is_central = Some(true);
            self.graph.edge_mut(twin).is_central = Some(true);
            let r_next = self.graph.radius(next_to);
            self.graph.node_mut(next_to).bead_count = self.strategy.optimal_bead_count(r_next * 2);
            self.graph.node_mut(next_to).transition_ratio = 0.0;
        }
        dissolve
    }
}

/// Discretize the parabolic Voronoi edge between point site `p` and
/// segment site `s`, from `start` to `end`, inserting the apex and the
/// transitioning-angle bound markers where they fall inside the edge.
fn discretize_parabola(
    p: Point,
    s: Segment,
    start: Point,
    end: Point,
    approximate_step_size: Coord,
    transitioning_angle: f64,
) -> Vec<Point> {
    let a = s.from;
    let b = s.to;
    let ab = b - a;
    let ab_size = ab.vsize();
    if ab_size == 0 {
        return vec![start, end];
    }
    let dot_along = |v: Point| -> Coord {
        ((v.x as i128 * ab.x as i128 + v.y as i128 * ab.y as i128) / ab_size as i128) as Coord
    };
    let sx = dot_along(start - a);
    let ex = dot_along(end - a);
    let px = dot_along(p - a);

    let pxx = p.project_onto_line(a, b);
    let ppxx = pxx - p;
    let d = ppxx.vsize();
    if d == 0 {
        return vec![start, end];
    }
    let frame = RotationFrame::new(PointF::new(ppxx.x as f64, ppxx.y as f64).perp());
    let to_world = |x: f64, y: f64| -> Point {
        let w = frame.unapply(PointF::new(x, y));
        Point::new(
            (w.x + pxx.x as f64).round() as Coord,
            (w.y + pxx.y as f64).round() as Coord,
        )
    };

    let marking_bound = (transitioning_angle * 0.5).atan();
    let mut msx = (-marking_bound * d as f64) as Coord;
    let mut mex = (marking_bound * d as f64) as Coord;
    let marking_start_end_h =
        (msx as f64 * msx as f64) / (2.0 * d as f64) + d as f64 / 2.0;
    let mut marking_start = to_world(msx as f64, marking_start_end_h);
    let mut marking_end = to_world(mex as f64, marking_start_end_h);
    let dir: Coord = if sx > ex { -1 } else { 1 };
    if dir < 0 {
        std::mem::swap(&mut marking_start, &mut marking_end);
        std::mem::swap(&mut msx, &mut mex);
    }

    let mut add_marking_start = msx * dir > (sx - px) * dir && msx * dir < (ex - px) * dir;
    let mut add_marking_end = mex * dir > (sx - px) * dir && mex * dir < (ex - px) * dir;
    let apex = to_world(0.0, d as f64 / 2.0);
    let mut add_apex = (sx - px) * dir < 0 && (ex - px) * dir > 0;

    let mut ret = vec![start];
    let step_count = ((ex - sx).abs() as f64 / approximate_step_size as f64 + 0.5) as Coord;
    for step in 1..step_count {
        let x = (sx + (ex - sx) * step / step_count - px) as f64;
        let y = x * x / (2.0 * d as f64) + d as f64 / 2.0;

        if add_marking_start && (msx * dir) < (x as Coord * dir) {
            ret.push(marking_start);
            add_marking_start = false;
        }
        if add_apex && (x as Coord * dir) > 0 {
            ret.push(apex);
            add_apex = false;
        }
        if add_marking_end && (mex * dir) < (x as Coord * dir) {
            ret.push(marking_end);
            add_marking_end = false;
        }
        ret.push(to_world(x, y));
    }
    if add_apex {
        ret.push(apex);
    }
    if add_marking_end {
        ret.push(marking_end);
    }
    ret.push(end);
    ret.dedup();
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::{make_strategy, StrategyParams};
    use crate::geometry::Polygon;

    #[test]
    fn test_square_skeleton_invariants() {
        let shape = Shape::from_polygons(vec![Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10_000),
            Point::new(0, 10_000),
        ])]);
        let params = StrategyParams {
            max_bead_count: 4,
            ..Default::default()
        };
        let strategy = make_strategy(&params);
        let st = SkeletalTrapezoidation::new(
            &shape,
            &strategy,
            strategy.transitioning_angle(),
            800,
            100_000,
            100,
            400,
        )
        .expect("skeleton construction");

        let graph = st.graph();
        assert!(graph.edge_count() > 0);
        for e in graph.edge_ids() {
            let twin = graph.edge(e).twin.expect("twin must exist after repair");
            assert_eq!(graph.edge(twin).twin, Some(e));
            assert_eq!(graph.edge(twin).from, graph.edge(e).to);
            if let Some(next) = graph.edge(e).next {
                assert_eq!(graph.edge(next).prev, Some(e));
            }
        }
        for n in graph.node_ids() {
            assert!(graph.node(n).distance_to_boundary >= 0);
        }
        // The center of the square is the deepest point of the skeleton.
        let max_r = graph
            .node_ids()
            .iter()
            .map(|&n| graph.node(n).distance_to_boundary)
            .max()
            .unwrap();
        assert!((max_r - 5_000).abs() <= 20, "max radius was {}", max_r);
    }

    #[test]
    fn test_discretize_parabola_endpoints() {
        let p = Point::new(500, 1_000);
        let s = Segment {
            from: Point::new(-2_000, 0),
            to: Point::new(3_000, 0),
        };
        let start = Point::new(-1_000, 1_625);
        let end = Point::new(2_000, 1_625);
        let pts = discretize_parabola(p, s, start, end, 200, 0.9);
        assert_eq!(*pts.first().unwrap(), start);
        assert_eq!(*pts.last().unwrap(), end);
        assert!(pts.len() > 4);
        // All interior samples sit on the parabola: equidistant from p and s.
        for pt in &pts[1..pts.len() - 1] {
            let to_p = pt.distance(&p);
            let to_s = (pt.y - 0) as f64;
            assert!(
                (to_p - to_s).abs() < 30.0,
                "sample {:?} not equidistant: {} vs {}",
                pt,
                to_p,
                to_s
            );
        }
    }
}
