//! Toolpath segment generation from the transitioned skeleton.
//!
//! Every node gets a beading (computed, interpolated, or propagated from
//! its neighbors); every upward edge gets the junctions where bead
//! centerlines cross it; the quads are then walked to connect matching
//! junctions into extrusion segments.

use super::graph::{BeadingHandle, BeadingPropagation, EdgeId, NodeId};
use super::trapezoidation::SkeletalTrapezoidation;
use crate::beading::{interpolate, interpolate_switching, Beading};
use crate::extrusion::{ExtrusionJunction, ExtrusionLine, LineJunctions};
use crate::geometry::{lerp, Point};
use crate::Coord;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

/// A limit to how long the search for an adjacent beading keeps going.
const BEAD_SEARCH_MAX: usize = 1000;

/// How far to look for a nearby beading when a node has none of its own.
const NEARBY_BEAD_DIST: Coord = 100;

impl<'a> SkeletalTrapezoidation<'a> {
    pub(super) fn generate_segments(&mut self) {
        // Upward halves of the quads, by decreasing peak radius. The sort
        // is stable and the tie-break below keeps flat edges after the
        // edges they hang off, so propagation sees sources before sinks.
        let mut upward_quad_mids: Vec<EdgeId> = self
            .graph
            .edge_ids()
            .into_iter()
            .filter(|&e| {
                let edge = self.graph.edge(e);
                edge.prev.is_some() && edge.next.is_some() && self.graph.is_upward(e)
            })
            .collect();

        upward_quad_mids.sort_by(|&a, &b| {
            let a_to = self.graph.radius(self.graph.edge(a).to);
            let b_to = self.graph.radius(self.graph.edge(b).to);
            if a_to == b_to {
                let a_flat =
                    self.graph.radius(self.graph.edge(a).from) == a_to;
                let b_flat =
                    self.graph.radius(self.graph.edge(b).from) == b_to;
                if a_flat && b_flat {
                    let max = Coord::MAX;
                    let a_dist = self
                        .graph
                        .dist_to_go_up(a)
                        .unwrap_or(max)
                        .min(self.graph.dist_to_go_up(self.graph.twin(a)).unwrap_or(max))
                        - self.graph.edge_length(a);
                    let b_dist = self
                        .graph
                        .dist_to_go_up(b)
                        .unwrap_or(max)
                        .min(self.graph.dist_to_go_up(self.graph.twin(b)).unwrap_or(max))
                        - self.graph.edge_length(b);
                    return a_dist.cmp(&b_dist);
                } else if a_flat {
                    return std::cmp::Ordering::Less; // a might be 'above' b
                } else if b_flat {
                    return std::cmp::Ordering::Greater;
                }
                return std::cmp::Ordering::Equal;
            }
            b_to.cmp(&a_to)
        });

        // Seed beadings at nodes with a decided bead count.
        for n in self.graph.node_ids() {
            let node = self.graph.node(n);
            if node.bead_count <= 0 {
                continue;
            }
            let r = node.distance_to_boundary;
            let beading = if node.transition_ratio == 0.0 {
                self.strategy.compute(r * 2, node.bead_count)
            } else {
                let low = self.strategy.compute(r * 2, node.bead_count);
                let high = self.strategy.compute(r * 2, node.bead_count + 1);
                interpolate(&low, 1.0 - node.transition_ratio, &high)
            };
            self.graph.node_mut(n).beading =
                Some(Rc::new(RefCell::new(BeadingPropagation::new(beading))));
        }

        self.propagate_beadings_upward(&upward_quad_mids);
        self.propagate_beadings_downward(&upward_quad_mids);
        self.generate_junctions();
        self.connect_junctions();
        self.generate_local_maxima_single_beads();
    }

    // =====================================================================
    //    BEADING PROPAGATION
    // =====================================================================

    fn propagate_beadings_upward(&mut self, upward_quad_mids: &[EdgeId]) {
        for &upward_edge in upward_quad_mids.iter().rev() {
            let to = self.graph.edge(upward_edge).to;
            let from = self.graph.edge(upward_edge).from;
            if self.graph.node(to).bead_count >= 0 {
                // Don't override local beading.
                continue;
            }
            let Some(lower) = self.graph.node(from).beading.clone() else {
                // Only propagate if we have something to propagate.
                continue;
            };
            if self.graph.node(to).beading.is_some() {
                // Only propagate to places where there is place.
                continue;
            }
            let length = self.graph.edge_length(upward_edge);
            let mut upper = lower.borrow().clone();
            upper.dist_to_bottom_source += length;
            upper.is_upward_propagated_only = true;
            self.graph.node_mut(to).beading = Some(Rc::new(RefCell::new(upper)));
        }
    }

    fn propagate_beadings_downward(&mut self, upward_quad_mids: &[EdgeId]) {
        for &upward_quad_mid in upward_quad_mids {
            // Central nodes carry their own beadings; only the flanks
            // propagate down.
            if self.graph.edge(upward_quad_mid).is_central() {
                continue;
            }
            let from = self.graph.edge(upward_quad_mid).from;
            let to = self.graph.edge(upward_quad_mid).to;
            let equidistant = self.graph.radius(from) == self.graph.radius(to);
            if equidistant
                && self.graph.node(from).beading.is_some()
                && self.graph.node(to).beading.is_none()
            {
                // Propagate from the known side to the unknown side.
                let twin = self.graph.twin(upward_quad_mid);
                self.propagate_beading_downward_edge(twin);
            } else {
                self.propagate_beading_downward_edge(upward_quad_mid);
            }
        }
    }

    fn propagate_beading_downward_edge(&mut self, edge_to_peak: EdgeId) {
        let length = self.graph.edge_length(edge_to_peak);
        let to = self.graph.edge(edge_to_peak).to;
        let from = self.graph.edge(edge_to_peak).from;
        let top_handle = self.get_or_create_beading(to);
        let top = top_handle.borrow().clone();
        if top.beading.total_thickness < self.graph.radius(to) * 2 {
            log::warn!("Top bead is beyond the center of the total width.");
        }

        match self.graph.node(from).beading.clone() {
            None => {
                // No beading at the lower node yet: inherit from the top.
                let mut propagated = top;
                propagated.dist_from_top_source += length;
                if propagated.beading.total_thickness < self.graph.radius(from) * 2 {
                    log::warn!("Propagated bead is beyond the center of the total width.");
                }
                self.graph.node_mut(from).beading = Some(Rc::new(RefCell::new(propagated)));
            }
            Some(bottom_handle) => {
                let mut bottom = bottom_handle.borrow_mut();
                let total_dist = top.dist_from_top_source + length + bottom.dist_to_bottom_source;
                let capped = total_dist.min(self.beading_propagation_transition_dist).max(1);
                let ratio_of_top = (bottom.dist_to_bottom_source as f64 / capped as f64).max(0.0);
                if ratio_of_top >= 1.0 {
                    *bottom = top;
                    bottom.dist_from_top_source += length;
                } else {
                    let merged = interpolate_switching(
                        &top.beading,
                        ratio_of_top,
                        &bottom.beading,
                        self.graph.radius(from),
                    );
                    if merged.total_thickness < self.graph.radius(from) * 2 {
                        log::warn!("Merged bead is beyond the center of the total width.");
                    }
                    *bottom = BeadingPropagation::new(merged);
                }
            }
        }
    }

    /// The beading at a node, creating one if the node never got any: use
    /// a nearby node's beading, or fall back to computing one from the
    /// local radius.
    fn get_or_create_beading(&mut self, node: NodeId) -> BeadingHandle {
        if let Some(handle) = self.graph.node(node).beading.clone() {
            return handle;
        }
        if self.graph.node(node).bead_count == -1 {
            // This happens when a small central edge was collapsed away.
            if let Some(nearest) = self.get_nearest_beading(node, NEARBY_BEAD_DIST) {
                self.graph.node_mut(node).beading = Some(nearest.clone());
                return nearest;
            }
            let mut has_central_edge = false;
            let mut dist = Coord::MAX;
            for e in self.graph.node_outgoing(node) {
                if self.graph.edge(e).is_central() {
                    has_central_edge = true;
                }
                let to = self.graph.edge(e).to;
                dist = dist.min(self.graph.radius(to) + self.graph.edge_length(e));
            }
            if !has_central_edge {
                log::warn!("Unknown beading for non-central node.");
            }
            if dist == Coord::MAX {
                dist = self.graph.radius(node);
            }
            let count = self.strategy.optimal_bead_count(dist * 2);
            self.graph.node_mut(node).bead_count = count;
        }
        let r = self.graph.radius(node);
        let count = self.graph.node(node).bead_count.max(0);
        let beading = self.strategy.compute(r * 2, count);
        let handle = Rc::new(RefCell::new(BeadingPropagation::new(beading)));
        self.graph.node_mut(node).beading = Some(handle.clone());
        handle
    }

    /// Breadth-first search outward from `node` for the nearest node that
    /// already has a beading.
    fn get_nearest_beading(&self, node: NodeId, max_dist: Coord) -> Option<BeadingHandle> {
        // Ordered by distance, tie-broken by edge id for determinism.
        let mut further: BinaryHeap<Reverse<(Coord, EdgeId)>> = BinaryHeap::new();
        for e in self.graph.node_outgoing(node) {
            further.push(Reverse((self.graph.edge_length(e), e)));
        }
        for _ in 0..BEAD_SEARCH_MAX {
            let Reverse((dist, here)) = further.pop()?;
            if dist > max_dist {
                return None;
            }
            let to = self.graph.edge(here).to;
            if let Some(handle) = self.graph.node(to).beading.clone() {
                return Some(handle);
            }
            for outgoing in self.graph.outgoing_edges(here) {
                further.push(Reverse((dist + self.graph.edge_length(outgoing), outgoing)));
            }
        }
        None
    }

    // =====================================================================
    //    JUNCTION GENERATION
    // =====================================================================

    fn generate_junctions(&mut self) {
        for e in self.graph.edge_ids() {
            let edge = self.graph.edge(e);
            let from = edge.from;
            let to = edge.to;
            if self.graph.radius(from) > self.graph.radius(to) {
                // Only consider the upward half-edges.
                continue;
            }
            let start_r = self.graph.radius(to); // higher R
            let end_r = self.graph.radius(from); // lower R
            let from_count = self.graph.node(from).bead_count;
            let to_count = self.graph.node(to).bead_count;
            if (from_count == to_count && from_count >= 0) || end_r >= start_r {
                // No beads to generate.
                continue;
            }

            let handle = self.get_or_create_beading(to);
            let beading: Beading = handle.borrow().beading.clone();
            if beading.total_thickness < start_r * 2 {
                log::warn!("Generated junction beyond the center of total width.");
            }

            let a = self.graph.node(to).p;
            let b = self.graph.node(from).p;

            let mut junctions: LineJunctions = Vec::new();
            let num_junctions = beading.toolpath_locations.len();
            let mut junction_idx = (num_junctions.max(1) - 1) as i64 / 2;
            if num_junctions == 0 {
                junction_idx = -1;
            }
            // Starting junction: the first location at or under the start
            // radius (plus 1 um against rounding on the middle line).
            while junction_idx >= 0 {
                if beading.toolpath_locations[junction_idx as usize] <= start_r + 1 {
                    break;
                }
                junction_idx -= 1;
            }
            // Odd segments may lie just outside the range due to rounding.
            if junction_idx + 1 < num_junctions as i64
                && beading.toolpath_locations[(junction_idx + 1) as usize] <= start_r + 5
                && beading.total_thickness < start_r + 5
            {
                junction_idx += 1;
            }

            while junction_idx >= 0 {
                let bead_r = beading.toolpath_locations[junction_idx as usize];
                if bead_r < end_r {
                    // Junctions coinciding with a node are handled by the
                    // next segment.
                    break;
                }
                let t = (bead_r - start_r) as f64 / (end_r - start_r) as f64;
                let mut junction = lerp(a, b, t);
                if bead_r > start_r - 5 {
                    // Snap to the start node, so 3-way intersections are
                    // seen robustly later on.
                    junction = a;
                }
                junctions.push(ExtrusionJunction::new(
                    junction,
                    beading.bead_widths[junction_idx as usize],
                    junction_idx as usize,
                ));
                junction_idx -= 1;
            }

            self.graph.edge_mut(e).junctions = Some(junctions);
        }
    }

    // =====================================================================
    //    STITCHING JUNCTIONS INTO SEGMENTS
    // =====================================================================

    fn get_quad_max_r_edge_to(&self, quad_start: EdgeId) -> EdgeId {
        debug_assert!(self.graph.edge(quad_start).prev.is_none());
        let mut max_r = -1;
        let mut ret = quad_start;
        let mut edge = Some(quad_start);
        let mut guard = 0;
        while let Some(e) = edge {
            let r = self.graph.radius(self.graph.edge(e).to);
            if r > max_r {
                max_r = r;
                ret = e;
            }
            edge = self.graph.edge(e).next;
            guard += 1;
            if guard > 1000 {
                break;
            }
        }
        // A flat, slightly descending final edge means the peak is earlier.
        if self.graph.edge(ret).next.is_none()
            && self.graph.radius(self.graph.edge(ret).to) - 5
                < self.graph.radius(self.graph.edge(ret).from)
        {
            if let Some(prev) = self.graph.edge(ret).prev {
                ret = prev;
            }
        }
        ret
    }

    fn get_next_unconnected(&self, quad_start: EdgeId) -> EdgeId {
        let mut result = quad_start;
        let mut guard = 0;
        while let Some(next) = self.graph.edge(result).next {
            result = next;
            guard += 1;
            if guard > 1000 {
                break;
            }
        }
        self.graph.twin(result)
    }

    fn connect_junctions(&mut self) {
        let quad_starts: Vec<EdgeId> = self
            .graph
            .edge_ids()
            .into_iter()
            .filter(|&e| self.graph.edge(e).prev.is_none())
            .collect();
        let mut processed: HashSet<EdgeId> = HashSet::new();
        let mut passed_odd_edges: HashSet<EdgeId> = HashSet::new();

        for &poly_domain_start in &quad_starts {
            if processed.contains(&poly_domain_start) {
                continue;
            }
            let mut quad_start = poly_domain_start;
            let mut new_domain_start = true;
            let mut guard = 0;
            loop {
                guard += 1;
                if guard > 100_000 {
                    log::warn!("Runaway quad domain walk; aborting stitching for this domain.");
                    break;
                }
                processed.insert(quad_start);

                let mut quad_end = quad_start;
                while let Some(next) = self.graph.edge(quad_end).next {
                    quad_end = next;
                }

                let edge_to_peak = self.get_quad_max_r_edge_to(quad_start);
                let Some(edge_from_peak) = self.graph.edge(edge_to_peak).next else {
                    quad_start = self.get_next_unconnected(quad_start);
                    if quad_start == poly_domain_start {
                        break;
                    }
                    continue;
                };

                // Junctions on the edges from the quad start up to the peak.
                let mut from_junctions: LineJunctions = self
                    .graph
                    .edge(edge_to_peak)
                    .junctions
                    .clone()
                    .unwrap_or_default();
                // Junctions on the edges from the quad end up to the peak.
                let mut to_junctions: LineJunctions = self
                    .graph
                    .edge(self.graph.twin(edge_from_peak))
                    .junctions
                    .clone()
                    .unwrap_or_default();

                if let Some(prev) = self.graph.edge(edge_to_peak).prev {
                    let from_prev_junctions: LineJunctions =
                        self.graph.edge(prev).junctions.clone().unwrap_or_default();
                    while !from_junctions.is_empty()
                        && !from_prev_junctions.is_empty()
                        && from_junctions.last().unwrap().perimeter_index
                            <= from_prev_junctions.first().unwrap().perimeter_index
                    {
                        from_junctions.pop();
                    }
                    from_junctions.extend(from_prev_junctions);
                    if self.graph.edge(prev).prev.is_some() {
                        log::warn!("The edge we're about to connect is already connected.");
                    }
                }
                if let Some(next) = self.graph.edge(edge_from_peak).next {
                    let to_next_junctions: LineJunctions = self
                        .graph
                        .edge(self.graph.twin(next))
                        .junctions
                        .clone()
                        .unwrap_or_default();
                    while !to_junctions.is_empty()
                        && !to_next_junctions.is_empty()
                        && to_junctions.last().unwrap().perimeter_index
                            <= to_next_junctions.first().unwrap().perimeter_index
                    {
                        to_junctions.pop();
                    }
                    to_junctions.extend(to_next_junctions);
                    if self.graph.edge(next).next.is_some() {
                        log::warn!("The edge we're about to connect is already connected.");
                    }
                }
                if (from_junctions.len() as i64 - to_junctions.len() as i64).abs() > 1 {
                    log::warn!(
                        "Can't create a transition when connecting two perimeters where the number of beads differs too much: {} vs. {}",
                        from_junctions.len(),
                        to_junctions.len()
                    );
                }

                let segment_count = from_junctions.len().min(to_junctions.len());
                let quad_start_to = self.graph.edge(quad_start).to;
                let quad_end_from = self.graph.edge(quad_end).from;
                for junction_rev_idx in 0..segment_count {
                    let from = from_junctions[from_junctions.len() - 1 - junction_rev_idx];
                    let to = to_junctions[to_junctions.len() - 1 - junction_rev_idx];
                    if from.perimeter_index != to.perimeter_index {
                        log::warn!(
                            "Connecting two perimeters with different indices: {} and {}",
                            from.perimeter_index,
                            to.perimeter_index
                        );
                    }
                    let is_single_bead_segment = junction_rev_idx == segment_count - 1;
                    let from_is_odd = {
                        let node = self.graph.node(quad_start_to);
                        node.bead_count > 0
                            && node.bead_count % 2 == 1
                            && node.transition_ratio == 0.0
                            && is_single_bead_segment
                            && (from.p - node.p).shorter_than(5)
                    };
                    let to_is_odd = {
                        let node = self.graph.node(quad_end_from);
                        node.bead_count > 0
                            && node.bead_count % 2 == 1
                            && node.transition_ratio == 0.0
                            && is_single_bead_segment
                            && (to.p - node.p).shorter_than(5)
                    };
                    let is_odd_segment = from_is_odd && to_is_odd;

                    let quad_start_next = self.graph.edge(quad_start).next;
                    if is_odd_segment {
                        // Only generate toolpaths for odd segments once.
                        if let Some(next) = quad_start_next {
                            if passed_odd_edges.contains(&self.graph.twin(next)) {
                                continue;
                            }
                        }
                    }
                    let from_is_3way =
                        from_is_odd && self.graph.is_multi_intersection(quad_start_to);
                    let to_is_3way = to_is_odd && self.graph.is_multi_intersection(quad_end_from);

                    if let Some(next) = quad_start_next {
                        passed_odd_edges.insert(next);
                    }

                    self.add_toolpath_segment(
                        from,
                        to,
                        is_odd_segment,
                        new_domain_start,
                        from_is_3way,
                        to_is_3way,
                    );
                }
                new_domain_start = false;

                quad_start = self.get_next_unconnected(quad_start);
                if quad_start == poly_domain_start {
                    break;
                }
            }
        }
    }

    /// Append one extrusion segment, extending the previous path of its
    /// inset when the endpoints line up.
    fn add_toolpath_segment(
        &mut self,
        from: ExtrusionJunction,
        to: ExtrusionJunction,
        is_odd: bool,
        force_new_path: bool,
        from_is_3way: bool,
        to_is_3way: bool,
    ) {
        if from == to {
            return;
        }

        let inset_idx = from.perimeter_index;
        if inset_idx >= self.toolpaths.len() {
            self.toolpaths.resize(inset_idx + 1, Vec::new());
        }
        let bucket = &mut self.toolpaths[inset_idx];
        let mut force_new_path = force_new_path;
        if bucket.is_empty()
            || bucket.last().unwrap().is_odd != is_odd
            || bucket
                .last()
                .unwrap()
                .junctions
                .last()
                .map(|j| j.perimeter_index != inset_idx)
                .unwrap_or(true)
        {
            force_new_path = true;
        }

        if !force_new_path {
            let tail = *bucket.last().unwrap().junctions.last().unwrap();
            if (tail.p - from.p).shorter_than(10) && (tail.w - from.w).abs() < 10 && !from_is_3way {
                bucket.last_mut().unwrap().junctions.push(to);
                return;
            }
            if (tail.p - to.p).shorter_than(10) && (tail.w - to.w).abs() < 10 && !to_is_3way {
                if !is_odd {
                    log::warn!("Reversing an even wall line would flip its winding.");
                }
                bucket.last_mut().unwrap().junctions.push(from);
                return;
            }
        }

        let mut line = ExtrusionLine::new(inset_idx, is_odd);
        line.junctions.push(from);
        line.junctions.push(to);
        bucket.push(line);
    }

    // =====================================================================
    //    LOCAL MAXIMA SINGLE BEADS
    // =====================================================================

    /// Odd-count local maxima get a small filler loop so the center of a
    /// near-circular region is not left empty. If the first inset is
    /// otherwise negligible, it is replaced by one loop at the averaged
    /// maximum.
    fn generate_local_maxima_single_beads(&mut self) {
        let mut local_maxima_accumulator = Point::new(0, 0);
        let mut width_accumulator: Coord = 0;
        let mut accumulator_count: usize = 0;

        for n in self.graph.node_ids() {
            let Some(handle) = self.graph.node(n).beading.clone() else {
                continue;
            };
            let beading = handle.borrow().beading.clone();
            if beading.bead_widths.len() % 2 == 1 && self.graph.is_local_maximum(n, true) {
                let inset_index = beading.bead_widths.len() / 2;
                let width = beading.bead_widths[inset_index];
                let p = self.graph.node(n).p;
                local_maxima_accumulator += p;
                width_accumulator += width;
                accumulator_count += 1;
                if !self.graph.node_is_central(n) {
                    self.add_circle_to_toolpaths(p, width, inset_index);
                }
            }
        }

        if accumulator_count > 0 {
            let mut replace_with_local_maxima =
                self.toolpaths.is_empty() || self.toolpaths[0].is_empty();
            if !replace_with_local_maxima {
                let mut total_path_length: Coord = 0;
                let mut min_width = Coord::MAX;
                for line in &self.toolpaths[0] {
                    total_path_length += line.length();
                    for junction in &line.junctions {
                        min_width = min_width.min(junction.w);
                    }
                }
                replace_with_local_maxima |= total_path_length <= min_width / 2;
            }
            if replace_with_local_maxima {
                let width = width_accumulator / accumulator_count as Coord;
                let center = Point::new(
                    local_maxima_accumulator.x / accumulator_count as Coord,
                    local_maxima_accumulator.y / accumulator_count as Coord,
                );
                if self.toolpaths.is_empty() {
                    self.toolpaths.push(Vec::new());
                } else {
                    self.toolpaths[0].clear();
                }
                self.add_circle_to_toolpaths(center, width, 0);
            }
        }
    }

    fn add_circle_to_toolpaths(&mut self, center: Point, width: Coord, inset_index: usize) {
        if inset_index >= self.toolpaths.len() {
            self.toolpaths.resize(inset_index + 1, Vec::new());
        }
        // The area to fill is pi*(w/2)^2; extruding at constant width w
        // along a circle of circumference 2*pi*r deposits the same when
        // r = w/8.
        let r = width / 8;
        let n_segments = 6;
        let mut line = ExtrusionLine::new(inset_index, true);
        for i in 0..=n_segments {
            let angle = 2.0 * std::f64::consts::PI * (i % n_segments) as f64 / n_segments as f64;
            let p = Point::new(
                center.x + (r as f64 * angle.cos()).round() as Coord,
                center.y + (r as f64 * angle.sin()).round() as Coord,
            );
            line.junctions
                .push(ExtrusionJunction::new(p, width, inset_index));
        }
        self.toolpaths[inset_index].push(line);
    }
}
