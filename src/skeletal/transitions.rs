//! Transition placement along the skeleton.
//!
//! Where the local thickness crosses a transition thickness of the beading
//! strategy, the bead count changes. Each change is modeled by one
//! transition middle on an upward edge and two transition ends where the
//! blend fades to a whole bead count. Applying the transitions splits the
//! affected edges with rib pairs so the segment generator sees a node at
//! every commitment point.

use super::graph::{EdgeId, TransitionEnd, TransitionMiddle};
use super::trapezoidation::{SkeletalTrapezoidation, SNAP_DIST};
use crate::geometry::point_along;
use crate::Coord;

impl<'a> SkeletalTrapezoidation<'a> {
    pub(super) fn generate_transitioning_ribs(&mut self) {
        self.generate_transition_mids();

        // Check the invariant: differing bead counts on a central edge
        // imply a transition in between.
        for e in self.graph.edge_ids() {
            let edge = self.graph.edge(e);
            if edge.is_central() {
                let from_count = self.graph.node(edge.from).bead_count;
                let to_count = self.graph.node(edge.to).bead_count;
                if from_count != to_count
                    && edge.transitions.is_empty()
                    && self.graph.edge(self.graph.twin(e)).transitions.is_empty()
                {
                    log::warn!(
                        "Central edge with bead counts {} and {} has no transition.",
                        from_count,
                        to_count
                    );
                }
            }
        }

        self.filter_transition_mids();
        self.generate_all_transition_ends();
        self.apply_transitions();
    }

    // =====================================================================
    //    TRANSITION MIDDLES
    // =====================================================================

    fn generate_transition_mids(&mut self) {
        for e in self.graph.edge_ids() {
            let edge = self.graph.edge(e);
            if !edge.is_central() {
                // Only central regions introduce transitions.
                continue;
            }
            let start_r = self.graph.radius(edge.from);
            let end_r = self.graph.radius(edge.to);
            let start_bead_count = self.graph.node(edge.from).bead_count;
            let end_bead_count = self.graph.node(edge.to).bead_count;

            if start_r == end_r {
                if start_bead_count != end_bead_count {
                    log::warn!(
                        "Bead count {} differs from {} even though the distance to boundary is the same.",
                        start_bead_count,
                        end_bead_count
                    );
                }
                continue;
            }
            if start_r > end_r {
                // Only the upward half-edge carries the transitions.
                continue;
            }
            if start_bead_count == end_bead_count {
                continue;
            }

            let edge_size = self.graph.edge_length(e);
            let mut mids: Vec<TransitionMiddle> = Vec::new();
            for lower_bead_count in start_bead_count.max(0)..end_bead_count {
                let mut mid_r = self.strategy.transition_thickness(lower_bead_count) / 2;
                if mid_r > end_r {
                    log::warn!("Transition lies beyond the end of its edge; clamping.");
                    mid_r = end_r;
                }
                if mid_r < start_r {
                    log::warn!("Transition lies before the start of its edge; clamping.");
                    mid_r = start_r;
                }
                let denom = end_r - start_r;
                let mid_pos = if denom == 0 {
                    edge_size / 2
                } else {
                    edge_size * (mid_r - start_r) / denom
                };
                // Enforce monotonic positions along the edge.
                if mids.last().map(|last| mid_pos < last.pos).unwrap_or(false) {
                    log::warn!("Transition mid out of order; skipping.");
                    continue;
                }
                mids.push(TransitionMiddle {
                    pos: mid_pos.clamp(0, edge_size),
                    lower_bead_count,
                    feature_radius: mid_r,
                });
            }
            if !mids.is_empty() {
                self.graph.edge_mut(e).transitions = mids;
            }
        }
    }

    fn filter_transition_mids(&mut self) {
        for e in self.graph.edge_ids() {
            if self.graph.edge(e).transitions.is_empty() {
                continue;
            }

            let ab_size = self.graph.edge_length(e);

            // Back side: the transition nearest the upper end.
            let back = *self.graph.edge(e).transitions.last().unwrap();
            let dissolve_back = self.dissolve_nearby_transitions(
                e,
                back,
                ab_size - back.pos,
                self.transition_filter_dist,
                true,
            );
            let mut should_dissolve_back = !dissolve_back.is_empty();
            for (other_edge, mid) in dissolve_back {
                self.dissolve_bead_count_region(e, back.lower_bead_count + 1, back.lower_bead_count);
                self.remove_transition(other_edge, mid);
            }
            {
                let anchor = self.strategy.transition_anchor_pos(back.lower_bead_count);
                let length = self.strategy.transitioning_length(back.lower_bead_count);
                let upper_half = ((1.0 - anchor) * length as f64) as Coord;
                should_dissolve_back |= self.filter_end_of_central_transition(
                    e,
                    ab_size - back.pos,
                    upper_half,
                    back.lower_bead_count,
                );
            }
            if should_dissolve_back {
                self.graph.edge_mut(e).transitions.pop();
            }
            if self.graph.edge(e).transitions.is_empty() {
                continue;
            }

            // Front side: the transition nearest the lower end, probed
            // through the twin.
            let front = *self.graph.edge(e).transitions.first().unwrap();
            let twin = self.graph.twin(e);
            let dissolve_front = self.dissolve_nearby_transitions(
                twin,
                front,
                front.pos,
                self.transition_filter_dist,
                false,
            );
            let mut should_dissolve_front = !dissolve_front.is_empty();
            for (other_edge, mid) in dissolve_front {
                self.dissolve_bead_count_region(
                    twin,
                    front.lower_bead_count,
                    front.lower_bead_count + 1,
                );
                self.remove_transition(other_edge, mid);
            }
            {
                let anchor = self.strategy.transition_anchor_pos(front.lower_bead_count);
                let length = self.strategy.transitioning_length(front.lower_bead_count);
                let lower_half = (anchor * length as f64) as Coord;
                should_dissolve_front |= self.filter_end_of_central_transition(
                    twin,
                    front.pos,
                    lower_half,
                    front.lower_bead_count + 1,
                );
            }
            if should_dissolve_front {
                let transitions = &mut self.graph.edge_mut(e).transitions;
                if !transitions.is_empty() {
                    transitions.remove(0);
                }
            }
        }
    }

    fn remove_transition(&mut self, edge: EdgeId, mid: TransitionMiddle) {
        self.graph
            .edge_mut(edge)
            .transitions
            .retain(|t| !(t.pos == mid.pos && t.lower_bead_count == mid.lower_bead_count));
    }

    /// Find transitions of the same lower bead count within `max_dist` in
    /// the travel direction. When the thickness deviation they bridge is
    /// small enough, both transitions can dissolve into none.
    fn dissolve_nearby_transitions(
        &mut self,
        edge_to_start: EdgeId,
        origin: TransitionMiddle,
        traveled: Coord,
        max_dist: Coord,
        going_up: bool,
    ) -> Vec<(EdgeId, TransitionMiddle)> {
        let mut to_be_dissolved = Vec::new();
        if traveled > max_dist {
            return to_be_dissolved;
        }
        let mut should_dissolve = true;
        for edge in self.graph.outgoing_edges(edge_to_start) {
            if !self.graph.edge(edge).is_central() {
                continue;
            }
            let ab_size = self.graph.edge_length(edge);
            let is_aligned = self.graph.is_upward(edge);
            let aligned_edge = if is_aligned { edge } else { self.graph.twin(edge) };
            let mut seen_transition_on_this_edge = false;

            // The deviation happens at both sides of the significant edge.
            let origin_radius = origin.feature_radius;
            let radius_here = self.graph.radius(self.graph.edge(edge).from);
            let dissolve_result_is_odd = (origin.lower_bead_count % 2 == 1) == going_up;
            let width_deviation = (origin_radius - radius_here).abs() * 2;
            let line_width_deviation = if dissolve_result_is_odd {
                width_deviation
            } else {
                width_deviation / 2
            };
            if line_width_deviation > self.allowed_filter_deviation {
                should_dissolve = false;
            }

            if should_dissolve && !self.graph.edge(aligned_edge).transitions.is_empty() {
                let transitions = self.graph.edge(aligned_edge).transitions.clone();
                for transition in transitions {
                    let pos = if is_aligned {
                        transition.pos
                    } else {
                        ab_size - transition.pos
                    };
                    // Only dissolve into local optima.
                    if traveled + pos < max_dist
                        && transition.lower_bead_count == origin.lower_bead_count
                    {
                        to_be_dissolved.push((aligned_edge, transition));
                        seen_transition_on_this_edge = true;
                    }
                }
            }
            if should_dissolve && !seen_transition_on_this_edge {
                let deeper = self.dissolve_nearby_transitions(
                    edge,
                    origin,
                    traveled + ab_size,
                    max_dist,
                    going_up,
                );
                if deeper.is_empty() {
                    // Too long to dissolve in this direction: then it
                    // cannot be dissolved in any direction.
                    return Vec::new();
                }
                to_be_dissolved.extend(deeper);
            }
        }

        if !should_dissolve {
            to_be_dissolved.clear();
        }
        to_be_dissolved
    }

    /// Flood the central region after `edge_to_start`, replacing
    /// `from_bead_count` with `to_bead_count`.
    fn dissolve_bead_count_region(
        &mut self,
        edge_to_start: EdgeId,
        from_bead_count: i64,
        to_bead_count: i64,
    ) {
        debug_assert_ne!(from_bead_count, to_bead_count);
        let start_to = self.graph.edge(edge_to_start).to;
        if self.graph.node(start_to).bead_count != from_bead_count {
            return;
        }
        self.graph.node_mut(start_to).bead_count = to_bead_count;

        let mut stack = vec![edge_to_start];
        while let Some(e) = stack.pop() {
            for outgoing in self.graph.outgoing_edges(e) {
                if !self.graph.edge(outgoing).is_central() {
                    continue;
                }
                let to = self.graph.edge(outgoing).to;
                if self.graph.node(to).bead_count == from_bead_count {
                    self.graph.node_mut(to).bead_count = to_bead_count;
                    stack.push(outgoing);
                }
            }
        }
    }

    /// When a transition half extends past the end of centrality by less
    /// than its half-length, the transition is clipped off: the nodes to
    /// the end adopt the replacing bead count.
    fn filter_end_of_central_transition(
        &mut self,
        edge_to_start: EdgeId,
        traveled: Coord,
        max_dist: Coord,
        replacing_bead_count: i64,
    ) -> bool {
        if traveled > max_dist {
            return false;
        }

        let mut is_end_of_central = true;
        let mut should_dissolve = false;
        for next_edge in self.graph.outgoing_edges(edge_to_start) {
            if self.graph.edge(next_edge).is_central() {
                let length = self.graph.edge_length(next_edge);
                should_dissolve |= self.filter_end_of_central_transition(
                    next_edge,
                    traveled + length,
                    max_dist,
                    replacing_bead_count,
                );
                is_end_of_central = false;
            }
        }
        if is_end_of_central && traveled < max_dist {
            should_dissolve = true;
        }

        if should_dissolve {
            let to = self.graph.edge(edge_to_start).to;
            self.graph.node_mut(to).bead_count = replacing_bead_count;
        }
        should_dissolve
    }

    // =====================================================================
    //    TRANSITION ENDS
    // =====================================================================

    fn generate_all_transition_ends(&mut self) {
        for e in self.graph.edge_ids() {
            if self.graph.edge(e).transitions.is_empty() {
                continue;
            }
            let transitions = self.graph.edge(e).transitions.clone();
            for mid in transitions {
                self.generate_transition_ends(e, mid.pos, mid.lower_bead_count);
            }
        }
    }

    fn generate_transition_ends(&mut self, e: EdgeId, mid_pos: Coord, lower_bead_count: i64) {
        let ab_size = self.graph.edge_length(e);
        let transition_length = self.strategy.transitioning_length(lower_bead_count);
        let anchor = self.strategy.transition_anchor_pos(lower_bead_count);

        let start_rest = 0.0;
        let mid_rest = anchor;
        let end_rest = 1.0;

        {
            // Lower bead count transition end, into the twin direction.
            let twin = self.graph.twin(e);
            let start_pos = ab_size - mid_pos;
            let transition_half_length = (anchor * transition_length as f64) as Coord;
            let end_pos = start_pos + transition_half_length;
            self.generate_transition_end(
                twin,
                start_pos,
                end_pos,
                transition_half_length,
                mid_rest,
                start_rest,
                lower_bead_count,
            );
        }
        {
            // Upper bead count transition end.
            let start_pos = mid_pos;
            let transition_half_length = ((1.0 - anchor) * transition_length as f64) as Coord;
            let end_pos = mid_pos + transition_half_length;
            self.generate_transition_end(
                e,
                start_pos,
                end_pos,
                transition_half_length,
                mid_rest,
                end_rest,
                lower_bead_count,
            );
        }
    }

    /// Walk along the skeleton from a transition middle to where the
    /// transition commits to a whole bead count, and record a transition
    /// end there. Traversal is an explicit work list with post-order
    /// aggregation rather than recursion, because end placement can fan
    /// out over many edges at junctions.
    #[allow(clippy::too_many_arguments)]
    fn generate_transition_end(
        &mut self,
        e: EdgeId,
        start_pos: Coord,
        end_pos: Coord,
        transition_half_length: Coord,
        start_rest: f64,
        end_rest: f64,
        lower_bead_count: i64,
    ) -> bool {
        struct Frame {
            edge: EdgeId,
            start_pos: Coord,
            end_pos: Coord,
            start_rest: f64,
            end_rest: f64,
            rest: f64,
            going_up: bool,
            terminal: bool,
            has_recursed: bool,
            children: Vec<usize>,
            result: bool,
        }

        let mut frames: Vec<Frame> = Vec::new();
        frames.push(Frame {
            edge: e,
            start_pos,
            end_pos,
            start_rest,
            end_rest,
            rest: 0.0,
            going_up: end_rest > start_rest,
            terminal: false,
            has_recursed: false,
            children: Vec::new(),
            result: false,
        });

        let mut cursor = 0;
        while cursor < frames.len() {
            let edge = frames[cursor].edge;
            let frame_start_pos = frames[cursor].start_pos;
            let frame_end_pos = frames[cursor].end_pos;
            let frame_start_rest = frames[cursor].start_rest;
            let frame_end_rest = frames[cursor].end_rest;
            let going_up = frames[cursor].going_up;

            let ab_size = self.graph.edge_length(edge);
            if !self.graph.edge(edge).is_central() {
                log::warn!("Transition ends should not be generated in non-central regions.");
                frames[cursor].terminal = true;
                frames[cursor].result = false;
                cursor += 1;
                continue;
            }

            if frame_end_pos > ab_size {
                // The end lies beyond this edge: spread over the outgoing
                // central edges.
                let denom = (frame_start_pos - frame_end_pos) as f64;
                let rest = if denom == 0.0 {
                    log::warn!("Zero-length transition span; using the midpoint blend.");
                    (frame_start_rest + frame_end_rest) / 2.0
                } else {
                    frame_end_rest
                        - (frame_start_rest - frame_end_rest) * (frame_end_pos - ab_size) as f64
                            / denom
                };
                let rest = rest.clamp(
                    frame_start_rest.min(frame_end_rest),
                    frame_start_rest.max(frame_end_rest),
                );
                frames[cursor].rest = rest;

                let outgoing_all = self.graph.outgoing_edges(edge);
                let central_edge_count = outgoing_all
                    .iter()
                    .filter(|&&out| self.graph.edge(out).is_central())
                    .count();

                let mut children = Vec::new();
                for outgoing in outgoing_all {
                    if !self.graph.edge(outgoing).is_central() {
                        // Don't put transition ends in non-central regions.
                        continue;
                    }
                    if central_edge_count > 1
                        && going_up
                        && self.is_going_down(
                            outgoing,
                            0,
                            frame_end_pos - ab_size + transition_half_length,
                            lower_bead_count,
                        )
                    {
                        // Behind a 3-way all-central junction, don't leak
                        // the transition into the downhill branch.
                        continue;
                    }
                    let child_idx = frames.len();
                    frames.push(Frame {
                        edge: outgoing,
                        start_pos: 0,
                        end_pos: frame_end_pos - ab_size,
                        start_rest: rest,
                        end_rest: frame_end_rest,
                        rest: 0.0,
                        going_up,
                        terminal: false,
                        has_recursed: false,
                        children: Vec::new(),
                        result: false,
                    });
                    children.push(child_idx);
                }
                frames[cursor].has_recursed = !children.is_empty();
                frames[cursor].children = children;
            } else {
                // Add the transition end point here.
                frames[cursor].terminal = true;
                frames[cursor].result = false;
                let is_lower_end = frame_end_rest == 0.0;
                let (upward_edge, pos) = if self.graph.is_upward(edge) {
                    (edge, frame_end_pos)
                } else {
                    (self.graph.twin(edge), ab_size - frame_end_pos)
                };
                let end = TransitionEnd {
                    pos,
                    lower_bead_count,
                    is_lower_end,
                };
                let ends = &mut self.graph.edge_mut(upward_edge).transition_ends;
                if ends.first().map(|f| pos < f.pos).unwrap_or(true) {
                    ends.insert(0, end);
                } else {
                    ends.push(end);
                }
            }
            cursor += 1;
        }

        // Post-order aggregation: children always sit after their parent
        // in discovery order, so a reverse sweep sees children first.
        for idx in (0..frames.len()).rev() {
            if frames[idx].terminal {
                continue;
            }
            let mut is_only_going_down = true;
            for &child in &frames[idx].children {
                is_only_going_down &= frames[child].result;
            }
            let has_recursed = frames[idx].has_recursed;
            if !frames[idx].going_up || (has_recursed && !is_only_going_down) {
                let to = self.graph.edge(frames[idx].edge).to;
                self.graph.node_mut(to).transition_ratio = frames[idx].rest;
                self.graph.node_mut(to).bead_count = lower_bead_count;
            }
            frames[idx].result = is_only_going_down;
        }
        frames[0].result
    }

    /// Whether following `outgoing` within `max_dist` leads (only) down to
    /// a lower bead count: to the boundary, to the matching transition of
    /// the opposite direction, or to a node already at the lower count.
    fn is_going_down(
        &self,
        outgoing: EdgeId,
        traveled: Coord,
        max_dist: Coord,
        lower_bead_count: i64,
    ) -> bool {
        let edge = self.graph.edge(outgoing);
        if self.graph.radius(edge.to) == 0 {
            return true;
        }
        let is_upward = self.graph.radius(edge.to) >= self.graph.radius(edge.from);
        let upward_edge = if is_upward {
            outgoing
        } else {
            self.graph.twin(outgoing)
        };
        if self.graph.node(edge.to).bead_count > lower_bead_count + 1 {
            if self.graph.edge(upward_edge).transitions.is_empty() {
                log::warn!("If the bead count is going down there has to be a transition mid.");
            }
            return false;
        }
        let length = self.graph.edge_length(outgoing);
        let transitions = &self.graph.edge(upward_edge).transitions;
        if !transitions.is_empty() {
            let mid = if is_upward {
                transitions.first().unwrap()
            } else {
                transitions.last().unwrap()
            };
            let reachable = if is_upward {
                mid.pos + traveled < max_dist
            } else {
                length - mid.pos + traveled < max_dist
            };
            if mid.lower_bead_count == lower_bead_count && reachable {
                return true;
            }
        }
        if traveled + length > max_dist {
            return false;
        }
        let to_node = self.graph.node(edge.to);
        if to_node.bead_count <= lower_bead_count
            && !(to_node.bead_count == lower_bead_count && to_node.transition_ratio > 0.0)
        {
            return true;
        }

        let mut is_only_going_down = true;
        let mut has_recursed = false;
        for next in self.graph.outgoing_edges(outgoing) {
            if !self.graph.edge(next).is_central() {
                continue;
            }
            is_only_going_down &=
                self.is_going_down(next, traveled + length, max_dist, lower_bead_count);
            has_recursed = true;
        }
        has_recursed && is_only_going_down
    }

    // =====================================================================
    //    APPLYING TRANSITIONS
    // =====================================================================

    /// Split every edge at its transition ends, inserting nodes committed
    /// to the appropriate bead count.
    fn apply_transitions(&mut self) {
        // Fold the twin's ends into the forward edge, mirrored.
        for e in self.graph.edge_ids() {
            let twin = self.graph.twin(e);
            if self.graph.edge(twin).transition_ends.is_empty() {
                continue;
            }
            let length = self.graph.edge_length(e);
            let twin_ends = std::mem::take(&mut self.graph.edge_mut(twin).transition_ends);
            for end in twin_ends {
                self.graph.edge_mut(e).transition_ends.push(TransitionEnd {
                    pos: length - end.pos,
                    lower_bead_count: end.lower_bead_count,
                    is_lower_end: end.is_lower_end,
                });
            }
        }

        for e in self.graph.edge_ids() {
            if self.graph.edge(e).transition_ends.is_empty() {
                continue;
            }
            debug_assert!(self.graph.edge(e).is_central());

            let mut ends = std::mem::take(&mut self.graph.edge_mut(e).transition_ends);
            ends.sort_by_key(|end| end.pos);

            let from = self.graph.edge(e).from;
            let to = self.graph.edge(e).to;
            let a = self.graph.node(from).p;
            let b = self.graph.node(to).p;
            let ab_size = self.graph.edge_length(e);

            let mut last_edge_replacing_input = e;
            for end in ends {
                let new_node_bead_count = if end.is_lower_end {
                    end.lower_bead_count
                } else {
                    end.lower_bead_count + 1
                };
                let end_pos = end.pos;
                if end_pos < 0 || end_pos > ab_size {
                    log::warn!("Transition end lies out of bounds of its edge; skipping.");
                    continue;
                }
                let close_node = if end_pos < ab_size / 2 { from } else { to };
                if (end_pos < SNAP_DIST || end_pos > ab_size - SNAP_DIST)
                    && self.graph.node(close_node).bead_count == new_node_bead_count
                {
                    self.graph.node_mut(close_node).transition_ratio = 0.0;
                    continue;
                }
                let mid = point_along(a, b, end_pos);
                last_edge_replacing_input =
                    self.graph
                        .insert_node(last_edge_replacing_input, mid, new_node_bead_count);
            }
        }
    }

    // =====================================================================
    //    EXTRA RIBS
    // =====================================================================

    /// Insert rib nodes at the strategy's nonlinear thicknesses so the
    /// segment generator gets samples wherever widths change rapidly.
    pub(super) fn generate_extra_ribs(&mut self) {
        for e in self.graph.edge_ids() {
            let edge = self.graph.edge(e);
            if !edge.is_central() {
                continue;
            }
            let from = edge.from;
            let to = edge.to;
            let a_r = self.graph.radius(from);
            let b_r = self.graph.radius(to);
            if (self.graph.node(to).p - self.graph.node(from).p)
                .shorter_than(self.discretization_step_size)
                || a_r >= b_r
            {
                continue;
            }

            let from_bead_count = self.graph.node(from).bead_count;
            let rib_thicknesses = self.strategy.nonlinear_thicknesses(from_bead_count);
            if rib_thicknesses.is_empty() {
                continue;
            }

            let a = self.graph.node(from).p;
            let b = self.graph.node(to).p;
            let ab_size = self.graph.edge_length(e);

            let mut last_edge_replacing_input = e;
            for rib_thickness in rib_thicknesses {
                if rib_thickness / 2 <= a_r {
                    continue;
                }
                if rib_thickness / 2 >= b_r {
                    break;
                }
                let new_node_bead_count = from_bead_count.min(self.graph.node(to).bead_count);
                let end_pos = ab_size * (rib_thickness / 2 - a_r) / (b_r - a_r);
                if end_pos <= 0 || end_pos >= ab_size {
                    continue;
                }
                let close_node = if end_pos < ab_size / 2 { from } else { to };
                if (end_pos < SNAP_DIST || end_pos > ab_size - SNAP_DIST)
                    && self.graph.node(close_node).bead_count == new_node_bead_count
                {
                    self.graph.node_mut(close_node).transition_ratio = 0.0;
                    continue;
                }
                let mid = point_along(a, b, end_pos);
                last_edge_replacing_input =
                    self.graph
                        .insert_node(last_edge_replacing_input, mid, new_node_bead_count);
            }
        }
    }
}
