//! Half-edge graph for the skeletal trapezoidation.
//!
//! A doubly-linked planar subdivision stored in an arena: nodes and edges
//! are addressed by stable integer ids and never move once inserted, so
//! the twin/next/prev links stay valid across construction and rewrites.
//! Removed elements are tombstoned rather than freed.

use crate::beading::Beading;
use crate::extrusion::LineJunctions;
use crate::geometry::Point;
use crate::Coord;
use std::cell::RefCell;
use std::rc::Rc;

/// Stable identifier of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Stable identifier of a half-edge in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

/// What a half-edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeKind {
    /// Copied from the Voronoi diagram.
    #[default]
    Normal,
    /// A rib inserted when splitting a quad at a transition or sampled
    /// radius.
    Rib,
    /// Not part of the Voronoi diagram: construction ribs and synthesized
    /// twins. Never central.
    Extra,
}

/// A beading assigned to a node, together with how far it traveled from
/// the nodes it was computed at.
#[derive(Debug, Clone)]
pub struct BeadingPropagation {
    pub beading: Beading,
    pub dist_to_bottom_source: Coord,
    pub dist_from_top_source: Coord,
    pub is_upward_propagated_only: bool,
}

impl BeadingPropagation {
    pub fn new(beading: Beading) -> Self {
        Self {
            beading,
            dist_to_bottom_source: 0,
            dist_from_top_source: 0,
            is_upward_propagated_only: false,
        }
    }
}

/// Shared handle to a beading propagation; several nodes may reference the
/// same one. All handles are dropped together when generation finishes.
pub type BeadingHandle = Rc<RefCell<BeadingPropagation>>;

/// A transition point where the bead count changes from
/// `lower_bead_count` to one more, at `pos` along an upward edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionMiddle {
    pub pos: Coord,
    pub lower_bead_count: i64,
    /// The distance-to-boundary at which this transition fires.
    pub feature_radius: Coord,
}

/// The position along an edge where a transition fades to full commitment
/// to either the lower or the upper bead count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEnd {
    pub pos: Coord,
    pub lower_bead_count: i64,
    pub is_lower_end: bool,
}

/// A node of the skeletal subdivision.
#[derive(Debug, Clone)]
pub struct SkeletalNode {
    pub p: Point,
    /// Distance to the polygon boundary; -1 while unset, 0 on the boundary.
    pub distance_to_boundary: Coord,
    /// Bead count decided for this node; -1 while unset.
    pub bead_count: i64,
    /// How far into a transition this node sits (0 = fully at
    /// `bead_count`).
    pub transition_ratio: f64,
    pub beading: Option<BeadingHandle>,
    pub incident_edge: Option<EdgeId>,
    pub dead: bool,
}

impl SkeletalNode {
    fn new(p: Point) -> Self {
        Self {
            p,
            distance_to_boundary: -1,
            bead_count: -1,
            transition_ratio: 0.0,
            beading: None,
            incident_edge: None,
            dead: false,
        }
    }
}

/// A directed half-edge of the skeletal subdivision.
#[derive(Debug, Clone)]
pub struct SkeletalEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub twin: Option<EdgeId>,
    pub prev: Option<EdgeId>,
    pub next: Option<EdgeId>,
    pub kind: EdgeKind,
    /// Whether this edge lies along the medial axis proper; None while
    /// undecided.
    pub is_central: Option<bool>,
    pub transitions: Vec<TransitionMiddle>,
    pub transition_ends: Vec<TransitionEnd>,
    pub junctions: Option<LineJunctions>,
    pub dead: bool,
}

impl SkeletalEdge {
    fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            twin: None,
            prev: None,
            next: None,
            kind,
            is_central: None,
            transitions: Vec::new(),
            transition_ends: Vec::new(),
            junctions: None,
            dead: false,
        }
    }

    #[inline]
    pub fn is_central(&self) -> bool {
        self.is_central == Some(true)
    }
}

/// The half-edge graph arena.
#[derive(Debug, Default)]
pub struct SkeletalGraph {
    nodes: Vec<SkeletalNode>,
    edges: Vec<SkeletalEdge>,
}

impl SkeletalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // === Arena access ===

    pub fn add_node(&mut self, p: Point) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SkeletalNode::new(p));
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(SkeletalEdge::new(from, to, kind));
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &SkeletalNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SkeletalNode {
        &mut self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &SkeletalEdge {
        &self.edges[id.0 as usize]
    }

    #[inline]
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut SkeletalEdge {
        &mut self.edges[id.0 as usize]
    }

    /// Ids of all live edges, ascending. Deterministic iteration order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        (0..self.edges.len() as u32)
            .map(EdgeId)
            .filter(|&e| !self.edges[e.0 as usize].dead)
            .collect()
    }

    /// Ids of all live nodes, ascending.
    pub fn node_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|&n| !self.nodes[n.0 as usize].dead)
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| !e.dead).count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.dead).count()
    }

    /// The twin of a live edge. Construction repairs all missing twins, so
    /// downstream code may call this unconditionally.
    #[inline]
    pub fn twin(&self, e: EdgeId) -> EdgeId {
        self.edge(e)
            .twin
            .expect("edge without twin after graph repair")
    }

    /// Length of an edge in micrometers.
    pub fn edge_length(&self, e: EdgeId) -> Coord {
        let edge = self.edge(e);
        (self.node(edge.to).p - self.node(edge.from).p).vsize()
    }

    /// Distance-to-boundary of a node, clamped to 0 when unset.
    #[inline]
    pub fn radius(&self, n: NodeId) -> Coord {
        self.node(n).distance_to_boundary
    }

    // === Traversal ===

    /// The outgoing edges of `incoming.to` excluding the twin, in rotation
    /// order: `incoming.next`, then repeatedly `twin(x).next`.
    pub fn outgoing_edges(&self, incoming: EdgeId) -> Vec<EdgeId> {
        let mut result = Vec::new();
        let twin = self.edge(incoming).twin;
        let mut current = self.edge(incoming).next;
        let mut guard = 0;
        while let Some(edge) = current {
            if Some(edge) == twin {
                break;
            }
            result.push(edge);
            guard += 1;
            if guard > 1000 {
                log::warn!("Runaway rotation while listing outgoing edges; truncating.");
                break;
            }
            current = self.edge(self.twin(edge)).next;
        }
        result
    }

    /// All outgoing edges of a node, starting from its incident edge.
    pub fn node_outgoing(&self, n: NodeId) -> Vec<EdgeId> {
        let mut result = Vec::new();
        let Some(start) = self.node(n).incident_edge else {
            return result;
        };
        let mut current = start;
        let mut guard = 0;
        loop {
            result.push(current);
            guard += 1;
            if guard > 1000 {
                log::warn!("Runaway rotation around node; truncating.");
                break;
            }
            let Some(twin) = self.edge(current).twin else {
                break;
            };
            let Some(next) = self.edge(twin).next else {
                break;
            };
            if next == start {
                break;
            }
            current = next;
        }
        result
    }

    // === Predicates ===

    /// Whether following this edge (and, over equidistant stretches, its
    /// continuations) leads to a strictly greater distance-to-boundary.
    pub fn can_go_up(&self, e: EdgeId, strict: bool) -> bool {
        self.can_go_up_rec(e, strict, 0)
    }

    fn can_go_up_rec(&self, e: EdgeId, strict: bool, depth: u32) -> bool {
        if depth > 1000 {
            log::warn!("Equidistant region too deep while probing upward; assuming flat.");
            return false;
        }
        let edge = self.edge(e);
        let r_from = self.radius(edge.from);
        let r_to = self.radius(edge.to);
        if r_to > r_from {
            return true;
        }
        if r_to < r_from || strict {
            return false;
        }
        // Edge between equidistant nodes; probe further.
        for outgoing in self.outgoing_edges(e) {
            if self.can_go_up_rec(outgoing, false, depth + 1) {
                return true;
            }
            if self.edge(self.twin(outgoing)).next.is_none() {
                return false; // This point is on the boundary.
            }
        }
        false
    }

    /// The distance to travel along equidistant edges before the radius
    /// increases, or None when it never does.
    pub fn dist_to_go_up(&self, e: EdgeId) -> Option<Coord> {
        self.dist_to_go_up_rec(e, 0)
    }

    fn dist_to_go_up_rec(&self, e: EdgeId, depth: u32) -> Option<Coord> {
        if depth > 1000 {
            return None;
        }
        let edge = self.edge(e);
        let r_from = self.radius(edge.from);
        let r_to = self.radius(edge.to);
        if r_to > r_from {
            return Some(0);
        }
        if r_to < r_from {
            return None;
        }
        let mut ret: Option<Coord> = None;
        for outgoing in self.outgoing_edges(e) {
            if let Some(dist) = self.dist_to_go_up_rec(outgoing, depth + 1) {
                ret = Some(ret.map_or(dist, |r| r.min(dist)));
            }
            if self.edge(self.twin(outgoing)).next.is_none() {
                return ret;
            }
        }
        ret.map(|r| r + self.edge_length(e))
    }

    /// Whether the edge heads toward greater distance-to-boundary. Over
    /// equidistant edges, the side closer to an ascent wins.
    pub fn is_upward(&self, e: EdgeId) -> bool {
        let edge = self.edge(e);
        let r_from = self.radius(edge.from);
        let r_to = self.radius(edge.to);
        if r_to > r_from {
            return true;
        }
        if r_to < r_from {
            return false;
        }
        let to_up = self.dist_to_go_up(e);
        let from_up = self.dist_to_go_up(self.twin(e));
        match (to_up, from_up) {
            (Some(t), Some(f)) => t < f,
            (t, _) => t.is_some(),
        }
    }

    /// Whether the node is a local maximum of distance-to-boundary.
    pub fn is_local_maximum(&self, n: NodeId, strict: bool) -> bool {
        if self.node(n).distance_to_boundary == 0 {
            return false;
        }
        let outgoing = self.node_outgoing(n);
        if outgoing.is_empty() {
            return false;
        }
        for e in outgoing {
            if self.can_go_up(e, strict) {
                return false;
            }
            match self.edge(e).twin {
                Some(twin) if self.edge(twin).next.is_some() => {}
                _ => return false, // This point is on the boundary.
            }
        }
        true
    }

    /// Whether more than two central paths meet at this node.
    pub fn is_multi_intersection(&self, n: NodeId) -> bool {
        let mut central_count = 0;
        for e in self.node_outgoing(n) {
            if self.edge(e).is_central() {
                central_count += 1;
            }
        }
        central_count > 2
    }

    /// Whether any edge at this node is central.
    pub fn node_is_central(&self, n: NodeId) -> bool {
        self.node_outgoing(n)
            .iter()
            .any(|&e| self.edge(e).is_central())
    }

    // === Construction operations ===

    /// Append a rib pair transverse to the medial axis at the `to` end of
    /// `prev_edge`, connecting it down to the boundary source segment.
    /// Afterwards `prev_edge` is the rib half pointing back inward, ready
    /// to be chained to the next medial edge.
    pub fn make_rib(&mut self, prev_edge: &mut EdgeId, start_source: Point, end_source: Point) {
        let to_node = self.edge(*prev_edge).to;
        let inner_p = self.node(to_node).p;
        let boundary_p = inner_p.project_onto_segment(start_source, end_source);
        let dist = (inner_p - boundary_p).vsize();
        self.node_mut(to_node).distance_to_boundary = dist;

        let boundary_node = self.add_node(boundary_p);
        self.node_mut(boundary_node).distance_to_boundary = 0;

        let forth = self.add_edge(to_node, boundary_node, EdgeKind::Extra);
        let back = self.add_edge(boundary_node, to_node, EdgeKind::Extra);

        self.edge_mut(*prev_edge).next = Some(forth);
        self.edge_mut(forth).prev = Some(*prev_edge);
        self.edge_mut(forth).twin = Some(back);
        self.edge_mut(back).twin = Some(forth);
        self.node_mut(boundary_node).incident_edge = Some(back);

        *prev_edge = back;
    }

    /// The boundary source points of the quad containing `e`: the `from`
    /// of the quad's first edge and the `to` of its last.
    pub fn quad_source(&self, e: EdgeId) -> (Point, Point) {
        let mut first = e;
        let mut guard = 0;
        while let Some(prev) = self.edge(first).prev {
            first = prev;
            guard += 1;
            if guard > 1000 {
                break;
            }
        }
        let mut last = e;
        guard = 0;
        while let Some(next) = self.edge(last).next {
            last = next;
            guard += 1;
            if guard > 1000 {
                break;
            }
        }
        (
            self.node(self.edge(first).from).p,
            self.node(self.edge(last).to).p,
        )
    }

    /// Split `edge` at `mid`, inserting a node carrying `bead_count`, and
    /// subdivide both adjacent quads with rib pairs down to their boundary
    /// sources. Returns the trailing half-edge replacing the input (the
    /// part from the new node to the original `to`).
    pub fn insert_node(&mut self, edge: EdgeId, mid: Point, bead_count: i64) -> EdgeId {
        let mid_node = self.add_node(mid);

        let twin = self.twin(edge);
        let (_, last_replacing_input) = self.insert_rib(edge, mid_node);
        let (first_replacing_twin, last_replacing_twin) = self.insert_rib(twin, mid_node);

        // Re-pair the four halves across the split.
        let first_replacing_input = edge;
        self.edge_mut(first_replacing_input).twin = Some(last_replacing_twin);
        self.edge_mut(last_replacing_twin).twin = Some(first_replacing_input);
        self.edge_mut(last_replacing_input).twin = Some(first_replacing_twin);
        self.edge_mut(first_replacing_twin).twin = Some(last_replacing_input);

        self.node_mut(mid_node).bead_count = bead_count;

        last_replacing_input
    }

    /// Split `edge` at `mid_node` and hang a rib pair from the new node
    /// down to the boundary source of the containing quad. Returns the two
    /// central halves replacing the input edge, in order.
    fn insert_rib(&mut self, edge: EdgeId, mid_node: NodeId) -> (EdgeId, EdgeId) {
        let edge_before = self.edge(edge).prev;
        let edge_after = self.edge(edge).next;
        let node_before = self.edge(edge).from;
        let node_after = self.edge(edge).to;

        let p = self.node(mid_node).p;
        let (source_from, source_to) = self.quad_source(edge);
        let px = p.project_onto_segment(source_from, source_to);
        let dist = (p - px).vsize();
        if dist <= 0 {
            log::warn!("Inserted node lies on the boundary source; radius clamped to 0.");
        }
        self.node_mut(mid_node).distance_to_boundary = dist.max(0);
        self.node_mut(mid_node).transition_ratio = 0.0;

        let source_node = self.add_node(px);
        self.node_mut(source_node).distance_to_boundary = 0;

        // `first` reuses the input edge record; `second` continues to the
        // original destination. The outward/inward pair is the new rib.
        let first = edge;
        let second = self.add_edge(mid_node, node_after, EdgeKind::Normal);
        let outward = self.add_edge(mid_node, source_node, EdgeKind::Rib);
        let inward = self.add_edge(source_node, mid_node, EdgeKind::Rib);

        {
            let e = self.edge_mut(first);
            e.to = mid_node;
            e.next = Some(outward);
            e.prev = edge_before;
            e.twin = None;
            e.is_central = Some(true);
        }
        {
            let e = self.edge_mut(second);
            e.prev = Some(inward);
            e.next = edge_after;
            e.twin = None;
            e.is_central = Some(true);
        }
        self.edge_mut(outward).prev = Some(first);
        self.edge_mut(outward).next = None;
        self.edge_mut(outward).twin = Some(inward);
        self.edge_mut(outward).is_central = Some(false);
        self.edge_mut(inward).prev = None;
        self.edge_mut(inward).next = Some(second);
        self.edge_mut(inward).twin = Some(outward);
        self.edge_mut(inward).is_central = Some(false);

        if let Some(before) = edge_before {
            self.edge_mut(before).next = Some(first);
        } else {
            self.node_mut(node_before).incident_edge = Some(first);
        }
        if let Some(after) = edge_after {
            self.edge_mut(after).prev = Some(second);
        }
        self.node_mut(mid_node).incident_edge = Some(second);
        self.node_mut(source_node).incident_edge = Some(inward);

        (first, second)
    }

    /// Merge edges shorter than `granularity`, preserving the twin and
    /// prev/next invariants. Only quad middle edges collapse; rib pairs
    /// define the quad structure and stay.
    pub fn collapse_small_edges(&mut self, granularity: Coord) {
        let quad_starts: Vec<EdgeId> = self
            .edge_ids()
            .into_iter()
            .filter(|&e| self.edge(e).prev.is_none())
            .collect();

        for quad_start in quad_starts {
            if self.edge(quad_start).dead {
                continue;
            }
            let mut quad_end = quad_start;
            let mut guard = 0;
            while let Some(next) = self.edge(quad_end).next {
                quad_end = next;
                guard += 1;
                if guard > 1000 {
                    break;
                }
            }
            let quad_mid = if self.edge(quad_start).next == Some(quad_end) {
                self.edge(quad_start).next.filter(|&m| m != quad_end)
            } else {
                self.edge(quad_start).next
            };
            let Some(mid) = quad_mid else {
                continue;
            };
            if mid == quad_end {
                continue;
            }
            let mid_edge = self.edge(mid);
            if mid_edge.dead {
                continue;
            }
            let from = mid_edge.from;
            let to = mid_edge.to;
            if !(self.node(from).p - self.node(to).p).shorter_than(granularity) {
                continue;
            }
            let Some(mid_twin) = self.edge(mid).twin else {
                continue;
            };

            // Redirect every edge touching the disappearing node.
            for e in self.edge_ids() {
                if e == mid || e == mid_twin {
                    continue;
                }
                if self.edge(e).from == to {
                    self.edge_mut(e).from = from;
                }
                if self.edge(e).to == to {
                    self.edge_mut(e).to = from;
                }
            }
            if self.node(from).incident_edge == Some(mid) {
                let replacement = self
                    .edge(mid_twin)
                    .next
                    .or_else(|| self.edge(mid).prev.map(|p| self.twin(p)));
                self.node_mut(from).incident_edge = replacement;
            }

            // Splice both halves out of their quads.
            let mid_prev = self.edge(mid).prev;
            let mid_next = self.edge(mid).next;
            if let Some(p) = mid_prev {
                self.edge_mut(p).next = mid_next;
            }
            if let Some(n) = mid_next {
                self.edge_mut(n).prev = mid_prev;
            }
            let twin_prev = self.edge(mid_twin).prev;
            let twin_next = self.edge(mid_twin).next;
            if let Some(p) = twin_prev {
                self.edge_mut(p).next = twin_next;
            }
            if let Some(n) = twin_next {
                self.edge_mut(n).prev = twin_prev;
            }

            self.edge_mut(mid).dead = true;
            self.edge_mut(mid_twin).dead = true;
            self.node_mut(to).dead = true;
        }
    }

    /// Nodes shared by multiple quad starts get one copy per quad, so
    /// every quad has a private boundary start node.
    pub fn separate_pointy_quad_end_nodes(&mut self) {
        let mut visited: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
        for quad_start in self.edge_ids() {
            if self.edge(quad_start).prev.is_some() {
                continue;
            }
            let from = self.edge(quad_start).from;
            if visited.insert(from) {
                continue;
            }
            // Needs to be duplicated.
            let p = self.node(from).p;
            let new_node = self.add_node(p);
            self.node_mut(new_node).distance_to_boundary = self.node(from).distance_to_boundary;
            self.node_mut(new_node).incident_edge = Some(quad_start);
            self.edge_mut(quad_start).from = new_node;
            if let Some(twin) = self.edge(quad_start).twin {
                self.edge_mut(twin).to = new_node;
            }
        }
    }

    /// Close the twin invariant: for any edge still missing its twin, pair
    /// it with a geometrically opposite unpaired edge, or synthesize a
    /// virtual reverse edge. The rest of the pipeline dereferences twins
    /// without checks, so this pass is load-bearing.
    pub fn repair_missing_twins(&mut self) {
        let unpaired: Vec<EdgeId> = self
            .edge_ids()
            .into_iter()
            .filter(|&e| self.edge(e).twin.is_none())
            .collect();
        if unpaired.is_empty() {
            return;
        }

        for &e in &unpaired {
            if self.edge(e).twin.is_some() || self.edge(e).dead {
                continue;
            }
            let from_p = self.node(self.edge(e).from).p;
            let to_p = self.node(self.edge(e).to).p;

            let opposite = unpaired.iter().copied().find(|&other| {
                other != e
                    && !self.edge(other).dead
                    && self.edge(other).twin.is_none()
                    && self.node(self.edge(other).from).p == to_p
                    && self.node(self.edge(other).to).p == from_p
            });

            if let Some(other) = opposite {
                self.edge_mut(e).twin = Some(other);
                self.edge_mut(other).twin = Some(e);
                continue;
            }

            log::warn!("Encountered a Voronoi edge without twin; synthesizing a virtual twin.");
            let from = self.edge(e).from;
            let to = self.edge(e).to;
            let virtual_twin = self.add_edge(to, from, EdgeKind::Extra);
            self.edge_mut(virtual_twin).is_central = Some(false);
            self.edge_mut(virtual_twin).twin = Some(e);
            self.edge_mut(e).twin = Some(virtual_twin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal two-quad skeleton over a horizontal strip:
    /// boundary nodes at y=0, a medial edge at y=500 between x=0 and
    /// x=2000.
    fn strip_graph() -> (SkeletalGraph, EdgeId) {
        let mut g = SkeletalGraph::new();
        let a = g.add_node(Point::new(0, 500));
        let b = g.add_node(Point::new(2_000, 500));
        g.node_mut(a).distance_to_boundary = 500;
        g.node_mut(b).distance_to_boundary = 500;

        let ab = g.add_edge(a, b, EdgeKind::Normal);
        let ba = g.add_edge(b, a, EdgeKind::Normal);
        g.edge_mut(ab).twin = Some(ba);
        g.edge_mut(ba).twin = Some(ab);
        g.node_mut(a).incident_edge = Some(ab);
        g.node_mut(b).incident_edge = Some(ba);
        (g, ab)
    }

    #[test]
    fn test_twin_repair_synthesizes() {
        let mut g = SkeletalGraph::new();
        let a = g.add_node(Point::new(0, 0));
        let b = g.add_node(Point::new(1_000, 0));
        let e = g.add_edge(a, b, EdgeKind::Normal);
        g.repair_missing_twins();
        let twin = g.twin(e);
        assert_eq!(g.edge(twin).from, b);
        assert_eq!(g.edge(twin).to, a);
        assert_eq!(g.edge(twin).kind, EdgeKind::Extra);
        assert_eq!(g.edge(twin).is_central, Some(false));
        assert_eq!(g.twin(twin), e);
    }

    #[test]
    fn test_twin_repair_pairs_opposites() {
        let mut g = SkeletalGraph::new();
        let a = g.add_node(Point::new(0, 0));
        let b = g.add_node(Point::new(1_000, 0));
        let e1 = g.add_edge(a, b, EdgeKind::Normal);
        let e2 = g.add_edge(b, a, EdgeKind::Normal);
        g.repair_missing_twins();
        assert_eq!(g.twin(e1), e2);
        assert_eq!(g.twin(e2), e1);
        // No extra edges were synthesized.
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_make_rib_sets_radius_and_links() {
        let (mut g, ab) = strip_graph();
        let mut prev = ab;
        g.make_rib(&mut prev, Point::new(0, 0), Point::new(2_000, 0));
        // prev is now the rib pointing back inward.
        assert_ne!(prev, ab);
        let back = g.edge(prev);
        assert_eq!(back.kind, EdgeKind::Extra);
        assert_eq!(g.node(back.from).distance_to_boundary, 0);
        assert_eq!(g.node(back.from).p, Point::new(2_000, 0));
        // The medial endpoint radius was measured to the source segment.
        assert_eq!(g.node(back.to).distance_to_boundary, 500);
        // forth/back are twins.
        let forth = g.twin(prev);
        assert_eq!(g.edge(forth).prev, Some(ab));
        assert_eq!(g.edge(ab).next, Some(forth));
    }

    #[test]
    fn test_insert_node_splits_edge_and_twin() {
        // Two proper quads around a horizontal medial edge: each side has
        // a boundary rib leading in, the medial edge, and a rib out, so
        // the quad sources are the boundary segments at y=0 and y=1000.
        let mut g = SkeletalGraph::new();
        let a = g.add_node(Point::new(0, 500));
        let b = g.add_node(Point::new(2_000, 500));
        let s0 = g.add_node(Point::new(0, 0));
        let t1 = g.add_node(Point::new(2_000, 1_000));
        g.node_mut(s0).distance_to_boundary = 0;
        g.node_mut(t1).distance_to_boundary = 0;

        let ab = g.add_edge(a, b, EdgeKind::Normal);
        let ba = g.add_edge(b, a, EdgeKind::Normal);
        g.edge_mut(ab).twin = Some(ba);
        g.edge_mut(ba).twin = Some(ab);

        let rib_in = g.add_edge(s0, a, EdgeKind::Extra);
        g.edge_mut(rib_in).next = Some(ab);
        g.edge_mut(ab).prev = Some(rib_in);
        let mut prev = ab;
        g.make_rib(&mut prev, Point::new(0, 0), Point::new(2_000, 0));

        let rib_in2 = g.add_edge(t1, b, EdgeKind::Extra);
        g.edge_mut(rib_in2).next = Some(ba);
        g.edge_mut(ba).prev = Some(rib_in2);
        let mut prev_b = ba;
        g.make_rib(&mut prev_b, Point::new(2_000, 1_000), Point::new(0, 1_000));

        g.node_mut(s0).incident_edge = Some(rib_in);
        g.node_mut(t1).incident_edge = Some(rib_in2);
        g.repair_missing_twins();
        g.edge_mut(ab).is_central = Some(true);
        g.edge_mut(ba).is_central = Some(true);

        let edge_count_before = g.edge_count();
        let trailing = g.insert_node(ab, Point::new(1_000, 500), 2);

        // The trailing edge runs from the new node to the original end.
        assert_eq!(g.node(g.edge(trailing).to).p, Point::new(2_000, 500));
        let mid_node = g.edge(trailing).from;
        assert_eq!(g.node(mid_node).p, Point::new(1_000, 500));
        assert_eq!(g.node(mid_node).bead_count, 2);
        assert_eq!(g.node(mid_node).distance_to_boundary, 500);

        // Twin consistency across all four halves.
        for e in g.edge_ids() {
            let twin = g.edge(e).twin.expect("twin missing after insert_node");
            assert_eq!(g.edge(twin).twin, Some(e));
            assert_eq!(g.edge(twin).from, g.edge(e).to);
        }
        // Two central halves + two rib pairs per side were added.
        assert!(g.edge_count() > edge_count_before);
    }

    #[test]
    fn test_collapse_small_edges() {
        let mut g = SkeletalGraph::new();
        // Quad: rib up, tiny medial edge, rib down.
        let b0 = g.add_node(Point::new(0, 0));
        let m0 = g.add_node(Point::new(0, 500));
        let m1 = g.add_node(Point::new(5, 500));
        let b1 = g.add_node(Point::new(5, 0));
        g.node_mut(b0).distance_to_boundary = 0;
        g.node_mut(b1).distance_to_boundary = 0;
        g.node_mut(m0).distance_to_boundary = 500;
        g.node_mut(m1).distance_to_boundary = 500;

        let up = g.add_edge(b0, m0, EdgeKind::Extra);
        let mid = g.add_edge(m0, m1, EdgeKind::Normal);
        let down = g.add_edge(m1, b1, EdgeKind::Extra);
        g.edge_mut(up).next = Some(mid);
        g.edge_mut(mid).prev = Some(up);
        g.edge_mut(mid).next = Some(down);
        g.edge_mut(down).prev = Some(mid);
        for n in [b0, m0, m1, b1] {
            g.node_mut(n).incident_edge = None;
        }
        g.node_mut(b0).incident_edge = Some(up);
        g.repair_missing_twins();

        g.collapse_small_edges(20);
        assert!(g.edge(mid).dead);
        assert!(g.node(m1).dead);
        // The down rib now starts at the surviving node.
        assert_eq!(g.edge(down).from, m0);
        assert_eq!(g.edge(up).next, Some(down));
        assert_eq!(g.edge(down).prev, Some(up));
    }
}
