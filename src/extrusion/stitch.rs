//! Stitching of extrusion polylines into longer chains and closed loops.
//!
//! The skeletal trapezoidation emits many short open segments per inset.
//! This pass chains segments whose endpoints lie within the stitch distance
//! and closes chains that loop back onto themselves. Even (wall) lines keep
//! their winding and are never reversed; odd single-bead lines may be
//! attached in either direction.

use super::{ExtrusionJunction, ExtrusionLine};
use crate::Coord;

/// Stitch the given lines. Returns `(open_polylines, closed_polygons)`.
/// Closed polygons come back flagged `is_closed` without a duplicated
/// closing junction.
pub fn stitch(
    lines: Vec<ExtrusionLine>,
    stitch_distance: Coord,
) -> (Vec<ExtrusionLine>, Vec<ExtrusionLine>) {
    let mut open_result: Vec<ExtrusionLine> = Vec::new();
    let mut closed_result: Vec<ExtrusionLine> = Vec::new();
    let mut used = vec![false; lines.len()];

    let endpoint_dist = |a: &ExtrusionJunction, b: &ExtrusionJunction| a.p.distance(&b.p);

    for seed_idx in 0..lines.len() {
        if used[seed_idx] || lines[seed_idx].is_empty() {
            used[seed_idx] = true;
            continue;
        }
        used[seed_idx] = true;
        let mut chain = lines[seed_idx].clone();
        if chain.is_closed {
            closed_result.push(chain);
            continue;
        }

        // Greedily extend at the tail, then at the head.
        loop {
            let mut best: Option<(usize, bool, bool, f64)> = None; // (idx, at_tail, reversed, dist)
            let head = *chain.front().unwrap();
            let tail = *chain.back().unwrap();
            for (idx, candidate) in lines.iter().enumerate() {
                if used[idx] || candidate.is_empty() || candidate.is_closed {
                    continue;
                }
                let cand_head = *candidate.front().unwrap();
                let cand_tail = *candidate.back().unwrap();
                let can_reverse = candidate.is_odd;

                let mut consider = |at_tail: bool, reversed: bool, dist: f64| {
                    if dist > stitch_distance as f64 {
                        return;
                    }
                    if best.map(|(_, _, _, d)| dist < d).unwrap_or(true) {
                        best = Some((idx, at_tail, reversed, dist));
                    }
                };

                // Append candidate after our tail.
                consider(true, false, endpoint_dist(&tail, &cand_head));
                if can_reverse {
                    consider(true, true, endpoint_dist(&tail, &cand_tail));
                }
                // Prepend candidate before our head.
                consider(false, false, endpoint_dist(&cand_tail, &head));
                if can_reverse {
                    consider(false, true, endpoint_dist(&cand_head, &head));
                }
            }

            let Some((idx, at_tail, reversed, _)) = best else {
                break;
            };
            used[idx] = true;
            let mut piece = lines[idx].clone();
            if reversed {
                piece.reverse();
            }
            chain.is_odd |= piece.is_odd;
            if at_tail {
                // Drop a coinciding junction at the joint.
                if chain.back().map(|j| j.p) == piece.front().map(|j| j.p) {
                    piece.junctions.remove(0);
                }
                chain.junctions.extend(piece.junctions);
            } else {
                if piece.back().map(|j| j.p) == chain.front().map(|j| j.p) {
                    chain.junctions.remove(0);
                }
                piece.junctions.extend(std::mem::take(&mut chain.junctions));
                chain.junctions = piece.junctions;
            }
        }

        // Close the chain if its ends meet.
        if chain.junctions.len() >= 3 {
            let head = chain.front().unwrap();
            let tail = chain.back().unwrap();
            if head.p == tail.p {
                chain.junctions.pop();
                chain.is_closed = true;
            } else if endpoint_dist(head, tail) <= stitch_distance as f64 {
                chain.is_closed = true;
            }
        }
        if chain.is_closed {
            closed_result.push(chain);
        } else {
            open_result.push(chain);
        }
    }

    (open_result, closed_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn segment(inset: usize, pts: &[(Coord, Coord)]) -> ExtrusionLine {
        let mut line = ExtrusionLine::new(inset, false);
        for &(x, y) in pts {
            line.junctions
                .push(ExtrusionJunction::new(Point::new(x, y), 400, inset));
        }
        line
    }

    #[test]
    fn test_stitch_two_segments_into_loop() {
        let a = segment(0, &[(0, 0), (10_000, 0), (10_000, 10_000)]);
        let b = segment(0, &[(10_000, 10_000), (0, 10_000), (0, 0)]);
        let (open, closed) = stitch(vec![a, b], 399);
        assert!(open.is_empty());
        assert_eq!(closed.len(), 1);
        assert!(closed[0].is_closed);
        assert_eq!(closed[0].junctions.len(), 4);
    }

    #[test]
    fn test_stitch_respects_distance() {
        let a = segment(0, &[(0, 0), (10_000, 0)]);
        let b = segment(0, &[(11_000, 0), (20_000, 0)]); // 1mm gap
        let (open, closed) = stitch(vec![a, b], 399);
        assert_eq!(open.len(), 2);
        assert!(closed.is_empty());
    }

    #[test]
    fn test_stitch_reverses_odd_lines_only() {
        let a = segment(1, &[(0, 0), (10_000, 0)]);
        // Tail-to-tail: can only connect by reversing b.
        let mut b = segment(1, &[(20_000, 0), (10_000, 100)]);
        b.is_odd = true;
        let (open, closed) = stitch(vec![a, b], 399);
        assert!(closed.is_empty());
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].junctions.len(), 4);
        assert_eq!(open[0].back().unwrap().p, Point::new(20_000, 0));

        // Same layout with an even line must not stitch.
        let c = segment(1, &[(0, 0), (10_000, 0)]);
        let d = segment(1, &[(20_000, 0), (10_000, 100)]);
        let (open, _) = stitch(vec![c, d], 399);
        assert_eq!(open.len(), 2);
    }
}
