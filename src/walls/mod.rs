//! Wall toolpath orchestration.
//!
//! [`WallToolPaths`] prepares the input outline, dispatches to either the
//! beading engine or the simple-offset fallback depending on the strategy
//! scope, and post-processes the resulting toolpaths: stitching, small
//! line removal, simplification, and inner-contour extraction.

pub mod seam;

use crate::beading::{make_fixed_outer_strategy, make_strategy, StrategyParams};
use crate::clipper::{self, OffsetJoinType};
use crate::extrusion::{stitch, ExtrusionJunction, ExtrusionLine, VariableWidthLines};
use crate::geometry::simplify::{simplify_shape, SimplifyConfig};
use crate::geometry::Shape;
use crate::settings::{BeadingStrategyScope, SectionType, WallSettings};
use crate::skeletal::SkeletalTrapezoidation;
use crate::{Coord, CoordF};

/// Step size for discretizing curved and narrowing skeleton edges (0.8mm).
const DISCRETIZATION_STEP_SIZE: Coord = 800;

/// Angle below which adjacent outline edges count as collinear (radians).
const COLLINEAR_EDGE_ANGLE: f64 = 0.005;

/// Generator for the variable-width walls of one region on one layer.
pub struct WallToolPaths<'a> {
    outline: Shape,
    bead_width_0: Coord,
    bead_width_x: Coord,
    inset_count: usize,
    wall_0_inset: Coord,
    print_thin_walls: bool,
    min_feature_size: Coord,
    min_bead_width: Coord,
    /// Side length (mm) under which outline slivers are discarded.
    small_area_length: CoordF,
    settings: &'a WallSettings,
    layer_idx: i32,
    layer_z: Coord,
    section_type: SectionType,
    toolpaths: Vec<VariableWidthLines>,
    inner_contour: Shape,
    toolpaths_generated: bool,
}

impl<'a> WallToolPaths<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        outline: &Shape,
        bead_width_0: Coord,
        bead_width_x: Coord,
        inset_count: usize,
        wall_0_inset: Coord,
        settings: &'a WallSettings,
        layer_idx: i32,
        section_type: SectionType,
        layer_z: Coord,
    ) -> Self {
        Self {
            outline: outline.clone(),
            bead_width_0,
            bead_width_x,
            inset_count,
            wall_0_inset,
            print_thin_walls: settings.fill_outline_gaps,
            min_feature_size: settings.min_feature_size,
            min_bead_width: settings.min_bead_width,
            small_area_length: crate::unscale(bead_width_0 / 2),
            settings,
            layer_idx,
            layer_z,
            section_type,
            toolpaths: Vec::new(),
            inner_contour: Shape::new(),
            toolpaths_generated: false,
        }
    }

    /// Generate the wall toolpaths. Idempotent; the result is cached.
    pub fn generate(&mut self) -> &[VariableWidthLines] {
        if self.toolpaths_generated {
            return &self.toolpaths;
        }
        self.toolpaths_generated = true;

        let prepared_outline = self.prepare_outline();
        if prepared_outline.is_empty() || prepared_outline.area() <= 0.0 {
            self.toolpaths.clear();
            self.inner_contour.clear();
            return &self.toolpaths;
        }
        if self.inset_count == 0 {
            self.toolpaths.clear();
            self.inner_contour = prepared_outline;
            return &self.toolpaths;
        }

        // Repair a too-small minimum bead width; below 40% of the nominal
        // width the strategy math becomes unstable.
        let stability_minimum =
            ((self.bead_width_0.max(self.bead_width_x)) as f64 * 0.4).round() as Coord;
        let safe_min_bead_width = self.min_bead_width.max(100).max(stability_minimum);
        if self.print_thin_walls && safe_min_bead_width != self.min_bead_width {
            log::warn!(
                "min_bead_width raised from {} to {} um to keep the beading stable.",
                self.min_bead_width,
                safe_min_bead_width
            );
        }

        let use_beading = match self.settings.beading_strategy_scope {
            BeadingStrategyScope::Off => false,
            BeadingStrategyScope::OnlySkin => self.section_type == SectionType::Skin,
            BeadingStrategyScope::InnerWallSkin => {
                self.section_type == SectionType::Skin || self.inset_count > 1
            }
            BeadingStrategyScope::All => true,
        };
        if !use_beading {
            log::debug!("Using fixed-width concentric offsets for this section.");
            self.generate_simple_walls(&prepared_outline);
            return &self.toolpaths;
        }

        // When to split the middle wall in two, and when to add a new wall
        // in between the innermost two, as fractions of the nominal width.
        let w0 = self.settings.wall_line_width_0 as f64;
        let wx = self.settings.wall_line_width_x as f64;
        let wall_split_middle_threshold = (100.0
            * (2.0 * self.settings.min_even_wall_line_width as f64 - w0)
            / w0)
            .clamp(1.0, 99.0)
            / 100.0;
        let wall_add_middle_threshold =
            (100.0 * self.settings.min_odd_wall_line_width as f64 / wx).clamp(1.0, 99.0) / 100.0;

        let max_bead_count = (self.inset_count as i64).saturating_mul(2);
        let params = StrategyParams {
            bead_width_0: self.bead_width_0,
            bead_width_x: self.bead_width_x,
            transition_length: self.settings.wall_transition_length,
            transitioning_angle: self.settings.wall_transition_angle,
            print_thin_walls: self.print_thin_walls,
            min_bead_width: safe_min_bead_width,
            min_feature_size: self.min_feature_size,
            split_middle_threshold: wall_split_middle_threshold,
            add_middle_threshold: wall_add_middle_threshold,
            max_bead_count,
            outer_wall_offset: self.wall_0_inset,
            distribution_count: self.settings.wall_distribution_count,
            minimum_variable_line_ratio: 0.5,
            flow_stable_width: self.settings.flow_compensation_stable_width,
            max_flow_compensation_ratio: 0.25,
        };
        let strategy =
            if self.settings.beading_strategy_scope == BeadingStrategyScope::InnerWallSkin {
                make_fixed_outer_strategy(&params)
            } else {
                make_strategy(&params)
            };
        log::debug!("Beading strategy stack: {}", strategy.name());

        match SkeletalTrapezoidation::new(
            &prepared_outline,
            &strategy,
            strategy.transitioning_angle(),
            DISCRETIZATION_STEP_SIZE,
            self.settings.wall_transition_filter_distance,
            self.settings.wall_transition_filter_deviation,
            self.settings.wall_transition_length,
        ) {
            Ok(mut wall_maker) => {
                self.toolpaths = wall_maker.generate_toolpaths(false);
            }
            Err(err) => {
                log::error!("Wall generation degraded to empty output: {err}");
                self.toolpaths.clear();
                self.inner_contour.clear();
                return &self.toolpaths;
            }
        }

        stitch_toolpaths(&mut self.toolpaths, self.settings);
        remove_small_fill_lines(&mut self.toolpaths);
        simplify_toolpaths(&mut self.toolpaths, self.settings);
        self.separate_out_inner_contour(&prepared_outline);
        remove_empty_toolpaths(&mut self.toolpaths);
        debug_assert!(self
            .toolpaths
            .windows(2)
            .all(|w| w[0][0].inset_idx < w[1][0].inset_idx));
        &self.toolpaths
    }

    /// The generated toolpaths, generating them first if needed.
    pub fn toolpaths(&mut self) -> &[VariableWidthLines] {
        if !self.toolpaths_generated {
            self.generate();
        }
        &self.toolpaths
    }

    /// The region left inside the walls. With no walls requested this is
    /// the original outline.
    pub fn inner_contour(&mut self) -> &Shape {
        if self.inset_count == 0 {
            return &self.outline;
        }
        if !self.toolpaths_generated {
            self.generate();
        }
        &self.inner_contour
    }

    // =====================================================================
    //    PREPROCESSING
    // =====================================================================

    /// Clean the outline for skeletal consumption: no slivers, no
    /// self-intersections, no degenerate or near-collinear vertices, and
    /// consistent winding.
    fn prepare_outline(&self) -> Shape {
        // An open-close with half the minimum printable width removes
        // slivers that can't be printed anyhow without degrading the rest
        // of the outline.
        let open_close_distance = if self.print_thin_walls {
            self.min_feature_size / 2 - 5
        } else {
            self.min_bead_width / 2 - 5
        }
        .max(0);

        let mut prepared =
            clipper::open_close(&self.outline, open_close_distance, OffsetJoinType::Miter);
        prepared.remove_small_areas(self.small_area_length * self.small_area_length);

        let simplify_config = SimplifyConfig::new(
            self.settings.meshfix_maximum_resolution,
            self.settings.meshfix_maximum_deviation,
        );
        prepared = simplify_shape(&prepared, &simplify_config);

        if self.settings.meshfix_fluid_motion_enabled && self.section_type != SectionType::Support
        {
            // Smooth out small wobbles that would otherwise wiggle the
            // medial axis. Support walls don't need the cosmetics.
            let smooth_config = SimplifyConfig::new(500, self.settings.meshfix_maximum_deviation);
            prepared = simplify_shape(&prepared, &smooth_config);
        }

        // Union resolves self-intersections and overlaps; removing
        // collinear edges may introduce new ones, so fix twice.
        prepared = clipper::union_self(&prepared);
        prepared.remove_degenerate_verts();
        prepared.remove_collinear_edges(COLLINEAR_EDGE_ANGLE);
        prepared = clipper::union_self(&prepared);
        prepared.remove_degenerate_verts();
        prepared = simplify_shape(&prepared, &simplify_config);

        if prepared.area() <= 0.0 {
            return Shape::new();
        }
        let mut prepared = prepared.process_even_odd();

        if self.settings.draw_z_seam_enable && self.settings.z_seam_point_interpolation {
            let layer_z = self.effective_layer_z();
            if let Some(target) = seam::interpolated_seam_position(self.settings, layer_z) {
                let processed = prepared
                    .iter()
                    .map(|polygon| seam::insert_seam_point(polygon, target))
                    .collect();
                prepared = processed;
            }
        }

        prepared
    }

    fn effective_layer_z(&self) -> Coord {
        if self.layer_z >= 0 {
            // The caller passed a real z; supports variable layer heights.
            self.layer_z
        } else {
            self.layer_idx as Coord * self.settings.layer_height
        }
    }

    // =====================================================================
    //    SIMPLE OFFSET FALLBACK
    // =====================================================================

    /// Fixed-width concentric walls: each wall is the region offset inward
    /// by half a line width, and the region shrinks by a full line width
    /// per wall.
    fn generate_simple_walls(&mut self, outline: &Shape) {
        self.toolpaths.clear();
        self.toolpaths.resize(self.inset_count, Vec::new());

        let mut current_outline = outline.clone();
        for wall_idx in 0..self.inset_count {
            if current_outline.is_empty() {
                break;
            }
            let line_width = if wall_idx == 0 {
                self.bead_width_0
            } else {
                self.bead_width_x
            };
            let mut offset_distance = line_width / 2;
            if wall_idx == 0 && self.wall_0_inset > 0 {
                offset_distance += self.wall_0_inset;
            }

            let centerlines =
                clipper::offset(&current_outline, -offset_distance, OffsetJoinType::Miter);
            for polygon in centerlines.iter() {
                if polygon.len() < 3 {
                    continue;
                }
                let polygon = if wall_idx == 0
                    && self.settings.draw_z_seam_enable
                    && self.settings.z_seam_point_interpolation
                {
                    match seam::interpolated_seam_position(self.settings, self.effective_layer_z())
                    {
                        Some(target) => seam::insert_seam_point(polygon, target),
                        None => polygon.clone(),
                    }
                } else {
                    polygon.clone()
                };

                let mut wall_line = ExtrusionLine::new(wall_idx, false);
                for &p in polygon.points() {
                    wall_line
                        .junctions
                        .push(ExtrusionJunction::new(p, line_width, wall_idx));
                }
                if let Some(&first) = wall_line.junctions.first() {
                    wall_line.junctions.push(first);
                }
                wall_line.is_closed = true;
                if !wall_line.junctions.is_empty() {
                    self.toolpaths[wall_idx].push(wall_line);
                }
            }

            current_outline = clipper::offset(&current_outline, -line_width, OffsetJoinType::Miter);
        }

        self.inner_contour = current_outline;
        remove_empty_toolpaths(&mut self.toolpaths);
    }

    // =====================================================================
    //    INNER CONTOUR SEPARATION
    // =====================================================================

    /// Zero-width buckets delimit the filled wall band rather than being
    /// printed; their closed even lines become the inner contour.
    fn separate_out_inner_contour(&mut self, prepared_outline: &Shape) {
        let mut actual_toolpaths: Vec<VariableWidthLines> = Vec::new();
        self.inner_contour.clear();
        for inset in &self.toolpaths {
            if inset.is_empty() {
                continue;
            }
            let is_contour = inset[0]
                .junctions
                .first()
                .map(|j| j.w == 0)
                .unwrap_or(false);
            if is_contour {
                debug_assert!(
                    inset
                        .iter()
                        .all(|line| line.junctions.first().map(|j| j.w == 0).unwrap_or(true)),
                    "mixed zero-width bucket"
                );
                for line in inset {
                    if line.is_odd {
                        continue; // Odd lines don't contribute to the contour.
                    }
                    if line.is_closed {
                        self.inner_contour.push(line.to_polygon());
                    }
                }
            } else {
                actual_toolpaths.push(inset.clone());
            }
        }
        self.toolpaths = actual_toolpaths;

        if self.toolpaths.iter().all(|inset| inset.is_empty()) && self.inner_contour.is_empty() {
            // Nothing printable fits; the whole region stays available.
            self.inner_contour = prepared_outline.clone();
            return;
        }

        // The walls out of the skeletal trapezoidation have no known
        // winding order. The even-odd rule re-derives the correct inside
        // regardless of winding; self-intersecting contours are never
        // generated, for which the rule would be incorrect.
        self.inner_contour = self.inner_contour.process_even_odd();
    }
}

// =========================================================================
//    POST-PROCESSING PASSES
// =========================================================================

/// Stitch the raw segments of every inset into polylines and loops. In
/// 0-width contours, junctions can cause gaps of up to one line width, so
/// stitching reaches just under one line width.
pub fn stitch_toolpaths(toolpaths: &mut [VariableWidthLines], settings: &WallSettings) {
    let stitch_distance = settings.wall_line_width_x - 1;
    for wall_lines in toolpaths.iter_mut() {
        let lines = std::mem::take(wall_lines);
        let (mut open, closed) = stitch(lines, stitch_distance);
        for mut polygon in closed {
            if polygon.junctions.is_empty() {
                continue;
            }
            polygon.is_closed = true;
            open.push(polygon);
        }
        *wall_lines = open;
    }
}

/// Drop negligible odd open lines; the outer wall is exempt because even a
/// tiny outer line affects the surface.
pub fn remove_small_fill_lines(toolpaths: &mut [VariableWidthLines]) {
    for inset in toolpaths.iter_mut() {
        inset.retain(|line| {
            if line.is_outer_wall() {
                return true;
            }
            let min_width = line.min_width();
            !(line.is_odd && !line.is_closed && line.shorter_than(min_width / 2))
        });
    }
}

/// Simplify every line with its closed flag, re-closing rings that
/// simplification opened.
pub fn simplify_toolpaths(toolpaths: &mut [VariableWidthLines], settings: &WallSettings) {
    let config = SimplifyConfig::new(
        settings.meshfix_maximum_resolution,
        settings.meshfix_maximum_deviation,
    );
    for inset in toolpaths.iter_mut() {
        *inset = inset
            .iter()
            .map(|line| line.simplify(&config))
            .filter(|line| !line.is_empty())
            .collect();
    }
}

/// Remove empty lines, then empty buckets.
pub fn remove_empty_toolpaths(toolpaths: &mut Vec<VariableWidthLines>) {
    for inset in toolpaths.iter_mut() {
        inset.retain(|line| !line.junctions.is_empty());
    }
    toolpaths.retain(|inset| !inset.is_empty());
}

/// Caller-side pre-filter: drop parts below the configured circumference
/// and area thresholds before wall generation.
pub fn filter_small_parts(outline: &Shape, settings: &WallSettings) -> Shape {
    if settings.minimum_polygon_circumference <= 0 && settings.minimum_polygon_area <= 0.0 {
        return outline.clone();
    }
    outline.filter_parts(
        settings.minimum_polygon_circumference,
        settings.minimum_polygon_area,
    )
}

/// Generate walls for one region: the main entry point of the library.
///
/// Returns the toolpaths bucketed by inset index (ascending) and the inner
/// contour left for infill.
#[allow(clippy::too_many_arguments)]
pub fn generate_walls(
    outline: &Shape,
    bead_width_0: Coord,
    bead_width_x: Coord,
    inset_count: usize,
    wall_0_inset: Coord,
    settings: &WallSettings,
    layer_idx: i32,
    section_type: SectionType,
    layer_z: Coord,
) -> (Vec<VariableWidthLines>, Shape) {
    let mut wall_tool_paths = WallToolPaths::new(
        outline,
        bead_width_0,
        bead_width_x,
        inset_count,
        wall_0_inset,
        settings,
        layer_idx,
        section_type,
        layer_z,
    );
    wall_tool_paths.generate();
    let inner_contour = wall_tool_paths.inner_contour().clone();
    let toolpaths = wall_tool_paths.toolpaths().to_vec();
    (toolpaths, inner_contour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};

    fn square_shape(side: Coord) -> Shape {
        Shape::from_polygons(vec![Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(side, 0),
            Point::new(side, side),
            Point::new(0, side),
        ])])
    }

    fn rect_shape(w: Coord, h: Coord) -> Shape {
        Shape::from_polygons(vec![Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(w, 0),
            Point::new(w, h),
            Point::new(0, h),
        ])])
    }

    fn base_settings() -> WallSettings {
        WallSettings {
            beading_strategy_scope: BeadingStrategyScope::All,
            ..Default::default()
        }
    }

    fn all_lines(toolpaths: &[VariableWidthLines]) -> impl Iterator<Item = &ExtrusionLine> {
        toolpaths.iter().flatten()
    }

    /// 10x10mm square, two 400um walls: insets at 200 and 600um, and an
    /// 8.4mm inner square left over.
    #[test]
    fn test_square_two_walls_beading() {
        let settings = base_settings();
        let (toolpaths, inner_contour) = generate_walls(
            &square_shape(10_000),
            400,
            400,
            2,
            0,
            &settings,
            10,
            SectionType::Wall,
            -1,
        );

        assert_eq!(toolpaths.len(), 2, "expected exactly two inset buckets");
        for (bucket_idx, bucket) in toolpaths.iter().enumerate() {
            assert!(!bucket.is_empty());
            for line in bucket {
                assert_eq!(line.inset_idx, bucket_idx);
                for junction in &line.junctions {
                    assert_eq!(junction.perimeter_index, bucket_idx);
                    assert!(
                        (junction.w - 400).abs() <= 1,
                        "junction width {} should be the nominal 400",
                        junction.w
                    );
                }
            }
        }

        // The walls cover 2 * 400um per side around an 8.4mm square.
        assert!(
            (inner_contour.area_mm2() - 8.4 * 8.4).abs() < 1.0,
            "inner contour area was {}",
            inner_contour.area_mm2()
        );
    }

    /// Same square with the beading engine off: the simple-offset path
    /// must produce geometrically equivalent walls of constant width.
    #[test]
    fn test_square_two_walls_simple_offsets() {
        let settings = WallSettings {
            beading_strategy_scope: BeadingStrategyScope::Off,
            ..Default::default()
        };
        let (toolpaths, inner_contour) = generate_walls(
            &square_shape(10_000),
            400,
            400,
            2,
            0,
            &settings,
            10,
            SectionType::Wall,
            -1,
        );

        assert_eq!(toolpaths.len(), 2);
        for line in all_lines(&toolpaths) {
            assert!(line.is_closed);
            assert_eq!(line.front().map(|j| j.p), line.back().map(|j| j.p));
            for junction in &line.junctions {
                assert_eq!(junction.w, 400);
            }
        }
        // Outer wall centerline sits 200um inside the outline.
        let outer = &toolpaths[0][0];
        for junction in &outer.junctions {
            let p = junction.p;
            let dist_to_edge = [p.x, p.y, 10_000 - p.x, 10_000 - p.y]
                .into_iter()
                .min()
                .unwrap();
            assert!(
                (dist_to_edge - 200).abs() <= 25,
                "outer centerline at {} from the boundary",
                dist_to_edge
            );
        }
        assert!((inner_contour.area_mm2() - 8.4 * 8.4).abs() < 1.0);
    }

    /// A 10 x 0.6mm strip with thin-wall printing: one odd centerline
    /// along the long axis and nothing left inside.
    #[test]
    fn test_thin_strip_single_odd_wall() {
        let settings = WallSettings {
            beading_strategy_scope: BeadingStrategyScope::All,
            fill_outline_gaps: true,
            min_bead_width: 300,
            min_feature_size: 100,
            ..Default::default()
        };
        let (toolpaths, inner_contour) = generate_walls(
            &rect_shape(10_000, 600),
            400,
            400,
            2,
            0,
            &settings,
            10,
            SectionType::Wall,
            -1,
        );

        assert!(!toolpaths.is_empty(), "the thin wall must be printed");
        let lines: Vec<&ExtrusionLine> = all_lines(&toolpaths).collect();
        assert!(lines.iter().any(|line| line.is_odd));
        for line in &lines {
            for junction in &line.junctions {
                // A single bead fills the full 600um thickness away from
                // the strip ends.
                assert!(junction.w <= 800, "width {} exceeds twice nominal", junction.w);
            }
        }
        assert!(inner_contour.is_empty() || inner_contour.area_mm2() < 0.1);
    }

    /// Rectangle with two triangular features and five walls: five real
    /// inset buckets, none empty, everything consistently indexed.
    #[test]
    fn test_five_wall_buckets() {
        let mut shape = square_shape(5_000);
        shape.push(Polygon::from_points(vec![
            Point::new(6_000, 9_000),
            Point::new(9_000, 7_500),
            Point::new(6_000, 6_000),
        ]));
        let settings = base_settings();
        let (toolpaths, _) = generate_walls(
            &shape,
            400,
            400,
            5,
            0,
            &settings,
            100,
            SectionType::Wall,
            -1,
        );

        assert_eq!(toolpaths.len(), 5, "expected exactly five inset buckets");
        for (bucket_idx, bucket) in toolpaths.iter().enumerate() {
            assert!(!bucket.is_empty(), "bucket {} is empty", bucket_idx);
            for line in bucket {
                assert!(!line.junctions.is_empty());
                assert_eq!(line.inset_idx, bucket_idx);
            }
        }
    }

    /// Caller-side pre-filter: a 1mm square (4mm circumference) is dropped
    /// before wall generation; the big part keeps its walls.
    #[test]
    fn test_small_part_prefilter() {
        let mut shape = square_shape(20_000);
        shape.push(Polygon::from_points(vec![
            Point::new(30_000, 0),
            Point::new(31_000, 0),
            Point::new(31_000, 1_000),
            Point::new(30_000, 1_000),
        ]));
        let settings = WallSettings {
            minimum_polygon_circumference: 5_000,
            ..base_settings()
        };
        let filtered = filter_small_parts(&shape, &settings);
        assert_eq!(filtered.len(), 1);

        let (toolpaths, _) = generate_walls(
            &filtered,
            400,
            400,
            2,
            0,
            &settings,
            0,
            SectionType::Wall,
            -1,
        );
        for line in all_lines(&toolpaths) {
            assert!(
                line.length() >= 5_000,
                "line of length {} survived the pre-filter",
                line.length()
            );
        }
    }

    /// No walls requested: empty toolpaths, the inner contour is the
    /// unmodified outline.
    #[test]
    fn test_zero_inset_count() {
        let outline = square_shape(10_000);
        let settings = base_settings();
        let (toolpaths, inner_contour) = generate_walls(
            &outline,
            400,
            400,
            0,
            0,
            &settings,
            0,
            SectionType::Wall,
            -1,
        );
        assert!(toolpaths.is_empty());
        assert_eq!(inner_contour, outline);
    }

    /// Degenerate input: no outline, no output.
    #[test]
    fn test_empty_outline() {
        let settings = base_settings();
        let (toolpaths, inner_contour) = generate_walls(
            &Shape::new(),
            400,
            400,
            2,
            0,
            &settings,
            0,
            SectionType::Wall,
            -1,
        );
        assert!(toolpaths.is_empty());
        assert!(inner_contour.is_empty());
    }

    /// A feature thinner than the minimum feature size without thin-wall
    /// printing produces no toolpaths, and the region stays available.
    #[test]
    fn test_unprintable_thin_feature() {
        let settings = WallSettings {
            beading_strategy_scope: BeadingStrategyScope::All,
            fill_outline_gaps: false,
            min_bead_width: 300,
            min_feature_size: 300,
            ..Default::default()
        };
        let (toolpaths, _) = generate_walls(
            &rect_shape(10_000, 200),
            400,
            400,
            2,
            0,
            &settings,
            0,
            SectionType::Wall,
            -1,
        );
        assert!(
            all_lines(&toolpaths).next().is_none(),
            "an unprintable feature must not produce walls"
        );
    }

    /// An annulus keeps both rings through the simple-offset path, with
    /// even-odd winding on the inner contour.
    #[test]
    fn test_annulus_simple_offsets() {
        let shape = Shape::from_polygons(vec![
            Polygon::from_points(vec![
                Point::new(0, 0),
                Point::new(20_000, 0),
                Point::new(20_000, 20_000),
                Point::new(0, 20_000),
            ]),
            Polygon::from_points(vec![
                Point::new(5_000, 5_000),
                Point::new(15_000, 5_000),
                Point::new(15_000, 15_000),
                Point::new(5_000, 15_000),
            ]),
        ]);
        let settings = WallSettings {
            beading_strategy_scope: BeadingStrategyScope::Off,
            ..Default::default()
        };
        let (toolpaths, inner_contour) = generate_walls(
            &shape,
            400,
            400,
            1,
            0,
            &settings,
            0,
            SectionType::Wall,
            -1,
        );

        // One wall, two rings (outer contour + hole).
        assert_eq!(toolpaths.len(), 1);
        assert_eq!(toolpaths[0].len(), 2);

        // Inner contour: the annulus shrunk by a full line width on both
        // sides: (20 - 0.8)^2 - (10 + 0.8)^2.
        let expected = 19.2 * 19.2 - 10.8 * 10.8;
        assert!(
            (inner_contour.area_mm2() - expected).abs() < 1.5,
            "annulus inner contour area was {}",
            inner_contour.area_mm2()
        );
        // Winding: outer ring positive, hole negative.
        assert_eq!(inner_contour.len(), 2);
        let areas: Vec<f64> = inner_contour.iter().map(|p| p.signed_area()).collect();
        assert!(areas.iter().any(|&a| a > 0.0));
        assert!(areas.iter().any(|&a| a < 0.0));
    }

    /// Preprocessing twice produces identical polygons.
    #[test]
    fn test_preprocessing_idempotent() {
        let settings = base_settings();
        let wtp = WallToolPaths::new(
            &square_shape(10_000),
            400,
            400,
            2,
            0,
            &settings,
            0,
            SectionType::Wall,
            -1,
        );
        let once = wtp.prepare_outline();
        let wtp2 = WallToolPaths::new(
            &once, 400, 400, 2, 0, &settings, 0, SectionType::Wall, -1,
        );
        let twice = wtp2.prepare_outline();
        assert_eq!(once, twice);
    }

    /// Z-seam interpolation points are inserted into the outer wall on the
    /// simple-offset path.
    #[test]
    fn test_seam_point_inserted_in_outer_wall() {
        let settings = WallSettings {
            beading_strategy_scope: BeadingStrategyScope::Off,
            draw_z_seam_enable: true,
            z_seam_point_interpolation: true,
            draw_z_seam_grow: false,
            draw_z_seam_points: vec![
                crate::settings::SeamPoint::new(5_000, -1_000, 0),
                crate::settings::SeamPoint::new(5_000, -1_000, 100_000),
            ],
            ..Default::default()
        };
        let (toolpaths, _) = generate_walls(
            &square_shape(10_000),
            400,
            400,
            1,
            0,
            &settings,
            5,
            SectionType::Wall,
            1_000,
        );
        let outer = &toolpaths[0][0];
        // The seam target projects onto the bottom edge of the outer wall
        // centerline at (5000, 200).
        assert!(
            outer
                .junctions
                .iter()
                .any(|j| (j.p - Point::new(5_000, 200)).shorter_than(30)),
            "no junction near the interpolated seam target"
        );
    }
}
