//! Outer/hole orchestration: turn an unordered primitive list into one
//! outline ring plus hole rings.
//!
//! The outline is seeded from the primitive owning the globally leftmost
//! vertex; a point with minimal x cannot lie inside any other closed
//! region, so it must be on the outer perimeter. Every primitive left over
//! after the outline seeds a hole, lowest index first.
//!
//! Rings are always collected even when the outline fails to close, so
//! callers that can work with open chains (the footprint reconstructor)
//! see everything that was walked.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{Chain, ChainEnd, WorkingSet};
use crate::diagnostics::{OutlineDiagnostics, StageDiagnostics, StageMetrics};
use crate::intersect;
use crate::primitive::{Primitive, PrimitiveId};
use crate::types::{Contour, OutlineConfig, OutlineError, PolygonWithHoles};

/// Fewest distinct vertices a closed ring needs to enclose any area.
const MIN_RING_VERTICES: usize = 3;

/// Everything one reconstruction produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineBuild {
    /// The outer ring, or `None` when there were no primitives.
    pub outline: Option<Chain>,
    /// Hole rings in seed order, closed or not.
    pub holes: Vec<Chain>,
    /// `true` when the outline and every hole closed.
    pub complete: bool,
    /// `true` when the self-intersection scan reported anything.
    pub self_intersecting: bool,
    /// The primitive the outline was seeded from.
    pub leftmost_primitive: Option<PrimitiveId>,
    /// Problem points, messages and timings.
    pub diagnostics: OutlineDiagnostics,
}

impl OutlineBuild {
    /// Every ring closed and none of them intersect.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.complete && !self.self_intersecting
    }

    /// The outline with its closed holes.
    ///
    /// Open holes are left out. Returns `None` when there is no outline.
    #[must_use]
    pub fn polygon(&self) -> Option<PolygonWithHoles> {
        let outline = self.outline.as_ref()?;
        Some(PolygonWithHoles {
            outline: outline.to_contour(),
            holes: self.closed_holes(),
        })
    }

    /// The outline followed by every hole.
    pub fn rings(&self) -> impl Iterator<Item = &Chain> {
        self.outline.iter().chain(self.holes.iter())
    }

    /// Closed hole rings as contours.
    #[must_use]
    pub fn closed_holes(&self) -> Vec<Contour> {
        self.holes
            .iter()
            .filter(|h| h.closed)
            .map(Chain::to_contour)
            .collect()
    }
}

/// The primitive whose leftmost vertex has the smallest x coordinate.
///
/// Curved primitives are tessellated to find their true leftmost vertex.
/// Degenerate primitives (zero-length segments, zero-radius circles,
/// empty polygons) are skipped. Ties go to the earlier primitive.
#[must_use]
pub fn leftmost_primitive(primitives: &[Primitive], max_arc_error: f64) -> Option<PrimitiveId> {
    let mut best: Option<(PrimitiveId, f64)> = None;
    for (i, primitive) in primitives.iter().enumerate() {
        if primitive.is_degenerate() {
            continue;
        }
        let Some(vertex) = primitive.leftmost_vertex(max_arc_error) else {
            continue;
        };
        if best.is_none_or(|(_, x)| vertex.x < x) {
            best = Some((PrimitiveId(i), vertex.x));
        }
    }
    best.map(|(id, _)| id)
}

/// Assemble `primitives` into an outline ring and hole rings.
///
/// Discontinuities, already-used matches and self-intersections are not
/// errors; they show up in the returned build and its diagnostics. The
/// self-intersection scan only runs once every ring has closed.
///
/// Degenerate primitives are left out with a message. When nothing else
/// remains the build has no outline, the same as for empty input. A ring
/// that closes on fewer than three distinct vertices counts as open.
///
/// # Errors
///
/// Returns [`OutlineError::InvalidConfig`] if `config` is invalid, or
/// [`OutlineError::UnsupportedPrimitive`] if a chain reaches a circle,
/// rectangle or polygon.
pub fn convert_outline_to_polygon(
    primitives: &[Primitive],
    config: &OutlineConfig,
) -> Result<OutlineBuild, OutlineError> {
    config.validate()?;

    let mut diagnostics = OutlineDiagnostics::default();
    diagnostics.summary.primitive_count = primitives.len();

    let walk_start = Instant::now();
    let mut working = WorkingSet::new(primitives, config);
    for (i, primitive) in primitives.iter().enumerate() {
        if primitive.is_degenerate() {
            working.mark_used(PrimitiveId(i));
            diagnostics.degenerate_primitive(primitive.kind(), primitive.endpoints().0);
        }
    }

    let Some(start) = leftmost_primitive(primitives, config.max_arc_error) else {
        return Ok(OutlineBuild {
            outline: None,
            holes: Vec::new(),
            complete: false,
            self_intersecting: false,
            leftmost_primitive: None,
            diagnostics,
        });
    };
    debug!(
        primitive = start.0,
        kind = %working.primitive(start).kind(),
        "outline start chosen"
    );
    working.mark_used(start);
    let outline = walk_ring(&mut working, start, &mut diagnostics)?;

    let mut holes = Vec::new();
    while let Some(seed) = working.take_seed() {
        holes.push(walk_ring(&mut working, seed, &mut diagnostics)?);
    }

    let complete = outline.closed && holes.iter().all(|h| h.closed);
    let ring_count = 1 + holes.len();
    let vertex_count = outline.len() + holes.iter().map(Chain::len).sum::<usize>();
    diagnostics.walk = Some(StageDiagnostics {
        duration: walk_start.elapsed(),
        metrics: StageMetrics::Walk {
            start_primitive: start.0,
            ring_count,
            closed_ring_count: usize::from(outline.closed)
                + holes.iter().filter(|h| h.closed).count(),
            vertex_count,
        },
    });
    diagnostics.summary.ring_count = ring_count;
    diagnostics.summary.hole_count = holes.len();
    diagnostics.summary.vertex_count = vertex_count;

    let mut build = OutlineBuild {
        outline: Some(outline),
        holes,
        complete,
        self_intersecting: false,
        leftmost_primitive: Some(start),
        diagnostics,
    };

    if complete && let Some(polygon) = build.polygon() {
        let scan_start = Instant::now();
        let scan = intersect::scan(&polygon);
        for &p in &scan.points {
            build.diagnostics.intersection(p);
        }
        build.self_intersecting = !scan.points.is_empty();
        build.diagnostics.intersection_scan = Some(StageDiagnostics {
            duration: scan_start.elapsed(),
            metrics: StageMetrics::IntersectionScan {
                segment_count: scan.segment_count,
                candidate_pairs: scan.candidate_pairs,
                intersection_count: scan.points.len(),
            },
        });
    }

    debug!(
        complete = build.complete,
        self_intersecting = build.self_intersecting,
        holes = build.holes.len(),
        "outline reconstruction finished"
    );
    Ok(build)
}

/// Produce one ring from `seed`, which must already be marked used.
fn walk_ring(
    working: &mut WorkingSet<'_>,
    seed: PrimitiveId,
    diagnostics: &mut OutlineDiagnostics,
) -> Result<Chain, OutlineError> {
    let mut chain = if let Some(ring) = working.closed_ring(seed) {
        debug!(primitive = seed.0, vertices = ring.len(), "closed primitive emitted as ring");
        ring
    } else {
        let (_, end) = working.primitive(seed).endpoints();
        let (chain, how) = working.walk(seed, end)?;
        match how {
            ChainEnd::Closed => {}
            ChainEnd::Overlap { at, .. } => diagnostics.overlap(at),
            ChainEnd::Discontinuity(at) => diagnostics.discontinuity(at),
        }
        chain
    };

    if chain.closed && chain.len() < MIN_RING_VERTICES {
        let at = chain
            .points
            .first()
            .copied()
            .unwrap_or_else(|| working.primitive(seed).endpoints().0);
        diagnostics.degenerate_ring(at, chain.len());
        chain.closed = false;
    }
    Ok(chain)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn rect_segments(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Primitive> {
        vec![
            Primitive::segment(p(x0, y0), p(x1, y0)),
            Primitive::segment(p(x1, y0), p(x1, y1)),
            Primitive::segment(p(x1, y1), p(x0, y1)),
            Primitive::segment(p(x0, y1), p(x0, y0)),
        ]
    }

    // --- leftmost_primitive tests ---

    #[test]
    fn leftmost_picks_minimum_x() {
        let mut prims = rect_segments(5.0, 5.0, 6.0, 6.0);
        prims.extend(rect_segments(0.0, 0.0, 10.0, 10.0));
        // Index 7 is the left side of the big rectangle; index 4 also
        // touches x = 0 and comes first.
        assert_eq!(leftmost_primitive(&prims, 0.01), Some(PrimitiveId(4)));
    }

    #[test]
    fn leftmost_skips_degenerate_circles() {
        let prims = vec![
            Primitive::circle(p(-100.0, 0.0), 0.0),
            Primitive::segment(p(0.0, 0.0), p(1.0, 0.0)),
        ];
        assert_eq!(leftmost_primitive(&prims, 0.01), Some(PrimitiveId(1)));
    }

    #[test]
    fn leftmost_of_nothing_is_none() {
        assert_eq!(leftmost_primitive(&[], 0.01), None);
    }

    // --- convert_outline_to_polygon tests ---

    #[test]
    fn empty_input_is_incomplete_without_outline() {
        let build = convert_outline_to_polygon(&[], &OutlineConfig::default()).unwrap();
        assert!(build.outline.is_none());
        assert!(!build.complete);
        assert!(!build.is_success());
        assert!(build.polygon().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = OutlineConfig {
            max_arc_error: -1.0,
            ..OutlineConfig::default()
        };
        let err = convert_outline_to_polygon(&rect_segments(0.0, 0.0, 1.0, 1.0), &config);
        assert!(matches!(err, Err(OutlineError::InvalidConfig(_))));
    }

    #[test]
    fn closed_primitive_becomes_outline_directly() {
        let prims = vec![Primitive::rect(p(0.0, 0.0), p(4.0, 2.0))];
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        assert!(build.is_success());
        let polygon = build.polygon().unwrap();
        assert_eq!(polygon.outline.len(), 4);
        assert!(polygon.holes.is_empty());
    }

    #[test]
    fn circle_inside_square_becomes_hole() {
        let mut prims = rect_segments(0.0, 0.0, 10.0, 10.0);
        prims.push(Primitive::circle(p(5.0, 5.0), 1.0));
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        assert!(build.is_success(), "{:?}", build.diagnostics.messages);
        assert_eq!(build.holes.len(), 1);
        assert_eq!(build.leftmost_primitive, Some(PrimitiveId(0)));
    }

    #[test]
    fn open_outline_still_collects_holes() {
        let mut prims = rect_segments(0.0, 0.0, 10.0, 10.0);
        prims.remove(1);
        prims.extend(rect_segments(2.0, 2.0, 4.0, 4.0));
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        assert!(!build.complete);
        assert!(!build.outline.as_ref().unwrap().closed);
        assert_eq!(build.holes.iter().filter(|h| h.closed).count(), 1);
        assert!(build.diagnostics.intersection_scan.is_none());
    }

    #[test]
    fn unsupported_kind_mid_chain_is_an_error() {
        let prims = vec![
            Primitive::segment(p(0.0, 0.0), p(10.0, 0.0)),
            Primitive::rect(p(0.0, 0.0), p(5.0, 5.0)),
        ];
        // The segment wins the leftmost tie; walking back to (0, 0) reaches
        // the rectangle's corner.
        let err = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap_err();
        assert!(matches!(err, OutlineError::UnsupportedPrimitive { .. }));
    }

    #[test]
    fn diagnostics_record_walk_and_scan() {
        let prims = rect_segments(0.0, 0.0, 10.0, 10.0);
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        let diag = &build.diagnostics;
        assert_eq!(diag.summary.primitive_count, 4);
        assert_eq!(diag.summary.ring_count, 1);
        assert_eq!(diag.summary.vertex_count, 4);
        assert!(diag.walk.is_some());
        assert!(diag.intersection_scan.is_some());
        assert!(diag.messages.is_empty());
    }

    #[test]
    fn stray_zero_length_segment_is_skipped() {
        let mut prims = rect_segments(0.0, 0.0, 10.0, 10.0);
        prims.push(Primitive::segment(p(20.0, 20.0), p(20.0, 20.0)));
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        assert!(build.is_success(), "{:?}", build.diagnostics.messages);
        assert!(build.holes.is_empty());
        assert_eq!(build.polygon().unwrap().outline.len(), 4);
        assert_eq!(
            build.diagnostics.messages,
            vec!["skipped degenerate segment at (20, 20)".to_string()]
        );
    }

    #[test]
    fn only_degenerate_primitives_leave_no_outline() {
        let prims = vec![
            Primitive::circle(p(5.0, 5.0), 0.0),
            Primitive::segment(p(1.0, 1.0), p(1.0, 1.0)),
        ];
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        assert!(build.outline.is_none());
        assert!(!build.complete);
        assert_eq!(build.leftmost_primitive, None);
        assert_eq!(build.diagnostics.messages.len(), 2);
    }

    #[test]
    fn doubled_back_segments_do_not_close_a_ring() {
        let prims = vec![
            Primitive::segment(p(0.0, 0.0), p(5.0, 0.0)),
            Primitive::segment(p(5.0, 0.0), p(0.0, 0.0)),
        ];
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        let outline = build.outline.as_ref().unwrap();
        assert_eq!(outline.len(), 2);
        assert!(!outline.closed);
        assert!(!build.complete);
        assert!(
            build.diagnostics.messages[0].contains("only 2 distinct vertices"),
            "{:?}",
            build.diagnostics.messages
        );
    }

    #[test]
    fn crossing_hole_flags_self_intersection() {
        let mut prims = rect_segments(0.0, 0.0, 10.0, 10.0);
        prims.extend(rect_segments(8.0, 2.0, 12.0, 6.0));
        let build = convert_outline_to_polygon(&prims, &OutlineConfig::default()).unwrap();
        assert!(build.complete);
        assert!(build.self_intersecting);
        assert!(!build.is_success());
        assert_eq!(build.diagnostics.intersections.len(), 2);
        // Geometry is still returned.
        assert_eq!(build.polygon().unwrap().holes.len(), 1);
    }
}
