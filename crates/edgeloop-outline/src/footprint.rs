//! Footprint-level reconstruction, including outlines that do not close.
//!
//! A footprint's edge-cuts drawing is often only a partial boundary: a
//! single line marking where a connector overhangs the board edge, say.
//! When the edges do close, the copper decides whether the ring is the
//! board edge (all pads inside) or a cutout (some pad outside). When they
//! do not, a single open segment is extended across the footprint's
//! bounding box, cutting it in two, and the half that contains the pads is
//! kept.

use geo::line_measures::Distance;
use geo::{BooleanOps, Euclidean, Line};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::board::{Board, BoardItem};
use crate::chain::Chain;
use crate::diagnostics::OutlineDiagnostics;
use crate::outline::{OutlineBuild, convert_outline_to_polygon};
use crate::proximity::close_enough;
use crate::types::{BoundingBox, Contour, OutlineConfig, OutlineError, Point, PolygonWithHoles};

/// A conductive region of a footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    /// Pad anchor, used in log output.
    pub position: Point,
    /// Copper area in board coordinates.
    pub polygon: Contour,
}

impl Pad {
    /// Axis-aligned rectangular pad centred on `position`.
    #[must_use]
    pub fn rect(position: Point, width: f64, height: f64) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            position,
            polygon: Contour::new(vec![
                position.offset(-hw, -hh),
                position.offset(hw, -hh),
                position.offset(hw, hh),
                position.offset(-hw, hh),
            ]),
        }
    }
}

/// A placed footprint: its pads and graphic items, all in board
/// coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Reference designator.
    pub reference: String,
    /// Conductive regions.
    #[serde(default)]
    pub pads: Vec<Pad>,
    /// Graphic items on any layer.
    #[serde(default)]
    pub items: Vec<BoardItem>,
}

impl Footprint {
    /// Area covered by the pads.
    #[must_use]
    pub fn pads_bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.pads
                .iter()
                .flat_map(|pad| pad.polygon.points().iter().copied()),
        )
    }
}

/// Which path footprint reconstruction took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FootprintResolution {
    /// The edges closed and every pad lies inside: used as is.
    ClosedOutline,
    /// The edges closed but a pad lies outside: the rings became holes in
    /// the bounding box.
    ClosedOutlineAsHole,
    /// No usable edges: the bounding box.
    BoundingBox,
    /// One open segment cut the bounding box and the copper picked a half.
    SplitBoundingBox,
    /// The open chain has several segments; the bounding box is used.
    MultiSegmentBoundingBox,
}

/// Result of footprint outline reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintOutline {
    /// The resolved outline.
    pub polygon: PolygonWithHoles,
    /// How it was resolved.
    pub resolution: FootprintResolution,
    /// `true` when the closed edge rings cross each other. Only a closed
    /// outline is scanned, so the fallback resolutions never set it.
    pub self_intersecting: bool,
    /// Problem points and messages.
    pub diagnostics: OutlineDiagnostics,
}

impl FootprintOutline {
    /// `true` when the polygon came from the drawn edges rather than a
    /// plain bounding box.
    #[must_use]
    pub const fn is_reconstructed(&self) -> bool {
        matches!(
            self.resolution,
            FootprintResolution::ClosedOutline
                | FootprintResolution::ClosedOutlineAsHole
                | FootprintResolution::SplitBoundingBox
        )
    }
}

/// Returns `true` if any pad lies outside `candidate`.
///
/// A pad is outside when its intersection with the candidate is empty.
/// Stops at the first such pad.
#[must_use]
pub fn copper_outside(pads: &[Pad], candidate: &PolygonWithHoles) -> bool {
    let shape = candidate.to_geo();
    for pad in pads {
        let pad_polygon = geo::Polygon::new(pad.polygon.to_line_string(), Vec::new());
        let overlap = shape.intersection(&pad_polygon);
        if overlap.0.is_empty() {
            trace!(x = pad.position.x, y = pad.position.y, "tested pad: outside");
            return true;
        }
        trace!(x = pad.position.x, y = pad.position.y, "tested pad: not outside");
    }
    false
}

/// The dangling segments of an open chain: those with an endpoint that no
/// other segment passes through. At most two are returned, in chain order.
#[must_use]
pub fn find_end_segments(segments: &[(Point, Point)], tolerance: f64) -> Vec<(Point, Point)> {
    let touches = |p: Point, skip: usize| {
        let point = geo::Point::from(geo::Coord::from(p));
        segments.iter().enumerate().any(|(j, &(a, b))| {
            j != skip && Euclidean.distance(&point, &Line::new(a, b)) <= tolerance
        })
    };

    let mut ends = Vec::new();
    for (i, &(a, b)) in segments.iter().enumerate() {
        if touches(a, i) && touches(b, i) {
            continue;
        }
        trace!(
            ax = a.x,
            ay = a.y,
            bx = b.x,
            by = b.y,
            which = if ends.is_empty() { "start" } else { "end" },
            "found dangling segment"
        );
        ends.push((a, b));
        if ends.len() == 2 {
            break;
        }
    }
    ends
}

/// Where the infinite extension of `segment` crosses the axis-aligned
/// `side`, if the crossing lies on the side (within `tolerance`).
#[allow(clippy::float_cmp)]
fn side_hit(segment: (Point, Point), side: (Point, Point), tolerance: f64) -> Option<Point> {
    let (p, q) = segment;
    let (a, b) = side;
    let (dx, dy) = (q.x - p.x, q.y - p.y);

    let hit = if a.x == b.x {
        if dx == 0.0 {
            return None;
        }
        Point::new(a.x, (a.x - p.x).mul_add(dy / dx, p.y))
    } else {
        if dy == 0.0 {
            return None;
        }
        Point::new((a.y - p.y).mul_add(dx / dy, p.x), a.y)
    };

    let within = |v: f64, lo: f64, hi: f64| {
        v >= lo.min(hi) - tolerance && v <= lo.max(hi) + tolerance
    };
    (within(hit.x, a.x, b.x) && within(hit.y, a.y, b.y)).then_some(hit)
}

/// Cut `bbox` in two along the infinite extension of `segment`.
///
/// Returns `None` unless the line crosses exactly two distinct sides. For
/// hits on sides `a < b` at points `A` and `B`, the halves are
/// `A, corners[a+1..=b], B` and `B, corners[b+1..], corners[..=a], A`.
#[must_use]
pub fn split_bounding_box(
    segment: (Point, Point),
    bbox: &BoundingBox,
    tolerance: f64,
) -> Option<[Contour; 2]> {
    let corners = bbox.corners();
    let mut hits: Vec<(usize, Point)> = Vec::new();
    for side in 0..4 {
        let Some(hit) = side_hit(segment, (corners[side], corners[(side + 1) % 4]), tolerance)
        else {
            continue;
        };
        // A line through a corner hits both adjacent sides at one point.
        if hits
            .iter()
            .any(|&(_, earlier)| close_enough(earlier, hit, tolerance + 1e-9))
        {
            continue;
        }
        hits.push((side, hit));
    }

    debug!(sides = ?hits.iter().map(|&(s, _)| s).collect::<Vec<_>>(), "bounding box sides hit");

    let [(a, hit_a), (b, hit_b)] = hits[..] else {
        return None;
    };

    let mut first = vec![hit_a];
    first.extend_from_slice(&corners[a + 1..=b]);
    first.push(hit_b);

    let mut second = vec![hit_b];
    second.extend_from_slice(&corners[b + 1..]);
    second.extend_from_slice(&corners[..=a]);
    second.push(hit_a);

    Some([Contour::new(first), Contour::new(second)])
}

/// The footprint fallback box: everything on the board, grown to a
/// minimum size if degenerate, then grown by the configured margin.
#[must_use]
pub fn footprint_fallback_box(board: &Board, config: &OutlineConfig) -> BoundingBox {
    let mut bbox = board
        .bounding_box(config.max_arc_error)
        .unwrap_or_else(|| BoundingBox::at(Point::new(0.0, 0.0)));
    if bbox.is_degenerate() {
        bbox = bbox.inflate(config.degenerate_inflation, config.degenerate_inflation);
    }
    bbox.inflate(
        bbox.width() * config.footprint_margin_ratio,
        bbox.height() * config.footprint_margin_ratio,
    )
}

/// Build the board outline for a footprint viewed on its own.
///
/// Uses the first footprint on `board` for the copper tests.
///
/// # Errors
///
/// Returns [`OutlineError::InvalidConfig`] if `config` is invalid,
/// [`OutlineError::NoFootprint`] if `board` has no footprint, and
/// [`OutlineError::NoConductiveRegions`] if a copper test is needed but
/// the footprint has no pads.
pub fn build_footprint_outline(
    board: &Board,
    config: &OutlineConfig,
) -> Result<FootprintOutline, OutlineError> {
    config.validate()?;

    let Some(footprint) = board.footprints.first() else {
        debug!("no footprint found on board");
        return Err(OutlineError::NoFootprint);
    };

    let edges = board.edge_primitives();
    let bbox = footprint_fallback_box(board, config);
    let bbox_outline = |resolution, diagnostics| FootprintOutline {
        polygon: PolygonWithHoles::new(bbox.to_contour()),
        resolution,
        self_intersecting: false,
        diagnostics,
    };

    if edges.is_empty() {
        debug!("using footprint bounding box");
        let mut diagnostics = OutlineDiagnostics::default();
        diagnostics.message("no edges found on the edge cuts layer");
        return Ok(bbox_outline(FootprintResolution::BoundingBox, diagnostics));
    }

    let build = match convert_outline_to_polygon(&edges, config) {
        Ok(build) => build,
        Err(err @ OutlineError::UnsupportedPrimitive { .. }) => {
            debug!(%err, "using footprint bounding box");
            let mut diagnostics = OutlineDiagnostics::default();
            diagnostics.summary.primitive_count = edges.len();
            diagnostics.message(err.to_string());
            return Ok(bbox_outline(FootprintResolution::BoundingBox, diagnostics));
        }
        Err(err) => return Err(err),
    };

    if build.complete
        && let Some(polygon) = build.polygon()
    {
        debug!("closed outline found");
        require_pads(footprint)?;

        if copper_outside(&footprint.pads, &polygon) {
            debug!("treating outline as a hole");
            let holes = polygon.rings().cloned().collect();
            return Ok(FootprintOutline {
                polygon: PolygonWithHoles {
                    outline: bbox.to_contour(),
                    holes,
                },
                resolution: FootprintResolution::ClosedOutlineAsHole,
                self_intersecting: build.self_intersecting,
                diagnostics: build.diagnostics,
            });
        }

        debug!("treating outline as board edge");
        return Ok(FootprintOutline {
            polygon,
            resolution: FootprintResolution::ClosedOutline,
            self_intersecting: build.self_intersecting,
            diagnostics: build.diagnostics,
        });
    }

    debug!("trying to build outline from an open chain");
    resolve_open_chain(footprint, build, bbox, config)
}

/// Close an open edge chain against the fallback box.
fn resolve_open_chain(
    footprint: &Footprint,
    build: OutlineBuild,
    bbox: BoundingBox,
    config: &OutlineConfig,
) -> Result<FootprintOutline, OutlineError> {
    let closed: Vec<Contour> = build
        .rings()
        .filter(|ring| ring.closed)
        .map(Chain::to_contour)
        .collect();
    let segments = build
        .rings()
        .find(|ring| !ring.closed)
        .map(Chain::open_segments)
        .unwrap_or_default();
    let mut diagnostics = build.diagnostics;

    let ends = find_end_segments(&segments, config.tolerance);
    debug!(
        segments = segments.len(),
        dangling = ends.len(),
        closed_rings = closed.len(),
        "open chain found"
    );

    let box_only = |resolution, diagnostics| FootprintOutline {
        polygon: PolygonWithHoles::new(bbox.to_contour()),
        resolution,
        self_intersecting: false,
        diagnostics,
    };

    let segment = match segments[..] {
        [] => {
            debug!("no line segments in the open chain");
            return Ok(box_only(FootprintResolution::BoundingBox, diagnostics));
        }
        [segment] => segment,
        _ => {
            debug!("multiple segments in the open chain");
            diagnostics.message(format!(
                "open edge chain of {} segments cannot be closed; using the bounding box",
                segments.len()
            ));
            return Ok(box_only(
                FootprintResolution::MultiSegmentBoundingBox,
                diagnostics,
            ));
        }
    };

    let Some([first, second]) = split_bounding_box(segment, &bbox, config.tolerance) else {
        debug!("open segment does not cut the bounding box");
        return Ok(box_only(FootprintResolution::BoundingBox, diagnostics));
    };

    require_pads(footprint)?;
    let first = PolygonWithHoles::new(first);
    let mut kept = if copper_outside(&footprint.pads, &first) {
        debug!("using second half");
        PolygonWithHoles::new(second)
    } else {
        debug!("using first half");
        first
    };
    kept.holes = closed;

    Ok(FootprintOutline {
        polygon: kept,
        resolution: FootprintResolution::SplitBoundingBox,
        self_intersecting: false,
        diagnostics,
    })
}

fn require_pads(footprint: &Footprint) -> Result<(), OutlineError> {
    if footprint.pads.is_empty() {
        return Err(OutlineError::NoConductiveRegions {
            reference: footprint.reference.clone(),
        });
    }
    Ok(())
}
