//! Self-intersection scan over a materialized polygon-with-holes.
//!
//! Every ring edge (outline and holes, closing edges included) goes into
//! an R\*-tree; candidate pairs come from envelope overlap and are then
//! tested exactly. Rules:
//!
//! - An edge drawn twice in the same direction is reported.
//! - An edge drawn twice in opposite directions is a shared boundary and
//!   is not reported.
//! - Other edges that share an endpoint are neighbours and are skipped.
//! - Proper crossings are reported at the crossing point; collinear
//!   overlaps at the overlap's lower-left end.
//!
//! Pairs are visited in ascending edge order so the report is stable.

use geo::Line;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use tracing::debug;

use crate::types::{Contour, Point, PolygonWithHoles};

/// A ring edge tagged with its position in scan order.
type IndexedEdge = GeomWithData<Line<f64>, usize>;

/// Result of a scan, including counts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntersectionScan {
    /// Reported intersection points in edge order.
    pub points: Vec<Point>,
    /// Non-degenerate edges indexed.
    pub segment_count: usize,
    /// Envelope-overlapping pairs tested.
    pub candidate_pairs: usize,
}

/// Find every self-intersection in `polygon`.
#[must_use]
pub fn find_self_intersections(polygon: &PolygonWithHoles) -> Vec<Point> {
    scan(polygon).points
}

/// Run the scan and keep its counts.
#[must_use]
pub fn scan(polygon: &PolygonWithHoles) -> IntersectionScan {
    let edges: Vec<(Point, Point)> = polygon
        .rings()
        .flat_map(Contour::segments)
        .filter(|(a, b)| a != b)
        .collect();

    let entries: Vec<IndexedEdge> = edges
        .iter()
        .enumerate()
        .map(|(i, &(a, b))| GeomWithData::new(Line::new(a, b), i))
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut pairs: Vec<(usize, usize)> = tree
        .intersection_candidates_with_other_tree(&tree)
        .filter_map(|(first, second)| {
            (first.data < second.data).then_some((first.data, second.data))
        })
        .collect();
    pairs.sort_unstable();

    let mut points = Vec::new();
    for &(i, j) in &pairs {
        if let Some(p) = edge_conflict(edges[i], edges[j]) {
            debug!(first = i, second = j, x = p.x, y = p.y, "self-intersection");
            points.push(p);
        }
    }

    IntersectionScan {
        points,
        segment_count: edges.len(),
        candidate_pairs: pairs.len(),
    }
}

/// Decide whether two ring edges conflict, and where.
fn edge_conflict((a1, a2): (Point, Point), (b1, b2): (Point, Point)) -> Option<Point> {
    if a1 == b1 && a2 == b2 {
        return Some(a1);
    }
    if a1 == b2 && a2 == b1 {
        return None;
    }
    if a1 == b1 || a1 == b2 || a2 == b1 || a2 == b2 {
        return None;
    }

    match line_intersection(Line::new(a1, a2), Line::new(b1, b2))? {
        LineIntersection::SinglePoint { intersection, .. } => Some(intersection.into()),
        LineIntersection::Collinear { intersection } => {
            let (start, end): (Point, Point) = (intersection.start.into(), intersection.end.into());
            Some(if (start.x, start.y) <= (end.x, end.y) { start } else { end })
        }
    }
}
