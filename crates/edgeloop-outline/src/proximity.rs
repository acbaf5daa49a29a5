//! Proximity predicates shared by every stitching step.
//!
//! Distances here are Manhattan (sum of absolute coordinate differences),
//! not Euclidean. They are only used for relative ordering and tolerance
//! checks, never for exact geometry.

use crate::types::Point;

/// Approximate distance between two points: `|dx| + |dy|`.
#[must_use]
pub fn approx_distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Returns `true` if `a` and `b` are within `tolerance` of each other.
#[must_use]
pub fn close_enough(a: Point, b: Point, tolerance: f64) -> bool {
    approx_distance(a, b) <= tolerance
}

/// Returns `true` if `first` is at least as close to `reference` as
/// `second` is.
///
/// Ties favour `first`.
#[must_use]
pub fn closer_endpoint(reference: Point, first: Point, second: Point) -> bool {
    approx_distance(reference, first) <= approx_distance(reference, second)
}
