//! Nearest-endpoint search.
//!
//! A linear scan over every primitive except the current one. Exact
//! coordinate matches win immediately; otherwise the primitive owning the
//! nearest endpoint is returned if it lies within tolerance.
//!
//! Ties between equally near endpoints go to the primitive that appears
//! first in the slice, so results depend on input order.

use crate::primitive::{Primitive, PrimitiveId};
use crate::proximity::approx_distance;
use crate::types::Point;

/// Find the primitive whose start or end is nearest `point`.
///
/// `current` and degenerate primitives are excluded from the scan.
/// Already-visited primitives are *not* excluded: the chain walker needs
/// to see them to recognise that a loop has closed.
///
/// Returns `None` when no endpoint lies within `tolerance` (a
/// discontinuity).
#[must_use]
pub fn find_next(
    current: PrimitiveId,
    point: Point,
    primitives: &[Primitive],
    tolerance: f64,
) -> Option<PrimitiveId> {
    let mut best: Option<(PrimitiveId, f64)> = None;

    for (i, primitive) in primitives.iter().enumerate() {
        let id = PrimitiveId(i);
        if id == current || primitive.is_degenerate() {
            continue;
        }

        let (start, end) = primitive.endpoints();
        if point == start || point == end {
            return Some(id);
        }

        for candidate in [start, end] {
            let d = approx_distance(point, candidate);
            if best.is_none_or(|(_, min)| d < min) {
                best = Some((id, d));
            }
        }
    }

    best.filter(|&(_, min)| min <= tolerance).map(|(id, _)| id)
}
