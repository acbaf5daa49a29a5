//! Chain walking: stitch primitives end-to-end into one ring.
//!
//! Starting from a seed primitive and one of its endpoints, the walker
//! repeatedly appends the far side of the current primitive (tessellating
//! arcs and bezier curves inline), then moves to the unused primitive
//! whose endpoint is nearest. The walk stops when it returns to the start
//! point, when the nearest primitive has already been used elsewhere, or
//! when nothing lies within tolerance.
//!
//! Visited state lives in a [`WorkingSet`] owned by one reconstruction
//! call; primitives themselves are never mutated.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::primitive::{Primitive, PrimitiveId, Shape};
use crate::proximity::{close_enough, closer_endpoint};
use crate::search::find_next;
use crate::tessellate;
use crate::types::{Contour, OutlineConfig, OutlineError, Point};

/// One walked ring of vertices and whether it closed on itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Chain {
    /// Ordered vertices. For a closed chain the closing edge back to the
    /// first vertex is implicit.
    pub points: Vec<Point>,
    /// `true` if the walk returned to its starting point.
    pub closed: bool,
}

impl Chain {
    /// A closed chain built from a ready-made ring.
    #[must_use]
    pub fn closed(points: impl IntoIterator<Item = Point>) -> Self {
        let mut chain = Self {
            points: Vec::new(),
            closed: true,
        };
        for p in points {
            chain.push(p);
        }
        chain
    }

    /// Append a vertex, collapsing exact consecutive duplicates.
    fn push(&mut self, p: Point) {
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }

    /// Number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the chain has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges between consecutive vertices, without the closing edge.
    #[must_use]
    pub fn open_segments(&self) -> Vec<(Point, Point)> {
        self.points.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// The chain as a contour (closing edge implicit).
    #[must_use]
    pub fn to_contour(&self) -> Contour {
        Contour::new(self.points.clone())
    }
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChainEnd {
    /// The walk returned to its starting point.
    Closed,
    /// The nearest primitive had already been used by another ring.
    Overlap {
        /// Where the walk stopped.
        at: Point,
        /// The already-used primitive that was found.
        with: PrimitiveId,
    },
    /// No primitive lies within tolerance of this point.
    Discontinuity(Point),
}

/// Per-call mutable state: which primitives have been consumed, which are
/// still valid ring seeds, and cached bezier tessellations.
pub struct WorkingSet<'a> {
    primitives: &'a [Primitive],
    config: &'a OutlineConfig,
    visited: Vec<bool>,
    remaining: BTreeSet<PrimitiveId>,
    bezier_cache: Vec<OnceCell<Vec<Point>>>,
}

impl<'a> WorkingSet<'a> {
    /// Start a fresh working set where every primitive is unused.
    #[must_use]
    pub fn new(primitives: &'a [Primitive], config: &'a OutlineConfig) -> Self {
        Self {
            primitives,
            config,
            visited: vec![false; primitives.len()],
            remaining: (0..primitives.len()).map(PrimitiveId).collect(),
            bezier_cache: (0..primitives.len()).map(|_| OnceCell::new()).collect(),
        }
    }

    /// The primitive with the given id.
    #[must_use]
    pub fn primitive(&self, id: PrimitiveId) -> &'a Primitive {
        &self.primitives[id.0]
    }

    /// Returns `true` once `id` has been consumed by some ring.
    #[must_use]
    pub fn is_used(&self, id: PrimitiveId) -> bool {
        self.visited[id.0]
    }

    /// Mark `id` consumed and remove it from the seed candidates.
    pub fn mark_used(&mut self, id: PrimitiveId) {
        self.visited[id.0] = true;
        self.remaining.remove(&id);
    }

    /// Number of primitives not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Take the lowest-numbered unused primitive as the next ring seed.
    pub fn take_seed(&mut self) -> Option<PrimitiveId> {
        let id = self.remaining.pop_first()?;
        self.visited[id.0] = true;
        Some(id)
    }

    /// Cached flattened points of a bezier primitive.
    fn bezier_points(&self, id: PrimitiveId) -> &[Point] {
        self.bezier_cache[id.0].get_or_init(|| {
            self.primitive(id)
                .bezier_points(self.config.max_arc_error)
                .unwrap_or_default()
        })
    }

    /// Emit an inherently closed primitive as a complete ring.
    ///
    /// Returns `None` if the primitive must be stitched instead.
    #[must_use]
    pub fn closed_ring(&self, id: PrimitiveId) -> Option<Chain> {
        self.primitive(id)
            .closed_ring(self.config.max_arc_error)
            .map(Chain::closed)
    }

    /// Walk a ring starting at `start_point` on primitive `start`.
    ///
    /// `start` must already be marked used. `start_point` is the first
    /// vertex of the ring; the walk continues from whichever end of
    /// `start` is farther from it.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::UnsupportedPrimitive`] if the walk reaches
    /// a circle, rectangle or polygon, which cannot be continued through.
    pub fn walk(
        &mut self,
        start: PrimitiveId,
        start_point: Point,
    ) -> Result<(Chain, ChainEnd), OutlineError> {
        let tolerance = self.config.tolerance;
        let mut chain = Chain::default();
        chain.push(start_point);

        let mut current = start;
        let mut prev = start_point;

        let end = loop {
            prev = self.append_far_side(current, prev, &mut chain)?;

            match find_next(current, prev, self.primitives, tolerance) {
                Some(next) if !self.is_used(next) => {
                    trace!(from = current.0, to = next.0, x = prev.x, y = prev.y, "chained");
                    self.mark_used(next);
                    current = next;
                }
                found => {
                    if close_enough(start_point, prev, tolerance) {
                        break ChainEnd::Closed;
                    } else if let Some(with) = found {
                        break ChainEnd::Overlap { at: prev, with };
                    }
                    break ChainEnd::Discontinuity(prev);
                }
            }
        };

        match end {
            ChainEnd::Closed => {
                if chain.len() > 1
                    && let Some(&last) = chain.points.last()
                    && close_enough(last, start_point, tolerance)
                {
                    chain.points.pop();
                }
                chain.closed = true;
                debug!(vertices = chain.len(), "ring closed");
            }
            ChainEnd::Overlap { at, with } => {
                debug!(x = at.x, y = at.y, primitive = with.0, "ring ran into a used edge");
            }
            ChainEnd::Discontinuity(at) => {
                debug!(x = at.x, y = at.y, "ring has a discontinuity");
            }
        }

        Ok((chain, end))
    }

    /// Append the far side of primitive `id` as seen from `prev` and
    /// return the new running endpoint.
    fn append_far_side(
        &self,
        id: PrimitiveId,
        prev: Point,
        chain: &mut Chain,
    ) -> Result<Point, OutlineError> {
        let primitive = self.primitive(id);
        match &primitive.shape {
            Shape::Segment { start, end } => {
                let far = if closer_endpoint(prev, *start, *end) {
                    *end
                } else {
                    *start
                };
                chain.push(far);
                Ok(far)
            }
            Shape::Arc {
                center,
                start,
                end,
                sweep_degrees,
            } => {
                let (near, far, sweep) = if closer_endpoint(prev, *start, *end) {
                    (*start, *end, *sweep_degrees)
                } else {
                    (*end, *start, -*sweep_degrees)
                };
                for p in tessellate::arc_interior_vertices(
                    *center,
                    near,
                    sweep,
                    self.config.max_arc_error,
                ) {
                    chain.push(p);
                }
                chain.push(far);
                Ok(far)
            }
            Shape::Bezier { start, end, .. } => {
                let points = self.bezier_points(id);
                if closer_endpoint(prev, *start, *end) {
                    for &p in points.iter().skip(1) {
                        chain.push(p);
                    }
                    Ok(*end)
                } else {
                    for &p in points.iter().rev().skip(1) {
                        chain.push(p);
                    }
                    Ok(*start)
                }
            }
            Shape::Circle { .. } | Shape::Rect { .. } | Shape::Polygon { .. } => {
                Err(OutlineError::UnsupportedPrimitive {
                    kind: primitive.kind().to_string(),
                    x: prev.x,
                    y: prev.y,
                })
            }
        }
    }
}
