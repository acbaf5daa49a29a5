//! Boundary primitives and the per-kind capabilities every stitching stage
//! relies on.
//!
//! Each [`Primitive`] answers the same questions regardless of its kind:
//! whether it is inherently closed, what its two connectable endpoints are,
//! what ring it forms when closed, what its leftmost vertex is, and what
//! area it covers. The chain walker, the outer-ring selector and the
//! fallback bounding boxes all go through these methods instead of
//! branching on the kind themselves.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tessellate;
use crate::types::{BoundingBox, Point, Transform};

/// Index of a primitive within the caller's slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimitiveId(pub usize);

/// Kind tag of a [`Shape`], used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Straight line segment.
    Segment,
    /// Circular arc.
    Arc,
    /// Full circle.
    Circle,
    /// Axis-aligned rectangle.
    Rect,
    /// Closed polygon.
    Polygon,
    /// Cubic bezier curve.
    Bezier,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Segment => "segment",
            Self::Arc => "arc",
            Self::Circle => "circle",
            Self::Rect => "rect",
            Self::Polygon => "polygon",
            Self::Bezier => "bezier",
        };
        f.write_str(name)
    }
}

/// Geometry of a boundary primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Straight line from `start` to `end`.
    Segment {
        /// First endpoint.
        start: Point,
        /// Second endpoint.
        end: Point,
    },
    /// Circular arc from `start` sweeping `sweep_degrees` about `center`
    /// to `end`.
    ///
    /// Build with [`Primitive::arc`] so that `end` is consistent with
    /// `start` and the sweep.
    Arc {
        /// Center of the arc's circle.
        center: Point,
        /// Point where the sweep begins.
        start: Point,
        /// Point where the sweep ends.
        end: Point,
        /// Signed sweep angle, counter-clockwise positive.
        sweep_degrees: f64,
    },
    /// Full circle.
    Circle {
        /// Center point.
        center: Point,
        /// Radius; zero or negative radii are malformed.
        radius: f64,
    },
    /// Axis-aligned rectangle given by two opposite corners.
    Rect {
        /// One corner.
        start: Point,
        /// The opposite corner.
        end: Point,
    },
    /// Closed polygon, vertices in the owner's local frame.
    Polygon {
        /// Ring vertices; the closing edge is implicit.
        vertices: Vec<Point>,
    },
    /// Cubic bezier curve.
    Bezier {
        /// First endpoint.
        start: Point,
        /// First control point.
        control1: Point,
        /// Second control point.
        control2: Point,
        /// Second endpoint.
        end: Point,
    },
}

/// One typed 2D drawing element participating in a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    /// The primitive's geometry.
    pub shape: Shape,
    /// Transform from the owner's frame, applied to polygon vertices.
    #[serde(default)]
    pub transform: Transform,
}

impl Primitive {
    /// Wrap a shape with the identity transform.
    #[must_use]
    pub const fn new(shape: Shape) -> Self {
        Self {
            shape,
            transform: Transform::IDENTITY,
        }
    }

    /// Straight segment.
    #[must_use]
    pub const fn segment(start: Point, end: Point) -> Self {
        Self::new(Shape::Segment { start, end })
    }

    /// Arc starting at `start` and sweeping `sweep_degrees` about `center`.
    #[must_use]
    pub fn arc(center: Point, start: Point, sweep_degrees: f64) -> Self {
        let end = start.rotated_about(center, sweep_degrees);
        Self::new(Shape::Arc {
            center,
            start,
            end,
            sweep_degrees,
        })
    }

    /// Full circle.
    #[must_use]
    pub const fn circle(center: Point, radius: f64) -> Self {
        Self::new(Shape::Circle { center, radius })
    }

    /// Axis-aligned rectangle from two opposite corners.
    #[must_use]
    pub const fn rect(start: Point, end: Point) -> Self {
        Self::new(Shape::Rect { start, end })
    }

    /// Closed polygon in its own local frame.
    #[must_use]
    pub const fn polygon(vertices: Vec<Point>) -> Self {
        Self::new(Shape::Polygon { vertices })
    }

    /// Cubic bezier curve.
    #[must_use]
    pub const fn bezier(start: Point, control1: Point, control2: Point, end: Point) -> Self {
        Self::new(Shape::Bezier {
            start,
            control1,
            control2,
            end,
        })
    }

    /// Replace the owning-context transform.
    #[must_use]
    pub const fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// The kind tag of this primitive.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self.shape {
            Shape::Segment { .. } => ShapeKind::Segment,
            Shape::Arc { .. } => ShapeKind::Arc,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Rect { .. } => ShapeKind::Rect,
            Shape::Polygon { .. } => ShapeKind::Polygon,
            Shape::Bezier { .. } => ShapeKind::Bezier,
        }
    }

    /// Returns `true` for kinds that form a ring on their own and never
    /// connect to neighbours: circles, rectangles and polygons.
    #[must_use]
    pub const fn is_closed_shape(&self) -> bool {
        matches!(
            self.shape,
            Shape::Circle { .. } | Shape::Rect { .. } | Shape::Polygon { .. }
        )
    }

    /// Returns `true` for primitives that cover no length or area: a
    /// zero-length segment, a zero-radius or zero-sweep arc, a non-positive
    /// circle, a flat rectangle, a polygon with fewer than 3 vertices, or a
    /// bezier whose four points coincide.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        match &self.shape {
            Shape::Segment { start, end } => start == end,
            Shape::Arc {
                center,
                start,
                sweep_degrees,
                ..
            } => center == start || *sweep_degrees == 0.0,
            Shape::Circle { radius, .. } => *radius <= 0.0,
            Shape::Rect { start, end } => start.x == end.x || start.y == end.y,
            Shape::Polygon { vertices } => vertices.len() < 3,
            Shape::Bezier {
                start,
                control1,
                control2,
                end,
            } => start == control1 && start == control2 && start == end,
        }
    }

    /// The two endpoints used for nearest-endpoint matching.
    ///
    /// Closed kinds report nominal points (a circle's center and rightmost
    /// rim point, a rectangle's defining corners, a polygon's first and last
    /// vertices) so that a chain reaching one can be detected and rejected.
    #[must_use]
    pub fn endpoints(&self) -> (Point, Point) {
        match &self.shape {
            Shape::Segment { start, end }
            | Shape::Arc { start, end, .. }
            | Shape::Rect { start, end }
            | Shape::Bezier { start, end, .. } => (*start, *end),
            Shape::Circle { center, radius } => (*center, center.offset(*radius, 0.0)),
            Shape::Polygon { vertices } => {
                let origin = Point::new(0.0, 0.0);
                let first = vertices.first().copied().unwrap_or(origin);
                let last = vertices.last().copied().unwrap_or(origin);
                (self.transform.apply(first), self.transform.apply(last))
            }
        }
    }

    /// The ring formed by an inherently closed primitive, in the shared
    /// frame. Returns `None` for kinds that must be stitched.
    #[must_use]
    pub fn closed_ring(&self, max_error: f64) -> Option<Vec<Point>> {
        match &self.shape {
            Shape::Circle { center, radius } => {
                Some(tessellate::circle_vertices(*center, *radius, max_error))
            }
            Shape::Rect { start, end } => Some(rect_corners(*start, *end).to_vec()),
            Shape::Polygon { vertices } => {
                Some(vertices.iter().map(|&v| self.transform.apply(v)).collect())
            }
            Shape::Segment { .. } | Shape::Arc { .. } | Shape::Bezier { .. } => None,
        }
    }

    /// The flattened point list of a bezier, both ends included.
    /// Returns `None` for other kinds.
    #[must_use]
    pub fn bezier_points(&self, max_error: f64) -> Option<Vec<Point>> {
        match self.shape {
            Shape::Bezier {
                start,
                control1,
                control2,
                end,
            } => Some(tessellate::bezier_vertices(
                start, control1, control2, end, max_error,
            )),
            _ => None,
        }
    }

    /// Every vertex this primitive contributes once tessellated.
    #[must_use]
    pub fn vertices(&self, max_error: f64) -> Vec<Point> {
        match &self.shape {
            Shape::Segment { start, end } => vec![*start, *end],
            Shape::Arc {
                center,
                start,
                end,
                sweep_degrees,
            } => {
                let mut points = vec![*start];
                points.extend(tessellate::arc_interior_vertices(
                    *center,
                    *start,
                    *sweep_degrees,
                    max_error,
                ));
                points.push(*end);
                points
            }
            Shape::Bezier {
                start,
                control1,
                control2,
                end,
            } => tessellate::bezier_vertices(*start, *control1, *control2, *end, max_error),
            Shape::Circle { .. } | Shape::Rect { .. } | Shape::Polygon { .. } => {
                self.closed_ring(max_error).unwrap_or_default()
            }
        }
    }

    /// The vertex with the smallest x coordinate, first one on ties.
    ///
    /// Curved kinds are tessellated so the true leftmost vertex is found,
    /// not just the nominal endpoints. Circles with a non-positive radius
    /// are malformed and report `None`.
    #[must_use]
    pub fn leftmost_vertex(&self, max_error: f64) -> Option<Point> {
        if let Shape::Circle { center, radius } = self.shape {
            return (radius > 0.0).then(|| center.offset(-radius, 0.0));
        }

        self.vertices(max_error)
            .into_iter()
            .fold(None, |best: Option<Point>, p| match best {
                Some(b) if b.x <= p.x => Some(b),
                _ => Some(p),
            })
    }

    /// Area covered by this primitive. `None` when it has no vertices.
    #[must_use]
    pub fn bounding_box(&self, max_error: f64) -> Option<BoundingBox> {
        if let Shape::Circle { center, radius } = self.shape {
            let r = radius.abs();
            return Some(BoundingBox {
                min: center.offset(-r, -r),
                max: center.offset(r, r),
            });
        }
        BoundingBox::from_points(self.vertices(max_error))
    }
}

/// The four corners of a rectangle, starting at `start` and visiting
/// `(end.x, start.y)`, `end`, `(start.x, end.y)`.
const fn rect_corners(start: Point, end: Point) -> [Point; 4] {
    [
        start,
        Point::new(end.x, start.y),
        end,
        Point::new(start.x, end.y),
    ]
}
