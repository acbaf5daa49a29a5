//! Shared types for the edgeloop outline reconstruction engine.

use serde::{Deserialize, Serialize};

/// A 2D point in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Rotate this point about `center` by `degrees` (counter-clockwise
    /// for positive angles).
    ///
    /// Multiples of 90 degrees are handled exactly so that arc endpoints
    /// built from quarter or half turns compare equal to hand-entered
    /// coordinates.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn rotated_about(self, center: Self, degrees: f64) -> Self {
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        let normalized = degrees.rem_euclid(360.0);

        let (rx, ry) = if normalized == 0.0 {
            (dx, dy)
        } else if normalized == 90.0 {
            (-dy, dx)
        } else if normalized == 180.0 {
            (-dx, -dy)
        } else if normalized == 270.0 {
            (dy, -dx)
        } else {
            let (sin, cos) = normalized.to_radians().sin_cos();
            (dx.mul_add(cos, -dy * sin), dx.mul_add(sin, dy * cos))
        };

        Self::new(center.x + rx, center.y + ry)
    }

    /// Translate by `dx`, `dy`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<geo::Coord<f64>> for Point {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

/// Rotation plus translation applied to primitives that were copied out of
/// a parent coordinate frame (for example a polygon inside a rotated
/// footprint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Rotation about the local origin in degrees, counter-clockwise.
    pub rotation_degrees: f64,
    /// Translation applied after rotation.
    pub offset: Point,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation_degrees: 0.0,
        offset: Point::new(0.0, 0.0),
    };

    /// Create a transform from a rotation and an offset.
    #[must_use]
    pub const fn new(rotation_degrees: f64, offset: Point) -> Self {
        Self {
            rotation_degrees,
            offset,
        }
    }

    /// Map a local point into the shared frame.
    #[must_use]
    pub fn apply(&self, local: Point) -> Point {
        let rotated = local.rotated_about(Point::new(0.0, 0.0), self.rotation_degrees);
        rotated.offset(self.offset.x, self.offset.y)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An ordered, implicitly closed ring of vertices.
///
/// The closing edge from the last vertex back to the first is not stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a contour from its vertices.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Iterate the ring's edges, including the closing edge.
    ///
    /// A contour with fewer than two vertices has no edges.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = if self.0.len() < 2 { 0 } else { self.0.len() };
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Convert to a closed `geo::LineString`.
    #[must_use]
    pub fn to_line_string(&self) -> geo::LineString<f64> {
        let mut coords: Vec<geo::Coord<f64>> = self.0.iter().map(|&p| p.into()).collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        geo::LineString::new(coords)
    }
}

/// One outer ring plus zero or more hole rings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonWithHoles {
    /// The outer perimeter.
    pub outline: Contour,
    /// Interior rings excluded from the area.
    pub holes: Vec<Contour>,
}

impl PolygonWithHoles {
    /// Create a polygon with no holes.
    #[must_use]
    pub const fn new(outline: Contour) -> Self {
        Self {
            outline,
            holes: Vec::new(),
        }
    }

    /// Iterate the outline followed by every hole.
    pub fn rings(&self) -> impl Iterator<Item = &Contour> {
        std::iter::once(&self.outline).chain(self.holes.iter())
    }

    /// Total vertex count across all rings.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.rings().map(Contour::len).sum()
    }

    /// Convert to a `geo::Polygon` for boolean operations.
    #[must_use]
    pub fn to_geo(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(
            self.outline.to_line_string(),
            self.holes.iter().map(Contour::to_line_string).collect(),
        )
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Corner with the smallest coordinates.
    pub min: Point,
    /// Corner with the largest coordinates.
    pub max: Point,
}

impl BoundingBox {
    /// A zero-size box at `p`.
    #[must_use]
    pub const fn at(p: Point) -> Self {
        Self { min: p, max: p }
    }

    /// Compute the bounding box of a set of points.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, p| {
            Some(acc.map_or_else(|| Self::at(p), |bb| bb.including(p)))
        })
    }

    /// Grow the box to include `p`.
    #[must_use]
    pub fn including(self, p: Point) -> Self {
        Self {
            min: Point::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        self.including(other.min).including(other.max)
    }

    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns `true` if the box has zero width or zero height.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Grow every side outward: `dx` on the left and right, `dy` on the
    /// top and bottom.
    #[must_use]
    pub fn inflate(self, dx: f64, dy: f64) -> Self {
        Self {
            min: self.min.offset(-dx, -dy),
            max: self.max.offset(dx, dy),
        }
    }

    /// The four corners in ring order:
    /// `(min.x, min.y)`, `(min.x, max.y)`, `(max.x, max.y)`, `(max.x, min.y)`.
    ///
    /// Side `i` of the box runs from corner `i` to corner `(i + 1) % 4`.
    #[must_use]
    pub const fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.min.x, self.max.y),
            self.max,
            Point::new(self.max.x, self.min.y),
        ]
    }

    /// The box as a four-vertex contour in [`corners`](Self::corners) order.
    #[must_use]
    pub fn to_contour(&self) -> Contour {
        Contour::new(self.corners().to_vec())
    }
}

/// Configuration for outline reconstruction.
///
/// # Invariants
///
/// `tolerance` must be finite and non-negative; `max_arc_error` must be
/// finite and strictly positive. [`validate`](Self::validate) checks both
/// and every public entry point calls it before doing any work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Maximum approximate (Manhattan) distance at which two endpoints are
    /// treated as the same point while stitching.
    pub tolerance: f64,

    /// Maximum chord error when converting arcs, circles and bezier curves
    /// into straight segments.
    pub max_arc_error: f64,

    /// Half-size added to each side of a zero-area fallback box.
    pub degenerate_inflation: f64,

    /// Fraction of its width and height by which the footprint fallback
    /// box is grown on each side.
    pub footprint_margin_ratio: f64,
}

impl OutlineConfig {
    /// Default stitching tolerance: endpoints must match exactly.
    pub const DEFAULT_TOLERANCE: f64 = 0.0;
    /// Default chord error for tessellation.
    pub const DEFAULT_MAX_ARC_ERROR: f64 = 0.005;
    /// Default inflation for degenerate fallback boxes.
    pub const DEFAULT_DEGENERATE_INFLATION: f64 = 1.0;
    /// Default footprint fallback margin.
    pub const DEFAULT_FOOTPRINT_MARGIN_RATIO: f64 = 0.1;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::InvalidConfig`] describing the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), OutlineError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(OutlineError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if !self.max_arc_error.is_finite() || self.max_arc_error <= 0.0 {
            return Err(OutlineError::InvalidConfig(format!(
                "max_arc_error must be finite and positive, got {}",
                self.max_arc_error
            )));
        }
        if !self.degenerate_inflation.is_finite() || self.degenerate_inflation <= 0.0 {
            return Err(OutlineError::InvalidConfig(format!(
                "degenerate_inflation must be finite and positive, got {}",
                self.degenerate_inflation
            )));
        }
        if !self.footprint_margin_ratio.is_finite() || self.footprint_margin_ratio < 0.0 {
            return Err(OutlineError::InvalidConfig(format!(
                "footprint_margin_ratio must be finite and non-negative, got {}",
                self.footprint_margin_ratio
            )));
        }
        Ok(())
    }
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
            max_arc_error: Self::DEFAULT_MAX_ARC_ERROR,
            degenerate_inflation: Self::DEFAULT_DEGENERATE_INFLATION,
            footprint_margin_ratio: Self::DEFAULT_FOOTPRINT_MARGIN_RATIO,
        }
    }
}

/// Hard failures of outline reconstruction.
///
/// Discontinuities, overlapping matches and self-intersections are not
/// errors; they are reported through the build result and its
/// diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum OutlineError {
    /// Reconstruction configuration is invalid.
    #[error("invalid outline configuration: {0}")]
    InvalidConfig(String),

    /// An inherently closed primitive was reached while walking a chain.
    #[error("unsupported {kind} primitive reached mid-chain at ({x}, {y})")]
    UnsupportedPrimitive {
        /// Kind name of the offending primitive.
        kind: String,
        /// X coordinate where the chain reached it.
        x: f64,
        /// Y coordinate where the chain reached it.
        y: f64,
    },

    /// Footprint reconstruction was requested without a footprint.
    #[error("no footprint loaded")]
    NoFootprint,

    /// A containment test was needed but the footprint has no pads.
    #[error("footprint {reference} has no conductive regions to test containment against")]
    NoConductiveRegions {
        /// Reference designator of the footprint.
        reference: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rotation_by_quadrants_is_exact() {
        let center = Point::new(5.0, 5.0);
        let p = Point::new(15.0, 5.0);
        assert_eq!(p.rotated_about(center, 90.0), Point::new(5.0, 15.0));
        assert_eq!(p.rotated_about(center, 180.0), Point::new(-5.0, 5.0));
        assert_eq!(p.rotated_about(center, -90.0), Point::new(5.0, -5.0));
        assert_eq!(p.rotated_about(center, 360.0), p);
    }

    #[test]
    fn rotation_by_arbitrary_angle() {
        let p = Point::new(1.0, 0.0).rotated_about(Point::new(0.0, 0.0), 45.0);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!((p.x - h).abs() < 1e-12);
        assert!((p.y - h).abs() < 1e-12);
    }

    #[test]
    fn transform_rotates_then_translates() {
        let t = Transform::new(90.0, Point::new(10.0, 0.0));
        assert_eq!(t.apply(Point::new(1.0, 0.0)), Point::new(10.0, 1.0));
        assert_eq!(Transform::IDENTITY.apply(Point::new(3.0, 4.0)), Point::new(3.0, 4.0));
    }

    // --- Contour tests ---

    #[test]
    fn contour_segments_include_closing_edge() {
        let c = Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ]);
        let segs: Vec<_> = c.segments().collect();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[2], (Point::new(1.0, 1.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn contour_with_one_point_has_no_segments() {
        let c = Contour::new(vec![Point::new(0.0, 0.0)]);
        assert_eq!(c.segments().count(), 0);
    }

    #[test]
    fn contour_line_string_is_closed() {
        let c = Contour::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let ls = c.to_line_string();
        assert_eq!(ls.0.len(), 3);
        assert_eq!(ls.0.first(), ls.0.last());
    }

    // --- BoundingBox tests ---

    #[test]
    fn bounding_box_from_points() {
        let bb = BoundingBox::from_points([
            Point::new(3.0, -1.0),
            Point::new(-2.0, 4.0),
            Point::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bb.min, Point::new(-2.0, -1.0));
        assert_eq!(bb.max, Point::new(3.0, 4.0));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn bounding_box_degenerate_and_inflate() {
        let bb = BoundingBox::at(Point::new(1.0, 1.0));
        assert!(bb.is_degenerate());
        let grown = bb.inflate(1.0, 2.0);
        assert!(!grown.is_degenerate());
        assert!((grown.width() - 2.0).abs() < f64::EPSILON);
        assert!((grown.height() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bounding_box_corners_order() {
        let bb = BoundingBox {
            min: Point::new(0.0, 0.0),
            max: Point::new(2.0, 1.0),
        };
        assert_eq!(
            bb.corners(),
            [
                Point::new(0.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(2.0, 1.0),
                Point::new(2.0, 0.0),
            ]
        );
    }

    // --- OutlineConfig tests ---

    #[test]
    fn config_defaults() {
        let config = OutlineConfig::default();
        assert!(config.tolerance.abs() < f64::EPSILON);
        assert!((config.max_arc_error - 0.005).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_negative_tolerance() {
        let config = OutlineConfig {
            tolerance: -1.0,
            ..OutlineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OutlineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_rejects_zero_arc_error() {
        let config = OutlineConfig {
            max_arc_error: 0.0,
            ..OutlineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OutlineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_serde_fills_missing_fields() {
        let config: OutlineConfig = serde_json::from_str(r#"{"tolerance": 0.5}"#).unwrap();
        assert!((config.tolerance - 0.5).abs() < f64::EPSILON);
        assert!((config.max_arc_error - OutlineConfig::DEFAULT_MAX_ARC_ERROR).abs() < f64::EPSILON);
    }

    // --- OutlineError tests ---

    #[test]
    fn error_display() {
        assert_eq!(OutlineError::NoFootprint.to_string(), "no footprint loaded");
        let err = OutlineError::UnsupportedPrimitive {
            kind: "circle".to_string(),
            x: 1.0,
            y: 2.0,
        };
        assert_eq!(
            err.to_string(),
            "unsupported circle primitive reached mid-chain at (1, 2)"
        );
    }

    #[test]
    fn error_serde_round_trip() {
        let err = OutlineError::NoConductiveRegions {
            reference: "U1".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: OutlineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
