//! Tessellation: convert curved primitives into straight-line vertices
//! with a bounded chord error.
//!
//! Arcs and circles use the "maximum sagitta" rule: a chord spanning an
//! angle `theta` on a circle of radius `r` deviates from the arc by at most
//! `r * (1 - cos(theta / 2))`. Solving for `theta` at the configured error
//! gives the largest step that keeps every chord within bounds; the step
//! count is rounded up so the bound holds for every sweep.
//!
//! Bezier curves use Wang's formula, which bounds the number of uniform
//! parameter steps needed for a cubic from the control polygon alone.

use crate::types::Point;

/// Largest angular step allowed regardless of radius, so that a full
/// circle always gets at least 8 segments.
const MAX_STEP_DEGREES: f64 = 360.0 / 8.0;

/// Upper bound on segments produced for a single arc or circle.
const MAX_ARC_SEGMENTS: usize = 4096;

/// Upper bound on segments produced for a single bezier curve.
const MAX_BEZIER_SEGMENTS: usize = 1024;

/// Number of straight segments needed to approximate an arc.
///
/// `radius` and `max_error` share the coordinate unit; `sweep_degrees` may
/// be signed. Always returns at least 1. For a fixed error and sweep, a
/// larger radius never yields fewer segments.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn arc_segment_count(radius: f64, max_error: f64, sweep_degrees: f64) -> usize {
    let rel_error = if radius > 0.0 {
        (max_error / radius).min(1.0)
    } else {
        1.0
    };
    let step_degrees = (2.0 * (1.0 - rel_error).acos().to_degrees()).min(MAX_STEP_DEGREES);

    if step_degrees.is_nan() || step_degrees <= 0.0 {
        return MAX_ARC_SEGMENTS;
    }

    // The small offset keeps exact divisions (90 / 45) from rounding up.
    let count = (sweep_degrees.abs() / step_degrees - 1e-9).ceil();
    if count >= MAX_ARC_SEGMENTS as f64 {
        MAX_ARC_SEGMENTS
    } else {
        (count as usize).max(1)
    }
}

/// Vertices strictly between the two ends of an arc.
///
/// The arc starts at `start` and sweeps `sweep_degrees` about `center`
/// (positive is counter-clockwise). Neither end is included: callers own
/// the exact endpoint coordinates and append them themselves.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn arc_interior_vertices(
    center: Point,
    start: Point,
    sweep_degrees: f64,
    max_error: f64,
) -> Vec<Point> {
    let radius = start.distance(center);
    let steps = arc_segment_count(radius, max_error, sweep_degrees);

    (1..steps)
        .map(|step| {
            let rotation = sweep_degrees * step as f64 / steps as f64;
            start.rotated_about(center, rotation)
        })
        .collect()
}

/// Vertices of a full circle, starting at the rightmost point and going
/// counter-clockwise.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn circle_vertices(center: Point, radius: f64, max_error: f64) -> Vec<Point> {
    let steps = arc_segment_count(radius, max_error, 360.0);
    let start = center.offset(radius, 0.0);

    (0..steps)
        .map(|step| {
            let rotation = 360.0 * step as f64 / steps as f64;
            start.rotated_about(center, rotation)
        })
        .collect()
}

/// Flatten a cubic bezier curve into a polyline.
///
/// The first and last vertices are exactly `start` and `end`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn bezier_vertices(
    start: Point,
    control1: Point,
    control2: Point,
    end: Point,
    max_error: f64,
) -> Vec<Point> {
    let second_difference = |a: Point, b: Point, c: Point| {
        let dx = 2.0f64.mul_add(-b.x, a.x) + c.x;
        let dy = 2.0f64.mul_add(-b.y, a.y) + c.y;
        dx.hypot(dy)
    };
    let m = second_difference(start, control1, control2)
        .max(second_difference(control1, control2, end));

    let raw = (0.75 * m / max_error).sqrt().ceil();
    let segments = if raw.is_finite() && raw >= 1.0 {
        (raw as usize).min(MAX_BEZIER_SEGMENTS)
    } else if raw.is_finite() {
        1
    } else {
        MAX_BEZIER_SEGMENTS
    };

    let mut points = Vec::with_capacity(segments + 1);
    points.push(start);
    for i in 1..segments {
        let t = i as f64 / segments as f64;
        points.push(cubic_point(start, control1, control2, end, t));
    }
    points.push(end);
    points
}

/// Evaluate a cubic bezier at parameter `t`.
fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    Point::new(
        b0.mul_add(p0.x, b1.mul_add(p1.x, b2.mul_add(p2.x, b3 * p3.x))),
        b0.mul_add(p0.y, b1.mul_add(p1.y, b2.mul_add(p2.y, b3 * p3.y))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- arc_segment_count tests ---

    #[test]
    fn full_circle_has_at_least_eight_segments() {
        assert_eq!(arc_segment_count(1.0, 1.0, 360.0), 8);
        assert_eq!(arc_segment_count(0.001, 1.0, 360.0), 8);
    }

    #[test]
    fn zero_sweep_still_has_one_segment() {
        assert_eq!(arc_segment_count(10.0, 0.01, 0.0), 1);
    }

    #[test]
    fn sign_of_sweep_does_not_matter() {
        assert_eq!(
            arc_segment_count(10.0, 0.01, 90.0),
            arc_segment_count(10.0, 0.01, -90.0)
        );
    }

    #[test]
    fn doubling_radius_never_decreases_count() {
        let mut radius = 0.5;
        let mut previous = arc_segment_count(radius, 0.005, 90.0);
        for _ in 0..12 {
            radius *= 2.0;
            let count = arc_segment_count(radius, 0.005, 90.0);
            assert!(
                count >= previous,
                "radius {radius}: {count} < {previous} segments"
            );
            previous = count;
        }
    }

    #[test]
    fn smaller_error_needs_more_segments() {
        assert!(arc_segment_count(10.0, 0.001, 90.0) > arc_segment_count(10.0, 0.1, 90.0));
    }

    #[test]
    fn chord_sagitta_stays_within_error() {
        let max_error = 0.005;
        for radius in [0.5, 10.0, 250.0] {
            for sweep in [5.4, 9.0, 33.3, 90.0, 200.0, 360.0] {
                let steps = arc_segment_count(radius, max_error, sweep);
                #[allow(clippy::cast_precision_loss)]
                let half_step = (sweep / steps as f64 / 2.0).to_radians();
                let sagitta = radius * (1.0 - half_step.cos());
                assert!(
                    sagitta <= max_error * (1.0 + 1e-6),
                    "radius {radius} sweep {sweep}: {steps} steps, sagitta {sagitta}"
                );
            }
        }
    }

    #[test]
    fn short_arc_is_not_rounded_down() {
        // 5.4 degrees at radius 10 needs a step of at most ~3.6 degrees.
        assert_eq!(arc_segment_count(10.0, 0.005, 5.4), 2);
    }

    #[test]
    fn non_positive_error_is_capped() {
        assert_eq!(arc_segment_count(10.0, 0.0, 90.0), MAX_ARC_SEGMENTS);
    }

    // --- arc_interior_vertices tests ---

    #[test]
    fn arc_interior_excludes_both_ends() {
        let center = Point::new(0.0, 0.0);
        let start = Point::new(10.0, 0.0);
        let steps = arc_segment_count(10.0, 0.01, 90.0);
        let interior = arc_interior_vertices(center, start, 90.0, 0.01);
        assert_eq!(interior.len(), steps - 1);
        for p in &interior {
            assert!((p.distance(center) - 10.0).abs() < 1e-9);
            assert!(p.x > 0.0 && p.y > 0.0, "({}, {}) not in first quadrant", p.x, p.y);
        }
    }

    #[test]
    fn arc_interior_negative_sweep_goes_clockwise() {
        let interior =
            arc_interior_vertices(Point::new(0.0, 0.0), Point::new(10.0, 0.0), -90.0, 0.01);
        assert!(!interior.is_empty());
        assert!(interior.iter().all(|p| p.y < 0.0));
    }

    // --- circle_vertices tests ---

    #[test]
    fn circle_starts_at_rightmost_point() {
        let pts = circle_vertices(Point::new(1.0, 1.0), 2.0, 0.01);
        assert_eq!(pts[0], Point::new(3.0, 1.0));
        assert_eq!(pts.len(), arc_segment_count(2.0, 0.01, 360.0));
        for p in &pts {
            assert!((p.distance(Point::new(1.0, 1.0)) - 2.0).abs() < 1e-9);
        }
    }

    // --- bezier_vertices tests ---

    #[test]
    fn straight_bezier_is_one_segment() {
        let pts = bezier_vertices(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
            0.01,
        );
        assert_eq!(pts, vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)]);
    }

    #[test]
    fn curved_bezier_keeps_exact_ends() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        let pts = bezier_vertices(start, Point::new(0.0, 10.0), Point::new(10.0, 10.0), end, 0.01);
        assert!(pts.len() > 2);
        assert_eq!(pts.first(), Some(&start));
        assert_eq!(pts.last(), Some(&end));
        // Symmetric control polygon: the midpoint of the curve is at y = 7.5.
        let peak = pts.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        assert!(peak <= 7.5 + 1e-9);
    }
}
