//! Reconstruction diagnostics: the problem points found while stitching,
//! human-readable messages, per-stage timing, and summary counts.
//!
//! Every reconstruction call returns an [`OutlineDiagnostics`] alongside
//! its geometry. Discontinuity and intersection points are meant for
//! on-screen markers; messages are meant for the user.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Everything a reconstruction call has to say about its input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineDiagnostics {
    /// Points where a chain could not continue.
    pub discontinuities: Vec<Point>,
    /// Points where two ring segments cross or illegally coincide.
    pub intersections: Vec<Point>,
    /// Human-readable explanations, in the order they were produced.
    pub messages: Vec<String>,
    /// Chain walking (outline plus holes). `None` if nothing was walked.
    pub walk: Option<StageDiagnostics>,
    /// Self-intersection scan. `None` when the rings did not all close.
    pub intersection_scan: Option<StageDiagnostics>,
    /// Summary counts.
    pub summary: OutlineSummary,
}

/// Timing and metrics for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Chain walking.
    Walk {
        /// Index of the primitive the outline was started from.
        start_primitive: usize,
        /// Rings walked, closed or not.
        ring_count: usize,
        /// Rings that closed on themselves.
        closed_ring_count: usize,
        /// Vertices across every ring.
        vertex_count: usize,
    },
    /// Self-intersection scan.
    IntersectionScan {
        /// Non-degenerate segments indexed.
        segment_count: usize,
        /// Candidate pairs whose envelopes overlapped.
        candidate_pairs: usize,
        /// Intersections reported.
        intersection_count: usize,
    },
}

/// High-level counts for one reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSummary {
    /// Primitives supplied.
    pub primitive_count: usize,
    /// Rings in the result (outline plus holes).
    pub ring_count: usize,
    /// Hole rings in the result.
    pub hole_count: usize,
    /// Vertices across every ring of the result.
    pub vertex_count: usize,
}

impl OutlineDiagnostics {
    /// Append a human-readable message.
    pub fn message(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    /// Record a discontinuity and its message.
    pub(crate) fn discontinuity(&mut self, at: Point) {
        self.discontinuities.push(at);
        self.message(format!(
            "unable to find edge with an endpoint of ({}, {})",
            format_coord(at.x),
            format_coord(at.y),
        ));
    }

    /// Record a chain that ran into an edge already used by another ring.
    pub(crate) fn overlap(&mut self, at: Point) {
        self.message(format!(
            "edge with an endpoint of ({}, {}) is already part of another ring",
            format_coord(at.x),
            format_coord(at.y),
        ));
    }

    /// Record a primitive left out because it covers no length or area.
    pub(crate) fn degenerate_primitive(&mut self, kind: impl std::fmt::Display, at: Point) {
        self.message(format!(
            "skipped degenerate {kind} at ({}, {})",
            format_coord(at.x),
            format_coord(at.y),
        ));
    }

    /// Record a ring that closed on too few distinct vertices to enclose
    /// any area.
    pub(crate) fn degenerate_ring(&mut self, at: Point, vertices: usize) {
        self.message(format!(
            "ring at ({}, {}) closes on only {vertices} distinct vertices",
            format_coord(at.x),
            format_coord(at.y),
        ));
    }

    /// Record a self-intersection and its message.
    pub(crate) fn intersection(&mut self, at: Point) {
        self.intersections.push(at);
        self.message(format!(
            "outline self-intersects at ({}, {})",
            format_coord(at.x),
            format_coord(at.y),
        ));
    }

    /// Returns `true` if no problem points were recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.discontinuities.is_empty() && self.intersections.is_empty()
    }

    /// Format a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Outline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Primitives: {}  |  Rings: {} ({} holes)  |  Vertices: {}",
            self.summary.primitive_count,
            self.summary.ring_count,
            self.summary.hole_count,
            self.summary.vertex_count,
        ));
        lines.push(String::new());

        lines.push(format!("{:<24} {:>10}  {}", "Stage", "Duration", "Details"));
        lines.push("-".repeat(80));
        let stages = [
            ("Chain Walk", self.walk.as_ref()),
            ("Intersection Scan", self.intersection_scan.as_ref()),
        ];
        for (name, diag) in stages {
            match diag {
                Some(d) => {
                    let ms = duration_ms(d.duration);
                    let details = format_metrics(&d.metrics);
                    lines.push(format!("{name:<24} {ms:>8.3}ms  {details}"));
                }
                None => lines.push(format!("{name:<24} {:>10}  skipped", "-")),
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "Discontinuities: {}  |  Intersections: {}",
            self.discontinuities.len(),
            self.intersections.len(),
        ));
        for p in &self.discontinuities {
            lines.push(format!(
                "  gap at ({}, {})",
                format_coord(p.x),
                format_coord(p.y)
            ));
        }
        for p in &self.intersections {
            lines.push(format!(
                "  crossing at ({}, {})",
                format_coord(p.x),
                format_coord(p.y)
            ));
        }

        if !self.messages.is_empty() {
            lines.push(String::new());
            lines.extend(self.messages.iter().cloned());
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Coordinates in messages use four decimals, trailing zeros trimmed.
fn format_coord(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Walk {
            start_primitive,
            ring_count,
            closed_ring_count,
            vertex_count,
        } => format!(
            "start=#{start_primitive} rings={ring_count} closed={closed_ring_count} vertices={vertex_count}"
        ),
        StageMetrics::IntersectionScan {
            segment_count,
            candidate_pairs,
            intersection_count,
        } => format!(
            "{segment_count} segments, {candidate_pairs} candidate pairs, {intersection_count} intersections"
        ),
    }
}
