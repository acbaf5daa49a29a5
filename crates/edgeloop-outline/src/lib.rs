//! edgeloop-outline: board outline reconstruction (sans-IO).
//!
//! Assembles an unordered list of 2D drawing primitives (segments, arcs,
//! circles, rectangles, polygons, bezier curves) into a polygon with
//! holes:
//! nearest-endpoint stitching -> outline/hole classification ->
//! self-intersection scan -> board or footprint fallback.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! primitive lists and returns structured data. Loading boards and
//! writing results lives in `edgeloop-bench` and `edgeloop-export`.

pub mod board;
pub mod chain;
pub mod diagnostics;
pub mod footprint;
pub mod intersect;
pub mod outline;
pub mod primitive;
pub mod proximity;
pub mod search;
pub mod tessellate;
pub mod types;

pub use board::{Board, BoardItem, BoardOutline, FallbackReason, Layer, build_board_outline};
pub use chain::{Chain, ChainEnd};
pub use diagnostics::{OutlineDiagnostics, OutlineSummary, StageDiagnostics, StageMetrics};
pub use footprint::{Footprint, FootprintOutline, FootprintResolution, Pad, build_footprint_outline};
pub use intersect::find_self_intersections;
pub use outline::{OutlineBuild, convert_outline_to_polygon};
pub use primitive::{Primitive, PrimitiveId, Shape, ShapeKind};
pub use types::{
    BoundingBox, Contour, OutlineConfig, OutlineError, Point, PolygonWithHoles, Transform,
};
