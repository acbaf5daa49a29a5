//! Board-level reconstruction: pick the edge-cuts primitives out of a
//! board, assemble them, and substitute a bounding rectangle when that
//! fails.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diagnostics::OutlineDiagnostics;
use crate::footprint::Footprint;
use crate::outline::convert_outline_to_polygon;
use crate::primitive::Primitive;
use crate::types::{BoundingBox, OutlineConfig, OutlineError, Point, PolygonWithHoles};

/// Drawing layer of a board item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// The layer that defines the physical board boundary.
    EdgeCuts,
    /// Top copper.
    FrontCopper,
    /// Bottom copper.
    BackCopper,
    /// Top silkscreen.
    FrontSilkscreen,
    /// Bottom silkscreen.
    BackSilkscreen,
    /// Any other named layer.
    Other(String),
}

/// One graphic item on a board or inside a footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardItem {
    /// Layer the item is drawn on.
    pub layer: Layer,
    /// The item's geometry.
    pub primitive: Primitive,
}

impl BoardItem {
    /// Create an item on `layer`.
    #[must_use]
    pub const fn new(layer: Layer, primitive: Primitive) -> Self {
        Self { layer, primitive }
    }

    /// Shorthand for an item on [`Layer::EdgeCuts`].
    #[must_use]
    pub const fn edge(primitive: Primitive) -> Self {
        Self::new(Layer::EdgeCuts, primitive)
    }

    /// Returns `true` if the item is on the board boundary layer.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.layer == Layer::EdgeCuts
    }
}

/// Graphic items and footprints making up a board.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Board {
    /// Free-standing graphic items.
    #[serde(default)]
    pub items: Vec<BoardItem>,
    /// Placed footprints.
    #[serde(default)]
    pub footprints: Vec<Footprint>,
}

impl Board {
    /// Every item on the board, footprint items included.
    pub fn all_items(&self) -> impl Iterator<Item = &BoardItem> {
        self.items
            .iter()
            .chain(self.footprints.iter().flat_map(|f| f.items.iter()))
    }

    /// Primitives on [`Layer::EdgeCuts`], board items first, then
    /// footprint items in footprint order.
    #[must_use]
    pub fn edge_primitives(&self) -> Vec<Primitive> {
        self.all_items()
            .filter(|item| item.is_edge())
            .map(|item| item.primitive.clone())
            .collect()
    }

    /// Area covered by the edge-cuts items.
    #[must_use]
    pub fn edges_bounding_box(&self, max_arc_error: f64) -> Option<BoundingBox> {
        union_all(
            self.all_items()
                .filter(|item| item.is_edge())
                .filter_map(|item| item.primitive.bounding_box(max_arc_error)),
        )
    }

    /// Area covered by every item and pad on the board.
    #[must_use]
    pub fn bounding_box(&self, max_arc_error: f64) -> Option<BoundingBox> {
        let items = self
            .all_items()
            .filter_map(|item| item.primitive.bounding_box(max_arc_error));
        let pads = self
            .footprints
            .iter()
            .filter_map(Footprint::pads_bounding_box);
        union_all(items.chain(pads))
    }
}

/// Union of every box, or `None` if there are none.
pub(crate) fn union_all(boxes: impl IntoIterator<Item = BoundingBox>) -> Option<BoundingBox> {
    boxes.into_iter().reduce(BoundingBox::union)
}

/// Why a board outline fell back to a bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// No items on the edge-cuts layer.
    NoEdges,
    /// The outline did not close.
    IncompleteOutline,
    /// A chain reached an inherently closed primitive.
    UnsupportedPrimitive,
}

/// Result of board outline reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardOutline {
    /// The reconstructed outline, or the fallback rectangle.
    pub polygon: PolygonWithHoles,
    /// `true` when the edges formed closed, non-intersecting rings.
    pub success: bool,
    /// `true` when the reconstructed rings intersect. The geometry is
    /// still the reconstructed one.
    pub self_intersecting: bool,
    /// Set when `polygon` is the fallback rectangle.
    pub fallback: Option<FallbackReason>,
    /// Problem points and messages.
    pub diagnostics: OutlineDiagnostics,
}

/// Build the outline of `board` from its edge-cuts items.
///
/// Never fails for geometric reasons: when there are no edges, the
/// outline does not close, or a chain reaches a closed primitive, the
/// result is a rectangle around the edges (or around everything on the
/// board if the edges have no area), grown to a minimum size if still
/// degenerate.
///
/// # Errors
///
/// Returns [`OutlineError::InvalidConfig`] if `config` is invalid.
pub fn build_board_outline(
    board: &Board,
    config: &OutlineConfig,
) -> Result<BoardOutline, OutlineError> {
    config.validate()?;

    let edges = board.edge_primitives();
    debug!(edges = edges.len(), "collected edge-cuts primitives");

    if edges.is_empty() {
        let mut diagnostics = OutlineDiagnostics::default();
        diagnostics.message("no edges found on the edge cuts layer");
        return Ok(fallback(board, config, FallbackReason::NoEdges, diagnostics));
    }

    let build = match convert_outline_to_polygon(&edges, config) {
        Ok(build) => build,
        Err(err @ OutlineError::UnsupportedPrimitive { .. }) => {
            warn!(%err, "board outline aborted");
            let mut diagnostics = OutlineDiagnostics::default();
            diagnostics.summary.primitive_count = edges.len();
            diagnostics.message(err.to_string());
            return Ok(fallback(
                board,
                config,
                FallbackReason::UnsupportedPrimitive,
                diagnostics,
            ));
        }
        Err(err) => return Err(err),
    };

    match build.polygon() {
        Some(polygon) if build.complete => Ok(BoardOutline {
            polygon,
            success: build.is_success(),
            self_intersecting: build.self_intersecting,
            fallback: None,
            diagnostics: build.diagnostics,
        }),
        _ => Ok(fallback(
            board,
            config,
            FallbackReason::IncompleteOutline,
            build.diagnostics,
        )),
    }
}

/// The rectangle used when the edges cannot be assembled.
#[must_use]
pub fn board_fallback_box(board: &Board, config: &OutlineConfig) -> BoundingBox {
    let mut bbox = board
        .edges_bounding_box(config.max_arc_error)
        .filter(|b| !b.is_degenerate())
        .or_else(|| board.bounding_box(config.max_arc_error))
        .unwrap_or_else(|| BoundingBox::at(Point::new(0.0, 0.0)));

    if bbox.is_degenerate() {
        bbox = bbox.inflate(config.degenerate_inflation, config.degenerate_inflation);
    }
    bbox
}

fn fallback(
    board: &Board,
    config: &OutlineConfig,
    reason: FallbackReason,
    diagnostics: OutlineDiagnostics,
) -> BoardOutline {
    let bbox = board_fallback_box(board, config);
    debug!(
        ?reason,
        min_x = bbox.min.x,
        min_y = bbox.min.y,
        max_x = bbox.max.x,
        max_y = bbox.max.y,
        "using bounding box as board outline"
    );
    BoardOutline {
        polygon: PolygonWithHoles::new(bbox.to_contour()),
        success: false,
        self_intersecting: false,
        fallback: Some(reason),
        diagnostics,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::footprint::Pad;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn square_edges(size: f64) -> Vec<BoardItem> {
        vec![
            BoardItem::edge(Primitive::segment(p(0.0, 0.0), p(size, 0.0))),
            BoardItem::edge(Primitive::segment(p(size, 0.0), p(size, size))),
            BoardItem::edge(Primitive::segment(p(size, size), p(0.0, size))),
            BoardItem::edge(Primitive::segment(p(0.0, size), p(0.0, 0.0))),
        ]
    }

    // --- Board tests ---

    #[test]
    fn edge_primitives_include_footprint_edges() {
        let mut board = Board {
            items: square_edges(10.0),
            footprints: Vec::new(),
        };
        board.items.push(BoardItem::new(
            Layer::FrontSilkscreen,
            Primitive::segment(p(1.0, 1.0), p(2.0, 2.0)),
        ));
        board.footprints.push(Footprint {
            reference: "J1".to_string(),
            pads: Vec::new(),
            items: vec![BoardItem::edge(Primitive::circle(p(5.0, 5.0), 1.0))],
        });
        assert_eq!(board.edge_primitives().len(), 5);
    }

    #[test]
    fn bounding_box_includes_pads() {
        let board = Board {
            items: square_edges(10.0),
            footprints: vec![Footprint {
                reference: "U1".to_string(),
                pads: vec![Pad::rect(p(20.0, 20.0), 2.0, 2.0)],
                items: Vec::new(),
            }],
        };
        let bb = board.bounding_box(0.01).unwrap();
        assert_eq!(bb.max, p(21.0, 21.0));
        assert_eq!(board.edges_bounding_box(0.01).unwrap().max, p(10.0, 10.0));
    }

    // --- build_board_outline tests ---

    #[test]
    fn closed_square_is_used_as_is() {
        let board = Board {
            items: square_edges(10.0),
            footprints: Vec::new(),
        };
        let result = build_board_outline(&board, &OutlineConfig::default()).unwrap();
        assert!(result.success);
        assert_eq!(result.fallback, None);
        assert_eq!(result.polygon.outline.len(), 4);
    }

    #[test]
    fn no_edges_falls_back_to_item_box() {
        let board = Board {
            items: vec![BoardItem::new(
                Layer::FrontCopper,
                Primitive::rect(p(1.0, 2.0), p(5.0, 8.0)),
            )],
            footprints: Vec::new(),
        };
        let result = build_board_outline(&board, &OutlineConfig::default()).unwrap();
        assert!(!result.success);
        assert_eq!(result.fallback, Some(FallbackReason::NoEdges));
        assert_eq!(
            result.polygon.outline.points(),
            &[p(1.0, 2.0), p(1.0, 8.0), p(5.0, 8.0), p(5.0, 2.0)]
        );
        assert_eq!(
            result.diagnostics.messages,
            vec!["no edges found on the edge cuts layer".to_string()]
        );
    }

    #[test]
    fn empty_board_gets_minimum_box() {
        let result = build_board_outline(&Board::default(), &OutlineConfig::default()).unwrap();
        assert_eq!(result.fallback, Some(FallbackReason::NoEdges));
        assert_eq!(
            result.polygon.outline.points(),
            &[p(-1.0, -1.0), p(-1.0, 1.0), p(1.0, 1.0), p(1.0, -1.0)]
        );
    }

    #[test]
    fn open_edges_fall_back_to_edge_box() {
        let mut items = square_edges(10.0);
        items.pop();
        let board = Board {
            items,
            footprints: Vec::new(),
        };
        let result = build_board_outline(&board, &OutlineConfig::default()).unwrap();
        assert_eq!(result.fallback, Some(FallbackReason::IncompleteOutline));
        assert_eq!(result.diagnostics.discontinuities.len(), 1);
        assert_eq!(result.polygon.outline.points()[2], p(10.0, 10.0));
    }

    #[test]
    fn zero_radius_circle_edge_falls_back() {
        let board = Board {
            items: vec![
                BoardItem::edge(Primitive::circle(p(5.0, 5.0), 0.0)),
                BoardItem::new(Layer::FrontCopper, Primitive::rect(p(0.0, 0.0), p(10.0, 10.0))),
            ],
            footprints: Vec::new(),
        };
        let result = build_board_outline(&board, &OutlineConfig::default()).unwrap();
        assert!(!result.success);
        assert_eq!(result.fallback, Some(FallbackReason::IncompleteOutline));
        assert_eq!(result.polygon.outline.len(), 4);
        assert_eq!(
            result.polygon.outline.points(),
            &[p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)]
        );
        assert!(result.diagnostics.messages[0].contains("degenerate circle"));
    }

    #[test]
    fn single_line_edge_uses_all_items_box() {
        let board = Board {
            items: vec![
                BoardItem::edge(Primitive::segment(p(0.0, 0.0), p(10.0, 0.0))),
                BoardItem::new(Layer::FrontCopper, Primitive::circle(p(5.0, 5.0), 5.0)),
            ],
            footprints: Vec::new(),
        };
        let bbox = board_fallback_box(&board, &OutlineConfig::default());
        assert_eq!(bbox.min, p(0.0, 0.0));
        assert_eq!(bbox.max, p(10.0, 10.0));
    }

    #[test]
    fn unsupported_primitive_falls_back() {
        let board = Board {
            items: vec![
                BoardItem::edge(Primitive::segment(p(0.0, 0.0), p(10.0, 0.0))),
                BoardItem::edge(Primitive::rect(p(0.0, 0.0), p(5.0, 5.0))),
            ],
            footprints: Vec::new(),
        };
        let result = build_board_outline(&board, &OutlineConfig::default()).unwrap();
        assert_eq!(result.fallback, Some(FallbackReason::UnsupportedPrimitive));
        assert!(result.diagnostics.messages[0].contains("unsupported rect"));
    }

    #[test]
    fn layer_serde_names() {
        let json = serde_json::to_string(&Layer::EdgeCuts).unwrap();
        assert_eq!(json, r#""edge_cuts""#);
        let other: Layer = serde_json::from_str(r#"{"other": "User.1"}"#).unwrap();
        assert_eq!(other, Layer::Other("User.1".to_string()));
    }
}
