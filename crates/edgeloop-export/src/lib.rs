//! edgeloop-export: Pure format serializers (sans-IO)
//!
//! Converts reconstructed outlines into output formats. Currently
//! supports SVG, with an optional diagnostic overlay.

pub mod svg;

pub use svg::{SvgMetadata, build_ring_data, to_diagnostic_svg, to_svg};
