//! SVG export serializer.
//!
//! Converts a [`PolygonWithHoles`] into an SVG string using the [`svg`]
//! crate for document construction, XML escaping, and path data
//! formatting.
//!
//! The outline and every hole become closed subpaths of a single
//! `<path>` with `fill-rule="evenodd"`, so holes render as cut-outs.
//! Board coordinates are emitted unchanged; the `viewBox` is the
//! bounding box of the geometry plus a small margin.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

use edgeloop_outline::{BoundingBox, Contour, OutlineDiagnostics, Point, PolygonWithHoles};

/// Fraction of the larger extent added around the geometry on each side.
const MARGIN_RATIO: f64 = 0.05;
/// Diagnostic marker radius as a fraction of the larger extent.
const MARKER_RATIO: f64 = 0.01;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the board file name without extension.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized [`edgeloop_outline::OutlineConfig`] JSON, emitted inside
    /// `<metadata>` wrapped in a namespaced `<edgeloop:outline>` element.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string for one closed ring.
///
/// Uses `M` for the first point, `L` for the rest and closes the ring.
/// Returns an empty string for rings with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use edgeloop_outline::{Contour, Point};
/// use edgeloop_export::build_ring_data;
///
/// let ring = Contour::new(vec![
///     Point::new(0.0, 0.0),
///     Point::new(10.0, 0.0),
///     Point::new(10.0, 5.0),
/// ]);
/// assert!(build_ring_data(&ring).starts_with("M0,0 L10,0 L10,5"));
/// ```
#[must_use]
pub fn build_ring_data(ring: &Contour) -> String {
    ring_data(ring, Data::new()).map_or_else(String::new, |data| String::from(Value::from(data)))
}

fn ring_data(ring: &Contour, data: Data) -> Option<Data> {
    let points = ring.points();
    if points.len() < 2 {
        return None;
    }
    let first = points[0];
    let mut data = data.move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    Some(data.close())
}

/// Path data for the outline followed by every hole.
fn polygon_data(polygon: &PolygonWithHoles) -> Option<Data> {
    let mut data = Data::new();
    let mut any = false;
    for ring in polygon.rings() {
        if let Some(next) = ring_data(ring, data.clone()) {
            data = next;
            any = true;
        }
    }
    any.then_some(data)
}

/// Area shown by the document: the given points plus a margin.
fn view_box(points: impl IntoIterator<Item = Point>) -> BoundingBox {
    let bbox = BoundingBox::from_points(points)
        .unwrap_or_else(|| BoundingBox::at(Point::new(0.0, 0.0)));
    let extent = bbox.width().max(bbox.height()).max(1.0);
    let margin = extent * MARGIN_RATIO;
    bbox.inflate(margin, margin)
}

/// Start a document sized to `view` with the metadata elements attached.
fn document(view: &BoundingBox, metadata: &SvgMetadata<'_>) -> Document {
    let mut doc = Document::new()
        .set("width", format!("{}mm", view.width()))
        .set("height", format!("{}mm", view.height()))
        .set(
            "viewBox",
            format!(
                "{} {} {} {}",
                view.min.x,
                view.min.y,
                view.width(),
                view.height()
            ),
        );

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut outline_el = Element::new("edgeloop:outline");
        outline_el.assign("xmlns:edgeloop", "https://edgeloop.dev/ns/1");
        outline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(outline_el);
        doc = doc.add(metadata_el);
    }
    doc
}

fn finish(doc: &Document) -> String {
    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

fn polygon_points(polygon: &PolygonWithHoles) -> impl Iterator<Item = Point> + '_ {
    polygon.rings().flat_map(|ring| ring.points().iter().copied())
}

/// Serialize a polygon with holes into an SVG document string.
///
/// Rings with fewer than 2 points are skipped. A polygon with no
/// drawable ring produces a document with no `<path>`.
///
/// # Examples
///
/// ```
/// use edgeloop_outline::{BoundingBox, Point, PolygonWithHoles};
/// use edgeloop_export::{SvgMetadata, to_svg};
///
/// let square = BoundingBox {
///     min: Point::new(0.0, 0.0),
///     max: Point::new(10.0, 10.0),
/// };
/// let polygon = PolygonWithHoles::new(square.to_contour());
/// let metadata = SvgMetadata {
///     title: Some("panel"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&polygon, &metadata);
/// assert!(svg.contains("<title>panel</title>"));
/// assert!(svg.contains("<path"));
/// ```
#[must_use]
pub fn to_svg(polygon: &PolygonWithHoles, metadata: &SvgMetadata<'_>) -> String {
    let view = view_box(polygon_points(polygon));
    let mut doc = document(&view, metadata);

    if let Some(data) = polygon_data(polygon) {
        let path = Path::new()
            .set("d", data)
            .set("fill", "none")
            .set("fill-rule", "evenodd")
            .set("stroke", "black")
            .set("stroke-width", 0.1);
        doc = doc.add(path);
    }

    finish(&doc)
}

/// Serialize a polygon into a diagnostic SVG with problem locations marked.
///
/// Renders the geometry like [`to_svg`] on a dark background, then adds
/// a red circle for each discontinuity under `<g id="discontinuities">`
/// and an orange circle for each self-intersection under
/// `<g id="intersections">`. Each marker carries `data-x`, `data-y`, and
/// `data-index` attributes for programmatic inspection.
#[must_use]
pub fn to_diagnostic_svg(
    polygon: &PolygonWithHoles,
    diagnostics: &OutlineDiagnostics,
    metadata: &SvgMetadata<'_>,
) -> String {
    let view = view_box(
        polygon_points(polygon)
            .chain(diagnostics.discontinuities.iter().copied())
            .chain(diagnostics.intersections.iter().copied()),
    );
    let marker_radius = view.width().max(view.height()) * MARKER_RATIO;
    let mut doc = document(&view, metadata);

    doc = doc.add(
        Rectangle::new()
            .set("x", view.min.x)
            .set("y", view.min.y)
            .set("width", view.width())
            .set("height", view.height())
            .set("fill", "#1a1a1a"),
    );

    let mut rings = Group::new()
        .set("id", "rings")
        .set("stroke", "white")
        .set("stroke-width", marker_radius / 4.0)
        .set("fill", "none");
    for (index, ring) in polygon.rings().enumerate() {
        if let Some(data) = ring_data(ring, Data::new()) {
            rings = rings.add(
                Path::new()
                    .set("d", data)
                    .set("data-role", if index == 0 { "outline" } else { "hole" }),
            );
        }
    }
    doc = doc.add(rings);

    if !diagnostics.discontinuities.is_empty() {
        doc = doc.add(markers(
            "discontinuities",
            "red",
            &diagnostics.discontinuities,
            marker_radius,
        ));
    }
    if !diagnostics.intersections.is_empty() {
        doc = doc.add(markers(
            "intersections",
            "orange",
            &diagnostics.intersections,
            marker_radius,
        ));
    }

    finish(&doc)
}

fn markers(id: &str, color: &str, points: &[Point], radius: f64) -> Group {
    points.iter().enumerate().fold(
        Group::new()
            .set("id", id)
            .set("fill", "none")
            .set("stroke", color)
            .set("stroke-width", radius / 3.0),
        |group, (index, p)| {
            group.add(
                Circle::new()
                    .set("cx", p.x)
                    .set("cy", p.y)
                    .set("r", radius)
                    .set("data-x", p.x)
                    .set("data-y", p.y)
                    .set("data-index", index.to_string()),
            )
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
        BoundingBox {
            min: Point::new(x0, y0),
            max: Point::new(x1, y1),
        }
        .to_contour()
    }

    fn no_meta() -> SvgMetadata<'static> {
        SvgMetadata::default()
    }

    // --- build_ring_data ---

    #[test]
    fn ring_data_empty_ring() {
        assert_eq!(build_ring_data(&Contour::new(vec![])), "");
    }

    #[test]
    fn ring_data_single_point() {
        assert_eq!(build_ring_data(&Contour::new(vec![Point::new(1.0, 2.0)])), "");
    }

    #[test]
    fn ring_data_is_closed() {
        let d = build_ring_data(&Contour::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]));
        assert!(d.starts_with("M0,0 L10,0 L10,10"), "{d}");
        assert!(d.to_ascii_lowercase().trim_end().ends_with('z'), "{d}");
    }

    // --- to_svg ---

    #[test]
    fn empty_polygon_has_no_path() {
        let svg = to_svg(&PolygonWithHoles::new(Contour::new(vec![])), &no_meta());
        assert!(svg.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains("<svg "));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn outline_and_hole_share_one_path() {
        let mut polygon = PolygonWithHoles::new(square(0.0, 0.0, 100.0, 50.0));
        polygon.holes.push(square(10.0, 10.0, 20.0, 20.0));
        let svg = to_svg(&polygon, &no_meta());
        assert_eq!(svg.matches("<path").count(), 1);
        assert_eq!(svg.matches('M').count(), 2);
        assert!(svg.contains(r#"fill-rule="evenodd""#));
    }

    #[test]
    fn viewbox_adds_margin_around_geometry() {
        let polygon = PolygonWithHoles::new(square(0.0, 0.0, 100.0, 50.0));
        let svg = to_svg(&polygon, &no_meta());
        assert!(svg.contains(r#"viewBox="-5 -5 110 60""#), "{svg}");
        assert!(svg.contains(r#"width="110mm""#));
    }

    #[test]
    fn title_and_desc_emitted() {
        let meta = SvgMetadata {
            title: Some("board"),
            description: Some("tolerance 0"),
            ..SvgMetadata::default()
        };
        let svg = to_svg(&PolygonWithHoles::new(square(0.0, 0.0, 1.0, 1.0)), &meta);
        assert!(svg.contains("<title>board</title>"));
        assert!(svg.contains("<desc>tolerance 0</desc>"));
        assert!(!svg.contains("<metadata>"));
    }

    #[test]
    fn config_json_is_escaped_inside_metadata() {
        let meta = SvgMetadata {
            config_json: Some(r#"{"note":"a<b"}"#),
            ..SvgMetadata::default()
        };
        let svg = to_svg(&PolygonWithHoles::new(square(0.0, 0.0, 1.0, 1.0)), &meta);
        assert!(svg.contains("<metadata>"));
        assert!(svg.contains("edgeloop:outline"));
        assert!(svg.contains("a&lt;b"));
    }

    // --- to_diagnostic_svg ---

    #[test]
    fn clean_diagnostics_have_no_marker_groups() {
        let polygon = PolygonWithHoles::new(square(0.0, 0.0, 10.0, 10.0));
        let svg = to_diagnostic_svg(&polygon, &OutlineDiagnostics::default(), &no_meta());
        assert!(svg.contains(r#"id="rings""#));
        assert!(svg.contains(r#"data-role="outline""#));
        assert!(!svg.contains("discontinuities"));
        assert!(!svg.contains("intersections"));
    }

    #[test]
    fn markers_are_emitted_per_problem() {
        let mut polygon = PolygonWithHoles::new(square(0.0, 0.0, 10.0, 10.0));
        polygon.holes.push(square(2.0, 2.0, 4.0, 4.0));
        let diagnostics = OutlineDiagnostics {
            discontinuities: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            intersections: vec![Point::new(5.0, 5.0)],
            ..OutlineDiagnostics::default()
        };
        let svg = to_diagnostic_svg(&polygon, &diagnostics, &no_meta());
        assert!(svg.contains(r#"id="discontinuities""#));
        assert!(svg.contains(r#"id="intersections""#));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains(r#"data-role="hole""#));
    }

    #[test]
    fn markers_outside_geometry_stay_in_view() {
        let polygon = PolygonWithHoles::new(square(0.0, 0.0, 10.0, 10.0));
        let diagnostics = OutlineDiagnostics {
            discontinuities: vec![Point::new(30.0, 10.0)],
            ..OutlineDiagnostics::default()
        };
        let svg = to_diagnostic_svg(&polygon, &diagnostics, &no_meta());
        assert!(svg.contains(r#"viewBox="-1.5 -1.5 33 13""#), "{svg}");
    }
}
