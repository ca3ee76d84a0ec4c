//! SVG view sink.
//!
//! Lays a [`RenderTree`] out as a standalone SVG document. Colors are CSS
//! strings and are emitted verbatim, so `var(--…)` references keep working
//! when the document is inlined into a themed page.

use crate::card::ViewSink;
use crate::config::{Columns, Direction};
use crate::error::Result;
use crate::render::{BarDescriptor, Layout, RenderTree};
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Default document width in pixels.
pub const DEFAULT_WIDTH: f64 = 400.0;

const PADDING: f64 = 16.0;
const HEADER_HEIGHT: f64 = 32.0;
const LABEL_HEIGHT: f64 = 20.0;
const FONT_SIZE: f64 = 13.0;
const HEADER_FONT_SIZE: f64 = 16.0;
const TRACK_COLOR: &str = "rgba(127,127,127,0.2)";
const TEXT_COLOR: &str = "var(--primary-text-color)";

/// How a shape is filled.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    /// Plain CSS color.
    Color(String),
    /// Reference to a gradient in `<defs>`.
    Gradient(String),
}

impl Paint {
    fn to_attr(&self) -> String {
        match self {
            Self::Color(c) => escape(c),
            Self::Gradient(id) => format!("url(#{id})"),
        }
    }
}

/// Text anchor position for SVG text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAnchor {
    /// Left aligned.
    #[default]
    Start,
    /// Centered.
    Middle,
    /// Right aligned.
    End,
}

/// An SVG element.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum SvgElement {
    /// Rounded rectangle.
    Rect { x: f64, y: f64, width: f64, height: f64, radius: f64, fill: Paint, class: &'static str },
    /// Circle.
    Circle { cx: f64, cy: f64, r: f64, fill: Paint, opacity: f64 },
    /// Text.
    Text { x: f64, y: f64, text: String, font_size: f64, fill: Paint, anchor: TextAnchor, class: &'static str },
}

/// Two-stop fill gradient, half to full opacity along the bar.
#[derive(Debug, Clone, PartialEq)]
pub struct FillGradient {
    /// Element id.
    pub id: String,
    /// CSS color.
    pub color: String,
    /// Direction of the bar the gradient belongs to.
    pub direction: Direction,
}

/// An SVG document under construction.
#[derive(Debug, Clone, Default)]
pub struct SvgDocument {
    width: f64,
    height: f64,
    gradients: Vec<FillGradient>,
    elements: Vec<SvgElement>,
}

impl SvgDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, gradients: Vec::new(), elements: Vec::new() }
    }

    /// Lay out a render tree.
    #[must_use]
    pub fn compose(tree: &RenderTree, width: f64) -> Self {
        let mut doc = Self::new(width, 0.0);
        let mut y = PADDING;

        if let Some(header) = &tree.header {
            doc.push(SvgElement::Text {
                x: PADDING,
                y: y + HEADER_FONT_SIZE,
                text: header.clone(),
                font_size: HEADER_FONT_SIZE,
                fill: Paint::Color(TEXT_COLOR.to_string()),
                anchor: TextAnchor::Start,
                class: "header",
            });
            y += HEADER_HEIGHT;
        }

        y = match tree.layout.direction {
            Direction::Horizontal => doc.horizontal(tree, y),
            Direction::Vertical => doc.vertical(tree, y),
        };
        doc.height = y + PADDING;
        doc
    }

    /// Document height in pixels.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Elements in paint order.
    #[must_use]
    pub fn elements(&self) -> &[SvgElement] {
        &self.elements
    }

    /// Gradients referenced by fills.
    #[must_use]
    pub fn gradients(&self) -> &[FillGradient] {
        &self.gradients
    }

    /// Add a raw element.
    pub fn push(&mut self, element: SvgElement) {
        self.elements.push(element);
    }

    fn horizontal(&mut self, tree: &RenderTree, mut y: f64) -> f64 {
        let layout = &tree.layout;
        let track_width = (self.width - 2.0 * PADDING).max(0.0);

        for (i, bar) in tree.bars.iter().enumerate() {
            if i > 0 {
                y += layout.bar_spacing;
            }
            if layout.shows_label() || layout.show_value {
                let baseline = y + FONT_SIZE;
                self.label(layout, bar, PADDING, baseline, TextAnchor::Start);
                if layout.show_value {
                    self.value(bar, self.width - PADDING, baseline, TextAnchor::End);
                }
                y += LABEL_HEIGHT;
            }

            self.track(PADDING, y, track_width, layout.bar_height, layout.bar_height / 2.0);
            if bar.show_fill {
                let fill_width = track_width * bar.percentage / 100.0;
                let id = self.gradient(bar, Direction::Horizontal);
                self.push(SvgElement::Rect {
                    x: PADDING,
                    y,
                    width: fill_width,
                    height: layout.bar_height,
                    radius: layout.bar_height / 2.0,
                    fill: Paint::Gradient(id),
                    class: "fill",
                });
                self.glow(bar, PADDING + fill_width, y + layout.bar_height / 2.0, layout.glow_size);
            }
            y += layout.bar_height;
        }
        y
    }

    fn vertical(&mut self, tree: &RenderTree, top: f64) -> f64 {
        let layout = &tree.layout;
        let count = tree.bars.len().max(1);
        let columns = match layout.columns {
            Columns::Auto => count,
            Columns::Fixed(n) => (n as usize).clamp(1, count),
        };
        let cell_width = (self.width - 2.0 * PADDING) / columns as f64;
        let value_band = if layout.show_value { LABEL_HEIGHT } else { 0.0 };
        let label_band = if layout.shows_label() { LABEL_HEIGHT } else { 0.0 };
        let row_height = value_band + layout.track_length + label_band;

        let mut bottom = top;
        for (i, bar) in tree.bars.iter().enumerate() {
            let (row, col) = (i / columns, i % columns);
            let cx = PADDING + cell_width * (col as f64 + 0.5);
            let y = top + row as f64 * (row_height + layout.bar_spacing);

            if layout.show_value {
                self.value(bar, cx, y + FONT_SIZE, TextAnchor::Middle);
            }
            let track_top = y + value_band;
            let x = cx - layout.bar_height / 2.0;
            self.track(x, track_top, layout.bar_height, layout.track_length, layout.bar_height / 2.0);
            if bar.show_fill {
                let fill_height = layout.track_length * bar.percentage / 100.0;
                let fill_top = track_top + layout.track_length - fill_height;
                let id = self.gradient(bar, Direction::Vertical);
                self.push(SvgElement::Rect {
                    x,
                    y: fill_top,
                    width: layout.bar_height,
                    height: fill_height,
                    radius: layout.bar_height / 2.0,
                    fill: Paint::Gradient(id),
                    class: "fill",
                });
                self.glow(bar, cx, fill_top, layout.glow_size);
            }
            if layout.shows_label() {
                let baseline = track_top + layout.track_length + FONT_SIZE + 4.0;
                self.label(layout, bar, cx, baseline, TextAnchor::Middle);
            }
            bottom = bottom.max(y + row_height);
        }
        bottom
    }

    fn track(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64) {
        self.push(SvgElement::Rect {
            x,
            y,
            width,
            height,
            radius,
            fill: Paint::Color(TRACK_COLOR.to_string()),
            class: "track",
        });
    }

    fn gradient(&mut self, bar: &BarDescriptor, direction: Direction) -> String {
        let id = format!("bar-fill-{}", bar.index);
        self.gradients.push(FillGradient { id: id.clone(), color: bar.color.clone(), direction });
        id
    }

    fn glow(&mut self, bar: &BarDescriptor, cx: f64, cy: f64, size: f64) {
        self.push(SvgElement::Circle { cx, cy, r: size / 2.0, fill: Paint::Color(bar.color.clone()), opacity: 0.6 });
    }

    fn label(&mut self, layout: &Layout, bar: &BarDescriptor, x: f64, y: f64, anchor: TextAnchor) {
        let mut parts = Vec::with_capacity(2);
        if layout.show_icon {
            if let Some(icon) = &bar.icon {
                parts.push(icon.as_str());
            }
        }
        if layout.show_name {
            parts.push(bar.name.as_str());
        }
        if parts.is_empty() {
            return;
        }
        self.push(SvgElement::Text {
            x,
            y,
            text: parts.join(" "),
            font_size: FONT_SIZE,
            fill: Paint::Color(TEXT_COLOR.to_string()),
            anchor,
            class: "label",
        });
    }

    fn value(&mut self, bar: &BarDescriptor, x: f64, y: f64, anchor: TextAnchor) {
        let text = if bar.available && !bar.unit.is_empty() {
            format!("{} {}", bar.text, bar.unit)
        } else {
            bar.text.clone()
        };
        self.push(SvgElement::Text {
            x,
            y,
            text,
            font_size: FONT_SIZE,
            fill: Paint::Color(bar.color.clone()),
            anchor,
            class: "value",
        });
    }

    /// Render to an SVG string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut svg = String::with_capacity(2048);

        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );

        if !self.gradients.is_empty() {
            svg.push_str("  <defs>\n");
            for g in &self.gradients {
                let _ = writeln!(svg, "    {}", gradient_to_svg(g));
            }
            svg.push_str("  </defs>\n");
        }

        for element in &self.elements {
            let _ = writeln!(svg, "  {}", element_to_svg(element));
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn gradient_to_svg(g: &FillGradient) -> String {
    let (x1, y1, x2, y2) = match g.direction {
        Direction::Horizontal => (0, 0, 1, 0),
        Direction::Vertical => (0, 1, 0, 0),
    };
    let color = escape(&g.color);
    format!(
        r#"<linearGradient id="{id}" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}"><stop offset="0%" stop-color="{color}" stop-opacity="0.5"/><stop offset="100%" stop-color="{color}" stop-opacity="1"/></linearGradient>"#,
        id = g.id
    )
}

fn element_to_svg(element: &SvgElement) -> String {
    match element {
        SvgElement::Rect { x, y, width, height, radius, fill, class } => format!(
            r#"<rect class="{class}" x="{x:.2}" y="{y:.2}" width="{width:.2}" height="{height:.2}" rx="{radius:.2}" fill="{}"/>"#,
            fill.to_attr()
        ),
        SvgElement::Circle { cx, cy, r, fill, opacity } => format!(
            r#"<circle class="glow" cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}" opacity="{opacity}"/>"#,
            fill.to_attr()
        ),
        SvgElement::Text { x, y, text, font_size, fill, anchor, class } => {
            let anchor = match anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            format!(
                r#"<text class="{class}" x="{x:.2}" y="{y:.2}" font-size="{font_size}" fill="{}" text-anchor="{anchor}">{}</text>"#,
                fill.to_attr(),
                escape(text)
            )
        }
    }
}

/// Escape text for use in XML content and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Sink
// ============================================================================

/// [`ViewSink`] that keeps the latest frame as an SVG document.
#[derive(Debug, Clone)]
pub struct SvgSink {
    width: f64,
    document: String,
    frames: u64,
}

impl Default for SvgSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgSink {
    /// Create a sink with the default width.
    #[must_use]
    pub fn new() -> Self {
        Self { width: DEFAULT_WIDTH, document: String::new(), frames: 0 }
    }

    /// Set the document width in pixels.
    #[must_use]
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Latest painted document (empty before the first frame).
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Number of frames painted.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Write the latest document to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file writing fails.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.document.as_bytes())?;
        Ok(())
    }
}

impl ViewSink for SvgSink {
    fn paint(&mut self, tree: &RenderTree) -> Result<()> {
        self.document = SvgDocument::compose(tree, self.width).render();
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardConfig;
    use crate::provider::{EntityState, StateSnapshot};
    use crate::render::plan;
    use std::collections::BTreeMap;

    fn tree(yaml: &str, snapshot: &StateSnapshot) -> RenderTree {
        plan(&CardConfig::from_yaml(yaml).unwrap(), snapshot, &BTreeMap::new())
    }

    fn fills(doc: &SvgDocument) -> Vec<f64> {
        doc.elements()
            .iter()
            .filter_map(|e| match e {
                SvgElement::Rect { class: "fill", width, height, .. } => Some(width.max(*height)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_horizontal_fill_width() {
        let snapshot = StateSnapshot::new().with("a", EntityState::new("50"));
        let doc = SvgDocument::compose(&tree("entities: [a]", &snapshot), 232.0);

        assert_eq!(fills(&doc), vec![100.0]);
        assert_eq!(doc.gradients().len(), 1);
    }

    #[test]
    fn test_unavailable_bar_has_track_only() {
        let doc = SvgDocument::compose(&tree("entities: [a]", &StateSnapshot::new()), DEFAULT_WIDTH);

        assert!(fills(&doc).is_empty());
        assert!(doc.gradients().is_empty());
        assert!(doc.elements().iter().any(|e| matches!(e, SvgElement::Rect { class: "track", .. })));
    }

    #[test]
    fn test_vertical_fill_height() {
        let snapshot = StateSnapshot::new().with("a", EntityState::new("25"));
        let doc = SvgDocument::compose(&tree("direction: vertical\nentities: [a]", &snapshot), DEFAULT_WIDTH);

        assert_eq!(fills(&doc), vec![30.0]);
        assert_eq!(doc.gradients()[0].direction, Direction::Vertical);
    }

    #[test]
    fn test_vertical_columns_wrap_rows() {
        let one_row = SvgDocument::compose(
            &tree("direction: vertical\nentities: [a, b, c, d]", &StateSnapshot::new()),
            DEFAULT_WIDTH,
        );
        let two_rows = SvgDocument::compose(
            &tree("direction: vertical\ncolumns: 2\nentities: [a, b, c, d]", &StateSnapshot::new()),
            DEFAULT_WIDTH,
        );
        assert!(two_rows.height() > one_row.height());
    }

    #[test]
    fn test_render_document() {
        let snapshot =
            StateSnapshot::new().with("a", EntityState::new("40").friendly_name("Fish & Chips").unit("%"));
        let svg = SvgDocument::compose(&tree("name: Card\nentities: [a]", &snapshot), DEFAULT_WIDTH).render();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>\n"));
        assert!(svg.contains("Fish &amp; Chips"));
        assert!(svg.contains(">40 %</text>"));
        assert!(svg.contains(r#"stop-opacity="0.5""#));
        assert!(svg.contains("url(#bar-fill-0)"));
        assert!(svg.contains(">Card</text>"));
    }

    #[test]
    fn test_hidden_labels_and_values() {
        let snapshot = StateSnapshot::new().with("a", EntityState::new("40"));
        let doc = SvgDocument::compose(
            &tree("show_name: false\nshow_icon: false\nshow_value: false\nentities: [a]", &snapshot),
            DEFAULT_WIDTH,
        );
        assert!(!doc.elements().iter().any(|e| matches!(e, SvgElement::Text { .. })));
    }

    #[test]
    fn test_sink_write_to_file() {
        let mut sink = SvgSink::new().with_width(300.0);
        let snapshot = StateSnapshot::new().with("a", EntityState::new("10"));
        sink.paint(&tree("entities: [a]", &snapshot)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.svg");
        sink.write_to_file(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), sink.document());
        assert_eq!(sink.frames(), 1);
        assert!(sink.document().contains(r#"width="300""#));
    }
}
