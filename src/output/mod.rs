//! View sinks (SVG, terminal).

mod svg;
#[cfg(feature = "terminal")]
mod terminal;

pub use svg::{FillGradient, Paint, SvgDocument, SvgElement, SvgSink, TextAnchor, DEFAULT_WIDTH};
#[cfg(feature = "terminal")]
pub use terminal::{terminal_color, BarChart, TerminalSink};
