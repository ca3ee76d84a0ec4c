//! Terminal view sink (ratatui).
//!
//! [`BarChart`] draws a [`RenderTree`] into a ratatui buffer: horizontal bars
//! as one row each, vertical bars as block columns growing upwards.
//! [`TerminalSink`] wraps a [`Terminal`] so the card can paint into it directly.

use crate::card::ViewSink;
use crate::color::Rgba;
use crate::config::{Columns, Direction};
use crate::error::Result;
use crate::render::{BarDescriptor, RenderTree};
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;
use ratatui::Terminal;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Terminal color of a CSS color; anything unparseable is dark gray.
#[must_use]
pub fn terminal_color(css: &str) -> Color {
    Rgba::parse(css).map_or(Color::DarkGray, |c| Color::Rgb(c.r, c.g, c.b))
}

/// Widget drawing a render tree.
#[derive(Debug, Clone, Copy)]
pub struct BarChart<'a> {
    tree: &'a RenderTree,
}

impl<'a> BarChart<'a> {
    /// Wrap a render tree.
    #[must_use]
    pub fn new(tree: &'a RenderTree) -> Self {
        Self { tree }
    }

    fn label(&self, bar: &BarDescriptor) -> String {
        let layout = &self.tree.layout;
        let mut label = String::new();
        if layout.show_icon {
            if let Some(icon) = &bar.icon {
                label.push_str(icon.rsplit(':').next().unwrap_or(icon));
            }
        }
        if layout.show_name {
            if !label.is_empty() {
                label.push(' ');
            }
            label.push_str(&bar.name);
        }
        label
    }

    fn value(bar: &BarDescriptor) -> String {
        if bar.available && !bar.unit.is_empty() {
            format!("{} {}", bar.text, bar.unit)
        } else {
            bar.text.clone()
        }
    }

    fn render_horizontal(&self, area: Rect, buf: &mut Buffer) {
        let layout = &self.tree.layout;
        let labels: Vec<String> = self.tree.bars.iter().map(|b| self.label(b)).collect();
        let values: Vec<String> = self.tree.bars.iter().map(Self::value).collect();
        let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
        let value_width =
            if layout.show_value { values.iter().map(|v| v.chars().count()).max().unwrap_or(0) as u16 } else { 0 };

        let mut bar_width = area.width;
        if label_width > 0 {
            bar_width = bar_width.saturating_sub(label_width + 1);
        }
        if value_width > 0 {
            bar_width = bar_width.saturating_sub(value_width + 1);
        }

        for (i, bar) in self.tree.bars.iter().enumerate() {
            let y = area.y + i as u16;
            if y >= area.bottom() {
                break;
            }
            let mut x = area.x;
            if label_width > 0 {
                buf.set_stringn(x, y, &labels[i], label_width as usize, Style::default());
                x += label_width + 1;
            }

            let filled = if bar.show_fill { filled_cells(bar.percentage, bar_width) } else { 0 };
            let color = terminal_color(&bar.color);
            for c in 0..bar_width {
                let (symbol, style) = if c < filled {
                    (FILLED, Style::default().fg(color))
                } else {
                    (EMPTY, Style::default().fg(Color::DarkGray))
                };
                buf[(x + c, y)].set_char(symbol).set_style(style);
            }

            if value_width > 0 && x + bar_width + 1 < area.right() {
                let value = format!("{:>width$}", values[i], width = value_width as usize);
                buf.set_string(x + bar_width + 1, y, value, Style::default().fg(color));
            }
        }
    }

    fn render_vertical(&self, area: Rect, buf: &mut Buffer) {
        let layout = &self.tree.layout;
        let count = self.tree.bars.len().max(1);
        let columns = match layout.columns {
            Columns::Auto => count,
            Columns::Fixed(n) => (n as usize).clamp(1, count),
        };
        let rows = count.div_ceil(columns);
        let cell_width = (area.width as usize / columns).max(1) as u16;
        let row_height = area.height / rows as u16;
        let value_band = u16::from(layout.show_value);
        let label_band = u16::from(layout.shows_label());
        let track = row_height.saturating_sub(value_band + label_band);
        if track == 0 || cell_width == 0 {
            return;
        }

        for (i, bar) in self.tree.bars.iter().enumerate() {
            let (row, col) = ((i / columns) as u16, (i % columns) as u16);
            let x0 = area.x + col * cell_width;
            let y0 = area.y + row * row_height;
            let color = terminal_color(&bar.color);
            let width = cell_width.saturating_sub(1).max(1);

            if layout.show_value {
                buf.set_stringn(x0, y0, Self::value(bar), width as usize, Style::default().fg(color));
            }

            let filled = if bar.show_fill { filled_cells(bar.percentage, track) } else { 0 };
            let top = y0 + value_band;
            let bar_x = x0 + width / 2;
            for r in 0..track {
                let from_bottom = track - 1 - r;
                let (symbol, style) = if from_bottom < filled {
                    (FILLED, Style::default().fg(color))
                } else {
                    (EMPTY, Style::default().fg(Color::DarkGray))
                };
                buf[(bar_x, top + r)].set_char(symbol).set_style(style);
            }

            if layout.shows_label() {
                buf.set_stringn(x0, top + track, self.label(bar), width as usize, Style::default());
            }
        }
    }
}

fn filled_cells(percentage: f64, cells: u16) -> u16 {
    ((percentage / 100.0 * f64::from(cells)).round() as u16).min(cells)
}

impl Widget for BarChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let mut body = area;
        if let Some(header) = &self.tree.header {
            buf.set_stringn(
                area.x,
                area.y,
                header,
                area.width as usize,
                Style::default().add_modifier(Modifier::BOLD),
            );
            body.y += 1;
            body.height -= 1;
            if body.height == 0 {
                return;
            }
        }

        match self.tree.layout.direction {
            Direction::Horizontal => self.render_horizontal(body, buf),
            Direction::Vertical => self.render_vertical(body, buf),
        }
    }
}

/// [`ViewSink`] drawing every frame into a ratatui terminal.
#[derive(Debug)]
pub struct TerminalSink<B: Backend> {
    terminal: Terminal<B>,
}

impl<B: Backend> TerminalSink<B> {
    /// Wrap a terminal.
    pub fn new(terminal: Terminal<B>) -> Self {
        Self { terminal }
    }

    /// The wrapped terminal.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// The wrapped terminal, mutably (for restore on exit).
    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }
}

impl<B: Backend> ViewSink for TerminalSink<B> {
    fn paint(&mut self, tree: &RenderTree) -> Result<()> {
        self.terminal.draw(|frame| frame.render_widget(BarChart::new(tree), frame.area()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardConfig;
    use crate::provider::{EntityState, StateSnapshot};
    use crate::render::plan;
    use ratatui::backend::TestBackend;
    use std::collections::BTreeMap;

    fn tree(yaml: &str, snapshot: &StateSnapshot) -> RenderTree {
        plan(&CardConfig::from_yaml(yaml).unwrap(), snapshot, &BTreeMap::new())
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_terminal_color() {
        assert_eq!(terminal_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(terminal_color("green"), Color::Rgb(0, 128, 0));
        assert_eq!(terminal_color("var(--secondary-text-color)"), Color::DarkGray);
    }

    #[test]
    fn test_horizontal_bar_renders() {
        let snapshot = StateSnapshot::new().with("cpu", EntityState::new("50").unit("%"));
        let tree = tree("show_header: false\nentities: [cpu]", &snapshot);

        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        BarChart::new(&tree).render(area, &mut buf);

        let line = row(&buf, 0);
        assert!(line.starts_with("cpu "), "{line}");
        assert!(line.ends_with("50 %"), "{line}");
        // 20 - "cpu " - " 50 %" leaves 11 cells; half of them filled.
        assert_eq!(line.matches(FILLED).count(), 6);
        assert_eq!(line.matches(EMPTY).count(), 5);
    }

    #[test]
    fn test_unavailable_bar_is_empty() {
        let tree = tree("entities: [cpu]", &StateSnapshot::new());
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        BarChart::new(&tree).render(area, &mut buf);

        let line = row(&buf, 0);
        assert_eq!(line.matches(FILLED).count(), 0);
        assert!(line.contains("N/A"));
    }

    #[test]
    fn test_header_and_vertical_bars() {
        let snapshot = StateSnapshot::new().with("a", EntityState::new("100")).with("b", EntityState::new("0"));
        let tree = tree("name: Power\ndirection: vertical\nshow_value: false\nentities: [a, b]", &snapshot);

        let area = Rect::new(0, 0, 10, 6);
        let mut buf = Buffer::empty(area);
        BarChart::new(&tree).render(area, &mut buf);

        assert!(row(&buf, 0).starts_with("Power"));
        // Body: 5 rows = 4 track + 1 label. Column a is full, b is empty.
        for y in 1..5 {
            let line = row(&buf, y);
            assert_eq!(line.matches(FILLED).count(), 1, "row {y}: {line}");
            assert_eq!(line.matches(EMPTY).count(), 1, "row {y}: {line}");
        }
        assert!(row(&buf, 5).starts_with('a'));
    }

    #[test]
    fn test_tiny_area_does_not_panic() {
        let snapshot = StateSnapshot::new().with("a", EntityState::new("50"));
        for yaml in ["entities: [a]", "direction: vertical\nentities: [a]"] {
            let tree = tree(yaml, &snapshot);
            for (w, h) in [(0, 0), (1, 1), (3, 1), (2, 2)] {
                let area = Rect::new(0, 0, w, h);
                let mut buf = Buffer::empty(area);
                BarChart::new(&tree).render(area, &mut buf);
            }
        }
    }

    #[test]
    fn test_terminal_sink_paints() {
        let snapshot = StateSnapshot::new().with("a", EntityState::new("75"));
        let tree = tree("name: Sink\nentities: [a]", &snapshot);

        let mut sink = TerminalSink::new(Terminal::new(TestBackend::new(30, 3)).unwrap());
        sink.paint(&tree).unwrap();

        let buffer = sink.terminal().backend().buffer();
        let content: String =
            buffer.content().iter().map(|c| c.symbol().chars().next().unwrap_or(' ')).collect();
        assert!(content.contains("Sink"));
        assert!(content.contains("75"));
    }
}
