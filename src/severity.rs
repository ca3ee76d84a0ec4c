//! Severity thresholds: value ranges mapped to display colors.
//!
//! A [`SeverityTable`] is sorted ascending by `from` when built and never
//! mutated afterwards. Ranges are half-open `[from, to)` except the last entry,
//! which also accepts `value == to` so the configured maximum still matches.
//! Thresholds with NaN bounds sort last and never match.

use std::cmp::Ordering;
use std::sync::Arc;

/// Fallback color when no threshold matches an available value.
pub const DEFAULT_BAR_COLOR: &str = "#3b82f6";

/// Built-in low/mid/high colors used when a configuration has no table.
pub const DEFAULT_LOW_COLOR: &str = "#4caf50";
/// Amber tier of the built-in table.
pub const DEFAULT_MID_COLOR: &str = "#ff9800";
/// Red tier of the built-in table.
pub const DEFAULT_HIGH_COLOR: &str = "#f44336";

/// One value range and the color shown while a bar sits inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityThreshold {
    /// Inclusive lower bound.
    pub from: f64,
    /// Exclusive upper bound (inclusive for the last entry of a table).
    pub to: f64,
    /// CSS color string.
    pub color: String,
}

impl SeverityThreshold {
    /// Create a threshold.
    #[must_use]
    pub fn new(from: f64, to: f64, color: impl Into<String>) -> Self {
        Self { from, to, color: color.into() }
    }

    fn contains_half_open(&self, value: f64) -> bool {
        self.from <= value && value < self.to
    }

    fn contains_closed(&self, value: f64) -> bool {
        self.from <= value && value <= self.to
    }
}

/// Immutable, sorted severity table.
///
/// Cloning is cheap; clones share the same thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityTable {
    thresholds: Arc<[SeverityThreshold]>,
}

impl SeverityTable {
    /// Build a table, sorting thresholds ascending by `from`.
    ///
    /// The sort is stable; NaN `from` values go to the end.
    #[must_use]
    pub fn new(mut thresholds: Vec<SeverityThreshold>) -> Self {
        thresholds.sort_by(|a, b| cmp_nan_last(a.from, b.from));
        Self { thresholds: thresholds.into() }
    }

    /// The three-tier green/amber/red table over 0-100.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            SeverityThreshold::new(0.0, 33.0, DEFAULT_LOW_COLOR),
            SeverityThreshold::new(33.0, 66.0, DEFAULT_MID_COLOR),
            SeverityThreshold::new(66.0, 100.0, DEFAULT_HIGH_COLOR),
        ])
    }

    /// Sorted thresholds.
    #[must_use]
    pub fn thresholds(&self) -> &[SeverityThreshold] {
        &self.thresholds
    }

    /// Number of thresholds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    /// Whether the table has no thresholds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Resolve `value` against this table.
    #[must_use]
    pub fn color_for<'a>(&'a self, value: f64, fallback: &'a str) -> &'a str {
        resolve_color(value, Some(self.thresholds()), fallback)
    }
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn cmp_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Map a value to a color through an ascending threshold table.
///
/// Returns the color of the first threshold with `from <= value < to`; failing
/// that, the last threshold is retried with a closed upper bound. `None` tables
/// and unmatched values yield `fallback`. Never panics; NaN inputs simply fail
/// every comparison.
#[must_use]
pub fn resolve_color<'a>(value: f64, table: Option<&'a [SeverityThreshold]>, fallback: &'a str) -> &'a str {
    let Some(table) = table else {
        return fallback;
    };

    if let Some(hit) = table.iter().find(|t| t.contains_half_open(value)) {
        return &hit.color;
    }

    match table.last() {
        Some(last) if last.contains_closed(value) => &last.color,
        _ => fallback,
    }
}
