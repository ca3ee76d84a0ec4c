//! Render planning: canonical config + values -> paint-ready tree.
//!
//! [`plan`] is pure. It reads the provider and a snapshot of interpolated
//! values and makes every numeric and color decision, so a
//! [`ViewSink`](crate::card::ViewSink) only has to draw what it is given.

use crate::config::{CardConfig, Columns, Direction};
use crate::locale::Locale;
use crate::provider::{EntityState, StateProvider};
use crate::severity::DEFAULT_BAR_COLOR;
use std::collections::BTreeMap;

/// Color of bars whose entity has no usable state.
pub const NEUTRAL_COLOR: &str = "var(--secondary-text-color)";

/// Text shown for a value that cannot be formatted.
pub const MISSING_VALUE: &str = "—";

/// Track length of vertical bars in pixels.
pub const VERTICAL_TRACK_PX: f64 = 120.0;

/// Glow marker size relative to the bar thickness.
pub const GLOW_RATIO: f64 = 0.6;

/// Paint-ready description of one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarDescriptor {
    /// Series index.
    pub index: usize,
    /// Entity identifier.
    pub entity: String,
    /// Display name.
    pub name: String,
    /// Icon, if any.
    pub icon: Option<String>,
    /// Fill in `[0, 100]`.
    pub percentage: f64,
    /// CSS color of the fill and value text.
    pub color: String,
    /// Formatted value or the locale placeholder.
    pub text: String,
    /// Unit suffix (may be empty).
    pub unit: String,
    /// Whether the provider reported a usable number.
    pub available: bool,
    /// Whether the sink should draw a fill at all.
    pub show_fill: bool,
}

/// Card-level layout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Bar orientation.
    pub direction: Direction,
    /// Bar thickness in pixels.
    pub bar_height: f64,
    /// Gap between bars in pixels.
    pub bar_spacing: f64,
    /// Column layout for vertical bars.
    pub columns: Columns,
    /// Track length of vertical bars in pixels.
    pub track_length: f64,
    /// Diameter of the glow marker at the tip of a fill.
    pub glow_size: f64,
    /// Draw formatted values.
    pub show_value: bool,
    /// Draw series names.
    pub show_name: bool,
    /// Draw series icons.
    pub show_icon: bool,
}

impl Layout {
    /// Layout parameters of a configuration.
    #[must_use]
    pub fn of(config: &CardConfig) -> Self {
        Self {
            direction: config.direction,
            bar_height: config.bar_height,
            bar_spacing: config.bar_spacing,
            columns: config.columns,
            track_length: VERTICAL_TRACK_PX,
            glow_size: config.bar_height * GLOW_RATIO,
            show_value: config.show_value,
            show_name: config.show_name,
            show_icon: config.show_icon,
        }
    }

    /// Whether a label block (icon and/or name) is drawn.
    #[must_use]
    pub fn shows_label(&self) -> bool {
        self.show_name || self.show_icon
    }
}

/// Everything a sink needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    /// Header text, present only when enabled and non-empty.
    pub header: Option<String>,
    /// Layout parameters.
    pub layout: Layout,
    /// Bars in configuration order.
    pub bars: Vec<BarDescriptor>,
}

/// Fixed-point formatting with `decimals` digits; non-finite values become `—`.
///
/// Exact halves round away from zero (`2.5` → `3`, `0.125` → `0.13`). Values
/// that only look like halves in decimal (`1.005` is stored just below) round
/// by their binary value.
#[must_use]
pub fn format_value(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return MISSING_VALUE.to_string();
    }
    if !is_exact_half(value.abs(), decimals) {
        return format!("{value:.decimals$}");
    }

    // An exact half terminates one digit past `decimals`, so this is exact.
    let digits = decimals + 1;
    let exact = format!("{:.digits$}", value.abs());
    let kept = exact[..exact.len() - 1].trim_end_matches('.');
    let rounded = increment_last_digit(kept);
    if value < 0.0 {
        format!("-{rounded}")
    } else {
        rounded
    }
}

/// Whether `value * 10^decimals` has a fractional part of exactly one half.
///
/// With `value = mantissa * 2^exp`, twice the scaled value is
/// `mantissa * 5^decimals * 2^(exp + 1 + decimals)`, an odd integer exactly
/// when the power of two cancels the mantissa's trailing zeros.
fn is_exact_half(value: f64, decimals: usize) -> bool {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, exp) = if biased == 0 { (fraction, -1074) } else { (fraction | (1 << 52), biased - 1075) };
    if mantissa == 0 {
        return false;
    }
    let shift = exp + 1 + decimals as i64;
    shift <= 0 && i64::from(mantissa.trailing_zeros()) == -shift
}

fn increment_last_digit(number: &str) -> String {
    let mut chars: Vec<char> = number.chars().collect();
    for c in chars.iter_mut().rev() {
        match *c {
            '.' => continue,
            '9' => *c = '0',
            digit => {
                *c = char::from(digit as u8 + 1);
                return chars.into_iter().collect();
            }
        }
    }
    std::iter::once('1').chain(chars).collect()
}

/// Position of `value` inside `[min, max]` as a percentage.
///
/// The value is clamped into the range first. A degenerate range
/// (`min >= max`) always yields 0.
#[must_use]
pub fn percentage(value: f64, min: f64, max: f64) -> f64 {
    if min >= max || !value.is_finite() {
        return 0.0;
    }
    let clamped = value.min(max).max(min);
    ((clamped - min) / (max - min) * 100.0).clamp(0.0, 100.0)
}

/// Build the render tree for one frame.
///
/// `interpolated` holds in-flight values by series index; any index missing
/// from it renders from the provider's raw value.
#[must_use]
pub fn plan(config: &CardConfig, provider: &impl StateProvider, interpolated: &BTreeMap<usize, f64>) -> RenderTree {
    let locale = Locale::from_language(provider.language());

    let bars = config
        .entities
        .iter()
        .enumerate()
        .map(|(index, series)| {
            let state = provider.state(&series.entity);
            let raw = state.map_or(f64::NAN, EntityState::numeric);
            let available = state.is_some_and(|s| s.is_available());

            let value = interpolated.get(&index).copied().filter(|v| v.is_finite()).unwrap_or(raw);

            let min = config.min_for(series);
            let max = config.max_for(series);
            let decimals = config.decimals_for(series);
            let attributes = state.map(|s| &s.attributes);
            let unit = series
                .unit
                .clone()
                .or_else(|| config.unit.clone())
                .or_else(|| attributes.and_then(|a| a.unit_of_measurement.clone()))
                .unwrap_or_default();
            let name = series
                .name
                .clone()
                .or_else(|| attributes.and_then(|a| a.friendly_name.clone()))
                .unwrap_or_else(|| series.entity.clone());
            let icon = series.icon.clone().or_else(|| attributes.and_then(|a| a.icon.clone()));

            let clamped = value.min(max).max(min);
            let percentage = if available { percentage(value, min, max) } else { 0.0 };

            let color = match (&series.color, available) {
                (Some(fixed), _) => fixed.clone(),
                (None, true) => config.severity.color_for(clamped, DEFAULT_BAR_COLOR).to_string(),
                (None, false) => NEUTRAL_COLOR.to_string(),
            };

            let text = if available { format_value(raw, decimals) } else { locale.no_data().to_string() };

            BarDescriptor {
                index,
                entity: series.entity.clone(),
                name,
                icon,
                percentage,
                color,
                text,
                unit,
                available,
                show_fill: available && percentage > 0.0,
            }
        })
        .collect();

    RenderTree {
        header: config.name.clone().filter(|_| config.show_header),
        layout: Layout::of(config),
        bars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StateSnapshot, STATE_UNAVAILABLE};
    use approx::assert_relative_eq;

    fn config(yaml: &str) -> CardConfig {
        CardConfig::from_yaml(yaml).unwrap()
    }

    fn none() -> BTreeMap<usize, f64> {
        BTreeMap::new()
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(40.0, 0), "40");
        assert_eq!(format_value(21.456, 2), "21.46");
        assert_eq!(format_value(3.0, 1), "3.0");
        assert_eq!(format_value(f64::NAN, 2), MISSING_VALUE);
    }

    #[test]
    fn test_format_value_rounds_halves_up() {
        assert_eq!(format_value(2.5, 0), "3");
        assert_eq!(format_value(0.5, 0), "1");
        assert_eq!(format_value(0.125, 2), "0.13");
        assert_eq!(format_value(9.5, 0), "10");
        assert_eq!(format_value(99.95, 1), "100.0");
        assert_eq!(format_value(-2.5, 0), "-3");
        assert_eq!(format_value(3.0, 0), "3");
    }

    #[test]
    fn test_format_value_near_halves_keep_binary_value() {
        // 1.005 and 2.675 are stored just below the half.
        assert_eq!(format_value(1.005, 2), "1.00");
        assert_eq!(format_value(2.675, 2), "2.67");
        assert_eq!(format_value(0.3, 0), "0");
    }

    #[test]
    fn test_plan_text_rounds_half_reading_up() {
        let cfg = config("decimals: 0\nentities: [x]");
        let provider = StateSnapshot::new().with("x", EntityState::new("2.5"));
        assert_eq!(plan(&cfg, &provider, &none()).bars[0].text, "3");
    }

    #[test]
    fn test_percentage_clamps() {
        assert_relative_eq!(percentage(40.0, 0.0, 100.0), 40.0);
        assert_relative_eq!(percentage(150.0, 0.0, 100.0), 100.0);
        assert_relative_eq!(percentage(-5.0, 0.0, 100.0), 0.0);
        assert_relative_eq!(percentage(15.0, 10.0, 20.0), 50.0);
    }

    #[test]
    fn test_percentage_degenerate_range() {
        assert_relative_eq!(percentage(5.0, 5.0, 5.0), 0.0);
        assert_relative_eq!(percentage(5.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn test_plan_basic_bar() {
        let cfg = config(
            "entities: [{entity: x, min: 0, max: 100}]\nseverity: [{from: 0, to: 50, color: green}, {from: 50, to: 100, color: red}]",
        );
        let provider = StateSnapshot::new().with("x", EntityState::new("40"));

        let tree = plan(&cfg, &provider, &none());
        let bar = &tree.bars[0];

        assert_relative_eq!(bar.percentage, 40.0);
        assert_eq!(bar.color, "green");
        assert_eq!(bar.text, "40");
        assert!(bar.available && bar.show_fill);
        assert_eq!(bar.name, "x");
    }

    #[test]
    fn test_plan_prefers_interpolated_value_for_fill_only() {
        let cfg = config("entities: [x]\nseverity: [{from: 0, to: 50, color: green}, {from: 50, to: 100, color: red}]");
        let provider = StateSnapshot::new().with("x", EntityState::new("80"));
        let interpolated = BTreeMap::from([(0, 45.0)]);

        let bar = &plan(&cfg, &provider, &interpolated).bars[0];

        assert_relative_eq!(bar.percentage, 45.0);
        assert_eq!(bar.color, "green");
        assert_eq!(bar.text, "80");
    }

    #[test]
    fn test_plan_ignores_non_finite_interpolated() {
        let cfg = config("entities: [x]");
        let provider = StateSnapshot::new().with("x", EntityState::new("30"));
        let interpolated = BTreeMap::from([(0, f64::NAN)]);

        assert_relative_eq!(plan(&cfg, &provider, &interpolated).bars[0].percentage, 30.0);
    }

    #[test]
    fn test_plan_unavailable_ignores_interpolated() {
        let cfg = config("entities: [x]");
        let provider = StateSnapshot::new().with("x", EntityState::new(STATE_UNAVAILABLE));
        let interpolated = BTreeMap::from([(0, 70.0)]);

        let bar = &plan(&cfg, &provider, &interpolated).bars[0];

        assert_relative_eq!(bar.percentage, 0.0);
        assert_eq!(bar.text, "N/A");
        assert_eq!(bar.color, NEUTRAL_COLOR);
        assert!(!bar.available && !bar.show_fill);
    }

    #[test]
    fn test_plan_missing_and_non_numeric_states() {
        let cfg = config("entities: [missing, text]");
        let provider = StateSnapshot::new().with_language("pl").with("text", EntityState::new("open"));

        let tree = plan(&cfg, &provider, &none());

        for bar in &tree.bars {
            assert!(!bar.available);
            assert_eq!(bar.text, "Brak");
            assert_relative_eq!(bar.percentage, 0.0);
        }
    }

    #[test]
    fn test_plan_fixed_color_wins() {
        let cfg = config("entities: [{entity: x, color: '#123456'}, {entity: y, color: '#abcdef'}]");
        let provider = StateSnapshot::new().with("x", EntityState::new("90"));

        let tree = plan(&cfg, &provider, &none());
        assert_eq!(tree.bars[0].color, "#123456");
        // Even unavailable bars keep an explicit color.
        assert_eq!(tree.bars[1].color, "#abcdef");
    }

    #[test]
    fn test_plan_fallback_color_when_no_threshold_matches() {
        let cfg = config("entities: [{entity: x, max: 1000}]\nseverity: [{from: 0, to: 10, color: green}]");
        let provider = StateSnapshot::new().with("x", EntityState::new("500"));

        assert_eq!(plan(&cfg, &provider, &none()).bars[0].color, DEFAULT_BAR_COLOR);
    }

    #[test]
    fn test_plan_out_of_range_clamps_color_and_fill() {
        let cfg = config("entities: [x]\nseverity: [{from: 0, to: 50, color: green}, {from: 50, to: 100, color: red}]");
        let provider = StateSnapshot::new().with("x", EntityState::new("250"));

        let bar = &plan(&cfg, &provider, &none()).bars[0];
        assert_relative_eq!(bar.percentage, 100.0);
        assert_eq!(bar.color, "red");
        assert_eq!(bar.text, "250");
    }

    #[test]
    fn test_plan_metadata_fallbacks() {
        let cfg = config("unit: '%'\nentities: [a, {entity: b, name: Bee, unit: kWh, icon: 'mdi:bee'}, c]");
        let provider = StateSnapshot::new()
            .with("a", EntityState::new("1").friendly_name("Alpha").icon("mdi:alpha").unit("W"))
            .with("b", EntityState::new("2").friendly_name("Ignored").unit("W"))
            .with("c", EntityState::new("3"));

        let tree = plan(&cfg, &provider, &none());

        assert_eq!(tree.bars[0].name, "Alpha");
        assert_eq!(tree.bars[0].icon.as_deref(), Some("mdi:alpha"));
        assert_eq!(tree.bars[0].unit, "%");
        assert_eq!(tree.bars[1].name, "Bee");
        assert_eq!(tree.bars[1].unit, "kWh");
        assert_eq!(tree.bars[1].icon.as_deref(), Some("mdi:bee"));
        assert_eq!(tree.bars[2].name, "c");
        assert_eq!(tree.bars[2].icon, None);
    }

    #[test]
    fn test_plan_provider_unit_when_unconfigured() {
        let cfg = config("entities: [a]");
        let provider = StateSnapshot::new().with("a", EntityState::new("1").unit("°C"));
        assert_eq!(plan(&cfg, &provider, &none()).bars[0].unit, "°C");
    }

    #[test]
    fn test_plan_decimals_override() {
        let cfg = config("decimals: 2\nentities: [a, {entity: b, decimals: 0}]");
        let provider =
            StateSnapshot::new().with("a", EntityState::new("3.14159")).with("b", EntityState::new("2.71828"));

        let tree = plan(&cfg, &provider, &none());
        assert_eq!(tree.bars[0].text, "3.14");
        assert_eq!(tree.bars[1].text, "3");
    }

    #[test]
    fn test_plan_zero_value_has_no_fill() {
        let cfg = config("entities: [a]");
        let provider = StateSnapshot::new().with("a", EntityState::new("0"));
        let bar = &plan(&cfg, &provider, &none()).bars[0];
        assert!(bar.available);
        assert!(!bar.show_fill);
    }

    #[test]
    fn test_plan_degenerate_range_is_empty() {
        let cfg = config("entities: [{entity: a, min: 5, max: 5}]");
        let provider = StateSnapshot::new().with("a", EntityState::new("5"));
        assert_relative_eq!(plan(&cfg, &provider, &none()).bars[0].percentage, 0.0);
    }

    #[test]
    fn test_header_and_layout() {
        let cfg = config("name: Energy\ndirection: vertical\nbar_height: 30\ncolumns: 2\nshow_name: false\nentities: [a]");
        let tree = plan(&cfg, &StateSnapshot::new(), &none());

        assert_eq!(tree.header.as_deref(), Some("Energy"));
        assert_eq!(tree.layout.direction, Direction::Vertical);
        assert_eq!(tree.layout.columns, Columns::Fixed(2));
        assert_relative_eq!(tree.layout.glow_size, 18.0);
        assert!(tree.layout.shows_label());

        let hidden = config("name: Energy\nshow_header: false\nentities: [a]");
        assert_eq!(plan(&hidden, &StateSnapshot::new(), &none()).header, None);
    }
}
