//! Card configuration: the loosely-typed form users write and the canonical
//! form the engine consumes.
//!
//! [`RawCardConfig`] mirrors the YAML/JSON a dashboard stores. Everything in it
//! is optional and numbers may arrive as strings. [`normalize`] turns it into a
//! [`CardConfig`] where every card-level field is populated, so later stages
//! never fall back on their own. Series-level overrides stay optional and are
//! resolved against the card defaults at render time.

use crate::error::{Error, Result};
use crate::provider::{parse_float, StateProvider};
use crate::severity::{SeverityTable, SeverityThreshold};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default lower bound of every bar.
pub const DEFAULT_MIN: f64 = 0.0;
/// Default upper bound of every bar.
pub const DEFAULT_MAX: f64 = 100.0;
/// Default bar thickness in pixels.
pub const DEFAULT_BAR_HEIGHT: f64 = 20.0;
/// Default gap between bars in pixels.
pub const DEFAULT_BAR_SPACING: f64 = 12.0;
/// Default tween duration in milliseconds.
pub const DEFAULT_ANIMATION_MS: f64 = 800.0;
/// Upper limit for fixed decimal digits.
pub const MAX_DECIMALS: usize = 20;

// ============================================================================
// Raw (pre-normalization) configuration
// ============================================================================

/// A number that may be written as a YAML number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    /// Numeric literal.
    Number(f64),
    /// Text, read by its numeric prefix.
    Text(String),
}

impl RawNumber {
    /// Numeric value; NaN when the text has no numeric prefix.
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => parse_float(s),
        }
    }

    fn finite(&self) -> Option<f64> {
        Some(self.value()).filter(|v| v.is_finite())
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// `columns` is either `auto` or a count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawColumns {
    /// Explicit column count.
    Count(i64),
    /// `auto` or a count written as text.
    Text(String),
    /// Anything else (fractions, booleans, lists); read as `auto`.
    Other(serde_yaml_ng::Value),
}

/// A `show_*` toggle. Only an explicit `false` turns the element off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFlag {
    /// Boolean literal.
    Bool(bool),
    /// Any other value; counts as enabled.
    Other(serde_yaml_ng::Value),
}

impl RawFlag {
    /// Whether the toggle is on.
    #[must_use]
    pub fn enabled(&self) -> bool {
        !matches!(self, Self::Bool(false))
    }
}

impl From<bool> for RawFlag {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One raw severity threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawThreshold {
    /// Lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<RawNumber>,
    /// Upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<RawNumber>,
    /// CSS color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Per-series options in mapping form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSeries {
    /// Entity identifier resolved by the state provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Alias for `name`, used when `name` is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Fixed bar color, bypassing severity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Lower bound override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<RawNumber>,
    /// Upper bound override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<RawNumber>,
    /// Decimal digits override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<RawNumber>,
    /// Unit override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Icon override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// An `entities` entry: a bare identifier or a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEntity {
    /// Bare entity identifier.
    Id(String),
    /// Mapping with per-series options.
    Series(RawSeries),
}

/// Card configuration as stored by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCardConfig {
    /// Series entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<RawEntity>>,
    /// Header text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Card-level lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<RawNumber>,
    /// Card-level upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<RawNumber>,
    /// Card-level decimal digits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<RawNumber>,
    /// Card-level unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Severity thresholds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Vec<RawThreshold>>,
    /// `horizontal` or `vertical`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Bar thickness in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_height: Option<RawNumber>,
    /// Gap between bars in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_spacing: Option<RawNumber>,
    /// Column count for vertical layouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<RawColumns>,
    /// Show the formatted value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_value: Option<RawFlag>,
    /// Show the series name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_name: Option<RawFlag>,
    /// Show the series icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_icon: Option<RawFlag>,
    /// Show the header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_header: Option<RawFlag>,
    /// Tween duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_duration: Option<RawNumber>,
}

impl RawCardConfig {
    /// Loads a raw configuration from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| Error::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses a raw configuration from a YAML (or JSON) string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map_or(0, |l| l.line());
            Error::ConfigParse { line, message: e.to_string() }
        })
    }

    /// Serializes back to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| Error::ConfigParse { line: 0, message: e.to_string() })
    }
}

// ============================================================================
// Canonical configuration
// ============================================================================

/// Bar orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Bars grow left to right, stacked vertically.
    #[default]
    Horizontal,
    /// Bars grow bottom to top, laid out in columns.
    Vertical,
}

/// Column layout for vertical bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Columns {
    /// Let the sink fit as many columns as the width allows.
    #[default]
    Auto,
    /// Fixed column count (at least 1).
    Fixed(u32),
}

/// One bar, post-normalization. `None` fields inherit from the card.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesConfig {
    /// Entity identifier.
    pub entity: String,
    /// Display name.
    pub name: Option<String>,
    /// Fixed color overriding severity.
    pub color: Option<String>,
    /// Lower bound override.
    pub min: Option<f64>,
    /// Upper bound override.
    pub max: Option<f64>,
    /// Decimal digits override.
    pub decimals: Option<usize>,
    /// Unit override.
    pub unit: Option<String>,
    /// Icon override.
    pub icon: Option<String>,
}

impl SeriesConfig {
    /// A series with nothing but an entity identifier.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            name: None,
            color: None,
            min: None,
            max: None,
            decimals: None,
            unit: None,
            icon: None,
        }
    }
}

/// Fully-defaulted card configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CardConfig {
    /// Header text (`None` when empty).
    pub name: Option<String>,
    /// Card-level lower bound.
    pub min: f64,
    /// Card-level upper bound.
    pub max: f64,
    /// Card-level decimal digits.
    pub decimals: usize,
    /// Card-level unit.
    pub unit: Option<String>,
    /// Severity table.
    pub severity: SeverityTable,
    /// Bar orientation.
    pub direction: Direction,
    /// Bar thickness in pixels.
    pub bar_height: f64,
    /// Gap between bars in pixels.
    pub bar_spacing: f64,
    /// Column layout (vertical only).
    pub columns: Columns,
    /// Show formatted values.
    pub show_value: bool,
    /// Show series names.
    pub show_name: bool,
    /// Show series icons.
    pub show_icon: bool,
    /// Show the header.
    pub show_header: bool,
    /// Tween duration in milliseconds (>= 0).
    pub animation_duration: f64,
    /// Series in display order (never empty).
    pub entities: Vec<SeriesConfig>,
}

impl CardConfig {
    /// Parses and normalizes a YAML (or JSON) configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the configuration has no entities.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        normalize(&RawCardConfig::parse(yaml)?)
    }

    /// Effective lower bound of a series.
    #[must_use]
    pub fn min_for(&self, series: &SeriesConfig) -> f64 {
        series.min.unwrap_or(self.min)
    }

    /// Effective upper bound of a series.
    #[must_use]
    pub fn max_for(&self, series: &SeriesConfig) -> f64 {
        series.max.unwrap_or(self.max)
    }

    /// Effective decimal digits of a series.
    #[must_use]
    pub fn decimals_for(&self, series: &SeriesConfig) -> usize {
        series.decimals.unwrap_or(self.decimals)
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Always false for a normalized configuration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Height hint in dashboard rows: one per three series plus the header.
    #[must_use]
    pub fn card_size(&self) -> usize {
        self.entities.len().max(1).div_ceil(3) + 1
    }
}

// ============================================================================
// Normalization
// ============================================================================

fn text(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn decimals(value: Option<&RawNumber>) -> Option<usize> {
    value.and_then(RawNumber::finite).filter(|d| *d >= 0.0).map(|d| (d as usize).min(MAX_DECIMALS))
}

fn non_negative(value: Option<&RawNumber>, default: f64) -> f64 {
    value.and_then(RawNumber::finite).map_or(default, |v| v.max(0.0))
}

fn columns(value: Option<&RawColumns>) -> Columns {
    let count = match value {
        Some(RawColumns::Count(n)) => *n,
        Some(RawColumns::Text(s)) => s.trim().parse().unwrap_or(0),
        Some(RawColumns::Other(_)) | None => 0,
    };
    match u32::try_from(count) {
        Ok(n) if n > 0 => Columns::Fixed(n),
        _ => Columns::Auto,
    }
}

fn flag(value: Option<&RawFlag>) -> bool {
    value.map_or(true, RawFlag::enabled)
}

fn normalize_series(index: usize, entry: &RawEntity) -> Result<SeriesConfig> {
    match entry {
        RawEntity::Id(id) if !id.is_empty() => Ok(SeriesConfig::new(id.clone())),
        RawEntity::Id(_) => Err(Error::MissingEntity { index }),
        RawEntity::Series(raw) => {
            let entity = text(raw.entity.as_ref()).ok_or(Error::MissingEntity { index })?;
            Ok(SeriesConfig {
                entity,
                name: text(raw.name.as_ref()).or_else(|| text(raw.label.as_ref())),
                color: text(raw.color.as_ref()),
                min: raw.min.as_ref().and_then(RawNumber::finite),
                max: raw.max.as_ref().and_then(RawNumber::finite),
                decimals: decimals(raw.decimals.as_ref()),
                unit: text(raw.unit.as_ref()),
                icon: text(raw.icon.as_ref()),
            })
        }
    }
}

fn normalize_severity(raw: Option<&Vec<RawThreshold>>) -> SeverityTable {
    let Some(raw) = raw.filter(|t| !t.is_empty()) else {
        return SeverityTable::builtin();
    };

    let thresholds: Vec<SeverityThreshold> = raw
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let Some(color) = text(t.color.as_ref()) else {
                tracing::warn!(threshold = i, "severity threshold without a color ignored");
                return None;
            };
            let from = t.from.as_ref().map_or(f64::NAN, RawNumber::value);
            let to = t.to.as_ref().map_or(f64::NAN, RawNumber::value);
            if from.is_nan() || to.is_nan() {
                tracing::warn!(threshold = i, "severity threshold with non-numeric bounds never matches");
            }
            Some(SeverityThreshold::new(from, to, color))
        })
        .collect();

    if thresholds.is_empty() {
        SeverityTable::builtin()
    } else {
        SeverityTable::new(thresholds)
    }
}

/// Turn a raw configuration into the canonical model.
///
/// # Errors
///
/// [`Error::NoEntities`] when `entities` is missing or empty,
/// [`Error::MissingEntity`] when an entry has no identifier.
pub fn normalize(raw: &RawCardConfig) -> Result<CardConfig> {
    let raw_entities = raw.entities.as_ref().filter(|e| !e.is_empty()).ok_or(Error::NoEntities)?;

    let entities = raw_entities
        .iter()
        .enumerate()
        .map(|(i, e)| normalize_series(i, e))
        .collect::<Result<Vec<_>>>()?;

    let config = CardConfig {
        name: text(raw.name.as_ref()),
        min: raw.min.as_ref().and_then(RawNumber::finite).unwrap_or(DEFAULT_MIN),
        max: raw.max.as_ref().and_then(RawNumber::finite).unwrap_or(DEFAULT_MAX),
        decimals: decimals(raw.decimals.as_ref()).unwrap_or(0),
        unit: text(raw.unit.as_ref()),
        severity: normalize_severity(raw.severity.as_ref()),
        direction: match raw.direction.as_deref() {
            Some("vertical") => Direction::Vertical,
            _ => Direction::Horizontal,
        },
        bar_height: non_negative(raw.bar_height.as_ref(), DEFAULT_BAR_HEIGHT),
        bar_spacing: non_negative(raw.bar_spacing.as_ref(), DEFAULT_BAR_SPACING),
        columns: columns(raw.columns.as_ref()),
        show_value: flag(raw.show_value.as_ref()),
        show_name: flag(raw.show_name.as_ref()),
        show_icon: flag(raw.show_icon.as_ref()),
        show_header: flag(raw.show_header.as_ref()),
        animation_duration: non_negative(raw.animation_duration.as_ref(), DEFAULT_ANIMATION_MS),
        entities,
    };

    for (index, series) in config.entities.iter().enumerate() {
        let (min, max) = (config.min_for(series), config.max_for(series));
        if min >= max {
            tracing::warn!(index, entity = %series.entity, min, max, "degenerate range, bar will stay empty");
        }
    }

    tracing::debug!(
        series = config.entities.len(),
        duration_ms = config.animation_duration,
        thresholds = config.severity.len(),
        "card configuration normalized"
    );

    Ok(config)
}

/// Starter configuration built from the first three `sensor.` entities.
#[must_use]
pub fn stub_config(provider: &impl StateProvider) -> RawCardConfig {
    let entities = provider
        .entity_ids()
        .into_iter()
        .filter(|id| id.starts_with("sensor."))
        .take(3)
        .map(|id| RawEntity::Series(RawSeries { entity: Some(id.to_string()), ..RawSeries::default() }))
        .collect();

    RawCardConfig {
        entities: Some(entities),
        name: Some("Bar Chart".to_string()),
        min: Some(RawNumber::Number(DEFAULT_MIN)),
        max: Some(RawNumber::Number(DEFAULT_MAX)),
        ..RawCardConfig::default()
    }
}
