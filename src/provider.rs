//! State provider interface: current entity states handed to the card.
//!
//! The engine never fetches data. Hosts implement [`StateProvider`] over
//! whatever store they have; [`StateSnapshot`] is a plain map implementation
//! that also deserializes from YAML/JSON for tests, the demo and WASM hosts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel state for an entity the provider knows but cannot read.
pub const STATE_UNAVAILABLE: &str = "unavailable";
/// Sentinel state for an entity whose value has not been reported yet.
pub const STATE_UNKNOWN: &str = "unknown";

/// Metadata attached to an entity state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttributes {
    /// Human readable name.
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Icon identifier (e.g. `mdi:thermometer`).
    #[serde(default)]
    pub icon: Option<String>,
    /// Unit of the reported value.
    #[serde(default)]
    pub unit_of_measurement: Option<String>,
}

/// Current state record of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Raw state as reported; numbers are kept in their text form.
    #[serde(deserialize_with = "scalar_to_string")]
    pub state: String,
    /// Metadata bag.
    #[serde(default)]
    pub attributes: EntityAttributes,
}

impl EntityState {
    /// Create a state record without metadata.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self { state: state.into(), attributes: EntityAttributes::default() }
    }

    /// Set the friendly name.
    #[must_use]
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.friendly_name = Some(name.into());
        self
    }

    /// Set the icon.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.attributes.icon = Some(icon.into());
        self
    }

    /// Set the unit of measurement.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.attributes.unit_of_measurement = Some(unit.into());
        self
    }

    /// Numeric reading of the raw state (NaN when not numeric).
    #[must_use]
    pub fn numeric(&self) -> f64 {
        parse_float(&self.state)
    }

    /// Whether the state is a usable number.
    ///
    /// False for the `unavailable`/`unknown` sentinels and for anything that
    /// does not parse to a finite number.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state != STATE_UNAVAILABLE && self.state != STATE_UNKNOWN && self.numeric().is_finite()
    }
}

/// Source of current entity states.
pub trait StateProvider {
    /// State record for `entity`, if the provider knows it.
    fn state(&self, entity: &str) -> Option<&EntityState>;

    /// Display language tag (`en`, `pl-PL`, ...).
    fn language(&self) -> &str {
        "en"
    }

    /// All known entity identifiers in ascending order.
    fn entity_ids(&self) -> Vec<&str>;
}

/// Map-backed [`StateProvider`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Display language tag.
    #[serde(default = "default_language")]
    pub language: String,
    /// States keyed by entity identifier.
    #[serde(default)]
    pub states: BTreeMap<String, EntityState>,
}

fn default_language() -> String {
    "en".to_string()
}

impl StateSnapshot {
    /// Creates an empty English snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self { language: default_language(), states: BTreeMap::new() }
    }

    /// Set the language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Add or replace an entity state.
    #[must_use]
    pub fn with(mut self, entity: impl Into<String>, state: EntityState) -> Self {
        self.states.insert(entity.into(), state);
        self
    }

    /// Add or replace an entity state in place.
    pub fn set(&mut self, entity: impl Into<String>, state: EntityState) {
        self.states.insert(entity.into(), state);
    }

    /// Parses a snapshot from YAML (or JSON).
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
}

impl StateProvider for StateSnapshot {
    fn state(&self, entity: &str) -> Option<&EntityState> {
        self.states.get(entity)
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn entity_ids(&self) -> Vec<&str> {
        self.states.keys().map(String::as_str).collect()
    }
}

/// Scalar YAML value accepted where text is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn scalar_to_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    })
}

/// Parse the longest numeric prefix of `text`.
///
/// Leading whitespace is skipped; `"21.5 °C"` reads as 21.5, `"1e3"` as 1000 and
/// `"Infinity"` as infinity. Text without a numeric prefix reads as NaN.
#[must_use]
pub fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float_plain() {
        assert_eq!(parse_float("40"), 40.0);
        assert_eq!(parse_float("-3.25"), -3.25);
        assert_eq!(parse_float("  7"), 7.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("5."), 5.0);
        assert_eq!(parse_float("+2"), 2.0);
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float("21.5 °C"), 21.5);
        assert_eq!(parse_float("50%"), 50.0);
        assert_eq!(parse_float("1e3"), 1000.0);
        assert_eq!(parse_float("2e"), 2.0);
        assert_eq!(parse_float("1.2.3"), 1.2);
    }

    #[test]
    fn test_parse_float_non_numeric() {
        assert!(parse_float("unavailable").is_nan());
        assert!(parse_float("").is_nan());
        assert!(parse_float("-").is_nan());
        assert!(parse_float(".").is_nan());
        assert!(parse_float("on").is_nan());
    }

    #[test]
    fn test_parse_float_infinity() {
        assert_eq!(parse_float("Infinity"), f64::INFINITY);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_entity_availability() {
        assert!(EntityState::new("40").is_available());
        assert!(!EntityState::new(STATE_UNAVAILABLE).is_available());
        assert!(!EntityState::new(STATE_UNKNOWN).is_available());
        assert!(!EntityState::new("open").is_available());
        assert!(!EntityState::new("Infinity").is_available());
    }

    #[test]
    fn test_snapshot_parse_numbers_and_text() {
        let yaml = r#"
language: pl
states:
  sensor.temp:
    state: 21.5
    attributes:
      friendly_name: Kitchen
      unit_of_measurement: "°C"
  sensor.door:
    state: "unavailable"
  sensor.count:
    state: 7
"#;
        let snapshot = StateSnapshot::parse(yaml).unwrap();

        assert_eq!(snapshot.language(), "pl");
        let temp = snapshot.state("sensor.temp").unwrap();
        assert_eq!(temp.numeric(), 21.5);
        assert_eq!(temp.attributes.friendly_name.as_deref(), Some("Kitchen"));
        assert_eq!(snapshot.state("sensor.count").unwrap().state, "7");
        assert!(!snapshot.state("sensor.door").unwrap().is_available());
        assert!(snapshot.state("sensor.missing").is_none());
        assert_eq!(snapshot.entity_ids(), vec!["sensor.count", "sensor.door", "sensor.temp"]);
    }

    #[test]
    fn test_snapshot_parse_error_has_line() {
        let yaml = "states:\n  sensor.a:\n    attributes: {}\n";
        let err = StateSnapshot::parse(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_snapshot_builder() {
        let snapshot = StateSnapshot::new()
            .with_language("de")
            .with("sensor.a", EntityState::new("1").friendly_name("A").icon("mdi:flash").unit("W"));
        let a = snapshot.state("sensor.a").unwrap();
        assert_eq!(a.attributes.icon.as_deref(), Some("mdi:flash"));
        assert_eq!(a.attributes.unit_of_measurement.as_deref(), Some("W"));
        assert_eq!(snapshot.language(), "de");
    }
}
