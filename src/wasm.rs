//! WebAssembly bindings for browser dashboards.
//!
//! The browser owns the clock: pass the `requestAnimationFrame` timestamp to
//! every call and keep requesting frames while `frame()` returns `true`.
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmBarCard } from 'trueno-bars';
//!
//! await init();
//!
//! const card = new WasmBarCard();
//! card.set_config('entities: [sensor.cpu, sensor.ram]');
//!
//! function onStates(json) {
//!     card.set_states(json, performance.now());
//!     el.innerHTML = card.svg();
//!     requestAnimationFrame(step);
//! }
//!
//! function step(now) {
//!     const more = card.frame(now);
//!     el.innerHTML = card.svg();
//!     if (more) requestAnimationFrame(step);
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::card::BarCard;
use crate::config::{stub_config, RawCardConfig};
use crate::output::SvgSink;
use crate::provider::StateSnapshot;

fn js_error(e: &crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Bar card instance driven from JavaScript.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct WasmBarCard {
    card: Option<BarCard<SvgSink>>,
    width: Option<f64>,
}

#[wasm_bindgen]
impl WasmBarCard {
    /// Create an unconfigured card.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SVG width in pixels. Applies from the next configuration.
    pub fn set_width(&mut self, width: f64) {
        self.width = Some(width);
    }

    /// Apply a YAML or JSON configuration.
    ///
    /// # Errors
    ///
    /// Throws the normalization error; a previous configuration stays active.
    pub fn set_config(&mut self, config: &str) -> Result<(), JsValue> {
        let raw = RawCardConfig::parse(config).map_err(|e| js_error(&e))?;
        match &mut self.card {
            Some(card) => card.set_config(&raw).map_err(|e| js_error(&e)),
            None => {
                let sink = self.width.map_or_else(SvgSink::new, |w| SvgSink::new().with_width(w));
                self.card = Some(BarCard::from_raw(&raw, sink).map_err(|e| js_error(&e))?);
                Ok(())
            }
        }
    }

    /// Apply a YAML or JSON state snapshot at time `now`.
    ///
    /// # Errors
    ///
    /// Throws if the snapshot does not parse or no configuration is set.
    pub fn set_states(&mut self, states: &str, now: f64) -> Result<(), JsValue> {
        let snapshot = StateSnapshot::parse(states).map_err(|e| js_error(&e))?;
        let card = self.card.as_mut().ok_or_else(|| JsValue::from_str("card is not configured"))?;
        card.update(&snapshot, now).map_err(|e| js_error(&e))
    }

    /// Advance animations to `now`. Returns whether another frame is wanted.
    ///
    /// # Errors
    ///
    /// Throws on sink errors.
    pub fn frame(&mut self, now: f64) -> Result<bool, JsValue> {
        match &mut self.card {
            Some(card) => card.frame(now).map_err(|e| js_error(&e)),
            None => Ok(false),
        }
    }

    /// Whether any bar is still moving.
    pub fn is_animating(&self) -> bool {
        self.card.as_ref().is_some_and(BarCard::is_animating)
    }

    /// Latest SVG document (empty before the first paint).
    pub fn svg(&self) -> String {
        self.card.as_ref().map(|c| c.sink().document().to_string()).unwrap_or_default()
    }

    /// Height hint in dashboard rows.
    pub fn card_size(&self) -> u32 {
        self.card.as_ref().map_or(1, |c| c.card_size() as u32)
    }

    /// Stop all animations (call when the card leaves the page).
    pub fn teardown(&mut self) {
        if let Some(card) = &mut self.card {
            card.teardown();
        }
    }
}

/// Starter configuration (YAML) for the entities in a state snapshot.
///
/// # Errors
///
/// Throws if the snapshot does not parse.
#[wasm_bindgen]
pub fn stub_card_config(states: &str) -> Result<String, JsValue> {
    let snapshot = StateSnapshot::parse(states).map_err(|e| js_error(&e))?;
    stub_config(&snapshot).to_yaml().map_err(|e| js_error(&e))
}
