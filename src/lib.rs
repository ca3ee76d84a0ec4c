//! # Trueno-Bars
//!
//! Animated, severity-colored bar chart engine for live dashboards.
//!
//! A card shows one bar per configured entity. Each provider update tweens the
//! bar towards its new value with an ease-out-cubic curve, and the bar color
//! follows a table of severity thresholds. The engine is host agnostic: a
//! [`StateProvider`](provider::StateProvider) supplies values, the host
//! supplies animation-frame timestamps, and a [`ViewSink`](card::ViewSink)
//! paints the planned frames.
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_bars::prelude::*;
//!
//! let config = CardConfig::from_yaml(
//!     r#"
//! entities:
//!   - entity: sensor.cpu
//!     name: CPU
//! severity:
//!   - { from: 0, to: 50, color: green }
//!   - { from: 50, to: 100, color: red }
//! "#,
//! )?;
//!
//! let mut card = BarCard::new(config, SvgSink::new());
//! card.update(&StateSnapshot::new().with("sensor.cpu", EntityState::new("40")), 0.0)?;
//! card.frame(800.0)?;
//!
//! let bar = &card.plan().bars[0];
//! assert_eq!(bar.color, "green");
//! assert_eq!(bar.text, "40");
//! # Ok::<(), trueno_bars::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `terminal`: ratatui view sink
//! - `demo`: interactive terminal demo binary
//! - `wasm`: browser bindings
//! - `full`: terminal and demo

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

// ============================================================================
// Core Modules
// ============================================================================

/// Color parsing and conversion.
pub mod color;

/// Severity thresholds and color resolution.
pub mod severity;

/// Entity states supplied by the host.
pub mod provider;

/// Localized placeholder strings.
pub mod locale;

/// Raw and canonical card configuration.
pub mod config;

/// Value tweening.
pub mod animation;

/// Frame planning.
pub mod render;

/// Card controller and view sink trait.
pub mod card;

/// View sinks (SVG, terminal).
pub mod output;

// ============================================================================
// Optional Integration Modules
// ============================================================================

/// WebAssembly bindings for browser usage.
#[cfg(feature = "wasm")]
#[cfg_attr(docsrs, doc(cfg(feature = "wasm")))]
pub mod wasm;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for trueno-bars operations.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use trueno_bars::prelude::*;
/// ```
pub mod prelude {
    pub use crate::animation::{AnimationScheduler, FrameRequest, TickOutcome};
    pub use crate::card::{BarCard, ViewSink};
    pub use crate::color::Rgba;
    pub use crate::config::{normalize, stub_config, CardConfig, Columns, Direction, RawCardConfig, SeriesConfig};
    pub use crate::error::{Error, Result};
    pub use crate::locale::Locale;
    pub use crate::output::SvgSink;
    #[cfg(feature = "terminal")]
    pub use crate::output::{BarChart, TerminalSink};
    pub use crate::provider::{EntityState, StateProvider, StateSnapshot};
    pub use crate::render::{plan, BarDescriptor, RenderTree};
    pub use crate::severity::{resolve_color, SeverityTable, SeverityThreshold};
}
