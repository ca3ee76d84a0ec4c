//! Card controller: wires config, provider updates, animation and painting.
//!
//! [`BarCard`] is the per-card instance. Hosts feed it provider updates with
//! [`BarCard::update`], drive it with [`BarCard::frame`] from their animation
//! loop while [`BarCard::is_animating`] is true, and call
//! [`BarCard::teardown`] when the card goes away.
//!
//! ```
//! use trueno_bars::prelude::*;
//!
//! let config = CardConfig::from_yaml("entities: [sensor.cpu]")?;
//! let mut card = BarCard::new(config, SvgSink::new());
//!
//! let states = StateSnapshot::new().with("sensor.cpu", EntityState::new("40"));
//! card.update(&states, 0.0)?;
//! assert!(card.is_animating());
//! assert!(!card.frame(800.0)?);
//! assert!(card.sink().document().contains("40"));
//! # Ok::<(), trueno_bars::Error>(())
//! ```

use crate::animation::AnimationScheduler;
use crate::config::{normalize, CardConfig, RawCardConfig};
use crate::error::Result;
use crate::provider::{EntityState, StateProvider, StateSnapshot};
use crate::render::{plan, RenderTree};
use std::collections::BTreeMap;

/// Consumer of render trees.
///
/// Sinks draw exactly what the tree says; every numeric and color decision has
/// already been made by the planner.
pub trait ViewSink {
    /// Paint one frame.
    ///
    /// # Errors
    ///
    /// Implementation specific (usually I/O).
    fn paint(&mut self, tree: &RenderTree) -> Result<()>;
}

impl<S: ViewSink + ?Sized> ViewSink for &mut S {
    fn paint(&mut self, tree: &RenderTree) -> Result<()> {
        (**self).paint(tree)
    }
}

impl<S: ViewSink + ?Sized> ViewSink for Box<S> {
    fn paint(&mut self, tree: &RenderTree) -> Result<()> {
        (**self).paint(tree)
    }
}

/// One animated bar card.
#[derive(Debug)]
pub struct BarCard<S> {
    config: CardConfig,
    sink: S,
    scheduler: AnimationScheduler,
    /// States of the configured entities as of the last update.
    states: StateSnapshot,
    /// Last numeric reading per series index (NaN when never seen).
    previous: BTreeMap<usize, f64>,
    frames: u64,
}

impl<S: ViewSink> BarCard<S> {
    /// Create a card from a normalized configuration.
    pub fn new(config: CardConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            scheduler: AnimationScheduler::new(),
            states: StateSnapshot::new(),
            previous: BTreeMap::new(),
            frames: 0,
        }
    }

    /// Create a card from a raw configuration.
    ///
    /// # Errors
    ///
    /// Returns the normalization error; no card is created.
    pub fn from_raw(raw: &RawCardConfig, sink: S) -> Result<Self> {
        Ok(Self::new(normalize(raw)?, sink))
    }

    /// Replace the configuration.
    ///
    /// All running tweens are cancelled and every per-series cache is dropped,
    /// since series indices may now point at different entities. On error the
    /// current configuration stays in place.
    ///
    /// # Errors
    ///
    /// Returns the normalization error.
    pub fn set_config(&mut self, raw: &RawCardConfig) -> Result<()> {
        let config = normalize(raw)?;
        self.scheduler.reset();
        self.previous.clear();
        self.config = config;
        Ok(())
    }

    /// Apply a provider update at host time `now_ms`.
    ///
    /// Each series whose reading changed to a new finite number starts a tween
    /// towards it from the value on screen; a series seen for the first time,
    /// or back after being unavailable, animates in from its configured
    /// minimum. If any series is unchanged and idle the card
    /// repaints once immediately; moving series paint from [`Self::frame`].
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    pub fn update(&mut self, provider: &impl StateProvider, now_ms: f64) -> Result<()> {
        self.capture(provider);

        let mut repaint = false;
        for (index, series) in self.config.entities.iter().enumerate() {
            let reading = self.states.states.get(&series.entity).map_or(f64::NAN, EntityState::numeric);
            let previous = self.previous.get(&index).copied().unwrap_or(f64::NAN);

            if reading.is_finite() && reading != previous {
                // The cached value is what is on screen, even after a teardown
                // stopped the last tween short of `previous`.
                let from = if previous.is_nan() {
                    self.config.min_for(series)
                } else {
                    self.scheduler.value(index).unwrap_or(previous)
                };
                self.scheduler.start(index, from, reading, self.config.animation_duration, now_ms);
                self.previous.insert(index, reading);
            } else {
                if !reading.is_finite() {
                    self.previous.remove(&index);
                }
                if !self.scheduler.is_animating(index) {
                    repaint = true;
                }
            }
        }

        if repaint {
            self.render()?;
        }
        Ok(())
    }

    /// Advance every running tween to `now_ms` and repaint once.
    ///
    /// Returns whether another frame is wanted. Does nothing when idle.
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    pub fn frame(&mut self, now_ms: f64) -> Result<bool> {
        if !self.scheduler.has_active() {
            return Ok(false);
        }
        self.scheduler.advance(now_ms);
        self.render()?;
        Ok(self.scheduler.has_active())
    }

    /// Whether any series is still moving.
    pub fn is_animating(&self) -> bool {
        self.scheduler.has_active()
    }

    /// Cancel all running tweens. Later frames are no-ops until the next update.
    pub fn teardown(&mut self) {
        self.scheduler.cancel_all();
    }

    /// Plan the current frame without painting it.
    pub fn plan(&self) -> RenderTree {
        plan(&self.config, &self.states, self.scheduler.interpolated())
    }

    /// Plan and paint the current frame.
    ///
    /// # Errors
    ///
    /// Propagates sink errors.
    pub fn render(&mut self) -> Result<()> {
        let tree = self.plan();
        self.frames += 1;
        self.sink.paint(&tree)
    }

    /// Height hint in dashboard rows.
    pub fn card_size(&self) -> usize {
        self.config.card_size()
    }

    /// Active configuration.
    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Animation scheduler (read-only).
    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    /// Number of frames painted so far.
    pub fn frames_painted(&self) -> u64 {
        self.frames
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the card and return its sink.
    pub fn into_sink(mut self) -> S {
        self.scheduler.cancel_all();
        self.sink
    }

    fn capture(&mut self, provider: &impl StateProvider) {
        let mut states = StateSnapshot::new().with_language(provider.language());
        for series in &self.config.entities {
            if let Some(state) = provider.state(&series.entity) {
                states.set(series.entity.clone(), state.clone());
            }
        }
        self.states = states;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::STATE_UNAVAILABLE;
    use approx::assert_relative_eq;

    #[derive(Debug, Default)]
    struct Recorder {
        trees: Vec<RenderTree>,
    }

    impl ViewSink for Recorder {
        fn paint(&mut self, tree: &RenderTree) -> Result<()> {
            self.trees.push(tree.clone());
            Ok(())
        }
    }

    fn card(yaml: &str) -> BarCard<Recorder> {
        BarCard::new(CardConfig::from_yaml(yaml).unwrap(), Recorder::default())
    }

    fn states(value: &str) -> StateSnapshot {
        StateSnapshot::new().with("x", EntityState::new(value))
    }

    #[test]
    fn test_first_value_animates_from_series_min() {
        let mut card = card("entities: [{entity: x, min: 10, max: 110}]");
        card.update(&states("60"), 0.0).unwrap();

        let task = card.scheduler().task(0).unwrap();
        assert_relative_eq!(task.start_value(), 10.0);
        assert_relative_eq!(task.target(), 60.0);
        assert!(card.sink().trees.is_empty());
    }

    #[test]
    fn test_frame_paints_and_finishes() {
        let mut card = card("entities: [x]");
        card.update(&states("50"), 0.0).unwrap();

        assert!(card.frame(400.0).unwrap());
        let mid = card.sink().trees.last().unwrap().bars[0].percentage;
        assert!(mid > 0.0 && mid < 50.0);

        assert!(!card.frame(800.0).unwrap());
        assert_relative_eq!(card.sink().trees.last().unwrap().bars[0].percentage, 50.0);
        assert!(!card.is_animating());
        assert!(!card.frame(900.0).unwrap());
        assert_eq!(card.frames_painted(), 2);
    }

    #[test]
    fn test_unchanged_update_repaints_once() {
        let mut card = card("entities: [x]");
        card.update(&states("50"), 0.0).unwrap();
        card.frame(1000.0).unwrap();
        let painted = card.frames_painted();

        card.update(&states("50"), 2000.0).unwrap();
        assert_eq!(card.frames_painted(), painted + 1);
        assert!(!card.is_animating());
    }

    #[test]
    fn test_unavailable_update_repaints_placeholder() {
        let mut card = card("entities: [x]");
        card.update(&states(STATE_UNAVAILABLE), 0.0).unwrap();

        let bar = &card.sink().trees[0].bars[0];
        assert_eq!(bar.text, "N/A");
        assert!(!card.is_animating());
    }

    #[test]
    fn test_mid_flight_update_restarts_from_current_value() {
        let mut card = card("entities: [x]");
        card.update(&states("0"), 0.0).unwrap();
        card.frame(1000.0).unwrap();

        card.update(&states("100"), 1000.0).unwrap();
        card.frame(1400.0).unwrap();
        let reached = card.scheduler().value(0).unwrap();

        card.update(&states("20"), 1400.0).unwrap();
        let task = card.scheduler().task(0).unwrap();
        assert_relative_eq!(task.start_value(), reached);
        assert_relative_eq!(task.target(), 20.0);
    }

    #[test]
    fn test_teardown_stops_frames() {
        let mut card = card("entities: [x]");
        card.update(&states("50"), 0.0).unwrap();
        card.teardown();

        assert!(!card.is_animating());
        assert!(!card.frame(100.0).unwrap());
        assert_eq!(card.frames_painted(), 0);
    }

    #[test]
    fn test_update_after_teardown_starts_from_shown_value() {
        let mut card = card("entities: [x]");
        card.update(&states("0"), 0.0).unwrap();
        card.frame(1000.0).unwrap();
        card.update(&states("100"), 1000.0).unwrap();
        card.frame(1200.0).unwrap();
        let shown = card.sink().trees.last().unwrap().bars[0].percentage;
        card.teardown();

        card.update(&states("40"), 2000.0).unwrap();
        let task = card.scheduler().task(0).unwrap();
        assert_relative_eq!(task.start_value(), shown);
        assert!(shown < 100.0);
    }

    #[test]
    fn test_set_config_clears_state() {
        let mut card = card("entities: [x]");
        card.update(&states("50"), 0.0).unwrap();
        card.frame(200.0).unwrap();

        let raw = RawCardConfig::parse("entities: [y, z]").unwrap();
        card.set_config(&raw).unwrap();

        assert!(!card.is_animating());
        assert!(card.scheduler().interpolated().is_empty());
        assert_eq!(card.config().len(), 2);
    }

    #[test]
    fn test_set_config_error_keeps_previous() {
        let mut card = card("entities: [x]");
        let raw = RawCardConfig::parse("name: empty").unwrap();

        assert!(card.set_config(&raw).is_err());
        assert_eq!(card.config().entities[0].entity, "x");
    }

    #[test]
    fn test_card_size() {
        assert_eq!(card("entities: [a, b, c, d]").card_size(), 3);
    }

    #[test]
    fn test_boxed_sink() {
        let config = CardConfig::from_yaml("entities: [x]").unwrap();
        let mut card: BarCard<Box<dyn ViewSink>> = BarCard::new(config, Box::new(Recorder::default()));
        card.update(&states("unknown"), 0.0).unwrap();
        assert_eq!(card.frames_painted(), 1);
    }
}
