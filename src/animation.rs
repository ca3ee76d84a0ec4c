//! Per-series value tweening.
//!
//! Each bar owns at most one [`AnimationTask`], keyed by its series index. The
//! [`AnimationScheduler`] is frame-driven and cooperative: the host calls
//! [`AnimationScheduler::tick`] (or [`AnimationScheduler::advance`] for every
//! live task) from its animation-frame callback with a millisecond timestamp.
//! Nothing runs between frames.
//!
//! # Restart semantics
//!
//! A new target for a series that is still moving cancels the running task and
//! starts the next one from the value last shown, so rapid updates never snap
//! the bar backwards.
//!
//! # Stale frames
//!
//! [`AnimationScheduler::start`] and a continuing tick hand out a
//! [`FrameRequest`]. Requests carry the generation of the task that issued
//! them; once that task is replaced, finished or cancelled the request is
//! stale and ticking it does nothing. This is what makes
//! [`AnimationScheduler::cancel_all`] final even for frames the host has
//! already queued.

use std::collections::BTreeMap;

/// Cubic ease-out: fast start, slow finish.
///
/// `t` is clamped to `[0, 1]`; the curve is monotone on that interval.
#[inline]
#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Result of advancing a task by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Still moving; carries the interpolated value.
    Continue(f64),
    /// Finished; carries the exact target.
    Done(f64),
}

/// One time-bounded interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTask {
    from: f64,
    to: f64,
    start_ms: f64,
    duration_ms: f64,
    cancelled: bool,
    last: Option<f64>,
    generation: u64,
}

impl AnimationTask {
    /// Create a task starting at `start_ms`.
    #[must_use]
    pub fn new(from: f64, to: f64, start_ms: f64, duration_ms: f64) -> Self {
        Self { from, to, start_ms, duration_ms, cancelled: false, last: None, generation: 0 }
    }

    /// Start value.
    #[must_use]
    pub fn start_value(&self) -> f64 {
        self.from
    }

    /// Target value.
    #[must_use]
    pub fn target(&self) -> f64 {
        self.to
    }

    /// Duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Linear progress in `[0, 1]` at `now_ms`.
    ///
    /// A non-positive duration is complete immediately.
    #[must_use]
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        let p = (now_ms - self.start_ms) / self.duration_ms;
        if p.is_nan() {
            1.0
        } else {
            p.clamp(0.0, 1.0)
        }
    }

    /// Value most recently produced; `None` before the first frame.
    #[must_use]
    pub fn last_value(&self) -> Option<f64> {
        self.last
    }

    /// Compute the value for `now_ms`.
    pub fn advance(&mut self, now_ms: f64) -> Step {
        let progress = self.progress(now_ms);
        if progress >= 1.0 || self.from == self.to {
            self.last = Some(self.to);
            return Step::Done(self.to);
        }
        let value = self.from + (self.to - self.from) * ease_out_cubic(progress);
        self.last = Some(value);
        Step::Continue(value)
    }

    /// Mark the task cancelled; it will not be ticked again.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Handle for one queued frame of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    index: usize,
    generation: u64,
}

impl FrameRequest {
    /// Series index the frame belongs to.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Outcome of [`AnimationScheduler::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The task moved and wants another frame.
    Continue(FrameRequest),
    /// The task reached its target and was removed.
    Done,
    /// The request belongs to a replaced, finished or cancelled task.
    Stale,
}

/// Owner of all running tasks and of the interpolated-value cache.
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    tasks: BTreeMap<usize, AnimationTask>,
    interpolated: BTreeMap<usize, f64>,
    next_generation: u64,
}

impl AnimationScheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the tween of series `index`.
    ///
    /// If a task is already running for `index` it is cancelled. The new task
    /// starts from the last value that task computed, or from `from` when it
    /// was replaced before its first frame.
    pub fn start(&mut self, index: usize, from: f64, to: f64, duration_ms: f64, now_ms: f64) -> FrameRequest {
        let from = match self.tasks.remove(&index) {
            Some(mut previous) => {
                previous.cancel();
                let resumed = previous.last_value().unwrap_or(from);
                tracing::trace!(index, resumed, target = to, "animation replaced mid-flight");
                resumed
            }
            None => from,
        };

        self.next_generation += 1;
        let mut task = AnimationTask::new(from, to, now_ms, duration_ms);
        task.generation = self.next_generation;
        self.tasks.insert(index, task);
        tracing::trace!(index, from, to, duration_ms, "animation started");

        FrameRequest { index, generation: self.next_generation }
    }

    /// Advance the task behind `request` to `now_ms`.
    pub fn tick(&mut self, request: FrameRequest, now_ms: f64) -> TickOutcome {
        let Some(task) = self.tasks.get_mut(&request.index) else {
            return TickOutcome::Stale;
        };
        if task.generation != request.generation || task.is_cancelled() {
            return TickOutcome::Stale;
        }

        match task.advance(now_ms) {
            Step::Continue(value) => {
                self.interpolated.insert(request.index, value);
                TickOutcome::Continue(request)
            }
            Step::Done(value) => {
                self.interpolated.insert(request.index, value);
                self.tasks.remove(&request.index);
                tracing::trace!(index = request.index, value, "animation finished");
                TickOutcome::Done
            }
        }
    }

    /// Tick every live task once. Returns true if any value changed.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let requests: Vec<FrameRequest> = self
            .tasks
            .iter()
            .filter(|(_, task)| !task.is_cancelled())
            .map(|(&index, task)| FrameRequest { index, generation: task.generation })
            .collect();

        for request in &requests {
            self.tick(*request, now_ms);
        }
        !requests.is_empty()
    }

    /// Cancel every task. Outstanding [`FrameRequest`]s become stale.
    ///
    /// The interpolated cache is kept so the last frame can still be painted.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.values_mut() {
            task.cancel();
        }
        if !self.tasks.is_empty() {
            tracing::trace!(count = self.tasks.len(), "animations cancelled");
        }
        self.tasks.clear();
    }

    /// Cancel everything and forget all interpolated values.
    ///
    /// Used when a new configuration invalidates series indices.
    pub fn reset(&mut self) {
        self.cancel_all();
        self.interpolated.clear();
    }

    /// Snapshot of interpolated values by series index.
    #[must_use]
    pub fn interpolated(&self) -> &BTreeMap<usize, f64> {
        &self.interpolated
    }

    /// Interpolated value of one series.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<f64> {
        self.interpolated.get(&index).copied()
    }

    /// Running task of one series.
    #[must_use]
    pub fn task(&self, index: usize) -> Option<&AnimationTask> {
        self.tasks.get(&index)
    }

    /// Whether series `index` is moving.
    #[must_use]
    pub fn is_animating(&self, index: usize) -> bool {
        self.tasks.contains_key(&index)
    }

    /// Whether any series is moving.
    #[must_use]
    pub fn has_active(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Number of running tasks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}
