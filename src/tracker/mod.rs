//! Stage Tracker: a wall-clock driven progress signal for long backend calls.
//!
//! The backend gives no progress callbacks, so perceived progress is
//! simulated by two timers running side by side:
//!
//! - a fine ticker that raises the current stage's fraction toward 1.0
//! - a coarse advancer that moves to the next stage after a fixed interval
//!
//! A full fraction only marks the stage complete for display; the index moves
//! only on the coarse timer or on [`StageTracker::finish`]. Both timers live in
//! a [`ScopedTasks`] set and every mutation they make is gated on the run id
//! and the `running` flag, so nothing lands after `stop()`/`finish()` or
//! bleeds into a newer run.
//!
//! Snapshots are published on a `tokio::sync::watch` channel; see
//! [`StageTracker::subscribe`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use crate::stage::{self, Stage};
use crate::tasks::ScopedTasks;

/// Timer settings for the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerTiming {
    /// Period of the fine ticker
    pub tick_interval: Duration,
    /// Fraction added to the current stage on every tick
    pub fraction_step: f64,
    /// Period of the coarse advancer
    pub advance_interval: Duration,
}

impl TrackerTiming {
    const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Replace values the timers cannot run with.
    ///
    /// Zero periods become 1 ms and a step outside `(0, 1]` (including NaN)
    /// falls back to the default step.
    pub fn sanitized(self) -> Self {
        let fraction_step = if self.fraction_step > 0.0 && self.fraction_step <= 1.0 {
            self.fraction_step
        } else {
            Self::default().fraction_step
        };
        Self {
            tick_interval: self.tick_interval.max(Self::MIN_PERIOD),
            fraction_step,
            advance_interval: self.advance_interval.max(Self::MIN_PERIOD),
        }
    }
}

impl Default for TrackerTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            fraction_step: 0.02,
            advance_interval: Duration::from_secs(8),
        }
    }
}

/// Point-in-time view of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageProgress {
    /// Incremented on every `start()`
    pub run: u64,
    /// Index of the active stage
    pub index: usize,
    /// Progress within the active stage, in `[0.0, 1.0]`
    pub fraction: f64,
    /// Whether the timers are live
    pub running: bool,
}

impl StageProgress {
    fn idle(run: u64) -> Self {
        Self {
            run,
            index: 0,
            fraction: 0.0,
            running: false,
        }
    }

    /// The active stage's metadata.
    pub fn stage(&self) -> Option<&'static Stage> {
        stage::get_stage(self.index)
    }

    /// Whether `stage` should render as done (checkmark).
    pub fn is_stage_complete(&self, stage: usize) -> bool {
        stage < self.index || (stage == self.index && self.fraction >= 1.0)
    }

    /// Overall completion across `stage_count` stages, in `[0.0, 1.0]`.
    pub fn overall(&self, stage_count: usize) -> f64 {
        if stage_count == 0 {
            return 0.0;
        }
        ((self.index as f64 + self.fraction) / stage_count as f64).clamp(0.0, 1.0)
    }

    /// Raise the fraction by `step`, clamped to 1.0. Returns whether it changed.
    pub(crate) fn tick(&mut self, step: f64) -> bool {
        if !step.is_finite() {
            return false;
        }
        let next = (self.fraction + step).clamp(0.0, 1.0);
        if next == self.fraction {
            return false;
        }
        self.fraction = next;
        true
    }

    /// Move to the next stage unless already at `last`. Returns whether it moved.
    pub(crate) fn advance(&mut self, last: usize) -> bool {
        if self.index >= last {
            return false;
        }
        self.index += 1;
        self.fraction = 0.0;
        true
    }
}

/// Owner of the progress signal and its two timers.
pub struct StageTracker {
    timing: TrackerTiming,
    last_index: usize,
    state: Arc<watch::Sender<StageProgress>>,
    timers: ScopedTasks,
}

impl StageTracker {
    /// Tracker over the static stage catalogue.
    pub fn new(timing: TrackerTiming) -> Self {
        Self::with_last_index(timing, stage::last_stage_index())
    }

    pub(crate) fn with_last_index(timing: TrackerTiming, last_index: usize) -> Self {
        let (tx, _rx) = watch::channel(StageProgress::idle(0));
        Self {
            timing: timing.sanitized(),
            last_index,
            state: Arc::new(tx),
            timers: ScopedTasks::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StageProgress> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StageProgress {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn timing(&self) -> TrackerTiming {
        self.timing
    }

    /// Restart from stage 0 and spawn both timers.
    ///
    /// Any previous run is stopped first. Must be called inside a Tokio runtime.
    pub fn start(&mut self) {
        self.timers.cancel_all();

        let mut run = 0;
        self.state.send_modify(|p| {
            run = p.run + 1;
            *p = StageProgress {
                running: true,
                ..StageProgress::idle(run)
            };
        });
        trace!(run, "stage tracker started");

        let now = Instant::now();
        let timing = self.timing;
        let last = self.last_index;

        let state = self.state.clone();
        self.timers.spawn(async move {
            let mut ticker = time::interval_at(now + timing.tick_interval, timing.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (live, _) = mutate_if_live(&state, run, |p| p.tick(timing.fraction_step));
                if !live {
                    break;
                }
            }
        });

        let state = self.state.clone();
        self.timers.spawn(async move {
            let mut advancer =
                time::interval_at(now + timing.advance_interval, timing.advance_interval);
            advancer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                advancer.tick().await;
                let (live, index) = mutate_if_live(&state, run, |p| p.advance(last));
                if !live || index >= last {
                    break;
                }
            }
        });
    }

    /// Jump to the last stage at full progress and stop the timers. Idempotent.
    pub fn finish(&mut self) {
        self.timers.cancel_all();
        let last = self.last_index;
        self.state.send_if_modified(|p| {
            let done = StageProgress {
                run: p.run,
                index: last,
                fraction: 1.0,
                running: false,
            };
            if *p == done {
                return false;
            }
            *p = done;
            true
        });
    }

    /// Halt the timers, leaving index and fraction where they are.
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        self.state.send_if_modified(|p| {
            if !p.running {
                return false;
            }
            p.running = false;
            true
        });
    }

    /// Halt the timers and zero the signal without starting a new run.
    pub fn reset(&mut self) {
        self.timers.cancel_all();
        self.state.send_modify(|p| *p = StageProgress::idle(p.run));
    }
}

/// Apply `f` only while `run` is the current live run.
///
/// Returns whether the run is still live and the resulting stage index.
fn mutate_if_live(
    state: &watch::Sender<StageProgress>,
    run: u64,
    f: impl FnOnce(&mut StageProgress) -> bool,
) -> (bool, usize) {
    let mut live = true;
    let mut index = 0;
    state.send_if_modified(|p| {
        index = p.index;
        if p.run != run || !p.running {
            live = false;
            return false;
        }
        let changed = f(p);
        index = p.index;
        changed
    });
    (live, index)
}
