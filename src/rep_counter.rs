//! Stage-transition rep counting (C5): the plain monotonic counter every
//! analyzer carries, plus a debounce gate for the analyzers that require a
//! minimum interval and minimum angle excursion between counted reps
//! (situp; `spec.md` §4.5).
//!
//! Grounded on the rep-increment pattern used throughout
//! `examples/original_source/backend/src/services/python/*_analyzer.py`
//! (a plain integer counter mutated on a detected transition), generalized
//! into a small reusable type rather than duplicated nine times.

use std::time::{Duration, Instant};

/// A monotonically non-decreasing rep count (`spec.md` §3 invariant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepCounter {
    count: u64,
}

impl RepCounter {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Debounce discipline for analyzers that must wait a minimum interval and
/// observe a minimum angle excursion before crediting a rep (`spec.md`
/// §4.5, used by situp). Tracks the most extreme angle observed since the
/// debounce window was armed (e.g. the minimum angle while `down`) so the
/// excursion can be measured against the angle at commit time.
#[derive(Debug, Clone, Copy)]
pub struct DebounceGate {
    min_interval: Duration,
    min_excursion: f32,
    last_rep_at: Option<Instant>,
    extreme: Option<f32>,
}

impl DebounceGate {
    pub fn new(min_interval: Duration, min_excursion: f32) -> Self {
        Self {
            min_interval,
            min_excursion,
            last_rep_at: None,
            extreme: None,
        }
    }

    /// Record an observed angle while armed (e.g. every frame while the
    /// analyzer is in its `down` phase), keeping the most extreme value
    /// per `more_extreme` (e.g. `|a| < |b|` to track a minimum).
    pub fn observe(&mut self, value: f32, more_extreme: impl Fn(f32, f32) -> bool) {
        self.extreme = Some(match self.extreme {
            Some(current) if !more_extreme(value, current) => current,
            _ => value,
        });
    }

    /// Attempt to credit a rep at `now`, given the angle value at the
    /// moment of the committing transition. Succeeds only if both the
    /// minimum interval has elapsed since the previous credited rep and
    /// the excursion from the tracked extreme meets `min_excursion`.
    /// Resets the tracked extreme regardless of outcome, since the next
    /// cycle starts fresh.
    pub fn try_commit(&mut self, now: Instant, value_at_commit: f32) -> bool {
        let excursion = self
            .extreme
            .map(|extreme| (value_at_commit - extreme).abs())
            .unwrap_or(0.0);
        self.extreme = None;

        let interval_ok = match self.last_rep_at {
            None => true,
            Some(prev) => now.duration_since(prev) >= self.min_interval,
        };
        if interval_ok && excursion >= self.min_excursion {
            self.last_rep_at = Some(now);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_rep_at = None;
        self.extreme = None;
    }
}
