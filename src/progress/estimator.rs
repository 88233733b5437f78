// src/progress/estimator.rs

//! Linear progress / remaining-time extrapolation.
//!
//! The estimator knows nothing about ranks or images: it assumes every unit
//! of event weight costs the same wall-clock time, so early estimates can be
//! far off.
//!
//! The percentage is **not** clamped. If the program emits more weight than
//! `expected_total`, `percentage` goes above 100; the supervisor only
//! forwards values below 100 and reports 100 itself when the run ends.

use std::num::NonZeroU64;
use std::time::Instant;

use crate::types::EventWeight;

/// Mutable per-run state. Created at launch, dropped with the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    events: u64,
    started_at: Instant,
}

impl ProgressState {
    pub fn new(started_at: Instant) -> Self {
        Self {
            events: 0,
            started_at,
        }
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

/// Result of feeding one weight into the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// `floor(events / expected_total * 100)`, unclamped.
    pub percentage: u64,
    /// Seconds left, `None` until at least one event was observed.
    pub remaining_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Estimator {
    expected_total: NonZeroU64,
    state: ProgressState,
}

impl Estimator {
    pub fn new(expected_total: NonZeroU64, started_at: Instant) -> Self {
        Self {
            expected_total,
            state: ProgressState::new(started_at),
        }
    }

    pub fn expected_total(&self) -> NonZeroU64 {
        self.expected_total
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn events(&self) -> u64 {
        self.state.events
    }

    /// Add `weight` to the counter and recompute the estimate as of `now`.
    pub fn update(&mut self, weight: EventWeight, now: Instant) -> ProgressUpdate {
        self.state.events = self.state.events.saturating_add(u64::from(weight));

        ProgressUpdate {
            percentage: self.percentage(),
            remaining_secs: self.remaining_secs(now),
        }
    }

    pub fn percentage(&self) -> u64 {
        let scaled = u128::from(self.state.events) * 100;
        let pct = scaled / u128::from(self.expected_total.get());
        u64::try_from(pct).unwrap_or(u64::MAX)
    }

    pub fn remaining_secs(&self, now: Instant) -> Option<f64> {
        if self.state.events == 0 {
            return None;
        }

        let elapsed = now
            .saturating_duration_since(self.state.started_at)
            .as_secs_f64();
        let estimated_total =
            elapsed / self.state.events as f64 * self.expected_total.get() as f64;

        Some((estimated_total - elapsed).max(0.0))
    }
}
