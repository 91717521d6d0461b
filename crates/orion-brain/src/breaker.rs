// crates/orion-brain/src/breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Per-action-type sliding-window failure counting with a lazy
//              open/closed latch.
// Purpose: Implement spec.md §4.5.
// Dependencies: orion-core
// ============================================================================

//! ## Overview
//! One breaker state per action type: a sliding list of failure instants
//! within the failure window, and an optional `opened_at` instant. The
//! OPEN -> CLOSED transition is checked lazily on `is_open` rather than on
//! a timer, per spec.md §4.5's explicit state machine.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

/// Default sliding window, in seconds, over which failures are counted.
pub const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(300);

/// Default failure count within the window that trips the breaker.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 3;

/// Default duration the breaker stays open once tripped.
pub const DEFAULT_OPEN_DURATION: Duration = Duration::from_secs(600);

#[derive(Debug, Default)]
struct BreakerState {
    failures: Vec<Instant>,
    opened_at: Option<Instant>,
}

/// Per-action-type circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    window: Duration,
    threshold: usize,
    open_duration: Duration,
    states: HashMap<String, BreakerState>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_WINDOW, DEFAULT_FAILURE_THRESHOLD, DEFAULT_OPEN_DURATION)
    }
}

impl CircuitBreaker {
    /// Builds a breaker with explicit thresholds.
    #[must_use]
    pub fn new(window: Duration, threshold: usize, open_duration: Duration) -> Self {
        Self { window, threshold, open_duration, states: HashMap::new() }
    }

    /// Records a failure for `action_type`, pruning entries outside the
    /// window, then opens the breaker if the in-window count reaches the
    /// threshold and it is not already open.
    pub fn record_failure(&mut self, action_type: &str, now: Instant) {
        let window = self.window;
        let threshold = self.threshold;
        let state = self.states.entry(action_type.to_string()).or_default();
        state.failures.push(now);
        state.failures.retain(|&failure| now.saturating_duration_since(failure) < window);
        if state.failures.len() >= threshold && state.opened_at.is_none() {
            state.opened_at = Some(now);
        }
    }

    /// Clears the failure list for `action_type`. Does not close an
    /// already-open breaker — the open timer must expire.
    pub fn record_success(&mut self, action_type: &str) {
        if let Some(state) = self.states.get_mut(action_type) {
            state.failures.clear();
        }
    }

    /// Returns `true` iff `action_type`'s breaker is open as of `now`. If
    /// the open duration has elapsed, clears the breaker (failures and
    /// `opened_at`) and returns `false`.
    pub fn is_open(&mut self, action_type: &str, now: Instant) -> bool {
        let Some(state) = self.states.get_mut(action_type) else {
            return false;
        };
        match state.opened_at {
            None => false,
            Some(opened_at) if now.saturating_duration_since(opened_at) < self.open_duration => true,
            Some(_) => {
                state.opened_at = None;
                state.failures.clear();
                false
            }
        }
    }
}
