// crates/orion-core/src/clock.rs
// ============================================================================
// Module: Orion Clock
// Description: Injected time capability for wall-clock and monotonic reads.
// Purpose: Keep cooldown windows, circuit-breaker windows, and expirations
//          deterministically testable without real sleeps.
// Dependencies: time, std::time
// ============================================================================

//! ## Overview
//! Orion never reads wall-clock or monotonic time directly from component
//! logic. Every component that needs "now" takes a [`Clock`] capability at
//! construction. Production wiring uses [`SystemClock`]; tests use
//! [`FakeClock`], which can be advanced deterministically.
//!
//! Two distinct notions of time are exposed because the spec requires both:
//! - `now_utc` — wall-clock time for contract timestamps and `expires_at`.
//! - `monotonic` — a monotonic instant for cooldown and circuit-breaker
//!   windows, immune to wall-clock adjustment.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use time::OffsetDateTime;

/// Capability for reading the current time.
///
/// # Invariants
/// - `monotonic()` values are non-decreasing across calls on the same clock.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time in UTC.
    fn now_utc(&self) -> OffsetDateTime;

    /// Returns a monotonic instant suitable for interval arithmetic.
    fn monotonic(&self) -> Instant;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock for tests. Advance it explicitly with [`FakeClock::advance`].
///
/// Monotonic reads are derived from a fixed anchor [`Instant`] plus the
/// accumulated advanced duration, so they remain well-ordered even though the
/// wall-clock value is entirely synthetic.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    wall: OffsetDateTime,
    anchor: Instant,
    elapsed: Duration,
}

impl FakeClock {
    /// Creates a fake clock starting at the given wall-clock time.
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                wall: start,
                anchor: Instant::now(),
                elapsed: Duration::ZERO,
            })),
        }
    }

    /// Advances both the wall-clock and monotonic readings by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.wall += delta;
        state.elapsed += delta;
    }
}

impl Clock for FakeClock {
    fn now_utc(&self) -> OffsetDateTime {
        let state = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.wall
    }

    fn monotonic(&self) -> Instant {
        let state = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.anchor + state.elapsed
    }
}
