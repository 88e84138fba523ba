//! Deterministic clock for time-based tests.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use courier_core::Clock;

/// Clock whose time only moves when a test advances it.
///
/// `sleep` advances the clock by the requested duration and yields once, so
/// worker idle loops progress without real waits while cancellation still
/// gets a chance to fire.
#[derive(Clone)]
pub struct TestClock {
    elapsed_ns: Arc<AtomicU64>,
    base_instant: Instant,
    base_utc: DateTime<Utc>,
}

impl TestClock {
    /// Creates a test clock starting at a fixed wall-clock instant.
    pub fn new() -> Self {
        Self {
            elapsed_ns: Arc::new(AtomicU64::new(0)),
            base_instant: Instant::now(),
            base_utc: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    /// Creates a test clock starting at the given wall-clock time.
    pub fn starting_at(base_utc: DateTime<Utc>) -> Self {
        Self { elapsed_ns: Arc::new(AtomicU64::new(0)), base_instant: Instant::now(), base_utc }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let ns = u64::try_from(duration.as_nanos().min(u128::from(u64::MAX))).unwrap_or(u64::MAX);
        self.elapsed_ns.fetch_add(ns, Ordering::AcqRel);
    }

    /// Time elapsed since clock creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Acquire))
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.base_utc
            + chrono::Duration::from_std(self.elapsed()).unwrap_or(chrono::Duration::zero())
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}
