//! Clock abstraction for testable timing.
//!
//! Workers stamp dispatch timestamps and sleep between idle iterations;
//! injecting the clock lets tests control both without real waits.

use std::{
    future::Future,
    pin::Pin,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

/// Source of time for the dispatch engine.
///
/// Production code uses [`RealClock`]; tests inject a controllable
/// implementation so idle intervals and TTLs resolve deterministically.
pub trait Clock: Send + Sync {
    /// Current instant, for durations and expiry arithmetic.
    fn now(&self) -> Instant;

    /// Current wall-clock time, for persisted timestamps.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Sleeps for the given duration.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production clock backed by the system time and tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
