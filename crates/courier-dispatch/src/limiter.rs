//! Token-bucket admission control for dispatch attempts.
//!
//! The bucket starts full and drains one token per admitted dispatch. A
//! background task restores `refill_rate` tokens every `refill_interval`,
//! saturating at `max_tokens`. `allow` never blocks; callers back off on
//! their own schedule when refused.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Token-bucket parameters.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Bucket capacity. Zero makes the limiter a hard-closed gate.
    pub max_tokens: u32,
    /// Tokens restored per refill tick.
    pub refill_rate: u32,
    /// Interval between refill ticks.
    pub refill_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_tokens: 10, refill_rate: 5, refill_interval: Duration::from_secs(1) }
    }
}

/// Shared bucket state. One lock guards the count for both the refill task
/// and `allow`; it is never held across an await.
struct Bucket {
    tokens: Mutex<u32>,
    max_tokens: u32,
    refill_rate: u32,
}

impl Bucket {
    fn refill(&self) {
        let mut tokens = self.tokens.lock();
        *tokens = tokens.saturating_add(self.refill_rate).min(self.max_tokens);
        debug!(tokens = *tokens, "tokens refilled");
    }
}

/// Token-bucket rate limiter with a background refill task.
///
/// Created full. [`RateLimiter::stop`] terminates the refill task; the
/// bucket then drains whatever tokens remain and refuses everything after.
pub struct RateLimiter {
    bucket: Arc<Bucket>,
    stop: CancellationToken,
    refill_task: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Creates a new rate limiter and starts its refill task.
    ///
    /// Must be called within a tokio runtime. A zero refill rate or interval
    /// disables refilling; the bucket then only ever drains.
    pub fn new(config: RateLimiterConfig) -> Self {
        let bucket = Arc::new(Bucket {
            tokens: Mutex::new(config.max_tokens),
            max_tokens: config.max_tokens,
            refill_rate: config.refill_rate,
        });
        let stop = CancellationToken::new();

        let refill_task = if config.refill_rate == 0 || config.refill_interval.is_zero() {
            let stop = stop.clone();
            tokio::spawn(async move { stop.cancelled().await })
        } else {
            tokio::spawn(run_refill(bucket.clone(), config.refill_interval, stop.clone()))
        };

        Self { bucket, stop, refill_task: Mutex::new(Some(refill_task)) }
    }

    /// Attempts to take one token. Never blocks.
    ///
    /// Returns `true` and decrements the count when a token is available,
    /// `false` otherwise.
    pub fn allow(&self) -> bool {
        let mut tokens = self.bucket.tokens.lock();
        if *tokens > 0 {
            *tokens -= 1;
            debug!(remaining = *tokens, "token consumed");
            true
        } else {
            debug!("rate limit reached, no tokens available");
            false
        }
    }

    /// Tokens currently available.
    pub fn available(&self) -> u32 {
        *self.bucket.tokens.lock()
    }

    /// Stops the refill task. Idempotent.
    ///
    /// The limiter counts as stopped only once the refill task has
    /// terminated, which this method awaits. Later calls find the join
    /// handle already taken and return immediately.
    pub async fn stop(&self) {
        self.stop.cancel();

        let handle = self.refill_task.lock().take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                warn!(error = %error, "rate limiter refill task join failed");
            }
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        // Unblocks the refill task if the limiter is dropped without stop().
        self.stop.cancel();
    }
}

async fn run_refill(bucket: Arc<Bucket>, interval: Duration, stop: CancellationToken) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => bucket.refill(),
            () = stop.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_starts_full_and_drains() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 3,
            refill_rate: 1,
            refill_interval: Duration::from_secs(60),
        });

        assert_eq!(limiter.available(), 3);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
        assert_eq!(limiter.available(), 0);

        limiter.stop().await;
    }

    #[tokio::test]
    async fn zero_capacity_is_hard_closed() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 0,
            refill_rate: 0,
            refill_interval: Duration::from_millis(10),
        });

        for _ in 0..5 {
            assert!(!limiter.allow());
        }

        limiter.stop().await;
    }

    #[tokio::test]
    async fn refill_restores_tokens() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 2,
            refill_rate: 1,
            refill_interval: Duration::from_millis(20),
        });

        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(limiter.allow());

        limiter.stop().await;
    }

    #[tokio::test]
    async fn refill_saturates_at_capacity() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 3,
            refill_rate: 10,
            refill_interval: Duration::from_millis(10),
        });

        // Several ticks with a rate above capacity restore exactly to full.
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(limiter.available(), 3);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());

        limiter.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());

        limiter.stop().await;
        limiter.stop().await;
        limiter.stop().await;
    }

    #[tokio::test]
    async fn no_refill_after_stop() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_tokens: 2,
            refill_rate: 2,
            refill_interval: Duration::from_millis(10),
        });

        limiter.stop().await;

        // Remaining tokens still drain, then the gate stays closed.
        assert!(limiter.allow());
        assert!(limiter.allow());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!limiter.allow());
    }
}
