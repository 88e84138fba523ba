//! Worker pool lifecycle and admission policy.
//!
//! The pool owns the workers, the pause flag, the rate limiter, and the
//! cancellation signal. Workers receive a closure composing the two
//! admission gates; the pause flag is checked first so a paused pool never
//! consumes rate-limit tokens.

use std::{fmt, sync::Arc, time::Duration};

use courier_core::{Clock, MessageValidator};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    cache::DispatchCache,
    client::WebhookClient,
    error::{DispatchError, Result},
    limiter::{RateLimiter, RateLimiterConfig},
    storage::MessageStore,
    worker::{AdmissionFn, DispatchWorker, WorkerConfig},
};

/// Configuration for the dispatch engine.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Number of concurrent workers. Zero disables the pool.
    pub num_workers: usize,

    /// How long a worker sleeps after an unproductive iteration.
    pub idle_interval: Duration,

    /// Maximum time to wait for workers during shutdown.
    pub shutdown_timeout: Duration,

    /// Whether the pool starts admitting jobs or paused.
    pub initial_fetch: bool,

    /// Token-bucket parameters for dispatch admission.
    pub limiter: RateLimiterConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            num_workers: crate::DEFAULT_WORKER_COUNT,
            idle_interval: Duration::from_millis(crate::DEFAULT_IDLE_INTERVAL_MS),
            shutdown_timeout: Duration::from_secs(30),
            initial_fetch: true,
            limiter: RateLimiterConfig::default(),
        }
    }
}

/// Externally visible pool state, driven by the pause flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    /// Workers are admitting new jobs.
    Running,
    /// Workers idle without touching the store.
    Paused,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Pool of dispatch workers with pause/resume control and graceful shutdown.
pub struct WorkerPool {
    store: Arc<dyn MessageStore>,
    client: Arc<WebhookClient>,
    cache: Arc<dyn DispatchCache>,
    validator: MessageValidator,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
    admitting: Arc<Mutex<bool>>,
    limiter: Arc<RateLimiter>,
    cancellation_token: CancellationToken,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a new worker pool. Workers are not spawned until
    /// [`WorkerPool::start`].
    ///
    /// Must be called within a tokio runtime (the rate limiter starts its
    /// refill task immediately).
    pub fn new(
        store: Arc<dyn MessageStore>,
        client: Arc<WebhookClient>,
        cache: Arc<dyn DispatchCache>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.limiter.clone()));
        let admitting = Arc::new(Mutex::new(config.initial_fetch));

        Self {
            store,
            client,
            cache,
            validator: MessageValidator::new(),
            clock,
            config,
            admitting,
            limiter,
            cancellation_token: CancellationToken::new(),
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the configured number of workers.
    ///
    /// A worker count of zero is a no-op. Each worker receives an admission
    /// predicate evaluating the pause flag before the rate limiter, in that
    /// order, so tokens are not drained while paused.
    pub fn start(&self) {
        if self.config.num_workers == 0 {
            info!("worker pool disabled, no workers to spawn");
            return;
        }

        info!(worker_count = self.config.num_workers, "spawning dispatch workers");

        let mut handles = self.worker_handles.lock();
        for i in 0..self.config.num_workers {
            let worker_id =
                format!("worker-{}-{}", i + 1, uuid::Uuid::new_v4().simple());

            let admitting = self.admitting.clone();
            let limiter = self.limiter.clone();
            let may_fetch: AdmissionFn = Arc::new(move || {
                if !*admitting.lock() {
                    return false;
                }
                limiter.allow()
            });

            let worker = DispatchWorker::new(
                worker_id,
                self.store.clone(),
                self.client.clone(),
                self.cache.clone(),
                self.validator,
                WorkerConfig { idle_interval: self.config.idle_interval },
                self.clock.clone(),
                may_fetch,
                self.cancellation_token.clone(),
            );

            handles.push(tokio::spawn(worker.run()));
        }

        info!(spawned_workers = handles.len(), "all dispatch workers spawned");
    }

    /// Resumes job admission. No-op if already running.
    pub fn resume(&self) {
        let mut admitting = self.admitting.lock();
        if *admitting {
            info!("workers already admitting new jobs");
            return;
        }
        info!("resuming job admission");
        *admitting = true;
    }

    /// Pauses job admission. No-op if already paused.
    ///
    /// Workers finish the dispatch they are in the middle of; nothing new is
    /// claimed while paused.
    pub fn pause(&self) {
        let mut admitting = self.admitting.lock();
        if !*admitting {
            info!("workers already paused");
            return;
        }
        info!("pausing job admission");
        *admitting = false;
    }

    /// Current pool status.
    pub fn status(&self) -> PoolStatus {
        if *self.admitting.lock() {
            PoolStatus::Running
        } else {
            PoolStatus::Paused
        }
    }

    /// Gracefully shuts the pool down.
    ///
    /// Pauses admission, stops the rate limiter's refill task, fires the
    /// cancellation signal, and waits for every worker to exit within
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::ShutdownTimeout` if workers are still running
    /// when the deadline elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        info!(timeout_ms = timeout.as_millis() as u64, "shutting down worker pool");

        self.pause();

        self.limiter.stop().await;

        self.cancellation_token.cancel();

        let handles = std::mem::take(&mut *self.worker_handles.lock());
        let worker_count = handles.len();

        let join_all = async {
            for (i, handle) in handles.into_iter().enumerate() {
                if let Err(join_error) = handle.await {
                    error!(worker_index = i, error = %join_error, "worker task panicked");
                }
            }
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => {
                info!(worker_count, "worker pool shutdown complete");
                Ok(())
            },
            Err(_elapsed) => {
                error!(
                    timeout_ms = timeout.as_millis() as u64,
                    "worker shutdown timed out, some workers may still be running"
                );
                Err(DispatchError::ShutdownTimeout { timeout })
            },
        }
    }

    /// Whether any worker task is still running.
    pub fn has_active_workers(&self) -> bool {
        self.worker_handles.lock().iter().any(|h| !h.is_finished())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let active = self.worker_handles.lock().iter().filter(|h| !h.is_finished()).count();

        if active > 0 && !self.cancellation_token.is_cancelled() {
            warn!(
                active_workers = active,
                "worker pool dropped with active workers, forcing cancellation"
            );
            self.cancellation_token.cancel();
        }
    }
}
