//! Concurrent dispatch engine for queued messages.
//!
//! Runs a pool of async workers that claim unsent messages from the store,
//! validate them, post them to a webhook endpoint, and persist the terminal
//! state. Admission to each dispatch cycle is gated twice: a pause flag
//! owned by the pool, then a token-bucket rate limiter, evaluated in that
//! order so a paused pool never drains tokens.
//!
//! # Engine layout
//!
//! ```text
//!            ┌───────────────────────────────────────────┐
//!            │                WorkerPool                  │
//!            │  pause flag ── RateLimiter ── cancellation │
//!            └──────┬───────────┬────────────┬───────────┘
//!                   │ admission │ predicate  │
//!                   ▼           ▼            ▼
//!            ┌──────────┐ ┌──────────┐ ┌──────────┐
//!            │ Worker 1 │ │ Worker 2 │ │ Worker N │
//!            └────┬─────┘ └────┬─────┘ └────┬─────┘
//!                 │ claim (FOR UPDATE SKIP LOCKED)
//!                 ▼
//!         MessageStore ── validate ── WebhookClient ── DispatchCache
//! ```
//!
//! Workers never share mutable state with each other; coordination happens
//! through the store's claim-exclusive transition and the pool's admission
//! predicate. Errors on the dispatch path are isolated per record; the only
//! way out of a worker loop is cancellation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod client;
pub mod error;
pub mod limiter;
pub mod storage;
pub mod worker;
pub mod worker_pool;

pub use cache::{CacheConfig, DispatchCache, InMemoryCache};
pub use client::{ClientConfig, WebhookAck, WebhookClient, WebhookRequest};
pub use error::{DispatchError, Result};
pub use limiter::{RateLimiter, RateLimiterConfig};
pub use storage::MessageStore;
pub use worker::{DispatchWorker, WorkerConfig};
pub use worker_pool::{DispatchConfig, PoolStatus, WorkerPool};

/// Default number of concurrent dispatch workers.
pub const DEFAULT_WORKER_COUNT: usize = 3;

/// Default idle interval between unproductive worker iterations.
pub const DEFAULT_IDLE_INTERVAL_MS: u64 = 1000;

/// Default webhook request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
