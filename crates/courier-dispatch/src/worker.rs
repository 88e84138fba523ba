//! Individual dispatch worker.
//!
//! A worker loops until cancelled: consult the admission predicate, claim
//! one message, validate it, post it to the webhook, and persist the
//! terminal state. Each iteration is isolated; collaborator errors are
//! logged and the loop moves on. The only exit is cancellation.

use std::{sync::Arc, time::Duration};

use courier_core::{Clock, Message, MessageValidator};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    cache::DispatchCache,
    client::{WebhookClient, WebhookRequest},
    error::Result,
    storage::MessageStore,
};

/// Admission predicate supplied by the pool.
///
/// Consulted before every claim attempt; `false` means the pool is paused or
/// no rate-limit token is available, and the worker idles instead of
/// touching the store.
pub type AdmissionFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Per-worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long a worker sleeps after an unproductive iteration.
    pub idle_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { idle_interval: Duration::from_millis(crate::DEFAULT_IDLE_INTERVAL_MS) }
    }
}

/// Worker that dispatches one message at a time until cancelled.
pub struct DispatchWorker {
    id: String,
    store: Arc<dyn MessageStore>,
    client: Arc<WebhookClient>,
    cache: Arc<dyn DispatchCache>,
    validator: MessageValidator,
    config: WorkerConfig,
    clock: Arc<dyn Clock>,
    may_fetch: AdmissionFn,
    cancellation_token: CancellationToken,
}

impl DispatchWorker {
    /// Creates a new dispatch worker.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        store: Arc<dyn MessageStore>,
        client: Arc<WebhookClient>,
        cache: Arc<dyn DispatchCache>,
        validator: MessageValidator,
        config: WorkerConfig,
        clock: Arc<dyn Clock>,
        may_fetch: AdmissionFn,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            id,
            store,
            client,
            cache,
            validator,
            config,
            clock,
            may_fetch,
            cancellation_token,
        }
    }

    /// Main worker loop. Runs until the cancellation token fires.
    ///
    /// Never propagates collaborator errors; a bad record or a flaky
    /// dependency costs one iteration, not the worker.
    pub async fn run(self) {
        info!(worker_id = %self.id, "dispatch worker starting");

        loop {
            if self.cancellation_token.is_cancelled() {
                break;
            }

            if !(self.may_fetch)() {
                debug!(worker_id = %self.id, "job admission denied, waiting");
                if self.idle().await.is_break() {
                    break;
                }
                continue;
            }

            let dispatched = tokio::select! {
                result = self.dispatch_next() => match result {
                    Ok(dispatched) => dispatched,
                    Err(error) => {
                        error!(worker_id = %self.id, error = %error, "dispatch iteration failed");
                        // Skip the idle sleep so the next iteration re-checks
                        // admission promptly.
                        continue;
                    },
                },
                () = self.cancellation_token.cancelled() => break,
            };

            if !dispatched {
                debug!(
                    worker_id = %self.id,
                    interval_ms = self.config.idle_interval.as_millis() as u64,
                    "no unsent messages, sleeping"
                );
                if self.idle().await.is_break() {
                    break;
                }
            }
        }

        info!(worker_id = %self.id, "dispatch worker stopped");
    }

    /// Sleeps for the idle interval unless cancellation fires first.
    async fn idle(&self) -> std::ops::ControlFlow<()> {
        tokio::select! {
            () = self.clock.sleep(self.config.idle_interval) => std::ops::ControlFlow::Continue(()),
            () = self.cancellation_token.cancelled() => std::ops::ControlFlow::Break(()),
        }
    }

    /// Claims and dispatches at most one message.
    ///
    /// Returns `Ok(false)` when the queue was empty, `Ok(true)` when a
    /// record was claimed and driven to a terminal state (or as close to one
    /// as the collaborators allowed).
    ///
    /// # Errors
    ///
    /// Returns error only when the claim itself fails; everything after a
    /// successful claim is handled inside.
    async fn dispatch_next(&self) -> Result<bool> {
        let Some(message) = self.store.claim_next().await? else {
            return Ok(false);
        };

        info!(worker_id = %self.id, message_id = %message.id, "dispatching message");

        if let Err(validation) = self.validator.check(&message) {
            warn!(
                worker_id = %self.id,
                message_id = %message.id,
                error = %validation,
                "message failed validation"
            );
            self.mark_failed(&message, &format!("invalid message: {validation}")).await;
            return Ok(true);
        }

        let request = WebhookRequest {
            to: message.recipient.clone(),
            content: message.content.clone(),
        };

        let ack = match self.client.post_message(&request).await {
            Ok(ack) => ack,
            Err(error) => {
                warn!(
                    worker_id = %self.id,
                    message_id = %message.id,
                    error = %error,
                    "webhook dispatch failed"
                );
                self.mark_failed(&message, &format!("webhook dispatch failed: {error}")).await;
                return Ok(true);
            },
        };

        let now = self.clock.now_utc();
        if let Err(error) = self.store.mark_sent(message.id, &ack.message_id, now).await {
            // The webhook already accepted the message, so the record is left
            // in processing. The cache write below still happens: the cached
            // webhook id is how operators find acknowledged-but-unmarked
            // records.
            error!(
                worker_id = %self.id,
                message_id = %message.id,
                webhook_message_id = %ack.message_id,
                error = %error,
                "failed to mark message as sent"
            );
        }

        if let Err(error) = self.cache.set(&ack.message_id, &now.to_rfc3339()).await {
            warn!(
                worker_id = %self.id,
                message_id = %message.id,
                webhook_message_id = %ack.message_id,
                error = %error,
                "failed to cache dispatch result"
            );
        }

        info!(
            worker_id = %self.id,
            message_id = %message.id,
            webhook_message_id = %ack.message_id,
            "message dispatched"
        );

        Ok(true)
    }

    /// Records a terminal failure. A store error here is logged and
    /// swallowed; the iteration continues either way.
    async fn mark_failed(&self, message: &Message, reason: &str) {
        if let Err(error) = self.store.mark_failed(message.id, reason).await {
            error!(
                worker_id = %self.id,
                message_id = %message.id,
                error = %error,
                "failed to mark message as failed"
            );
        }
    }
}
