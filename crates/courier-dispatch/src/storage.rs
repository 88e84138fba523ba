//! Storage abstraction consumed by dispatch workers.
//!
//! Workers see only this trait; production wires it to the PostgreSQL
//! repository while tests substitute an in-memory double. The trait is the
//! exact surface a worker needs for one claim epoch: claim, then one
//! terminal mark.

use async_trait::async_trait;
use courier_core::{storage::Storage, Message, MessageId, Result};

/// Store operations required by the dispatch engine.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Atomically claims the oldest unsent message, moving it to
    /// `processing`. Returns `None` when the queue is empty.
    async fn claim_next(&self) -> Result<Option<Message>>;

    /// Transitions a claimed message to `sent`, recording the webhook's
    /// identifier and the dispatch timestamp.
    async fn mark_sent(
        &self,
        id: MessageId,
        webhook_message_id: &str,
        sent_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;

    /// Transitions a claimed message to `failed` with an advisory reason.
    async fn mark_failed(&self, id: MessageId, reason: &str) -> Result<()>;
}

#[async_trait]
impl MessageStore for Storage {
    async fn claim_next(&self) -> Result<Option<Message>> {
        self.messages.claim_next().await
    }

    async fn mark_sent(
        &self,
        id: MessageId,
        webhook_message_id: &str,
        sent_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        self.messages.mark_sent(id, webhook_message_id, sent_at).await
    }

    async fn mark_failed(&self, id: MessageId, reason: &str) -> Result<()> {
        self.messages.mark_failed(id, reason).await
    }
}
