//! In-memory message store for dispatch tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{CoreError, Message, MessageId, MessageStatus, Result};
use courier_dispatch::MessageStore;
use parking_lot::Mutex;

/// Trait-faithful in-memory store.
///
/// Mirrors the repository's semantics: claims are exclusive and ordered by
/// `created_at`, terminal marks are guarded on `processing`. Counts every
/// call so tests can assert on store traffic, and supports failure
/// injection for the partial-failure paths.
#[derive(Default)]
pub struct InMemoryStore {
    messages: Mutex<Vec<Message>>,
    claim_calls: AtomicUsize,
    mark_sent_calls: AtomicUsize,
    mark_failed_calls: AtomicUsize,
    fail_claims: AtomicBool,
    fail_mark_sent: AtomicBool,
    fail_mark_failed: AtomicBool,
    block_claims: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given messages.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let store = Self::new();
        *store.messages.lock() = messages;
        store
    }

    /// Adds an unsent message and returns its id.
    pub fn push_unsent(
        &self,
        content: &str,
        recipient: &str,
        created_at: DateTime<Utc>,
    ) -> MessageId {
        let message = crate::unsent_message(content, recipient, created_at);
        let id = message.id;
        self.messages.lock().push(message);
        id
    }

    /// Snapshot of a message by id.
    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }

    /// Number of messages currently in the given status.
    pub fn count_with_status(&self, status: MessageStatus) -> usize {
        self.messages.lock().iter().filter(|m| m.status == status).count()
    }

    /// How many times `claim_next` was called.
    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    /// How many times `mark_sent` was called.
    pub fn mark_sent_calls(&self) -> usize {
        self.mark_sent_calls.load(Ordering::SeqCst)
    }

    /// How many times `mark_failed` was called.
    pub fn mark_failed_calls(&self) -> usize {
        self.mark_failed_calls.load(Ordering::SeqCst)
    }

    /// Makes every claim return a database error.
    pub fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    /// Makes every `mark_sent` return a database error.
    pub fn fail_mark_sent(&self, fail: bool) {
        self.fail_mark_sent.store(fail, Ordering::SeqCst);
    }

    /// Makes every `mark_failed` return a database error.
    pub fn fail_mark_failed(&self, fail: bool) {
        self.fail_mark_failed.store(fail, Ordering::SeqCst);
    }

    /// Makes every claim hang until cancellation drops the call.
    pub fn block_claims(&self, block: bool) {
        self.block_claims.store(block, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn claim_next(&self) -> Result<Option<Message>> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);

        if self.block_claims.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(CoreError::Database("injected claim failure".to_string()));
        }

        let mut messages = self.messages.lock();
        let next = messages
            .iter_mut()
            .filter(|m| m.status == MessageStatus::Unsent)
            .min_by_key(|m| m.created_at);

        match next {
            Some(message) => {
                message.status = MessageStatus::Processing;
                Ok(Some(message.clone()))
            },
            None => Ok(None),
        }
    }

    async fn mark_sent(
        &self,
        id: MessageId,
        webhook_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        self.mark_sent_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_mark_sent.load(Ordering::SeqCst) {
            return Err(CoreError::Database("injected mark_sent failure".to_string()));
        }

        let mut messages = self.messages.lock();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id && m.status == MessageStatus::Processing)
            .ok_or_else(|| CoreError::NotFound(format!("no processing message with id {id}")))?;

        message.status = MessageStatus::Sent;
        message.webhook_message_id = Some(webhook_message_id.to_string());
        message.sent_at = Some(sent_at);
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, reason: &str) -> Result<()> {
        self.mark_failed_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_mark_failed.load(Ordering::SeqCst) {
            return Err(CoreError::Database("injected mark_failed failure".to_string()));
        }

        let mut messages = self.messages.lock();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id && m.status == MessageStatus::Processing)
            .ok_or_else(|| CoreError::NotFound(format!("no processing message with id {id}")))?;

        message.status = MessageStatus::Failed;
        message.failure_reason = Some(reason.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claims_follow_created_at_order() {
        let store = InMemoryStore::new();
        let base = Utc::now();
        let second = store.push_unsent("b", "+2", base + chrono::Duration::seconds(10));
        let first = store.push_unsent("a", "+1", base);

        let claimed = store.claim_next().await.expect("claim should succeed");
        assert_eq!(claimed.expect("should claim").id, first);

        let claimed = store.claim_next().await.expect("claim should succeed");
        assert_eq!(claimed.expect("should claim").id, second);

        assert!(store.claim_next().await.expect("claim should succeed").is_none());
    }

    #[tokio::test]
    async fn terminal_marks_require_processing() {
        let store = InMemoryStore::new();
        let id = store.push_unsent("a", "+1", Utc::now());

        // Not yet claimed: both marks refuse.
        assert!(store.mark_sent(id, "wh", Utc::now()).await.is_err());
        assert!(store.mark_failed(id, "nope").await.is_err());

        store.claim_next().await.expect("claim should succeed");
        store.mark_sent(id, "wh", Utc::now()).await.expect("mark should succeed");

        // Terminal states absorb.
        assert!(store.mark_failed(id, "late").await.is_err());
        assert_eq!(
            store.message(id).expect("message exists").status,
            MessageStatus::Sent
        );
    }
}
