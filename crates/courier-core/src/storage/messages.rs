//! Repository for message record database operations.
//!
//! Implements the claim-exclusive `unsent -> processing` transition and the
//! status-guarded terminal transitions the dispatch engine depends on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{CoreError, Result},
    models::{Message, MessageId},
};

const MESSAGE_COLUMNS: &str = "id, content, recipient, status, failure_reason, \
                               webhook_message_id, created_at, sent_at";

/// Repository for message records.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Atomically claims the oldest unsent message.
    ///
    /// The inner `SELECT ... FOR UPDATE SKIP LOCKED` makes concurrent claims
    /// lock-free: of N workers racing for the same record, one wins and the
    /// rest move on to the next record or observe an empty queue. The claimed
    /// record is returned in its post-update `processing` state.
    ///
    /// Returns `None` when no unsent record exists.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn claim_next(&self) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r"
            UPDATE messages
            SET status = 'processing'
            WHERE id = (
                SELECT id FROM messages
                WHERE status = 'unsent'
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {MESSAGE_COLUMNS}
            ",
        ))
        .fetch_optional(&*self.pool)
        .await?;

        Ok(message)
    }

    /// Transitions a message from `processing` to `sent`.
    ///
    /// Stamps `sent_at` and records the webhook's message identifier. The
    /// status guard rejects the update if the record is not `processing`,
    /// which keeps terminal states absorbing.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if no `processing` record with this id
    /// exists.
    pub async fn mark_sent(
        &self,
        id: MessageId,
        webhook_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated: Option<(MessageId,)> = sqlx::query_as(
            r"
            UPDATE messages
            SET status = 'sent', sent_at = $2, webhook_message_id = $3
            WHERE id = $1 AND status = 'processing'
            RETURNING id
            ",
        )
        .bind(id)
        .bind(sent_at)
        .bind(webhook_message_id)
        .fetch_optional(&*self.pool)
        .await?;

        if updated.is_none() {
            return Err(CoreError::NotFound(format!("no processing message with id {id}")));
        }

        Ok(())
    }

    /// Transitions a message from `processing` to `failed`.
    ///
    /// The reason is advisory and surfaces in the read API for operators.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if no `processing` record with this id
    /// exists.
    pub async fn mark_failed(&self, id: MessageId, reason: &str) -> Result<()> {
        let updated: Option<(MessageId,)> = sqlx::query_as(
            r"
            UPDATE messages
            SET status = 'failed', failure_reason = $2
            WHERE id = $1 AND status = 'processing'
            RETURNING id
            ",
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&*self.pool)
        .await?;

        if updated.is_none() {
            return Err(CoreError::NotFound(format!("no processing message with id {id}")));
        }

        Ok(())
    }

    /// Inserts a new unsent message and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn insert(&self, content: &str, recipient: &str) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r"
            INSERT INTO messages (content, recipient, status)
            VALUES ($1, $2, 'unsent')
            RETURNING {MESSAGE_COLUMNS}
            ",
        ))
        .bind(content)
        .bind(recipient)
        .fetch_one(&*self.pool)
        .await?;

        Ok(message)
    }

    /// Lists all messages in the `sent` state, newest dispatch first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list_sent(&self) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE status = 'sent'
            ORDER BY sent_at DESC
            ",
        ))
        .fetch_all(&*self.pool)
        .await?;

        Ok(messages)
    }

    /// Fetches a single message by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn find(&self, id: MessageId) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(message)
    }
}
