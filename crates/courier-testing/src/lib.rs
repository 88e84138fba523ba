//! Test doubles for exercising the dispatch engine without external
//! services.
//!
//! Provides a deterministic clock, an in-memory message store implementing
//! the same trait the PostgreSQL repository satisfies, and a recording
//! cache. Used by the unit and integration tests of the other crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod store;
pub mod time;

pub use cache::RecordingCache;
pub use store::InMemoryStore;
pub use time::TestClock;

use chrono::{DateTime, Utc};
use courier_core::{Message, MessageId, MessageStatus};

/// Builds an unsent message fixture with the given payload.
pub fn unsent_message(content: &str, recipient: &str, created_at: DateTime<Utc>) -> Message {
    Message {
        id: MessageId::new(),
        content: content.to_string(),
        recipient: recipient.to_string(),
        status: MessageStatus::Unsent,
        failure_reason: None,
        webhook_message_id: None,
        created_at,
        sent_at: None,
    }
}
