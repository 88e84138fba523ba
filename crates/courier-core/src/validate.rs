//! Structural validation of message records.
//!
//! Checks run synchronously before any webhook traffic, so a malformed
//! record fails fast without consuming an HTTP round-trip.

use thiserror::Error;

use crate::models::Message;

/// Minimum content length in characters.
pub const MIN_CONTENT_CHARS: usize = 1;

/// Maximum content length in characters.
pub const MAX_CONTENT_CHARS: usize = 160;

/// Violation of a message's structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Content is shorter than the minimum.
    #[error("content must not be empty")]
    EmptyContent,

    /// Content is longer than the maximum.
    #[error("content length {length} exceeds max of {max}")]
    ContentTooLong {
        /// Observed character count.
        length: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Recipient address is missing.
    #[error("recipient must not be empty")]
    EmptyRecipient,
}

/// Pure validator for message records. No I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageValidator;

impl MessageValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Checks a message's structural invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn check(&self, message: &Message) -> Result<(), ValidationError> {
        let length = message.content.chars().count();
        if length < MIN_CONTENT_CHARS {
            return Err(ValidationError::EmptyContent);
        }
        if length > MAX_CONTENT_CHARS {
            return Err(ValidationError::ContentTooLong { length, max: MAX_CONTENT_CHARS });
        }
        if message.recipient.is_empty() {
            return Err(ValidationError::EmptyRecipient);
        }
        Ok(())
    }
}
