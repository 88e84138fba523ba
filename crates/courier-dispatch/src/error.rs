//! Error types for dispatch operations.
//!
//! Covers webhook rejection, network failures, storage and cache errors, and
//! the shutdown deadline. Workers isolate these per record; the only error
//! the pool itself surfaces is `ShutdownTimeout`.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Error conditions on the dispatch path.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Network-level connectivity failure reaching the webhook.
    #[error("network connection failed: {message}")]
    Network {
        /// Description of the network failure.
        message: String,
    },

    /// Webhook request timed out.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Configured timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// Webhook answered with a status other than 202 Accepted.
    #[error("webhook rejected message: HTTP {status_code}")]
    WebhookRejected {
        /// Status code returned by the webhook.
        status_code: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Webhook accepted the message but the acknowledgement did not parse.
    #[error("invalid webhook response: {message}")]
    InvalidResponse {
        /// Description of the decoding failure.
        message: String,
    },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] courier_core::CoreError),

    /// Cache write failed. Logged and swallowed by workers.
    #[error("cache error: {message}")]
    Cache {
        /// Description of the cache failure.
        message: String,
    },

    /// Invalid engine configuration.
    #[error("invalid dispatch configuration: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Workers did not exit before the shutdown deadline.
    #[error("worker pool shutdown timed out after {timeout:?}")]
    ShutdownTimeout {
        /// Deadline that was exceeded.
        timeout: Duration,
    },
}

impl DispatchError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a webhook rejection from a response.
    pub fn webhook_rejected(status_code: u16, body: impl Into<String>) -> Self {
        Self::WebhookRejected { status_code, body: body.into() }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Creates a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_display_carries_status_code() {
        let err = DispatchError::webhook_rejected(500, "boom");
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn timeout_display_format() {
        let err = DispatchError::timeout(30);
        assert_eq!(err.to_string(), "request timeout after 30s");
    }

    #[test]
    fn storage_errors_convert() {
        let core = courier_core::CoreError::NotFound("gone".to_string());
        let err = DispatchError::from(core);
        assert!(matches!(err, DispatchError::Storage(_)));
    }
}
