//! HTTP client for posting messages to the webhook endpoint.
//!
//! One request shape, one success shape: a JSON `{"to", "content"}` POST
//! answered by `202 Accepted` with `{"message", "messageId"}`. Anything else
//! is a rejection carrying the status code for the failure reason.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DispatchError, Result};

/// Configuration for the webhook client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the webhook service.
    pub base_url: String,
    /// Request path appended to the base URL.
    pub path: String,
    /// Timeout for each POST.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            path: "/messages".to_string(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "Courier-Dispatch/1.0".to_string(),
        }
    }
}

/// Outbound payload for one message.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookRequest {
    /// Destination address.
    pub to: String,
    /// Message text.
    pub content: String,
}

/// Acknowledgement returned by the webhook on acceptance.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAck {
    /// Human-readable acceptance message.
    pub message: String,
    /// Identifier the webhook assigned to the message.
    #[serde(rename = "messageId")]
    pub message_id: String,
}

/// HTTP client for webhook dispatch.
///
/// Wraps a pooled `reqwest` client with the configured timeout so concurrent
/// workers share connections to the single webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl WebhookClient {
    /// Creates a new webhook client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` if the HTTP client cannot be
    /// built with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                DispatchError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Posts one message to the webhook endpoint.
    ///
    /// Only `202 Accepted` with a parseable acknowledgement body counts as
    /// success. Every other status is `WebhookRejected` with the code.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the request exceeds the configured timeout.
    /// - `Network` for connection-level failures.
    /// - `WebhookRejected` for any non-202 status.
    /// - `InvalidResponse` if the 202 body does not decode.
    pub async fn post_message(&self, request: &WebhookRequest) -> Result<WebhookAck> {
        let url = format!("{}{}", self.config.base_url, self.config.path);

        debug!(url = %url, to = %request.to, "posting message to webhook");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::timeout(self.config.timeout.as_secs())
                } else if e.is_connect() {
                    DispatchError::network(format!("connection failed: {e}"))
                } else {
                    DispatchError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "webhook refused message");
            return Err(DispatchError::webhook_rejected(status.as_u16(), body));
        }

        let ack: WebhookAck = response
            .json()
            .await
            .map_err(|e| DispatchError::invalid_response(format!("malformed ack body: {e}")))?;

        debug!(webhook_message_id = %ack.message_id, "webhook accepted message");

        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(base_url: String) -> WebhookClient {
        WebhookClient::new(ClientConfig {
            base_url,
            path: "/hook".to_string(),
            ..ClientConfig::default()
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn accepted_response_yields_ack() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/hook"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::header("accept", "application/json"))
            .and(matchers::body_json(json!({"to": "+1234567890", "content": "hi"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "message": "Accepted",
                "messageId": "wh-1",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let request =
            WebhookRequest { to: "+1234567890".to_string(), content: "hi".to_string() };

        let ack = client.post_message(&request).await.expect("post should succeed");
        assert_eq!(ack.message_id, "wh-1");
        assert_eq!(ack.message, "Accepted");

        server.verify().await;
    }

    #[tokio::test]
    async fn server_error_is_rejection_with_status() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let request = WebhookRequest { to: "+1".to_string(), content: "hi".to_string() };

        let err = client.post_message(&request).await.expect_err("post should fail");
        match err {
            DispatchError::WebhookRejected { status_code, body } => {
                assert_eq!(status_code, 500);
                assert_eq!(body, "Internal Server Error");
            },
            other => unreachable!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ok_status_is_still_rejection() {
        // The contract is 202 exactly; a 200 means the endpoint did not
        // queue the message.
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let request = WebhookRequest { to: "+1".to_string(), content: "hi".to_string() };

        let err = client.post_message(&request).await.expect_err("post should fail");
        assert!(matches!(err, DispatchError::WebhookRejected { status_code: 200, .. }));
    }

    #[tokio::test]
    async fn malformed_ack_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let request = WebhookRequest { to: "+1".to_string(), content: "hi".to_string() };

        let err = client.post_message(&request).await.expect_err("post should fail");
        assert!(matches!(err, DispatchError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Port 1 is never listening.
        let client = test_client("http://127.0.0.1:1".to_string());
        let request = WebhookRequest { to: "+1".to_string(), content: "hi".to_string() };

        let err = client.post_message(&request).await.expect_err("post should fail");
        assert!(matches!(err, DispatchError::Network { .. }));
    }
}
