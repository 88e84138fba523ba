//! HTTP server assembly and request routing.
//!
//! Requests flow through request-id injection, trace logging, and timeout
//! enforcement before reaching the handlers. The server shuts down
//! gracefully on SIGINT/SIGTERM, draining in-flight requests first.

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, put},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{handlers, AppState, Config};

/// Creates the axum router with all routes and middleware.
pub fn create_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/sent-messages", get(handlers::list_sent_messages))
        .route(
            "/worker-pool/state",
            put(handlers::control_worker_pool).get(handlers::worker_pool_status),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware injecting an `X-Request-Id` header into every response.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server and serves until a shutdown signal arrives.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or the server
/// fails while running.
pub async fn start_server(
    state: AppState,
    config: &Config,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use courier_core::{storage::Storage, RealClock};
    use courier_dispatch::{
        CacheConfig, ClientConfig, DispatchConfig, InMemoryCache, WebhookClient, WorkerPool,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    // The storage handle never runs a query in these tests; a lazy pool
    // provides a connectable-looking handle without a database.
    fn test_state() -> AppState {
        let pool = sqlx::PgPool::connect_lazy("postgresql://localhost/courier_test")
            .expect("lazy pool should build");
        let storage = Arc::new(Storage::new(pool));
        let clock = Arc::new(RealClock::new());

        let client = WebhookClient::new(ClientConfig::default()).expect("client should build");
        let worker_pool = Arc::new(WorkerPool::new(
            storage.clone(),
            Arc::new(client),
            Arc::new(InMemoryCache::new(CacheConfig::default(), clock.clone())),
            clock,
            DispatchConfig { num_workers: 0, ..DispatchConfig::default() },
        ));

        AppState::new(storage, worker_pool)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.expect("body should read").to_bytes();
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[tokio::test]
    async fn status_endpoint_reports_running() {
        let router = create_router(test_state(), &Config::default());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/worker-pool/state")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn pause_action_flips_status() {
        let router = create_router(test_state(), &Config::default());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/worker-pool/state")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"action": "pause"}"#))
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "paused");
    }

    #[tokio::test]
    async fn unknown_action_is_bad_request() {
        let router = create_router(test_state(), &Config::default());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/worker-pool/state")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"action": "reboot"}"#))
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let router = create_router(test_state(), &Config::default());

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/worker-pool/state")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert!(response.headers().contains_key("X-Request-Id"));
    }
}
