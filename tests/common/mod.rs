//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use request_observability::audit::{AuditRecord, ChannelSink, NoopSink};
use request_observability::config::ObservabilityConfig;
use request_observability::{ContextLogger, HttpServer, ObservabilityStack, RequestContext};

/// Routes used by the pipeline tests.
pub fn test_routes() -> Router {
    Router::new()
        .route(
            "/subscriptions/{sub}/resourceGroups/{rg}",
            get(|ctx: RequestContext| async move { ctx.operation_id().to_string() }),
        )
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable") }),
        )
        .route("/healthz", get(|| async { "ok" }))
        .route(
            "/handler-header",
            get(|| async { ([("x-ms-acs-operation-id", "handler-set")], "ok") }),
        )
        .route(
            "/logger",
            get(|logger: ContextLogger| async move {
                logger.info("handler log line");
                "ok"
            }),
        )
        .route("/panic", get(explode))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                "slow ok"
            }),
        )
        .route(
            "/stall",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "too late"
            }),
        )
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

/// The test routes behind the full stack, auditing into a channel.
#[allow(dead_code)]
pub fn test_app(config: &ObservabilityConfig) -> (Router, mpsc::UnboundedReceiver<AuditRecord>) {
    let (sink, rx) = ChannelSink::new();
    let router = ObservabilityStack::from_config(config, Arc::new(sink)).apply(test_routes());
    (router, rx)
}

/// Start the test routes on an ephemeral port.
///
/// Dropping the returned sender shuts the server down.
#[allow(dead_code)]
pub async fn start_server(config: ObservabilityConfig) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, test_routes(), Arc::new(NoopSink));
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = server
            .run_until(listener, async move {
                let _ = rx.await;
            })
            .await;
    });
    (addr, tx)
}
