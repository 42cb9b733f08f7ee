//! Demo server for the request observability pipeline.
//!
//! Serves a few routes behind the full stack:
//!
//! - `GET  /subscriptions/{sub}/resourceGroups/{rg}` echoes the request context
//! - `GET  /fail` returns a 409 with an error body
//! - `GET  /panic` panics inside the handler
//! - `POST /login` logs a redacted copy of the request body

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use request_observability::audit::TracingSink;
use request_observability::config::{load_config, ObservabilityConfig};
use request_observability::logging::init_logging;
use request_observability::observability::metrics;
use request_observability::redaction::{Loggable, Redactor};
use request_observability::{ContextLogger, HttpServer, RequestContext};

#[derive(Parser)]
#[command(name = "observability-demo")]
#[command(about = "Demo service behind the request observability pipeline", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoginRequest {
    user: String,
    password: String,
    #[serde(default)]
    profile: Value,
}

impl Loggable for LoginRequest {
    const MESSAGE_TYPE: &'static str = "demo.LoginRequest";
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ObservabilityConfig::default(),
    };

    init_logging(&config.logging);
    tracing::info!("observability-demo v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        audit_enabled = config.audit.enabled,
        "Configuration loaded"
    );

    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, demo_routes(), Arc::new(TracingSink));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_routes() -> Router {
    Router::new()
        .route(
            "/subscriptions/{subscription}/resourceGroups/{group}",
            get(echo_context),
        )
        .route("/fail", get(fail))
        .route("/panic", get(explode))
        .route("/login", post(login))
}

async fn echo_context(
    Path((subscription, group)): Path<(String, String)>,
    ctx: RequestContext,
    logger: ContextLogger,
) -> Json<Value> {
    logger
        .with("resource_group", group.as_str())
        .info("Echoing request context");
    Json(json!({
        "subscription": subscription,
        "resourceGroup": group,
        "operationId": ctx.operation_id(),
        "correlationId": ctx.correlation_id(),
        "clientRequestId": ctx.client_request_id(),
        "acceptLanguage": ctx.accept_language(),
    }))
}

async fn fail(logger: ContextLogger) -> (StatusCode, &'static str) {
    logger.warn("Rejecting request with a conflict");
    (StatusCode::CONFLICT, "widget already exists")
}

async fn explode() -> &'static str {
    panic!("demo handler panicked")
}

async fn login(
    logger: ContextLogger,
    Extension(redactor): Extension<Arc<Redactor>>,
    Json(request): Json<LoginRequest>,
) -> Json<Value> {
    let redacted = redactor.redact_message(&request);
    logger
        .with("request_body", redacted.clone())
        .info("Login request received");
    Json(json!({ "user": request.user, "logged": redacted }))
}
