//! API request log.
//!
//! Every request produces three records on target
//! `request_observability::api`: `RequestStart` when it enters, then
//! `RequestEnd` and `finished call` when the response is ready. Failed
//! requests (status >= 400) are logged at error level with the captured
//! response body as `error`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::classify::{operation_label, trim_url, OperationLabel};
use crate::context::RequestContext;
use crate::http::capture::{capture_error_body, ErrorBody};
use crate::logging::attributes::LogAttributeSet;
use crate::observability::metrics;

pub const API_LOG_SOURCE: &str = "ApiRequestLog";
pub const API_LOG_TARGET: &str = "request_observability::api";

/// Settings for the API request log.
#[derive(Debug, Clone)]
pub struct ApiRequestLog {
    /// Largest error body read back for the `error` field.
    pub error_body_limit: usize,
}

impl Default for ApiRequestLog {
    fn default() -> Self {
        Self {
            error_body_limit: 64 * 1024,
        }
    }
}

/// Outcome of a completed request.
#[derive(Debug, Clone)]
pub struct RequestLogData {
    pub code: u16,
    pub time_ms: u128,
    pub error: String,
}

/// Attributes shared by all API request log records.
pub fn base_attributes(request: &Request) -> LogAttributeSet {
    let label = request
        .extensions()
        .get::<OperationLabel>()
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| {
            operation_label(request.method().as_str(), &request.uri().to_string())
        });
    let service = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let mut attributes = LogAttributeSet::new()
        .with("source", API_LOG_SOURCE)
        .with("protocol", "HTTP")
        .with("method_type", "unary")
        .with("component", "server")
        .with("method", label)
        .with("service", service)
        .with("url", trim_url(&request.uri().to_string()));

    match request.extensions().get::<RequestContext>() {
        Some(ctx) => {
            let headers: serde_json::Map<String, Value> = ctx
                .headers()
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            attributes.insert("headers", Value::Object(headers));
            attributes.extend(ctx.extras().flatten());
        }
        None => attributes.insert("headers", Value::Object(Default::default())),
    }
    attributes
}

pub fn log_request_start(attributes: &LogAttributeSet) {
    tracing::info!(target: API_LOG_TARGET, attributes = %attributes, "RequestStart");
}

pub fn log_request_end(attributes: &LogAttributeSet, message: &str, data: &RequestLogData) {
    let attributes = attributes
        .clone()
        .with("code", data.code)
        .with("time_ms", data.time_ms as u64)
        .with("error", data.error.as_str());
    if data.code >= 400 {
        tracing::error!(target: API_LOG_TARGET, attributes = %attributes, "{}", message);
    } else {
        tracing::info!(target: API_LOG_TARGET, attributes = %attributes, "{}", message);
    }
}

/// Middleware: log the start and end of each request.
pub async fn api_request_log_middleware(
    State(log): State<Arc<ApiRequestLog>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let attributes = base_attributes(&request);
    let method = request.method().to_string();
    log_request_start(&attributes);

    let response = capture_error_body(next.run(request).await, log.error_body_limit).await;

    let code = response.status().as_u16();
    let data = RequestLogData {
        code,
        time_ms: start.elapsed().as_millis(),
        error: response
            .extensions()
            .get::<ErrorBody>()
            .map(|e| e.as_str().to_string())
            .unwrap_or_default(),
    };
    log_request_end(&attributes, "RequestEnd", &data);
    log_request_end(&attributes, "finished call", &data);
    metrics::record_request(&method, code, start);

    response
}
