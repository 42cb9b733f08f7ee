//! Request log for outbound calls.
//!
//! [`ClientLogLayer`] wraps an outbound HTTP client service and writes one
//! `finished call` record per call on target `request_observability::client`,
//! with `component=client` and `protocol=REST`. Stack it outside
//! [`ForwardContextLayer`](crate::context::ForwardContextLayer) so deadline
//! failures are logged too.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::header::HOST;
use axum::http::{HeaderMap, Request, Response};
use serde_json::Value;
use tower::{Layer, Service};

use crate::classify::{operation_label, trim_url};
use crate::context::headers::{IDENTIFIER_HEADERS, OPERATION_ID_KEY};
use crate::context::RequestContext;
use crate::logging::api_log::API_LOG_SOURCE;
use crate::logging::attributes::LogAttributeSet;

pub const CLIENT_LOG_TARGET: &str = "request_observability::client";

/// Placeholder for values an outbound call never produced.
const NOT_AVAILABLE: &str = "na";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientLogLayer;

impl<S> Layer<S> for ClientLogLayer {
    type Service = ClientLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientLog { inner }
    }
}

#[derive(Debug, Clone)]
pub struct ClientLog<S> {
    inner: S,
}

/// Attributes known before the outbound call is sent.
pub fn client_attributes<B>(request: &Request<B>) -> LogAttributeSet {
    let uri = request.uri().to_string();
    let service = request
        .uri()
        .authority()
        .map(|a| a.to_string())
        .or_else(|| {
            request
                .headers()
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let mut attributes = LogAttributeSet::new()
        .with("source", API_LOG_SOURCE)
        .with("protocol", "REST")
        .with("method_type", "unary")
        .with("component", "client")
        .with("method", operation_label(request.method().as_str(), &uri))
        .with("service", service)
        .with("url", trim_url(&uri));
    if let Some(ctx) = request.extensions().get::<RequestContext>() {
        attributes.insert(OPERATION_ID_KEY, ctx.operation_id());
    }
    attributes
}

fn identifier_headers(headers: &HeaderMap) -> Value {
    let map: serde_json::Map<String, Value> = IDENTIFIER_HEADERS
        .iter()
        .filter_map(|(key, header)| {
            let value = headers.get(*header)?.to_str().ok()?;
            Some((key.to_string(), Value::from(value)))
        })
        .collect();
    Value::Object(map)
}

/// Write the `finished call` record for one outbound call.
pub fn log_client_call<R, E: fmt::Display>(
    attributes: LogAttributeSet,
    start: Instant,
    result: &Result<Response<R>, E>,
) {
    let attributes = attributes.with("time_ms", start.elapsed().as_millis() as u64);
    match result {
        Ok(response) => {
            let status = response.status();
            let attributes = attributes
                .with("headers", identifier_headers(response.headers()))
                .with("code", status.as_u16());
            if status.is_success() {
                let attributes = attributes.with("error", NOT_AVAILABLE);
                tracing::info!(target: CLIENT_LOG_TARGET, attributes = %attributes, "finished call");
            } else {
                let attributes = attributes.with("error", status.to_string());
                tracing::error!(target: CLIENT_LOG_TARGET, attributes = %attributes, "finished call");
            }
        }
        Err(err) => {
            let attributes = attributes
                .with("headers", Value::Object(Default::default()))
                .with("code", NOT_AVAILABLE)
                .with("error", err.to_string());
            tracing::error!(target: CLIENT_LOG_TARGET, attributes = %attributes, "finished call");
        }
    }
}

impl<S, B, R> Service<Request<B>> for ClientLog<S>
where
    S: Service<Request<B>, Response = Response<R>>,
    S::Error: fmt::Display + Send + 'static,
    S::Future: Send + 'static,
    R: Send + 'static,
{
    type Response = Response<R>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<R>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let start = Instant::now();
        let attributes = client_attributes(&request);
        let fut = self.inner.call(request);
        Box::pin(async move {
            let result = fut.await;
            log_client_call(attributes, start, &result);
            result
        })
    }
}
