//! Panic containment for the HTTP pipeline.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::FutureExt;
use tower::{Layer, Service};

use crate::context::headers::{CORRELATION_ID_HEADER, OPERATION_ID_HEADER};
use crate::context::OperationIdSlot;
use crate::observability::metrics;
use crate::recovery::provenance::{install_panic_hook, panic_message, take_location};

/// Converts panics in the wrapped service into an error response.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryLayer {
    status: StatusCode,
}

impl RecoveryLayer {
    /// Also installs the provenance hook.
    pub fn new(status: StatusCode) -> Self {
        install_panic_hook();
        Self { status }
    }
}

impl Default for RecoveryLayer {
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = Recovery<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recovery {
            inner,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recovery<S> {
    inner: S,
    status: StatusCode,
}

/// Request facts kept for the panic log.
struct RequestInfo {
    method: String,
    url: String,
    operation_id: Option<String>,
    correlation_id: Option<String>,
    established: OperationIdSlot,
}

impl RequestInfo {
    /// The inbound id, or the one propagation synthesized.
    fn operation_id(&self) -> Option<String> {
        self.operation_id
            .clone()
            .or_else(|| self.established.get().map(str::to_string))
    }
}

impl<S> Service<Request<Body>> for Recovery<S>
where
    S: Service<Request<Body>, Response = Response>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let established = OperationIdSlot::default();
        request.extensions_mut().insert(established.clone());
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let info = RequestInfo {
            method: request.method().to_string(),
            url: request.uri().to_string(),
            operation_id: header(OPERATION_ID_HEADER),
            correlation_id: header(CORRELATION_ID_HEADER),
            established,
        };
        let status = self.status;

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(request))) {
            Ok(future) => future,
            Err(payload) => {
                let response = recovered(status, &info, payload);
                return Box::pin(async move { Ok(response) });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Ok(recovered(status, &info, payload)),
            }
        })
    }
}

fn recovered(
    status: StatusCode,
    info: &RequestInfo,
    payload: Box<dyn std::any::Any + Send>,
) -> Response {
    let message = panic_message(payload.as_ref());
    let provenance = take_location()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    // null when the panic came before the context was established
    let operation_id = info.operation_id();

    tracing::error!(
        method = %info.method,
        url = %info.url,
        panic = %message,
        provenance = %provenance,
        operation_id = operation_id.as_deref().unwrap_or_default(),
        correlation_id = info.correlation_id.as_deref().unwrap_or_default(),
        "Recovered from panic"
    );
    metrics::record_panic_recovered();

    let code = status
        .canonical_reason()
        .map(|r| r.replace(' ', ""))
        .unwrap_or_else(|| "InternalServerError".to_string());
    let body = serde_json::json!({
        "code": code,
        "message": "Internal Server Error",
        "operationId": operation_id,
    });
    (status, Json(body)).into_response()
}
