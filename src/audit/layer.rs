//! Audit middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::audit::emitter::{AuditEmitter, AuditRequest};
use crate::http::capture::{capture_error_body, ErrorBody};

/// State of [`audit_middleware`].
#[derive(Debug)]
pub struct AuditState {
    pub emitter: AuditEmitter,
    pub error_body_limit: usize,
}

/// Middleware: emit one audit record per completed request.
///
/// The record is sent on a spawned task after the response is produced;
/// the response itself is never delayed or altered by delivery.
pub async fn audit_middleware(
    State(state): State<Arc<AuditState>>,
    request: Request,
    next: Next,
) -> Response {
    let snapshot = AuditRequest::from_request(&request);
    let response = capture_error_body(next.run(request).await, state.error_body_limit).await;

    let error = response
        .extensions()
        .get::<ErrorBody>()
        .map(|e| e.as_str())
        .unwrap_or_default();
    state
        .emitter
        .emit(snapshot, response.status().as_u16(), error);
    response
}
