//! Ingress middleware that establishes the request context.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tokio::time::Instant;

use crate::context::headers::OPERATION_ID_HEADER;
use crate::context::id::{EntropySource, OsEntropy};
use crate::context::operation::{OperationCustomizer, OperationRequest};
use crate::context::request::{ContextError, ExtractionRule, RequestContext};

/// Caller hook that contributes extras from the inbound request.
pub type ExtrasFn = Arc<dyn Fn(&Parts) -> Vec<(String, Value)> + Send + Sync>;

/// Receives the operation id once the context is established.
///
/// Stages outside propagation insert one into the request extensions to
/// learn the id, including a synthesized one.
#[derive(Debug, Clone, Default)]
pub struct OperationIdSlot(Arc<OnceLock<String>>);

impl OperationIdSlot {
    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    fn fill(&self, operation_id: &str) {
        // first context wins
        let _ = self.0.set(operation_id.to_string());
    }
}

/// Builds a [`RequestContext`] for each inbound request.
pub struct Propagator {
    rules: Vec<ExtractionRule>,
    entropy: Arc<dyn EntropySource>,
    timeout: Option<Duration>,
    extras: Option<ExtrasFn>,
    customizer: Option<OperationCustomizer>,
}

impl Propagator {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self {
            rules,
            entropy: Arc::new(OsEntropy),
            timeout: None,
            extras: None,
            customizer: None,
        }
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Record `now + timeout` as the ingress deadline on every context.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_extras(mut self, extras: ExtrasFn) -> Self {
        self.extras = Some(extras);
        self
    }

    pub fn with_customizer(mut self, customizer: OperationCustomizer) -> Self {
        self.customizer = Some(customizer);
        self
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Establish the context for one request.
    pub fn establish(&self, parts: &Parts) -> Result<RequestContext, ContextError> {
        let mut ctx = RequestContext::extract(&parts.headers, &self.rules, self.entropy.as_ref())?;
        if let Some(timeout) = self.timeout {
            ctx = ctx.with_deadline(Instant::now() + timeout);
        }
        let mut operation = OperationRequest::from_parts(parts);
        if let Some(customize) = &self.customizer {
            customize(&mut operation, parts).map_err(ContextError::Operation)?;
        }
        ctx = ctx.with_operation(operation);
        if let Some(extras) = &self.extras {
            ctx = ctx.with_extras(extras(parts));
        }
        Ok(ctx)
    }
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new(ExtractionRule::defaults())
    }
}

impl std::fmt::Debug for Propagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Propagator")
            .field("rules", &self.rules)
            .field("timeout", &self.timeout)
            .field("extras", &self.extras.is_some())
            .field("customizer", &self.customizer.is_some())
            .finish()
    }
}

/// Middleware: attach a [`RequestContext`] to the request.
///
/// A synthesized operation id is also written back onto the inbound
/// `x-ms-acs-operation-id` header so handlers see one consistent value.
pub async fn propagation_middleware(
    State(propagator): State<Arc<Propagator>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let ctx = match propagator.establish(&parts) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(error = %err, "Failed to establish request context");
            return err.into_response();
        }
    };

    if let Some(slot) = parts.extensions.get::<OperationIdSlot>() {
        slot.fill(ctx.operation_id());
    }

    if ctx.operation_id_generated() {
        if let Ok(value) = HeaderValue::from_str(ctx.operation_id()) {
            parts.headers.insert(OPERATION_ID_HEADER, value);
        }
    }

    tracing::trace!(
        operation_id = %ctx.operation_id(),
        correlation_id = %ctx.correlation_id(),
        generated = ctx.operation_id_generated(),
        "Request context established"
    );

    parts.extensions.insert(ctx);
    next.run(Request::from_parts(parts, body)).await
}
