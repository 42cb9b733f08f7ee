//! The request-scoped context.
//!
//! # Responsibilities
//! - Hold the identifiers extracted at ingress
//! - Expose them by canonical key to the logger, mirroring and forwarding
//! - Carry the ingress deadline and caller extras
//!
//! # Design Decisions
//! - Created once per request, immutable, cheap to clone (`Arc` inside)
//! - Lives in the request extensions, never in process-wide state

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::context::extras::Extras;
use crate::context::headers::*;
use crate::context::id::{generate_correlation_id, generate_operation_id, EntropySource};
use crate::context::operation::OperationRequest;

/// Errors raised while establishing a request context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
    #[error("operation request rejected: {0}")]
    Operation(String),
}

impl IntoResponse for ContextError {
    fn into_response(self) -> Response {
        let message = match &self {
            ContextError::Entropy(_) => "failed to establish request identifiers".to_string(),
            ContextError::Operation(reason) => reason.clone(),
        };
        let body = serde_json::json!({
            "code": "InternalServerError",
            "message": message,
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Maps a canonical context key to the inbound header that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractionRule {
    pub key: String,
    pub header: String,
}

impl ExtractionRule {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
        }
    }

    /// The default rule set for ARM-style services.
    pub fn defaults() -> Vec<ExtractionRule> {
        vec![
            Self::new(CORRELATION_ID_KEY, CORRELATION_ID_HEADER),
            Self::new(OPERATION_ID_KEY, OPERATION_ID_HEADER),
            Self::new(CLIENT_REQUEST_ID_KEY, CLIENT_REQUEST_ID_HEADER),
            Self::new(TENANT_ID_KEY, CLIENT_TENANT_ID_HEADER),
            Self::new(ACCEPT_LANGUAGE_KEY, ACCEPT_LANGUAGE_HEADER),
        ]
    }
}

/// Immutable, per-request identifiers and metadata.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    correlation_id: String,
    operation_id: String,
    client_request_id: String,
    tenant_id: String,
    accept_language: String,
    headers: BTreeMap<String, String>,
    operation_id_generated: bool,
    correlation_id_generated: bool,
    deadline: Option<Instant>,
    extras: Extras,
    operation: OperationRequest,
}

impl RequestContext {
    /// Build a context from inbound headers.
    ///
    /// Missing operation and correlation ids are synthesized; that is the
    /// only step that can fail.
    pub fn extract(
        headers: &HeaderMap,
        rules: &[ExtractionRule],
        entropy: &dyn EntropySource,
    ) -> Result<Self, ContextError> {
        let mut values: BTreeMap<String, String> = BTreeMap::new();
        for rule in rules {
            let value = header_value(headers, &rule.header);
            if !value.is_empty() {
                values.insert(rule.key.clone(), value);
            }
        }

        let take = |key: &str| values.get(key).cloned().unwrap_or_default();
        let mut operation_id = take(OPERATION_ID_KEY);
        let mut correlation_id = take(CORRELATION_ID_KEY);
        let client_request_id = take(CLIENT_REQUEST_ID_KEY);
        let tenant_id = take(TENANT_ID_KEY);
        let accept_language = take(ACCEPT_LANGUAGE_KEY).to_lowercase();

        let operation_id_generated = operation_id.is_empty();
        if operation_id_generated {
            operation_id = generate_operation_id(entropy)?;
            values.insert(OPERATION_ID_KEY.to_string(), operation_id.clone());
        }

        let correlation_id_generated = correlation_id.is_empty();
        if correlation_id_generated {
            correlation_id = generate_correlation_id(entropy)?;
            values.insert(CORRELATION_ID_KEY.to_string(), correlation_id.clone());
        }

        Ok(Self {
            inner: Arc::new(Inner {
                correlation_id,
                operation_id,
                client_request_id,
                tenant_id,
                accept_language,
                headers: values,
                operation_id_generated,
                correlation_id_generated,
                deadline: None,
                extras: Extras::new(),
                operation: OperationRequest::default(),
            }),
        })
    }

    /// A copy of this context carrying the given deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.rebuild(|inner| inner.deadline = Some(deadline))
    }

    /// A copy of this context with `extras` layered over the current bag.
    pub fn with_extras<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        let extras = self.inner.extras.with_all(entries);
        self.rebuild(move |inner| inner.extras = extras)
    }

    /// A copy of this context carrying the given operation request.
    pub fn with_operation(&self, operation: OperationRequest) -> Self {
        self.rebuild(move |inner| inner.operation = operation)
    }

    fn rebuild(&self, change: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = Inner {
            correlation_id: self.inner.correlation_id.clone(),
            operation_id: self.inner.operation_id.clone(),
            client_request_id: self.inner.client_request_id.clone(),
            tenant_id: self.inner.tenant_id.clone(),
            accept_language: self.inner.accept_language.clone(),
            headers: self.inner.headers.clone(),
            operation_id_generated: self.inner.operation_id_generated,
            correlation_id_generated: self.inner.correlation_id_generated,
            deadline: self.inner.deadline,
            extras: self.inner.extras.clone(),
            operation: self.inner.operation.clone(),
        };
        change(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.inner.correlation_id
    }

    pub fn operation_id(&self) -> &str {
        &self.inner.operation_id
    }

    pub fn client_request_id(&self) -> &str {
        &self.inner.client_request_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.inner.tenant_id
    }

    pub fn accept_language(&self) -> &str {
        &self.inner.accept_language
    }

    pub fn operation_id_generated(&self) -> bool {
        self.inner.operation_id_generated
    }

    pub fn correlation_id_generated(&self) -> bool {
        self.inner.correlation_id_generated
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn operation(&self) -> &OperationRequest {
        &self.inner.operation
    }

    pub fn extras(&self) -> &Extras {
        &self.inner.extras
    }

    /// Non-empty values by canonical key, including synthesized ids.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.inner.headers
    }

    /// Look up a value by canonical key. Absent keys read as empty.
    pub fn get(&self, key: &str) -> &str {
        self.inner.headers.get(key).map(String::as_str).unwrap_or("")
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "request context not established",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::id::OsEntropy;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_extracts_known_headers() {
        let h = headers(&[
            (CORRELATION_ID_HEADER, "corr-1"),
            (OPERATION_ID_HEADER, "op-1"),
            (CLIENT_REQUEST_ID_HEADER, "client-1"),
            (CLIENT_TENANT_ID_HEADER, "tenant-1"),
            ("accept-language", "EN-US"),
        ]);
        let ctx = RequestContext::extract(&h, &ExtractionRule::defaults(), &OsEntropy).unwrap();

        assert_eq!(ctx.correlation_id(), "corr-1");
        assert_eq!(ctx.operation_id(), "op-1");
        assert_eq!(ctx.client_request_id(), "client-1");
        assert_eq!(ctx.tenant_id(), "tenant-1");
        assert_eq!(ctx.accept_language(), "en-us");
        assert!(!ctx.operation_id_generated());
        assert!(!ctx.correlation_id_generated());
    }

    #[test]
    fn test_missing_ids_are_synthesized() {
        let ctx =
            RequestContext::extract(&HeaderMap::new(), &ExtractionRule::defaults(), &OsEntropy)
                .unwrap();
        assert!(!ctx.operation_id().is_empty());
        assert!(!ctx.correlation_id().is_empty());
        assert!(ctx.operation_id_generated());
        assert_eq!(ctx.get(OPERATION_ID_KEY), ctx.operation_id());
        // absent optional values read as empty
        assert_eq!(ctx.client_request_id(), "");
        assert_eq!(ctx.get("no_such_key"), "");
    }

    #[test]
    fn test_custom_rules_land_in_header_subset() {
        let h = headers(&[("x-ms-home-tenant-id", "home-1")]);
        let mut rules = ExtractionRule::defaults();
        rules.push(ExtractionRule::new("home_tenant_id", "x-ms-home-tenant-id"));
        let ctx = RequestContext::extract(&h, &rules, &OsEntropy).unwrap();
        assert_eq!(ctx.get("home_tenant_id"), "home-1");
    }

    #[test]
    fn test_layering_does_not_mutate_original() {
        let ctx =
            RequestContext::extract(&HeaderMap::new(), &ExtractionRule::defaults(), &OsEntropy)
                .unwrap();
        let layered = ctx.with_extras([("k".to_string(), serde_json::json!("v"))]);
        assert!(ctx.extras().is_empty());
        assert_eq!(layered.extras().get("k"), Some(&serde_json::json!("v")));
        assert_eq!(layered.operation_id(), ctx.operation_id());
    }
}
