//! Request-bound structured logger.
//!
//! # Responsibilities
//! - Compose, once per request, a logger carrying the request attributes
//! - Make it retrievable from the request (extensions / extractor)
//! - Degrade to a "no context" logger when no request context exists
//!
//! # Design Decisions
//! - Attribute order is fixed: static, context ids and operation request,
//!   extras, operation label, header subset. Later writers win on
//!   duplicate keys.
//! - Composing emits nothing; only explicit level calls do.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{Extensions, Method, Uri};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use tracing::Level;

use crate::classify::{operation_label, OperationLabel};
use crate::context::headers::*;
use crate::context::RequestContext;
use crate::logging::attributes::LogAttributeSet;

/// `source` value of context logger records.
pub const CTX_LOG_SOURCE: &str = "CtxLog";
/// Tag carried by loggers created without a request context.
pub const NO_CONTEXT_TAG: &str = "self gen, not available in ctx";
pub const CTX_LOG_TARGET: &str = "request_observability::ctx";

/// A structured logger bound to one request's attributes.
#[derive(Debug, Clone)]
pub struct ContextLogger {
    attributes: Arc<LogAttributeSet>,
    detached: bool,
}

impl ContextLogger {
    pub fn new(attributes: LogAttributeSet) -> Self {
        Self {
            attributes: Arc::new(attributes),
            detached: false,
        }
    }

    /// Logger for code running outside any request.
    pub fn detached() -> Self {
        Self {
            attributes: Arc::new(LogAttributeSet::new().with("src", NO_CONTEXT_TAG)),
            detached: true,
        }
    }

    /// The request's logger, or a detached one if none was composed.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions
            .get::<ContextLogger>()
            .cloned()
            .unwrap_or_else(Self::detached)
    }

    /// A new logger with one more attribute. `self` is unchanged.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut attributes = (*self.attributes).clone();
        attributes.insert(key, value);
        Self {
            attributes: Arc::new(attributes),
            detached: self.detached,
        }
    }

    pub fn attributes(&self) -> &LogAttributeSet {
        &self.attributes
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::DEBUG, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Level::WARN, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::ERROR, message);
    }

    fn emit(&self, level: Level, message: &str) {
        let attributes = &*self.attributes;
        match level {
            Level::ERROR => {
                tracing::error!(target: CTX_LOG_TARGET, attributes = %attributes, "{}", message)
            }
            Level::WARN => {
                tracing::warn!(target: CTX_LOG_TARGET, attributes = %attributes, "{}", message)
            }
            Level::INFO => {
                tracing::info!(target: CTX_LOG_TARGET, attributes = %attributes, "{}", message)
            }
            _ => tracing::debug!(target: CTX_LOG_TARGET, attributes = %attributes, "{}", message),
        }
    }
}

impl<S> FromRequestParts<S> for ContextLogger
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

/// Builds the per-request [`ContextLogger`].
#[derive(Debug, Clone, Default)]
pub struct LoggerComposer {
    static_attributes: LogAttributeSet,
}

impl LoggerComposer {
    pub fn new(static_attributes: LogAttributeSet) -> Self {
        Self { static_attributes }
    }

    pub fn compose(
        &self,
        ctx: Option<&RequestContext>,
        method: &Method,
        uri: &Uri,
        label: &str,
    ) -> ContextLogger {
        // (1) static
        let mut attributes = LogAttributeSet::new().with("source", CTX_LOG_SOURCE);
        attributes.extend(
            self.static_attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone())),
        );

        let Some(ctx) = ctx else {
            attributes.insert("src", NO_CONTEXT_TAG);
            attributes.insert("method", label);
            return ContextLogger {
                attributes: Arc::new(attributes),
                detached: true,
            };
        };

        // (2) context-derived
        attributes.insert("request", uri.path());
        attributes.insert("http_method", method.as_str());
        attributes.insert(CORRELATION_ID_KEY, ctx.correlation_id());
        attributes.insert(OPERATION_ID_KEY, ctx.operation_id());
        attributes.insert(CLIENT_REQUEST_ID_KEY, ctx.client_request_id());
        attributes.insert(TENANT_ID_KEY, ctx.tenant_id());
        let op = ctx.operation();
        for (key, value) in [
            ("target_uri", &op.target_uri),
            ("api_version", &op.api_version),
            ("subscription_id", &op.subscription_id),
            ("resource_group", &op.resource_group),
        ] {
            if !value.is_empty() {
                attributes.insert(key, value.as_str());
            }
        }

        // (3) per-call extras
        attributes.extend(ctx.extras().flatten());

        // (4) classifier label
        attributes.insert("method", label);

        // (5) header subset
        let headers: serde_json::Map<String, Value> = ctx
            .headers()
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();
        attributes.insert("headers", Value::Object(headers));

        ContextLogger::new(attributes)
    }
}

/// Middleware: compose the request logger and the operation label.
pub async fn context_logger_middleware(
    State(composer): State<Arc<LoggerComposer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let label = operation_label(request.method().as_str(), &request.uri().to_string());
    let logger = {
        let ctx = request.extensions().get::<RequestContext>();
        composer.compose(ctx, request.method(), request.uri(), &label)
    };
    request.extensions_mut().insert(OperationLabel(label));
    request.extensions_mut().insert(logger);
    next.run(request).await
}
