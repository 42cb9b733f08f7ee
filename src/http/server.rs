//! HTTP server setup and pipeline assembly.
//!
//! # Responsibilities
//! - Build every pipeline stage from configuration
//! - Wire the stages around an application Router in pipeline order
//! - Bind the server to a listener with graceful shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! RecoveryLayer → TraceLayer → propagation → response header mirroring
//!     → context logger → audit → API request log → TimeoutLayer → handler
//! ```
//!
//! The deadline wraps only the handler, so a timed-out request still
//! passes back through mirroring, audit and the API request log as a 408.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::audit::{audit_middleware, AuditEmitter, AuditSink, AuditState};
use crate::config::ObservabilityConfig;
use crate::context::{
    propagation_middleware, EntropySource, ExtrasFn, OperationCustomizer, Propagator,
};
use crate::http::response::{response_header_middleware, ResponseHeaderMirror};
use crate::logging::{
    api_request_log_middleware, context_logger_middleware, ApiRequestLog, LogAttributeSet,
    LoggerComposer,
};
use crate::recovery::RecoveryLayer;
use crate::redaction::{Redactor, StaticSchema};

/// All pipeline stages, built once and shared by every request.
pub struct ObservabilityStack {
    propagator: Propagator,
    composer: Arc<LoggerComposer>,
    api_log: Arc<ApiRequestLog>,
    audit: Option<Arc<AuditState>>,
    mirror: Arc<ResponseHeaderMirror>,
    redactor: Arc<Redactor>,
    recovery_status: StatusCode,
    request_timeout: Duration,
}

impl ObservabilityStack {
    /// Build the stack. `config` is expected to be validated.
    pub fn from_config(config: &ObservabilityConfig, sink: Arc<dyn AuditSink>) -> Self {
        let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
        let static_attributes: LogAttributeSet = config
            .logging
            .static_attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let error_body_limit = config.audit.error_body_limit;

        let audit = config.audit.enabled.then(|| {
            Arc::new(AuditState {
                emitter: AuditEmitter::new(sink, &config.audit),
                error_body_limit,
            })
        });

        let schema = config.schema.clone().unwrap_or_else(StaticSchema::new);

        Self {
            propagator: Propagator::new(config.propagation.extraction_rules.clone())
                .with_timeout(request_timeout),
            composer: Arc::new(LoggerComposer::new(static_attributes)),
            api_log: Arc::new(ApiRequestLog { error_body_limit }),
            audit,
            mirror: Arc::new(ResponseHeaderMirror::new(
                config.propagation.mirrored_response_keys.iter().cloned(),
            )),
            redactor: Arc::new(Redactor::new(Arc::new(schema))),
            recovery_status: StatusCode::from_u16(config.recovery.status_code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            request_timeout,
        }
    }

    /// Populate request extras from the inbound request.
    pub fn with_extras(mut self, extras: ExtrasFn) -> Self {
        self.propagator = self.propagator.with_extras(extras);
        self
    }

    /// Adjust or reject the operation request derived for each call.
    pub fn with_operation_customizer(mut self, customizer: OperationCustomizer) -> Self {
        self.propagator = self.propagator.with_customizer(customizer);
        self
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.propagator = self.propagator.with_entropy(entropy);
        self
    }

    pub fn redactor(&self) -> Arc<Redactor> {
        self.redactor.clone()
    }

    /// Wrap `router` with the full pipeline.
    pub fn apply(self, router: Router) -> Router {
        let mut router = router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.request_timeout,
            ))
            .layer(Extension(self.redactor))
            .layer(from_fn_with_state(self.api_log, api_request_log_middleware));
        if let Some(audit) = self.audit {
            router = router.layer(from_fn_with_state(audit, audit_middleware));
        }
        router
            .layer(from_fn_with_state(self.composer, context_logger_middleware))
            .layer(from_fn_with_state(self.mirror, response_header_middleware))
            .layer(from_fn_with_state(
                Arc::new(self.propagator),
                propagation_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(RecoveryLayer::new(self.recovery_status))
    }
}

/// HTTP server hosting an application behind the observability stack.
pub struct HttpServer {
    router: Router,
    config: ObservabilityConfig,
}

impl HttpServer {
    /// Create a new HTTP server for `app` with the given configuration.
    pub fn new(config: ObservabilityConfig, app: Router, sink: Arc<dyn AuditSink>) -> Self {
        let router = ObservabilityStack::from_config(&config, sink).apply(app);
        Self { router, config }
    }

    /// Build the server from an already assembled stack.
    pub fn with_stack(config: ObservabilityConfig, app: Router, stack: ObservabilityStack) -> Self {
        Self {
            router: stack.apply(app),
            config,
        }
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.server.request_timeout_secs,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ObservabilityConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
