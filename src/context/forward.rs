//! Identifier forwarding for outbound calls.
//!
//! Wrap an outbound HTTP client service with [`ForwardContextLayer`] and put
//! the inbound [`RequestContext`] into the outbound request's extensions.
//! The identifiers are copied onto the outbound headers unless the caller
//! already set any of them, and the call is bounded by the ingress deadline.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower::{BoxError, Layer, Service};

use crate::context::headers::IDENTIFIER_HEADERS;
use crate::context::request::RequestContext;

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("ingress deadline exceeded before the outbound call completed")]
    DeadlineExceeded,
    #[error(transparent)]
    Inner(BoxError),
}

/// Copy the context identifiers onto `headers`.
///
/// Returns `false` and leaves `headers` untouched when any identifier header
/// is already present: explicit outbound metadata always wins.
pub fn forward_identifiers(ctx: &RequestContext, headers: &mut HeaderMap) -> bool {
    if IDENTIFIER_HEADERS
        .iter()
        .any(|(_, header)| headers.contains_key(*header))
    {
        return false;
    }

    for (key, header) in IDENTIFIER_HEADERS {
        let value = ctx.get(key);
        if value.is_empty() {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(header), value);
        }
    }
    true
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardContextLayer;

impl<S> Layer<S> for ForwardContextLayer {
    type Service = ForwardContext<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ForwardContext { inner }
    }
}

#[derive(Debug, Clone)]
pub struct ForwardContext<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for ForwardContext<S>
where
    S: Service<Request<B>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = ForwardError;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, ForwardError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| ForwardError::Inner(e.into()))
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let ctx = request.extensions().get::<RequestContext>().cloned();
        let deadline = match &ctx {
            Some(ctx) => {
                if !forward_identifiers(ctx, request.headers_mut()) {
                    tracing::trace!("Outbound request carries explicit identifiers; not forwarding");
                }
                ctx.deadline()
            }
            None => None,
        };

        let fut = self.inner.call(request);
        Box::pin(async move {
            match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result.map_err(|e| ForwardError::Inner(e.into())),
                    Err(_) => Err(ForwardError::DeadlineExceeded),
                },
                None => fut.await.map_err(|e| ForwardError::Inner(e.into())),
            }
        })
    }
}
