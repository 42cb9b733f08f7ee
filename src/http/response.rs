//! Response header mirroring.
//!
//! # Responsibilities
//! - Copy selected request identifiers onto the response headers
//!
//! # Design Decisions
//! - Headers already set by the handler are never replaced
//! - Empty values are not written

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::context::headers::response_header_for;
use crate::context::RequestContext;

/// The canonical keys to mirror and their response headers.
#[derive(Debug, Clone)]
pub struct ResponseHeaderMirror {
    headers: Vec<(String, HeaderName)>,
}

impl ResponseHeaderMirror {
    /// Keys without a known response header are skipped.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let headers = keys
            .into_iter()
            .filter_map(|key| {
                let key = key.into();
                let header = response_header_for(&key)?;
                Some((key, HeaderName::from_static(header)))
            })
            .collect();
        Self { headers }
    }

    /// Write the mirrored values from `ctx` onto `response`.
    pub fn apply(&self, ctx: &RequestContext, response: &mut Response) {
        let headers = response.headers_mut();
        for (key, name) in &self.headers {
            if headers.contains_key(name) {
                continue;
            }
            let value = ctx.get(key);
            if value.is_empty() {
                continue;
            }
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name.clone(), value);
            }
        }
    }
}

/// Middleware: mirror request identifiers onto the response.
pub async fn response_header_middleware(
    State(mirror): State<Arc<ResponseHeaderMirror>>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = request.extensions().get::<RequestContext>().cloned();
    let mut response = next.run(request).await;
    if let Some(ctx) = ctx {
        mirror.apply(&ctx, &mut response);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::headers::*;
    use crate::context::{ExtractionRule, OsEntropy};
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;

    fn ctx() -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(OPERATION_ID_HEADER, HeaderValue::from_static("op-1"));
        headers.insert(CORRELATION_ID_HEADER, HeaderValue::from_static("corr-1"));
        RequestContext::extract(&headers, &ExtractionRule::defaults(), &OsEntropy).unwrap()
    }

    #[test]
    fn test_mirrors_configured_keys_only() {
        let mirror = ResponseHeaderMirror::new([OPERATION_ID_KEY, CLIENT_REQUEST_ID_KEY, "tenant_id"]);
        let mut response = "ok".into_response();
        mirror.apply(&ctx(), &mut response);

        assert_eq!(response.headers()[OPERATION_ID_HEADER], "op-1");
        // empty client request id is not written
        assert!(!response.headers().contains_key(CLIENT_REQUEST_ID_HEADER));
        assert!(!response.headers().contains_key(CORRELATION_ID_HEADER));
    }

    #[test]
    fn test_never_replaces_handler_headers() {
        let mirror = ResponseHeaderMirror::new([OPERATION_ID_KEY]);
        let mut response = ([(OPERATION_ID_HEADER, "handler-set")], "ok").into_response();
        mirror.apply(&ctx(), &mut response);
        assert_eq!(response.headers()[OPERATION_ID_HEADER], "handler-set");
    }
}
