//! Error body capture.
//!
//! Responses with status >= 400 have their (bounded) body read once so that
//! the request log and the audit record can report the error text. The body
//! is then put back unchanged.

use axum::body::Body;
use axum::body::HttpBody as _;
use axum::http::StatusCode;
use axum::response::Response;

/// Error text of a failed response, stored in the response extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody(pub String);

impl ErrorBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Capture the body of an error response.
///
/// Bodies whose size is unknown or larger than `limit` are left untouched
/// and reported by their status reason instead.
pub async fn capture_error_body(response: Response, limit: usize) -> Response {
    let status = response.status();
    if status.as_u16() < 400 || response.extensions().get::<ErrorBody>().is_some() {
        return response;
    }

    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64);
    if !fits {
        let mut response = response;
        response
            .extensions_mut()
            .insert(ErrorBody(reason(status)));
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let (body, text) = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            (Body::from(bytes), text)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read error response body");
            (Body::empty(), reason(status))
        }
    };
    parts.extensions.insert(ErrorBody(text));
    Response::from_parts(parts, body)
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_captures_and_restores_body() {
        let response = (StatusCode::BAD_REQUEST, "bad widget").into_response();
        let response = capture_error_body(response, 1024).await;
        assert_eq!(
            response.extensions().get::<ErrorBody>(),
            Some(&ErrorBody("bad widget".into()))
        );
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"bad widget");
    }

    #[tokio::test]
    async fn test_success_is_untouched() {
        let response = capture_error_body("ok".into_response(), 1024).await;
        assert!(response.extensions().get::<ErrorBody>().is_none());
    }

    #[tokio::test]
    async fn test_oversized_body_reports_reason() {
        let response = (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(64)).into_response();
        let response = capture_error_body(response, 8).await;
        assert_eq!(
            response.extensions().get::<ErrorBody>().map(ErrorBody::as_str),
            Some("Internal Server Error")
        );
    }
}
