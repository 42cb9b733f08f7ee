//! Operation metadata taken from the request line.
//!
//! Every context carries an [`OperationRequest`]: the api-version,
//! subscription, resource group, target URI and method of the inbound call.
//! A caller-supplied [`OperationCustomizer`] may adjust it or reject the
//! request.

use std::sync::Arc;

use axum::http::request::Parts;

use crate::classify::url::api_version;
use crate::classify::{resource_group, subscription_id};

/// Caller hook run after the operation request is derived.
///
/// An `Err` rejects the request with a 500 carrying the message.
pub type OperationCustomizer =
    Arc<dyn Fn(&mut OperationRequest, &Parts) -> Result<(), String> + Send + Sync>;

/// What the inbound call asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationRequest {
    pub api_version: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub target_uri: String,
    pub http_method: String,
}

impl OperationRequest {
    pub fn from_parts(parts: &Parts) -> Self {
        let path = parts.uri.path();
        Self {
            api_version: api_version(parts.uri.query()).unwrap_or_default(),
            subscription_id: subscription_id(path).unwrap_or_default(),
            resource_group: resource_group(path).unwrap_or_default(),
            target_uri: parts.uri.to_string(),
            http_method: parts.method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(method: &str, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_derived_from_resource_path() {
        let op = OperationRequest::from_parts(&parts(
            "PUT",
            "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Foo/widgets/w?api-version=2024-01-01",
        ));
        assert_eq!(op.api_version, "2024-01-01");
        assert_eq!(op.subscription_id, "sub-1");
        assert_eq!(op.resource_group, "rg-1");
        assert_eq!(op.http_method, "PUT");
        assert!(op.target_uri.ends_with("widgets/w?api-version=2024-01-01"));
    }

    #[test]
    fn test_non_resource_path_leaves_fields_empty() {
        let op = OperationRequest::from_parts(&parts("GET", "/healthz"));
        assert_eq!(op.api_version, "");
        assert_eq!(op.subscription_id, "");
        assert_eq!(op.resource_group, "");
        assert_eq!(op.target_uri, "/healthz");
    }
}
