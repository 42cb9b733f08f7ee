//! Operation labels and resource descriptors.

use std::fmt;

use serde::Serialize;

use crate::classify::resource_id::{subscription_segments, ResourceId};
use crate::classify::url::trim_url;

/// Name segment appended when the path addresses a collection.
const SYNTHETIC_NAME: &str = "synthetic-collection-name";

/// The classifier label of the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLabel(pub String);

impl OperationLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    List,
    Read,
    Write,
    Other,
}

/// What a request operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    /// Normalized (last segment, lower-cased) resource type.
    pub resource_type: String,
    pub operation_kind: OperationKind,
}

struct Classified {
    resource_type: String,
    collection: bool,
}

/// Map method + URL to a normalized operation label.
///
/// `GET` on an instance yields `"GET <type> - READ"`, `GET` on a collection
/// `"GET <type> - LIST"`, other methods `"<METHOD> <type>"`. URLs that are
/// not resource ids fall back to `"<METHOD> <trimmed url>"`.
pub fn operation_label(method: &str, url: &str) -> String {
    let method = normalize_method(method);
    let trimmed = trim_url(url);

    match classify_path(path_of(&trimmed)) {
        Some(classified) => {
            let mut label = format!("{} {}", method, classified.resource_type);
            if method == "GET" {
                label.push_str(if classified.collection {
                    " - LIST"
                } else {
                    " - READ"
                });
            }
            label
        }
        None => {
            let label = format!("{} {}", method, trimmed);
            label.trim_end().to_string()
        }
    }
}

/// The resource descriptor of a request, when the URL is a resource id.
pub fn describe(method: &str, url: &str) -> Option<ResourceDescriptor> {
    let method = normalize_method(method);
    let trimmed = trim_url(url);
    let classified = classify_path(path_of(&trimmed))?;

    let operation_kind = match method.as_str() {
        "GET" if classified.collection => OperationKind::List,
        "GET" => OperationKind::Read,
        "POST" | "PUT" | "PATCH" | "DELETE" => OperationKind::Write,
        _ => OperationKind::Other,
    };
    Some(ResourceDescriptor {
        resource_type: classified.resource_type,
        operation_kind,
    })
}

fn normalize_method(method: &str) -> String {
    let method = method.trim();
    if method.is_empty() {
        "UNKNOWN".to_string()
    } else {
        method.to_ascii_uppercase()
    }
}

fn path_of(trimmed: &str) -> &str {
    let without_query = trimmed.split('?').next().unwrap_or_default();
    match without_query.find("://") {
        Some(idx) => {
            let after_scheme = &without_query[idx + 3..];
            after_scheme
                .find('/')
                .map(|slash| &after_scheme[slash..])
                .unwrap_or("")
        }
        None => without_query,
    }
}

fn classify_path(path: &str) -> Option<Classified> {
    if let Some(id) = ResourceId::parse(path) {
        let resource_type = normalize_resource_type(&id.resource_type)?;
        return Some(Classified {
            resource_type,
            collection: id.name.trim().is_empty(),
        });
    }

    let mut segments = subscription_segments(path)?;
    if segments.last() != Some(&SYNTHETIC_NAME) {
        segments.push(SYNTHETIC_NAME);
    }
    let synthetic = format!("/{}", segments.join("/"));
    let id = ResourceId::parse(&synthetic)?;
    Some(Classified {
        resource_type: normalize_resource_type(&id.resource_type)?,
        collection: true,
    })
}

fn normalize_resource_type(resource_type: &str) -> Option<String> {
    let last = resource_type
        .rsplit('/')
        .next()
        .unwrap_or(resource_type)
        .to_lowercase();
    let cut = [last.find('?'), last.find("api-version")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(last.len());
    let normalized = last[..cut].trim().to_string();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_instance_read() {
        assert_eq!(
            operation_label(
                "GET",
                "https://h/subscriptions/s/resourceGroups/g/providers/P/storageAccounts/acct?api-version=v"
            ),
            "GET storageaccounts - READ"
        );
    }

    #[test]
    fn test_collection_list() {
        assert_eq!(
            operation_label("GET", "https://h/subscriptions/s/resourceGroups?api-version=v"),
            "GET resourcegroups - LIST"
        );
        assert_eq!(
            operation_label(
                "GET",
                "https://h/subscriptions/s/resourceGroups/g/providers/Microsoft.Storage/storageAccounts?api-version=v&p=1"
            ),
            "GET storageaccounts - LIST"
        );
    }

    #[test]
    fn test_non_get_has_no_suffix() {
        assert_eq!(
            operation_label(
                "POST",
                "https://h/subscriptions/s/resourceGroups/g/providers/Microsoft.Storage/storageAccounts?api-version=v"
            ),
            "POST storageaccounts"
        );
    }

    #[test]
    fn test_nested_custom_type() {
        assert_eq!(
            operation_label(
                "GET",
                "http://svc.local:80/subscriptions/26ad/resourceGroups/rg/providers/Microsoft.ContainerService/managedclusters/c1/nodeBootstrapping"
            ),
            "GET nodebootstrapping - LIST"
        );
    }

    #[test]
    fn test_fallback_keeps_only_api_version() {
        assert_eq!(
            operation_label("GET", "https://h/api/nonResourcePath?p=1&api-version=2023-01-01"),
            "GET https://h/api/nonResourcePath?api-version=2023-01-01"
        );
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(operation_label("", ""), "UNKNOWN");
        assert_eq!(operation_label("get", "/"), "GET /");
        assert_eq!(
            operation_label("GET", "/subscriptions/s/resourceGroups"),
            "GET resourcegroups - LIST"
        );
    }

    #[test]
    fn test_describe_kinds() {
        let url = "/subscriptions/s/resourceGroups/g/providers/P/widgets/w";
        assert_eq!(
            describe("GET", url).map(|d| d.operation_kind),
            Some(OperationKind::Read)
        );
        assert_eq!(
            describe("DELETE", url).map(|d| d.operation_kind),
            Some(OperationKind::Write)
        );
        assert_eq!(
            describe("OPTIONS", url).map(|d| d.operation_kind),
            Some(OperationKind::Other)
        );
        assert_eq!(
            describe("GET", "/subscriptions/s/resourceGroups").map(|d| d.operation_kind),
            Some(OperationKind::List)
        );
        assert_eq!(describe("GET", "/healthz"), None);
    }

    proptest! {
        #[test]
        fn prop_never_empty(method in "[A-Za-z]{0,8}", url in "\\PC{0,80}") {
            let label = operation_label(&method, &url);
            prop_assert!(!label.is_empty());
        }
    }
}
