//! ARM-style hierarchical resource ids.
//!
//! Accepted shapes, starting at the first `subscriptions` segment:
//!
//! ```text
//! subscriptions/{id}
//! subscriptions/{id}/resourceGroups/{rg}
//! subscriptions/{id}[/resourceGroups/{rg}]/providers/{ns}/{type}/{name}[/{child}/{name}]...
//! subscriptions/{id}/{type}/{name}...
//! ```

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";
const ROOT_NAMESPACE: &str = "Microsoft.Resources";

/// A parsed resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    /// Fully qualified type, e.g. `Microsoft.Storage/storageAccounts`.
    pub resource_type: String,
    /// Name of the last resource in the id.
    pub name: String,
}

impl ResourceId {
    /// Parse a URL path (query already removed).
    ///
    /// Anything before the first `/subscriptions` segment is ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let segments = subscription_segments(path)?;
        Self::from_segments(&segments)
    }

    fn from_segments(segments: &[&str]) -> Option<Self> {
        if segments.len() < 2 || segments.len() % 2 != 0 {
            return None;
        }
        if !segments[0].eq_ignore_ascii_case(SUBSCRIPTIONS) {
            return None;
        }

        let mut id = ResourceId {
            subscription_id: segments[1].to_string(),
            resource_group: None,
            resource_type: format!("{ROOT_NAMESPACE}/{SUBSCRIPTIONS}"),
            name: segments[1].to_string(),
        };

        let mut rest = &segments[2..];
        if let [key, name, tail @ ..] = rest {
            if key.eq_ignore_ascii_case(RESOURCE_GROUPS) {
                id.resource_group = Some(name.to_string());
                id.resource_type = format!("{ROOT_NAMESPACE}/{RESOURCE_GROUPS}");
                id.name = name.to_string();
                rest = tail;
            }
        }

        match rest {
            [] => Some(id),
            // A lone provider namespace names the provider registration.
            [key, namespace] if key.eq_ignore_ascii_case(PROVIDERS) => {
                id.resource_type = format!("{ROOT_NAMESPACE}/{PROVIDERS}");
                id.name = namespace.to_string();
                Some(id)
            }
            [key, namespace, pairs @ ..] if key.eq_ignore_ascii_case(PROVIDERS) => {
                let mut resource_type = namespace.to_string();
                for pair in pairs.chunks(2) {
                    resource_type.push('/');
                    resource_type.push_str(pair[0]);
                    id.name = pair[1].to_string();
                }
                id.resource_type = resource_type;
                Some(id)
            }
            pairs => {
                let mut resource_type = id.resource_type.clone();
                for pair in pairs.chunks(2) {
                    resource_type.push('/');
                    resource_type.push_str(pair[0]);
                    id.name = pair[1].to_string();
                }
                id.resource_type = resource_type;
                Some(id)
            }
        }
    }
}

/// Path segments from the first `subscriptions` segment onward.
pub(crate) fn subscription_segments(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let start = segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case(SUBSCRIPTIONS))?;
    Some(segments[start..].to_vec())
}

/// The subscription id named in a request path, if any.
pub fn subscription_id(path: &str) -> Option<String> {
    let segments = subscription_segments(path)?;
    segments
        .get(1)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// The resource group named in a request path, if any.
///
/// Works for collection paths too, where [`ResourceId::parse`] fails.
pub fn resource_group(path: &str) -> Option<String> {
    let segments = subscription_segments(path)?;
    match segments.as_slice() {
        [_, _, key, name, ..] if key.eq_ignore_ascii_case(RESOURCE_GROUPS) && !name.is_empty() => {
            Some(name.to_string())
        }
        _ => None,
    }
}
