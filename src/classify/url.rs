//! URL trimming for logs and fallback labels.

use url::Url;

const API_VERSION: &str = "api-version";

/// Reduce a URL to scheme, host (with port) and path, keeping only the
/// `api-version` query parameter.
///
/// Relative URLs keep their path and `api-version` only.
pub fn trim_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let mut base = format!("{}://", url.scheme());
            if let Some(host) = url.host_str() {
                base.push_str(host);
            }
            if let Some(port) = url.port() {
                base.push(':');
                base.push_str(&port.to_string());
            }
            base.push_str(url.path());
            with_api_version(base, url.query())
        }
        Err(_) => {
            let without_fragment = raw.split('#').next().unwrap_or_default();
            let (path, query) = match without_fragment.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (without_fragment, None),
            };
            with_api_version(path.to_string(), query)
        }
    }
}

/// The `api-version` query parameter, if any.
pub fn api_version(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == API_VERSION)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn with_api_version(mut base: String, query: Option<&str>) -> String {
    if let Some(version) = api_version(query) {
        base.push('?');
        base.push_str(API_VERSION);
        base.push('=');
        base.push_str(&version);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_api_version() {
        assert_eq!(
            trim_url("https://h/api/nonResourcePath?p=1&api-version=2023-01-01&q=2"),
            "https://h/api/nonResourcePath?api-version=2023-01-01"
        );
    }

    #[test]
    fn test_drops_query_without_api_version() {
        assert_eq!(trim_url("http://h:8080/a/b?x=y#frag"), "http://h:8080/a/b");
    }

    #[test]
    fn test_relative_urls() {
        assert_eq!(
            trim_url("/subscriptions/s/resourceGroups?x=1&api-version=v"),
            "/subscriptions/s/resourceGroups?api-version=v"
        );
        assert_eq!(trim_url("/plain"), "/plain");
        assert_eq!(trim_url(""), "");
    }
}
