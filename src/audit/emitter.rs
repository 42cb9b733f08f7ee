//! Audit record construction and best-effort delivery.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use tokio::task::JoinHandle;

use crate::audit::record::*;
use crate::audit::sink::AuditSink;
use crate::classify::{operation_label, subscription_id, OperationLabel};
use crate::config::schema::AuditConfig;
use crate::context::headers::*;
use crate::observability::metrics;

/// Target resource key used for every record.
const RESOURCE_TYPE_KEY: &str = "ResourceType";

/// What the emitter needs to know about a request once it has completed.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub method: String,
    /// Path and query, as received.
    pub uri: String,
    pub label: String,
    pub headers: HeaderMap,
    pub remote_addr: Option<String>,
}

impl AuditRequest {
    /// Snapshot the parts of `request` the audit record is built from.
    pub fn from_request(request: &Request) -> Self {
        let uri = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        let label = request
            .extensions()
            .get::<OperationLabel>()
            .map(|l| l.as_str().to_string())
            .unwrap_or_else(|| {
                operation_label(request.method().as_str(), &request.uri().to_string())
            });
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string());

        Self {
            method: request.method().to_string(),
            uri,
            label,
            headers: request.headers().clone(),
            remote_addr,
        }
    }

    fn header(&self, name: &str) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

/// Builds audit records and ships them to the sink off the request path.
pub struct AuditEmitter {
    sink: Arc<dyn AuditSink>,
    exclude: HashMap<String, Vec<String>>,
    categories: HashMap<String, OperationCategory>,
    descriptions: HashMap<String, String>,
    operation_access_level: String,
}

impl AuditEmitter {
    pub fn new(sink: Arc<dyn AuditSink>, config: &AuditConfig) -> Self {
        Self {
            sink,
            exclude: config
                .exclude
                .iter()
                .map(|(method, patterns)| (method.to_ascii_uppercase(), patterns.clone()))
                .collect(),
            categories: config.operation_categories.clone(),
            descriptions: config.operation_descriptions.clone(),
            operation_access_level: config.operation_access_level.clone(),
        }
    }

    /// Whether the request matches an exclusion rule.
    pub fn should_exclude(&self, method: &str, uri: &str) -> bool {
        self.exclude
            .get(method)
            .is_some_and(|patterns| patterns.iter().any(|p| uri.contains(p.as_str())))
    }

    pub fn build_record(&self, request: &AuditRequest, status: u16, error: &str) -> AuditRecord {
        let caller_ip_address = match request.remote_addr.as_deref() {
            Some(remote) => {
                let ip = parse_caller_ip(remote);
                if ip.is_none() {
                    tracing::warn!(remote_addr = %remote, "Failed to parse caller address");
                }
                ip
            }
            None => None,
        };

        let category = self
            .categories
            .get(&request.label)
            .copied()
            .unwrap_or_default();

        let target_resources = BTreeMap::from([(
            RESOURCE_TYPE_KEY.to_string(),
            vec![TargetResource {
                name: request.uri.clone(),
                region: request.header(REGION_HEADER),
            }],
        )]);

        AuditRecord {
            caller_identities: caller_identities(request),
            caller_ip_address,
            operation_categories: vec![category],
            operation_category_description: self
                .descriptions
                .get(&request.label)
                .cloned()
                .unwrap_or_default(),
            operation_type: OperationType::from_method(&request.method),
            operation_name: request.label.clone(),
            target_resources,
            caller_agent: request.header(USER_AGENT.as_str()),
            caller_access_levels: vec!["NA".to_string()],
            operation_access_level: self.operation_access_level.clone(),
            operation_result: OperationResult::from_status(status),
            operation_result_description: result_description(status, error),
        }
    }

    /// Build and send the record for a completed request.
    ///
    /// Returns the handle of the spawned send, or `None` when the request
    /// is excluded. Send failures are logged and counted, never returned.
    pub fn emit(&self, request: AuditRequest, status: u16, error: &str) -> Option<JoinHandle<()>> {
        if self.should_exclude(&request.method, &request.uri) {
            tracing::info!(
                method = %request.method,
                url = %request.uri,
                "Excluding audit event"
            );
            metrics::record_audit_excluded();
            return None;
        }

        let record = self.build_record(&request, status, error);
        let result = record.operation_result.as_str();
        let sink = self.sink.clone();
        Some(tokio::spawn(async move {
            match sink.send(record).await {
                Ok(()) => metrics::record_audit_event(result),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to send audit event");
                    metrics::record_audit_failure();
                }
            }
        }))
    }
}

impl std::fmt::Debug for AuditEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditEmitter")
            .field("exclude", &self.exclude)
            .field("categories", &self.categories)
            .field("operation_access_level", &self.operation_access_level)
            .finish_non_exhaustive()
    }
}

fn caller_identities(request: &AuditRequest) -> BTreeMap<CallerIdentityType, Vec<CallerIdentity>> {
    let path = request.uri.split('?').next().unwrap_or_default();
    let candidates = [
        (
            CallerIdentityType::SubscriptionId,
            subscription_id(path).unwrap_or_default(),
            "client subscription ID",
        ),
        (
            CallerIdentityType::ApplicationId,
            request.header(CLIENT_APP_ID_HEADER),
            "client application ID",
        ),
        (
            CallerIdentityType::Upn,
            request.header(CLIENT_PRINCIPAL_NAME_HEADER),
            "client principal name",
        ),
        (
            CallerIdentityType::TenantId,
            request.header(CLIENT_TENANT_ID_HEADER),
            "client tenant ID",
        ),
    ];

    candidates
        .into_iter()
        .filter(|(_, identity, _)| !identity.is_empty())
        .map(|(kind, identity, description)| {
            (
                kind,
                vec![CallerIdentity {
                    identity,
                    description: description.to_string(),
                }],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::sink::ChannelSink;
    use crate::audit::AuditError;
    use crate::logging::capture::CaptureLayer;
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn send(&self, _record: AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Transport("connection refused".into()))
        }
    }

    fn request(method: &str, uri: &str) -> AuditRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_APP_ID_HEADER, HeaderValue::from_static("app-1"));
        headers.insert(REGION_HEADER, HeaderValue::from_static("westus"));
        headers.insert(USER_AGENT, HeaderValue::from_static("cli/1.0"));
        AuditRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            label: operation_label(method, uri),
            headers,
            remote_addr: Some("10.1.2.3:5555".to_string()),
        }
    }

    fn config() -> AuditConfig {
        AuditConfig {
            exclude: HashMap::from([("GET".to_string(), vec!["/healthz".to_string()])]),
            operation_categories: HashMap::from([(
                "DELETE resourcegroups".to_string(),
                OperationCategory::Other,
            )]),
            operation_descriptions: HashMap::from([(
                "DELETE resourcegroups".to_string(),
                "resource group teardown".to_string(),
            )]),
            operation_access_level: "Contributor".to_string(),
            ..AuditConfig::default()
        }
    }

    #[test]
    fn test_builds_record_from_request() {
        let (sink, _rx) = ChannelSink::new();
        let emitter = AuditEmitter::new(Arc::new(sink), &config());
        let req = request("PUT", "/subscriptions/sub-9/resourceGroups/rg?api-version=2");
        let record = emitter.build_record(&req, 200, "");

        assert_eq!(record.operation_name, "PUT resourcegroups");
        assert_eq!(record.operation_type, OperationType::Update);
        assert_eq!(record.operation_categories, vec![OperationCategory::ResourceManagement]);
        assert_eq!(record.operation_result, OperationResult::Success);
        assert_eq!(record.caller_ip_address, "10.1.2.3".parse().ok());
        assert_eq!(record.caller_agent, "cli/1.0");
        assert_eq!(record.operation_access_level, "Contributor");
        assert_eq!(
            record.caller_identities[&CallerIdentityType::SubscriptionId][0].identity,
            "sub-9"
        );
        assert_eq!(
            record.caller_identities[&CallerIdentityType::ApplicationId][0].identity,
            "app-1"
        );
        assert!(!record.caller_identities.contains_key(&CallerIdentityType::Upn));
        let target = &record.target_resources[RESOURCE_TYPE_KEY][0];
        assert_eq!(target.name, "/subscriptions/sub-9/resourceGroups/rg?api-version=2");
        assert_eq!(target.region, "westus");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_category_override_and_failure() {
        let (sink, _rx) = ChannelSink::new();
        let emitter = AuditEmitter::new(Arc::new(sink), &config());
        let req = request("DELETE", "/subscriptions/s/resourceGroups/rg");
        let record = emitter.build_record(&req, 409, "conflict");
        assert_eq!(record.operation_categories, vec![OperationCategory::Other]);
        assert_eq!(record.operation_category_description, "resource group teardown");
        assert_eq!(record.operation_type, OperationType::Delete);
        assert_eq!(
            record.operation_result_description,
            "operation failed with status code: 409, error: conflict"
        );
    }

    #[test]
    fn test_malformed_remote_address_is_dropped() {
        let (sink, _rx) = ChannelSink::new();
        let emitter = AuditEmitter::new(Arc::new(sink), &config());
        let mut req = request("GET", "/subscriptions/s");
        req.remote_addr = Some("garbage".into());
        assert_eq!(emitter.build_record(&req, 200, "").caller_ip_address, None);
    }

    #[tokio::test]
    async fn test_emit_sends_once_and_honors_exclusions() {
        let (sink, mut rx) = ChannelSink::new();
        let emitter = AuditEmitter::new(Arc::new(sink), &config());

        assert!(emitter.emit(request("GET", "/healthz?check=1"), 200, "").is_none());
        // exclusion is per method
        let handle = emitter
            .emit(request("POST", "/healthz"), 500, "boom")
            .expect("POST is not excluded");
        handle.await.unwrap();

        let record = rx.recv().await.unwrap();
        assert_eq!(record.operation_result, OperationResult::Failure);
        assert!(record.operation_result_description.contains("500"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sink_failure_is_logged_once() {
        let (layer, captured) = CaptureLayer::new();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

        let emitter = AuditEmitter::new(Arc::new(FailingSink), &config());
        let handle = emitter
            .emit(request("PUT", "/subscriptions/s/resourceGroups/rg"), 200, "")
            .expect("PUT is not excluded");
        handle.await.unwrap();

        let errors: Vec<_> = captured
            .events()
            .into_iter()
            .filter(|e| e.level == Level::ERROR)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Failed to send audit event");
        assert!(errors[0].fields["error"].contains("connection refused"));
    }
}
