//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! observability pipeline. All types derive Serde traits for
//! deserialization from config files; every section has defaults so an
//! empty file is a valid configuration.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::OperationCategory;
use crate::context::headers::{CLIENT_REQUEST_ID_KEY, OPERATION_ID_KEY};
use crate::context::ExtractionRule;
use crate::redaction::StaticSchema;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Listener and request timeout.
    pub server: ServerConfig,

    /// Log level, format and static log attributes.
    pub logging: LoggingConfig,

    /// Identifier extraction and response header mirroring.
    pub propagation: PropagationConfig,

    /// Compliance audit settings.
    pub audit: AuditConfig,

    /// Panic recovery settings.
    pub recovery: RecoveryConfig,

    /// Metrics exporter settings.
    pub metrics: MetricsConfig,

    /// Field loggability metadata used by the redaction engine.
    pub schema: Option<StaticSchema>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (ingress deadline) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    pub format: LogFormat,

    /// Attributes bound to every context logger, e.g. service name.
    pub static_attributes: BTreeMap<String, Value>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            static_attributes: BTreeMap::new(),
        }
    }
}

/// Identifier propagation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Canonical key ← inbound header rules.
    pub extraction_rules: Vec<ExtractionRule>,

    /// Canonical keys mirrored onto response headers.
    pub mirrored_response_keys: Vec<String>,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            extraction_rules: ExtractionRule::defaults(),
            mirrored_response_keys: vec![
                OPERATION_ID_KEY.to_string(),
                CLIENT_REQUEST_ID_KEY.to_string(),
            ],
        }
    }
}

/// Audit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit audit records.
    pub enabled: bool,

    /// HTTP method → URI substrings whose requests are not audited.
    pub exclude: HashMap<String, Vec<String>>,

    /// Operation label → category (default ResourceManagement).
    pub operation_categories: HashMap<String, OperationCategory>,

    /// Operation label → category description.
    pub operation_descriptions: HashMap<String, String>,

    pub operation_access_level: String,

    /// Largest error response body captured for logs and audit records.
    pub error_body_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude: HashMap::new(),
            operation_categories: HashMap::new(),
            operation_descriptions: HashMap::new(),
            operation_access_level: String::new(),
            error_body_limit: 64 * 1024, // 64KB
        }
    }
}

/// Recovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Status returned when a handler panics.
    pub status_code: u16,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { status_code: 500 }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics endpoint.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
