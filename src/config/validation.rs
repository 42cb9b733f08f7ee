//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, recovery status 400..=599)
//! - Check header names, methods and addresses are well formed
//! - Detect duplicate extraction keys and unmirrorable keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ObservabilityConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, Method};

use crate::config::schema::ObservabilityConfig;
use crate::context::headers::response_header_for;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),
    #[error("invalid header name '{header}' for key '{key}'")]
    InvalidHeaderName { key: String, header: String },
    #[error("duplicate extraction key '{0}'")]
    DuplicateKey(String),
    #[error("key '{0}' cannot be mirrored onto a response header")]
    UnknownMirrorKey(String),
    #[error("recovery status code {0} is outside 400..=599")]
    InvalidRecoveryStatus(u16),
    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
    #[error("invalid HTTP method '{0}' in audit exclusions")]
    InvalidMethod(String),
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ObservabilityConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.server.bind_address.clone(),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.logging.level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.logging.level.clone()));
    }

    let mut seen = HashSet::new();
    for rule in &config.propagation.extraction_rules {
        if HeaderName::from_bytes(rule.header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName {
                key: rule.key.clone(),
                header: rule.header.clone(),
            });
        }
        if !seen.insert(rule.key.as_str()) {
            errors.push(ValidationError::DuplicateKey(rule.key.clone()));
        }
    }
    for key in &config.propagation.mirrored_response_keys {
        if response_header_for(key).is_none() {
            errors.push(ValidationError::UnknownMirrorKey(key.clone()));
        }
    }

    if !(400..=599).contains(&config.recovery.status_code) {
        errors.push(ValidationError::InvalidRecoveryStatus(
            config.recovery.status_code,
        ));
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.metrics.address.clone(),
        ));
    }

    for method in config.audit.exclude.keys() {
        if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod(method.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExtractionRule;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ObservabilityConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ObservabilityConfig::default();
        config.server.request_timeout_secs = 0;
        config.recovery.status_code = 200;
        config.logging.level = "loud".into();
        config
            .propagation
            .extraction_rules
            .push(ExtractionRule::new("operation_id", "bad header"));
        config.propagation.mirrored_response_keys.push("tenant_id".into());
        config.audit.exclude.insert("GE T".into(), vec!["/x".into()]);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::InvalidRecoveryStatus(200)));
        assert!(errors.contains(&ValidationError::InvalidLogLevel("loud".into())));
        assert!(errors.contains(&ValidationError::DuplicateKey("operation_id".into())));
        assert!(errors.contains(&ValidationError::UnknownMirrorKey("tenant_id".into())));
        assert!(errors.contains(&ValidationError::InvalidMethod("GE T".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidHeaderName { .. })));
    }

    #[test]
    fn test_recovery_status_bounds() {
        for (status, ok) in [(399, false), (400, true), (599, true), (600, false)] {
            let mut config = ObservabilityConfig::default();
            config.recovery.status_code = status;
            assert_eq!(validate_config(&config).is_ok(), ok, "status {status}");
        }
    }
}
