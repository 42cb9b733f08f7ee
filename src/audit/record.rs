//! The audit record and its vocabulary.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::audit::AuditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CallerIdentityType {
    ApplicationId,
    Upn,
    TenantId,
    SubscriptionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub identity: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationCategory {
    #[default]
    ResourceManagement,
    Authentication,
    Authorization,
    UserManagement,
    GroupManagement,
    KeyManagement,
    RoleManagement,
    PolicyManagement,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Read,
    Update,
    Delete,
}

impl OperationType {
    pub fn from_method(method: &str) -> Self {
        match method {
            "POST" | "PUT" | "PATCH" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Read,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    Success,
    Failure,
}

impl OperationResult {
    pub fn from_status(status: u16) -> Self {
        if status >= 400 {
            Self::Failure
        } else {
            Self::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }
}

/// Human readable result description.
pub fn result_description(status: u16, error: &str) -> String {
    if status >= 400 {
        if error.is_empty() {
            format!("operation failed with status code: {status}")
        } else {
            format!("operation failed with status code: {status}, error: {error}")
        }
    } else {
        "succeeded to run the operation".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResource {
    pub name: String,
    pub region: String,
}

/// A compliance record for one completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub caller_identities: BTreeMap<CallerIdentityType, Vec<CallerIdentity>>,
    pub caller_ip_address: Option<IpAddr>,
    pub operation_categories: Vec<OperationCategory>,
    pub operation_category_description: String,
    pub operation_type: OperationType,
    pub operation_name: String,
    pub target_resources: BTreeMap<String, Vec<TargetResource>>,
    pub caller_agent: String,
    pub caller_access_levels: Vec<String>,
    pub operation_access_level: String,
    pub operation_result: OperationResult,
    pub operation_result_description: String,
}

impl AuditRecord {
    /// Check the record the way a strict sink would.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.caller_identities.values().all(Vec::is_empty) {
            return Err(AuditError::Validation(
                "at least one caller identity is required".into(),
            ));
        }
        if self.operation_categories.contains(&OperationCategory::Other)
            && self.operation_category_description.trim().is_empty()
        {
            return Err(AuditError::Validation(
                "operation category Other requires a description".into(),
            ));
        }
        if self.operation_name.trim().is_empty() {
            return Err(AuditError::Validation("operation name is empty".into()));
        }
        Ok(())
    }
}

/// Parse a remote address into the caller IP.
///
/// Accepts `host:port`, `[v6]:port` and bare addresses.
pub fn parse_caller_ip(remote: &str) -> Option<IpAddr> {
    let remote = remote.trim();
    if let Ok(addr) = remote.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    let bare = remote.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AuditRecord {
        AuditRecord {
            caller_identities: BTreeMap::from([(
                CallerIdentityType::TenantId,
                vec![CallerIdentity {
                    identity: "t".into(),
                    description: "client tenant ID".into(),
                }],
            )]),
            caller_ip_address: None,
            operation_categories: vec![OperationCategory::ResourceManagement],
            operation_category_description: String::new(),
            operation_type: OperationType::Read,
            operation_name: "GET widgets - LIST".into(),
            target_resources: BTreeMap::new(),
            caller_agent: String::new(),
            caller_access_levels: vec!["NA".into()],
            operation_access_level: String::new(),
            operation_result: OperationResult::Success,
            operation_result_description: result_description(200, ""),
        }
    }

    #[test]
    fn test_validation_rules() {
        assert!(record().validate().is_ok());

        let mut no_caller = record();
        no_caller.caller_identities.clear();
        assert!(no_caller.validate().is_err());

        let mut other = record();
        other.operation_categories = vec![OperationCategory::Other];
        assert!(other.validate().is_err());
        other.operation_category_description = "custom".into();
        assert!(other.validate().is_ok());

        let mut unnamed = record();
        unnamed.operation_name = " ".into();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_result_mapping() {
        assert_eq!(OperationResult::from_status(399), OperationResult::Success);
        assert_eq!(OperationResult::from_status(400), OperationResult::Failure);
        assert_eq!(
            result_description(500, "boom"),
            "operation failed with status code: 500, error: boom"
        );
        assert_eq!(
            result_description(404, ""),
            "operation failed with status code: 404"
        );
    }

    #[test]
    fn test_operation_type_mapping() {
        assert_eq!(OperationType::from_method("GET"), OperationType::Read);
        assert_eq!(OperationType::from_method("PATCH"), OperationType::Update);
        assert_eq!(OperationType::from_method("DELETE"), OperationType::Delete);
        assert_eq!(OperationType::from_method("OPTIONS"), OperationType::Read);
    }

    #[test]
    fn test_parse_caller_ip() {
        assert_eq!(parse_caller_ip("10.0.0.1:443"), "10.0.0.1".parse().ok());
        assert_eq!(parse_caller_ip("[::1]:8080"), "::1".parse().ok());
        assert_eq!(parse_caller_ip("192.168.1.9"), "192.168.1.9".parse().ok());
        assert_eq!(parse_caller_ip("not-an-ip"), None);
    }
}
