//! Audit sinks.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audit::record::AuditRecord;
use crate::audit::AuditError;

pub const AUDIT_TARGET: &str = "audit";

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn send(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Emits each valid record as one JSON event on target `audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    async fn send(&self, record: AuditRecord) -> Result<(), AuditError> {
        record.validate()?;
        let json = serde_json::to_string(&record)
            .map_err(|e| AuditError::Transport(e.to_string()))?;
        tracing::info!(target: AUDIT_TARGET, record = %json, "audit event");
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl AuditSink for NoopSink {
    async fn send(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Hands records to an in-process receiver.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AuditSink for ChannelSink {
    async fn send(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.tx.send(record).map_err(|_| AuditError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::audit::record::*;
    use crate::logging::capture::CaptureLayer;

    fn record(name: &str) -> AuditRecord {
        AuditRecord {
            caller_identities: BTreeMap::from([(
                CallerIdentityType::ApplicationId,
                vec![CallerIdentity {
                    identity: "app-1".into(),
                    description: "client application ID".into(),
                }],
            )]),
            caller_ip_address: None,
            operation_categories: vec![OperationCategory::ResourceManagement],
            operation_category_description: String::new(),
            operation_type: OperationType::Update,
            operation_name: name.into(),
            target_resources: BTreeMap::new(),
            caller_agent: "curl/8".into(),
            caller_access_levels: vec!["NA".into()],
            operation_access_level: String::new(),
            operation_result: OperationResult::Success,
            operation_result_description: result_description(200, ""),
        }
    }

    #[tokio::test]
    async fn test_tracing_sink_emits_valid_records() {
        let (layer, captured) = CaptureLayer::new();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

        TracingSink.send(record("PUT widgets")).await.unwrap();

        let events = captured.events_for(AUDIT_TARGET);
        assert_eq!(events.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&events[0].fields["record"]).unwrap();
        assert_eq!(json["operation_name"], "PUT widgets");
    }

    #[tokio::test]
    async fn test_tracing_sink_rejects_invalid_records() {
        let (layer, captured) = CaptureLayer::new();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

        let result = TracingSink.send(record("")).await;
        assert!(matches!(result, Err(AuditError::Validation(_))));
        assert!(captured.events_for(AUDIT_TARGET).is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_receiver() {
        let (sink, mut rx) = ChannelSink::new();
        sink.send(record("GET widgets - LIST")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().operation_name, "GET widgets - LIST");

        drop(rx);
        let result = sink.send(record("GET widgets - LIST")).await;
        assert!(matches!(result, Err(AuditError::ChannelClosed)));
    }
}
