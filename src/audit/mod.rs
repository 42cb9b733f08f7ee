//! Compliance audit subsystem.
//!
//! # Data Flow
//! ```text
//! Completed request (snapshot + status + captured error body)
//!     → emitter.rs (exclusion check, build AuditRecord)
//!     → record.rs (record vocabulary, validation)
//!     → sink.rs (AuditSink::send on a spawned task)
//! ```
//!
//! # Design Decisions
//! - Delivery is best effort: failures are logged and counted, never
//!   retried, never surfaced to the client
//! - One record per request, sent at most once

pub mod emitter;
pub mod layer;
pub mod record;
pub mod sink;

pub use emitter::{AuditEmitter, AuditRequest};
pub use layer::{audit_middleware, AuditState};
pub use record::{AuditRecord, OperationCategory, OperationResult, OperationType};
pub use sink::{AuditSink, ChannelSink, NoopSink, TracingSink};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("invalid audit record: {0}")]
    Validation(String),
    #[error("audit transport failed: {0}")]
    Transport(String),
    #[error("audit channel closed")]
    ChannelClosed,
}
