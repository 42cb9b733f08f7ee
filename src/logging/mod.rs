//! Structured logging subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (from crate::context)
//!     → composer.rs (ContextLogger bound with static, context, extras,
//!                    label and header attributes; stored in extensions)
//!     → handler code logs through the ContextLogger
//!
//! Request/response pair
//!     → api_log.rs (RequestStart / RequestEnd / finished call records)
//!
//! Outbound call
//!     → client_log.rs (finished call record, component=client)
//! ```
//!
//! # Design Decisions
//! - Attributes are an ordered set passed as one field; json.rs lifts its
//!   keys to the top level of each output line
//! - Composition is silent; only explicit calls emit
//! - init.rs owns the process-wide subscriber; capture.rs records events
//!   in memory for assertions

pub mod api_log;
pub mod attributes;
pub mod capture;
pub mod client_log;
pub mod composer;
pub mod init;
pub mod json;

pub use api_log::{api_request_log_middleware, ApiRequestLog};
pub use attributes::LogAttributeSet;
pub use client_log::{ClientLog, ClientLogLayer};
pub use composer::{context_logger_middleware, ContextLogger, LoggerComposer};
pub use init::init_logging;
pub use json::JsonLayer;
