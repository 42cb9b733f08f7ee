//! Field redaction subsystem.
//!
//! # Data Flow
//! ```text
//! Message (Serialize + Loggable) or decoded JSON value
//!     → engine.rs (walk the object, consult the schema per field)
//!     → schema.rs (SchemaSource: message type → field policies)
//!     → JSON value safe to log
//! ```
//!
//! # Design Decisions
//! - Missing metadata keeps the field; only an explicit `loggable = false`
//!   removes it
//! - Map fields are opaque; nested messages are pruned recursively
//! - Redaction is pure and idempotent

pub mod engine;
pub mod schema;

pub use engine::{redact, Redactor};
pub use schema::{
    FieldDescriptor, FieldKind, Loggable, MessageDescriptor, SchemaSource, StaticSchema,
};
