//! Call classification subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP method + request URL
//!     → url.rs (trim to scheme+host+path, keep only api-version)
//!     → resource_id.rs (parse the ARM-style resource id from /subscriptions)
//!     → label.rs (normalize the resource type, LIST/READ suffix)
//!     → "GET storageaccounts - READ"
//! ```
//!
//! # Design Decisions
//! - Classification never fails; unparseable URLs fall back to the
//!   method plus the trimmed URL
//! - Computed once per request and shared through request extensions

pub mod label;
pub mod resource_id;
pub mod url;

pub use label::{describe, operation_label, OperationKind, OperationLabel, ResourceDescriptor};
pub use resource_id::{resource_group, subscription_id, ResourceId};
pub use self::url::trim_url;
