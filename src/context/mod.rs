//! Request context propagation subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → propagate.rs (apply extraction rules, synthesize missing ids)
//!     → request.rs (immutable RequestContext, stored in request extensions)
//!     → operation.rs (api-version, subscription, resource group, target URI,
//!                     optionally adjusted by a caller customizer)
//!     → extras.rs (layered key/value bag populated by the caller)
//!
//! Outbound call made on behalf of the request:
//!     → forward.rs (copy identifiers unless the caller set its own,
//!                   bound the call by the ingress deadline)
//! ```
//!
//! # Design Decisions
//! - Extraction never fails; an absent header becomes an empty string
//! - Identifier synthesis (entropy failure) and a rejecting operation
//!   customizer are the only fatal steps
//! - Context values are never mutated; new values are layered

pub mod extras;
pub mod forward;
pub mod headers;
pub mod id;
pub mod operation;
pub mod propagate;
pub mod request;

pub use extras::Extras;
pub use forward::{forward_identifiers, ForwardContext, ForwardContextLayer, ForwardError};
pub use id::{EntropySource, OsEntropy};
pub use operation::{OperationCustomizer, OperationRequest};
pub use propagate::{propagation_middleware, ExtrasFn, OperationIdSlot, Propagator};
pub use request::{ContextError, ExtractionRule, RequestContext};
