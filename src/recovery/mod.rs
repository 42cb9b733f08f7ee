//! Recovery boundary.
//!
//! # Data Flow
//! ```text
//! Request
//!     → layer.rs (catch_unwind around call and the response future)
//!         panic → provenance.rs (location recorded by the panic hook)
//!               → error log + configured status with JSON body
//! ```
//!
//! # Design Decisions
//! - Outermost layer: a single containment point for the whole pipeline
//! - Other in-flight requests are unaffected; the process never exits

pub mod layer;
pub mod provenance;

pub use layer::{Recovery, RecoveryLayer};
pub use provenance::{install_panic_hook, PanicLocation};
