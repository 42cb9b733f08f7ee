//! HTTP pipeline wiring subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, ObservabilityStack layers)
//!     → [context, logging, audit, recovery stages]
//!     → application handler
//!     → capture.rs (error body read back for logs and audit)
//!     → response.rs (mirror identifiers onto response headers)
//!     → Send to client
//! ```

pub mod capture;
pub mod response;
pub mod server;

pub use capture::{capture_error_body, ErrorBody};
pub use response::{response_header_middleware, ResponseHeaderMirror};
pub use server::{HttpServer, ObservabilityStack};
