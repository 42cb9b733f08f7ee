//! Request observability pipeline for axum services.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────────┐
//!                 │                     OBSERVABILITY STACK                      │
//!                 │                                                              │
//!   Request       │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   │
//!   ──────────────┼─▶│ recovery │──▶│ context  │──▶│ logging  │──▶│  audit   │───┼──▶ handler
//!                 │  │ boundary │   │propagate │   │ composer │   │ emitter  │   │
//!                 │  └──────────┘   └──────────┘   └──────────┘   └────┬─────┘   │
//!                 │                                                    │ spawn   │
//!                 │  ┌──────────┐   ┌──────────┐                       ▼         │
//!                 │  │ classify │   │redaction │                  AuditSink      │
//!                 │  │ (labels) │   │ (schema) │                                 │
//!                 │  └──────────┘   └──────────┘                                 │
//!                 │                                                              │
//!                 │  ┌────────────────────────────────────────────────────────┐  │
//!                 │  │ Cross-cutting: config · observability (metrics) · http │  │
//!                 │  └────────────────────────────────────────────────────────┘  │
//!                 └──────────────────────────────────────────────────────────────┘
//! ```

// Pipeline stages
pub mod audit;
pub mod classify;
pub mod context;
pub mod logging;
pub mod recovery;
pub mod redaction;

// Wiring and cross-cutting concerns
pub mod config;
pub mod http;
pub mod observability;

pub use config::ObservabilityConfig;
pub use context::RequestContext;
pub use http::{HttpServer, ObservabilityStack};
pub use logging::ContextLogger;
