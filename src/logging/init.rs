//! Logging subscriber initialization.
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - JSON lines carry attribute sets as top-level fields (see json.rs)
//! - `RUST_LOG` takes precedence over the configured level
//! - Idempotent: only the first call installs a subscriber

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{LogFormat, LoggingConfig};
use crate::logging::json::JsonLayer;

static INIT: Once = Once::new();

/// Install the global `tracing` subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));
        let registry = tracing_subscriber::registry().with(filter);

        let result = match config.format {
            LogFormat::Json => registry.with(JsonLayer::new(std::io::stdout)).try_init(),
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Global subscriber already installed");
        }
    });
}

fn default_directives(level: &str) -> String {
    format!("{level},request_observability={level},tower_http=info")
}
