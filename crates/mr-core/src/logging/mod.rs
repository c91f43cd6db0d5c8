//! Structured logging for the engine.
//!
//! Human-readable output on stderr by default, or one JSON object per line
//! (`format = "jsonl"`) for batch workers and log shippers.
//!
//! ```ignore
//! use mr_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_settings(&settings.logging));
//! ```
//!
//! Event names from [`event_names`] are used as the tracing target. Batch
//! spans carry `run_id`, `job_id` and `stage`; per-entity spans add
//! `entity_id`.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat};
pub use events::{event_names, Level, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` directives win when set; otherwise `config.level` applies to
/// every target. Returns false when a subscriber was already installed, in
/// which case the existing one stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Human => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_names(true)
                    .with_ansi(std::io::stderr().is_terminal()),
            )
            .try_init()
            .is_ok(),
        LogFormat::Jsonl => registry.with(JsonlLayer::stderr()).try_init().is_ok(),
    }
}

/// Generate a correlation id for one batch run.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}
