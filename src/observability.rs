//! Structured logging setup.
//!
//! Pretty output for development, JSON lines in production. `RUST_LOG`
//! overrides the configured filter when set.

use std::io;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for development.
    Pretty,
    /// JSON output for log aggregation.
    Json,
}

impl LogFormat {
    pub fn for_production(is_production: bool) -> Self {
        if is_production {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Builds the level filter: `RUST_LOG` if set, else `default_directives`.
pub fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber. Call once at startup.
pub fn init_tracing(default_directives: &str, format: LogFormat) {
    let subscriber = tracing_subscriber::registry().with(env_filter(default_directives));

    match format {
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .with_writer(io::stderr),
                )
                .init();
        }
    }
}
