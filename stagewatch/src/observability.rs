//! Logging initialization and span helpers.
//!
//! Structured logging with consistent spans: every refresh, stage start,
//! and sequential run carries the tenant and entity it acts on.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs.
    Json,
    /// Pretty-printed logs.
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops. Log levels come from `RUST_LOG`
/// (e.g. `info`, `stagewatch=debug`), defaulting to `info`.
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for one refresh cycle.
#[must_use]
pub fn refresh_span(tenant: &str, kind: &str) -> Span {
    tracing::info_span!("refresh", tenant = tenant, kind = kind)
}

/// Creates a span for one sequential run.
#[must_use]
pub fn run_span(tenant: &str, entity: &str) -> Span {
    tracing::info_span!("run", tenant = tenant, entity = entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(LogFormat::Pretty);
        init_tracing(LogFormat::Json);
    }

    #[test]
    fn test_spans_carry_fields() {
        let span = refresh_span("tenant-a", "tick");
        let _guard = span.enter();
        drop(run_span("tenant-a", "e-1"));
    }
}
