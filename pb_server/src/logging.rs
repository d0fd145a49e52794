//! Structured logging configuration.
//!
//! Records emitted through the `log` facade by the bracket engine are
//! forwarded into the same subscriber, so library and server events share
//! one output and one filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use pb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log a bracket lifecycle event with structured data
///
/// # Example
///
/// ```
/// use pb_server::logging::log_bracket_event;
///
/// log_bracket_event("bracket_generated", 12, "8 matches, 3 byes");
/// ```
pub fn log_bracket_event(event_type: &str, tournament_id: i64, message: &str) {
    tracing::info!(
        event_type = event_type,
        tournament_id = tournament_id,
        "BRACKET: {}",
        message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_log_bracket_event_without_subscriber() {
        log_bracket_event("test_event", 1, "no subscriber installed");
    }
}
