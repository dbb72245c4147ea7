//! Centralized logging initialization with environment variable support

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: Standard Rust log filter (takes precedence over all)
/// - `LOG_FORMAT`: Override format (json, pretty)
///
/// ```bash
/// # Trace marker bookkeeping while keeping everything else quiet
/// RUST_LOG=mill_analysis_imports=trace,info cargo test -p mill-upgrade
/// ```
///
/// Returns `false` when a global subscriber was already installed.
pub fn initialize(config: &LoggingConfig) -> bool {
    let log_level = config.level.parse().unwrap_or(tracing::Level::INFO);

    // RUST_LOG directives win over the configured level
    let env_filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|f| parse_format(&f))
        .unwrap_or_else(|| config.format.clone());

    // Always write to stderr so stdout stays free for rendered stylesheets
    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.is_ok()
}

fn parse_format(value: &str) -> Option<LogFormat> {
    match value.to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "human" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Span wrapping every log line emitted while one stylesheet graph is processed
///
/// ```rust
/// let span = mill_config::logging::graph_span("marketing-site", 12);
/// let _enter = span.enter();
/// tracing::info!("Analyzing imports");
/// ```
pub fn graph_span(project: &str, sheets: usize) -> tracing::Span {
    tracing::info_span!("graph", project = %project, sheets = sheets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("JSON"), Some(LogFormat::Json));
        assert_eq!(parse_format("human"), Some(LogFormat::Pretty));
        assert_eq!(parse_format("xml"), None);
    }

    #[test]
    fn test_initialize_twice_is_harmless() {
        let config = LoggingConfig::default();
        let _first = initialize(&config);
        assert!(!initialize(&config));
    }
}
