//! Tracing setup shared by the CLI and the HTTP server.
//!
//! Everything is written to stderr; stdout belongs to command output such
//! as `--json` results. The server usually runs with `LogFormat::Json` so
//! request spans from `tower_http` can be shipped as structured records.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Filter used when neither a level nor `RUST_LOG` is given.
///
/// HTTP client internals are noisy at `info` during embedding ingest.
pub const DEFAULT_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn";

/// Output format of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per record
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Build the level filter. A bare level such as `debug` keeps the HTTP
/// client crates at `warn`; full directives are used as given.
pub fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let directives = match log_level.map(str::trim).filter(|l| !l.is_empty()) {
        None => DEFAULT_FILTER.to_string(),
        Some(level) if is_bare_level(level) => DEFAULT_FILTER.replacen("info", level, 1),
        Some(directives) => directives.to_string(),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn is_bare_level(level: &str) -> bool {
    matches!(
        level.to_lowercase().as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    )
}

/// Install the global subscriber.
///
/// # Example
/// ```no_run
/// use advisor_core::logging::{init_logging, LogFormat};
///
/// init_logging(Some("debug"), false, LogFormat::Text).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let (text_layer, json_layer) = match format {
        LogFormat::Text => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(!no_color && std::env::var("NO_COLOR").is_err()),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_config_error() {
        let result = init_logging(Some("advisor=loudest"), true, LogFormat::Text);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_bare_level_keeps_http_crates_quiet() {
        let filter = build_filter(Some("debug")).unwrap().to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_directives_are_used_as_given() {
        let filter = build_filter(Some("advisor_server=trace")).unwrap().to_string();
        assert!(filter.contains("advisor_server=trace"));
        assert!(!filter.contains("reqwest"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
