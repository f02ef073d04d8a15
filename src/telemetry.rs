//! Logging setup.
//!
//! Installs a `tracing` subscriber driven by the `[logging]` config section.
//! `RUST_LOG`, when set, overrides the configured level. Output goes to
//! stderr so command output on stdout stays clean.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl From<&LoggingConfig> for LogFormat {
    fn from(cfg: &LoggingConfig) -> Self {
        if cfg.format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

fn level_directive(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Initialise the global subscriber. Later calls are no-ops.
pub fn init_tracing(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&cfg.level)));

    let base = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let fmt_layer = match LogFormat::from(cfg) {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Text => base.boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
