//! Structured logging setup.
//!
//! Two output modes, both on stderr:
//! - human-readable lines for interactive runs
//! - JSON lines for collecting experiment traces
//!
//! ```no_run
//! use clue_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! tracing::info!(event = clue_core::logging::event_names::RUN_STARTED, "starting");
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` directives take precedence over `config.level` when present.
/// Returns `false` if a subscriber was already installed, which leaves the
/// existing one in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                registry.with(layer).try_init().is_ok()
            } else {
                registry.with(layer.without_time()).try_init().is_ok()
            }
        }
        LogFormat::Jsonl => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok(),
    }
}

/// Initialize from the environment only. Safe to call repeatedly.
pub fn init_default_logging() -> bool {
    init_logging(&LogConfig::from_env(None, None))
}

/// Fresh run identifier, `run-<12 hex chars>`.
pub fn generate_run_id() -> String {
    clue_common::RunId::generate().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id_format() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
        assert!(clue_common::RunId::parse(&a).is_some());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
