//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides `--log-level`. HTTP client internals are held at `warn`
//! unless `RUST_LOG` says otherwise. Logs go to stderr so results on stdout stay
//! clean.

use clap::ValueEnum;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Modules whose debug output is pure transport noise.
pub const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(directives(log_level))
}

fn directives(log_level: &str) -> String {
    let mut directives = String::from(log_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    directives
}

pub fn init_logging(log_level: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(build_filter(log_level));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr);
            let _ = registry.with(layer).try_init();
        }
        LogFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = registry.with(layer).try_init();
        }
    }

    tracing::debug!(log_level, ?format, "logging initialized");
}
