//! Tracing setup for the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose logs follow `--log-level`. Everything else stays at `warn`.
const OWN_CRATES: &[&str] = &[
    "starkindex",
    "starkindex_core",
    "starkindex_starknet",
    "starkindex_storage",
];

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    pub level: String,
    /// JSON lines instead of human-readable text.
    pub json: bool,
}

impl LogConfig {
    /// `EnvFilter` directives, e.g. `warn,starkindex=debug,starkindex_core=debug,...`.
    pub fn directives(&self) -> String {
        let mut directives = String::from("warn");
        for krate in OWN_CRATES {
            directives.push_str(&format!(",{krate}={}", self.level));
        }
        directives
    }
}

/// Install the global subscriber. `RUST_LOG` wins when set.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output
    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
