use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to initialize telemetry: {0}")]
    Init(String),
    #[error("Unknown log level: {0}")]
    InvalidLevel(String),
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub level: tracing::Level,
    /// One JSON object per line instead of human-readable output.
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::WARN,
            json_output: false,
        }
    }
}

/// Parse `error`, `warn`, `info`, `debug` or `trace` (any case).
pub fn parse_level(level: &str) -> Result<tracing::Level, TelemetryError> {
    level
        .trim()
        .parse()
        .map_err(|_| TelemetryError::InvalidLevel(level.to_string()))
}

/// Install the global subscriber. Log output goes to stderr so that stdout
/// stays free for command output. `RUST_LOG` overrides the configured level.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_output {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| TelemetryError::Init(e.to_string()))
}
