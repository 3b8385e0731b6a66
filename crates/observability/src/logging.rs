//! Subscriber installation.

use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Default log level when neither `RUST_LOG` nor a filter is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Logging configuration (TOML-serializable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG` when set.
    pub level: LogLevel,

    /// Extra comma-separated filter directives, e.g. `strata_net_reactor=trace`.
    pub filter: Option<String>,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Colorize human-readable output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            filter: None,
            json: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Build the filter: `RUST_LOG` if set, else the configured level, then the
    /// extra directives on top.
    pub fn env_filter(&self) -> eyre::Result<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));

        if let Some(custom) = &self.filter {
            for directive in custom.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let directive = directive
                    .parse::<Directive>()
                    .wrap_err_with(|| format!("invalid log filter directive `{directive}`"))?;
                filter = filter.add_directive(directive);
            }
        }
        Ok(filter)
    }
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> eyre::Result<()> {
    let filter = config.env_filter()?;

    let layer = fmt::layer().with_ansi(config.ansi && !config.json);
    let layer = if config.json {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .wrap_err("failed to install tracing subscriber")?;

    Ok(())
}

/// Subscriber for tests: writes through the test harness capture and ignores
/// a subscriber installed by an earlier test.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
