//! Tracing setup for toolauth.
//!
//! Every subscriber built here writes to stderr. Tool adapters speak their
//! protocol on stdout and `toolauth token` prints the access token there, so
//! log lines must never end up on that stream.
//!
//! ```ignore
//! use toolauth_core::tracing::{init_tracing, TracingConfig};
//!
//! // CLI
//! init_tracing(TracingConfig::default())?;
//! // Adapter process
//! init_tracing(TracingConfig::adapter())?;
//! ```

use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*, registry::LookupSpan};

/// Errors from [`init_tracing`].
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber was already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive did not parse.
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Single human-readable line per event.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// How logging is set up for a process.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for toolauth crates when `RUST_LOG` is unset.
    pub default_level: Level,
    /// Line format.
    pub output_format: TracingOutputFormat,
    /// Include file and line.
    pub include_location: bool,
    /// Include the module path.
    pub include_target: bool,
    /// Include a timestamp.
    pub include_timestamp: bool,
    /// Emit ANSI colours (compact format only).
    pub ansi: bool,
    /// Filter directive that takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
            ansi: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// CLI run with `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            ..Self::default()
        }
    }

    /// A tool adapter process.
    ///
    /// Adapters run under a parent that captures stderr into its own log, so
    /// lines are timestamped JSON without colour codes.
    #[must_use]
    pub fn adapter() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Json,
            include_location: true,
            include_target: true,
            include_timestamp: true,
            ansi: false,
            env_filter: None,
        }
    }

    /// Sets the default level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Sets a filter directive that overrides `RUST_LOG`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter used when neither `env_filter` nor `RUST_LOG` is set.
    ///
    /// Only toolauth crates log at `default_level`; dependencies stay quiet.
    fn default_directive(&self) -> String {
        format!(
            "toolauth={level},toolauth_credentials={level},toolauth_cli={level}",
            level = self.default_level
        )
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(self.include_target);

        match (self.output_format, self.include_timestamp) {
            (TracingOutputFormat::Json, true) => base.json().boxed(),
            (TracingOutputFormat::Json, false) => base.json().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().with_ansi(self.ansi).boxed(),
            (TracingOutputFormat::Compact, false) => {
                base.compact().with_ansi(self.ansi).without_time().boxed()
            }
        }
    }
}

/// Installs the global subscriber. Call once at process start.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the filter directive is
/// invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.filter()?)
        .with(config.layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
