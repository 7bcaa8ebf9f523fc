// crates/observability/src/lib.rs
//! Tracing subscriber setup shared by the binaries.
//!
//! Console output always goes to stderr so stdout stays clean for JSON
//! reports. An optional daily-rolling file layer writes to the log directory.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,scorebook=info,scorebook_core=info";

const LOG_FILE_PREFIX: &str = "scorebook.log";

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Overrides both `RUST_LOG` and [`DEFAULT_FILTER`].
    pub filter: Option<String>,
    /// Emit JSON lines on stderr instead of the compact format.
    pub json: bool,
    /// Also write daily-rolling log files here.
    pub log_dir: Option<PathBuf>,
}

impl TracingConfig {
    /// Config with file logging into the per-user log directory.
    pub fn with_default_log_dir(mut self) -> Self {
        self.log_dir = scorebook_core::paths::log_dir();
        self
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives)
                .with_context(|| format!("invalid log filter: {directives}")),
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())),
        }
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file logging is on; keep it alive
/// until exit or buffered lines are lost.
pub fn init_tracing(config: &TracingConfig) -> Result<Option<WorkerGuard>> {
    let console = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(config.env_filter()?)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(config.env_filter()?)
            .boxed()
    };

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(config.env_filter()?)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_filter_is_validated() {
        let config = TracingConfig {
            filter: Some("scorebook=debug".into()),
            ..Default::default()
        };
        assert!(config.env_filter().is_ok());

        let bad = TracingConfig {
            filter: Some("scorebook=notalevel".into()),
            ..Default::default()
        };
        assert!(bad.env_filter().is_err());
    }

    #[test]
    fn test_init_with_file_layer_creates_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let config = TracingConfig {
            filter: Some("warn".into()),
            json: false,
            log_dir: Some(log_dir.clone()),
        };
        // Another test in this binary may have installed a subscriber first
        let result = init_tracing(&config);
        assert!(log_dir.is_dir());
        if let Ok(guard) = result {
            assert!(guard.is_some());
        }
    }
}
