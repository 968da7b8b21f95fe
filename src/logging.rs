//! Tracing setup for the `prehab` binary
//!
//! Events go to stderr so JSON reports on stdout stay machine-readable.
//! JSON output, on the console or in the daily log files, carries the
//! enclosing `analyze` span so every line names its `user_id` and
//! `analysis_id`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// File name prefix for rotated logs, e.g. `prehab.log.2024-05-01`
const LOG_FILE_PREFIX: &str = "prehab.log";

/// `[logging]` section of the engine config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directory for daily-rotated JSON logs; console only when unset
    pub directory: Option<PathBuf>,
    /// Also log when each `analyze` span closes, with its busy/idle time
    pub span_timing: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
            directory: None,
            span_timing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a `-v` count from the command line to a level
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Filter directive scoped to this crate, e.g. `prehab=info`
    pub fn directive(&self) -> String {
        let level = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        format!("prehab={}", level)
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

fn span_events(timing: bool) -> FmtSpan {
    if timing {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// One JSON object per event, with the current request span's fields
/// under `"span"`
pub fn request_json_layer<S, W>(writer: W, span_timing: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(false)
        .with_current_span(true)
        .with_span_list(false)
        .with_span_events(span_events(span_timing))
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));

    let console = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_span_events(span_events(config.span_timing))
            .boxed(),
        LogFormat::Json => request_json_layer(std::io::stderr, config.span_timing).boxed(),
    };

    let file = match &config.directory {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            Some(request_json_layer(appender, config.span_timing))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    tracing::debug!(level = ?config.level, directory = ?config.directory, "Logging initialized");
    Ok(())
}
