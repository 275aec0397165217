// Logging initialization
//
// This module wires `tracing` to:
// - a console layer on stderr (plain text or JSON)
// - an optional non-blocking file layer
// Filtering follows RUST_LOG / LOG_LEVEL with an `info` default.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// ============================================================================
// Telemetry Configuration
// ============================================================================

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, logged once at startup
    pub service_name: String,
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Emit console records as JSON lines
    pub json: bool,
    /// Log filter (e.g., "info", "debug", "ctfnotify_worker=debug")
    pub log_filter: Option<String>,
    /// Additional log file (plain text, no ANSI colours)
    pub log_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ctfnotify".to_string(),
            enable_console: true,
            json: false,
            log_filter: None,
            log_file: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    /// - `LOG_FORMAT`: `json` for JSON console output
    /// - `LOG_FILE`: Path of an additional log file
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
            json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            log_file: std::env::var("LOG_FILE").ok().map(PathBuf::from),
            ..Default::default()
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Filter used when neither `RUST_LOG` nor `LOG_LEVEL` is set
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        if self.log_filter.is_none() {
            self.log_filter = Some(filter.into());
        }
        self
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Keeps the background log writer alive; flushes on drop
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber
///
/// Keep the returned guard alive for the lifetime of the application.
///
/// ```ignore
/// use ctfnotify_core::telemetry::{init_telemetry, TelemetryConfig};
///
/// let _guard = init_telemetry(TelemetryConfig::from_env());
/// ```
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let filter = config
        .log_filter
        .as_ref()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let console_layer = config.enable_console.then(|| {
        if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed()
        }
    });

    let (file_layer, file_guard) = match config.log_file.as_deref().and_then(split_log_path) {
        Some((dir, file_name)) => {
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(service = %config.service_name, "telemetry initialized");

    TelemetryGuard {
        _file_guard: file_guard,
    }
}

fn split_log_path(path: &std::path::Path) -> Option<(PathBuf, PathBuf)> {
    let file_name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, PathBuf::from(file_name)))
}
