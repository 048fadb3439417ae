// SPDX-License-Identifier: AGPL-3.0-or-later

//! Structured logging initialization.
//!
//! A thin wrapper over `tracing` + `tracing-subscriber`: resolves a level/format
//! preset once at process start, honoring `RUST_LOG` as an override, and hands
//! back a guard the caller holds for the process lifetime.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default log level if `RUST_LOG` is not set.
    pub default_level: Level,

    /// Whether to include span events (enter/exit).
    pub include_span_events: bool,

    /// Whether to include file/line information.
    pub include_file_line: bool,

    /// Whether to include the target module path.
    pub include_target: bool,

    /// Whether to use ANSI colors in output.
    pub ansi_colors: bool,

    /// Whether to use the compact log format.
    pub compact: bool,

    /// Custom filter directive (overrides `default_level`).
    pub filter_directive: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            include_span_events: false,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            compact: true,
            filter_directive: None,
        }
    }
}

impl TelemetryConfig {
    /// Verbose preset for `--verbose`.
    pub fn verbose() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_span_events: true,
            include_file_line: true,
            include_target: true,
            ansi_colors: true,
            compact: false,
            filter_directive: None,
        }
    }

    /// Quiet preset for `--quiet` / scripting.
    pub fn quiet() -> Self {
        Self {
            default_level: Level::WARN,
            include_span_events: false,
            include_file_line: false,
            include_target: false,
            ansi_colors: false,
            compact: true,
            filter_directive: None,
        }
    }

    /// Preset for tests: never panics on repeated init, trace level.
    pub fn testing() -> Self {
        Self {
            default_level: Level::TRACE,
            include_span_events: false,
            include_file_line: true,
            include_target: true,
            ansi_colors: false,
            compact: false,
            filter_directive: Some("symdex=trace".to_string()),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }
}

/// Guard returned by [`init_telemetry`]; hold it for the process lifetime.
pub struct TelemetryGuard {
    _private: (),
}

/// Initialize logging. Call once at process startup.
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let filter = match &config.filter_directive {
        Some(directive) => EnvFilter::try_new(directive)
            .unwrap_or_else(|_| EnvFilter::new(format!("{}", config.default_level))),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{}", config.default_level))),
    };

    let span_events = if config.include_span_events {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events);

    // try_init (not init) so repeated calls across #[tokio::test] binaries don't panic.
    if config.compact {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.compact())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
    }

    Ok(TelemetryGuard { _private: () })
}
