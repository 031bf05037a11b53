// observability/tracing_setup.rs - Tracing Configuration

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Tracing output format
#[derive(Clone, Debug, Default)]
pub enum TracingFormat {
    /// Human-readable format (default)
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

/// Configuration for tracing
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "debug", "dsp_connector=debug")
    pub filter: String,

    /// Output format
    pub format: TracingFormat,

    /// Include span events (new, close)
    pub with_span_events: bool,

    /// Include file and line numbers
    pub with_file: bool,

    /// Include target (module path)
    pub with_target: bool,

    /// ANSI colors (for terminal output)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info,dsp_connector=debug".into(),
            format: TracingFormat::Pretty,
            with_span_events: false,
            with_file: false,
            with_target: true,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create a production config (JSON, minimal overhead)
    pub fn production() -> Self {
        Self {
            filter: "info,dsp_connector=info".into(),
            format: TracingFormat::Json,
            with_span_events: false,
            with_file: false,
            with_target: true,
            with_ansi: false,
        }
    }

    /// Create a development config (pretty, verbose)
    pub fn development() -> Self {
        Self {
            filter: "debug,dsp_connector=trace".into(),
            format: TracingFormat::Pretty,
            with_span_events: true,
            with_file: true,
            with_target: true,
            with_ansi: true,
        }
    }
}

/// Initialize the tracing subscriber
///
/// This should be called once at application startup.
pub fn init_tracing(config: TracingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        TracingFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_span_events(span_events)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_target(config.with_target)
                .with_ansi(config.with_ansi);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
        TracingFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_target(config.with_target)
                .with_ansi(config.with_ansi);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
        TracingFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_target(config.with_target);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
    }

    tracing::info!(
        filter = %config.filter,
        format = ?config.format,
        "Tracing initialized"
    );
}
