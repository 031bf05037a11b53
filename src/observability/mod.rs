// observability/mod.rs - Tracing and Metrics

//! Observability: structured logging and Prometheus metrics.
//!
//! The orchestrators record three things: committed state transitions,
//! outbound dispatches, and guard-chain skips. Everything else is ordinary
//! `tracing` output.
//!
//! # Example
//!
//! ```ignore
//! use dsp_connector::observability::{init_tracing, init_metrics, MetricsConfig, TracingConfig};
//!
//! init_tracing(TracingConfig::default());
//! let handle = init_metrics(MetricsConfig::default()).unwrap();
//! ```

mod metrics;
mod tracing_setup;

pub use metrics::{
    init_metrics, record_dispatch, record_guard_skip, record_transition, DispatchMetrics,
    GuardMetrics, MetricsConfig, MetricsHandle, TransitionMetrics,
};

pub use tracing_setup::{init_tracing, TracingConfig, TracingFormat};
