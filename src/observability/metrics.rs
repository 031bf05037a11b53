// observability/metrics.rs - Prometheus Metrics

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for metrics
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Address to expose metrics endpoint
    pub listen_addr: SocketAddr,

    /// Histogram buckets for dispatch latency (in seconds)
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".parse().unwrap(),
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Handle to the Prometheus metrics exporter
#[derive(Clone)]
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// State transition metrics
pub struct TransitionMetrics;

impl TransitionMetrics {
    pub const TRANSITIONS_TOTAL: &'static str = "dsp_transitions_total";
}

/// Outbound dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub const SENT_TOTAL: &'static str = "dsp_dispatches_total";
    pub const LATENCY_SECONDS: &'static str = "dsp_dispatch_latency_seconds";
}

/// Guard chain metrics
pub struct GuardMetrics;

impl GuardMetrics {
    pub const SKIPS_TOTAL: &'static str = "dsp_guard_skips_total";
}

/// Initialize the metrics system
///
/// Starts an HTTP server on the configured address to expose Prometheus
/// metrics. Returns a handle that can be used to render metrics
/// programmatically.
pub fn init_metrics(config: MetricsConfig) -> Result<MetricsHandle, Box<dyn std::error::Error>> {
    let builder = PrometheusBuilder::new().set_buckets_for_metric(
        metrics_exporter_prometheus::Matcher::Full(DispatchMetrics::LATENCY_SECONDS.into()),
        &config.latency_buckets,
    )?;

    let handle = builder.install_recorder()?;
    let metrics_handle = MetricsHandle {
        handle: handle.clone(),
    };

    // Start HTTP server for metrics endpoint
    let listen_addr = config.listen_addr;
    let shared_handle = std::sync::Arc::new(handle);

    tokio::spawn(async move {
        use axum::{http::StatusCode, routing::get, Json, Router};
        use serde::Serialize;

        #[derive(Serialize)]
        struct HealthResponse {
            status: &'static str,
            version: &'static str,
            uptime_secs: u64,
        }

        let start_time = std::time::Instant::now();

        let handle_for_route = shared_handle.clone();
        let app = Router::new()
            .route(
                "/metrics",
                get(move || {
                    let h = handle_for_route.clone();
                    async move { h.render() }
                }),
            )
            .route(
                "/health",
                get(move || {
                    let uptime = start_time.elapsed().as_secs();
                    async move {
                        Json(HealthResponse {
                            status: "healthy",
                            version: env!("CARGO_PKG_VERSION"),
                            uptime_secs: uptime,
                        })
                    }
                }),
            )
            .route("/ready", get(|| async { StatusCode::OK }))
            .route("/live", get(|| async { StatusCode::OK }));

        match tokio::net::TcpListener::bind(listen_addr).await {
            Ok(listener) => {
                tracing::info!(addr = %listen_addr, "Metrics HTTP server started");
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "Metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, addr = %listen_addr, "Failed to bind metrics server");
            }
        }
    });

    describe_counter!(
        TransitionMetrics::TRANSITIONS_TOTAL,
        "Total number of committed state transitions"
    );
    describe_counter!(
        DispatchMetrics::SENT_TOTAL,
        "Total number of outbound protocol message dispatches"
    );
    describe_histogram!(
        DispatchMetrics::LATENCY_SECONDS,
        "Dispatch round-trip latency in seconds"
    );
    describe_counter!(
        GuardMetrics::SKIPS_TOTAL,
        "Total number of triggers absorbed by the guard chain"
    );

    tracing::info!(addr = %config.listen_addr, "Metrics initialized");

    Ok(metrics_handle)
}

// Recording functions

/// Record a committed state transition
pub fn record_transition(entity_kind: &str, from: &str, to: &str) {
    counter!(
        TransitionMetrics::TRANSITIONS_TOTAL,
        "entity" => entity_kind.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record an outbound dispatch attempt and its round-trip latency
pub fn record_dispatch(message_kind: &str, success: bool, latency: Duration) {
    counter!(
        DispatchMetrics::SENT_TOTAL,
        "kind" => message_kind.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
    histogram!(
        DispatchMetrics::LATENCY_SECONDS,
        "kind" => message_kind.to_string()
    )
    .record(latency.as_secs_f64());
}

/// Record a trigger absorbed by the guard chain
pub fn record_guard_skip(entity_kind: &str, reason: &str) {
    counter!(
        GuardMetrics::SKIPS_TOTAL,
        "entity" => entity_kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn test_metric_names() {
        assert!(TransitionMetrics::TRANSITIONS_TOTAL.starts_with("dsp_"));
        assert!(DispatchMetrics::SENT_TOTAL.starts_with("dsp_"));
        assert!(GuardMetrics::SKIPS_TOTAL.starts_with("dsp_"));
    }
}
