//! Prometheus metrics for store observability.
//!
//! The store records through the [`metrics`] facade, so nothing is collected
//! until a recorder is installed. [`MetricsExporter`] installs a Prometheus
//! recorder and renders the text exposition format on demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_action_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... run stores ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder installed as the global metrics sink.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// Only one global recorder can exist per process. If one is already
    /// installed (e.g., by another test), this logs a warning and returns
    /// `Ok(())` without a handle, so [`render`](Self::render) yields `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_001, 0.000_01, 0.000_1, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the Prometheus handle, if this exporter installed the recorder.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "store_actions_processed_total",
        "Total number of actions reduced on mutation contexts"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time taken by a single reduce call"
    );
    describe_counter!(
        "store_effects_total",
        "Effects returned by reducers and async handlers, by type"
    );
    describe_counter!(
        "store_async_tasks_spawned_total",
        "Async-context tasks spawned for Run effects"
    );
    describe_counter!(
        "store_off_context_sends_total",
        "Sends issued outside the mutation context and redirected onto it"
    );
    describe_counter!(
        "store_subscriptions_total",
        "Subscriptions created on store state"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one reduce call.
    pub fn record_reduce(duration: Duration) {
        counter!("store_actions_processed_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an effect by its variant name (`none`, `send` or `run`).
    pub fn record_effect(kind: &'static str) {
        counter!("store_effects_total", "type" => kind).increment(1);
    }

    /// Record a spawned async-context task.
    pub fn record_spawn() {
        counter!("store_async_tasks_spawned_total").increment(1);
    }

    /// Record a send that arrived from outside the mutation context.
    pub fn record_off_context_send() {
        counter!("store_off_context_sends_total").increment(1);
    }

    /// Record a new subscription.
    pub fn record_subscription(shape: &'static str) {
        counter!("store_subscriptions_total", "shape" => shape).increment(1);
    }
}
