//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, errors, loaded models)
//! - Structured JSON logging with tracing

use crate::models::{ModelChoice, PredictionResult};
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter, register_int_counter_vec,
    GaugeVec, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    validation_errors_total: IntCounter,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "renewal_prediction_latency_seconds",
                "Time spent encoding features and running the classifier",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "renewal_predictions_total",
                "Predictions served, by model and predicted label",
                &["model", "label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "renewal_prediction_errors_total",
                "Requests that failed during inference",
                &["model"]
            )
            .expect("Failed to register prediction_errors_total"),

            validation_errors_total: register_int_counter!(
                "renewal_validation_errors_total",
                "Requests rejected before reaching the classifier"
            )
            .expect("Failed to register validation_errors_total"),

            model_info: register_gauge_vec!(
                "renewal_model_info",
                "Classifier artifacts loaded at startup",
                &["model", "checksum"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// A lightweight handle to the process-wide metrics; clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (registers collectors on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, model: ModelChoice, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[model.as_str()])
            .observe(duration_secs);
    }

    pub fn inc_predictions(&self, model: ModelChoice, label: u8) {
        let label = label.to_string();
        self.inner()
            .predictions_total
            .with_label_values(&[model.as_str(), label.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, model: ModelChoice) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[model.as_str()])
            .inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors_total.inc();
    }

    /// Publish a loaded artifact
    pub fn set_model_info(&self, model: ModelChoice, checksum: &str) {
        self.inner()
            .model_info
            .with_label_values(&[model.as_str(), checksum])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Every line carries an `event` field and the instance name so log
/// pipelines can filter without parsing messages.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            addr = %addr,
            "Renewal prediction service started"
        );
    }

    pub fn log_model_loaded(&self, model: ModelChoice, path: &str, checksum: &str) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model = %model,
            path = %path,
            checksum = %checksum,
            "Classifier loaded"
        );
    }

    pub fn log_prediction(&self, result: &PredictionResult, elapsed_secs: f64) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            model = %result.model,
            prediction = result.label,
            probability = result.probability,
            elapsed_ms = elapsed_secs * 1000.0,
            "Served renewal prediction"
        );
    }

    pub fn log_prediction_failure(&self, model: ModelChoice, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            model = %model,
            error = %error,
            "Prediction failed"
        );
    }

    pub fn log_rejected_request(&self, reason: &str) {
        info!(
            event = "request_rejected",
            instance = %self.instance,
            reason = %reason,
            "Rejected prediction request"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Renewal prediction service shutting down"
        );
    }
}
