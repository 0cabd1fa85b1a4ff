//! Observability infrastructure for the churn predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, verdict counts, errors, model info)
//! - Structured JSON logging with tracing

use crate::models::{PredictionRequest, PredictionResult};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors: IntCounterVec,
    validation_rejections: IntCounter,
    model_info: GaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "churn_predictor_prediction_latency_seconds",
                "Time spent running model inference for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "churn_predictor_predictions_total",
                "Number of predictions served, by verdict",
                &["verdict"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "churn_predictor_prediction_errors_total",
                "Number of failed inference calls, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            validation_rejections: register_int_counter!(
                "churn_predictor_validation_rejections_total",
                "Number of submissions rejected before inference"
            )
            .expect("Failed to register validation_rejections_total"),

            model_info: register_gauge_vec!(
                "churn_predictor_model_info",
                "Information about the loaded model artifact",
                &["version", "kind"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, verdict: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[verdict])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner().prediction_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_validation_rejections(&self) {
        self.inner().validation_rejections.inc();
    }

    /// Update model info; the process only ever loads one artifact
    pub fn set_model_info(&self, version: &str, kind: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version, kind])
            .set(1.0);
    }
}

/// Structured logger for predictor events
///
/// Provides consistent JSON-formatted logging for predictions and
/// lifecycle events.
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

    /// Log a served prediction
    pub fn log_prediction(&self, request: &PredictionRequest, result: &PredictionResult) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            tenure = request.tenure,
            monthly_charges = request.monthly_charges,
            total_charges = request.total_charges,
            contract = %request.contract,
            payment_method = %request.payment_method,
            label = result.label.class(),
            probability = result.probability,
            model_version = %result.model_version,
            "Generated churn prediction"
        );
    }

    /// Log a failed inference call
    pub fn log_prediction_failure(&self, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            kind = %kind,
            error = %error,
            "Churn prediction failed"
        );
    }

    /// Log a submission rejected before inference
    pub fn log_rejected_submission(&self, reason: &str) {
        info!(
            event = "submission_rejected",
            instance = %self.instance,
            reason = %reason,
            "Rejected prediction request"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: &str, model_kind: &str) {
        info!(
            event = "app_started",
            instance = %self.instance,
            app_version = %version,
            model_version = %model_version,
            model_kind = %model_kind,
            "Churn predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "app_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Churn predictor shutting down"
        );
    }
}
