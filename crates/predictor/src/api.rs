//! HTTP API: JSON inference endpoint, health checks and Prometheus metrics

use crate::web;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use minijinja::Environment;
use predictor_lib::{
    health::{ComponentStatus, HealthRegistry},
    ChurnLabel, InferenceAdapter, InferenceError, PredictionRequest, PredictionRequestDraft,
    PredictionResult, PredictorMetrics, StructuredLogger, ValidationError,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
    pub adapter: InferenceAdapter,
    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
        adapter: InferenceAdapter,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            health_registry,
            metrics,
            logger,
            adapter,
            templates: Arc::new(web::templates()?),
        })
    }

    /// Validate a draft, counting and logging rejections
    pub fn accept(
        &self,
        draft: PredictionRequestDraft,
    ) -> Result<PredictionRequest, ValidationError> {
        draft.into_request().map_err(|e| {
            self.reject(&e.to_string());
            e
        })
    }

    /// Count and log a submission that never became a request
    pub fn reject(&self, reason: &str) {
        self.metrics.inc_validation_rejections();
        self.logger.log_rejected_submission(reason);
    }

    /// Run one inference and reflect the outcome in component health
    pub async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, InferenceError> {
        let result = self.adapter.infer(request);
        self.health_registry
            .record_inference(result.as_ref().map(|_| ()))
            .await;
        result
    }
}

/// JSON body returned by the inference endpoint
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: u8,
    pub verdict: ChurnLabel,
    pub probability: f64,
    pub percentage: u8,
    pub model_version: String,
}

impl From<&PredictionResult> for PredictResponse {
    fn from(result: &PredictionResult) -> Self {
        Self {
            label: result.label.class(),
            verdict: result.label,
            probability: result.probability,
            percentage: result.percentage(),
            model_version: result.model_version.clone(),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Status code for a failed inference call
pub fn inference_error_status(err: &InferenceError) -> StatusCode {
    match err {
        InferenceError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        InferenceError::Model(_) | InferenceError::InvalidOutput(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON inference endpoint
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequestDraft>, JsonRejection>,
) -> Response {
    let draft = match payload {
        Ok(Json(draft)) => draft,
        Err(rejection) => {
            let message = rejection.body_text();
            state.reject(&message);
            return error_response(rejection.status(), message);
        }
    };

    let request = match state.accept(draft) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    match state.predict(&request).await {
        Ok(result) => (StatusCode::OK, Json(PredictResponse::from(&result))).into_response(),
        Err(e) => error_response(inference_error_status(&e), e.to_string()),
    }
}

/// Loaded model information
async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "version": state.adapter.model_version(),
        "kind": state.adapter.model_kind(),
    }))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(web::index))
        .route("/predict", post(web::submit))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
