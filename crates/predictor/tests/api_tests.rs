//! Integration tests for the form, inference API and health endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use churn_predictor::api::{create_router, AppState};
use predictor_lib::{
    classifier::{Classifier, ModelKind},
    health::{components, HealthRegistry},
    load_classifier, ChurnLabel, FeatureRow, InferenceAdapter, InferenceError, ModelSource,
    PredictorMetrics, StructuredLogger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const FULL_FORM: &str = "gender=Male&Partner=Yes&Dependents=Yes&tenure=12\
    &MonthlyCharges=70&TotalCharges=3000&Contract=Month-to-month\
    &PaymentMethod=Electronic+check";

/// Classifier whose execution always fails
struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict(&self, _row: &FeatureRow) -> Result<ChurnLabel, InferenceError> {
        Err(InferenceError::Model("graph execution failed".to_string()))
    }

    fn predict_proba(&self, _row: &FeatureRow) -> Result<[f64; 2], InferenceError> {
        Err(InferenceError::Model("graph execution failed".to_string()))
    }

    fn version(&self) -> &str {
        "broken"
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Onnx
    }
}

fn bundled_model() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/churn_model.json")
}

async fn setup_unloaded(classifier: Arc<dyn Classifier>) -> (Router, Arc<AppState>) {
    let logger = StructuredLogger::new("api-test");
    let adapter = InferenceAdapter::new(classifier, logger.clone());
    let health_registry = HealthRegistry::new();
    let state = Arc::new(
        AppState::new(health_registry, PredictorMetrics::new(), logger, adapter).unwrap(),
    );
    let router = create_router(state.clone());

    (router, state)
}

async fn setup_app_with(classifier: Arc<dyn Classifier>) -> (Router, Arc<AppState>) {
    let (router, state) = setup_unloaded(classifier).await;
    state
        .health_registry
        .mark_model_loaded(state.adapter.model_version(), state.adapter.model_kind())
        .await;
    (router, state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let classifier = load_classifier(&ModelSource::new(bundled_model())).unwrap();
    setup_app_with(classifier).await
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn full_json() -> serde_json::Value {
    serde_json::json!({
        "gender": "Male",
        "Partner": "Yes",
        "Dependents": "Yes",
        "tenure": 12,
        "MonthlyCharges": 70.0,
        "TotalCharges": 3000.0,
        "Contract": "Month-to-month",
        "PaymentMethod": "Electronic check"
    })
}

#[tokio::test]
async fn test_index_renders_form_with_defaults() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert!(html.contains("Customer Churn Prediction"));
    assert!(html.contains("name=\"tenure\" min=\"0\" max=\"72\""));
    assert!(html.contains("value=\"12\""));
    assert!(html.contains("Bank transfer (automatic)"));
    assert!(html.contains("Months as a customer"));
    assert!(html.contains("logreg-telco-2025.1"));
    assert!(!html.contains("Likely to"));
}

#[tokio::test]
async fn test_form_submission_renders_verdict() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(form_request(FULL_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Likely to churn (Probability: 69%)"));
    assert!(html.contains("What do these results mean?"));
    assert!(html.contains("<option selected>Month-to-month</option>"));
}

#[tokio::test]
async fn test_form_submission_stay_verdict() {
    let (app, _state) = setup_test_app().await;

    let body = "gender=Female&Partner=Yes&Dependents=Yes&tenure=60\
        &MonthlyCharges=20&TotalCharges=1200&Contract=Two+year\
        &PaymentMethod=Bank+transfer+%28automatic%29";
    let response = app.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Likely to stay (Probability: 1%)"));
}

#[tokio::test]
async fn test_form_missing_field_shows_error() {
    let (app, state) = setup_test_app().await;

    let body = FULL_FORM.replace("&Contract=Month-to-month", "");
    let response = app.oneshot(form_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("missing field `Contract`"));
    assert!(!html.contains("Likely to"));

    // A rejected submission is not an inference failure
    let health = state.health_registry.health().await;
    assert_eq!(
        health.components[components::INFERENCE].status,
        predictor_lib::ComponentStatus::Healthy
    );
}

#[tokio::test]
async fn test_form_out_of_range_shows_error() {
    let (app, _state) = setup_test_app().await;

    let body = FULL_FORM.replace("tenure=12", "tenure=80");
    let response = app.oneshot(form_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("outside [0, 72]"));
    assert!(html.contains("value=\"80\""));
}

#[tokio::test]
async fn test_form_inference_failure_shows_error() {
    let (app, state) = setup_app_with(Arc::new(BrokenClassifier)).await;

    let response = app.oneshot(form_request(FULL_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_text(response).await;
    assert!(html.contains("Prediction failed: model execution failed"));
    assert!(!html.contains("Likely to"));

    let health = state.health_registry.health().await;
    assert_eq!(health.status, predictor_lib::ComponentStatus::Degraded);
}

#[tokio::test]
async fn test_api_predict_returns_verdict() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(json_request(full_json())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["label"], 1);
    assert_eq!(body["verdict"], "churn");
    assert_eq!(body["percentage"], 69);
    assert_eq!(body["model_version"], "logreg-telco-2025.1");
    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
}

#[tokio::test]
async fn test_api_predict_is_idempotent() {
    let (app, _state) = setup_test_app().await;

    let first = app.clone().oneshot(json_request(full_json())).await.unwrap();
    let second = app.oneshot(json_request(full_json())).await.unwrap();

    assert_eq!(body_text(first).await, body_text(second).await);
}

#[tokio::test]
async fn test_api_predict_boundary_records() {
    let (app, _state) = setup_test_app().await;

    let mut low = full_json();
    low["tenure"] = 0.into();
    low["MonthlyCharges"] = 0.0.into();
    low["TotalCharges"] = 0.0.into();
    let response = app.clone().oneshot(json_request(low)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut high = full_json();
    high["tenure"] = 72.into();
    high["MonthlyCharges"] = 500.0.into();
    high["TotalCharges"] = 10000.0.into();
    high["Contract"] = "Two year".into();
    let response = app.oneshot(json_request(high)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_predict_missing_field() {
    let (app, _state) = setup_test_app().await;

    let mut body = full_json();
    body.as_object_mut().unwrap().remove("PaymentMethod");
    let response = app.oneshot(json_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"], "missing field `PaymentMethod`");
}

#[tokio::test]
async fn test_api_predict_unknown_category() {
    let (app, _state) = setup_test_app().await;

    let mut body = full_json();
    body["Contract"] = "Three year".into();
    let response = app.oneshot(json_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_api_predict_model_failure() {
    let (app, _state) = setup_app_with(Arc::new(BrokenClassifier)).await;

    let response = app.oneshot(json_request(full_json())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("graph execution failed"));
}

fn validation_rejections() -> f64 {
    prometheus::gather()
        .iter()
        .find(|family| family.get_name() == "churn_predictor_validation_rejections_total")
        .and_then(|family| family.get_metric().first().map(|m| m.get_counter().get_value()))
        .unwrap_or(0.0)
}

#[tokio::test]
async fn test_api_predict_wrong_types_return_json_error() {
    let (app, _state) = setup_test_app().await;

    for (field, value) in [("gender", serde_json::json!(1)), ("tenure", serde_json::json!(true))] {
        let before = validation_rejections();
        let mut payload = full_json();
        payload[field] = value;

        let response = app.clone().oneshot(json_request(payload)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await)
            .expect("error body should be JSON");
        assert!(body["error"].is_string(), "{}", body);
        assert!(validation_rejections() >= before + 1.0);
    }
}

#[tokio::test]
async fn test_api_predict_malformed_json_returns_json_error() {
    let (app, _state) = setup_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"gender\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_form_malformed_body_shows_error_page() {
    let (app, _state) = setup_test_app().await;
    let before = validation_rejections();

    let body = format!("{}&gender=Female", FULL_FORM);
    let response = app.oneshot(form_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("banner error"));
    assert!(html.contains("duplicate field"));
    assert!(!html.contains("Likely to"));
    assert!(validation_rejections() >= before + 1.0);
}

#[tokio::test]
async fn test_healthz_degraded_is_still_ok() {
    let (app, _state) = setup_app_with(Arc::new(BrokenClassifier)).await;

    let response = app.clone().oneshot(json_request(full_json())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["inference"]["status"], "degraded");
}

#[tokio::test]
async fn test_model_info() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/model")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["version"], "logreg-telco-2025.1");
    assert_eq!(body["kind"], "logistic");
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["model"].is_object());
    assert!(health["components"]["inference"].is_object());
}

#[tokio::test]
async fn test_readyz_follows_model_load() {
    let classifier = load_classifier(&ModelSource::new(bundled_model())).unwrap();
    let (app, state) = setup_unloaded(classifier).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state
        .health_registry
        .mark_model_loaded(state.adapter.model_version(), state.adapter.model_kind())
        .await;

    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let readiness: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(readiness["ready"], true);
    assert_eq!(readiness["model_version"], "logreg-telco-2025.1");
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app().await;

    // Serve one prediction so the verdict counter has a sample
    let response = app.clone().oneshot(json_request(full_json())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let metrics_text = body_text(response).await;
    assert!(metrics_text.contains("churn_predictor_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("churn_predictor_predictions_total"));
    assert!(metrics_text.contains("churn_predictor_model_info"));
}
