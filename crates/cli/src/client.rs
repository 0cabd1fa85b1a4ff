//! API client for communicating with the churn predictor server

use anyhow::{Context, Result};
use predictor_lib::{ChurnLabel, HealthResponse, PredictionRequest, PredictionResult};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the churn predictor server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Submit one record to the inference endpoint
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictResponse> {
        self.post("api/v1/predict", request).await
    }

    /// Fetch the loaded model's identity
    pub async fn model_info(&self) -> Result<ModelInfo> {
        self.get("api/v1/model").await
    }

    /// Fetch server health; an unhealthy server answers 503 with the same body
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse health response");
        }
        Self::parse(response).await
    }
}

// API response types

/// Error body returned for rejected requests
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Inference endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Loaded model identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use predictor_lib::ComponentStatus;

    const PREDICT_BODY: &str = r#"{
        "label": 1,
        "verdict": "churn",
        "probability": 0.6912,
        "percentage": 69,
        "model_version": "logreg-telco-2025.1"
    }"#;

    #[tokio::test]
    async fn test_predict_posts_wire_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/predict")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "gender": "Male",
                "Partner": "Yes",
                "tenure": 12,
                "Contract": "Month-to-month",
                "PaymentMethod": "Electronic check"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PREDICT_BODY)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.predict(&PredictionRequest::default()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.label, 1);
        assert_eq!(response.verdict, ChurnLabel::Churn);
        assert_eq!(response.percentage, 69);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/predict")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"missing field `Contract`"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict(&PredictionRequest::default())
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("422"), "{}", err);
        assert!(err.contains("missing field `Contract`"), "{}", err);
    }

    #[tokio::test]
    async fn test_model_info() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/model")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version":"logreg-telco-2025.1","kind":"logistic"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let info = client.model_info().await.unwrap();

        assert_eq!(info.version, "logreg-telco-2025.1");
        assert_eq!(info.kind, "logistic");
    }

    #[tokio::test]
    async fn test_health_response_parses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"degraded","components":{
                    "model":{"status":"healthy","last_check_timestamp":1760000000},
                    "inference":{"status":"degraded","message":"model error","last_check_timestamp":1760000001}
                }}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components.len(), 2);
        assert_eq!(
            health.components["inference"].message.as_deref(),
            Some("model error")
        );
    }

    #[tokio::test]
    async fn test_unhealthy_server_body_is_read() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"unhealthy","components":{
                    "model":{"status":"unhealthy","message":"Model not yet loaded","last_check_timestamp":1760000000}
                }}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components["model"].message.as_deref(),
            Some("Model not yet loaded")
        );
    }

    #[tokio::test]
    async fn test_health_other_errors_still_fail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.health().await.unwrap_err().to_string();
        assert!(err.contains("500"), "{}", err);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
