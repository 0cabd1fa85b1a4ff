//! Health check infrastructure for the churn predictor
//!
//! Two components are tracked: the model artifact and the inference path.
//! The service only becomes ready once the model artifact has been loaded.

use crate::classifier::ModelKind;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MODEL: &str = "model";
    pub const INFERENCE: &str = "inference";
}

/// Identity of the artifact serving predictions
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadedModel {
    version: String,
    kind: ModelKind,
}

/// Health of the model and inference components
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    model: Arc<RwLock<Option<LoadedModel>>>,
    consecutive_failures: Arc<AtomicU32>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// Start with no model loaded and a healthy inference path
    pub fn new() -> Self {
        let mut components = HashMap::new();
        components.insert(
            components::MODEL.to_string(),
            ComponentHealth::unhealthy(NOT_LOADED),
        );
        components.insert(components::INFERENCE.to_string(), ComponentHealth::healthy());

        Self {
            components: Arc::new(RwLock::new(components)),
            model: Arc::new(RwLock::new(None)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
        }
    }

    async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Record a successfully loaded artifact; the service becomes ready
    pub async fn mark_model_loaded(&self, version: &str, kind: ModelKind) {
        *self.model.write().await = Some(LoadedModel {
            version: version.to_string(),
            kind,
        });
        let mut health = ComponentHealth::healthy();
        health.message = Some(format!("{} ({})", version, kind.as_str()));
        self.update(components::MODEL, health).await;
    }

    /// Reflect the outcome of one inference call.
    ///
    /// Rejected requests say nothing about the model and leave health as is.
    pub async fn record_inference(&self, outcome: Result<(), &InferenceError>) {
        match outcome {
            Ok(()) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                self.update(components::INFERENCE, ComponentHealth::healthy())
                    .await;
            }
            Err(InferenceError::InvalidRequest(_)) => {}
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let message = format!("{} consecutive failure(s), last: {}", failures, e);
                self.update(components::INFERENCE, ComponentHealth::degraded(message))
                    .await;
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let model = self.model.read().await.clone();
        let health = self.health().await;

        match model {
            None => ReadinessResponse {
                ready: false,
                reason: Some(NOT_LOADED.to_string()),
                model_version: None,
            },
            Some(model) if health.status == ComponentStatus::Unhealthy => ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
                model_version: Some(model.version),
            },
            Some(model) => ReadinessResponse {
                ready: true,
                reason: None,
                model_version: Some(model.version),
            },
        }
    }
}

const NOT_LOADED: &str = "Model not yet loaded";
