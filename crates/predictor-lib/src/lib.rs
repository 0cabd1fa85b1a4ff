//! Library for customer churn prediction
//!
//! This crate provides the core functionality for:
//! - Typed, domain-checked customer records
//! - Loading the pre-trained classifier artifact (ONNX or logistic JSON)
//! - The inference adapter and verdict formatting
//! - Health checks and observability

pub mod classifier;
pub mod display;
pub mod error;
pub mod health;
pub mod inference;
pub mod loader;
pub mod models;
pub mod observability;

pub use classifier::{Classifier, ModelKind};
pub use display::Verdict;
pub use error::{InferenceError, ModelLoadError, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use inference::InferenceAdapter;
pub use loader::{load_classifier, ModelSource};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
