//! Inference adapter between the presentation layer and the model artifact
//!
//! The adapter holds the process-wide classifier and turns one validated
//! request into one [`PredictionResult`]. It never retries, never falls back
//! to a default verdict and does no feature engineering of its own.

use crate::classifier::{Classifier, ModelKind};
use crate::error::InferenceError;
use crate::models::{PredictionRequest, PredictionResult};
use crate::observability::{PredictorMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Largest accepted deviation of `p_stay + p_churn` from 1
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-4;

/// Index of the churn class in the probability vector
const CHURN_INDEX: usize = 1;

/// Wraps a loaded classifier behind the request/response contract
#[derive(Clone)]
pub struct InferenceAdapter {
    classifier: Arc<dyn Classifier>,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
}

impl InferenceAdapter {
    pub fn new(classifier: Arc<dyn Classifier>, logger: StructuredLogger) -> Self {
        let metrics = PredictorMetrics::new();
        metrics.set_model_info(classifier.version(), classifier.kind().as_str());
        Self {
            classifier,
            metrics,
            logger,
        }
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    pub fn model_kind(&self) -> ModelKind {
        self.classifier.kind()
    }

    /// Classify one request
    pub fn infer(&self, request: &PredictionRequest) -> Result<PredictionResult, InferenceError> {
        let start = Instant::now();
        let result = self.run(request);
        let elapsed = start.elapsed();

        match &result {
            Ok(prediction) => {
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(prediction.label.as_str());
                self.logger.log_prediction(request, prediction);
                debug!(elapsed_us = elapsed.as_micros(), "Prediction completed");
            }
            Err(e) => {
                self.metrics.inc_prediction_errors(e.kind());
                self.logger.log_prediction_failure(e.kind(), &e.to_string());
            }
        }

        result
    }

    fn run(&self, request: &PredictionRequest) -> Result<PredictionResult, InferenceError> {
        request.validate()?;
        let row = request.feature_row();

        let label = self.classifier.predict(&row)?;
        let proba = self.classifier.predict_proba(&row)?;
        check_probabilities(&proba)?;

        Ok(PredictionResult {
            label,
            probability: proba[CHURN_INDEX],
            model_version: self.classifier.version().to_string(),
        })
    }
}

fn check_probabilities(proba: &[f64; 2]) -> Result<(), InferenceError> {
    if proba
        .iter()
        .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
    {
        return Err(InferenceError::InvalidOutput(format!(
            "probabilities {:?} outside [0, 1]",
            proba
        )));
    }
    let sum = proba[0] + proba[1];
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(InferenceError::InvalidOutput(format!(
            "probabilities {:?} sum to {}",
            proba, sum
        )));
    }
    Ok(())
}
