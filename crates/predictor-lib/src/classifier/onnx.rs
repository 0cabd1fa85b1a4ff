//! ONNX classifier inference using tract
//!
//! Expects the layout produced by sklearn-onnx with `zipmap=False`: a single
//! `f32 [1, 8]` input, output 0 the class label (`i64`) and output 1 the
//! `[1, 2]` probability matrix. A graph with only the probability output is
//! accepted too; its label is the arg-max of the probabilities.

use super::{argmax_label, Classifier, ModelKind};
use crate::error::{InferenceError, ModelLoadError};
use crate::models::{ChurnLabel, FeatureRow, NUM_FEATURES};
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Raw decision of one model run
struct RunOutput {
    label: Option<ChurnLabel>,
    proba: [f64; 2],
}

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
    version: String,
}

impl OnnxClassifier {
    /// Create a classifier from model bytes
    pub fn new(model_bytes: &[u8], version: impl Into<String>) -> Result<Self, ModelLoadError> {
        let model = Self::load_model(model_bytes).map_err(|e| ModelLoadError::Onnx(format!("{:#}", e)))?;
        Ok(Self {
            model,
            version: version.into(),
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")
    }

    fn row_to_tensor(row: &FeatureRow) -> Result<Tensor, InferenceError> {
        tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), row.to_f32())
            .map(Tensor::from)
            .map_err(|e| InferenceError::Model(e.to_string()))
    }

    fn run(&self, row: &FeatureRow) -> Result<RunOutput, InferenceError> {
        let start = Instant::now();
        let input = Self::row_to_tensor(row)?;

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Model(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        match outputs.len() {
            0 => Err(InferenceError::InvalidOutput("no output from model".to_string())),
            1 => Ok(RunOutput {
                label: None,
                proba: probabilities(&outputs[0])?,
            }),
            _ => Ok(RunOutput {
                label: Some(class_label(&outputs[0])?),
                proba: probabilities(&outputs[1])?,
            }),
        }
    }
}

/// Read the first class id from a label tensor
fn class_label(output: &Tensor) -> Result<ChurnLabel, InferenceError> {
    let class = if output.datum_type() == i64::datum_type() {
        output
            .to_array_view::<i64>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?
            .iter()
            .next()
            .copied()
    } else {
        output
            .cast_to::<i64>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?
            .to_array_view::<i64>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?
            .iter()
            .next()
            .copied()
    };

    let class = class.ok_or_else(|| InferenceError::InvalidOutput("empty label output".to_string()))?;
    ChurnLabel::from_class(class)
        .ok_or_else(|| InferenceError::InvalidOutput(format!("unexpected class id {}", class)))
}

/// Read the `[p_stay, p_churn]` row from a probability tensor
fn probabilities(output: &Tensor) -> Result<[f64; 2], InferenceError> {
    let values: Vec<f64> = output
        .cast_to::<f64>()
        .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?
        .to_array_view::<f64>()
        .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?
        .iter()
        .copied()
        .collect();

    if values.len() != 2 {
        return Err(InferenceError::InvalidOutput(format!(
            "probability output has {} values, expected 2",
            values.len()
        )));
    }
    Ok([values[0], values[1]])
}

impl Classifier for OnnxClassifier {
    fn predict(&self, row: &FeatureRow) -> Result<ChurnLabel, InferenceError> {
        let output = self.run(row)?;
        Ok(output.label.unwrap_or_else(|| argmax_label(&output.proba)))
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<[f64; 2], InferenceError> {
        Ok(self.run(row)?.proba)
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Onnx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage_bytes() {
        let result = OnnxClassifier::new(b"definitely not protobuf", "bad");
        assert!(matches!(result, Err(ModelLoadError::Onnx(_))));
    }

    #[test]
    fn test_probabilities_from_tensor() {
        let tensor: Tensor = tract_ndarray::arr2(&[[0.25f32, 0.75f32]]).into();
        assert_eq!(probabilities(&tensor).unwrap(), [0.25, 0.75]);
    }

    #[test]
    fn test_probabilities_wrong_width() {
        let tensor: Tensor = tract_ndarray::arr2(&[[0.2f32, 0.3, 0.5]]).into();
        assert!(matches!(
            probabilities(&tensor),
            Err(InferenceError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_class_label_from_tensor() {
        let churn: Tensor = tract_ndarray::arr1(&[1i64]).into();
        assert_eq!(class_label(&churn).unwrap(), ChurnLabel::Churn);

        let stay: Tensor = tract_ndarray::arr1(&[0i32]).into();
        assert_eq!(class_label(&stay).unwrap(), ChurnLabel::Stay);

        let unknown: Tensor = tract_ndarray::arr1(&[3i64]).into();
        assert!(class_label(&unknown).is_err());
    }
}
