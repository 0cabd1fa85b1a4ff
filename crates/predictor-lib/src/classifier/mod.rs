//! Binary classifiers behind the model artifact boundary
//!
//! A classifier exposes the two operations the rest of the system depends
//! on: a class decision and the two-class probability vector. Index 0 of the
//! vector is the probability of staying, index 1 the probability of churn.
//! That ordering is fixed by whoever trained the artifact; it is read here,
//! never re-derived.

mod logistic;
mod onnx;

pub use logistic::{LogisticArtifact, LogisticClassifier, NumericTerm};
pub use onnx::OnnxClassifier;

use crate::error::InferenceError;
use crate::models::{ChurnLabel, FeatureRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialized form of a model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// ONNX graph executed with tract
    Onnx,
    /// JSON description of a fitted logistic-regression pipeline
    Logistic,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Onnx => "onnx",
            ModelKind::Logistic => "logistic",
        }
    }

    /// Guess the kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "onnx" => Some(ModelKind::Onnx),
            "json" => Some(ModelKind::Logistic),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onnx" => Ok(ModelKind::Onnx),
            "logistic" | "json" => Ok(ModelKind::Logistic),
            other => Err(format!("unknown model kind `{}`", other)),
        }
    }
}

/// Trait for model artifacts that can classify a customer record
pub trait Classifier: Send + Sync {
    /// Class decision of the model
    fn predict(&self, row: &FeatureRow) -> Result<ChurnLabel, InferenceError>;

    /// Two-class probability vector `[p_stay, p_churn]`
    fn predict_proba(&self, row: &FeatureRow) -> Result<[f64; 2], InferenceError>;

    /// Version string of the loaded artifact
    fn version(&self) -> &str;

    fn kind(&self) -> ModelKind;
}

/// Arg-max over a two-class vector, ties resolved to class 0
pub(crate) fn argmax_label(proba: &[f64; 2]) -> ChurnLabel {
    if proba[1] > proba[0] {
        ChurnLabel::Churn
    } else {
        ChurnLabel::Stay
    }
}
