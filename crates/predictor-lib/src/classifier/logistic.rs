//! Logistic-regression pipeline loaded from a JSON artifact
//!
//! The artifact carries its own preprocessing: standard scaling for numeric
//! columns and one-hot coefficients for categorical columns. A category with
//! no coefficient contributes nothing, the same as an ignored unknown
//! category in a one-hot encoder.

use super::{Classifier, ModelKind};
use crate::error::{InferenceError, ModelLoadError};
use crate::models::{category_labels, ChurnLabel, FeatureRow, FEATURE_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard-scaled numeric column term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTerm {
    pub mean: f64,
    pub scale: f64,
    pub coef: f64,
}

/// On-disk form of a fitted logistic-regression pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticArtifact {
    pub version: String,
    pub intercept: f64,
    /// Class ids in probability-vector order; must be `[0, 1]`
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
    #[serde(default)]
    pub numeric: HashMap<String, NumericTerm>,
    /// Column name -> category label -> coefficient
    #[serde(default)]
    pub categorical: HashMap<String, HashMap<String, f64>>,
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

#[derive(Debug, Clone)]
enum Term {
    Numeric(NumericTerm),
    /// Coefficient per category index
    OneHot(Vec<f64>),
}

/// Logistic-regression classifier with its preprocessing folded in
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    version: String,
    intercept: f64,
    /// One entry per feature column, `None` for columns the model ignores
    terms: Vec<Option<Term>>,
}

impl LogisticClassifier {
    /// Parse and check a JSON artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let artifact: LogisticArtifact = serde_json::from_slice(bytes)?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: LogisticArtifact) -> Result<Self, ModelLoadError> {
        if artifact.classes != [0, 1] {
            return Err(ModelLoadError::InvalidArtifact(format!(
                "classes must be [0, 1], got {:?}",
                artifact.classes
            )));
        }
        if !artifact.intercept.is_finite() {
            return Err(ModelLoadError::InvalidArtifact(
                "intercept is not finite".to_string(),
            ));
        }

        for column in artifact.numeric.keys().chain(artifact.categorical.keys()) {
            if !FEATURE_COLUMNS.contains(&column.as_str()) {
                return Err(ModelLoadError::InvalidArtifact(format!(
                    "unknown column `{}`",
                    column
                )));
            }
        }

        let mut terms = Vec::with_capacity(FEATURE_COLUMNS.len());
        for column in FEATURE_COLUMNS {
            let numeric = artifact.numeric.get(column);
            let one_hot = artifact.categorical.get(column);
            let term = match (category_labels(column), numeric, one_hot) {
                (_, Some(_), Some(_)) => {
                    return Err(ModelLoadError::InvalidArtifact(format!(
                        "column `{}` is both numeric and categorical",
                        column
                    )))
                }
                (None, Some(n), None) => {
                    if n.scale == 0.0 || !n.scale.is_finite() || !n.mean.is_finite() || !n.coef.is_finite() {
                        return Err(ModelLoadError::InvalidArtifact(format!(
                            "column `{}` has an invalid scaling term",
                            column
                        )));
                    }
                    Some(Term::Numeric(n.clone()))
                }
                (Some(labels), None, Some(coefs)) => {
                    if let Some(unknown) = coefs.keys().find(|k| !labels.contains(&k.as_str())) {
                        return Err(ModelLoadError::InvalidArtifact(format!(
                            "column `{}` has unknown category `{}`",
                            column, unknown
                        )));
                    }
                    let weights = labels
                        .iter()
                        .map(|label| coefs.get(*label).copied().unwrap_or(0.0))
                        .collect();
                    Some(Term::OneHot(weights))
                }
                (None, None, Some(_)) | (Some(_), Some(_), None) => {
                    return Err(ModelLoadError::InvalidArtifact(format!(
                        "column `{}` has the wrong term type",
                        column
                    )))
                }
                (_, None, None) => None,
            };
            terms.push(term);
        }

        Ok(Self {
            version: artifact.version,
            intercept: artifact.intercept,
            terms,
        })
    }

    /// Linear decision function `z`
    pub fn decision_function(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        let mut z = self.intercept;
        for (i, (term, value)) in self.terms.iter().zip(row.values()).enumerate() {
            match term {
                Some(Term::Numeric(n)) => z += n.coef * (value - n.mean) / n.scale,
                Some(Term::OneHot(weights)) => {
                    let idx = *value as usize;
                    if value.fract() != 0.0 || *value < 0.0 || idx >= weights.len() {
                        return Err(InferenceError::Model(format!(
                            "column `{}` has invalid category code {}",
                            FEATURE_COLUMNS[i], value
                        )));
                    }
                    z += weights[idx];
                }
                None => {}
            }
        }
        if !z.is_finite() {
            return Err(InferenceError::Model("decision value is not finite".to_string()));
        }
        Ok(z)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticClassifier {
    fn predict(&self, row: &FeatureRow) -> Result<ChurnLabel, InferenceError> {
        let z = self.decision_function(row)?;
        Ok(if z > 0.0 {
            ChurnLabel::Churn
        } else {
            ChurnLabel::Stay
        })
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<[f64; 2], InferenceError> {
        let p = sigmoid(self.decision_function(row)?);
        Ok([1.0 - p, p])
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Logistic
    }
}
