//! One-time loading of the model artifact
//!
//! The artifact is read, optionally checked against a SHA-256 checksum,
//! parsed into a [`Classifier`] and probed with a reference request. Any
//! failure is returned to the caller, which is expected to abort startup.

use crate::classifier::{Classifier, LogisticClassifier, ModelKind, OnnxClassifier};
use crate::error::ModelLoadError;
use crate::models::PredictionRequest;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Where the model artifact comes from
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub path: PathBuf,
    /// Explicit format; guessed from the file extension when absent
    pub format: Option<ModelKind>,
    /// Expected hex SHA-256 of the artifact bytes
    pub sha256: Option<String>,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            sha256: None,
        }
    }

    pub fn with_format(mut self, format: ModelKind) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    fn resolve_kind(&self) -> Result<ModelKind, ModelLoadError> {
        if let Some(kind) = self.format {
            return Ok(kind);
        }
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ModelKind::from_extension)
            .ok_or_else(|| ModelLoadError::UnknownFormat(self.path.clone()))
    }
}

/// Compute hex SHA-256 checksum
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Load the classifier described by `source`
pub fn load_classifier(source: &ModelSource) -> Result<Arc<dyn Classifier>, ModelLoadError> {
    let kind = source.resolve_kind()?;
    let bytes = std::fs::read(&source.path).map_err(|e| ModelLoadError::Io {
        path: source.path.clone(),
        source: e,
    })?;

    let checksum = compute_checksum(&bytes);
    if let Some(expected) = &source.sha256 {
        if !expected.trim().eq_ignore_ascii_case(&checksum) {
            return Err(ModelLoadError::ChecksumMismatch {
                expected: expected.trim().to_string(),
                actual: checksum,
            });
        }
    }

    let classifier = classifier_from_bytes(kind, &bytes, &source.path, &checksum)?;
    probe(classifier.as_ref())?;

    info!(
        path = %source.path.display(),
        kind = %kind,
        version = %classifier.version(),
        size = bytes.len(),
        checksum = %checksum,
        "Model artifact loaded"
    );

    Ok(classifier)
}

fn classifier_from_bytes(
    kind: ModelKind,
    bytes: &[u8],
    path: &Path,
    checksum: &str,
) -> Result<Arc<dyn Classifier>, ModelLoadError> {
    match kind {
        ModelKind::Logistic => Ok(Arc::new(LogisticClassifier::from_json(bytes)?)),
        ModelKind::Onnx => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("model");
            let version = format!("{}@{}", stem, &checksum[..12]);
            Ok(Arc::new(OnnxClassifier::new(bytes, version)?))
        }
    }
}

/// Run the default form record through the model once
fn probe(classifier: &dyn Classifier) -> Result<(), ModelLoadError> {
    let row = PredictionRequest::default().feature_row();
    classifier
        .predict(&row)
        .map_err(|e| ModelLoadError::InvalidArtifact(format!("probe prediction failed: {}", e)))?;
    let proba = classifier
        .predict_proba(&row)
        .map_err(|e| ModelLoadError::InvalidArtifact(format!("probe prediction failed: {}", e)))?;
    if !proba.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p)) {
        return Err(ModelLoadError::InvalidArtifact(format!(
            "probe produced invalid probabilities {:?}",
            proba
        )));
    }
    Ok(())
}
