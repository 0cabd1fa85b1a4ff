//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::{ModelKind, ModelSource};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `CHURN_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Address the HTTP listener binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// HTTP port for the form, inference API and health/metrics
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the model artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Artifact format (`onnx` or `logistic`); guessed from the extension if unset
    #[serde(default)]
    pub model_format: Option<String>,

    /// Expected SHA-256 of the artifact
    #[serde(default)]
    pub model_sha256: Option<String>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "churn-predictor".to_string())
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("churn_model.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            model_path: default_model_path(),
            model_format: None,
            model_sha256: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CHURN").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid CHURN_* configuration")
    }

    /// Socket address of the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Model artifact location and integrity settings
    pub fn model_source(&self) -> Result<ModelSource> {
        let mut source = ModelSource::new(&self.model_path);
        if let Some(format) = self.model_format.as_deref().filter(|f| !f.is_empty()) {
            let kind: ModelKind = format.parse().map_err(anyhow::Error::msg)?;
            source = source.with_format(kind);
        }
        if let Some(sha256) = self.model_sha256.as_deref().filter(|s| !s.is_empty()) {
            source = source.with_sha256(sha256);
        }
        Ok(source)
    }
}
