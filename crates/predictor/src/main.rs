//! Churn Predictor - customer churn prediction service
//!
//! Loads the model artifact once at startup and serves the prediction form.
//! A missing or corrupt artifact stops the process before the listener binds.

use anyhow::{Context, Result};
use churn_predictor::{api, config::ServerConfig};
use predictor_lib::{
    health::HealthRegistry,
    load_classifier, InferenceAdapter, PredictorMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting churn-predictor");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        model_path = %config.model_path.display(),
        "Predictor configured"
    );

    let health_registry = HealthRegistry::new();

    let metrics = PredictorMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // Fatal on failure: no partial operation without a model
    let source = config.model_source()?;
    let classifier = match load_classifier(&source) {
        Ok(classifier) => classifier,
        Err(e) => {
            error!(error = %e, path = %source.path.display(), "Failed to load model artifact");
            return Err(e).context("Model artifact could not be loaded");
        }
    };

    logger.log_startup(APP_VERSION, classifier.version(), classifier.kind().as_str());

    let adapter = InferenceAdapter::new(classifier, logger.clone());
    health_registry
        .mark_model_loaded(adapter.model_version(), adapter.model_kind())
        .await;

    let app_state = Arc::new(api::AppState::new(
        health_registry,
        metrics,
        logger.clone(),
        adapter,
    )?);

    let server = tokio::spawn(api::serve(config.listen_addr(), app_state));

    tokio::select! {
        result = server => {
            result.context("HTTP server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
