//! Server status commands

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use predictor_lib::{ComponentHealth, ComponentStatus, HealthResponse};
use tabled::Tabled;

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

fn component_rows(health: &HealthResponse) -> Vec<ComponentRow> {
    let mut components: Vec<(&String, &ComponentHealth)> = health.components.iter().collect();
    components.sort_by(|a, b| a.0.cmp(b.0));

    components
        .into_iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: output::color_status(component.status),
            message: component.message.clone().unwrap_or_else(|| "-".to_string()),
            last_check: output::format_timestamp(component.last_check_timestamp),
        })
        .collect()
}

/// Show the model the server has loaded
pub async fn show_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.model_info().await?;

    match format {
        OutputFormat::Json => output::print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Loaded Model".bold());
            println!("  {} {}", "Version:".bold(), info.version);
            println!("  {} {}", "Kind:".bold(), info.kind);
        }
    }

    Ok(())
}

/// Show server health per component
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => output::print_json(&health)?,
        OutputFormat::Table => {
            let overall = format!("Server is {}", output::color_status(health.status));
            match health.status {
                ComponentStatus::Healthy => output::print_success(&overall),
                ComponentStatus::Degraded => output::print_warning(&overall),
                ComponentStatus::Unhealthy => output::print_error(&overall),
            }
            println!();
            output::print_table(&component_rows(&health));
        }
    }

    Ok(())
}
