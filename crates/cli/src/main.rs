//! Customer Churn Predictor CLI
//!
//! A command-line tool for scoring customer records, either against a
//! running prediction server or locally against a model artifact.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, status};

/// Customer Churn Predictor CLI
#[derive(Parser)]
#[command(name = "churn")]
#[command(author, version, about = "CLI for Customer Churn Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CHURN_API_URL env var)
    #[arg(long, env = "CHURN_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict whether a customer will churn
    Predict(predict::PredictArgs),

    /// Show the model loaded by the server
    Model,

    /// Show server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format)?;
    let api_url = config.resolve_api_url(cli.api_url);

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict(args) => {
            let model = config.resolve_model_path(args.model.clone());
            predict::predict(&client, args, model, format, cli.verbose).await?;
        }
        Commands::Model => {
            status::show_model(&client, format).await?;
        }
        Commands::Health => {
            status::show_health(&client, format).await?;
        }
    }

    Ok(())
}
