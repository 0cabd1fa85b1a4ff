//! Predict command: one customer record, one verdict

use crate::client::{ApiClient, PredictResponse};
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use predictor_lib::{
    load_classifier, Contract, Gender, InferenceAdapter, ModelKind, ModelSource,
    PaymentMethod, PredictionRequest, StructuredLogger, Verdict, YesNo,
};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

/// Customer record and inference target for `churn predict`
#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Customer gender (Male, Female)
    #[arg(long, default_value = "Male")]
    pub gender: Gender,

    /// Whether the customer has a partner (Yes, No)
    #[arg(long, default_value = "Yes")]
    pub partner: YesNo,

    /// Whether the customer has dependents (Yes, No)
    #[arg(long, default_value = "Yes")]
    pub dependents: YesNo,

    /// Months the customer has stayed with the company (0-72)
    #[arg(long, default_value_t = 12)]
    pub tenure: u32,

    /// Amount charged to the customer monthly (0-500)
    #[arg(long, default_value_t = 70.0)]
    pub monthly_charges: f64,

    /// Total amount charged to the customer (0-10000)
    #[arg(long, default_value_t = 3000.0)]
    pub total_charges: f64,

    /// Contract term (Month-to-month, One year, Two year)
    #[arg(long, default_value = "Month-to-month")]
    pub contract: Contract,

    /// Payment method (Electronic check, Mailed check, Bank transfer (automatic), Credit card (automatic))
    #[arg(long, default_value = "Electronic check")]
    pub payment_method: PaymentMethod,

    /// Run inference locally against this model artifact instead of the server
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Artifact format for --model (onnx, logistic); guessed from the extension if unset
    #[arg(long)]
    pub model_format: Option<ModelKind>,

    /// Expected SHA-256 of the --model artifact
    #[arg(long)]
    pub model_sha256: Option<String>,
}

impl PredictArgs {
    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest {
            gender: self.gender,
            partner: self.partner,
            dependents: self.dependents,
            tenure: self.tenure,
            monthly_charges: self.monthly_charges,
            total_charges: self.total_charges,
            contract: self.contract,
            payment_method: self.payment_method,
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn field_rows(request: &PredictionRequest) -> Vec<FieldRow> {
    vec![
        FieldRow { field: "gender", value: request.gender.to_string() },
        FieldRow { field: "Partner", value: request.partner.to_string() },
        FieldRow { field: "Dependents", value: request.dependents.to_string() },
        FieldRow { field: "tenure", value: request.tenure.to_string() },
        FieldRow { field: "MonthlyCharges", value: request.monthly_charges.to_string() },
        FieldRow { field: "TotalCharges", value: request.total_charges.to_string() },
        FieldRow { field: "Contract", value: request.contract.to_string() },
        FieldRow { field: "PaymentMethod", value: request.payment_method.to_string() },
    ]
}

#[derive(Serialize)]
struct PredictOutput<'a> {
    request: &'a PredictionRequest,
    #[serde(flatten)]
    result: &'a PredictResponse,
}

/// Run inference in-process against a model artifact
fn predict_local(
    path: PathBuf,
    format: Option<ModelKind>,
    sha256: Option<String>,
    request: &PredictionRequest,
) -> Result<PredictResponse> {
    let mut source = ModelSource::new(path);
    if let Some(format) = format {
        source = source.with_format(format);
    }
    if let Some(sha256) = sha256 {
        source = source.with_sha256(sha256);
    }

    let classifier = load_classifier(&source).context("Failed to load model")?;
    let adapter = InferenceAdapter::new(classifier, StructuredLogger::new("churn-cli"));
    let result = adapter.infer(request).context("Prediction failed")?;

    Ok(PredictResponse::from(&result))
}

/// Predict churn for one customer record
pub async fn predict(
    client: &ApiClient,
    args: PredictArgs,
    model: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let request = args.to_request();
    request.validate().context("Invalid customer record")?;

    let response = match model {
        Some(path) => {
            if verbose {
                output::print_info(&format!("Running local inference with {}", path.display()));
            }
            predict_local(path, args.model_format, args.model_sha256, &request)?
        }
        None => {
            if args.model_format.is_some() || args.model_sha256.is_some() {
                anyhow::bail!("--model-format and --model-sha256 need a local model (--model)");
            }
            if verbose {
                output::print_info("Submitting record to the prediction server");
            }
            client.predict(&request).await?
        }
    };

    match format {
        OutputFormat::Json => output::print_json(&PredictOutput {
            request: &request,
            result: &response,
        })?,
        OutputFormat::Table => {
            output::print_table(&field_rows(&request));
            println!();
            output::print_verdict(&verdict_of(&response));
            println!(
                "  {} {}",
                "Churn probability:".bold(),
                output::format_probability(response.probability)
            );
            println!("  {} {}", "Model:".bold(), response.model_version);
        }
    }

    Ok(())
}

fn verdict_of(response: &PredictResponse) -> Verdict {
    Verdict {
        label: response.verdict,
        percentage: response.percentage,
    }
}
