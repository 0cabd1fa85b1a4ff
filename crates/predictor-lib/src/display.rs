//! Verdict formatting and static help text shown alongside predictions

use crate::models::{ChurnLabel, PredictionResult};
use serde::Serialize;
use std::fmt;

/// Sidebar description of the application
pub const ABOUT_TEXT: &str =
    "This application predicts if a customer will leave the service (churn) or stay.";

/// Facts about the model shown under [`ABOUT_TEXT`]
pub const ABOUT_FACTS: &[(&str, &str)] = &[
    ("Model", "Logistic Regression"),
    ("Data", "Telecom customer dataset"),
];

/// Explanations shown under "What do these results mean?"
pub const RESULT_EXPLANATIONS: &[(&str, &str)] = &[
    ("Churn", "The customer is likely to leave the service soon."),
    ("Stay", "The customer is likely to continue using the service."),
    (
        "Probability",
        "The chance (0-100%) that the customer will churn.",
    ),
];

/// Help text for each input control, keyed by wire name
pub const FIELD_HELP: &[(&str, &str)] = &[
    ("gender", "Customer's gender"),
    ("Partner", "Does the customer have a partner?"),
    ("Dependents", "Has dependents (children, etc.)"),
    ("tenure", "Months as a customer"),
    ("MonthlyCharges", "Average monthly bill in INR"),
    ("TotalCharges", "Total billed amount in INR"),
    ("Contract", "Contract duration"),
    ("PaymentMethod", "How the customer pays"),
];

/// Look up the help text of an input control
pub fn field_help(field: &str) -> &'static str {
    FIELD_HELP
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, help)| *help)
        .unwrap_or("")
}

/// Round to the nearest integer, ties to the even neighbour
pub fn round_half_even(x: f64) -> f64 {
    x.round_ties_even()
}

/// Churn probability in [0, 1] as a whole percentage
pub fn percentage(probability: f64) -> u8 {
    round_half_even(probability.clamp(0.0, 1.0) * 100.0) as u8
}

/// What the user sees after a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub label: ChurnLabel,
    pub percentage: u8,
}

impl Verdict {
    pub fn headline(&self) -> String {
        match self.label {
            ChurnLabel::Churn => format!("Likely to churn (Probability: {}%)", self.percentage),
            ChurnLabel::Stay => format!("Likely to stay (Probability: {}%)", self.percentage),
        }
    }

    pub fn is_churn(&self) -> bool {
        self.label == ChurnLabel::Churn
    }
}

impl From<&PredictionResult> for Verdict {
    fn from(result: &PredictionResult) -> Self {
        Self {
            label: result.label,
            percentage: result.percentage(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.headline())
    }
}
