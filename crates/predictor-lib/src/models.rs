//! Core data models for churn prediction
//!
//! A [`PredictionRequest`] carries the eight customer attributes the model
//! was trained on. Every field is typed and bounded so that a request which
//! passes [`PredictionRequest::validate`] is always a valid model input.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tenure domain in months
pub const TENURE_RANGE: (u32, u32) = (0, 72);

/// Monthly charges domain
pub const MONTHLY_CHARGES_RANGE: (f64, f64) = (0.0, 500.0);

/// Total charges domain
pub const TOTAL_CHARGES_RANGE: (f64, f64) = (0.0, 10000.0);

/// Column names of the feature row, in the order the model artifact expects
pub const FEATURE_COLUMNS: [&str; 8] = [
    "gender",
    "Partner",
    "Dependents",
    "tenure",
    "MonthlyCharges",
    "TotalCharges",
    "Contract",
    "PaymentMethod",
];

/// Number of columns handed to the model
pub const NUM_FEATURES: usize = FEATURE_COLUMNS.len();

/// A closed set of category labels for one categorical column
pub trait Categorical: Copy + Sized + 'static {
    /// Wire name of the column
    const FIELD: &'static str;

    /// All categories in domain order; the position is the encoded value
    const ALL: &'static [Self];

    /// Exact category label
    fn label(&self) -> &'static str;

    /// Zero-based position within [`Categorical::ALL`]
    fn index(&self) -> usize;

    /// All labels in domain order
    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.label()).collect()
    }

    /// Parse an exact category label
    fn parse(value: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label() == value.trim())
            .ok_or_else(|| ValidationError::UnknownCategory {
                field: Self::FIELD,
                value: value.to_string(),
            })
    }
}

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Categorical for $name {
            const FIELD: &'static str = $field;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn index(&self) -> usize {
                Self::ALL.iter().position(|c| c == self).unwrap_or_default()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as Categorical>::parse(s)
            }
        }
    };
}

categorical!(
    /// Customer gender
    Gender, field = "gender" {
        Male => "Male",
        Female => "Female",
    }
);

categorical!(
    /// Yes/No answer used by the `Partner` and `Dependents` columns
    YesNo, field = "Partner/Dependents" {
        Yes => "Yes",
        No => "No",
    }
);

categorical!(
    /// Contract duration
    Contract, field = "Contract" {
        MonthToMonth => "Month-to-month",
        OneYear => "One year",
        TwoYear => "Two year",
    }
);

categorical!(
    /// How the customer pays
    PaymentMethod, field = "PaymentMethod" {
        ElectronicCheck => "Electronic check",
        MailedCheck => "Mailed check",
        BankTransfer => "Bank transfer (automatic)",
        CreditCard => "Credit card (automatic)",
    }
);

/// Category labels of a categorical feature column, `None` for numeric columns
pub fn category_labels(column: &str) -> Option<Vec<&'static str>> {
    match column {
        "gender" => Some(Gender::labels()),
        "Partner" | "Dependents" => Some(YesNo::labels()),
        "Contract" => Some(Contract::labels()),
        "PaymentMethod" => Some(PaymentMethod::labels()),
        _ => None,
    }
}

/// A single customer record submitted for churn prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub gender: Gender,
    #[serde(rename = "Partner")]
    pub partner: YesNo,
    #[serde(rename = "Dependents")]
    pub dependents: YesNo,
    pub tenure: u32,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
    #[serde(rename = "Contract")]
    pub contract: Contract,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: PaymentMethod,
}

impl Default for PredictionRequest {
    /// Initial values of the form controls
    fn default() -> Self {
        Self {
            gender: Gender::Male,
            partner: YesNo::Yes,
            dependents: YesNo::Yes,
            tenure: 12,
            monthly_charges: 70.0,
            total_charges: 3000.0,
            contract: Contract::MonthToMonth,
            payment_method: PaymentMethod::ElectronicCheck,
        }
    }
}

impl PredictionRequest {
    /// Check every numeric field against its domain
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range(
            "tenure",
            self.tenure as f64,
            TENURE_RANGE.0 as f64,
            TENURE_RANGE.1 as f64,
        )?;
        check_range(
            "MonthlyCharges",
            self.monthly_charges,
            MONTHLY_CHARGES_RANGE.0,
            MONTHLY_CHARGES_RANGE.1,
        )?;
        check_range(
            "TotalCharges",
            self.total_charges,
            TOTAL_CHARGES_RANGE.0,
            TOTAL_CHARGES_RANGE.1,
        )?;
        Ok(())
    }

    /// Encode the record as the row handed to the model artifact
    pub fn feature_row(&self) -> FeatureRow {
        FeatureRow([
            self.gender.index() as f64,
            self.partner.index() as f64,
            self.dependents.index() as f64,
            self.tenure as f64,
            self.monthly_charges,
            self.total_charges,
            self.contract.index() as f64,
            self.payment_method.index() as f64,
        ])
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// A numeric field as it arrives from an untrusted surface: JSON numbers,
/// or text from form fields and command lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    fn parse(&self, field: &'static str) -> Result<Option<f64>, ValidationError> {
        match self {
            NumberInput::Number(n) => Ok(Some(*n)),
            NumberInput::Text(s) if s.trim().is_empty() => Ok(None),
            NumberInput::Text(s) => {
                s.trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ValidationError::InvalidNumber {
                        field,
                        value: s.clone(),
                    })
            }
        }
    }
}

impl From<f64> for NumberInput {
    fn from(n: f64) -> Self {
        NumberInput::Number(n)
    }
}

/// The eight fields of a request before presence and domain checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequestDraft {
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(rename = "Partner", default)]
    pub partner: Option<String>,
    #[serde(rename = "Dependents", default)]
    pub dependents: Option<String>,
    #[serde(default)]
    pub tenure: Option<NumberInput>,
    #[serde(rename = "MonthlyCharges", default)]
    pub monthly_charges: Option<NumberInput>,
    #[serde(rename = "TotalCharges", default)]
    pub total_charges: Option<NumberInput>,
    #[serde(rename = "Contract", default)]
    pub contract: Option<String>,
    #[serde(rename = "PaymentMethod", default)]
    pub payment_method: Option<String>,
}

impl PredictionRequestDraft {
    /// Convert into a validated request, failing on the first absent field
    pub fn into_request(self) -> Result<PredictionRequest, ValidationError> {
        let gender = required_category::<Gender>("gender", self.gender.as_deref())?;
        let partner = required_category_named::<YesNo>("Partner", self.partner.as_deref())?;
        let dependents =
            required_category_named::<YesNo>("Dependents", self.dependents.as_deref())?;
        let tenure = required_number("tenure", self.tenure.as_ref())?;
        let monthly_charges = required_number("MonthlyCharges", self.monthly_charges.as_ref())?;
        let total_charges = required_number("TotalCharges", self.total_charges.as_ref())?;
        let contract = required_category::<Contract>("Contract", self.contract.as_deref())?;
        let payment_method =
            required_category::<PaymentMethod>("PaymentMethod", self.payment_method.as_deref())?;

        check_range(
            "tenure",
            tenure,
            TENURE_RANGE.0 as f64,
            TENURE_RANGE.1 as f64,
        )?;
        if tenure.fract() != 0.0 {
            return Err(ValidationError::InvalidNumber {
                field: "tenure",
                value: tenure.to_string(),
            });
        }

        let request = PredictionRequest {
            gender,
            partner,
            dependents,
            tenure: tenure as u32,
            monthly_charges,
            total_charges,
            contract,
            payment_method,
        };
        request.validate()?;
        Ok(request)
    }
}

impl From<&PredictionRequest> for PredictionRequestDraft {
    fn from(request: &PredictionRequest) -> Self {
        Self {
            gender: Some(request.gender.to_string()),
            partner: Some(request.partner.to_string()),
            dependents: Some(request.dependents.to_string()),
            tenure: Some(NumberInput::Number(request.tenure as f64)),
            monthly_charges: Some(NumberInput::Number(request.monthly_charges)),
            total_charges: Some(NumberInput::Number(request.total_charges)),
            contract: Some(request.contract.to_string()),
            payment_method: Some(request.payment_method.to_string()),
        }
    }
}

fn required_category<T: Categorical>(
    field: &'static str,
    value: Option<&str>,
) -> Result<T, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => T::parse(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Like [`required_category`] but reports `field` instead of the enum's
/// shared column name
fn required_category_named<T: Categorical>(
    field: &'static str,
    value: Option<&str>,
) -> Result<T, ValidationError> {
    required_category::<T>(field, value).map_err(|e| match e {
        ValidationError::UnknownCategory { value, .. } => {
            ValidationError::UnknownCategory { field, value }
        }
        other => other,
    })
}

fn required_number(
    field: &'static str,
    value: Option<&NumberInput>,
) -> Result<f64, ValidationError> {
    value
        .map(|v| v.parse(field))
        .transpose()?
        .flatten()
        .ok_or(ValidationError::MissingField(field))
}

/// Numeric encoding of a request in [`FEATURE_COLUMNS`] order.
///
/// Categorical columns carry the zero-based index of the category within
/// its domain order; numeric columns are passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow(pub [f64; NUM_FEATURES]);

impl FeatureRow {
    pub fn values(&self) -> &[f64; NUM_FEATURES] {
        &self.0
    }

    /// Value of a named column
    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.0[i])
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|v| *v as f32).collect()
    }
}

/// Binary class decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnLabel {
    /// Class 0
    Stay,
    /// Class 1
    Churn,
}

impl ChurnLabel {
    /// Map a model class id to a label
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(ChurnLabel::Stay),
            1 => Some(ChurnLabel::Churn),
            _ => None,
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            ChurnLabel::Stay => 0,
            ChurnLabel::Churn => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnLabel::Stay => "stay",
            ChurnLabel::Churn => "churn",
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: ChurnLabel,
    /// Probability of churn, in [0, 1]
    pub probability: f64,
    pub model_version: String,
}

impl PredictionResult {
    /// Churn probability as a whole percentage, ties rounded to even
    pub fn percentage(&self) -> u8 {
        crate::display::percentage(self.probability)
    }

    /// Full two-class vector `[p_stay, p_churn]`
    pub fn class_probabilities(&self) -> [f64; 2] {
        [1.0 - self.probability, self.probability]
    }
}
