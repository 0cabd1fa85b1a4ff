//! HTML form and result page

use crate::api::{inference_error_status, AppState};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use minijinja::{context, Environment};
use predictor_lib::{
    display::{self, Verdict},
    models::{
        Categorical, Contract, Gender, NumberInput, PaymentMethod, YesNo, MONTHLY_CHARGES_RANGE,
        TENURE_RANGE, TOTAL_CHARGES_RANGE,
    },
    PredictionRequest, PredictionRequestDraft,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

const INDEX_TEMPLATE: &str = "index.html";

/// Build the template environment with the embedded page
pub fn templates() -> anyhow::Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
    Ok(env)
}

/// Values shown in the controls, keyed by field wire name
#[derive(Debug, Serialize)]
struct FormValues(HashMap<&'static str, String>);

impl FormValues {
    fn from_draft(draft: &PredictionRequestDraft) -> Self {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }
        fn number(value: &Option<NumberInput>) -> String {
            match value {
                Some(NumberInput::Number(n)) => n.to_string(),
                Some(NumberInput::Text(s)) => s.clone(),
                None => String::new(),
            }
        }

        let mut values = HashMap::new();
        values.insert("gender", text(&draft.gender));
        values.insert("Partner", text(&draft.partner));
        values.insert("Dependents", text(&draft.dependents));
        values.insert("tenure", number(&draft.tenure));
        values.insert("MonthlyCharges", number(&draft.monthly_charges));
        values.insert("TotalCharges", number(&draft.total_charges));
        values.insert("Contract", text(&draft.contract));
        values.insert("PaymentMethod", text(&draft.payment_method));
        Self(values)
    }
}

/// Verdict as rendered in the output region
#[derive(Debug, Serialize)]
struct VerdictView {
    label: &'static str,
    headline: String,
}

impl From<Verdict> for VerdictView {
    fn from(verdict: Verdict) -> Self {
        Self {
            label: verdict.label.as_str(),
            headline: verdict.headline(),
        }
    }
}

/// Render the page; the output region holds either a verdict or an error
fn render_page(
    state: &AppState,
    values: FormValues,
    verdict: Option<Verdict>,
    error_message: Option<String>,
) -> Result<String, minijinja::Error> {
    let help: HashMap<&str, &str> = display::FIELD_HELP.iter().copied().collect();

    let template = state.templates.get_template(INDEX_TEMPLATE)?;
    template.render(context! {
        about_text => display::ABOUT_TEXT,
        about_facts => display::ABOUT_FACTS,
        explanations => display::RESULT_EXPLANATIONS,
        model_version => state.adapter.model_version(),
        help => help,
        ranges => context! {
            tenure => TENURE_RANGE,
            MonthlyCharges => MONTHLY_CHARGES_RANGE,
            TotalCharges => TOTAL_CHARGES_RANGE,
        },
        options => context! {
            gender => Gender::labels(),
            yes_no => YesNo::labels(),
            contract => Contract::labels(),
            payment_method => PaymentMethod::labels(),
        },
        values => values,
        verdict => verdict.map(VerdictView::from),
        error => error_message,
    })
}

fn html_response(status: StatusCode, page: Result<String, minijinja::Error>) -> Response {
    match page {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render page");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Form with its initial values
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let values = FormValues::from_draft(&PredictionRequestDraft::from(&PredictionRequest::default()));
    html_response(StatusCode::OK, render_page(&state, values, None, None))
}

/// Form submission: one validated request, one inference call, one verdict
pub async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<PredictionRequestDraft>, FormRejection>,
) -> Response {
    let draft = match payload {
        Ok(Form(draft)) => draft,
        Err(rejection) => {
            let message = rejection.body_text();
            state.reject(&message);
            let values = FormValues::from_draft(&PredictionRequestDraft::default());
            let page = render_page(&state, values, None, Some(message));
            return html_response(StatusCode::UNPROCESSABLE_ENTITY, page);
        }
    };

    let values = FormValues::from_draft(&draft);

    let request = match state.accept(draft) {
        Ok(request) => request,
        Err(e) => {
            let page = render_page(&state, values, None, Some(e.to_string()));
            return html_response(StatusCode::UNPROCESSABLE_ENTITY, page);
        }
    };

    match state.predict(&request).await {
        Ok(result) => {
            let page = render_page(&state, values, Some(Verdict::from(&result)), None);
            html_response(StatusCode::OK, page)
        }
        Err(e) => {
            let page = render_page(
                &state,
                values,
                None,
                Some(format!("Prediction failed: {}", e)),
            );
            html_response(inference_error_status(&e), page)
        }
    }
}
