use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{SessionId, StepInput, StepName};
use super::gateway::SubmissionGateway;
use super::registry::DEFAULT_TENURE_MONTHS;
use super::repository::{RepositoryError, SessionRepository};
use super::sequencer::WizardError;
use super::service::{OnboardingService, OnboardingServiceError};

/// Router builder exposing HTTP endpoints for the onboarding wizard.
pub fn onboarding_router<R, G>(service: Arc<OnboardingService<R, G>>) -> Router
where
    R: SessionRepository + 'static,
    G: SubmissionGateway + 'static,
{
    Router::new()
        .route("/api/v1/onboarding/sessions", post(start_handler::<R, G>))
        .route(
            "/api/v1/onboarding/sessions/:session_id",
            get(status_handler::<R, G>),
        )
        .route(
            "/api/v1/onboarding/sessions/:session_id/steps/:step",
            post(step_handler::<R, G>),
        )
        .route("/api/v1/onboarding/quote", post(quote_handler::<R, G>))
        .with_state(service)
}

/// Field values submitted for a single step.
#[derive(Debug, Default, Deserialize)]
pub struct StepSubmission {
    #[serde(default)]
    pub fields: StepInput,
}

/// Loan terms as typed into the form; numbers or strings are accepted.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub amount: FormNumber,
    #[serde(default)]
    pub tenure: Option<FormNumber>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormNumber {
    Number(f64),
    Text(String),
}

impl FormNumber {
    fn as_input(&self) -> String {
        match self {
            FormNumber::Number(value) => value.to_string(),
            FormNumber::Text(value) => value.clone(),
        }
    }
}

pub(crate) async fn start_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
) -> Response
where
    R: SessionRepository + 'static,
    G: SubmissionGateway + 'static,
{
    match service.start() {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    G: SubmissionGateway + 'static,
{
    match service.get(&SessionId(session_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn step_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    Path((session_id, step)): Path<(String, String)>,
    axum::Json(submission): axum::Json<StepSubmission>,
) -> Response
where
    R: SessionRepository + 'static,
    G: SubmissionGateway + 'static,
{
    let step = match step.parse::<StepName>() {
        Ok(step) => step,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
        }
    };

    match service
        .complete_step(&SessionId(session_id), step, submission.fields)
        .await
    {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn quote_handler<R, G>(
    State(service): State<Arc<OnboardingService<R, G>>>,
    axum::Json(request): axum::Json<QuoteRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    G: SubmissionGateway + 'static,
{
    let amount = request.amount.as_input();
    let tenure = request
        .tenure
        .as_ref()
        .map(FormNumber::as_input)
        .unwrap_or_else(|| DEFAULT_TENURE_MONTHS.to_string());

    let quote = service.quote(&amount, &tenure);
    (StatusCode::OK, axum::Json(quote.view())).into_response()
}

/// HTTP status for a service failure.
pub(crate) fn status_for(err: &OnboardingServiceError) -> StatusCode {
    match err {
        OnboardingServiceError::Wizard(WizardError::Validation { .. })
        | OnboardingServiceError::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingServiceError::Wizard(
            WizardError::OutOfOrder { .. } | WizardError::AlreadyComplete,
        ) => StatusCode::CONFLICT,
        OnboardingServiceError::Wizard(WizardError::Rejected { .. } | WizardError::Gateway(_)) => {
            StatusCode::BAD_GATEWAY
        }
        OnboardingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        OnboardingServiceError::Wizard(WizardError::Adapter(_))
        | OnboardingServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: OnboardingServiceError) -> Response {
    let payload = match &err {
        OnboardingServiceError::Wizard(WizardError::Validation {
            step,
            missing_fields,
        }) => json!({
            "error": err.to_string(),
            "step": step.label(),
            "missing_fields": missing_fields,
        }),
        OnboardingServiceError::Wizard(wizard @ WizardError::Rejected { step, .. }) => json!({
            "error": wizard.user_message(),
            "step": step.label(),
            "retryable": true,
        }),
        OnboardingServiceError::Wizard(wizard @ WizardError::Gateway(_)) => json!({
            "error": wizard.user_message(),
            "retryable": true,
        }),
        OnboardingServiceError::Wizard(wizard) => json!({ "error": wizard.user_message() }),
        OnboardingServiceError::Repository(RepositoryError::NotFound) => {
            json!({ "error": "onboarding session not found" })
        }
        other => json!({ "error": other.to_string() }),
    };

    (status_for(&err), axum::Json(payload)).into_response()
}
