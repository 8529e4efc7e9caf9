use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::adapter::{build_step_request, build_submission_record, AdapterError};
use super::domain::{StepInput, StepName, WizardContext, WizardSession};
use super::gateway::{GatewayEndpoint, GatewayError, GatewayResponse, SubmissionGateway};
use super::quote::{LoanQuote, LoanRates};
use super::registry::{keys, FieldRegistry, StepDefinition, DEFAULT_TENURE_MONTHS};

/// Message shown in place of transport or protocol details.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred while saving your details, please try again";

/// Errors that keep the wizard on its current step.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("{step} is missing required fields: {}", .missing_fields.join(", "))]
    Validation {
        step: StepName,
        missing_fields: Vec<String>,
    },
    #[error("{step} was rejected: {message}")]
    Rejected { step: StepName, message: String },
    #[error("expected step {expected}, received {received}")]
    OutOfOrder {
        expected: StepName,
        received: StepName,
    },
    #[error("onboarding is already complete")]
    AlreadyComplete,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl WizardError {
    /// Text safe to show the applicant.
    pub fn user_message(&self) -> String {
        match self {
            WizardError::Gateway(_) | WizardError::Adapter(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            WizardError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WizardError::Validation { .. } | WizardError::Rejected { .. } | WizardError::Gateway(_)
        )
    }
}

/// Linear state machine that validates, submits and advances wizard steps.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    registry: Arc<FieldRegistry>,
    rates: LoanRates,
}

impl StepSequencer {
    pub fn new(registry: Arc<FieldRegistry>, rates: LoanRates) -> Self {
        Self { registry, rates }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn rates(&self) -> &LoanRates {
        &self.rates
    }

    pub fn start(&self) -> WizardSession {
        WizardSession::new(self.registry.initial_step())
    }

    /// Successor of `current` once `context` satisfies the step's gate.
    pub fn advance(
        &self,
        current: StepName,
        context: &WizardContext,
    ) -> Result<StepName, WizardError> {
        let next = self
            .registry
            .definition(current)
            .and_then(|definition| definition.next)
            .ok_or(WizardError::AlreadyComplete)?;

        let validation = self.registry.validate_step(current, context);
        if !validation.valid {
            return Err(WizardError::Validation {
                step: current,
                missing_fields: validation.missing_fields,
            });
        }

        Ok(next)
    }

    /// Validate, submit and advance the session by one step.
    ///
    /// The session is only touched when the gateway accepts the step, so every failure can be
    /// retried with corrected input.
    pub async fn complete_step<G>(
        &self,
        session: &mut WizardSession,
        step: StepName,
        input: StepInput,
        gateway: &G,
    ) -> Result<StepName, WizardError>
    where
        G: SubmissionGateway + ?Sized,
    {
        if session.is_complete() {
            return Err(WizardError::AlreadyComplete);
        }
        if step != session.current() {
            return Err(WizardError::OutOfOrder {
                expected: session.current(),
                received: step,
            });
        }

        let definition = self
            .registry
            .definition(step)
            .ok_or(WizardError::AlreadyComplete)?;
        let mut staged = session.context().clone();
        staged.merge(screen_input(definition, session.context(), input));
        if step == StepName::LoanDetails {
            staged.insert_default(keys::TENURE, DEFAULT_TENURE_MONTHS);
        }

        let next = self.advance(step, &staged)?;

        if step == StepName::LoanDetails {
            let quote = LoanQuote::from_inputs(
                staged.value(keys::AMOUNT).unwrap_or_default(),
                staged.value(keys::TENURE).unwrap_or_default(),
                &self.rates,
            );
            staged.set_loan_quote(quote);
        }

        let request = build_step_request(step, &self.registry, &staged)?;
        let endpoint = request.endpoint;

        let response = match gateway.submit(request).await {
            Ok(response) => response,
            Err(err) => {
                error!(%step, error = %err, "gateway call failed");
                return Err(WizardError::Gateway(err));
            }
        };

        if !response.success {
            let message = response
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| endpoint.failure_message().to_string());
            warn!(%step, %message, "gateway declined step");
            return Err(WizardError::Rejected { step, message });
        }

        capture_issued_values(endpoint, &response, &mut staged)?;

        session.commit(step, staged, next);
        info!(%step, %next, "wizard step completed");

        if next.is_terminal() {
            let record = build_submission_record(session.context());
            info!(
                reference = record.reference_number.as_deref().unwrap_or("unassigned"),
                "onboarding submission recorded"
            );
            session.finish(record);
        }

        Ok(next)
    }
}

/// Keep the fields `definition` collects. A blank never replaces a captured value.
fn screen_input(
    definition: &StepDefinition,
    committed: &WizardContext,
    input: StepInput,
) -> StepInput {
    input
        .into_iter()
        .filter(|(key, value)| {
            if !definition.field_keys().any(|field| field == key.as_str()) {
                debug!(step = %definition.name, field = %key, "ignoring field outside step");
                return false;
            }
            !value.trim().is_empty() || !committed.has_value(key)
        })
        .collect()
}

fn capture_issued_values(
    endpoint: GatewayEndpoint,
    response: &GatewayResponse,
    staged: &mut WizardContext,
) -> Result<(), WizardError> {
    match endpoint {
        GatewayEndpoint::Register => {
            let token = response.issued_value("token").ok_or_else(|| {
                error!("registration response did not carry a token");
                GatewayError::Malformed("registration response missing token".to_string())
            })?;
            staged.set_bearer_token(token);
            if let Some(phone) = staged.value(keys::PHONE).map(str::to_string) {
                staged.insert_default(keys::PHONE_NUMBER, phone);
            }
        }
        GatewayEndpoint::Signature => {
            let case_number = response.issued_value("caseNumber").ok_or_else(|| {
                error!("signature response did not carry a case number");
                GatewayError::Malformed("signature response missing caseNumber".to_string())
            })?;
            staged.set_case_number(case_number);
        }
        GatewayEndpoint::VerifyOtp
        | GatewayEndpoint::PersonalDetails
        | GatewayEndpoint::DocumentsUpload
        | GatewayEndpoint::LoanDetails => {}
    }
    Ok(())
}
