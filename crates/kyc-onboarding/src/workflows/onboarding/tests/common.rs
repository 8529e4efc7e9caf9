use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::onboarding::domain::{SessionId, StepInput, StepName, WizardSession};
use crate::workflows::onboarding::gateway::{
    GatewayEndpoint, GatewayError, GatewayRequest, GatewayResponse, SubmissionGateway,
};
use crate::workflows::onboarding::registry::{keys, FieldRegistry};
use crate::workflows::onboarding::repository::{
    RepositoryError, SessionRecord, SessionRepository,
};
use crate::workflows::onboarding::sequencer::StepSequencer;
use crate::workflows::onboarding::{onboarding_router, LoanRates, OnboardingService};

pub(super) const TOKEN: &str = "tok-7781";
pub(super) const CASE_NUMBER: &str = "55012";

pub(super) fn input(pairs: &[(&str, &str)]) -> StepInput {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub(super) fn registration_input() -> StepInput {
    input(&[
        (keys::EMAIL, "chipo@example.com"),
        (keys::PHONE, "+260971234567"),
    ])
}

pub(super) fn otp_input() -> StepInput {
    input(&[(keys::OTP_CODE, "482913")])
}

pub(super) fn biodata_input() -> StepInput {
    input(&[
        (keys::FIRST_NAME, "Chipo"),
        (keys::LAST_NAME, "Banda"),
        (keys::DATE_OF_BIRTH, "1991-04-12"),
        (keys::ADDRESS, "Plot 14, Kabulonga Road"),
        (keys::OCCUPATION, "Teacher"),
        (keys::MONTHLY_INCOME, "8500"),
    ])
}

pub(super) fn documents_input() -> StepInput {
    input(&[
        (keys::ID_FRONT, "data:image/jpeg;base64,ZnJvbnQ="),
        (keys::ID_BACK, "data:image/jpeg;base64,YmFjaw=="),
        (keys::SELFIE, "c2VsZmll"),
    ])
}

pub(super) fn loan_input() -> StepInput {
    input(&[
        (keys::AMOUNT, "10000"),
        (keys::PURPOSE, "School fees"),
        (keys::TENURE, "12"),
    ])
}

pub(super) fn signature_input() -> StepInput {
    input(&[(keys::SIGNATURE_IMAGE, "data:image/png;base64,c2lnbmF0dXJl")])
}

/// Every submitting step paired with input that satisfies it.
pub(super) fn happy_path() -> Vec<(StepName, StepInput)> {
    vec![
        (StepName::Registration, registration_input()),
        (StepName::OtpVerification, otp_input()),
        (StepName::Biodata, biodata_input()),
        (StepName::DocumentUpload, documents_input()),
        (StepName::LoanDetails, loan_input()),
        (StepName::Signature, signature_input()),
    ]
}

pub(super) fn sequencer() -> StepSequencer {
    StepSequencer::new(Arc::new(FieldRegistry::standard()), LoanRates::standard())
}

/// Gateway double that records every request and answers from a script.
///
/// Unscripted calls succeed, issuing a token on registration and a case number on signature.
#[derive(Default, Clone)]
pub(super) struct ScriptedGateway {
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
    responses: Arc<Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>>,
}

impl ScriptedGateway {
    pub(super) fn push(&self, response: Result<GatewayResponse, GatewayError>) {
        self.responses
            .lock()
            .expect("gateway mutex poisoned")
            .push_back(response);
    }

    pub(super) fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn last_request(&self) -> GatewayRequest {
        self.requests()
            .pop()
            .expect("gateway received at least one request")
    }
}

#[async_trait]
impl SubmissionGateway for ScriptedGateway {
    async fn submit(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let endpoint = request.endpoint;
        self.requests
            .lock()
            .expect("gateway mutex poisoned")
            .push(request);

        let scripted = self
            .responses
            .lock()
            .expect("gateway mutex poisoned")
            .pop_front();

        match scripted {
            Some(response) => response,
            None => Ok(default_response(endpoint)),
        }
    }
}

fn default_response(endpoint: GatewayEndpoint) -> GatewayResponse {
    match endpoint {
        GatewayEndpoint::Register => GatewayResponse::accepted(json!({ "token": TOKEN })),
        GatewayEndpoint::Signature => {
            GatewayResponse::accepted(json!({ "data": { "caseNumber": CASE_NUMBER } }))
        }
        _ => GatewayResponse::accepted(json!({})),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.session_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.session_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.session_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: SessionRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    OnboardingService<MemoryRepository, ScriptedGateway>,
    Arc<MemoryRepository>,
    Arc<ScriptedGateway>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let gateway = Arc::new(ScriptedGateway::default());
    let service = OnboardingService::new(repository.clone(), gateway.clone());
    (service, repository, gateway)
}

/// Drive a session through every step before `stop`.
pub(super) async fn advance_until(
    sequencer: &StepSequencer,
    session: &mut WizardSession,
    gateway: &ScriptedGateway,
    stop: StepName,
) {
    for (step, input) in happy_path() {
        if step == stop {
            break;
        }
        sequencer
            .complete_step(session, step, input, gateway)
            .await
            .unwrap_or_else(|err| panic!("{step} should succeed: {err}"));
    }
}

pub(super) fn onboarding_router_with_service(
    service: OnboardingService<MemoryRepository, ScriptedGateway>,
) -> axum::Router {
    onboarding_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
