use async_trait::async_trait;
use kyc_onboarding::workflows::onboarding::{
    GatewayEndpoint, GatewayError, GatewayRequest, GatewayResponse, RepositoryError, SessionId,
    SessionRecord, SessionRepository, SubmissionGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SessionRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.session_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.session_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.session_id) {
            guard.insert(record.session_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }
}

/// In-process stand-in for the KYC backend.
///
/// Accepts every step, issuing a credential at registration and a case number at signature.
#[derive(Debug)]
pub(crate) struct SimulatedGateway {
    issued: AtomicU64,
}

impl SimulatedGateway {
    pub(crate) fn new() -> Self {
        Self {
            issued: AtomicU64::new(41_000),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionGateway for SimulatedGateway {
    async fn submit(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let serial = self.issued.fetch_add(1, Ordering::Relaxed);
        info!(
            endpoint = request.endpoint.path(),
            fields = request.fields.len(),
            "simulated gateway accepted step"
        );

        let response = match request.endpoint {
            GatewayEndpoint::Register => {
                GatewayResponse::accepted(json!({ "token": format!("sim-{serial:x}") }))
            }
            GatewayEndpoint::Signature => {
                GatewayResponse::accepted(json!({ "data": { "caseNumber": serial.to_string() } }))
            }
            GatewayEndpoint::VerifyOtp
            | GatewayEndpoint::PersonalDetails
            | GatewayEndpoint::DocumentsUpload
            | GatewayEndpoint::LoanDetails => GatewayResponse::accepted(json!({})),
        };
        Ok(response)
    }
}
