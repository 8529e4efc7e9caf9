use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use super::documents::{documents_input, encode_documents, CapturedDocument, DocumentError};
use super::domain::{SessionId, StepInput, StepName};
use super::gateway::SubmissionGateway;
use super::quote::{LoanQuote, LoanRates};
use super::registry::FieldRegistry;
use super::repository::{RepositoryError, SessionRecord, SessionRepository};
use super::sequencer::{StepSequencer, WizardError};

/// Service composing the step sequencer, session repository, and submission gateway.
///
/// Step completions for the same session run one at a time within a service instance.
/// Instances sharing a repository do not coordinate.
pub struct OnboardingService<R, G> {
    sequencer: StepSequencer,
    repository: Arc<R>,
    gateway: Arc<G>,
    in_flight: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("kyc-{id:06}"))
}

impl<R, G> OnboardingService<R, G>
where
    R: SessionRepository + 'static,
    G: SubmissionGateway + 'static,
{
    pub fn new(repository: Arc<R>, gateway: Arc<G>) -> Self {
        Self::with_rates(repository, gateway, LoanRates::standard())
    }

    pub fn with_rates(repository: Arc<R>, gateway: Arc<G>, rates: LoanRates) -> Self {
        let registry = Arc::new(FieldRegistry::standard());
        Self {
            sequencer: StepSequencer::new(registry, rates),
            repository,
            gateway,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &FieldRegistry {
        self.sequencer.registry()
    }

    /// Open a fresh session positioned at the first step.
    pub fn start(&self) -> Result<SessionRecord, OnboardingServiceError> {
        let now = Utc::now();
        let record = SessionRecord {
            session_id: next_session_id(),
            started_at: now,
            updated_at: now,
            wizard: self.sequencer.start(),
        };

        let stored = self.repository.insert(record)?;
        info!(session = %stored.session_id.0, "onboarding session started");
        Ok(stored)
    }

    /// Complete `step` for a session, persisting the new state only on success.
    pub async fn complete_step(
        &self,
        session_id: &SessionId,
        step: StepName,
        input: StepInput,
    ) -> Result<SessionRecord, OnboardingServiceError> {
        let slot = self.session_slot(session_id);
        let _turn = slot.lock().await;

        // Fetched under the lock so a racing request sees the step already advanced.
        let Some(mut record) = self.repository.fetch(session_id)? else {
            self.release_slot(session_id);
            return Err(RepositoryError::NotFound.into());
        };

        self.sequencer
            .complete_step(&mut record.wizard, step, input, self.gateway.as_ref())
            .await?;

        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;
        if record.wizard.is_complete() {
            self.release_slot(session_id);
        }
        Ok(record)
    }

    /// Encode captured documents concurrently, then complete the upload step.
    pub async fn submit_documents(
        &self,
        session_id: &SessionId,
        documents: Vec<CapturedDocument>,
    ) -> Result<SessionRecord, OnboardingServiceError> {
        let encoded = encode_documents(documents).await?;
        self.complete_step(session_id, StepName::DocumentUpload, documents_input(encoded))
            .await
    }

    /// Fetch a session for API responses.
    pub fn get(&self, session_id: &SessionId) -> Result<SessionRecord, OnboardingServiceError> {
        let record = self
            .repository
            .fetch(session_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn session_slot(&self, session_id: &SessionId) -> Arc<AsyncMutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.entry(session_id.clone()).or_default().clone()
    }

    fn release_slot(&self, session_id: &SessionId) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.remove(session_id);
    }

    /// Stand-alone quote for raw form input.
    pub fn quote(&self, amount: &str, tenure: &str) -> LoanQuote {
        LoanQuote::from_inputs(amount, tenure, self.sequencer.rates())
    }
}

/// Error raised by the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingServiceError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}
