use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{SessionId, WizardSession};
use super::quote::LoanQuoteView;

/// Repository record tracking one applicant's wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub wizard: WizardSession,
}

impl SessionRecord {
    pub fn status_view(&self) -> SessionStatusView {
        let context = self.wizard.context();
        SessionStatusView {
            session_id: self.session_id.clone(),
            current_step: self.wizard.current().label(),
            completed_steps: self
                .wizard
                .completed()
                .iter()
                .map(|step| step.label())
                .collect(),
            complete: self.wizard.is_complete(),
            reference_number: context.reference_number(),
            loan_quote: context.loan_quote().map(|quote| quote.view()),
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized session progress exposed to clients. Captured field values are never echoed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusView {
    pub session_id: SessionId,
    pub current_step: &'static str,
    pub completed_steps: Vec<&'static str>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_quote: Option<LoanQuoteView>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
