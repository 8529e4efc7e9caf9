//! Customer onboarding wizard for loan applicants.
//!
//! An applicant registers, verifies a one-time code, fills in biodata, uploads identity
//! documents, requests a loan, and signs. Each step is validated locally against the field
//! registry before its payload is sent to the KYC backend through a [`SubmissionGateway`];
//! the session only moves forward once the backend accepts the step.

pub mod adapter;
pub mod documents;
pub mod domain;
pub mod gateway;
pub mod quote;
pub mod registry;
pub mod repository;
pub mod router;
pub mod sequencer;
pub mod service;

#[cfg(test)]
mod tests;

pub use adapter::{
    build_step_request, build_submission_record, AdapterError, SubmissionRecord, OTP_WIRE_FIELD,
};
pub use documents::{
    encode_document, encode_documents, CapturedDocument, DocumentError, DocumentKind,
    DocumentSource,
};
pub use domain::{SessionId, StepInput, StepName, UnknownStep, WizardContext, WizardSession};
pub use gateway::{
    GatewayEndpoint, GatewayError, GatewayRequest, GatewayResponse, SubmissionGateway,
};
pub use quote::{calculate_summary, LoanQuote, LoanQuoteView, LoanRates};
pub use registry::{
    keys, FieldRegistry, FieldRequirement, FieldSpec, StepDefinition, StepGate, StepValidation,
    DEFAULT_TENURE_MONTHS,
};
pub use repository::{RepositoryError, SessionRecord, SessionRepository, SessionStatusView};
pub use router::onboarding_router;
pub use sequencer::{StepSequencer, WizardError, GENERIC_FAILURE_MESSAGE};
pub use service::{OnboardingService, OnboardingServiceError};
