use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::StepName;

/// Backend operation invoked when a step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEndpoint {
    Register,
    VerifyOtp,
    PersonalDetails,
    DocumentsUpload,
    LoanDetails,
    Signature,
}

impl GatewayEndpoint {
    pub const fn path(self) -> &'static str {
        match self {
            GatewayEndpoint::Register => "/api/register",
            GatewayEndpoint::VerifyOtp => "/api/verifyOtp",
            GatewayEndpoint::PersonalDetails => "/api/personalDetails",
            GatewayEndpoint::DocumentsUpload => "/api/documentsUpload",
            GatewayEndpoint::LoanDetails => "/api/loanDetails",
            GatewayEndpoint::Signature => "/api/signature",
        }
    }

    pub const fn for_step(step: StepName) -> Option<Self> {
        match step {
            StepName::Registration => Some(GatewayEndpoint::Register),
            StepName::OtpVerification => Some(GatewayEndpoint::VerifyOtp),
            StepName::Biodata => Some(GatewayEndpoint::PersonalDetails),
            StepName::DocumentUpload => Some(GatewayEndpoint::DocumentsUpload),
            StepName::LoanDetails => Some(GatewayEndpoint::LoanDetails),
            StepName::Signature => Some(GatewayEndpoint::Signature),
            StepName::Confirmation => None,
        }
    }

    /// Message shown when the backend declines without explaining why.
    pub const fn failure_message(self) -> &'static str {
        match self {
            GatewayEndpoint::Register => "Registration failed",
            GatewayEndpoint::VerifyOtp => "OTP verification failed",
            GatewayEndpoint::PersonalDetails => "Saving personal details failed",
            GatewayEndpoint::DocumentsUpload => "Saving documents failed",
            GatewayEndpoint::LoanDetails => "Saving loan details failed",
            GatewayEndpoint::Signature => "Signature saving failed",
        }
    }
}

/// Flat payload handed to the external gateway for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayRequest {
    pub endpoint: GatewayEndpoint,
    pub fields: BTreeMap<String, String>,
    #[serde(skip_serializing)]
    pub bearer: Option<String>,
}

impl GatewayRequest {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Envelope returned by every gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl GatewayResponse {
    pub fn accepted(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Look up a value the backend issued, either at `data.key` or nested at `data.data.key`.
    pub fn issued_value(&self, key: &str) -> Option<String> {
        let data = self.data.as_ref()?;
        let value = data
            .get(key)
            .or_else(|| data.get("data").and_then(|nested| nested.get(key)))?;

        match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

/// External collaborator that transmits step payloads to the KYC backend.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}

/// Failure to obtain a usable response from the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transport failure: {0}")]
    Transport(String),
    #[error("gateway rejected credentials: {0}")]
    Unauthorized(String),
    #[error("gateway returned a malformed response: {0}")]
    Malformed(String),
}
