use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::adapter::SubmissionRecord;
use super::quote::LoanQuote;

/// Identifier wrapper for onboarding sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Raw field values captured by a single wizard screen.
pub type StepInput = BTreeMap<String, String>;

/// Named wizard steps in the order an applicant visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepName {
    Registration,
    OtpVerification,
    Biodata,
    DocumentUpload,
    LoanDetails,
    Signature,
    Confirmation,
}

impl StepName {
    pub const ALL: [StepName; 7] = [
        StepName::Registration,
        StepName::OtpVerification,
        StepName::Biodata,
        StepName::DocumentUpload,
        StepName::LoanDetails,
        StepName::Signature,
        StepName::Confirmation,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            StepName::Registration => "registration",
            StepName::OtpVerification => "otp-verification",
            StepName::Biodata => "biodata",
            StepName::DocumentUpload => "document-upload",
            StepName::LoanDetails => "loan-details",
            StepName::Signature => "signature",
            StepName::Confirmation => "confirmation",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, StepName::Confirmation)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StepName {
    type Err = UnknownStep;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        StepName::ALL
            .into_iter()
            .find(|step| step.label() == normalized)
            .ok_or_else(|| UnknownStep(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wizard step '{0}'")]
pub struct UnknownStep(pub String);

/// Accumulated applicant state threaded through every step transition.
///
/// Keys are never removed and captured values are never blanked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardContext {
    fields: BTreeMap<String, String>,
    bearer_token: Option<String>,
    case_number: Option<String>,
    loan_quote: Option<LoanQuote>,
}

impl WizardContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value exactly as captured.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Trimmed value; blank strings read as absent.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    pub fn merge<I, K, V>(&mut self, input: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in input {
            self.fields.insert(key.into(), value.into());
        }
    }

    /// Fill `key` only when it has no usable value yet.
    pub fn insert_default(&mut self, key: &str, value: impl Into<String>) {
        if !self.has_value(key) {
            self.fields.insert(key.to_string(), value.into());
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub(crate) fn set_bearer_token(&mut self, token: String) {
        self.bearer_token = Some(token);
    }

    pub fn case_number(&self) -> Option<&str> {
        self.case_number.as_deref()
    }

    pub(crate) fn set_case_number(&mut self, case_number: String) {
        self.case_number = Some(case_number);
    }

    pub fn loan_quote(&self) -> Option<&LoanQuote> {
        self.loan_quote.as_ref()
    }

    pub(crate) fn set_loan_quote(&mut self, quote: LoanQuote) {
        self.loan_quote = Some(quote);
    }

    pub fn reference_number(&self) -> Option<String> {
        self.case_number
            .as_deref()
            .map(|case_number| format!("KYC-{case_number}"))
    }
}

/// State of one applicant's pass through the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    current: StepName,
    context: WizardContext,
    completed: Vec<StepName>,
    record: Option<SubmissionRecord>,
}

impl WizardSession {
    pub fn new(initial: StepName) -> Self {
        Self {
            current: initial,
            context: WizardContext::new(),
            completed: Vec::new(),
            record: None,
        }
    }

    pub fn current(&self) -> StepName {
        self.current
    }

    pub fn context(&self) -> &WizardContext {
        &self.context
    }

    pub fn completed(&self) -> &[StepName] {
        &self.completed
    }

    pub fn record(&self) -> Option<&SubmissionRecord> {
        self.record.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_terminal()
    }

    pub(crate) fn commit(&mut self, step: StepName, context: WizardContext, next: StepName) {
        self.context = context;
        if !self.completed.contains(&step) {
            self.completed.push(step);
        }
        self.current = next;
    }

    pub(crate) fn finish(&mut self, record: SubmissionRecord) {
        self.record = Some(record);
    }
}
