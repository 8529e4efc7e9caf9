use serde::Serialize;

use super::domain::{StepName, WizardContext};

/// Field identifiers shared by the registry, sequencer and gateway adapter.
pub mod keys {
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const OTP_CODE: &str = "otpCode";

    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const MIDDLE_NAME: &str = "middleName";
    pub const GENDER: &str = "gender";
    pub const CITIZEN_ID: &str = "citizenId";
    pub const TITLE: &str = "title";
    pub const DATE_OF_BIRTH: &str = "dateOfBirth";
    pub const PHONE_NUMBER: &str = "phoneNumber";
    pub const ADDRESS: &str = "address";
    pub const DISTRICT: &str = "district";
    pub const PROVINCE: &str = "province";
    pub const COUNTRY: &str = "country";
    pub const MARITAL_STATUS: &str = "maritalStatus";
    pub const ZIP_CODE: &str = "zipCode";
    pub const OCCUPATION: &str = "occupation";
    pub const EMPLOYER: &str = "employer";
    pub const EMPLOYEE_NUMBER: &str = "employeeNumber";
    pub const EMPLOYER_NUMBER: &str = "employerNumber";
    pub const EMPLOYER_ADDRESS: &str = "employerAddress";
    pub const EMPLOYEE_START_DATE: &str = "employeeStartDate";
    pub const EMPLOYER_EMAIL: &str = "employerEmail";
    pub const MONTHLY_INCOME: &str = "monthlyIncome";
    pub const BANK_NAME: &str = "bankName";
    pub const BRANCH_NAME: &str = "branchName";
    pub const BRANCH_CODE: &str = "branchCode";
    pub const ACCOUNT_NUMBER: &str = "accountNumber";
    pub const ACCOUNT_TYPE: &str = "accountType";

    pub const ID_FRONT: &str = "idFront";
    pub const ID_BACK: &str = "idBack";
    pub const SELFIE: &str = "selfie";
    pub const BANK_STATEMENT: &str = "bankStatement";
    pub const PAYSLIP: &str = "payslip";

    pub const AMOUNT: &str = "amount";
    pub const PURPOSE: &str = "purpose";
    pub const TENURE: &str = "tenure";

    pub const SIGNATURE_IMAGE: &str = "signatureImage";
}

pub const DEFAULT_TENURE_MONTHS: &str = "24";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirement {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub requirement: FieldRequirement,
}

impl FieldSpec {
    const fn required(key: &'static str) -> Self {
        Self {
            key,
            requirement: FieldRequirement::Required,
        }
    }

    const fn optional(key: &'static str) -> Self {
        Self {
            key,
            requirement: FieldRequirement::Optional,
        }
    }
}

/// Locally computed check returning the fields still blocking progression.
pub type ReadinessCheck = fn(&WizardContext) -> Vec<&'static str>;

/// How a step decides whether the applicant may move on.
#[derive(Debug, Clone, Copy)]
pub enum StepGate {
    RequiredFields,
    Readiness(ReadinessCheck),
    Terminal,
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub name: StepName,
    pub fields: Vec<FieldSpec>,
    pub gate: StepGate,
    pub next: Option<StepName>,
}

impl StepDefinition {
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|field| field.requirement == FieldRequirement::Required)
            .map(|field| field.key)
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.key)
    }

    pub fn missing_fields(&self, context: &WizardContext) -> Vec<&'static str> {
        match self.gate {
            StepGate::RequiredFields => self
                .required_fields()
                .filter(|key| !context.has_value(key))
                .collect(),
            StepGate::Readiness(check) => check(context),
            StepGate::Terminal => Vec::new(),
        }
    }
}

/// Outcome of checking a step against the captured context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepValidation {
    pub valid: bool,
    pub missing_fields: Vec<String>,
}

impl StepValidation {
    fn from_missing(missing: Vec<&'static str>) -> Self {
        Self {
            valid: missing.is_empty(),
            missing_fields: missing.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Ordered catalogue of wizard steps and the fields each one collects.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    steps: Vec<StepDefinition>,
}

impl FieldRegistry {
    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn initial_step(&self) -> StepName {
        self.steps
            .first()
            .map(|definition| definition.name)
            .unwrap_or(StepName::Registration)
    }

    pub fn definition(&self, step: StepName) -> Option<&StepDefinition> {
        self.steps.iter().find(|definition| definition.name == step)
    }

    pub fn validate_step(&self, step: StepName, context: &WizardContext) -> StepValidation {
        match self.definition(step) {
            Some(definition) => StepValidation::from_missing(definition.missing_fields(context)),
            None => StepValidation {
                valid: false,
                missing_fields: Vec::new(),
            },
        }
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn missing_from(context: &WizardContext, keys: &[&'static str]) -> Vec<&'static str> {
    keys.iter()
        .copied()
        .filter(|key| !context.has_value(key))
        .collect()
}

// Bank statement and payslip are collected when offered but never block the upload.
fn documents_ready(context: &WizardContext) -> Vec<&'static str> {
    missing_from(context, &[keys::ID_FRONT, keys::ID_BACK, keys::SELFIE])
}

fn loan_terms_ready(context: &WizardContext) -> Vec<&'static str> {
    missing_from(context, &[keys::AMOUNT, keys::PURPOSE, keys::MONTHLY_INCOME])
}

fn standard_steps() -> Vec<StepDefinition> {
    use keys::*;

    vec![
        StepDefinition {
            name: StepName::Registration,
            fields: vec![FieldSpec::required(EMAIL), FieldSpec::required(PHONE)],
            gate: StepGate::RequiredFields,
            next: Some(StepName::OtpVerification),
        },
        StepDefinition {
            name: StepName::OtpVerification,
            fields: vec![FieldSpec::required(OTP_CODE), FieldSpec::required(EMAIL)],
            gate: StepGate::RequiredFields,
            next: Some(StepName::Biodata),
        },
        StepDefinition {
            name: StepName::Biodata,
            fields: vec![
                FieldSpec::required(FIRST_NAME),
                FieldSpec::required(LAST_NAME),
                FieldSpec::optional(MIDDLE_NAME),
                FieldSpec::optional(GENDER),
                FieldSpec::optional(CITIZEN_ID),
                FieldSpec::optional(TITLE),
                FieldSpec::required(DATE_OF_BIRTH),
                FieldSpec::required(PHONE_NUMBER),
                FieldSpec::optional(EMAIL),
                FieldSpec::required(ADDRESS),
                FieldSpec::optional(DISTRICT),
                FieldSpec::optional(PROVINCE),
                FieldSpec::optional(COUNTRY),
                FieldSpec::optional(MARITAL_STATUS),
                FieldSpec::optional(ZIP_CODE),
                FieldSpec::optional(OCCUPATION),
                FieldSpec::optional(EMPLOYER),
                FieldSpec::optional(EMPLOYEE_NUMBER),
                FieldSpec::optional(EMPLOYER_NUMBER),
                FieldSpec::optional(EMPLOYER_ADDRESS),
                FieldSpec::optional(EMPLOYEE_START_DATE),
                FieldSpec::optional(EMPLOYER_EMAIL),
                FieldSpec::optional(MONTHLY_INCOME),
                FieldSpec::optional(BANK_NAME),
                FieldSpec::optional(BRANCH_NAME),
                FieldSpec::optional(BRANCH_CODE),
                FieldSpec::optional(ACCOUNT_NUMBER),
                FieldSpec::optional(ACCOUNT_TYPE),
            ],
            gate: StepGate::RequiredFields,
            next: Some(StepName::DocumentUpload),
        },
        StepDefinition {
            name: StepName::DocumentUpload,
            fields: vec![
                FieldSpec::required(ID_FRONT),
                FieldSpec::required(ID_BACK),
                FieldSpec::required(SELFIE),
                FieldSpec::optional(BANK_STATEMENT),
                FieldSpec::optional(PAYSLIP),
            ],
            gate: StepGate::Readiness(documents_ready),
            next: Some(StepName::LoanDetails),
        },
        StepDefinition {
            name: StepName::LoanDetails,
            fields: vec![
                FieldSpec::required(AMOUNT),
                FieldSpec::required(PURPOSE),
                FieldSpec::optional(TENURE),
                FieldSpec::required(MONTHLY_INCOME),
            ],
            gate: StepGate::Readiness(loan_terms_ready),
            next: Some(StepName::Signature),
        },
        StepDefinition {
            name: StepName::Signature,
            fields: vec![FieldSpec::required(SIGNATURE_IMAGE)],
            gate: StepGate::RequiredFields,
            next: Some(StepName::Confirmation),
        },
        StepDefinition {
            name: StepName::Confirmation,
            fields: Vec::new(),
            gate: StepGate::Terminal,
            next: None,
        },
    ]
}
