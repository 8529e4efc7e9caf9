use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::documents::{normalize_inline, DocumentKind};
use super::domain::{StepName, WizardContext};
use super::gateway::{GatewayEndpoint, GatewayRequest};
use super::quote::{format_currency, LoanQuoteView};
use super::registry::{keys, FieldRegistry};

/// Multipart part the verification endpoint reads the one-time code from.
pub const OTP_WIRE_FIELD: &str = "otp_code";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("{0} does not submit to the gateway")]
    NoSubmission(StepName),
    #[error("loan quote has not been computed")]
    MissingLoanQuote,
}

/// Final flattened view of a completed wizard, ready for hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub reference_number: Option<String>,
    pub case_number: Option<String>,
    pub fields: BTreeMap<String, String>,
    pub documents: Vec<DocumentKind>,
    pub loan: Option<LoanQuoteView>,
}

/// Build the gateway payload for `step` from the accumulated context.
pub fn build_step_request(
    step: StepName,
    registry: &FieldRegistry,
    context: &WizardContext,
) -> Result<GatewayRequest, AdapterError> {
    let endpoint = GatewayEndpoint::for_step(step).ok_or(AdapterError::NoSubmission(step))?;

    let fields = match step {
        StepName::Registration => pick(context, &[keys::EMAIL, keys::PHONE]),
        StepName::OtpVerification => {
            let mut fields = pick(context, &[keys::EMAIL]);
            fields.insert(OTP_WIRE_FIELD.to_string(), text(context, keys::OTP_CODE));
            fields
        }
        StepName::Biodata => {
            let field_keys: Vec<&str> = registry
                .definition(step)
                .map(|definition| definition.field_keys().collect())
                .unwrap_or_default();
            pick(context, &field_keys)
        }
        StepName::DocumentUpload => {
            let mut fields: BTreeMap<String, String> = DocumentKind::ALL
                .into_iter()
                .map(|kind| {
                    let key = kind.field_key();
                    let value = context.value(key).map(normalize_inline).unwrap_or_default();
                    (key.to_string(), value)
                })
                .collect();
            fields.insert(keys::EMAIL.to_string(), text(context, keys::EMAIL));
            fields
        }
        StepName::LoanDetails => loan_fields(context)?,
        StepName::Signature => pick(context, &[keys::SIGNATURE_IMAGE, keys::EMAIL]),
        StepName::Confirmation => return Err(AdapterError::NoSubmission(step)),
    };

    Ok(GatewayRequest {
        endpoint,
        fields,
        bearer: context.bearer_token().map(str::to_string),
    })
}

/// Flatten the context into the record handed off once the wizard completes.
pub fn build_submission_record(context: &WizardContext) -> SubmissionRecord {
    let mut fields: BTreeMap<String, String> = context
        .fields()
        .iter()
        // The one-time code is spent once verified.
        .filter(|(key, _)| key.as_str() != keys::OTP_CODE)
        .map(|(key, value)| (key.clone(), value.trim().to_string()))
        .collect();

    let loan = context.loan_quote().map(|quote| quote.view());
    if let Some(view) = &loan {
        fields.insert("arrangementFee".to_string(), view.arrangement_fee.clone());
        fields.insert("processingFee".to_string(), view.processing_fee.clone());
        fields.insert("insuranceFee".to_string(), view.insurance_fee.clone());
        fields.insert("totalFees".to_string(), view.total_fees.clone());
        fields.insert("disbursable".to_string(), view.disbursable.clone());
        fields.insert("totalInterest".to_string(), view.total_interest.clone());
        fields.insert("monthlyRepayment".to_string(), view.monthly_repayment.clone());
    }

    let documents = DocumentKind::ALL
        .into_iter()
        .filter(|kind| context.has_value(kind.field_key()))
        .collect();

    SubmissionRecord {
        reference_number: context.reference_number(),
        case_number: context.case_number().map(str::to_string),
        fields,
        documents,
        loan,
    }
}

fn loan_fields(context: &WizardContext) -> Result<BTreeMap<String, String>, AdapterError> {
    let quote = context.loan_quote().ok_or(AdapterError::MissingLoanQuote)?;

    let mut fields = BTreeMap::new();
    fields.insert(keys::AMOUNT.to_string(), format_currency(quote.amount));
    fields.insert(keys::PURPOSE.to_string(), text(context, keys::PURPOSE));
    fields.insert("interestRate".to_string(), quote.interest_rate.to_string());
    fields.insert(keys::TENURE.to_string(), quote.tenure_months.to_string());
    fields.insert("arrangementFee".to_string(), format_currency(quote.arrangement_fee));
    fields.insert("processingFee".to_string(), format_currency(quote.processing_fee));
    fields.insert("insuranceFee".to_string(), format_currency(quote.insurance_fee));
    fields.insert("totalInterestFee".to_string(), format_currency(quote.total_interest));
    Ok(fields)
}

// Absent values are sent as empty strings so the backend always sees the full field set.
fn pick(context: &WizardContext, field_keys: &[&str]) -> BTreeMap<String, String> {
    field_keys
        .iter()
        .map(|key| (key.to_string(), text(context, key)))
        .collect()
}

fn text(context: &WizardContext, key: &str) -> String {
    context.value(key).unwrap_or_default().to_string()
}
