use crate::workflows::onboarding::domain::{StepName, WizardContext};
use crate::workflows::onboarding::registry::{keys, FieldRegistry, StepGate};

use super::common::*;

fn context_with(pairs: &[(&str, &str)]) -> WizardContext {
    let mut context = WizardContext::new();
    context.merge(input(pairs));
    context
}

#[test]
fn steps_follow_the_wizard_order() {
    let registry = FieldRegistry::standard();
    let order: Vec<StepName> = registry.steps().iter().map(|step| step.name).collect();

    assert_eq!(order, StepName::ALL.to_vec());
    assert_eq!(registry.initial_step(), StepName::Registration);

    for pair in registry.steps().windows(2) {
        assert_eq!(pair[0].next, Some(pair[1].name));
    }
    let last = registry.steps().last().expect("registry has steps");
    assert!(last.next.is_none());
    assert!(matches!(last.gate, StepGate::Terminal));
}

#[test]
fn registration_requires_email_and_phone() {
    let registry = FieldRegistry::standard();
    let context = context_with(&[(keys::EMAIL, "chipo@example.com")]);

    let validation = registry.validate_step(StepName::Registration, &context);

    assert!(!validation.valid);
    assert_eq!(validation.missing_fields, vec![keys::PHONE.to_string()]);
}

#[test]
fn whitespace_only_values_count_as_absent() {
    let registry = FieldRegistry::standard();
    let context = context_with(&[(keys::EMAIL, "   "), (keys::PHONE, "\t")]);

    let validation = registry.validate_step(StepName::Registration, &context);

    assert_eq!(
        validation.missing_fields,
        vec![keys::EMAIL.to_string(), keys::PHONE.to_string()]
    );
}

#[test]
fn biodata_ignores_optional_fields() {
    let registry = FieldRegistry::standard();
    let context = context_with(&[
        (keys::FIRST_NAME, "Chipo"),
        (keys::LAST_NAME, "Banda"),
        (keys::DATE_OF_BIRTH, "1991-04-12"),
        (keys::PHONE_NUMBER, "+260971234567"),
        (keys::ADDRESS, "Plot 14"),
    ]);

    assert!(registry.validate_step(StepName::Biodata, &context).valid);
}

#[test]
fn document_readiness_needs_identity_images_only() {
    let registry = FieldRegistry::standard();
    let partial = context_with(&[(keys::ID_FRONT, "data:image/jpeg;base64,AA==")]);

    let validation = registry.validate_step(StepName::DocumentUpload, &partial);
    assert_eq!(
        validation.missing_fields,
        vec![keys::ID_BACK.to_string(), keys::SELFIE.to_string()]
    );

    let ready = context_with(&[
        (keys::ID_FRONT, "data:image/jpeg;base64,AA=="),
        (keys::ID_BACK, "data:image/jpeg;base64,AA=="),
        (keys::SELFIE, "data:image/jpeg;base64,AA=="),
    ]);
    assert!(registry.validate_step(StepName::DocumentUpload, &ready).valid);
}

#[test]
fn loan_readiness_requires_income_captured_earlier() {
    let registry = FieldRegistry::standard();
    let context = context_with(&[(keys::AMOUNT, "5000"), (keys::PURPOSE, "Stock")]);

    let validation = registry.validate_step(StepName::LoanDetails, &context);

    assert_eq!(
        validation.missing_fields,
        vec![keys::MONTHLY_INCOME.to_string()]
    );
}

#[test]
fn loan_readiness_accepts_income_from_the_loan_screen() {
    let registry = FieldRegistry::standard();
    let context = context_with(&[
        (keys::AMOUNT, "5000"),
        (keys::PURPOSE, "Stock"),
        (keys::MONTHLY_INCOME, "9000"),
    ]);

    assert!(registry.validate_step(StepName::LoanDetails, &context).valid);

    let blank_income = context_with(&[
        (keys::AMOUNT, "5000"),
        (keys::PURPOSE, "Stock"),
        (keys::MONTHLY_INCOME, "  "),
    ]);
    assert_eq!(
        registry
            .validate_step(StepName::LoanDetails, &blank_income)
            .missing_fields,
        vec![keys::MONTHLY_INCOME.to_string()]
    );
}

#[test]
fn confirmation_is_always_valid() {
    let registry = FieldRegistry::standard();

    assert!(
        registry
            .validate_step(StepName::Confirmation, &WizardContext::new())
            .valid
    );
}

#[test]
fn step_names_parse_from_labels() {
    assert_eq!(
        "loan-details".parse::<StepName>().expect("known step"),
        StepName::LoanDetails
    );
    assert_eq!(
        " OTP-Verification ".parse::<StepName>().expect("known step"),
        StepName::OtpVerification
    );
    assert!("payment".parse::<StepName>().is_err());
}
