use crate::infra::{InMemorySessionRepository, SimulatedGateway};
use clap::Args;
use kyc_onboarding::error::AppError;
use kyc_onboarding::workflows::onboarding::{
    keys, CapturedDocument, DocumentKind, DocumentSource, LoanQuote, LoanQuoteView, LoanRates,
    OnboardingService, SessionRecord, StepInput, StepName, DEFAULT_TENURE_MONTHS,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Requested principal
    pub(crate) amount: String,
    /// Repayment period in months
    #[arg(long, default_value = DEFAULT_TENURE_MONTHS)]
    pub(crate) tenure: String,
    /// Emit the quote as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Loan amount requested by the sample applicant
    #[arg(long, default_value = "10000")]
    pub(crate) amount: String,
    /// Repayment period in months
    #[arg(long, default_value = "12")]
    pub(crate) tenure: String,
    /// Upload these files as the ID front, ID back and selfie instead of placeholder images
    #[arg(long, num_args = 3, value_names = ["ID_FRONT", "ID_BACK", "SELFIE"])]
    pub(crate) documents: Option<Vec<PathBuf>>,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let view = LoanQuote::from_inputs(&args.amount, &args.tenure, &LoanRates::standard()).view();

    if args.json {
        let rendered = serde_json::to_string_pretty(&view).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_quote(&view);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        amount,
        tenure,
        documents,
    } = args;

    let repository = Arc::new(InMemorySessionRepository::default());
    let gateway = Arc::new(SimulatedGateway::new());
    let service = OnboardingService::new(repository, gateway);

    println!("KYC onboarding demo (simulated backend, captured values redacted)");
    let record = service.start()?;
    let id = record.session_id.clone();
    println!("- Session {} opened at {}", id.0, record.wizard.current());

    // A blank submission shows the local validation gate without touching the backend.
    if let Err(err) = service
        .complete_step(&id, StepName::Registration, StepInput::new())
        .await
    {
        println!("  Empty registration refused: {err}");
    }

    let steps = [
        (
            StepName::Registration,
            step_input(&[
                (keys::EMAIL, "demo.applicant@example.com"),
                (keys::PHONE, "+260970000001"),
            ]),
        ),
        (StepName::OtpVerification, step_input(&[(keys::OTP_CODE, "123456")])),
        (
            StepName::Biodata,
            step_input(&[
                (keys::FIRST_NAME, "Demo"),
                (keys::LAST_NAME, "Applicant"),
                (keys::DATE_OF_BIRTH, "1990-01-01"),
                (keys::ADDRESS, "1 Independence Avenue"),
                (keys::OCCUPATION, "Engineer"),
                (keys::MONTHLY_INCOME, "15000"),
            ]),
        ),
    ];
    for (step, input) in steps {
        let record = service.complete_step(&id, step, input).await?;
        print_progress(step, &record);
    }

    let captures = match documents {
        Some(paths) => DocumentKind::ALL
            .into_iter()
            .zip(paths)
            .map(|(kind, path)| CapturedDocument::new(kind, DocumentSource::File(path)))
            .collect(),
        None => placeholder_documents(),
    };
    let record = service.submit_documents(&id, captures).await?;
    print_progress(StepName::DocumentUpload, &record);

    let loan = step_input(&[
        (keys::AMOUNT, amount.as_str()),
        (keys::PURPOSE, "Working capital"),
        (keys::TENURE, tenure.as_str()),
    ]);
    let record = service.complete_step(&id, StepName::LoanDetails, loan).await?;
    print_progress(StepName::LoanDetails, &record);
    if let Some(view) = record.status_view().loan_quote {
        render_quote(&view);
    }

    let signature = step_input(&[(keys::SIGNATURE_IMAGE, "iVBORw0KGgoAAAANSUhEUg==")]);
    let record = service
        .complete_step(&id, StepName::Signature, signature)
        .await?;
    print_progress(StepName::Signature, &record);

    let status = record.status_view();
    println!(
        "\nApplication submitted. Reference number: {}",
        status.reference_number.as_deref().unwrap_or("pending")
    );
    if let Some(submission) = record.wizard.record() {
        println!(
            "  {} fields captured, documents: {:?}",
            submission.fields.len(),
            submission.documents
        );
    }

    Ok(())
}

fn step_input(pairs: &[(&str, &str)]) -> StepInput {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn placeholder_documents() -> Vec<CapturedDocument> {
    [
        (DocumentKind::IdFront, "id-front.jpg"),
        (DocumentKind::IdBack, "id-back.jpg"),
        (DocumentKind::Selfie, "selfie.png"),
    ]
    .into_iter()
    .map(|(kind, file_name)| {
        CapturedDocument::new(
            kind,
            DocumentSource::Bytes {
                file_name: Some(file_name.to_string()),
                bytes: file_name.as_bytes().to_vec(),
            },
        )
    })
    .collect()
}

fn print_progress(step: StepName, record: &SessionRecord) {
    println!("- {} accepted -> next: {}", step, record.wizard.current());
}

fn render_quote(view: &LoanQuoteView) {
    println!("Loan quote");
    println!("  Amount:             {}", view.amount);
    println!("  Tenure (months):    {}", view.tenure_months);
    println!("  Interest rate:      {:.0}%", view.interest_rate * 100.0);
    println!("  Arrangement fee:    {}", view.arrangement_fee);
    println!("  Processing fee:     {}", view.processing_fee);
    println!("  Insurance fee:      {}", view.insurance_fee);
    println!("  Total fees:         {}", view.total_fees);
    println!("  Disbursable amount: {}", view.disbursable);
    println!("  Total interest:     {}", view.total_interest);
    println!("  Monthly repayment:  {}", view.monthly_repayment);
}
