//! End-to-end scenarios for the onboarding wizard.
//!
//! Everything is driven through the public service facade and HTTP router with an in-memory
//! repository and a recording gateway, so the whole applicant journey is exercised without
//! reaching into private modules.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use kyc_onboarding::workflows::onboarding::{
        GatewayEndpoint, GatewayError, GatewayRequest, GatewayResponse, OnboardingService,
        RepositoryError, SessionId, SessionRecord, SessionRepository, SubmissionGateway,
    };

    #[derive(Default, Clone)]
    pub struct InMemorySessions {
        records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
    }

    impl SessionRepository for InMemorySessions {
        fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            if guard.contains_key(&record.session_id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(record.session_id.clone(), record.clone());
            Ok(record)
        }

        fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            guard.insert(record.session_id.clone(), record);
            Ok(())
        }

        fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard.get(id).cloned())
        }
    }

    /// Backend double that declines the first OTP it sees.
    #[derive(Default, Clone)]
    pub struct RecordingGateway {
        requests: Arc<Mutex<Vec<GatewayRequest>>>,
    }

    impl RecordingGateway {
        pub fn requests(&self) -> Vec<GatewayRequest> {
            self.requests.lock().expect("gateway mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl SubmissionGateway for RecordingGateway {
        async fn submit(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
            let endpoint = request.endpoint;
            let mut requests = self.requests.lock().expect("gateway mutex poisoned");
            let otp_attempts = requests
                .iter()
                .filter(|previous| previous.endpoint == GatewayEndpoint::VerifyOtp)
                .count();
            requests.push(request);

            let response = match endpoint {
                GatewayEndpoint::Register => {
                    GatewayResponse::accepted(json!({ "data": { "token": "bearer-1" } }))
                }
                GatewayEndpoint::VerifyOtp if otp_attempts == 0 => {
                    GatewayResponse::rejected("The code you entered has expired")
                }
                GatewayEndpoint::Signature => {
                    GatewayResponse::accepted(json!({ "caseNumber": 90817 }))
                }
                _ => GatewayResponse::accepted(json!({})),
            };
            Ok(response)
        }
    }

    pub fn build_service() -> (
        Arc<OnboardingService<InMemorySessions, RecordingGateway>>,
        RecordingGateway,
    ) {
        let gateway = RecordingGateway::default();
        let service = OnboardingService::new(
            Arc::new(InMemorySessions::default()),
            Arc::new(gateway.clone()),
        );
        (Arc::new(service), gateway)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use kyc_onboarding::workflows::onboarding::{
    keys, onboarding_router, CapturedDocument, DocumentKind, DocumentSource, GatewayEndpoint,
    OnboardingServiceError, StepName, WizardError,
};

use common::build_service;

fn fields(pairs: &[(&str, &str)]) -> Value {
    let map: serde_json::Map<String, Value> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();
    json!({ "fields": map })
}

async fn post(router: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json payload"))
}

#[tokio::test]
async fn applicant_completes_the_wizard_over_http() {
    let (service, gateway) = build_service();
    let router = onboarding_router(service);

    let (status, session) = post(&router, "/api/v1/onboarding/sessions", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["session_id"].as_str().expect("session id").to_string();
    let step = |name: &str| format!("/api/v1/onboarding/sessions/{session_id}/steps/{name}");

    let (status, _) = post(
        &router,
        &step("registration"),
        fields(&[(keys::EMAIL, "mwila@example.com"), (keys::PHONE, "0977000111")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, payload) = post(
        &router,
        &step("otp-verification"),
        fields(&[(keys::OTP_CODE, "111111")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(payload["error"], "The code you entered has expired");

    let (status, payload) = post(
        &router,
        &step("otp-verification"),
        fields(&[(keys::OTP_CODE, "222222")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["current_step"], "biodata");

    let (status, payload) = post(
        &router,
        &step("biodata"),
        fields(&[
            (keys::FIRST_NAME, "Mwila"),
            (keys::LAST_NAME, "Phiri"),
            (keys::DATE_OF_BIRTH, "1988-02-29"),
            (keys::ADDRESS, "House 3, Libala"),
            (keys::MONTHLY_INCOME, "12000"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{payload}");

    let (status, payload) = post(
        &router,
        &step("document-upload"),
        fields(&[
            (keys::ID_FRONT, "data:image/jpeg;base64,AA=="),
            (keys::ID_BACK, "data:image/jpeg;base64,AQ=="),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["missing_fields"], json!(["selfie"]));

    let (status, _) = post(
        &router,
        &step("document-upload"),
        fields(&[
            (keys::ID_FRONT, "data:image/jpeg;base64,AA=="),
            (keys::ID_BACK, "data:image/jpeg;base64,AQ=="),
            (keys::SELFIE, "data:image/jpeg;base64,Ag=="),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, payload) = post(
        &router,
        &step("loan-details"),
        fields(&[
            (keys::AMOUNT, "10000"),
            (keys::PURPOSE, "Solar installation"),
            (keys::TENURE, "12"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["loan_quote"]["disbursable"], "8900.00");

    let (status, payload) = post(
        &router,
        &step("signature"),
        fields(&[(keys::SIGNATURE_IMAGE, "data:image/png;base64,AA==")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["current_step"], "confirmation");
    assert_eq!(payload["complete"], true);
    assert_eq!(payload["reference_number"], "KYC-90817");

    let (status, _) = post(&router, &step("confirmation"), json!({ "fields": {} })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let requests = gateway.requests();
    let biodata = requests
        .iter()
        .find(|request| request.endpoint == GatewayEndpoint::PersonalDetails)
        .expect("biodata submitted");
    assert_eq!(biodata.field(keys::PHONE_NUMBER), Some("0977000111"));
    assert!(requests
        .iter()
        .skip(1)
        .all(|request| request.bearer.as_deref() == Some("bearer-1")));
}

#[tokio::test]
async fn service_facade_uploads_captured_documents() {
    let (service, gateway) = build_service();
    let record = service.start().expect("session starts");
    let id = record.session_id.clone();

    let steps = [
        (
            StepName::Registration,
            vec![(keys::EMAIL, "mwila@example.com"), (keys::PHONE, "0977000111")],
        ),
        (StepName::OtpVerification, vec![(keys::OTP_CODE, "000000")]),
    ];
    for (step, pairs) in steps {
        let input = pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let _ = service.complete_step(&id, step, input).await;
    }

    let retry = [(keys::OTP_CODE.to_string(), "123456".to_string())]
        .into_iter()
        .collect();
    service
        .complete_step(&id, StepName::OtpVerification, retry)
        .await
        .expect("second code accepted");

    let biodata = [
        (keys::FIRST_NAME, "Mwila"),
        (keys::LAST_NAME, "Phiri"),
        (keys::DATE_OF_BIRTH, "1988-02-29"),
        (keys::ADDRESS, "House 3, Libala"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();
    service
        .complete_step(&id, StepName::Biodata, biodata)
        .await
        .expect("biodata accepted");

    let missing_selfie = vec![CapturedDocument::new(
        DocumentKind::IdFront,
        DocumentSource::Bytes {
            file_name: Some("front.jpg".to_string()),
            bytes: vec![0xff, 0xd8, 0xff],
        },
    )];
    match service.submit_documents(&id, missing_selfie).await {
        Err(OnboardingServiceError::Wizard(WizardError::Validation { missing_fields, .. })) => {
            assert_eq!(missing_fields, vec!["idBack", "selfie"]);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    let captures = [DocumentKind::IdFront, DocumentKind::IdBack, DocumentKind::Selfie]
        .into_iter()
        .map(|kind| {
            CapturedDocument::new(
                kind,
                DocumentSource::Bytes {
                    file_name: Some(format!("{}.jpg", kind.field_key())),
                    bytes: vec![0xff, 0xd8, 0xff],
                },
            )
        })
        .collect();
    let updated = service
        .submit_documents(&id, captures)
        .await
        .expect("documents accepted");

    assert_eq!(updated.wizard.current(), StepName::LoanDetails);
    let upload = gateway
        .requests()
        .into_iter()
        .rev()
        .find(|request| request.endpoint == GatewayEndpoint::DocumentsUpload)
        .expect("upload submitted");
    assert_eq!(upload.field(keys::SELFIE), Some("data:image/jpeg;base64,/9j/"));
    assert_eq!(upload.field(keys::BANK_STATEMENT), Some(""));
    assert_eq!(upload.field(keys::EMAIL), Some("mwila@example.com"));
}
