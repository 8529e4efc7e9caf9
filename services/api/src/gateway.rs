use async_trait::async_trait;
use kyc_onboarding::config::GatewayConfig;
use kyc_onboarding::workflows::onboarding::{
    GatewayError, GatewayRequest, GatewayResponse, SubmissionGateway,
};
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Gateway posting each step to the KYC backend as a multipart form.
#[derive(Debug, Clone)]
pub(crate) struct HttpSubmissionGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpSubmissionGateway {
    pub(crate) fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SubmissionGateway for HttpSubmissionGateway {
    async fn submit(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let GatewayRequest {
            endpoint,
            fields,
            bearer,
        } = request;
        let url = self.config.endpoint(endpoint.path());

        let form = fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        let mut builder = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .multipart(form);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        debug!(%url, "submitting step to gateway");
        let response = builder
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        interpret_response(status, &body)
    }
}

/// Translate a raw backend reply into the gateway envelope.
///
/// Successful statuses without a `success` flag count as accepted. Other statuses become a
/// declined response carrying the backend's message, except 401 which is a credential failure.
pub(crate) fn interpret_response(
    status: StatusCode,
    body: &str,
) -> Result<GatewayResponse, GatewayError> {
    let parsed = if body.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Some(value),
            Err(err) if status.is_success() => {
                return Err(GatewayError::Malformed(format!("response is not JSON: {err}")));
            }
            Err(_) => None,
        }
    };

    let message = parsed.as_ref().and_then(|value| {
        value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthorized(
            message.unwrap_or_else(|| status.to_string()),
        ));
    }

    if !status.is_success() {
        warn!(%status, "gateway answered with an error status");
        return Ok(GatewayResponse {
            success: false,
            message,
            data: parsed,
        });
    }

    let success = match parsed.as_ref().and_then(|value| value.get("success")) {
        None => true,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(GatewayError::Malformed(format!(
                "unexpected success flag {other}"
            )))
        }
    };

    Ok(GatewayResponse {
        success,
        message,
        data: parsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_flag_is_accepted() {
        let response = interpret_response(StatusCode::OK, r#"{"token":"abc"}"#)
            .expect("parsable response");

        assert!(response.success);
        assert_eq!(response.issued_value("token").as_deref(), Some("abc"));
    }

    #[test]
    fn explicit_failure_flag_is_respected() {
        let response = interpret_response(
            StatusCode::OK,
            r#"{"success":false,"message":"Invalid OTP"}"#,
        )
        .expect("parsable response");

        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Invalid OTP"));
    }

    #[test]
    fn error_status_becomes_declined_response() {
        let response = interpret_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"Email already registered"}"#,
        )
        .expect("declined response");

        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Email already registered"));

        let response = interpret_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>")
            .expect("declined response");
        assert!(!response.success);
        assert!(response.message.is_none());
    }

    #[test]
    fn unauthorized_is_a_credential_error() {
        let err = interpret_response(StatusCode::UNAUTHORIZED, r#"{"message":"expired"}"#)
            .expect_err("credential failure");

        assert!(matches!(err, GatewayError::Unauthorized(message) if message == "expired"));
    }

    #[test]
    fn non_json_success_is_malformed() {
        let err = interpret_response(StatusCode::OK, "ok").expect_err("not json");

        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[test]
    fn empty_success_body_is_accepted() {
        let response = interpret_response(StatusCode::NO_CONTENT, "").expect("empty body");

        assert!(response.success);
        assert!(response.data.is_none());
    }
}
