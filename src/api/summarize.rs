use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::ai::SummaryProvider;
use crate::app::AppState;
use crate::config::QuotaCharge;
use crate::models::{Style, SummarizeRequest, SummarizeResponse};
use crate::services::{
    check_guest, guest_used_cookie, Caller, QuotaDecision, GUEST_DENIED_MESSAGE,
};

use super::error::ApiError;

const QUOTA_UNAVAILABLE: &str = "Quota service unavailable. Please try again later.";

pub async fn summarize_hosted(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| body_error(e, state.max_input_chars))?;
    let provider = state.hosted.clone();
    summarize_with(&state, provider, &headers, &body).await
}

pub async fn summarize_local(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| body_error(e, state.max_input_chars))?;
    let provider = state.local.clone();
    summarize_with(&state, provider, &headers, &body).await
}

/// Upper bound on the raw body for a given input allowance.
///
/// JSON can spend up to six bytes on one character (`\u0000`), plus room for the other fields.
pub fn body_limit(max_input_chars: usize) -> usize {
    max_input_chars.saturating_mul(6).saturating_add(64 * 1024)
}

fn too_long(max_input_chars: usize) -> ApiError {
    ApiError::bad_request(format!(
        "Input is too long ({} characters max).",
        max_input_chars
    ))
}

fn body_error(rejection: BytesRejection, max_input_chars: usize) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::info!("Request body over the size limit");
        too_long(max_input_chars)
    } else {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// A request that passed validation.
#[derive(Debug)]
struct ValidRequest {
    input: String,
    style: Style,
    model: String,
}

fn validate(
    body: &[u8],
    provider: &dyn SummaryProvider,
    max_input_chars: usize,
) -> Result<ValidRequest, ApiError> {
    let request: SummarizeRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;

    if request.input.trim().is_empty() {
        return Err(ApiError::bad_request("Please enter some text to summarize."));
    }
    if request.input.chars().count() > max_input_chars {
        return Err(too_long(max_input_chars));
    }

    let style: Style = request.style.parse().map_err(ApiError::bad_request)?;

    if !provider.supports_model(&request.model) {
        return Err(ApiError::bad_request(format!(
            "Unknown model for {}: {}",
            provider.kind().name(),
            request.model
        )));
    }

    Ok(ValidRequest {
        input: request.input,
        style,
        model: request.model,
    })
}

async fn summarize_with(
    state: &AppState,
    provider: Arc<dyn SummaryProvider>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let request = validate(body, provider.as_ref(), state.max_input_chars)?;

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let caller = state.identity.resolve(authorization).await;

    match &caller {
        Caller::Account(account_id) => {
            let admission = match state.quota_charge {
                QuotaCharge::OnAdmission => state.quota.check_and_consume(account_id).await,
                QuotaCharge::OnSuccess => state.quota.check(account_id).await,
            };
            match admission {
                Ok(QuotaDecision::Allowed) => {}
                Ok(QuotaDecision::Denied) => {
                    tracing::info!(account_id = %account_id, "Free limit reached");
                    return Err(ApiError::forbidden(state.quota.denial_message()));
                }
                Err(_) => return Err(ApiError::internal(QUOTA_UNAVAILABLE)),
            }
        }
        Caller::Guest => {
            if check_guest(headers) == QuotaDecision::Denied {
                tracing::info!("Guest allowance already used");
                return Err(ApiError::forbidden(GUEST_DENIED_MESSAGE));
            }
        }
    }

    tracing::info!(
        provider = provider.kind().name(),
        model = %request.model,
        style = request.style.as_str(),
        "Generating summary"
    );

    let summary = match provider
        .summarize(request.style, &request.input, &request.model)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("{} API error: {}", provider.kind().name(), e);
            return Err(ApiError::provider(&e, provider.kind()));
        }
    };

    match &caller {
        Caller::Account(account_id) if state.quota_charge == QuotaCharge::OnSuccess => {
            // The summary already exists; a lost race or ledger error only gets logged here.
            match state.quota.consume(account_id).await {
                Ok(QuotaDecision::Allowed) => {}
                Ok(QuotaDecision::Denied) => {
                    tracing::warn!(account_id = %account_id, "Limit reached by a concurrent request")
                }
                Err(e) => tracing::error!(account_id = %account_id, "Summary not charged: {}", e),
            }
        }
        Caller::Account(_) => {}
        Caller::Guest => {
            let mut response = Json(SummarizeResponse::new(summary)).into_response();
            response.headers_mut().insert(SET_COOKIE, guest_used_cookie());
            return Ok(response);
        }
    }

    Ok(Json(SummarizeResponse::new(summary)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ProviderError, ProviderKind};
    use async_trait::async_trait;

    struct FixedModels;

    #[async_trait]
    impl SummaryProvider for FixedModels {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Local
        }

        fn supports_model(&self, model: &str) -> bool {
            model == "llama3"
        }

        async fn summarize(
            &self,
            _style: Style,
            _input: &str,
            _model: &str,
        ) -> std::result::Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    fn check(body: &str) -> Result<ValidRequest, ApiError> {
        validate(body.as_bytes(), &FixedModels, 20)
    }

    #[test]
    fn accepts_well_formed_request() {
        let request = check(r#"{"input":"hello","style":"eli5","model":"llama3"}"#).unwrap();
        assert_eq!(request.input, "hello");
        assert_eq!(request.style, Style::Eli5);
        assert_eq!(request.model, "llama3");
    }

    #[test]
    fn rejects_unknown_style() {
        let err = check(r#"{"input":"hello","style":"haiku","model":"llama3"}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("haiku"));
    }

    #[test]
    fn rejects_model_outside_allow_list() {
        let err = check(r#"{"input":"hello","style":"tldr","model":"gpt-4"}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Unknown model for Ollama: gpt-4");
    }

    #[test]
    fn rejects_blank_or_missing_input() {
        assert!(check(r#"{"input":"   ","style":"tldr","model":"llama3"}"#).is_err());
        assert!(check(r#"{"style":"tldr","model":"llama3"}"#).is_err());
    }

    #[test]
    fn rejects_oversized_input() {
        let err = check(r#"{"input":"aaaaaaaaaaaaaaaaaaaaa","style":"tldr","model":"llama3"}"#)
            .unwrap_err();
        assert_eq!(err.message, "Input is too long (20 characters max).");
    }

    #[test]
    fn body_limit_leaves_room_for_escaped_input() {
        let escaped = format!(
            r#"{{"input":"{}","style":"tldr","model":"llama3"}}"#,
            "\\u00e9".repeat(20)
        );
        assert!(escaped.len() <= body_limit(20));
        assert!(check(&escaped).is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = check("{not json").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
