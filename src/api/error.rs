use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::ai::{ProviderError, ProviderKind};
use crate::models::SummarizeResponse;

pub const INTERNAL_FAILURE: &str = "Failed to generate summary. See server logs for details.";

/// A failed summarize call. Rendered in the same `{summary}` shape as a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn provider(err: &ProviderError, kind: ProviderKind) -> Self {
        Self::internal(err.user_message(kind))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(SummarizeResponse::new(self.message))).into_response()
    }
}

/// Last line of defence for a handler that panicked.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);
    ApiError::internal(INTERNAL_FAILURE).into_response()
}
