use async_trait::async_trait;
use thiserror::Error;

use crate::models::Style;

pub const GENERIC_FAILURE: &str = "Failed to generate summary.";

/// Which backend a provider talks to. Drives the user-facing error wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Groq chat completions.
    Hosted,
    /// A local Ollama daemon.
    Local,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Hosted => "Groq",
            ProviderKind::Local => "Ollama",
        }
    }

    fn connect_message(&self) -> &'static str {
        match self {
            ProviderKind::Hosted => "Error connecting to Groq API. Is it reachable?",
            ProviderKind::Local => "Error connecting to Ollama API. Is it running?",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Message placed in the `summary` field of a 500 response.
    pub fn user_message(&self, kind: ProviderKind) -> String {
        match self {
            ProviderError::Connect(_) => kind.connect_message().to_string(),
            ProviderError::Status { status, body } => {
                format!("{} API error: {} {}", kind.name(), status, body)
            }
            ProviderError::NotConfigured(msg) => msg.to_string(),
            ProviderError::Other(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ProviderError::Connect(e.to_string())
        } else {
            ProviderError::Other(e.to_string())
        }
    }
}

/// A model-serving backend that turns a styled prompt into a summary.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether `model` is on this provider's allow-list.
    fn supports_model(&self, model: &str) -> bool;

    async fn summarize(
        &self,
        style: Style,
        input: &str,
        model: &str,
    ) -> std::result::Result<String, ProviderError>;
}

/// Read the body of a failed response, keeping the status when the body itself is unreadable.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Status { status, body }
}
