use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Style;

use super::prompts::local_prompt;
use super::provider::{status_error, ProviderError, ProviderKind, SummaryProvider};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Talks to an Ollama daemon's `/api/generate` endpoint.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    models: Vec<String>,
}

impl OllamaProvider {
    pub fn new(base_url: &str, models: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
        })
    }
}

#[async_trait]
impl SummaryProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn supports_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    async fn summarize(
        &self,
        style: Style,
        input: &str,
        model: &str,
    ) -> std::result::Result<String, ProviderError> {
        let request = GenerateRequest {
            model,
            prompt: local_prompt(style, input),
            stream: false,
        };

        tracing::debug!(model, style = style.as_str(), "calling Ollama");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let generated: GenerateResponse = response.json().await?;
        Ok(generated.response)
    }
}
