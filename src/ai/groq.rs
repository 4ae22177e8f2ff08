use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Style;

use super::prompts::{hosted_prompt, SYSTEM_PROMPT};
use super::provider::{status_error, ProviderError, ProviderKind, SummaryProvider, GENERIC_FAILURE};

/// Aliases offered to callers, mapped to Groq model ids.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("llama3", "llama-3.1-8b-instant"),
    ("gemma2", "gemma2-9b-it"),
];

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct GroqProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GroqProvider {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn resolve_model(alias: &str) -> Option<&'static str> {
        MODEL_ALIASES
            .iter()
            .find(|(name, _)| *name == alias)
            .map(|(_, id)| *id)
    }
}

#[async_trait]
impl SummaryProvider for GroqProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Hosted
    }

    fn supports_model(&self, model: &str) -> bool {
        Self::resolve_model(model).is_some()
    }

    async fn summarize(
        &self,
        style: Style,
        input: &str,
        model: &str,
    ) -> std::result::Result<String, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::NotConfigured("Groq API key is not configured."));
        };
        let model_id = Self::resolve_model(model)
            .ok_or_else(|| ProviderError::Other(format!("unsupported model alias: {}", model)))?;

        let request = ChatRequest {
            model: model_id.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: hosted_prompt(style, input),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let chat_response: ChatResponse = response.json().await?;

        let summary = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());

        Ok(summary)
    }
}
