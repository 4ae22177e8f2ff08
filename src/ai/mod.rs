mod groq;
mod ollama;
mod prompts;
mod provider;

pub use groq::GroqProvider;
pub use ollama::OllamaProvider;
pub use prompts::{hosted_prompt, local_prompt, SYSTEM_PROMPT};
pub use provider::{ProviderError, ProviderKind, SummaryProvider, GENERIC_FAILURE};
