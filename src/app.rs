use std::sync::Arc;

use crate::ai::{GroqProvider, OllamaProvider, SummaryProvider};
use crate::config::{Config, QuotaCharge};
use crate::db::{QuotaStore, Repository};
use crate::error::Result;
use crate::services::{IdentityResolver, QuotaLedger, SupabaseVerifier};

/// Everything a request handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityResolver,
    pub quota: QuotaLedger,
    pub hosted: Arc<dyn SummaryProvider>,
    pub local: Arc<dyn SummaryProvider>,
    pub quota_charge: QuotaCharge,
    pub max_input_chars: usize,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let repository: Arc<dyn QuotaStore> = Arc::new(Repository::new(&config.db_path).await?);

        let identity = match (&config.supabase_url, &config.supabase_anon_key) {
            (Some(url), Some(key)) => {
                IdentityResolver::new(Arc::new(SupabaseVerifier::new(url, key.clone())?))
            }
            _ => {
                tracing::warn!("No identity service configured, all callers are guests");
                IdentityResolver::disabled()
            }
        };

        if config.groq_api_key.is_none() {
            tracing::warn!("GROQ_API_KEY is not set, the Groq endpoint will refuse requests");
        }

        let hosted = GroqProvider::new(
            config.groq_api_key.clone(),
            &config.groq_base_url,
            config.provider_timeout(),
        )?;
        let local = OllamaProvider::new(
            &config.ollama_url,
            config.ollama_models.clone(),
            config.provider_timeout(),
        )?;

        Ok(Self {
            identity,
            quota: QuotaLedger::new(
                repository,
                config.free_summary_limit,
                config.quota_enforcement,
            ),
            hosted: Arc::new(hosted),
            local: Arc::new(local),
            quota_charge: config.quota_charge,
            max_input_chars: config.max_input_chars,
        })
    }
}
