use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Who is asking for a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Account(String),
    Guest,
}

/// Checks a bearer token with an external identity service.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the account id the token belongs to.
    async fn verify(&self, token: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
}

/// Supabase Auth `GET /auth/v1/user`.
pub struct SupabaseVerifier {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseVerifier {
    pub fn new(base_url: &str, anon_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseVerifier {
    async fn verify(&self, token: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Identity(format!("{}: {}", status, error_text)));
        }

        let user: SupabaseUser = response.json().await?;
        if user.id.is_empty() {
            return Err(AppError::Identity("empty user id".to_string()));
        }
        Ok(user.id)
    }
}

/// Pull the token out of an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Turns an optional `Authorization` header into a [`Caller`]. Never fails.
#[derive(Clone, Default)]
pub struct IdentityResolver {
    verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            verifier: Some(verifier),
        }
    }

    /// Every caller is a guest.
    pub fn disabled() -> Self {
        Self { verifier: None }
    }

    pub async fn resolve(&self, authorization: Option<&str>) -> Caller {
        let Some(token) = authorization.and_then(bearer_token) else {
            return Caller::Guest;
        };

        let Some(verifier) = &self.verifier else {
            tracing::debug!("Bearer token ignored, no identity service configured");
            return Caller::Guest;
        };

        match verifier.verify(token).await {
            Ok(account_id) => {
                tracing::debug!(account_id = %account_id, "Authenticated caller");
                Caller::Account(account_id)
            }
            Err(e) => {
                tracing::warn!("Token verification failed, treating caller as guest: {}", e);
                Caller::Guest
            }
        }
    }
}
