use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{AppError, Result};

const APP_DIR: &str = "speedy-summary";

/// What to do when the quota ledger cannot be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaEnforcement {
    /// Refuse the request with a 500.
    Strict,
    /// Log the failure and let the request through.
    #[default]
    BestEffort,
}

/// When an account's free summary is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaCharge {
    /// Before the provider is called, whether or not it succeeds.
    OnAdmission,
    /// Only once the provider has returned a summary.
    #[default]
    OnSuccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub groq_api_key: Option<String>,

    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Model names the local daemon is allowed to serve.
    #[serde(default = "default_ollama_models")]
    pub ollama_models: Vec<String>,

    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,

    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_free_summary_limit")]
    pub free_summary_limit: u32,

    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    #[serde(default)]
    pub quota_enforcement: QuotaEnforcement,

    #[serde(default)]
    pub quota_charge: QuotaCharge,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("quota.db").to_string_lossy().to_string()
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_models() -> Vec<String> {
    vec!["llama3".to_string(), "gemma2".to_string()]
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_free_summary_limit() -> u32 {
    5
}

fn default_max_input_chars() -> usize {
    20_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            groq_api_key: None,
            groq_base_url: default_groq_base_url(),
            ollama_url: default_ollama_url(),
            ollama_models: default_ollama_models(),
            supabase_url: None,
            supabase_anon_key: None,
            provider_timeout_secs: default_provider_timeout(),
            free_summary_limit: default_free_summary_limit(),
            max_input_chars: default_max_input_chars(),
            quota_enforcement: QuotaEnforcement::default(),
            quota_charge: QuotaCharge::default(),
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Secrets and endpoints can come from the environment so they stay out of the file.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("GROQ_API_KEY") {
            self.groq_api_key = Some(v);
        }
        if let Some(v) = non_empty("GROQ_BASE_URL") {
            self.groq_base_url = v;
        }
        if let Some(v) = non_empty("OLLAMA_URL") {
            self.ollama_url = v;
        }
        if let Some(v) = non_empty("SUPABASE_URL") {
            self.supabase_url = Some(v);
        }
        if let Some(v) = non_empty("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(v);
        }
        if let Some(v) = non_empty("SUMMARY_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = non_empty("SUMMARY_DB_PATH") {
            self.db_path = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.groq_base_url)?;
        Url::parse(&self.ollama_url)?;
        if let Some(url) = &self.supabase_url {
            Url::parse(url)?;
        }
        if self.supabase_url.is_some() != self.supabase_anon_key.is_some() {
            return Err(AppError::Config(
                "supabase_url and supabase_anon_key must be set together".to_string(),
            ));
        }
        if self.provider_timeout_secs == 0 {
            return Err(AppError::Config(
                "provider_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.ollama_models.iter().all(|m| m.trim().is_empty()) {
            return Err(AppError::Config(
                "ollama_models must name at least one model".to_string(),
            ));
        }
        if self.max_input_chars == 0 {
            return Err(AppError::Config(
                "max_input_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            groq_api_key = "gsk-test"
            quota_enforcement = "strict"
            "#,
        )
        .unwrap();

        assert_eq!(config.groq_api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.quota_enforcement, QuotaEnforcement::Strict);
        assert_eq!(config.quota_charge, QuotaCharge::OnSuccess);
        assert_eq!(config.free_summary_limit, 5);
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "GROQ_API_KEY" => Some("from-env".to_string()),
            "OLLAMA_URL" => Some("http://ollama:11434".to_string()),
            "SUMMARY_DB_PATH" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.groq_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.ollama_url, "http://ollama:11434");
        assert_ne!(config.db_path.trim(), "");
    }

    #[test]
    fn supabase_settings_must_come_in_pairs() {
        let config = Config {
            supabase_url: Some("https://project.supabase.co".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_unparseable_urls() {
        let config = Config {
            ollama_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load(Some(&path)).unwrap();

        assert!(path.exists());
        assert_eq!(config.free_summary_limit, 5);
    }
}
