use std::sync::Arc;

use thiserror::Error;

use crate::config::QuotaEnforcement;
use crate::db::QuotaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Denied,
}

/// The ledger could not be consulted and enforcement is strict.
#[derive(Debug, Error)]
#[error("quota ledger unavailable: {0}")]
pub struct QuotaUnavailable(pub String);

/// Free-summary allowance for authenticated accounts.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn QuotaStore>,
    limit: u32,
    enforcement: QuotaEnforcement,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn QuotaStore>, limit: u32, enforcement: QuotaEnforcement) -> Self {
        Self {
            store,
            limit,
            enforcement,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn denial_message(&self) -> String {
        format!(
            "Free limit reached ({} summaries max for logged-in users).",
            self.limit
        )
    }

    /// Read-only admission check; nothing is charged.
    pub async fn check(&self, account_id: &str) -> Result<QuotaDecision, QuotaUnavailable> {
        match self.store.get_quota(account_id).await {
            Ok(Some(record)) if record.count >= self.limit => Ok(QuotaDecision::Denied),
            Ok(None) if self.limit == 0 => Ok(QuotaDecision::Denied),
            Ok(_) => Ok(QuotaDecision::Allowed),
            Err(e) => self.on_store_error(account_id, "reading", e),
        }
    }

    /// Charge one summary, or deny when the account is at its limit.
    pub async fn consume(&self, account_id: &str) -> Result<QuotaDecision, QuotaUnavailable> {
        match self.store.consume_quota(account_id, self.limit).await {
            Ok(Some(count)) => {
                tracing::debug!(account_id, count, limit = self.limit, "Charged free summary");
                Ok(QuotaDecision::Allowed)
            }
            Ok(None) => Ok(QuotaDecision::Denied),
            Err(e) => self.on_store_error(account_id, "updating", e),
        }
    }

    /// Admission that charges immediately.
    pub async fn check_and_consume(
        &self,
        account_id: &str,
    ) -> Result<QuotaDecision, QuotaUnavailable> {
        self.consume(account_id).await
    }

    fn on_store_error(
        &self,
        account_id: &str,
        action: &str,
        e: crate::error::AppError,
    ) -> Result<QuotaDecision, QuotaUnavailable> {
        match self.enforcement {
            QuotaEnforcement::BestEffort => {
                tracing::error!(account_id, "Error {} summary count, allowing request: {}", action, e);
                Ok(QuotaDecision::Allowed)
            }
            QuotaEnforcement::Strict => {
                tracing::error!(account_id, "Error {} summary count, refusing request: {}", action, e);
                Err(QuotaUnavailable(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repository;
    use crate::error::{AppError, Result};
    use crate::models::QuotaRecord;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl QuotaStore for BrokenStore {
        async fn get_quota(&self, _account_id: &str) -> Result<Option<QuotaRecord>> {
            Err(AppError::Config("disk on fire".to_string()))
        }

        async fn consume_quota(&self, _account_id: &str, _limit: u32) -> Result<Option<u32>> {
            Err(AppError::Config("disk on fire".to_string()))
        }
    }

    async fn ledger() -> (Arc<Repository>, QuotaLedger) {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let ledger = QuotaLedger::new(repo.clone(), 5, QuotaEnforcement::BestEffort);
        (repo, ledger)
    }

    #[tokio::test]
    async fn allows_five_then_denies() {
        let (repo, ledger) = ledger().await;

        for _ in 0..5 {
            assert_eq!(ledger.check_and_consume("u").await.unwrap(), QuotaDecision::Allowed);
        }
        assert_eq!(ledger.check_and_consume("u").await.unwrap(), QuotaDecision::Denied);
        assert_eq!(repo.get_quota("u").await.unwrap().unwrap().count, 5);
    }

    #[tokio::test]
    async fn check_does_not_write() {
        let (repo, ledger) = ledger().await;

        assert_eq!(ledger.check("u").await.unwrap(), QuotaDecision::Allowed);
        assert!(repo.get_quota("u").await.unwrap().is_none());

        repo.set_quota_count("u", 5).await.unwrap();
        assert_eq!(ledger.check("u").await.unwrap(), QuotaDecision::Denied);
        assert_eq!(repo.get_quota("u").await.unwrap().unwrap().count, 5);
    }

    #[tokio::test]
    async fn best_effort_lets_requests_through_on_store_errors() {
        let ledger = QuotaLedger::new(Arc::new(BrokenStore), 5, QuotaEnforcement::BestEffort);

        assert_eq!(ledger.check("u").await.unwrap(), QuotaDecision::Allowed);
        assert_eq!(ledger.consume("u").await.unwrap(), QuotaDecision::Allowed);
    }

    #[tokio::test]
    async fn strict_refuses_on_store_errors() {
        let ledger = QuotaLedger::new(Arc::new(BrokenStore), 5, QuotaEnforcement::Strict);

        assert!(ledger.check("u").await.is_err());
        assert!(ledger.consume("u").await.is_err());
    }

    #[test]
    fn denial_message_follows_limit() {
        let ledger = QuotaLedger::new(Arc::new(BrokenStore), 3, QuotaEnforcement::Strict);
        assert_eq!(
            ledger.denial_message(),
            "Free limit reached (3 summaries max for logged-in users)."
        );
    }
}
