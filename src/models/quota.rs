use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-account usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub account_id: String,
    pub count: u32,
    /// Set when the record is created; nothing resets it yet.
    pub last_reset: DateTime<Utc>,
}
