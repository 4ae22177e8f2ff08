use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::QuotaRecord;

use super::schema::SCHEMA;

/// Persistence for per-account usage counters.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn get_quota(&self, account_id: &str) -> Result<Option<QuotaRecord>>;

    /// Charge one summary to `account_id` unless it already used `limit`.
    ///
    /// Returns the new count, or `None` when the account is at its ceiling.
    /// The check and the write happen in one statement.
    async fn consume_quota(&self, account_id: &str, limit: u32) -> Result<Option<u32>>;
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Overwrite an account's counter, for seeding a ledger.
    pub async fn set_quota_count(&self, account_id: &str, count: u32) -> Result<()> {
        let account_id = account_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO summary_counts (user_id, count, last_reset)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(user_id) DO UPDATE SET count = excluded.count"#,
                    params![account_id, count, Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl QuotaStore for Repository {
    async fn get_quota(&self, account_id: &str) -> Result<Option<QuotaRecord>> {
        let account_id = account_id.to_string();
        let record = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT user_id, count, last_reset FROM summary_counts WHERE user_id = ?1",
                )?;
                let record = stmt.query_row(params![account_id], quota_from_row).optional()?;
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    async fn consume_quota(&self, account_id: &str, limit: u32) -> Result<Option<u32>> {
        if limit == 0 {
            return Ok(None);
        }

        let account_id = account_id.to_string();
        let count = self
            .conn
            .call(move |conn| {
                // The DO UPDATE is skipped at the ceiling, so RETURNING yields no row.
                let count = conn
                    .query_row(
                        r#"INSERT INTO summary_counts (user_id, count, last_reset)
                           VALUES (?1, 1, ?2)
                           ON CONFLICT(user_id) DO UPDATE SET count = count + 1
                           WHERE summary_counts.count < ?3
                           RETURNING count"#,
                        params![account_id, Utc::now().to_rfc3339(), limit],
                        |row| row.get::<_, u32>(0),
                    )
                    .optional()?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn quota_from_row(row: &Row) -> rusqlite::Result<QuotaRecord> {
    Ok(QuotaRecord {
        account_id: row.get(0)?,
        count: row.get(1)?,
        last_reset: row
            .get::<_, String>(2)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_charge_creates_record_with_count_one() {
        let repo = Repository::open_in_memory().await.unwrap();

        assert!(repo.get_quota("user-1").await.unwrap().is_none());
        assert_eq!(repo.consume_quota("user-1", 5).await.unwrap(), Some(1));

        let record = repo.get_quota("user-1").await.unwrap().unwrap();
        assert_eq!(record.account_id, "user-1");
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn charge_stops_at_ceiling() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.set_quota_count("user-1", 4).await.unwrap();

        assert_eq!(repo.consume_quota("user-1", 5).await.unwrap(), Some(5));
        assert_eq!(repo.consume_quota("user-1", 5).await.unwrap(), None);
        assert_eq!(repo.consume_quota("user-1", 5).await.unwrap(), None);

        let record = repo.get_quota("user-1").await.unwrap().unwrap();
        assert_eq!(record.count, 5);
    }

    #[tokio::test]
    async fn last_reset_is_kept_across_charges() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.consume_quota("user-1", 5).await.unwrap();
        let created = repo.get_quota("user-1").await.unwrap().unwrap().last_reset;

        repo.consume_quota("user-1", 5).await.unwrap();
        let after = repo.get_quota("user-1").await.unwrap().unwrap();

        assert_eq!(after.count, 2);
        assert_eq!(after.last_reset, created);
    }

    #[tokio::test]
    async fn zero_limit_never_writes() {
        let repo = Repository::open_in_memory().await.unwrap();

        assert_eq!(repo.consume_quota("user-1", 0).await.unwrap(), None);
        assert!(repo.get_quota("user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_charges_never_pass_the_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quota.db");
        let repo = std::sync::Arc::new(Repository::new(path.to_str().unwrap()).await.unwrap());
        repo.set_quota_count("user-1", 3).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.consume_quota("user-1", 5).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                granted += 1;
            }
        }

        assert_eq!(granted, 2);
        assert_eq!(repo.get_quota("user-1").await.unwrap().unwrap().count, 5);
    }

    #[tokio::test]
    async fn unopenable_path_is_a_database_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = match Repository::new(dir.path().to_str().unwrap()).await {
            Ok(_) => panic!("a directory is not a database"),
            Err(e) => e,
        };

        assert!(matches!(err, crate::error::AppError::Database(_)));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quota.db");
        let path = path.to_str().unwrap();

        {
            let repo = Repository::new(path).await.unwrap();
            repo.consume_quota("user-1", 5).await.unwrap();
        }

        let repo = Repository::new(path).await.unwrap();
        assert_eq!(repo.get_quota("user-1").await.unwrap().unwrap().count, 1);
    }
}
