use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration as StdDuration;
use tracing::info;

use super::store::{CounterStore, StoreError, WindowHit};

/// Counters shared by every instance pointed at the same database.
///
/// Each hit is a single upsert, so atomicity comes from PostgreSQL's row
/// locking rather than from anything held in this process.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    key_prefix: String,
}

impl PgStore {
    /// Connect, check the backend answers, and create the counter table.
    pub async fn connect(url: &str, key_prefix: &str, timeout: StdDuration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self {
            pool,
            key_prefix: key_prefix.to_string(),
        };
        store.ensure_schema().await?;

        info!(prefix = key_prefix, "connected to shared rate limit store");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rate_limit_counters (
                key TEXT PRIMARY KEY,
                count BIGINT NOT NULL,
                reset_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for PgStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        let (count, reset_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO rate_limit_counters AS c (key, count, reset_at)
            VALUES ($1, 1, now() + $2::float8 * interval '1 millisecond')
            ON CONFLICT (key) DO UPDATE SET
                count = CASE WHEN c.reset_at <= now() THEN 1 ELSE c.count + 1 END,
                reset_at = CASE WHEN c.reset_at <= now() THEN EXCLUDED.reset_at ELSE c.reset_at END
            RETURNING count, reset_at
            "#,
        )
        .bind(format!("{}{}", self.key_prefix, key))
        .bind(window.num_milliseconds() as f64)
        .fetch_one(&self.pool)
        .await?;

        Ok(WindowHit {
            count: count.max(0) as u64,
            reset_at,
        })
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE reset_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
