use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Counter state after one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the current window, including this one.
    pub count: u64,
    /// Instant at which the window closes and the count restarts.
    pub reset_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Counter backend unavailable: {0}")]
    Unavailable(String),

    #[error("Counter backend query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Fixed-window hit counter.
///
/// `hit` must count and report in one atomic step per key: two concurrent
/// hits on the same key never observe the same `count`. A hit that arrives at
/// or after `reset_at` opens a new window of length `window` with count 1.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError>;

    /// Drop counters whose window has closed. Returns how many went.
    async fn purge_expired(&self) -> Result<u64, StoreError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
