use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::store::{CounterStore, StoreError, WindowHit};

#[derive(Debug)]
struct Bucket {
    count: u64,
    reset_at: DateTime<Utc>,
}

/// Per-process counters. Lost on restart and not shared between instances.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a hit as of `now`.
    pub async fn hit_at(&self, key: &str, window: Duration, now: DateTime<Utc>) -> WindowHit {
        // No await while the guard is held: a cancelled caller either
        // counted fully or not at all.
        let mut buckets = self.buckets.write().await;

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            reset_at: window_end(now, window),
        });

        if now >= bucket.reset_at {
            bucket.count = 0;
            bucket.reset_at = window_end(now, window);
        }
        bucket.count += 1;

        WindowHit {
            count: bucket.count,
            reset_at: bucket.reset_at,
        }
    }

    pub async fn len(&self) -> usize {
        self.buckets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buckets.read().await.is_empty()
    }
}

/// End of a window opened at `now`; a window reaching past the last
/// representable instant never closes.
fn window_end(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        Ok(self.hit_at(key, window, Utc::now()).await)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.reset_at > now);
        Ok((before - buckets.len()) as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_within_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let window = Duration::seconds(1);

        for expected in 1..=3 {
            let hit = store.hit_at("10.0.0.1", window, now).await;
            assert_eq!(hit.count, expected);
            assert_eq!(hit.reset_at, now + window);
        }

        // Other keys are independent.
        assert_eq!(store.hit_at("10.0.0.2", window, now).await.count, 1);
    }

    #[tokio::test]
    async fn test_resets_exactly_at_boundary() {
        let store = MemoryStore::new();
        let start = Utc::now();
        let window = Duration::seconds(1);

        store.hit_at("k", window, start).await;
        let just_before = start + window - Duration::milliseconds(1);
        assert_eq!(store.hit_at("k", window, just_before).await.count, 2);

        let at_boundary = store.hit_at("k", window, start + window).await;
        assert_eq!(at_boundary.count, 1);
        assert_eq!(at_boundary.reset_at, start + window + window);
    }

    #[tokio::test]
    async fn test_concurrent_hits_are_not_lost() {
        let store = MemoryStore::new();
        let window = Duration::minutes(1);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.hit("shared", window).await.unwrap().count })
            })
            .collect();

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }
        counts.sort_unstable();

        assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        let past = Utc::now() - Duration::minutes(5);

        store.hit_at("stale", Duration::seconds(1), past).await;
        store.hit_at("live", Duration::minutes(10), Utc::now()).await;

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_huge_window_does_not_overflow() {
        let store = MemoryStore::new();
        let window = Duration::days(365 * 300_000);

        let first = store.hit_at("k", window, Utc::now()).await;
        assert_eq!(first.reset_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(store.hit_at("k", window, Utc::now()).await.count, 2);

        assert_eq!(store.purge_expired().await.unwrap(), 0);
        assert!(!store.is_empty().await);
    }
}
