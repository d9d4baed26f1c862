//! Per-client request throttling.
//!
//! A fixed-window counter keyed by the client's address. Counters live in a
//! [`CounterStore`]: [`MemoryStore`] for a single process, or [`PgStore`]
//! when several instances must share one budget.

mod memory;
mod middleware;
mod postgres;
mod store;

pub use memory::MemoryStore;
pub use middleware::{rate_limit, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER};
pub use postgres::PgStore;
pub use store::{CounterStore, StoreError, WindowHit};

use chrono::{Duration, Utc};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};

use crate::config::RateLimitSettings;
use crate::error::AppError;

/// How long construction waits for the shared backend before giving up.
const BACKEND_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(3);

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests admitted per window.
    pub limit: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            window: Duration::seconds(1),
        }
    }
}

impl TryFrom<&RateLimitSettings> for RateLimitConfig {
    type Error = AppError;

    fn try_from(settings: &RateLimitSettings) -> Result<Self, Self::Error> {
        let window = i64::try_from(settings.window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AppError::ConfigError("rate_limit.window_secs out of range".into()))?;

        Ok(Self {
            limit: settings.requests,
            window,
        })
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests left in the current window; 0 once the client is refused.
    pub remaining: u32,
    pub limit: u32,
    /// Time until the window rolls over.
    pub reset_after: StdDuration,
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Build the limiter the settings ask for.
    ///
    /// With no backend URL the counters are per-process. If the shared
    /// backend cannot be reached now, the process keeps using in-process
    /// counters for its whole lifetime and never retries the backend.
    pub async fn connect(settings: &RateLimitSettings) -> Result<Self, AppError> {
        let config = RateLimitConfig::try_from(settings)?;

        let Some(url) = settings.backend_url.as_deref().filter(|url| !url.is_empty()) else {
            info!(limit = config.limit, window_secs = config.window.num_seconds(), "using in-process rate limit store");
            return Ok(Self::in_memory(config));
        };

        match PgStore::connect(url, &settings.key_prefix, BACKEND_CONNECT_TIMEOUT).await {
            Ok(store) => {
                info!(limit = config.limit, window_secs = config.window.num_seconds(), "using shared rate limit store");
                Ok(Self::new(Arc::new(store), config))
            }
            Err(e) => {
                error!(error = %e, "failed to connect to rate limit backend, falling back to in-memory store");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Drop counters for windows that have closed.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.store.purge_expired().await
    }

    /// Count one request from `client_key` and decide whether it may pass.
    ///
    /// Never waits for the window; refused requests still count. If a live
    /// backend errors, the request is admitted.
    pub async fn admit(&self, client_key: &str) -> Decision {
        let limit = self.config.limit;

        let hit = match self.store.hit(client_key, self.config.window).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, backend = self.backend(), "rate limit store failed, admitting request");
                return Decision {
                    allowed: true,
                    remaining: limit,
                    limit,
                    reset_after: self.config.window.to_std().unwrap_or_default(),
                };
            }
        };

        let remaining = u64::from(limit).saturating_sub(hit.count) as u32;
        let reset_after = (hit.reset_at - Utc::now()).to_std().unwrap_or_default();

        Decision {
            allowed: hit.count <= u64::from(limit),
            remaining,
            limit,
            reset_after,
        }
    }
}

/// Canonical rate-limit key for a peer address: the host without its port.
///
/// `"203.0.113.9:51234"` and `"203.0.113.9:51800"` share a bucket, as do
/// `"[2001:db8::1]:443"` and `"2001:db8::1"`.
pub fn client_key(peer: &str) -> String {
    if let Ok(addr) = peer.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Ok(ip) = peer.parse::<IpAddr>() {
        return ip.to_string();
    }
    match peer.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            host.trim_start_matches('[').trim_end_matches(']').to_string()
        }
        _ => peer.to_string(),
    }
}
