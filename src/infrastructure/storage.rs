//! Counter Store Backends
//!
//! Provides storage implementations for rate limiting state:
//! - Redis for distributed, production use
//! - In-memory for development and single-instance deployments
//!
//! All mutating window operations run atomically per key so concurrent
//! requests can never observe or produce a partially applied update.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::key::current_time_millis;

/// Extra lifetime granted to window keys beyond the window itself, so an
/// idle key expires from the store shortly after it stops mattering.
const WINDOW_TTL_SLACK_MS: u64 = 60_000;

/// The store could not serve a request.
///
/// Deliberately a single distinguished type: every storage failure funnels
/// here, which is what makes the fail-open policy deterministic.
#[derive(Debug, Clone, thiserror::Error)]
#[error("counter store unavailable: {reason}")]
pub struct StoreUnavailable {
    pub reason: String,
}

impl StoreUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<redis::RedisError> for StoreUnavailable {
    fn from(e: redis::RedisError) -> Self {
        Self::new(e.to_string())
    }
}

/// Result of recording one request into a sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSample {
    /// Number of requests in the window, including the one just recorded
    pub requests: u64,
    /// Timestamp in epoch ms of the oldest surviving entry
    pub oldest_ms: u64,
}

/// Trait for counter store backends
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one request into the sliding window at `key` and count it.
    ///
    /// Atomically per key: drop entries strictly older than
    /// `now_ms - window_ms`, add an entry at `now_ms`, return the resulting
    /// count together with the oldest surviving timestamp.
    async fn record_and_count(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<WindowSample, StoreUnavailable>;

    /// Increment a plain counter; the TTL is armed only when the increment
    /// creates the key. Used for fixed-window aggregates.
    async fn increment_and_fetch(&self, key: &str, ttl: Duration)
    -> Result<u64, StoreUnavailable>;

    /// Increment a plain counter and re-arm its TTL on every call. Used by
    /// the brute-force guard, where each failure extends the watch window.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64, StoreUnavailable>;

    /// Remaining TTL of a key; `None` when the key is absent or carries no
    /// expiry. Never modifies the key.
    async fn get_ttl(&self, key: &str) -> Result<Option<Duration>, StoreUnavailable>;

    /// Read a plain counter without touching it
    async fn fetch_count(&self, key: &str) -> Result<Option<u64>, StoreUnavailable>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<(), StoreUnavailable>;

    /// Cleanup expired entries (for in-memory storage)
    async fn cleanup(&self);
}

/// Drop entries older than the window, add the new one, count, and report
/// the oldest survivor, all in one atomic step.
///
/// KEYS[1] window key
/// ARGV[1] now (epoch ms), ARGV[2] member, ARGV[3] key TTL (ms),
/// ARGV[4] exclusive prune bound, pre-formatted as "(cutoff"
const RECORD_AND_COUNT_SCRIPT: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[4])
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[2])
local count = redis.call('ZCARD', KEYS[1])
local oldest = redis.call('ZRANGE', KEYS[1], 0, 0, 'WITHSCORES')
redis.call('PEXPIRE', KEYS[1], ARGV[3])
return {count, oldest[2]}
"#;

/// INCR with the TTL armed only on key creation (fixed window)
const FIXED_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// INCR with the TTL re-armed on every call (sliding re-arm)
const REARM_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[1])
return count
"#;

/// Redis storage backend
pub struct RedisCounterStore {
    connection_manager: Arc<ConnectionManager>,
    record_script: redis::Script,
    fixed_window_script: redis::Script,
    rearm_script: redis::Script,
}

impl RedisCounterStore {
    /// Create a new Redis storage backend and verify the connection
    pub async fn new(url: &str) -> Result<Self, StoreUnavailable> {
        let client = redis::Client::open(url).map_err(|e| {
            warn!("Failed to create Redis client for rate limiting: {}", e);
            StoreUnavailable::new(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            warn!(
                "Failed to create connection manager for rate limiting: {}",
                e
            );
            StoreUnavailable::new(format!("Failed to create connection manager: {}", e))
        })?;

        // Test connection
        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                warn!("Failed to ping Redis for rate limiting: {}", e);
                StoreUnavailable::new(format!("Failed to ping Redis: {}", e))
            })?;

        debug!("Successfully connected to Redis for rate limiting");

        Ok(Self {
            connection_manager: Arc::new(connection_manager),
            record_script: redis::Script::new(RECORD_AND_COUNT_SCRIPT),
            fixed_window_script: redis::Script::new(FIXED_WINDOW_SCRIPT),
            rearm_script: redis::Script::new(REARM_SCRIPT),
        })
    }

    fn seconds_arg(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn record_and_count(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<WindowSample, StoreUnavailable> {
        let mut conn = (*self.connection_manager).clone();

        // Unique member even when two requests land in the same millisecond,
        // otherwise concurrent hits would collapse into one entry.
        let member = format!("{}-{}", now_ms, Uuid::new_v4());
        let cutoff = format!("({}", now_ms.saturating_sub(window_ms));

        let (requests, oldest_ms): (u64, u64) = self
            .record_script
            .key(key)
            .arg(now_ms)
            .arg(&member)
            .arg(window_ms + WINDOW_TTL_SLACK_MS)
            .arg(&cutoff)
            .invoke_async(&mut conn)
            .await?;

        Ok(WindowSample {
            requests,
            oldest_ms,
        })
    }

    async fn increment_and_fetch(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<u64, StoreUnavailable> {
        let mut conn = (*self.connection_manager).clone();

        let count: u64 = self
            .fixed_window_script
            .key(key)
            .arg(Self::seconds_arg(ttl))
            .invoke_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64, StoreUnavailable> {
        let mut conn = (*self.connection_manager).clone();

        let count: u64 = self
            .rearm_script
            .key(key)
            .arg(Self::seconds_arg(ttl))
            .invoke_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn get_ttl(&self, key: &str) -> Result<Option<Duration>, StoreUnavailable> {
        let mut conn = (*self.connection_manager).clone();

        // TTL returns -2 for a missing key and -1 for a key without expiry
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;

        if ttl >= 0 {
            Ok(Some(Duration::from_secs(ttl as u64)))
        } else {
            Ok(None)
        }
    }

    async fn fetch_count(&self, key: &str) -> Result<Option<u64>, StoreUnavailable> {
        let mut conn = (*self.connection_manager).clone();

        let value: Option<u64> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;

        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreUnavailable> {
        let mut conn = (*self.connection_manager).clone();

        redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await?;

        Ok(())
    }

    async fn cleanup(&self) {
        // Redis handles TTL-based cleanup automatically
    }
}

/// In-memory sliding window entry
#[derive(Clone)]
struct WindowEntry {
    /// Surviving request timestamps in epoch ms
    timestamps: Vec<u64>,
    expires_at: u64,
}

/// In-memory counter entry with expiration
#[derive(Clone)]
struct CounterEntry {
    count: u64,
    expires_at: u64,
}

/// In-memory storage backend for development/single instance
pub struct InMemoryCounterStore {
    windows: Arc<RwLock<HashMap<String, WindowEntry>>>,
    counters: Arc<RwLock<HashMap<String, CounterEntry>>>,
}

impl InMemoryCounterStore {
    /// Create a new in-memory storage backend
    pub fn new() -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn record_and_count(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<WindowSample, StoreUnavailable> {
        let mut windows = self.windows.write().await;
        let entry = windows.entry(key.to_string()).or_insert_with(|| WindowEntry {
            timestamps: Vec::new(),
            expires_at: 0,
        });

        // Strictly-older entries leave; an entry exactly on the boundary
        // still counts.
        let window_start = now_ms.saturating_sub(window_ms);
        entry.timestamps.retain(|&ts| ts >= window_start);
        entry.timestamps.push(now_ms);
        entry.expires_at = now_ms + window_ms + WINDOW_TTL_SLACK_MS;

        let oldest_ms = entry.timestamps.iter().copied().min().unwrap_or(now_ms);

        Ok(WindowSample {
            requests: entry.timestamps.len() as u64,
            oldest_ms,
        })
    }

    async fn increment_and_fetch(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<u64, StoreUnavailable> {
        let now = current_time_millis();
        let mut counters = self.counters.write().await;

        if let Some(entry) = counters.get_mut(key)
            && now < entry.expires_at
        {
            // TTL stays as armed at creation
            entry.count += 1;
            return Ok(entry.count);
        }

        counters.insert(
            key.to_string(),
            CounterEntry {
                count: 1,
                expires_at: now + ttl.as_millis() as u64,
            },
        );
        Ok(1)
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64, StoreUnavailable> {
        let now = current_time_millis();
        let expires_at = now + ttl.as_millis() as u64;
        let mut counters = self.counters.write().await;

        if let Some(entry) = counters.get_mut(key)
            && now < entry.expires_at
        {
            entry.count += 1;
            entry.expires_at = expires_at;
            return Ok(entry.count);
        }

        counters.insert(
            key.to_string(),
            CounterEntry {
                count: 1,
                expires_at,
            },
        );
        Ok(1)
    }

    async fn get_ttl(&self, key: &str) -> Result<Option<Duration>, StoreUnavailable> {
        let now = current_time_millis();

        let counters = self.counters.read().await;
        if let Some(entry) = counters.get(key)
            && now < entry.expires_at
        {
            return Ok(Some(Duration::from_millis(entry.expires_at - now)));
        }
        drop(counters);

        let windows = self.windows.read().await;
        if let Some(entry) = windows.get(key)
            && now < entry.expires_at
        {
            return Ok(Some(Duration::from_millis(entry.expires_at - now)));
        }

        Ok(None)
    }

    async fn fetch_count(&self, key: &str) -> Result<Option<u64>, StoreUnavailable> {
        let counters = self.counters.read().await;
        if let Some(entry) = counters.get(key)
            && current_time_millis() < entry.expires_at
        {
            return Ok(Some(entry.count));
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreUnavailable> {
        let mut windows = self.windows.write().await;
        let mut counters = self.counters.write().await;

        windows.remove(key);
        counters.remove(key);

        Ok(())
    }

    async fn cleanup(&self) {
        let now = current_time_millis();

        {
            let mut windows = self.windows.write().await;
            windows.retain(|_, entry| entry.expires_at > now);
        }

        {
            let mut counters = self.counters.write().await;
            counters.retain(|_, entry| entry.expires_at > now);
        }

        debug!("Completed counter store cleanup");
    }
}
