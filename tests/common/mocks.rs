//! Store test doubles for degradation scenarios

use async_trait::async_trait;
use std::time::Duration;

use rampart::infrastructure::{CounterStore, InMemoryCounterStore, StoreUnavailable, WindowSample};

/// Store where every operation fails, as if the backend were down
pub struct FailingStore;

#[async_trait]
impl CounterStore for FailingStore {
    async fn record_and_count(
        &self,
        _key: &str,
        _now_ms: u64,
        _window_ms: u64,
    ) -> Result<WindowSample, StoreUnavailable> {
        Err(StoreUnavailable::new("connection refused"))
    }

    async fn increment_and_fetch(
        &self,
        _key: &str,
        _ttl: Duration,
    ) -> Result<u64, StoreUnavailable> {
        Err(StoreUnavailable::new("connection refused"))
    }

    async fn incr_with_expiry(&self, _key: &str, _ttl: Duration) -> Result<u64, StoreUnavailable> {
        Err(StoreUnavailable::new("connection refused"))
    }

    async fn get_ttl(&self, _key: &str) -> Result<Option<Duration>, StoreUnavailable> {
        Err(StoreUnavailable::new("connection refused"))
    }

    async fn fetch_count(&self, _key: &str) -> Result<Option<u64>, StoreUnavailable> {
        Err(StoreUnavailable::new("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreUnavailable> {
        Err(StoreUnavailable::new("connection refused"))
    }

    async fn cleanup(&self) {}
}

/// Store where only window recording fails; plain counters still work.
///
/// Lets a test assert that a failed-open decision did not record a violation
/// aggregate: the aggregates remain readable and must stay at zero.
pub struct WindowOutageStore {
    inner: InMemoryCounterStore,
}

impl WindowOutageStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
        }
    }
}

impl Default for WindowOutageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for WindowOutageStore {
    async fn record_and_count(
        &self,
        _key: &str,
        _now_ms: u64,
        _window_ms: u64,
    ) -> Result<WindowSample, StoreUnavailable> {
        Err(StoreUnavailable::new("window shard down"))
    }

    async fn increment_and_fetch(&self, key: &str, ttl: Duration) -> Result<u64, StoreUnavailable> {
        self.inner.increment_and_fetch(key, ttl).await
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64, StoreUnavailable> {
        self.inner.incr_with_expiry(key, ttl).await
    }

    async fn get_ttl(&self, key: &str) -> Result<Option<Duration>, StoreUnavailable> {
        self.inner.get_ttl(key).await
    }

    async fn fetch_count(&self, key: &str) -> Result<Option<u64>, StoreUnavailable> {
        self.inner.fetch_count(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreUnavailable> {
        self.inner.delete(key).await
    }

    async fn cleanup(&self) {
        self.inner.cleanup().await;
    }
}
