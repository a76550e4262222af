//! Violation Aggregation
//!
//! Keeps daily per-class counters of blocked requests so operators can see
//! abuse pressure build over time. Aggregation is advisory: recording runs
//! after a decision is already made and must never delay or fail it, so
//! store errors are logged and swallowed here.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::storage::{CounterStore, StoreUnavailable};
use crate::domain::violation::ViolationClass;

/// Store-backed recorder of daily violation counts
#[derive(Clone)]
pub struct ViolationRecorder {
    storage: Arc<dyn CounterStore>,
    key_prefix: String,
    retention: Duration,
}

impl ViolationRecorder {
    pub fn new(storage: Arc<dyn CounterStore>, key_prefix: &str, retention: Duration) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.to_string(),
            retention,
        }
    }

    /// Counter key for one class on one UTC day
    fn day_key(&self, class: ViolationClass, date: NaiveDate) -> String {
        format!(
            "{}:violations:{}:{}",
            self.key_prefix,
            class.as_str(),
            date.format("%Y-%m-%d")
        )
    }

    /// Record one violation against today's aggregate for `class`.
    ///
    /// Infallible by contract: the caller has already blocked the request,
    /// and a failing aggregate counter is not a reason to disturb that path.
    pub async fn record(&self, class: ViolationClass) {
        let key = self.day_key(class, Utc::now().date_naive());
        if let Err(error) = self.storage.increment_and_fetch(&key, self.retention).await {
            warn!(
                key = %key,
                class = %class,
                error = %error,
                "Failed to record violation aggregate"
            );
        }
    }

    /// Violations counted for `class` on `date`; zero when no counter exists
    pub async fn count_for(
        &self,
        class: ViolationClass,
        date: NaiveDate,
    ) -> Result<u64, StoreUnavailable> {
        let key = self.day_key(class, date);
        Ok(self.storage.fetch_count(&key).await?.unwrap_or(0))
    }
}
