//! Sliding Window Rate Limiter
//!
//! Exact-count sliding window over the counter store. Each request lands in
//! a per-key timestamp set; the evaluation prunes entries older than the
//! window, adds the current request and counts what is left, all in one
//! atomic store operation. Stricter than a fixed window: no boundary bursts,
//! every request is weighed against the trailing window.

use std::sync::Arc;
use tracing::debug;

use super::storage::{CounterStore, StoreUnavailable};
use crate::domain::key::{RateLimitKey, current_time_millis};
use crate::domain::policy::LimiterPolicy;

/// Outcome of evaluating one request against its window
#[derive(Debug, Clone, Copy)]
pub struct WindowEvaluation {
    /// Requests in the window, including this one
    pub requests: u64,
    /// Whether the request exceeded the policy ceiling
    pub blocked: bool,
    /// Epoch ms when a fresh window would be open
    pub reset_at: u64,
    /// Seconds until the oldest counted entry leaves the window
    /// (only set when blocked)
    pub retry_after: Option<u64>,
}

impl WindowEvaluation {
    /// Remaining quota under the given ceiling
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.requests.min(u64::from(u32::MAX)) as u32)
    }
}

/// Sliding window limiter over a counter store
pub struct SlidingWindowLimiter {
    storage: Arc<dyn CounterStore>,
    key_prefix: String,
}

impl SlidingWindowLimiter {
    /// Create a new sliding window limiter
    pub fn new(storage: Arc<dyn CounterStore>, key_prefix: &str) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.to_string(),
        }
    }

    /// Record the request under `key` and evaluate it against `policy`.
    ///
    /// The request is always recorded, allowed or not: a client hammering a
    /// blocked endpoint keeps its window full and stays blocked until it
    /// actually backs off.
    pub async fn evaluate(
        &self,
        key: &RateLimitKey,
        policy: &LimiterPolicy,
    ) -> Result<WindowEvaluation, StoreUnavailable> {
        let storage_key = key.storage_key(&self.key_prefix);
        let now = current_time_millis();
        let window_ms = policy.window_millis();

        let sample = self
            .storage
            .record_and_count(&storage_key, now, window_ms)
            .await?;

        let blocked = sample.requests > u64::from(policy.max_requests());
        let reset_at = now + window_ms;

        let retry_after = if blocked {
            // The window frees a slot when its oldest entry ages out, not a
            // full window from now.
            let window_secs = policy.window().as_secs().max(1);
            let until_slot_ms = (sample.oldest_ms + window_ms).saturating_sub(now);
            Some(until_slot_ms.div_ceil(1000).clamp(1, window_secs))
        } else {
            None
        };

        debug!(
            key = %storage_key,
            tier = %policy.tier(),
            requests = sample.requests,
            limit = policy.max_requests(),
            blocked = blocked,
            "Sliding window evaluated"
        );

        Ok(WindowEvaluation {
            requests: sample.requests,
            blocked,
            reset_at,
            retry_after,
        })
    }
}
