//! Progressive Brute-Force Guard
//!
//! Tracks failed authentication attempts per (IP, identity) pair and locks
//! the pair once the failure threshold is reached. Every failure re-arms the
//! counter TTL to the base lockout window, so an attacker probing below the
//! threshold keeps the watch window open instead of outrunning it.
//!
//! The lock is deliberately hard: a successful credential check while the
//! pair is locked does not lift it. Otherwise an attacker who eventually
//! guesses the password could log in on the guess that crossed the line.

use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{CounterStore, StoreUnavailable};
use crate::config::BruteForceConfig;
use crate::domain::key::hash_identity;

/// Lock state of an (IP, identity) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// The pair may attempt to authenticate
    Unlocked,
    /// The pair is locked out
    Locked {
        /// Seconds until the lockout expires
        retry_after_seconds: u64,
    },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }
}

/// Outcome of recording one failed attempt
#[derive(Debug, Clone, Copy)]
pub struct FailureRecord {
    /// Failures counted in the current watch window, this one included
    pub failures: u32,
    /// Lock state after this failure
    pub lock: LockState,
}

/// Introspection snapshot of a pair's guard state
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GuardStatus {
    pub failures: u32,
    pub locked: bool,
    /// Seconds until the counter (and any lock) expires
    pub expires_in_seconds: u64,
}

/// Store-backed brute-force guard
pub struct BruteForceGuard {
    storage: Arc<dyn CounterStore>,
    key_prefix: String,
    config: BruteForceConfig,
}

impl BruteForceGuard {
    /// Create a new guard over the given store
    pub fn new(storage: Arc<dyn CounterStore>, key_prefix: &str, config: BruteForceConfig) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.to_string(),
            config,
        }
    }

    /// Storage key for a pair. The pair is hashed as one unit so neither
    /// component can inject separators, and the `bf` segment keeps guard
    /// counters away from every limiter tier.
    fn pair_key(&self, ip: &str, identity: &str) -> String {
        let digest = hash_identity(&format!("{}:{}", ip, identity));
        format!("{}:bf:{}", self.key_prefix, digest)
    }

    fn retry_seconds(ttl: std::time::Duration) -> u64 {
        ttl.as_secs().max(1)
    }

    /// Check whether the pair is locked. Read-only: neither the counter nor
    /// its TTL is touched, so probing a locked account cannot extend the
    /// lockout by itself.
    pub async fn check(&self, ip: &str, identity: &str) -> Result<LockState, StoreUnavailable> {
        let key = self.pair_key(ip, identity);

        let failures = match self.storage.fetch_count(&key).await? {
            Some(count) => count,
            None => return Ok(LockState::Unlocked),
        };

        if failures < u64::from(self.config.max_attempts) {
            return Ok(LockState::Unlocked);
        }

        // The counter may expire between the reads; an absent TTL means the
        // lock just lapsed.
        match self.storage.get_ttl(&key).await? {
            Some(ttl) => Ok(LockState::Locked {
                retry_after_seconds: Self::retry_seconds(ttl),
            }),
            None => Ok(LockState::Unlocked),
        }
    }

    /// Record a failed attempt. Increments the pair's counter and re-arms
    /// its TTL to the base lockout window.
    pub async fn record_failure(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<FailureRecord, StoreUnavailable> {
        let key = self.pair_key(ip, identity);

        let failures = self
            .storage
            .incr_with_expiry(&key, self.config.lockout_window())
            .await?;

        let lock = if failures >= u64::from(self.config.max_attempts) {
            warn!(
                key = %key,
                failures = failures,
                max_attempts = self.config.max_attempts,
                lockout_seconds = self.config.lockout_window_seconds,
                "Authentication pair locked after repeated failures"
            );
            LockState::Locked {
                retry_after_seconds: self.config.lockout_window_seconds,
            }
        } else {
            debug!(
                key = %key,
                failures = failures,
                max_attempts = self.config.max_attempts,
                "Recorded failed authentication attempt"
            );
            LockState::Unlocked
        };

        Ok(FailureRecord {
            failures: failures.min(u64::from(u32::MAX)) as u32,
            lock,
        })
    }

    /// Record a successful authentication. Clears the failure counter for a
    /// clean pair; a locked pair stays locked and keeps its counter, and the
    /// caller gets the lock back to reject the login.
    pub async fn record_success(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<LockState, StoreUnavailable> {
        let lock = self.check(ip, identity).await?;

        if lock.is_locked() {
            debug!(
                key = %self.pair_key(ip, identity),
                "Successful credential check while locked; lock stands"
            );
            return Ok(lock);
        }

        self.storage.delete(&self.pair_key(ip, identity)).await?;
        Ok(LockState::Unlocked)
    }

    /// Introspect the guard state of a pair without modifying it
    pub async fn status(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<Option<GuardStatus>, StoreUnavailable> {
        let key = self.pair_key(ip, identity);

        let failures = match self.storage.fetch_count(&key).await? {
            Some(count) => count,
            None => return Ok(None),
        };

        let expires_in = self
            .storage
            .get_ttl(&key)
            .await?
            .map(|ttl| ttl.as_secs())
            .unwrap_or(0);

        Ok(Some(GuardStatus {
            failures: failures.min(u64::from(u32::MAX)) as u32,
            locked: failures >= u64::from(self.config.max_attempts),
            expires_in_seconds: expires_in,
        }))
    }
}
