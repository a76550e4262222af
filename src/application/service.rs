//! Rate Limiter Service
//!
//! The application facade that coordinates every protection mechanism:
//! - Tier classification and policy resolution
//! - Sliding window evaluation per tier dimension
//! - Progressive brute-force lockouts on auth traffic
//! - Violation aggregation for monitoring
//!
//! The decision path is infallible by contract. When the counter store is
//! unreachable the service fails open: requests are allowed with a full
//! window and a warning, because availability outranks enforcement.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::config::{LimitsConfig, StoreBackend, StoreConfig};
use crate::domain::decision::{LimiterDecision, RequestContext};
use crate::domain::key::{KeyDimension, RateLimitKey, Tier, current_time_millis};
use crate::domain::policy::{InvalidPolicy, LimiterPolicy, PolicySet};
use crate::domain::violation::ViolationClass;
use crate::infrastructure::brute_force::{BruteForceGuard, GuardStatus, LockState};
use crate::infrastructure::sliding_window::SlidingWindowLimiter;
use crate::infrastructure::storage::{
    CounterStore, InMemoryCounterStore, RedisCounterStore, StoreUnavailable,
};
use crate::infrastructure::violations::ViolationRecorder;

/// Dimension value counted under when the real input is missing. Shared on
/// purpose: all anonymous traffic competes for one counter per tier.
const ANONYMOUS: &str = "anonymous";

/// Main rate limiter service
pub struct RateLimiterService {
    /// Sliding window evaluation for all tiers
    window: SlidingWindowLimiter,
    /// Progressive lockouts for auth traffic
    guard: BruteForceGuard,
    /// Daily violation aggregates
    violations: ViolationRecorder,
    /// Resolved policy table
    policies: PolicySet,
    /// Storage backend
    storage: Arc<dyn CounterStore>,
    /// Configuration
    config: LimitsConfig,
}

impl RateLimiterService {
    /// Create a new service against the configured store backend.
    ///
    /// An unreachable Redis degrades to the in-memory backend with a warning
    /// rather than refusing to start; limits then apply per instance.
    pub async fn new(store: &StoreConfig, limits: LimitsConfig) -> Result<Self, InvalidPolicy> {
        let storage: Arc<dyn CounterStore> = match store.backend {
            StoreBackend::Redis => match RedisCounterStore::new(&store.url).await {
                Ok(storage) => {
                    info!("Rate limiter using Redis storage backend at {}", store.url);
                    Arc::new(storage)
                }
                Err(e) => {
                    warn!(
                        "Failed to connect to Redis for rate limiting, falling back to in-memory: {}",
                        e
                    );
                    Arc::new(InMemoryCounterStore::new())
                }
            },
            StoreBackend::Memory => {
                info!("Rate limiter using in-memory storage backend");
                Arc::new(InMemoryCounterStore::new())
            }
        };

        Self::with_store(storage, limits, &store.key_prefix)
    }

    /// Create with a custom storage backend (for testing)
    pub fn with_store(
        storage: Arc<dyn CounterStore>,
        limits: LimitsConfig,
        key_prefix: &str,
    ) -> Result<Self, InvalidPolicy> {
        let policies = limits.to_policy_set()?;
        let window = SlidingWindowLimiter::new(Arc::clone(&storage), key_prefix);
        let guard = BruteForceGuard::new(Arc::clone(&storage), key_prefix, limits.brute_force);
        let violations =
            ViolationRecorder::new(Arc::clone(&storage), key_prefix, limits.violation_retention());

        Ok(Self {
            window,
            guard,
            violations,
            policies,
            storage,
            config: limits,
        })
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Classify a request into its tier's policy and decide it.
    ///
    /// Auth requests consult the progressive lockout first: a locked
    /// (IP, identity) pair is refused without spending window capacity.
    /// Everything else is weighed against its tier's sliding window, where
    /// the attempt is always recorded, allowed or not.
    #[instrument(skip(self, ctx), fields(tier = %ctx.tier))]
    pub async fn classify_and_check(&self, ctx: &RequestContext) -> LimiterDecision {
        if !self.config.enabled {
            return LimiterDecision::allowed(u32::MAX, u32::MAX, 0, ctx.tier);
        }

        let policy = self
            .policies
            .policy_for(ctx.tier, ctx.plan.unwrap_or_default());

        if ctx.tier == Tier::Auth {
            let ip = ctx.ip.as_deref().unwrap_or(ANONYMOUS);
            let identity = ctx.identity.as_deref().unwrap_or(ANONYMOUS);

            match self.guard.check(ip, identity).await {
                Ok(LockState::Locked {
                    retry_after_seconds,
                }) => {
                    self.violations
                        .record(ViolationClass::ProgressiveBlock)
                        .await;
                    let reset_at = current_time_millis() + retry_after_seconds * 1000;
                    return LimiterDecision::blocked(
                        policy.max_requests(),
                        reset_at,
                        retry_after_seconds,
                        ctx.tier,
                    );
                }
                Ok(LockState::Unlocked) => {}
                Err(error) => return self.fail_open(&policy, ctx.tier, &error),
            }
        }

        let key = self.resolve_key(ctx);

        match self.window.evaluate(&key, &policy).await {
            Ok(eval) if eval.blocked => {
                self.violations.record(ctx.tier.violation_class()).await;
                LimiterDecision::blocked(
                    policy.max_requests(),
                    eval.reset_at,
                    eval.retry_after.unwrap_or(1),
                    ctx.tier,
                )
            }
            Ok(eval) => LimiterDecision::allowed(
                policy.max_requests(),
                eval.remaining(policy.max_requests()),
                eval.reset_at,
                ctx.tier,
            ),
            Err(error) => self.fail_open(&policy, ctx.tier, &error),
        }
    }

    /// Build the counter key for a request per its tier's dimension.
    /// Missing inputs fall back to the shared anonymous value instead of
    /// rejecting the request.
    fn resolve_key(&self, ctx: &RequestContext) -> RateLimitKey {
        let ip = ctx.ip.as_deref().unwrap_or(ANONYMOUS);

        match ctx.tier.dimension() {
            KeyDimension::Ip => RateLimitKey::ip(ctx.tier, ip),
            KeyDimension::IpIdentity => {
                let identity = ctx.identity.as_deref().unwrap_or(ANONYMOUS);
                RateLimitKey::ip_identity(ctx.tier, ip, identity)
            }
            KeyDimension::UserOrIp => match ctx.user_id {
                Some(user_id) => RateLimitKey::user(ctx.tier, user_id),
                None => RateLimitKey::ip(ctx.tier, ip),
            },
        }
    }

    /// Allow the request with a full window when the store is unreachable.
    /// The warning is the operator's signal that limits are not being
    /// enforced; no violation is recorded on this path.
    fn fail_open(
        &self,
        policy: &LimiterPolicy,
        tier: Tier,
        error: &StoreUnavailable,
    ) -> LimiterDecision {
        warn!(tier = %tier, error = %error, "Counter store unavailable, failing open");
        let reset_at = current_time_millis() + policy.window_millis();
        LimiterDecision::allowed(policy.max_requests(), policy.max_requests(), reset_at, tier)
    }

    /// Record a failed authentication attempt against the brute-force guard.
    ///
    /// Returns the lock state after this failure so the caller can tell the
    /// user their account just locked.
    #[instrument(skip(self, ip, identity))]
    pub async fn record_auth_failure(&self, ip: &str, identity: &str) -> LockState {
        if !self.config.enabled {
            return LockState::Unlocked;
        }

        match self.guard.record_failure(ip, identity).await {
            Ok(record) => record.lock,
            Err(error) => {
                warn!(error = %error, "Failed to record authentication failure");
                LockState::Unlocked
            }
        }
    }

    /// Record a successful authentication.
    ///
    /// Returns the lock state: callers must reject the login when the pair
    /// is still locked, even though the credentials were correct.
    #[instrument(skip(self, ip, identity))]
    pub async fn record_auth_success(&self, ip: &str, identity: &str) -> LockState {
        if !self.config.enabled {
            return LockState::Unlocked;
        }

        match self.guard.record_success(ip, identity).await {
            Ok(state) => state,
            Err(error) => {
                warn!(error = %error, "Failed to record authentication success");
                LockState::Unlocked
            }
        }
    }

    /// Introspect the lockout state of an (IP, identity) pair
    pub async fn lockout_status(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<Option<GuardStatus>, StoreUnavailable> {
        self.guard.status(ip, identity).await
    }

    /// Start the cleanup task for in-memory storage
    pub fn start_cleanup_task(self: Arc<Self>) {
        let cleanup_interval = Duration::from_secs(self.config.cleanup_interval_seconds);

        tokio::spawn(async move {
            let mut interval = interval(cleanup_interval);

            loop {
                interval.tick().await;
                self.storage.cleanup().await;
                debug!("Rate limiter cleanup completed");
            }
        });
    }

    /// Recorder handle for building monitoring over the same counters
    pub fn recorder(&self) -> ViolationRecorder {
        self.violations.clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &LimitsConfig {
        &self.config
    }
}
