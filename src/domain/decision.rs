//! Limiter decisions and the inbound request context

use uuid::Uuid;

use super::key::Tier;
use super::policy::PlanTier;

/// Result of a rate limit check
#[derive(Debug, Clone, serde::Serialize)]
pub struct LimiterDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp in milliseconds when the current window resets
    pub reset_at: u64,
    /// Retry-After duration in seconds (only set when blocked)
    pub retry_after: Option<u64>,
    /// The tier that was applied
    pub tier: Tier,
}

impl LimiterDecision {
    /// Create a new allowed decision
    pub fn allowed(limit: u32, remaining: u32, reset_at: u64, tier: Tier) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after: None,
            tier,
        }
    }

    /// Create a new blocked decision
    pub fn blocked(limit: u32, reset_at: u64, retry_after: u64, tier: Tier) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after: Some(retry_after),
            tier,
        }
    }
}

/// Everything the limiter needs to know about an inbound request.
///
/// Every field except the tier is optional: requests with missing dimension
/// values are counted under the `anonymous` fallback value and the most
/// restrictive plan instead of being rejected.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Protection tier the route classified into
    pub tier: Tier,
    /// Client IP, normally taken from the proxy header chain
    pub ip: Option<String>,
    /// Authenticated user, when known
    pub user_id: Option<Uuid>,
    /// The caller's subscription plan, when known
    pub plan: Option<PlanTier>,
    /// Target identity for auth-shaped requests (submitted email, reset target)
    pub identity: Option<String>,
}

impl RequestContext {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            ..Default::default()
        }
    }
}
