//! Limiter policies and the plan-dependent policy table

use std::time::Duration;

use super::key::Tier;

/// Subscription plan of an authenticated caller
///
/// Plans order from most to least restrictive; the API tier ceiling grows
/// with the plan while every other tier ignores it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// No authenticated plan; also the fallback when plan data is missing
    #[default]
    Anonymous,
    Base,
    Elevated,
    Top,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Anonymous => "anonymous",
            PlanTier::Base => "base",
            PlanTier::Elevated => "elevated",
            PlanTier::Top => "top",
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error raised when a policy is constructed with unusable values.
///
/// Policies are built once at startup from validated configuration, so this
/// never surfaces on the request path.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {tier} policy: {reason}")]
pub struct InvalidPolicy {
    pub tier: Tier,
    pub reason: String,
}

/// Immutable rate limit policy for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterPolicy {
    tier: Tier,
    window: Duration,
    max_requests: u32,
}

impl LimiterPolicy {
    /// Create a policy, rejecting zero-width windows.
    ///
    /// `max_requests == 0` is allowed and blocks every request on the tier.
    pub fn new(tier: Tier, window: Duration, max_requests: u32) -> Result<Self, InvalidPolicy> {
        if window.is_zero() {
            return Err(InvalidPolicy {
                tier,
                reason: "window must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            tier,
            window,
            max_requests,
        })
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_millis(&self) -> u64 {
        self.window.as_millis() as u64
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// The full policy table, resolved once from configuration
///
/// `policy_for` is a pure lookup: no clock reads, no storage access, so the
/// request path pays nothing for policy resolution.
#[derive(Debug, Clone)]
pub struct PolicySet {
    global: LimiterPolicy,
    auth: LimiterPolicy,
    api_anonymous: LimiterPolicy,
    api_base: LimiterPolicy,
    api_elevated: LimiterPolicy,
    api_top: LimiterPolicy,
    upload: LimiterPolicy,
    ai: LimiterPolicy,
    password_reset: LimiterPolicy,
    social: LimiterPolicy,
}

impl PolicySet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        global: LimiterPolicy,
        auth: LimiterPolicy,
        api_anonymous: LimiterPolicy,
        api_base: LimiterPolicy,
        api_elevated: LimiterPolicy,
        api_top: LimiterPolicy,
        upload: LimiterPolicy,
        ai: LimiterPolicy,
        password_reset: LimiterPolicy,
        social: LimiterPolicy,
    ) -> Self {
        Self {
            global,
            auth,
            api_anonymous,
            api_base,
            api_elevated,
            api_top,
            upload,
            ai,
            password_reset,
            social,
        }
    }

    /// Resolve the policy for a tier and caller plan.
    ///
    /// Only the API tier varies with the plan; every other tier carries a
    /// fixed ceiling.
    pub fn policy_for(&self, tier: Tier, plan: PlanTier) -> LimiterPolicy {
        match tier {
            Tier::Global => self.global,
            Tier::Auth => self.auth,
            Tier::Api => match plan {
                PlanTier::Anonymous => self.api_anonymous,
                PlanTier::Base => self.api_base,
                PlanTier::Elevated => self.api_elevated,
                PlanTier::Top => self.api_top,
            },
            Tier::Upload => self.upload,
            Tier::Ai => self.ai,
            Tier::PasswordReset => self.password_reset,
            Tier::Social => self.social,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(tier: Tier, secs: u64, max: u32) -> LimiterPolicy {
        LimiterPolicy::new(tier, Duration::from_secs(secs), max).unwrap()
    }

    fn test_set() -> PolicySet {
        PolicySet::new(
            policy(Tier::Global, 60, 60),
            policy(Tier::Auth, 900, 5),
            policy(Tier::Api, 60, 30),
            policy(Tier::Api, 60, 60),
            policy(Tier::Api, 60, 120),
            policy(Tier::Api, 60, 240),
            policy(Tier::Upload, 60, 10),
            policy(Tier::Ai, 300, 20),
            policy(Tier::PasswordReset, 3600, 3),
            policy(Tier::Social, 60, 30),
        )
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = LimiterPolicy::new(Tier::Global, Duration::ZERO, 10).unwrap_err();
        assert_eq!(err.tier, Tier::Global);
        assert!(err.reason.contains("window"));
    }

    #[test]
    fn test_zero_max_requests_is_a_valid_policy() {
        let policy = LimiterPolicy::new(Tier::Upload, Duration::from_secs(60), 0).unwrap();
        assert_eq!(policy.max_requests(), 0);
    }

    #[test]
    fn test_api_ceiling_grows_with_plan() {
        let set = test_set();
        let anon = set.policy_for(Tier::Api, PlanTier::Anonymous).max_requests();
        let base = set.policy_for(Tier::Api, PlanTier::Base).max_requests();
        let elevated = set.policy_for(Tier::Api, PlanTier::Elevated).max_requests();
        let top = set.policy_for(Tier::Api, PlanTier::Top).max_requests();

        assert!(anon < base && base < elevated && elevated < top);
    }

    #[test]
    fn test_fixed_tiers_ignore_plan() {
        let set = test_set();
        assert_eq!(
            set.policy_for(Tier::Auth, PlanTier::Anonymous),
            set.policy_for(Tier::Auth, PlanTier::Top)
        );
        assert_eq!(
            set.policy_for(Tier::Upload, PlanTier::Base),
            set.policy_for(Tier::Upload, PlanTier::Top)
        );
    }

    #[test]
    fn test_plan_ordering() {
        assert!(PlanTier::Anonymous < PlanTier::Base);
        assert!(PlanTier::Base < PlanTier::Elevated);
        assert!(PlanTier::Elevated < PlanTier::Top);
    }
}
