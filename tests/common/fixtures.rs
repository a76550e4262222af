//! Test data fixtures for rampart

use std::sync::Arc;

use rampart::RateLimiterService;
use rampart::config::{ApiTierConfig, BruteForceConfig, LimitsConfig, TierLimitConfig};
use rampart::infrastructure::{CounterStore, InMemoryCounterStore};

/// Limits mirroring the shipped defaults, scaled down for fast tests
pub fn default_test_limits() -> LimitsConfig {
    LimitsConfig {
        enabled: true,
        cleanup_interval_seconds: 300,
        violation_retention_hours: 48,
        global: TierLimitConfig {
            max_requests: 60,
            window_seconds: 60,
        },
        auth: TierLimitConfig {
            max_requests: 5,
            window_seconds: 900,
        },
        api: ApiTierConfig {
            window_seconds: 60,
            anonymous: 30,
            base: 60,
            elevated: 120,
            top: 240,
        },
        upload: TierLimitConfig {
            max_requests: 10,
            window_seconds: 60,
        },
        ai: TierLimitConfig {
            max_requests: 20,
            window_seconds: 300,
        },
        password_reset: TierLimitConfig {
            max_requests: 3,
            window_seconds: 3600,
        },
        social: TierLimitConfig {
            max_requests: 30,
            window_seconds: 60,
        },
        brute_force: BruteForceConfig {
            max_attempts: 5,
            lockout_window_seconds: 900,
        },
    }
}

/// Tight ceilings and short windows so block/expiry paths are reachable
/// within test time
pub fn strict_test_limits() -> LimitsConfig {
    LimitsConfig {
        global: TierLimitConfig {
            max_requests: 3,
            window_seconds: 1,
        },
        auth: TierLimitConfig {
            max_requests: 3,
            window_seconds: 60,
        },
        api: ApiTierConfig {
            window_seconds: 60,
            anonymous: 2,
            base: 4,
            elevated: 8,
            top: 16,
        },
        upload: TierLimitConfig {
            max_requests: 2,
            window_seconds: 60,
        },
        brute_force: BruteForceConfig {
            max_attempts: 3,
            lockout_window_seconds: 1,
        },
        ..default_test_limits()
    }
}

pub fn create_test_storage() -> Arc<dyn CounterStore> {
    Arc::new(InMemoryCounterStore::new())
}

/// Service over fresh in-memory storage
pub fn test_service(limits: LimitsConfig) -> RateLimiterService {
    RateLimiterService::with_store(create_test_storage(), limits, "test")
        .expect("test limits must produce a valid policy set")
}
