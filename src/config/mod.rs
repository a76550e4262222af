//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::policy::{InvalidPolicy, LimiterPolicy, PolicySet};
use crate::domain::{Tier, ViolationClass};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub limits: LimitsConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
}

/// Counter store backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Redis-compatible server, required for multi-instance deployments
    #[default]
    Redis,
    /// Process-local storage for development and single-instance setups
    Memory,
}

/// Counter store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    /// Prefix for every key this service writes
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://localhost:6379".to_string(),
            key_prefix: "rampart".to_string(),
        }
    }
}

/// Fixed ceiling for one tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TierLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for TierLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_seconds: 60,
        }
    }
}

/// API tier ceilings, one per caller plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiTierConfig {
    pub window_seconds: u64,
    pub anonymous: u32,
    pub base: u32,
    pub elevated: u32,
    pub top: u32,
}

impl Default for ApiTierConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            anonymous: 30,
            base: 60,
            elevated: 120,
            top: 240,
        }
    }
}

/// Progressive brute-force guard settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BruteForceConfig {
    /// Failed attempts before the (IP, identity) pair locks
    pub max_attempts: u32,
    /// Base lockout window; every failure re-arms the counter TTL to this
    pub lockout_window_seconds: u64,
}

impl Default for BruteForceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_window_seconds: 900,
        }
    }
}

impl BruteForceConfig {
    pub fn lockout_window(&self) -> Duration {
        Duration::from_secs(self.lockout_window_seconds)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Master switch; when false every check allows with unlimited quota
    pub enabled: bool,
    /// Sweep interval for the in-memory backend
    pub cleanup_interval_seconds: u64,
    /// Retention for daily violation counters
    pub violation_retention_hours: u64,
    pub global: TierLimitConfig,
    pub auth: TierLimitConfig,
    pub api: ApiTierConfig,
    pub upload: TierLimitConfig,
    pub ai: TierLimitConfig,
    pub password_reset: TierLimitConfig,
    pub social: TierLimitConfig,
    pub brute_force: BruteForceConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
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
            api: ApiTierConfig::default(),
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
            brute_force: BruteForceConfig::default(),
        }
    }
}

impl LimitsConfig {
    /// Convert to the runtime policy table.
    ///
    /// Fails on zero-width windows, which keeps unusable policies out of the
    /// request path entirely.
    pub fn to_policy_set(&self) -> Result<PolicySet, InvalidPolicy> {
        let fixed = |tier: Tier, cfg: &TierLimitConfig| {
            LimiterPolicy::new(tier, Duration::from_secs(cfg.window_seconds), cfg.max_requests)
        };
        let api = |max: u32| {
            LimiterPolicy::new(Tier::Api, Duration::from_secs(self.api.window_seconds), max)
        };

        Ok(PolicySet::new(
            fixed(Tier::Global, &self.global)?,
            fixed(Tier::Auth, &self.auth)?,
            api(self.api.anonymous)?,
            api(self.api.base)?,
            api(self.api.elevated)?,
            api(self.api.top)?,
            fixed(Tier::Upload, &self.upload)?,
            fixed(Tier::Ai, &self.ai)?,
            fixed(Tier::PasswordReset, &self.password_reset)?,
            fixed(Tier::Social, &self.social)?,
        ))
    }

    pub fn violation_retention(&self) -> Duration {
        Duration::from_secs(self.violation_retention_hours * 3600)
    }
}

/// Warning/critical thresholds for one violation class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThreshold {
    pub warning: u64,
    pub critical: u64,
}

impl Default for AlertThreshold {
    fn default() -> Self {
        Self {
            warning: 100,
            critical: 500,
        }
    }
}

/// Alert thresholds per violation class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub global: AlertThreshold,
    pub auth_bruteforce: AlertThreshold,
    pub progressive_block: AlertThreshold,
    pub api_flood: AlertThreshold,
    pub upload_flood: AlertThreshold,
    pub ai_abuse: AlertThreshold,
    pub password_reset_abuse: AlertThreshold,
    pub social_flood: AlertThreshold,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            global: AlertThreshold {
                warning: 500,
                critical: 2000,
            },
            auth_bruteforce: AlertThreshold {
                warning: 50,
                critical: 200,
            },
            progressive_block: AlertThreshold {
                warning: 20,
                critical: 100,
            },
            api_flood: AlertThreshold {
                warning: 200,
                critical: 1000,
            },
            upload_flood: AlertThreshold {
                warning: 100,
                critical: 500,
            },
            ai_abuse: AlertThreshold {
                warning: 100,
                critical: 500,
            },
            password_reset_abuse: AlertThreshold {
                warning: 25,
                critical: 100,
            },
            social_flood: AlertThreshold {
                warning: 200,
                critical: 1000,
            },
        }
    }
}

impl AlertsConfig {
    /// Threshold pair for a violation class
    pub fn threshold_for(&self, class: ViolationClass) -> AlertThreshold {
        match class {
            ViolationClass::Global => self.global,
            ViolationClass::AuthBruteforce => self.auth_bruteforce,
            ViolationClass::ProgressiveBlock => self.progressive_block,
            ViolationClass::ApiFlood => self.api_flood,
            ViolationClass::UploadFlood => self.upload_flood,
            ViolationClass::AiAbuse => self.ai_abuse,
            ViolationClass::PasswordResetAbuse => self.password_reset_abuse,
            ViolationClass::SocialFlood => self.social_flood,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("RAMPART").separator("__"));

        let mut config: Config = builder.build()?.try_deserialize()?;

        // Override store URL from REDIS_URL env var if present (common convention)
        if let Ok(redis_url) = std::env::var("REDIS_URL") {
            config.store.url = redis_url;
        }

        // Validate the loaded configuration
        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlanTier;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_policy_values() {
        let config = LimitsConfig::default();
        assert_eq!(config.global.max_requests, 60);
        assert_eq!(config.auth.max_requests, 5);
        assert_eq!(config.auth.window_seconds, 900);
        assert_eq!(config.password_reset.window_seconds, 3600);
        assert_eq!(config.brute_force.max_attempts, 5);
        assert_eq!(config.brute_force.lockout_window_seconds, 900);
    }

    #[test]
    fn test_to_policy_set_resolves_plans() {
        let config = LimitsConfig::default();
        let policies = config.to_policy_set().unwrap();

        assert_eq!(
            policies
                .policy_for(Tier::Api, PlanTier::Anonymous)
                .max_requests(),
            30
        );
        assert_eq!(
            policies.policy_for(Tier::Api, PlanTier::Top).max_requests(),
            240
        );
        assert_eq!(
            policies
                .policy_for(Tier::Auth, PlanTier::Top)
                .window()
                .as_secs(),
            900
        );
    }

    #[test]
    fn test_to_policy_set_rejects_zero_window() {
        let mut config = LimitsConfig::default();
        config.upload.window_seconds = 0;
        let err = config.to_policy_set().unwrap_err();
        assert_eq!(err.tier, Tier::Upload);
    }

    #[test]
    fn test_threshold_lookup_covers_every_class() {
        let alerts = AlertsConfig::default();
        for class in ViolationClass::ALL {
            let threshold = alerts.threshold_for(class);
            assert!(threshold.warning <= threshold.critical);
        }
    }
}
