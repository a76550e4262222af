//! Protection tiers and storage key composition

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use super::violation::ViolationClass;

/// Protection tier for rate limiting
/// Determines which policy and key dimension apply to a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Blanket per-IP ceiling applied to all traffic
    #[default]
    Global,
    /// Login attempts, keyed by IP and submitted identity
    Auth,
    /// Authenticated API traffic with plan-dependent ceilings
    Api,
    /// File upload endpoints
    Upload,
    /// AI/inference endpoints
    Ai,
    /// Password reset requests
    PasswordReset,
    /// Social interaction endpoints (follows, comments, reactions)
    Social,
}

impl Tier {
    /// Get the tier name for storage keys, logging and metrics.
    ///
    /// These names are load-bearing: counters written under them must stay
    /// readable across deploys, so they never change.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Global => "global",
            Tier::Auth => "auth",
            Tier::Api => "api",
            Tier::Upload => "upload",
            Tier::Ai => "ai",
            Tier::PasswordReset => "password_reset",
            Tier::Social => "social",
        }
    }

    /// The key dimension this tier is counted on
    pub fn dimension(&self) -> KeyDimension {
        match self {
            Tier::Global => KeyDimension::Ip,
            Tier::Auth | Tier::PasswordReset => KeyDimension::IpIdentity,
            Tier::Api | Tier::Upload | Tier::Ai | Tier::Social => KeyDimension::UserOrIp,
        }
    }

    /// The violation class recorded when this tier blocks a request
    pub fn violation_class(&self) -> ViolationClass {
        match self {
            Tier::Global => ViolationClass::Global,
            Tier::Auth => ViolationClass::AuthBruteforce,
            Tier::Api => ViolationClass::ApiFlood,
            Tier::Upload => ViolationClass::UploadFlood,
            Tier::Ai => ViolationClass::AiAbuse,
            Tier::PasswordReset => ViolationClass::PasswordResetAbuse,
            Tier::Social => ViolationClass::SocialFlood,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a tier identifies the party it is counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDimension {
    /// Client IP only
    Ip,
    /// Client IP combined with the submitted identity (hashed)
    IpIdentity,
    /// Authenticated user id, falling back to IP for anonymous callers
    UserOrIp,
}

/// Key identifying a rate limit counter
///
/// The tier is baked into every variant so two tiers can never share
/// a counter, whatever their dimension values are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Counted per client IP
    Ip { tier: Tier, ip: String },
    /// Counted per (IP, identity) pair; the identity is hashed
    IpIdentity {
        tier: Tier,
        ip: String,
        identity_hash: String,
    },
    /// Counted per authenticated user
    User { tier: Tier, user_id: Uuid },
}

impl RateLimitKey {
    pub fn ip(tier: Tier, ip: impl Into<String>) -> Self {
        Self::Ip {
            tier,
            ip: ip.into(),
        }
    }

    /// Build an (IP, identity) key. The identity is hashed before it enters
    /// the key so untrusted input cannot inject key separators or blow up
    /// key length.
    pub fn ip_identity(tier: Tier, ip: impl Into<String>, identity: &str) -> Self {
        Self::IpIdentity {
            tier,
            ip: ip.into(),
            identity_hash: hash_identity(identity),
        }
    }

    pub fn user(tier: Tier, user_id: Uuid) -> Self {
        Self::User { tier, user_id }
    }

    /// The tier this key counts under
    pub fn tier(&self) -> Tier {
        match self {
            RateLimitKey::Ip { tier, .. }
            | RateLimitKey::IpIdentity { tier, .. }
            | RateLimitKey::User { tier, .. } => *tier,
        }
    }

    /// Convert to a storage key string: `prefix:tier:dimension:value`
    pub fn storage_key(&self, prefix: &str) -> String {
        match self {
            RateLimitKey::Ip { tier, ip } => format!("{}:{}:ip:{}", prefix, tier.as_str(), ip),
            RateLimitKey::IpIdentity {
                tier,
                ip,
                identity_hash,
            } => format!("{}:{}:ident:{}:{}", prefix, tier.as_str(), ip, identity_hash),
            RateLimitKey::User { tier, user_id } => {
                format!("{}:{}:user:{}", prefix, tier.as_str(), user_id)
            }
        }
    }
}

/// Hash an identity value (email, username) for use in storage keys.
/// Prevents key injection and normalizes length.
pub fn hash_identity(value: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Get current time in milliseconds since Unix epoch
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Get current time in seconds since Unix epoch
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
