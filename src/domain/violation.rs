//! Violation classes, daily aggregates and alert classification

use chrono::NaiveDate;

use crate::config::AlertsConfig;

/// Class of a recorded rate limit violation
///
/// Class names are part of the storage key format for daily counters and
/// must stay stable across deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationClass {
    /// Global per-IP ceiling exceeded
    Global,
    /// Auth tier window exceeded
    AuthBruteforce,
    /// Request rejected by an engaged brute-force lockout
    ProgressiveBlock,
    /// API tier window exceeded
    ApiFlood,
    /// Upload tier window exceeded
    UploadFlood,
    /// AI tier window exceeded
    AiAbuse,
    /// Password reset tier window exceeded
    PasswordResetAbuse,
    /// Social tier window exceeded
    SocialFlood,
}

impl ViolationClass {
    /// Every class, in a fixed order for stats iteration
    pub const ALL: [ViolationClass; 8] = [
        ViolationClass::Global,
        ViolationClass::AuthBruteforce,
        ViolationClass::ProgressiveBlock,
        ViolationClass::ApiFlood,
        ViolationClass::UploadFlood,
        ViolationClass::AiAbuse,
        ViolationClass::PasswordResetAbuse,
        ViolationClass::SocialFlood,
    ];

    /// Stable name used in storage keys and alert payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationClass::Global => "global",
            ViolationClass::AuthBruteforce => "auth_bruteforce",
            ViolationClass::ProgressiveBlock => "progressive_block",
            ViolationClass::ApiFlood => "api_flood",
            ViolationClass::UploadFlood => "upload_flood",
            ViolationClass::AiAbuse => "ai_abuse",
            ViolationClass::PasswordResetAbuse => "password_reset_abuse",
            ViolationClass::SocialFlood => "social_flood",
        }
    }
}

impl std::fmt::Display for ViolationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Violation count for one class on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ViolationAggregate {
    pub class: ViolationClass,
    pub date: NaiveDate,
    pub count: u64,
}

/// Severity of an operator alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// An alert raised from daily violation aggregates
#[derive(Debug, Clone, serde::Serialize)]
pub struct Alert {
    pub class: ViolationClass,
    pub severity: AlertSeverity,
    pub date: NaiveDate,
    /// Violations counted so far on the day
    pub count: u64,
    /// The threshold that was crossed
    pub threshold: u64,
    pub message: String,
}

/// Classify daily aggregates against configured thresholds.
///
/// Pure function over its inputs: at most one alert per class, at the
/// highest severity the count has reached.
pub fn evaluate_alerts(stats: &[ViolationAggregate], thresholds: &AlertsConfig) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for aggregate in stats {
        let threshold = thresholds.threshold_for(aggregate.class);

        let (severity, crossed) = if aggregate.count >= threshold.critical {
            (AlertSeverity::Critical, threshold.critical)
        } else if aggregate.count >= threshold.warning {
            (AlertSeverity::Warning, threshold.warning)
        } else {
            continue;
        };

        alerts.push(Alert {
            class: aggregate.class,
            severity,
            date: aggregate.date,
            count: aggregate.count,
            threshold: crossed,
            message: format!(
                "{} {} violations on {} (threshold {})",
                aggregate.count, aggregate.class, aggregate.date, crossed
            ),
        });
    }

    alerts
}
