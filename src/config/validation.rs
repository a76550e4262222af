//! Configuration validation module

use crate::config::{
    AlertsConfig, Config, LimitsConfig, LoggingConfig, StoreBackend, StoreConfig,
};
use crate::domain::ViolationClass;

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Store configuration error: {message}")]
    Store { message: String },

    #[error("Limits configuration error: {message}")]
    Limits { message: String },

    #[error("Alerts configuration error: {message}")]
    Alerts { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn limits(message: impl Into<String>) -> Self {
        Self::Limits {
            message: message.into(),
        }
    }

    pub fn alerts(message: impl Into<String>) -> Self {
        Self::Alerts {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == StoreBackend::Redis && self.url.is_empty() {
            return Err(ValidationError::store(
                "Store URL cannot be empty when the redis backend is selected".to_string(),
            ));
        }

        if self.key_prefix.is_empty() {
            return Err(ValidationError::store(
                "Key prefix cannot be empty".to_string(),
            ));
        }

        // Colons would shift every segment of the composed keys
        if self.key_prefix.contains(':') {
            return Err(ValidationError::store(format!(
                "Key prefix must not contain ':', got {:?}",
                self.key_prefix
            )));
        }

        Ok(())
    }
}

impl Validate for LimitsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // Every window must be non-zero; a zero window can never admit anything
        // and divides the retry math by zero. to_policy_set enforces the same
        // rule, surfacing it here keeps the failure at load time.
        if let Err(e) = self.to_policy_set() {
            return Err(ValidationError::limits(e.to_string()));
        }

        if self.brute_force.max_attempts == 0 {
            return Err(ValidationError::limits(
                "Brute force max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.brute_force.lockout_window_seconds == 0 {
            return Err(ValidationError::limits(
                "Brute force lockout window must be greater than 0 seconds".to_string(),
            ));
        }

        if self.cleanup_interval_seconds == 0 {
            return Err(ValidationError::limits(
                "Cleanup interval must be greater than 0 seconds".to_string(),
            ));
        }

        // Retention below one day would expire counters before the daily
        // aggregation window closes
        if self.violation_retention_hours < 24 {
            return Err(ValidationError::limits(format!(
                "Violation retention must be at least 24 hours, got {}",
                self.violation_retention_hours
            )));
        }

        Ok(())
    }
}

impl Validate for AlertsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for class in ViolationClass::ALL {
            let threshold = self.threshold_for(class);

            if threshold.warning == 0 {
                return Err(ValidationError::alerts(format!(
                    "{} warning threshold must be greater than 0",
                    class
                )));
            }

            if threshold.critical < threshold.warning {
                return Err(ValidationError::alerts(format!(
                    "{} critical threshold ({}) is below the warning threshold ({})",
                    class, threshold.critical, threshold.warning
                )));
            }
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ValidationError::logging(format!(
                "Log level must be one of {:?}, got {:?}",
                valid_levels, self.level
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ValidationError::logging(format!(
                "Log format must be one of {:?}, got {:?}",
                valid_formats, self.format
            )));
        }

        Ok(())
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()?;
        self.limits.validate()?;
        self.alerts.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
