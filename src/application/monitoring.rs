//! Abuse Monitoring
//!
//! Pull-based view over the daily violation aggregates. Nothing here pushes
//! notifications; callers (an admin endpoint, a periodic job) ask for the
//! day's stats or for the alerts currently firing and act on the answer.

use chrono::{NaiveDate, Utc};
use tracing::instrument;

use crate::config::AlertsConfig;
use crate::domain::violation::{Alert, ViolationAggregate, ViolationClass, evaluate_alerts};
use crate::infrastructure::storage::StoreUnavailable;
use crate::infrastructure::violations::ViolationRecorder;

/// Read-side monitor over recorded violations
pub struct AbuseMonitor {
    recorder: ViolationRecorder,
    thresholds: AlertsConfig,
}

impl AbuseMonitor {
    pub fn new(recorder: ViolationRecorder, thresholds: AlertsConfig) -> Self {
        Self {
            recorder,
            thresholds,
        }
    }

    /// Violation counts for every class on one UTC day.
    ///
    /// Unlike recording, reads surface store trouble to the caller: a
    /// monitoring answer built on missing data is worse than no answer.
    #[instrument(skip(self))]
    pub async fn daily_stats(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<ViolationAggregate>, StoreUnavailable> {
        let mut stats = Vec::with_capacity(ViolationClass::ALL.len());

        for class in ViolationClass::ALL {
            let count = self.recorder.count_for(class, date).await?;
            stats.push(ViolationAggregate { class, date, count });
        }

        Ok(stats)
    }

    /// Alerts firing on today's aggregates
    pub async fn active_alerts(&self) -> Result<Vec<Alert>, StoreUnavailable> {
        let today = Utc::now().date_naive();
        let stats = self.daily_stats(today).await?;
        Ok(evaluate_alerts(&stats, &self.thresholds))
    }
}
