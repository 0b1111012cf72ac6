// ── Dashboard tuning ──
//
// Runtime knobs for the dashboard. Built by the CLI from the merged
// configuration; core never reads config files.

use std::time::Duration;

use crate::error::CoreError;
use crate::model::TimeRange;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Live polling period.
    pub poll_interval: Duration,
    /// Buffer capacity in live mode.
    pub live_capacity: usize,
    /// Seed the live window from the history endpoint on entering live mode.
    pub backfill: bool,
    /// How long a banner stays up.
    pub notice_ttl: Duration,
    /// Event bus capacity per subscriber.
    pub event_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            live_capacity: 30,
            backfill: true,
            notice_ttl: Duration::from_secs(5),
            event_capacity: 256,
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.live_capacity == 0 {
            return Err(CoreError::Config {
                message: "live capacity must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Range fetched to seed the live window: the smallest one spanning
    /// `live_capacity` polls.
    pub fn backfill_range(&self) -> TimeRange {
        let polls = u32::try_from(self.live_capacity).unwrap_or(u32::MAX);
        TimeRange::covering(self.poll_interval.saturating_mul(polls))
    }
}
