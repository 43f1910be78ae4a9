use chrono::{DateTime, Utc};
use serde::Serialize;

/// Running counters for the poll loop
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorStats {
    pub refresh_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CoordinatorStats {
    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.refresh_count += 1;
        self.consecutive_failures = 0;
        self.last_success_at = Some(at);
    }

    pub(crate) fn record_failure(&mut self, at: DateTime<Utc>, error: String) {
        self.refresh_count += 1;
        self.failure_count += 1;
        self.consecutive_failures += 1;
        self.last_failure_at = Some(at);
        self.last_error = Some(error);
    }

    /// Fraction of cycles that failed, 0.0 before the first cycle
    pub fn failure_rate(&self) -> f64 {
        if self.refresh_count == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.refresh_count as f64
        }
    }
}
