use crate::common::time::iso_timestamp;
use chrono::{DateTime, Local};
use std::fmt;

/// Counters for the pass in flight. Owned by the pass, never shared.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PassCounters {
    total_projects: usize,
    alert_count: usize,
}

impl PassCounters {
    pub fn record(&mut self, alert: bool) {
        self.total_projects += 1;
        if alert {
            self.alert_count += 1;
        }
    }

    pub fn finish(self, ts: DateTime<Local>) -> CycleSummary {
        CycleSummary::new(ts, self.total_projects, self.alert_count)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CycleSummary {
    pub ts: DateTime<Local>,
    pub total_projects: usize,
    pub alert_count: usize,
}

impl CycleSummary {
    pub fn new(ts: DateTime<Local>, total_projects: usize, alert_count: usize) -> Self {
        Self {
            ts,
            total_projects,
            alert_count,
        }
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} analysed projects | {} projects in alert",
            iso_timestamp(&self.ts),
            self.total_projects,
            self.alert_count
        )
    }
}
