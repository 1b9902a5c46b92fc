use crate::config::SmtpConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct AppSettings {
    pub requests_path: PathBuf,
    pub log_dir: PathBuf,
    pub summary_path: PathBuf,
    pub interval_secs: u64,
    pub retention_days: u64,
    pub request_timeout_secs: u64,
    pub run_once: bool,
    pub dry_run_mail: bool,
    pub log_json: bool,
    pub smtp: SmtpConfig,
}

impl AppSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(SECS_PER_DAY))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
