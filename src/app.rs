use crate::data_model::settings::AppSettings;
use crate::notify::{LogNotifier, MailNotifier, Notifier};
use crate::probe_engine::ProbeClient;
use crate::runtime::{Scheduler, SchedulerConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("probe client init failed: {0}")]
    Transport(#[from] curl::Error),
}

/// Wires the transport and notifier chosen by `settings` into a scheduler.
pub fn build_scheduler(settings: &AppSettings) -> Result<Scheduler, AppError> {
    let transport = ProbeClient::new(settings.request_timeout())?;
    let notifier: Box<dyn Notifier> = if settings.dry_run_mail {
        Box::new(LogNotifier)
    } else {
        Box::new(MailNotifier::new(settings.smtp.clone()))
    };

    let config = SchedulerConfig {
        requests_path: settings.requests_path.clone(),
        log_dir: settings.log_dir.clone(),
        summary_path: settings.summary_path.clone(),
        interval: settings.interval(),
        retention: settings.retention(),
    };
    Ok(Scheduler::new(config, Box::new(transport), notifier))
}
