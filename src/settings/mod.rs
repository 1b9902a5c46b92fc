use crate::config::{SecretString, SmtpConfig};
use crate::data_model::settings::AppSettings;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "probewatch")]
#[command(about = "Periodic HTTP endpoint health checker with mail alerts", long_about = None)]
pub struct CliArgs {
    /// Probe table (`;`-delimited, header row required)
    #[arg(long, env = "PROBEWATCH_REQUESTS", default_value = "requests.csv", value_name = "PATH")]
    requests: PathBuf,

    /// Directory for per-project log files
    #[arg(long, env = "PROBEWATCH_LOG_DIR", default_value = "logs", value_name = "DIR")]
    log_dir: PathBuf,

    /// File receiving one summary line per pass
    #[arg(long, env = "PROBEWATCH_SUMMARY_LOG", default_value = "resume.log", value_name = "PATH")]
    summary_log: PathBuf,

    /// Seconds between the end of one pass and the start of the next
    #[arg(long, env = "PROBEWATCH_INTERVAL_SECS", default_value_t = 1800)]
    interval_secs: u64,

    /// Project logs untouched for longer than this are deleted
    #[arg(long, env = "PROBEWATCH_RETENTION_DAYS", default_value_t = 30)]
    retention_days: u64,

    /// Per-request timeout
    #[arg(long, env = "PROBEWATCH_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Log alerts instead of mailing them
    #[arg(long)]
    dry_run_mail: bool,

    /// Emit the process log as JSON
    #[arg(long, env = "PROBEWATCH_LOG_JSON")]
    log_json: bool,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.example.com")]
    smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    smtp_port: u16,

    #[arg(long, env = "SMTP_USER", default_value = "user@example.com")]
    smtp_user: String,

    #[arg(long, env = "SMTP_PASS", default_value = "password", hide_env_values = true)]
    smtp_pass: String,

    #[arg(long, env = "SMTP_FROM", default_value = "sender@example.com")]
    smtp_from: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("interval must be greater than zero (got {value})")]
    InvalidInterval { value: u64 },
    #[error("log retention must be greater than zero days (got {value})")]
    InvalidRetention { value: u64 },
    #[error("request timeout must be greater than zero (got {value})")]
    InvalidTimeout { value: u64 },
    #[error("smtp host is required unless --dry-run-mail is set")]
    MissingSmtpHost,
}

pub fn load_from_cli() -> Result<AppSettings, SettingsError> {
    let args = CliArgs::parse();
    from_args(args)
}

pub fn from_args(args: CliArgs) -> Result<AppSettings, SettingsError> {
    if args.interval_secs == 0 {
        return Err(SettingsError::InvalidInterval {
            value: args.interval_secs,
        });
    }
    if args.retention_days == 0 {
        return Err(SettingsError::InvalidRetention {
            value: args.retention_days,
        });
    }
    if args.timeout_secs == 0 {
        return Err(SettingsError::InvalidTimeout {
            value: args.timeout_secs,
        });
    }
    if !args.dry_run_mail && args.smtp_host.trim().is_empty() {
        return Err(SettingsError::MissingSmtpHost);
    }

    Ok(AppSettings {
        requests_path: args.requests,
        log_dir: args.log_dir,
        summary_path: args.summary_log,
        interval_secs: args.interval_secs,
        retention_days: args.retention_days,
        request_timeout_secs: args.timeout_secs,
        run_once: args.once,
        dry_run_mail: args.dry_run_mail,
        log_json: args.log_json,
        smtp: SmtpConfig {
            host: args.smtp_host.trim().to_string(),
            port: args.smtp_port,
            username: args.smtp_user,
            password: SecretString::new(args.smtp_pass),
            from: args.smtp_from,
        },
    })
}
