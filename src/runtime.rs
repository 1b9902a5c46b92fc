use crate::common::time::{Clock, SystemClock, iso_timestamp};
use crate::config::ProbeDefinition;
use crate::log_sink::LogSink;
use crate::metrics::{CycleSummary, PassCounters};
use crate::notify::Notifier;
use crate::probe_engine::{ProbeTransport, execute_probe};
use crate::storage::read_probe_definitions;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub requests_path: PathBuf,
    pub log_dir: PathBuf,
    pub summary_path: PathBuf,
    pub interval: Duration,
    pub retention: Duration,
}

/// Drives probe passes: one pass, then a fixed sleep, forever.
pub struct Scheduler {
    config: SchedulerConfig,
    sink: LogSink,
    transport: Box<dyn ProbeTransport>,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    sleeper: Box<dyn Sleeper>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        transport: Box<dyn ProbeTransport>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let sink = LogSink::new(&config.log_dir, &config.summary_path);
        Self {
            config,
            sink,
            transport,
            notifier,
            clock: Box::new(SystemClock),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn notifier_name(&self) -> &str {
        self.notifier.name()
    }

    /// First pass starts immediately; later passes start `interval` after
    /// the previous one finished.
    pub fn run(mut self) -> ! {
        info!(
            requests = %self.config.requests_path.display(),
            interval_secs = self.config.interval.as_secs(),
            notifier = self.notifier.name(),
            "scheduler started"
        );
        loop {
            self.cycle();
        }
    }

    pub fn cycle(&mut self) -> CycleSummary {
        let summary = self.run_pass();
        self.sleeper.sleep(self.config.interval);
        summary
    }

    pub fn run_pass(&mut self) -> CycleSummary {
        info!("Executing requests at {}", iso_timestamp(&self.clock.now()));

        if let Err(err) = self.sink.ensure_dir() {
            error!(dir = %self.sink.dir().display(), error = %err, "could not create log directory");
        }
        self.sink.clean_old_logs(self.config.retention);

        let definitions = match read_probe_definitions(&self.config.requests_path) {
            Ok(definitions) => definitions,
            Err(err) => {
                error!(error = %err, "probe table unavailable, pass has no probes");
                Vec::new()
            }
        };

        let mut counters = PassCounters::default();
        for definition in &definitions {
            let alert = self.evaluate(definition);
            counters.record(alert);
        }
        debug!(streams = self.sink.open_streams(), "closing project logs");
        self.sink.close_streams();

        let summary = counters.finish(self.clock.now());
        if let Err(err) = self.sink.append_summary(&summary) {
            error!(
                path = %self.sink.summary_path().display(),
                error = %err,
                "could not append run summary"
            );
        }
        info!("{summary}");
        summary
    }

    /// A probe that panics is counted as an alert and the pass moves on.
    fn evaluate(&mut self, definition: &ProbeDefinition) -> bool {
        let Self {
            sink,
            transport,
            notifier,
            clock,
            ..
        } = self;

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_probe(
                definition,
                transport.as_mut(),
                sink,
                notifier.as_ref(),
                clock.as_ref(),
            )
        }));

        match attempt {
            Ok(outcome) => outcome.is_alert(),
            Err(payload) => {
                error!(
                    project = %definition.project_name,
                    endpoint = %definition.endpoint,
                    reason = panic_message(payload.as_ref()),
                    "probe aborted unexpectedly"
                );
                true
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
