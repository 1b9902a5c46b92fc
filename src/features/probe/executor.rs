use super::engine::ProbeTransport;
use crate::common::time::{Clock, iso_timestamp};
use crate::config::ProbeDefinition;
use crate::log_sink::{LogSink, ProjectLog};
use crate::notify::{Notifier, notify_recipients};
use crate::probe::{ProbeOutcome, ProbeResult};
use tracing::debug;

/// Writes the finish line when dropped, so it lands on every exit path.
struct ProbeScope<'a> {
    log: &'a mut ProjectLog,
    clock: &'a dyn Clock,
    label: String,
}

impl<'a> ProbeScope<'a> {
    fn start(log: &'a mut ProjectLog, clock: &'a dyn Clock, label: String) -> Self {
        log.info(&clock.now(), &format!("Starting request for {label}"));
        Self { log, clock, label }
    }

    fn info(&mut self, message: &str) {
        self.log.info(&self.clock.now(), message);
    }

    fn error(&mut self, message: &str) {
        self.log.error(&self.clock.now(), message);
    }
}

impl Drop for ProbeScope<'_> {
    fn drop(&mut self) {
        let message = format!("Finished request for {}", self.label);
        self.log.info(&self.clock.now(), &message);
    }
}

/// Runs one probe: request, classify, log, and alert the definition's
/// recipients on a wrong status or a transport failure.
pub fn execute_probe(
    definition: &ProbeDefinition,
    transport: &mut dyn ProbeTransport,
    sink: &mut LogSink,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
) -> ProbeOutcome {
    let endpoint = definition.endpoint.as_str();
    let mut scope = ProbeScope::start(
        sink.project(&definition.project_name),
        clock,
        definition.label(),
    );

    let response = transport.execute(definition);
    let outcome = ProbeOutcome::classify(clock.now(), definition.expected_status, response);

    match &outcome.result {
        ProbeResult::Healthy { status } => {
            scope.info(&format!("Request to {endpoint} completed with status {status}"));
        }
        ProbeResult::UnexpectedStatus { expected, actual } => {
            scope.info(&format!("Request to {endpoint} completed with status {actual}"));
            let message = format!("Unexpected status code: Expected {expected}, got {actual}");
            scope.error(&message);
            notify_recipients(
                notifier,
                &definition.notify_emails,
                &format!("Unexpected status code from {endpoint}"),
                &message,
            );
        }
        ProbeResult::TransportFailed(err) => {
            let message = format!("Error during request to {endpoint}: {err}");
            scope.error(&message);
            notify_recipients(
                notifier,
                &definition.notify_emails,
                &format!("Error during request to {endpoint}"),
                &message,
            );
        }
    }

    let error_kind = match &outcome.result {
        ProbeResult::TransportFailed(err) => err.kind.label(),
        _ => "none",
    };
    debug!(
        project = %definition.project_name,
        at = %iso_timestamp(&outcome.ts),
        status = outcome.status(),
        error_kind,
        alert = outcome.is_alert(),
        "probe classified"
    );
    outcome
}
