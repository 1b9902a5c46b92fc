use chrono::{DateTime, Local};
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProbeErrorKind {
    InvalidUrl,
    Dns,
    Connect,
    Timeout,
    Tls,
    Protocol,
    Io,
}

impl ProbeErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeErrorKind::InvalidUrl => "invalid_url",
            ProbeErrorKind::Dns => "dns",
            ProbeErrorKind::Connect => "connect",
            ProbeErrorKind::Timeout => "timeout",
            ProbeErrorKind::Tls => "tls",
            ProbeErrorKind::Protocol => "protocol",
            ProbeErrorKind::Io => "io",
        }
    }
}

/// A request that never produced an HTTP status.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub message: String,
}

impl ProbeError {
    pub fn new(kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body_bytes: u64,
    pub elapsed: Duration,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProbeResult {
    Healthy { status: u16 },
    UnexpectedStatus { expected: u16, actual: u16 },
    TransportFailed(ProbeError),
}

#[derive(Clone, Debug)]
pub struct ProbeOutcome {
    pub ts: DateTime<Local>,
    pub result: ProbeResult,
}

impl ProbeOutcome {
    pub fn classify(
        ts: DateTime<Local>,
        expected: u16,
        response: Result<ProbeResponse, ProbeError>,
    ) -> Self {
        let result = match response {
            Ok(response) if response.status == expected => ProbeResult::Healthy {
                status: response.status,
            },
            Ok(response) => ProbeResult::UnexpectedStatus {
                expected,
                actual: response.status,
            },
            Err(err) => ProbeResult::TransportFailed(err),
        };
        Self { ts, result }
    }

    /// Wrong status and transport failures both count as alerts.
    pub fn is_alert(&self) -> bool {
        !matches!(self.result, ProbeResult::Healthy { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self.result {
            ProbeResult::Healthy { status } => Some(status),
            ProbeResult::UnexpectedStatus { actual, .. } => Some(actual),
            ProbeResult::TransportFailed(_) => None,
        }
    }
}
