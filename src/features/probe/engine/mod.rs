mod client;
mod helpers;

pub use client::ProbeClient;

use crate::config::ProbeDefinition;
use crate::probe::{ProbeError, ProbeResponse};

/// Issues the single HTTP request behind a probe.
///
/// Implementations enforce their own timeout and report it as a
/// [`ProbeError`], the same as any other transport failure.
pub trait ProbeTransport {
    fn execute(&mut self, definition: &ProbeDefinition) -> Result<ProbeResponse, ProbeError>;
}
