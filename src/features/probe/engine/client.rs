use super::ProbeTransport;
use super::helpers::{RequestPlan, build_header_list, header_lines, is_redirect, map_curl_error};
use crate::common::net::{EndpointError, parse_endpoint_url};
use crate::config::{HttpMethod, ProbeDefinition};
use crate::probe::{ProbeError, ProbeErrorKind, ProbeResponse};
use curl::Error as CurlError;
use curl::easy::{Easy2, Handler, WriteError};
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("probewatch/", env!("CARGO_PKG_VERSION"));

/// Response bodies are drained, never stored. Past this many bytes the
/// transfer is cut short; the status line has already arrived by then.
const DEFAULT_MAX_READ_BYTES: u64 = 64 * 1024;

const MAX_REDIRECTS: usize = 30;

#[derive(Default)]
struct BodyCollector {
    bytes: u64,
    limit: u64,
    limit_reached: bool,
}

impl BodyCollector {
    fn reset(&mut self, limit: u64) {
        self.bytes = 0;
        self.limit = limit;
        self.limit_reached = false;
    }
}

impl Handler for BodyCollector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        let len = data.len() as u64;
        let take = if self.limit == 0 {
            len
        } else {
            let remaining = self.limit.saturating_sub(self.bytes);
            len.min(remaining)
        };

        self.bytes = self.bytes.saturating_add(take);
        if self.limit > 0 && self.bytes >= self.limit {
            self.limit_reached = true;
        }

        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        if self.limit == 0 {
            return true;
        }

        if self.limit_reached {
            return false;
        }

        if dlnow >= self.limit as f64 {
            self.limit_reached = true;
            return false;
        }

        true
    }
}

/// Blocking libcurl transport. One easy handle is reused for every probe.
pub struct ProbeClient {
    easy: Easy2<BodyCollector>,
    timeout: Duration,
    max_read_bytes: u64,
}

impl ProbeClient {
    pub fn new(timeout: Duration) -> Result<Self, CurlError> {
        let mut easy = Easy2::new(BodyCollector::default());
        easy.follow_location(false)?;
        easy.accept_encoding("")?;
        Ok(Self {
            easy,
            timeout,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        })
    }

    fn prepare(&mut self, plan: &RequestPlan, url: &Url) -> Result<(), CurlError> {
        self.easy.reset();
        self.easy.get_mut().reset(self.max_read_bytes);
        // Redirects are walked in `execute` so each hop can rebuild its verb.
        self.easy.follow_location(false)?;
        self.easy.accept_encoding("")?;
        self.easy.progress(true)?;
        self.easy.useragent(USER_AGENT)?;
        self.easy.url(url.as_str())?;
        self.easy.timeout(self.timeout)?;

        match (&plan.method, &plan.payload) {
            (HttpMethod::Head, _) => self.easy.nobody(true)?,
            (HttpMethod::Get, None) => self.easy.get(true)?,
            (method, None) => self.easy.custom_request(method.as_str())?,
            (method, Some(bytes)) => {
                // Setting the payload switches curl to POST; restore the verb.
                self.easy.post_fields_copy(bytes)?;
                self.easy.custom_request(method.as_str())?;
            }
        }

        let lines = header_lines(&plan.headers, plan.payload.is_some());
        if !lines.is_empty() {
            self.easy.http_headers(build_header_list(&lines)?)?;
        }
        Ok(())
    }

    /// One request/response exchange, no redirect handling.
    fn perform_hop(&mut self, plan: &RequestPlan, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.prepare(plan, url).map_err(|err| map_curl_error(&err))?;

        let perform_result = self.easy.perform();
        if let Err(err) = perform_result {
            let aborted_by_limit = self.easy.get_ref().limit_reached
                && (err.is_write_error() || err.is_aborted_by_callback());
            if !aborted_by_limit {
                return Err(map_curl_error(&err));
            }
        }

        let status = self.easy.response_code().map_err(|err| map_curl_error(&err))?;
        let status = u16::try_from(status)
            .ok()
            .filter(|code| *code > 0)
            .ok_or_else(|| {
                ProbeError::new(
                    ProbeErrorKind::Protocol,
                    format!("no usable HTTP status received (got {status})"),
                )
            })?;

        let response = ProbeResponse {
            status,
            body_bytes: self.easy.get_ref().bytes,
            elapsed: self.easy.total_time().unwrap_or_default(),
        };
        debug!(
            endpoint = %url,
            method = %plan.method,
            status = response.status,
            bytes = response.body_bytes,
            elapsed_ms = response.elapsed.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            "probe request completed"
        );
        Ok(response)
    }

    /// Absolute target of the redirect just received, if any.
    fn redirect_target(&mut self, status: u16) -> Result<Option<String>, ProbeError> {
        if !is_redirect(status) {
            return Ok(None);
        }
        let target = self.easy.redirect_url().map_err(|err| map_curl_error(&err))?;
        Ok(target.map(str::to_string))
    }
}

fn invalid_url(err: EndpointError) -> ProbeError {
    ProbeError::new(ProbeErrorKind::InvalidUrl, err.to_string())
}

impl ProbeTransport for ProbeClient {
    /// Follows up to `MAX_REDIRECTS` redirects; the final status is the
    /// one reported.
    fn execute(&mut self, definition: &ProbeDefinition) -> Result<ProbeResponse, ProbeError> {
        let mut url = parse_endpoint_url(&definition.endpoint).map_err(invalid_url)?;
        let mut plan = RequestPlan::from_definition(definition);
        let mut elapsed = Duration::ZERO;
        let mut hops = 0;

        loop {
            let mut response = self.perform_hop(&plan, &url)?;
            elapsed += response.elapsed;

            let Some(target) = self.redirect_target(response.status)? else {
                response.elapsed = elapsed;
                return Ok(response);
            };
            if hops == MAX_REDIRECTS {
                return Err(ProbeError::new(
                    ProbeErrorKind::Protocol,
                    format!("exceeded {MAX_REDIRECTS} redirects"),
                ));
            }
            hops += 1;

            debug!(from = %url, to = %target, status = response.status, "following redirect");
            url = parse_endpoint_url(&target).map_err(invalid_url)?;
            plan = plan.follow(response.status);
        }
    }
}
