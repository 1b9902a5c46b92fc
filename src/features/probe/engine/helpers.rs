use crate::config::{HttpMethod, ProbeDefinition};
use crate::probe::{ProbeError, ProbeErrorKind};
use curl::Error as CurlError;
use curl::easy::List;
use serde_json::Value;
use std::collections::BTreeMap;

pub(super) fn map_curl_error(err: &CurlError) -> ProbeError {
    let message = err.to_string();

    let kind = if err.is_couldnt_resolve_host() || err.is_couldnt_resolve_proxy() {
        ProbeErrorKind::Dns
    } else if err.is_operation_timedout() {
        ProbeErrorKind::Timeout
    } else if err.is_couldnt_connect() {
        ProbeErrorKind::Connect
    } else if err.is_ssl_connect_error()
        || err.is_peer_failed_verification()
        || err.is_ssl_cacert()
        || err.is_ssl_certproblem()
        || err.is_ssl_cipher()
    {
        ProbeErrorKind::Tls
    } else if err.is_url_malformed() || err.is_unsupported_protocol() {
        ProbeErrorKind::InvalidUrl
    } else if err.is_got_nothing() || err.is_http2_error() {
        ProbeErrorKind::Protocol
    } else {
        ProbeErrorKind::Io
    };

    ProbeError { kind, message }
}

/// Method, payload and headers for one hop of a request.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct RequestPlan {
    pub method: HttpMethod,
    pub payload: Option<Vec<u8>>,
    pub headers: BTreeMap<String, String>,
}

impl RequestPlan {
    /// HEAD never carries a payload.
    pub fn from_definition(definition: &ProbeDefinition) -> Self {
        let payload = match definition.http_method {
            HttpMethod::Head => None,
            _ => request_payload(definition.body.as_ref()),
        };
        Self {
            method: definition.http_method.clone(),
            payload,
            headers: definition.headers.clone(),
        }
    }

    /// The hop that follows a `status` redirect. 307 and 308 replay the
    /// request unchanged. Other redirects drop the payload and its content
    /// headers; 302, 303 and a POST answered with 301 continue as GET.
    pub fn follow(&self, status: u16) -> Self {
        if matches!(status, 307 | 308) {
            return self.clone();
        }

        let method = match (status, &self.method) {
            (_, HttpMethod::Head) => HttpMethod::Head,
            (302 | 303, _) | (301, HttpMethod::Post) => HttpMethod::Get,
            (_, method) => method.clone(),
        };
        let headers = self
            .headers
            .iter()
            .filter(|(name, _)| !is_content_header(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            method,
            payload: None,
            headers,
        }
    }
}

pub(super) fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn is_content_header(name: &str) -> bool {
    ["content-type", "content-length", "transfer-encoding"]
        .iter()
        .any(|header| name.eq_ignore_ascii_case(header))
}

/// Compact JSON payload; `None` means the request carries no body.
pub(super) fn request_payload(body: Option<&Value>) -> Option<Vec<u8>> {
    body.map(|value| value.to_string().into_bytes())
}

pub(super) fn header_lines(headers: &BTreeMap<String, String>, has_payload: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(headers.len() + 2);
    let mut has_content_type = false;

    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        // curl drops `Name:` entirely; `Name;` sends an empty value.
        if value.is_empty() {
            lines.push(format!("{name};"));
        } else {
            lines.push(format!("{name}: {value}"));
        }
    }

    if has_payload {
        if !has_content_type {
            lines.push("Content-Type: application/json".to_string());
        }
        lines.push("Expect:".to_string());
    }

    lines
}

pub(super) fn build_header_list(lines: &[String]) -> Result<List, CurlError> {
    let mut list = List::new();
    for line in lines {
        list.append(line)?;
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::{RequestPlan, header_lines, is_redirect, map_curl_error, request_payload};
    use crate::config::{HttpMethod, ProbeDefinition};
    use crate::probe::ProbeErrorKind;
    use curl::Error as CurlError;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn curl_errors_map_to_probe_kinds() {
        assert_eq!(map_curl_error(&CurlError::new(6)).kind, ProbeErrorKind::Dns);
        assert_eq!(map_curl_error(&CurlError::new(7)).kind, ProbeErrorKind::Connect);
        assert_eq!(map_curl_error(&CurlError::new(28)).kind, ProbeErrorKind::Timeout);
        assert_eq!(map_curl_error(&CurlError::new(35)).kind, ProbeErrorKind::Tls);
        assert_eq!(map_curl_error(&CurlError::new(3)).kind, ProbeErrorKind::InvalidUrl);
        assert_eq!(map_curl_error(&CurlError::new(52)).kind, ProbeErrorKind::Protocol);
        assert_eq!(map_curl_error(&CurlError::new(56)).kind, ProbeErrorKind::Io);
    }

    #[test]
    fn curl_error_message_is_kept() {
        let err = map_curl_error(&CurlError::new(7));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn payload_is_compact_json() {
        let body = json!({"key": "value"});
        let payload = request_payload(Some(&body)).expect("payload");
        assert_eq!(payload, br#"{"key":"value"}"#.to_vec());
        assert!(request_payload(None).is_none());
    }

    #[test]
    fn header_lines_without_payload_are_verbatim() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer abc".to_string());
        headers.insert("X-Empty".to_string(), String::new());

        let lines = header_lines(&headers, false);
        assert_eq!(lines, vec!["Authorization: Bearer abc", "X-Empty;"]);
    }

    #[test]
    fn header_lines_add_json_content_type_for_payload() {
        let lines = header_lines(&BTreeMap::new(), true);
        assert_eq!(lines, vec!["Content-Type: application/json", "Expect:"]);
    }

    #[test]
    fn header_lines_keep_explicit_content_type() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        let lines = header_lines(&headers, true);
        assert_eq!(lines, vec!["content-type: text/plain", "Expect:"]);
    }

    fn post_plan() -> RequestPlan {
        let mut definition = ProbeDefinition::new("Orders", "http://example.com/orders");
        definition.http_method = HttpMethod::Post;
        definition.body = Some(json!({"id": 7}));
        definition
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        definition
            .headers
            .insert("Authorization".to_string(), "Bearer abc".to_string());
        RequestPlan::from_definition(&definition)
    }

    #[test]
    fn head_plan_drops_the_payload() {
        let mut definition = ProbeDefinition::new("Ping", "http://example.com");
        definition.http_method = HttpMethod::Head;
        definition.body = Some(json!({"ignored": true}));

        let plan = RequestPlan::from_definition(&definition);
        assert_eq!(plan.method, HttpMethod::Head);
        assert!(plan.payload.is_none());
    }

    #[test]
    fn see_other_and_found_switch_to_get_without_body() {
        for status in [302, 303] {
            let next = post_plan().follow(status);
            assert_eq!(next.method, HttpMethod::Get);
            assert!(next.payload.is_none());
            assert!(!next.headers.contains_key("Content-Type"));
            assert_eq!(next.headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
        }
    }

    #[test]
    fn moved_permanently_only_rewrites_post() {
        assert_eq!(post_plan().follow(301).method, HttpMethod::Get);

        let mut put = post_plan();
        put.method = HttpMethod::Put;
        let next = put.follow(301);
        assert_eq!(next.method, HttpMethod::Put);
        assert!(next.payload.is_none());
    }

    #[test]
    fn temporary_and_permanent_redirects_replay_the_request() {
        for status in [307, 308] {
            assert_eq!(post_plan().follow(status), post_plan());
        }
    }

    #[test]
    fn head_stays_head_across_redirects() {
        let mut plan = post_plan();
        plan.method = HttpMethod::Head;
        assert_eq!(plan.follow(303).method, HttpMethod::Head);
    }

    #[test]
    fn redirect_statuses() {
        assert!(is_redirect(301));
        assert!(is_redirect(308));
        assert!(!is_redirect(300));
        assert!(!is_redirect(304));
        assert!(!is_redirect(200));
    }
}
