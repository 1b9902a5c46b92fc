use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint is empty")]
    Empty,
    #[error("invalid endpoint URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported URL scheme '{0}'")]
    Scheme(String),
}

/// Probes only speak HTTP(S); anything else curl would happily fetch is rejected.
pub fn parse_endpoint_url(input: &str) -> Result<Url, EndpointError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::Empty);
    }
    let url = Url::parse(trimmed)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EndpointError::Scheme(other.to_string())),
    }
}
