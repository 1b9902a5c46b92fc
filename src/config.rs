use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PROJECT_NAME: &str = "default_project";
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// One row of the probe table, immutable for the lifetime of a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeDefinition {
    pub client: String,
    pub project_name: String,
    pub endpoint: String,
    pub expected_status: u16,
    pub notify_emails: Vec<String>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub http_method: HttpMethod,
}

impl ProbeDefinition {
    pub fn new(project_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: String::new(),
            project_name: project_name.into(),
            endpoint: endpoint.into(),
            expected_status: DEFAULT_EXPECTED_STATUS,
            notify_emails: Vec::new(),
            body: None,
            headers: BTreeMap::new(),
            http_method: HttpMethod::Get,
        }
    }

    /// `<client> - <project>`, used in the start and finish log lines.
    pub fn label(&self) -> String {
        format!("{} - {}", self.client, self.project_name)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Other(String),
}

impl HttpMethod {
    /// Upper-cases the token; blank input means GET.
    pub fn parse(input: &str) -> Self {
        let upper = input.trim().to_ascii_uppercase();
        match upper.as_str() {
            "" | "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(verb) => verb,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mail relay settings. Sessions are always STARTTLS + credentials.
#[derive(Clone, Debug, Serialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.example.com".to_string(),
            port: DEFAULT_SMTP_PORT,
            username: "user@example.com".to_string(),
            password: SecretString::new("password"),
            from: "sender@example.com".to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
