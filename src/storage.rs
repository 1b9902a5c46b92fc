//! Loads probe definitions from the `;`-delimited probe table.
//!
//! Parsing is best effort per field: malformed JSON or status values fall
//! back to their defaults with a warning, and the row is still produced.

use crate::config::{DEFAULT_EXPECTED_STATUS, DEFAULT_PROJECT_NAME, HttpMethod, ProbeDefinition};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open probe table {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read probe table header: {0}")]
    Header(#[from] csv::Error),
}

#[derive(Debug, Error)]
enum FieldError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("expected {0}")]
    Shape(&'static str),
    #[error("not a status code: {0}")]
    Status(#[from] std::num::ParseIntError),
}

#[derive(Debug, Default, Deserialize)]
struct RawRow {
    client: Option<String>,
    project_name: Option<String>,
    endpoint: Option<String>,
    expected_http_status: Option<String>,
    notify_emails: Option<String>,
    headers_json: Option<String>,
    body_json: Option<String>,
    http_method: Option<String>,
}

pub fn read_probe_definitions(path: &Path) -> Result<Vec<ProbeDefinition>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_probe_definitions(file)
}

pub fn parse_probe_definitions<R: Read>(input: R) -> Result<Vec<ProbeDefinition>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);
    let headers = lossy_record(reader.byte_headers()?);

    let mut definitions = Vec::new();
    for (index, record) in reader.byte_records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = record.and_then(|record| lossy_record(&record).deserialize::<RawRow>(Some(&headers)));
        match row {
            Ok(raw) => definitions.push(into_definition(raw, line)),
            Err(err) => warn!(line, error = %err, "skipping unreadable probe row"),
        }
    }
    Ok(definitions)
}

/// Invalid UTF-8 becomes U+FFFD instead of costing the whole row.
fn lossy_record(record: &csv::ByteRecord) -> csv::StringRecord {
    record
        .iter()
        .map(String::from_utf8_lossy)
        .collect()
}

fn into_definition(raw: RawRow, line: usize) -> ProbeDefinition {
    let project_name = raw
        .project_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

    ProbeDefinition {
        client: raw.client.unwrap_or_default(),
        project_name,
        endpoint: raw.endpoint.map(|e| e.trim().to_string()).unwrap_or_default(),
        expected_status: decode_or(
            raw.expected_http_status.as_deref(),
            "expected_http_status",
            line,
            DEFAULT_EXPECTED_STATUS,
            |text| Ok(text.trim().parse::<u16>()?),
        ),
        notify_emails: split_emails(raw.notify_emails.as_deref().unwrap_or_default()),
        headers: decode_or_default(raw.headers_json.as_deref(), "headers_json", line, parse_headers),
        body: decode_or_default(raw.body_json.as_deref(), "body_json", line, parse_body),
        http_method: HttpMethod::parse(raw.http_method.as_deref().unwrap_or_default()),
    }
}

fn decode_or_default<T: Default>(
    raw: Option<&str>,
    field: &'static str,
    line: usize,
    decode: impl FnOnce(&str) -> Result<T, FieldError>,
) -> T {
    decode_or(raw, field, line, T::default(), decode)
}

/// Blank input yields `fallback` silently; undecodable input yields it with a warning.
fn decode_or<T>(
    raw: Option<&str>,
    field: &'static str,
    line: usize,
    fallback: T,
    decode: impl FnOnce(&str) -> Result<T, FieldError>,
) -> T {
    let Some(text) = raw.filter(|text| !text.trim().is_empty()) else {
        return fallback;
    };
    match decode(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(line, field, value = text, error = %err, "invalid field, using default");
            fallback
        }
    }
}

fn parse_headers(text: &str) -> Result<BTreeMap<String, String>, FieldError> {
    let Value::Object(map) = serde_json::from_str::<Value>(text)? else {
        return Err(FieldError::Shape("a JSON object"));
    };

    map.into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(FieldError::Shape("scalar header values"));
                }
            };
            Ok((name, value))
        })
        .collect()
}

/// JSON `null` means no payload, same as an empty cell.
fn parse_body(text: &str) -> Result<Option<Value>, FieldError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

fn split_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .collect()
}
