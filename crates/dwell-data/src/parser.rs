//! Row → [`LogRecord`] conversion.
//!
//! Also hosts the two pure string helpers the dwell analysis depends on:
//! [`extract_resource`] pulls the `HttpUrl=` token out of free-text metadata
//! and [`registrable_domain`] reduces a URL-like string to its registrable
//! domain label.

use std::sync::OnceLock;

use dwell_core::error::DwellError;
use dwell_core::models::LogRecord;
use dwell_core::time_utils::parse_log_timestamp;
use regex::Regex;
use thiserror::Error;
use url::{Host, Url};

use crate::schema::Schema;

// ── RowError ──────────────────────────────────────────────────────────────────

/// Why a single row was rejected. Rows are skipped, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unparseable timestamp \"{value}\"")]
    Timestamp { line: u64, value: String },

    #[error("line {line}: missing session identifier")]
    MissingSession { line: u64 },

    #[error("line {line}: unreadable row: {reason}")]
    Unreadable { line: u64, reason: String },
}

impl RowError {
    pub fn line(&self) -> u64 {
        match self {
            RowError::FieldCount { line, .. }
            | RowError::Timestamp { line, .. }
            | RowError::MissingSession { line }
            | RowError::Unreadable { line, .. } => *line,
        }
    }
}

impl From<RowError> for DwellError {
    fn from(err: RowError) -> Self {
        let line = err.line();
        let reason = match &err {
            RowError::FieldCount {
                expected, found, ..
            } => format!("expected {expected} fields, found {found}"),
            RowError::Timestamp { value, .. } => format!("unparseable timestamp \"{value}\""),
            RowError::MissingSession { .. } => "missing session identifier".to_string(),
            RowError::Unreadable { reason, .. } => reason.clone(),
        };
        DwellError::MalformedRow { line, reason }
    }
}

// ── Resource extraction ───────────────────────────────────────────────────────

fn http_url_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"HttpUrl=(\S+)").expect("regex is valid"))
}

/// Find the `HttpUrl=<token>` locator in a metadata string.
///
/// `<token>` is the maximal run of non-whitespace after the `=`. Returns
/// `None` when the label is absent or has nothing after it.
pub fn extract_resource(metadata: &str) -> Option<String> {
    http_url_token()
        .captures(metadata)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// ── Domain extraction ─────────────────────────────────────────────────────────

fn scheme_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("regex is valid"))
}

/// Reduce a URL-like string to its registrable domain label.
///
/// `https://sub.example.co.uk/path` → `example`. A missing scheme is not an
/// error (`sub.example.com/x` → `example`). IP hosts are returned verbatim,
/// single-label hosts (`localhost`) are returned as-is, and strings with no
/// recognisable host yield an empty string.
pub fn registrable_domain(resource: &str) -> String {
    match host_of(resource) {
        Some(HostPart::Ip(ip)) => ip,
        Some(HostPart::Name(name)) => domain_label(&name),
        None => String::new(),
    }
}

enum HostPart {
    Ip(String),
    Name(String),
}

fn host_of(resource: &str) -> Option<HostPart> {
    let trimmed = resource.trim();
    // A bare path carries no host.
    if trimmed.is_empty() || (trimmed.starts_with('/') && !trimmed.starts_with("//")) {
        return None;
    }

    let candidate = if scheme_prefix().is_match(trimmed) {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("http://{rest}")
    } else {
        format!("http://{trimmed}")
    };

    match Url::parse(&candidate) {
        Ok(url) => match url.host() {
            Some(Host::Domain(d)) => Some(HostPart::Name(d.to_string())),
            Some(Host::Ipv4(ip)) => Some(HostPart::Ip(ip.to_string())),
            Some(Host::Ipv6(ip)) => Some(HostPart::Ip(ip.to_string())),
            None => None,
        },
        Err(_) => host_by_hand(&candidate).map(HostPart::Name),
    }
}

/// Fallback authority extraction for strings the URL parser rejects.
fn host_by_hand(candidate: &str) -> Option<String> {
    let after_scheme = match scheme_prefix().find(candidate) {
        Some(m) => &candidate[m.end()..],
        None => candidate,
    };
    let authority = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default();
    let host = host.trim_matches('.').to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Label immediately left of the public suffix, per the public suffix list.
///
/// A host that is itself a public suffix (or a bare label) keeps its leading
/// label.
fn domain_label(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let registrable = psl::domain(host.as_bytes())
        .and_then(|d| std::str::from_utf8(d.as_bytes()).ok())
        .and_then(|d| d.split('.').next())
        .filter(|label| !label.is_empty());
    match registrable {
        Some(label) => label.to_string(),
        None => host
            .split('.')
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string(),
    }
}

// ── Row parsing ───────────────────────────────────────────────────────────────

/// Convert one trimmed CSV row into a [`LogRecord`].
///
/// `line` is the 1-based line number used in error reports.
pub fn parse_row(fields: &[&str], schema: &Schema, line: u64) -> Result<LogRecord, RowError> {
    if fields.len() != schema.width() {
        return Err(RowError::FieldCount {
            line,
            expected: schema.width(),
            found: fields.len(),
        });
    }

    let get = |pos: usize| -> Option<&str> {
        fields
            .get(pos)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    };
    let get_opt = |pos: Option<usize>| pos.and_then(get);

    let date = get(schema.date).unwrap_or_default();
    let time = get(schema.time).unwrap_or_default();
    let timestamp = parse_log_timestamp(date, time).map_err(|_| RowError::Timestamp {
        line,
        value: format!("{date} {time}").trim().to_string(),
    })?;

    let session_id = get(schema.session_id)
        .ok_or(RowError::MissingSession { line })?
        .to_string();

    let metadata = schema
        .metadata
        .iter()
        .filter_map(|&pos| get(pos))
        .collect::<Vec<_>>()
        .join(" ");

    let http_url = get_opt(schema.http_url).map(str::to_string);
    let resource = extract_resource(&metadata).or_else(|| {
        http_url
            .as_deref()
            .filter(|u| *u != "-")
            .map(str::to_string)
    });

    Ok(LogRecord {
        line,
        timestamp,
        session_id,
        protocol: get_opt(schema.protocol).map(str::to_string),
        src_ip: get_opt(schema.src_ip).map(str::to_string),
        src_port: get_opt(schema.src_port).and_then(|p| p.parse().ok()),
        dst_ip: get_opt(schema.dst_ip).map(str::to_string),
        dst_port: get_opt(schema.dst_port).and_then(|p| p.parse().ok()),
        packet_size: get_opt(schema.packet_size)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite()),
        http_method: get_opt(schema.http_method).map(str::to_string),
        http_url,
        metadata,
        resource,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
