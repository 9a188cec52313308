use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DwellError;

/// Seconds per hour, used for the hour-scaled dwell figures.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Default length of a ranked top list.
pub const DEFAULT_TOP_K: usize = 5;

/// One ingested row of the network log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// 1-based line number in the source file (header included).
    pub line: u64,
    /// Combined `date` + `time` with full sub-second precision.
    pub timestamp: NaiveDateTime,
    /// Opaque session identifier. Never coerced to a number.
    pub session_id: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub src_ip: Option<String>,
    #[serde(default)]
    pub src_port: Option<u16>,
    #[serde(default)]
    pub dst_ip: Option<String>,
    #[serde(default)]
    pub dst_port: Option<u16>,
    /// Packet size in bytes, when the column is present and numeric.
    #[serde(default)]
    pub packet_size: Option<f64>,
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub http_url: Option<String>,
    /// Free-text metadata (`misc`) column, empty when the schema has none.
    #[serde(default)]
    pub metadata: String,
    /// Resource identifier extracted at parse time, if any.
    #[serde(default)]
    pub resource: Option<String>,
}

impl LogRecord {
    /// Calendar date of the record.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Whether this record can take part in URL/domain dwell analysis.
    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }
}

/// A resource visit derived from a [`LogRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: NaiveDateTime,
    /// Full resource identifier as found in the log.
    pub url: String,
    /// Registrable domain label derived from `url`.
    pub domain: String,
}

/// How the elapsed time between two consecutive events is attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwellFraming {
    /// Time until the next event is charged to the current one; the last
    /// event gets zero.
    #[default]
    Next,
    /// Time since the previous event is charged to the current one; the
    /// first event gets zero.
    Previous,
}

impl std::str::FromStr for DwellFraming {
    type Err = DwellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "next" | "until-next" => Ok(Self::Next),
            "previous" | "since-previous" | "prev" => Ok(Self::Previous),
            other => Err(DwellError::Config(format!("unknown dwell framing: {other}"))),
        }
    }
}

/// Which column layout the input file follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Generic when the header names `session_id` and `misc`, else network.
    #[default]
    Auto,
    /// Fixed 24-column network log; the first row is discarded.
    Network,
    /// Header-named columns with at least `date`, `time`, `session_id`, `misc`.
    Generic,
}

impl std::str::FromStr for SchemaMode {
    type Err = DwellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "network" => Ok(Self::Network),
            "generic" => Ok(Self::Generic),
            other => Err(DwellError::Config(format!("unknown schema: {other}"))),
        }
    }
}

/// Which attribute of an event dwell time is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Url,
    Domain,
}

impl GroupKey {
    /// Select the grouping value from an event.
    pub fn select<'a>(&self, event: &'a DwellEvent) -> &'a str {
        match self {
            GroupKey::Url => &event.url,
            GroupKey::Domain => &event.domain,
        }
    }

    /// Column label used by reports.
    pub fn label(&self) -> &'static str {
        match self {
            GroupKey::Url => "URL",
            GroupKey::Domain => "Domain",
        }
    }
}

/// An [`Event`] annotated with its dwell interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellEvent {
    pub timestamp: NaiveDateTime,
    pub url: String,
    pub domain: String,
    /// Non-negative dwell interval in seconds.
    pub dwell_seconds: f64,
}

impl DwellEvent {
    pub fn dwell_hours(&self) -> f64 {
        self.dwell_seconds / SECONDS_PER_HOUR
    }
}

/// Timestamp irregularities seen while building one session timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockAnomalies {
    /// Adjacent input rows whose timestamp went backwards; these would have
    /// produced a negative interval and were clamped by sorting.
    pub out_of_order: usize,
    /// Adjacent sorted events sharing an identical timestamp.
    pub duplicate_timestamps: usize,
}

impl ClockAnomalies {
    pub fn total(&self) -> usize {
        self.out_of_order + self.duplicate_timestamps
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// The chronologically ordered, dwell-annotated events of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimeline {
    pub session_id: String,
    pub framing: DwellFraming,
    pub events: Vec<DwellEvent>,
    #[serde(default)]
    pub anomalies: ClockAnomalies,
}

impl SessionTimeline {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.events.first().map(|e| e.timestamp)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.events.last().map(|e| e.timestamp)
    }

    /// Sum of every dwell interval in the timeline.
    pub fn total_dwell_seconds(&self) -> f64 {
        self.events.iter().map(|e| e.dwell_seconds).sum()
    }

    /// Elapsed seconds between the first and last event, zero when empty.
    pub fn span_seconds(&self) -> f64 {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => seconds_between(start, end),
            _ => 0.0,
        }
    }
}

/// Total dwell time attributed to one grouping key within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub key: String,
    pub total_seconds: f64,
    /// Number of timeline events that contributed to the total.
    pub events: usize,
}

impl Aggregate {
    pub fn total_hours(&self) -> f64 {
        self.total_seconds / SECONDS_PER_HOUR
    }
}

/// The `k` heaviest aggregates of a session, heaviest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTopList {
    pub group_key: GroupKey,
    pub k: usize,
    pub entries: Vec<Aggregate>,
}

impl RankedTopList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of an analysis step that may legitimately find nothing.
///
/// `NoData` carries a message naming the filter or selection that produced
/// the empty result, so callers can show a "no data" state instead of
/// treating it as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum AnalysisOutcome<T> {
    Data(T),
    NoData(String),
}

impl<T> AnalysisOutcome<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalysisOutcome::NoData(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> AnalysisOutcome<U> {
        match self {
            AnalysisOutcome::Data(value) => AnalysisOutcome::Data(f(value)),
            AnalysisOutcome::NoData(reason) => AnalysisOutcome::NoData(reason),
        }
    }

    /// Convert into a `Result`, mapping `NoData` to
    /// [`DwellError::NoMatchingData`].
    pub fn into_result(self) -> crate::error::Result<T> {
        match self {
            AnalysisOutcome::Data(value) => Ok(value),
            AnalysisOutcome::NoData(reason) => Err(DwellError::NoMatchingData(reason)),
        }
    }
}

/// Elapsed seconds from `from` to `to`, including the sub-second part.
///
/// Negative when `to` precedes `from`.
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    if let Some(nanos) = delta.num_nanoseconds() {
        return nanos as f64 / 1_000_000_000.0;
    }
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
