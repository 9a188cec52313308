//! Summary statistics over a filtered view of the whole log.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use dwell_core::formatting::format_percent;
use dwell_core::models::{AnalysisOutcome, LogRecord};
use dwell_core::stats::{relative_frequencies, top_n, Describe, Frequency, ValueCount};
use dwell_core::time_utils::floor_to_minute;
use serde::Serialize;
use tracing::debug;

use crate::timeline::session_durations;

/// Length of every top list in the summary.
pub const SUMMARY_TOP_N: usize = 5;

// ── Filter ────────────────────────────────────────────────────────────────────

/// Row filter applied before summarising.
///
/// `protocols: None` admits every record. Missing dates default to the
/// earliest / latest date present in the data; both bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub protocols: Option<HashSet<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SummaryFilter {
    fn admits(&self, record: &LogRecord, start: NaiveDate, end: NaiveDate) -> bool {
        let date = record.date();
        if date < start || date > end {
            return false;
        }
        match &self.protocols {
            None => true,
            Some(allowed) => record
                .protocol
                .as_deref()
                .is_some_and(|p| allowed.contains(p)),
        }
    }

    fn describe(&self, start: NaiveDate, end: NaiveDate) -> String {
        let protocols = match &self.protocols {
            None => "all protocols".to_string(),
            Some(set) => {
                let mut names: Vec<&str> = set.iter().map(String::as_str).collect();
                names.sort_unstable();
                format!("protocols [{}]", names.join(", "))
            }
        };
        format!("{protocols} between {start} and {end}")
    }
}

// ── Report types ──────────────────────────────────────────────────────────────

/// Packet-size statistics of one protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolPacketSizes {
    pub protocol: String,
    pub stats: Describe,
}

/// Number of records falling in one minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficBucket {
    pub minute: NaiveDateTime,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_records: usize,
    pub filtered_records: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub protocol_distribution: Vec<Frequency<String>>,
    pub most_common_protocol: Option<Frequency<String>>,
    pub least_common_protocol: Option<Frequency<String>>,
    pub top_src_ips: Vec<ValueCount<String>>,
    pub top_dst_ips: Vec<ValueCount<String>>,
    pub top_http_methods: Vec<ValueCount<String>>,
    pub top_http_urls: Vec<ValueCount<String>>,
    pub packet_size: Option<Describe>,
    pub packet_size_by_protocol: Vec<ProtocolPacketSizes>,
    pub session_duration: Option<Describe>,
    pub traffic_per_minute: Vec<TrafficBucket>,
}

impl SummaryReport {
    /// Human-readable one-line observations.
    pub fn insights(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(most) = &self.most_common_protocol {
            lines.push(format!(
                "The most common protocol is {} with a frequency of {}.",
                most.value,
                format_percent(most.frequency)
            ));
        }
        if let Some(least) = &self.least_common_protocol {
            lines.push(format!(
                "The least common protocol is {} with a frequency of {}.",
                least.value,
                format_percent(least.frequency)
            ));
        }

        let top_lists = [
            ("source IP", &self.top_src_ips),
            ("destination IP", &self.top_dst_ips),
            ("HTTP method", &self.top_http_methods),
            ("HTTP URL", &self.top_http_urls),
        ];
        for (label, list) in top_lists {
            if let Some(first) = list.first() {
                lines.push(format!(
                    "The most frequent {} is {} with {} occurrences.",
                    label, first.value, first.count
                ));
            }
        }

        lines
    }
}

// ── Reporter ──────────────────────────────────────────────────────────────────

pub struct SummaryReporter;

impl SummaryReporter {
    /// Summarise the records admitted by `filter`.
    ///
    /// Session durations are measured over every record of a session, not
    /// only the admitted ones, and attributed to each admitted record.
    pub fn report(records: &[LogRecord], filter: &SummaryFilter) -> AnalysisOutcome<SummaryReport> {
        let Some((data_start, data_end)) = date_bounds(records) else {
            return AnalysisOutcome::NoData("the log contains no records".to_string());
        };
        let start = filter.start_date.unwrap_or(data_start);
        let end = filter.end_date.unwrap_or(data_end);

        let filtered: Vec<&LogRecord> = records
            .iter()
            .filter(|r| filter.admits(r, start, end))
            .collect();
        if filtered.is_empty() {
            return AnalysisOutcome::NoData(format!(
                "no records match {}",
                filter.describe(start, end)
            ));
        }
        debug!(
            "Summary over {} of {} records",
            filtered.len(),
            records.len()
        );

        let protocol_distribution =
            relative_frequencies(filtered.iter().filter_map(|r| r.protocol.clone()));
        let most_common_protocol = protocol_distribution.first().cloned();
        let least_common_protocol = least_common(&protocol_distribution);

        let packet_sizes: Vec<f64> = filtered.iter().filter_map(|r| r.packet_size).collect();

        let durations = session_durations(records);
        let session_duration_values: Vec<f64> = filtered
            .iter()
            .filter_map(|r| durations.get(&r.session_id).copied())
            .collect();

        AnalysisOutcome::Data(SummaryReport {
            total_records: records.len(),
            filtered_records: filtered.len(),
            start_date: start,
            end_date: end,
            protocol_distribution,
            most_common_protocol,
            least_common_protocol,
            top_src_ips: top_n(filtered.iter().filter_map(|r| r.src_ip.clone()), SUMMARY_TOP_N),
            top_dst_ips: top_n(filtered.iter().filter_map(|r| r.dst_ip.clone()), SUMMARY_TOP_N),
            top_http_methods: top_n(
                filtered.iter().filter_map(|r| r.http_method.clone()),
                SUMMARY_TOP_N,
            ),
            top_http_urls: top_n(
                filtered
                    .iter()
                    .filter_map(|r| r.http_url.clone().or_else(|| r.resource.clone())),
                SUMMARY_TOP_N,
            ),
            packet_size: Describe::from_values(&packet_sizes),
            packet_size_by_protocol: packet_sizes_by_protocol(&filtered),
            session_duration: Describe::from_values(&session_duration_values),
            traffic_per_minute: traffic_per_minute(&filtered),
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Rarest value; among ties, the one encountered first.
fn least_common(distribution: &[Frequency<String>]) -> Option<Frequency<String>> {
    let min = distribution
        .iter()
        .map(|f| f.frequency)
        .min_by(f64::total_cmp)?;
    distribution.iter().find(|f| f.frequency == min).cloned()
}

fn date_bounds(records: &[LogRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let first = records.first()?.date();
    Some(records.iter().fold((first, first), |(lo, hi), r| {
        let d = r.date();
        (lo.min(d), hi.max(d))
    }))
}

/// Packet-size statistics per protocol, protocols in first-occurrence order.
fn packet_sizes_by_protocol(records: &[&LogRecord]) -> Vec<ProtocolPacketSizes> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<f64>)> = Vec::new();

    for record in records {
        let (Some(protocol), Some(size)) = (record.protocol.as_deref(), record.packet_size) else {
            continue;
        };
        match index.get(protocol) {
            Some(&i) => groups[i].1.push(size),
            None => {
                index.insert(protocol, groups.len());
                groups.push((protocol, vec![size]));
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(protocol, sizes)| {
            Describe::from_values(&sizes).map(|stats| ProtocolPacketSizes {
                protocol: protocol.to_string(),
                stats,
            })
        })
        .collect()
}

/// Record counts per minute from the first to the last record's minute,
/// empty minutes included.
fn traffic_per_minute(records: &[&LogRecord]) -> Vec<TrafficBucket> {
    let mut counts: HashMap<NaiveDateTime, usize> = HashMap::new();
    for record in records {
        *counts.entry(floor_to_minute(record.timestamp)).or_insert(0) += 1;
    }
    let (Some(&first), Some(&last)) = (counts.keys().min(), counts.keys().max()) else {
        return Vec::new();
    };

    let mut buckets = Vec::new();
    let mut minute = first;
    while minute <= last {
        buckets.push(TrafficBucket {
            minute,
            records: counts.get(&minute).copied().unwrap_or(0),
        });
        minute += Duration::minutes(1);
    }
    buckets
}

// ── Tests ─────────────────────────────────────────────────────────────────────
