//! Session timeline construction.
//!
//! Selects one session's events, orders them chronologically and annotates
//! each with its dwell interval.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use dwell_core::models::{
    seconds_between, ClockAnomalies, DwellEvent, DwellFraming, Event, LogRecord, SessionTimeline,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::parser::registrable_domain;

// ── SessionInfo ───────────────────────────────────────────────────────────────

/// Overview of one session identifier present in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    /// All records carrying this identifier.
    pub records: usize,
    /// Records that carry a resource identifier.
    pub resource_events: usize,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
}

impl SessionInfo {
    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.first_seen, self.last_seen)
    }
}

// ── TimelineBuilder ───────────────────────────────────────────────────────────

/// Builds [`SessionTimeline`]s under a fixed dwell framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineBuilder {
    framing: DwellFraming,
}

impl TimelineBuilder {
    pub fn new(framing: DwellFraming) -> Self {
        Self { framing }
    }

    /// Build the dwell timeline for `session_id`.
    ///
    /// Only records with a resource identifier take part. A session with no
    /// such records yields an empty timeline.
    pub fn build(&self, records: &[LogRecord], session_id: &str) -> SessionTimeline {
        self.from_records(
            session_id,
            records.iter().filter(|r| r.session_id == session_id),
        )
    }

    /// Build a timeline from records already known to belong to `session_id`,
    /// given in input order.
    pub fn from_records<'a, I>(&self, session_id: &str, records: I) -> SessionTimeline
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let events: Vec<Event> = records.into_iter().filter_map(to_event).collect();
        self.from_events(session_id, events)
    }

    /// Build a timeline from one session's events given in input order.
    pub fn from_events(&self, session_id: &str, events: Vec<Event>) -> SessionTimeline {
        let regressions = events
            .windows(2)
            .filter(|pair| pair[1].timestamp < pair[0].timestamp)
            .count();

        let mut events = events;
        // Stable: equal timestamps keep input order.
        events.sort_by_key(|e| e.timestamp);

        let timestamps: Vec<NaiveDateTime> = events.iter().map(|e| e.timestamp).collect();
        let intervals = compute_dwell(&timestamps, self.framing);
        let duplicate_timestamps = timestamps.windows(2).filter(|p| p[0] == p[1]).count();

        let anomalies = ClockAnomalies {
            out_of_order: regressions + intervals.clamped,
            duplicate_timestamps,
        };
        if !anomalies.is_clean() {
            warn!(
                "Session {}: {} out-of-order and {} duplicate timestamps, intervals clamped at zero",
                session_id, anomalies.out_of_order, anomalies.duplicate_timestamps
            );
        }

        let events: Vec<DwellEvent> = events
            .into_iter()
            .zip(intervals.seconds)
            .map(|(event, dwell_seconds)| DwellEvent {
                timestamp: event.timestamp,
                url: event.url,
                domain: event.domain,
                dwell_seconds,
            })
            .collect();

        debug!(
            "Session {}: timeline of {} events",
            session_id,
            events.len()
        );

        SessionTimeline {
            session_id: session_id.to_string(),
            framing: self.framing,
            events,
            anomalies,
        }
    }
}

/// Records of one session, resource or not, in input order.
#[derive(Debug, Clone)]
pub struct SessionRecords<'a> {
    pub session_id: &'a str,
    pub records: Vec<&'a LogRecord>,
}

/// Partition `records` by session in a single pass. Sessions appear in
/// first-occurrence order.
pub fn group_by_session(records: &[LogRecord]) -> Vec<SessionRecords<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<SessionRecords<'_>> = Vec::new();

    for record in records {
        let id = record.session_id.as_str();
        match index.get(id) {
            Some(&i) => groups[i].records.push(record),
            None => {
                index.insert(id, groups.len());
                groups.push(SessionRecords {
                    session_id: id,
                    records: vec![record],
                });
            }
        }
    }

    groups
}

/// Derive the dwell [`Event`] of a record, `None` without a resource.
pub fn to_event(record: &LogRecord) -> Option<Event> {
    let url = record.resource.clone()?;
    let domain = registrable_domain(&url);
    Some(Event {
        timestamp: record.timestamp,
        url,
        domain,
    })
}

// ── Dwell computation ─────────────────────────────────────────────────────────

/// Per-event dwell intervals and how many raw differences were negative.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellIntervals {
    pub seconds: Vec<f64>,
    pub clamped: usize,
}

/// Difference consecutive timestamps into dwell intervals.
///
/// Under [`DwellFraming::Next`] interval *i* is `t[i+1] - t[i]` and the last
/// interval is zero; under [`DwellFraming::Previous`] it is `t[i] - t[i-1]`
/// and the first is zero. Negative differences are clamped to zero and
/// counted.
pub fn compute_dwell(timestamps: &[NaiveDateTime], framing: DwellFraming) -> DwellIntervals {
    let mut seconds = vec![0.0; timestamps.len()];
    let mut clamped = 0;

    for (i, pair) in timestamps.windows(2).enumerate() {
        let raw = seconds_between(pair[0], pair[1]);
        let value = if raw < 0.0 {
            clamped += 1;
            0.0
        } else {
            raw
        };
        match framing {
            DwellFraming::Next => seconds[i] = value,
            DwellFraming::Previous => seconds[i + 1] = value,
        }
    }

    DwellIntervals { seconds, clamped }
}

// ── Session listing ───────────────────────────────────────────────────────────

/// Every distinct session identifier in first-occurrence order.
pub fn list_sessions(records: &[LogRecord]) -> Vec<SessionInfo> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sessions: Vec<SessionInfo> = Vec::new();

    for record in records {
        let has_resource = usize::from(record.has_resource());
        match index.get(record.session_id.as_str()) {
            Some(&i) => {
                let info = &mut sessions[i];
                info.records += 1;
                info.resource_events += has_resource;
                info.first_seen = info.first_seen.min(record.timestamp);
                info.last_seen = info.last_seen.max(record.timestamp);
            }
            None => {
                index.insert(record.session_id.as_str(), sessions.len());
                sessions.push(SessionInfo {
                    session_id: record.session_id.clone(),
                    records: 1,
                    resource_events: has_resource,
                    first_seen: record.timestamp,
                    last_seen: record.timestamp,
                });
            }
        }
    }

    sessions
}

/// Duration (max − min timestamp) of every session, over all its records.
pub fn session_durations(records: &[LogRecord]) -> HashMap<String, f64> {
    list_sessions(records)
        .into_iter()
        .map(|info| {
            let duration = info.duration_seconds();
            (info.session_id, duration)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    fn record(t: &str, session: &str, resource: Option<&str>) -> LogRecord {
        LogRecord {
            line: 0,
            timestamp: ts(t),
            session_id: session.to_string(),
            protocol: Some("TCP".to_string()),
            src_ip: None,
            src_port: None,
            dst_ip: None,
            dst_port: None,
            packet_size: None,
            http_method: None,
            http_url: None,
            metadata: String::new(),
            resource: resource.map(str::to_string),
        }
    }

    fn three_domain_session() -> Vec<LogRecord> {
        vec![
            record("2024-03-01 10:00:00", "s1", Some("https://a.alpha.com/")),
            record("2024-03-01 10:00:30", "s1", Some("https://beta.org/x")),
            record("2024-03-01 10:01:30", "s1", Some("gamma.co.uk/y")),
        ]
    }

    // ── compute_dwell ─────────────────────────────────────────────────────────

    #[test]
    fn test_compute_dwell_next_framing() {
        let times = [
            ts("2024-03-01 10:00:00"),
            ts("2024-03-01 10:00:30"),
            ts("2024-03-01 10:01:30"),
        ];
        let dwell = compute_dwell(&times, DwellFraming::Next);
        assert_eq!(dwell.seconds, vec![30.0, 60.0, 0.0]);
        assert_eq!(dwell.clamped, 0);
    }

    #[test]
    fn test_compute_dwell_previous_framing() {
        let times = [
            ts("2024-03-01 10:00:00"),
            ts("2024-03-01 10:00:30"),
            ts("2024-03-01 10:01:30"),
        ];
        let dwell = compute_dwell(&times, DwellFraming::Previous);
        assert_eq!(dwell.seconds, vec![0.0, 30.0, 60.0]);
    }

    #[test]
    fn test_compute_dwell_clamps_negative() {
        let times = [ts("2024-03-01 10:00:30"), ts("2024-03-01 10:00:00")];
        let dwell = compute_dwell(&times, DwellFraming::Next);
        assert_eq!(dwell.seconds, vec![0.0, 0.0]);
        assert_eq!(dwell.clamped, 1);
    }

    #[test]
    fn test_compute_dwell_single_and_empty() {
        let one = compute_dwell(&[ts("2024-03-01 10:00:00")], DwellFraming::Next);
        assert_eq!(one.seconds, vec![0.0]);
        assert!(compute_dwell(&[], DwellFraming::Next).seconds.is_empty());
    }

    #[test]
    fn test_compute_dwell_sub_second() {
        let times = [ts("2024-03-01 10:00:00.100"), ts("2024-03-01 10:00:00.350")];
        let dwell = compute_dwell(&times, DwellFraming::Next);
        assert!((dwell.seconds[0] - 0.25).abs() < 1e-9);
    }

    // ── TimelineBuilder ───────────────────────────────────────────────────────

    #[test]
    fn test_build_three_distinct_domains() {
        let records = three_domain_session();
        let timeline = TimelineBuilder::default().build(&records, "s1");
        let dwell: Vec<f64> = timeline.events.iter().map(|e| e.dwell_seconds).collect();
        assert_eq!(dwell, vec![30.0, 60.0, 0.0]);
        let domains: Vec<&str> = timeline.events.iter().map(|e| e.domain.as_str()).collect();
        assert_eq!(domains, vec!["alpha", "beta", "gamma"]);
        assert!(timeline.anomalies.is_clean());
    }

    #[test]
    fn test_build_sorts_and_counts_out_of_order() {
        let records = vec![
            record("2024-03-01 10:01:00", "s1", Some("c.com")),
            record("2024-03-01 10:00:00", "s1", Some("a.com")),
            record("2024-03-01 10:00:20", "s1", Some("b.com")),
        ];
        let timeline = TimelineBuilder::default().build(&records, "s1");
        let urls: Vec<&str> = timeline.events.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["a.com", "b.com", "c.com"]);
        assert_eq!(timeline.anomalies.out_of_order, 1);
        assert!(timeline.events.iter().all(|e| e.dwell_seconds >= 0.0));
    }

    #[test]
    fn test_build_stable_on_equal_timestamps() {
        let records = vec![
            record("2024-03-01 10:00:00", "s1", Some("first.com")),
            record("2024-03-01 10:00:00", "s1", Some("second.com")),
            record("2024-03-01 10:00:10", "s1", Some("third.com")),
        ];
        let timeline = TimelineBuilder::default().build(&records, "s1");
        assert_eq!(timeline.events[0].url, "first.com");
        assert_eq!(timeline.events[1].url, "second.com");
        assert_eq!(timeline.events[0].dwell_seconds, 0.0);
        assert_eq!(timeline.anomalies.duplicate_timestamps, 1);
    }

    #[test]
    fn test_build_filters_session_and_resource() {
        let mut records = three_domain_session();
        records.push(record("2024-03-01 10:00:10", "s2", Some("other.com")));
        records.push(record("2024-03-01 10:00:15", "s1", None));
        let timeline = TimelineBuilder::default().build(&records, "s1");
        assert_eq!(timeline.len(), 3);
        assert!(timeline.events.iter().all(|e| e.url != "other.com"));
    }

    #[test]
    fn test_build_session_without_resources_is_empty() {
        let records = vec![
            record("2024-03-01 10:00:00", "s1", None),
            record("2024-03-01 10:00:05", "s1", None),
        ];
        let timeline = TimelineBuilder::default().build(&records, "s1");
        assert!(timeline.is_empty());
        assert_eq!(timeline.total_dwell_seconds(), 0.0);
    }

    #[test]
    fn test_build_single_event_has_zero_interval() {
        let records = vec![record("2024-03-01 10:00:00", "s1", Some("a.com"))];
        let timeline = TimelineBuilder::default().build(&records, "s1");
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.events[0].dwell_seconds, 0.0);
    }

    #[test]
    fn test_interval_sum_equals_span_both_framings() {
        let records = vec![
            record("2024-03-01 10:00:00.125", "s1", Some("a.com")),
            record("2024-03-01 10:03:00", "s1", Some("b.com")),
            record("2024-03-01 09:59:59.5", "s1", Some("c.com")),
            record("2024-03-01 10:07:42.75", "s1", Some("a.com")),
        ];
        for framing in [DwellFraming::Next, DwellFraming::Previous] {
            let timeline = TimelineBuilder::new(framing).build(&records, "s1");
            assert!(
                (timeline.total_dwell_seconds() - timeline.span_seconds()).abs() < 1e-6,
                "framing {framing:?}"
            );
        }
    }

    #[test]
    fn test_last_event_zero_under_next_framing() {
        let records = three_domain_session();
        let timeline = TimelineBuilder::new(DwellFraming::Next).build(&records, "s1");
        assert_eq!(timeline.events.last().unwrap().dwell_seconds, 0.0);
        let previous = TimelineBuilder::new(DwellFraming::Previous).build(&records, "s1");
        assert_eq!(previous.events[0].dwell_seconds, 0.0);
        assert_eq!(previous.framing, DwellFraming::Previous);
    }

    // ── group_by_session / list_sessions ──────────────────────────────────────

    #[test]
    fn test_group_by_session_single_pass_order() {
        let records = vec![
            record("2024-03-01 10:00:05", "s1", None),
            record("2024-03-01 10:00:01", "s2", Some("b.com")),
            record("2024-03-01 10:00:00", "s1", Some("a.com")),
        ];
        let groups = group_by_session(&records);
        let ids: Vec<&str> = groups.iter().map(|g| g.session_id).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(groups[0].records.len(), 2);
        // Input order is kept inside a group.
        assert!(groups[0].records[0].resource.is_none());
    }

    #[test]
    fn test_from_records_matches_build() {
        let records = vec![
            record("2024-03-01 10:01:00", "s1", Some("c.com")),
            record("2024-03-01 10:00:10", "s2", Some("x.com")),
            record("2024-03-01 10:00:00", "s1", Some("a.com")),
            record("2024-03-01 10:00:30", "s1", None),
        ];
        let builder = TimelineBuilder::default();
        let groups = group_by_session(&records);
        let grouped = builder.from_records("s1", groups[0].records.iter().copied());
        let scanned = builder.build(&records, "s1");
        assert_eq!(grouped.events, scanned.events);
        assert_eq!(grouped.anomalies, scanned.anomalies);
        assert_eq!(grouped.anomalies.out_of_order, 1);
    }

    #[test]
    fn test_list_sessions_first_occurrence_order() {
        let records = vec![
            record("2024-03-01 10:00:05", "0010", None),
            record("2024-03-01 10:00:00", "10", Some("a.com")),
            record("2024-03-01 10:00:00", "0010", Some("a.com")),
        ];
        let sessions = list_sessions(&records);
        let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        // Numeric-looking ids stay distinct strings.
        assert_eq!(ids, vec!["0010", "10"]);
        assert_eq!(sessions[0].records, 2);
        assert_eq!(sessions[0].resource_events, 1);
        assert!((sessions[0].duration_seconds() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_durations() {
        let mut records = three_domain_session();
        records.push(record("2024-03-01 11:00:00", "s2", None));
        let durations = session_durations(&records);
        assert!((durations["s1"] - 90.0).abs() < 1e-9);
        assert_eq!(durations["s2"], 0.0);
    }
}
