//! Plain-text and JSON rendering of analysis results.

use dwell_core::formatting::{fit_width, format_duration, format_number, format_percent};
use dwell_core::models::{AnalysisOutcome, DwellFraming, RankedTopList};
use dwell_core::stats::{Describe, ValueCount};
use dwell_core::time_utils::format_timestamp;
use dwell_data::analysis::{AnalysisResult, Report, SessionAnalysis};
use dwell_data::parser::RowError;
use dwell_data::summary::SummaryReport;
use dwell_data::timeline::SessionInfo;

const KEY_WIDTH: usize = 48;
const ID_WIDTH: usize = 20;
const NUM_WIDTH: usize = 12;
const TS_WIDTH: usize = 23;
/// Rejected rows listed individually before the rest are only counted.
const MAX_LISTED_ROW_ERRORS: usize = 10;

// ── Entry points ──────────────────────────────────────────────────────────────

/// Pretty-printed JSON document of the whole result.
pub fn render_json(result: &AnalysisResult) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Human-readable report.
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = Vec::new();
    match &result.outcome {
        AnalysisOutcome::NoData(reason) => out.push(format!("No data to display: {reason}.")),
        AnalysisOutcome::Data(Report::Dwell(sessions)) => render_dwell(&mut out, sessions),
        AnalysisOutcome::Data(Report::Summary(summary)) => render_summary(&mut out, summary),
        AnalysisOutcome::Data(Report::Sessions(sessions)) => render_sessions(&mut out, sessions),
    }
    out.join("\n")
}

/// Notice about rejected rows, `None` when every row parsed.
pub fn render_row_errors(errors: &[RowError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    let mut out = vec![format!("Skipped {} malformed row(s):", errors.len())];
    for err in errors.iter().take(MAX_LISTED_ROW_ERRORS) {
        out.push(format!("  {err}"));
    }
    if errors.len() > MAX_LISTED_ROW_ERRORS {
        out.push(format!(
            "  ... and {} more",
            errors.len() - MAX_LISTED_ROW_ERRORS
        ));
    }
    Some(out.join("\n"))
}

// ── Dwell view ────────────────────────────────────────────────────────────────

fn framing_label(framing: DwellFraming) -> &'static str {
    match framing {
        DwellFraming::Next => "until next event",
        DwellFraming::Previous => "since previous event",
    }
}

fn render_dwell(out: &mut Vec<String>, sessions: &[SessionAnalysis]) {
    let show_timeline = sessions.len() == 1;
    for (i, session) in sessions.iter().enumerate() {
        if i > 0 {
            out.push(String::new());
        }
        render_session(out, session, show_timeline);
    }
}

fn render_session(out: &mut Vec<String>, session: &SessionAnalysis, show_timeline: bool) {
    let timeline = &session.timeline;
    out.push(format!(
        "Session {} ({} records, {} resource events, dwell {})",
        session.session_id,
        session.total_records,
        timeline.len(),
        framing_label(timeline.framing)
    ));

    if let (Some(start), Some(end)) = (timeline.start(), timeline.end()) {
        out.push(format!(
            "  {} .. {}  span {}  total dwell {}",
            format_timestamp(&start),
            format_timestamp(&end),
            format_duration(timeline.span_seconds()),
            format_duration(timeline.total_dwell_seconds())
        ));
    } else {
        out.push("  No resource visits in this session.".to_string());
        return;
    }

    if !timeline.anomalies.is_clean() {
        out.push(format!(
            "  Clock anomalies: {} out of order, {} duplicate timestamps",
            timeline.anomalies.out_of_order, timeline.anomalies.duplicate_timestamps
        ));
    }

    for group in &session.groups {
        out.push(String::new());
        render_top_list(out, &group.top);
    }

    if show_timeline {
        out.push(String::new());
        out.push("  Timeline".to_string());
        out.push(format!(
            "  {} {} {} {}",
            fit_width("Timestamp", TS_WIDTH, false),
            fit_width("Dwell", NUM_WIDTH, true),
            fit_width("Hours", NUM_WIDTH, true),
            "URL"
        ));
        for event in &timeline.events {
            out.push(format!(
                "  {} {} {} {}",
                fit_width(&format_timestamp(&event.timestamp), TS_WIDTH, false),
                fit_width(&format_duration(event.dwell_seconds), NUM_WIDTH, true),
                fit_width(&format_number(event.dwell_hours(), 4), NUM_WIDTH, true),
                event.url
            ));
        }
    }
}

fn render_top_list(out: &mut Vec<String>, top: &RankedTopList) {
    let label = top.group_key.label();
    out.push(format!("  Top {} by {} dwell time", top.k, label));
    out.push(format!(
        "  {:>3}  {} {} {} {}",
        "#",
        fit_width(label, KEY_WIDTH, false),
        fit_width("Dwell", NUM_WIDTH, true),
        fit_width("Hours", NUM_WIDTH, true),
        fit_width("Events", 8, true)
    ));
    for (rank, entry) in top.entries.iter().enumerate() {
        out.push(format!(
            "  {:>3}  {} {} {} {}",
            rank + 1,
            fit_width(&entry.key, KEY_WIDTH, false),
            fit_width(&format_duration(entry.total_seconds), NUM_WIDTH, true),
            fit_width(&format_number(entry.total_hours(), 4), NUM_WIDTH, true),
            fit_width(&entry.events.to_string(), 8, true)
        ));
    }
}

// ── Summary view ──────────────────────────────────────────────────────────────

fn render_summary(out: &mut Vec<String>, summary: &SummaryReport) {
    out.push(format!(
        "Summary of {} of {} records, {} .. {}",
        summary.filtered_records, summary.total_records, summary.start_date, summary.end_date
    ));

    out.push(String::new());
    out.push("Protocol distribution".to_string());
    for freq in &summary.protocol_distribution {
        out.push(format!(
            "  {} {}",
            fit_width(&freq.value, ID_WIDTH, false),
            fit_width(&format_percent(freq.frequency), NUM_WIDTH, true)
        ));
    }

    let top_lists = [
        ("Top source IPs", &summary.top_src_ips),
        ("Top destination IPs", &summary.top_dst_ips),
        ("Top HTTP methods", &summary.top_http_methods),
        ("Top HTTP URLs", &summary.top_http_urls),
    ];
    for (title, list) in top_lists {
        if !list.is_empty() {
            out.push(String::new());
            render_value_counts(out, title, list);
        }
    }

    out.push(String::new());
    out.push(format!(
        "  {} {}",
        fit_width("Statistic", ID_WIDTH, false),
        describe_header()
    ));
    if let Some(stats) = &summary.packet_size {
        out.push(describe_row("packet size", stats));
    }
    for by_protocol in &summary.packet_size_by_protocol {
        out.push(describe_row(
            &format!("packet size {}", by_protocol.protocol),
            &by_protocol.stats,
        ));
    }
    if let Some(stats) = &summary.session_duration {
        out.push(describe_row("session duration", stats));
    }

    if !summary.traffic_per_minute.is_empty() {
        out.push(String::new());
        out.push("Traffic per minute".to_string());
        for bucket in &summary.traffic_per_minute {
            out.push(format!(
                "  {} {}",
                bucket.minute.format("%Y-%m-%d %H:%M"),
                fit_width(&bucket.records.to_string(), 8, true)
            ));
        }
    }

    let insights = summary.insights();
    if !insights.is_empty() {
        out.push(String::new());
        out.push("Insights".to_string());
        for line in insights {
            out.push(format!("  - {line}"));
        }
    }
}

fn render_value_counts(out: &mut Vec<String>, title: &str, counts: &[ValueCount<String>]) {
    out.push(title.to_string());
    for vc in counts {
        out.push(format!(
            "  {} {}",
            fit_width(&vc.value, KEY_WIDTH, false),
            fit_width(&vc.count.to_string(), 8, true)
        ));
    }
}

fn describe_header() -> String {
    ["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        .iter()
        .map(|h| fit_width(h, 10, true))
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_row(label: &str, stats: &Describe) -> String {
    let std = stats
        .std
        .map(|s| format_number(s, 2))
        .unwrap_or_else(|| "-".to_string());
    let cells = [
        stats.count.to_string(),
        format_number(stats.mean, 2),
        std,
        format_number(stats.min, 2),
        format_number(stats.q25, 2),
        format_number(stats.median, 2),
        format_number(stats.q75, 2),
        format_number(stats.max, 2),
    ];
    let cells: Vec<String> = cells.iter().map(|c| fit_width(c, 10, true)).collect();
    format!("  {} {}", fit_width(label, ID_WIDTH, false), cells.join(" "))
}

// ── Sessions view ─────────────────────────────────────────────────────────────

fn render_sessions(out: &mut Vec<String>, sessions: &[SessionInfo]) {
    out.push(format!("{} session(s)", sessions.len()));
    out.push(format!(
        "  {} {} {} {} {}",
        fit_width("Session", ID_WIDTH, false),
        fit_width("Records", 8, true),
        fit_width("Visits", 8, true),
        fit_width("First seen", TS_WIDTH, false),
        "Duration"
    ));
    for info in sessions {
        out.push(format!(
            "  {} {} {} {} {}",
            fit_width(&info.session_id, ID_WIDTH, false),
            fit_width(&info.records.to_string(), 8, true),
            fit_width(&info.resource_events.to_string(), 8, true),
            fit_width(&format_timestamp(&info.first_seen), TS_WIDTH, false),
            format_duration(info.duration_seconds())
        ));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
