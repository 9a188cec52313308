//! Main analysis pipeline for the dwell analyzer.
//!
//! Orchestrates loading, timeline construction, aggregation and summary
//! statistics, returning an [`AnalysisResult`] ready for rendering.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use dwell_core::error::{DwellError, Result};
use dwell_core::models::{
    Aggregate, AnalysisOutcome, DwellFraming, GroupKey, LogRecord, RankedTopList, SchemaMode,
    SessionTimeline, DEFAULT_TOP_K,
};
use serde::Serialize;
use tracing::info;

use crate::aggregator::DwellAggregator;
use crate::parser::RowError;
use crate::reader::load_log;
use crate::summary::{SummaryFilter, SummaryReport, SummaryReporter};
use crate::timeline::{group_by_session, list_sessions, SessionInfo, TimelineBuilder};

// ── Request types ─────────────────────────────────────────────────────────────

/// Which report the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    #[default]
    Dwell,
    Summary,
    Sessions,
}

impl FromStr for ReportView {
    type Err = DwellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dwell" => Ok(ReportView::Dwell),
            "summary" => Ok(ReportView::Summary),
            "sessions" => Ok(ReportView::Sessions),
            other => Err(DwellError::Config(format!("unknown view \"{other}\""))),
        }
    }
}

/// Parameters of the dwell computation.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellOptions {
    pub framing: DwellFraming,
    pub top_k: usize,
    /// Keys to aggregate by, in output order.
    pub group_keys: Vec<GroupKey>,
}

impl Default for DwellOptions {
    fn default() -> Self {
        Self {
            framing: DwellFraming::Next,
            top_k: DEFAULT_TOP_K,
            group_keys: vec![GroupKey::Url, GroupKey::Domain],
        }
    }
}

/// Everything [`analyze_log`] needs besides the input path.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub view: ReportView,
    pub schema: SchemaMode,
    /// Restrict the dwell view to one session; all sessions when `None`.
    pub session: Option<String>,
    pub dwell: DwellOptions,
    pub filter: SummaryFilter,
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Aggregates and ranking of one session under one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedDwell {
    pub group_key: GroupKey,
    pub aggregates: Vec<Aggregate>,
    pub top: RankedTopList,
}

/// Dwell analysis of a single session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalysis {
    pub session_id: String,
    /// Records of the session, with or without a resource identifier.
    pub total_records: usize,
    pub timeline: SessionTimeline,
    pub groups: Vec<GroupedDwell>,
}

/// Payload of a successful run, one variant per [`ReportView`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "lowercase")]
pub enum Report {
    Dwell(Vec<SessionAnalysis>),
    Summary(SummaryReport),
    Sessions(Vec<SessionInfo>),
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub view: ReportView,
    pub files_read: usize,
    /// Records parsed successfully.
    pub records_loaded: usize,
    /// Rows rejected by the parser.
    pub rows_skipped: usize,
    /// Wall-clock seconds spent reading and parsing the input.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent computing the report.
    pub transform_time_seconds: f64,
}

/// The complete output of [`analyze_log`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub metadata: AnalysisMetadata,
    pub outcome: AnalysisOutcome<Report>,
    #[serde(skip)]
    pub row_errors: Vec<RowError>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Load and parse every CSV file under `input`.
/// 2. Build the requested report from the parsed records.
/// 3. Return an [`AnalysisResult`] with metadata and the rejected rows.
///
/// Fatal input problems (missing path, unreadable file, unknown header) are
/// errors; an empty selection is an [`AnalysisOutcome::NoData`].
pub fn analyze_log(input: &Path, request: &AnalysisRequest) -> Result<AnalysisResult> {
    // ── Step 1: Load records ──────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let log = load_log(input, request.schema)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Build report ──────────────────────────────────────────────────
    let transform_start = std::time::Instant::now();
    let outcome = build_report(&log.records, request);
    let transform_time = transform_start.elapsed().as_secs_f64();

    info!(
        "Analysed {} records from {} file(s) in {:.3}s",
        log.records.len(),
        log.files.len(),
        load_time + transform_time
    );

    // ── Step 3: Build result ──────────────────────────────────────────────────
    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        view: request.view,
        files_read: log.files.len(),
        records_loaded: log.records.len(),
        rows_skipped: log.skipped_rows(),
        load_time_seconds: load_time,
        transform_time_seconds: transform_time,
    };

    Ok(AnalysisResult {
        metadata,
        outcome,
        row_errors: log.row_errors,
    })
}

/// Produce the report for `request.view` from already-loaded records.
pub fn build_report(records: &[LogRecord], request: &AnalysisRequest) -> AnalysisOutcome<Report> {
    match request.view {
        ReportView::Dwell => match &request.session {
            Some(id) => {
                analyze_session(records, id, &request.dwell).map(|a| Report::Dwell(vec![a]))
            }
            None => {
                let all = analyze_all_sessions(records, &request.dwell);
                if all.is_empty() {
                    AnalysisOutcome::NoData("the log contains no sessions".to_string())
                } else {
                    AnalysisOutcome::Data(Report::Dwell(all))
                }
            }
        },
        ReportView::Summary => {
            SummaryReporter::report(records, &request.filter).map(Report::Summary)
        }
        ReportView::Sessions => {
            let sessions = list_sessions(records);
            if sessions.is_empty() {
                AnalysisOutcome::NoData("the log contains no sessions".to_string())
            } else {
                AnalysisOutcome::Data(Report::Sessions(sessions))
            }
        }
    }
}

/// Dwell analysis of one session.
///
/// An identifier absent from the log is `NoData`; a session present but
/// without any resource-bearing record yields empty aggregates.
pub fn analyze_session(
    records: &[LogRecord],
    session_id: &str,
    options: &DwellOptions,
) -> AnalysisOutcome<SessionAnalysis> {
    let total_records = records.iter().filter(|r| r.session_id == session_id).count();
    if total_records == 0 {
        return AnalysisOutcome::NoData(format!("no records for session \"{session_id}\""));
    }

    let timeline = TimelineBuilder::new(options.framing).build(records, session_id);
    AnalysisOutcome::Data(assemble(session_id, total_records, timeline, options))
}

/// Dwell analysis of every session, in first-occurrence order.
///
/// Records are partitioned once, so the cost stays dominated by the
/// per-session sorts.
pub fn analyze_all_sessions(records: &[LogRecord], options: &DwellOptions) -> Vec<SessionAnalysis> {
    let builder = TimelineBuilder::new(options.framing);
    group_by_session(records)
        .into_iter()
        .map(|group| {
            let timeline = builder.from_records(group.session_id, group.records.iter().copied());
            assemble(group.session_id, group.records.len(), timeline, options)
        })
        .collect()
}

fn assemble(
    session_id: &str,
    total_records: usize,
    timeline: SessionTimeline,
    options: &DwellOptions,
) -> SessionAnalysis {
    let groups = options
        .group_keys
        .iter()
        .map(|&group_key| {
            let aggregates = DwellAggregator::aggregate(&timeline, group_key);
            let top = DwellAggregator::rank(&aggregates, group_key, options.top_k);
            GroupedDwell {
                group_key,
                aggregates,
                top,
            }
        })
        .collect();

    SessionAnalysis {
        session_id: session_id.to_string(),
        total_records,
        timeline,
        groups,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
