//! CSV discovery and loading.
//!
//! Reads network-log CSV files into [`LogRecord`]s. Rows that cannot be
//! parsed are skipped and reported once per batch; only problems that make
//! the whole input unusable (missing path, missing required column) fail
//! the load.

use std::io::Read;
use std::path::{Path, PathBuf};

use dwell_core::error::{DwellError, Result};
use dwell_core::models::{LogRecord, SchemaMode};
use tracing::{debug, warn};

use crate::parser::{parse_row, RowError};
use crate::schema::{Schema, SchemaKind};

/// Number of leading records echoed at debug level after a load.
const PREVIEW_ROWS: usize = 5;

/// Everything read from one input path.
#[derive(Debug, Clone)]
pub struct LoadedLog {
    /// Parsed records in file order (files in path order).
    pub records: Vec<LogRecord>,
    /// Rows that were rejected, in encounter order.
    pub row_errors: Vec<RowError>,
    /// Files that were read.
    pub files: Vec<PathBuf>,
    /// Layout detected for each non-empty file.
    pub schemas: Vec<SchemaKind>,
}

impl LoadedLog {
    pub fn skipped_rows(&self) -> usize {
        self.row_errors.len()
    }
}

/// Rows read from a single CSV source.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub records: Vec<LogRecord>,
    pub row_errors: Vec<RowError>,
    /// `None` for an empty source (no header row).
    pub schema: Option<Schema>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `data_path`, sorted by path.
pub fn find_csv_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every record under `path` (a CSV file or a directory of them).
///
/// Fails with [`DwellError::DataPathNotFound`] when the path is missing,
/// [`DwellError::NoDataFiles`] for a directory without CSV files, and
/// [`DwellError::MissingColumn`] when a file's header lacks a required
/// column.
pub fn load_log(path: &Path, mode: SchemaMode) -> Result<LoadedLog> {
    if !path.exists() {
        return Err(DwellError::DataPathNotFound(path.to_path_buf()));
    }

    let files = if path.is_dir() {
        let found = find_csv_files(path);
        if found.is_empty() {
            return Err(DwellError::NoDataFiles(path.to_path_buf()));
        }
        found
    } else {
        vec![path.to_path_buf()]
    };

    let mut log = LoadedLog {
        records: Vec::new(),
        row_errors: Vec::new(),
        files: Vec::new(),
        schemas: Vec::new(),
    };

    for file_path in &files {
        let file = std::fs::File::open(file_path).map_err(|source| DwellError::FileRead {
            path: file_path.clone(),
            source,
        })?;
        let parsed = read_records(file, mode)?;

        debug!(
            "File {}: {} records, {} skipped rows",
            file_path.display(),
            parsed.records.len(),
            parsed.row_errors.len(),
        );

        log.records.extend(parsed.records);
        log.row_errors.extend(parsed.row_errors);
        log.files.push(file_path.clone());
        if let Some(schema) = parsed.schema {
            log.schemas.push(schema.kind());
        }
    }

    report_row_errors(&log.row_errors);
    for record in log.records.iter().take(PREVIEW_ROWS) {
        debug!("preview: {:?}", record);
    }
    debug!(
        "Loaded {} records from {} files",
        log.records.len(),
        log.files.len()
    );

    Ok(log)
}

/// Parse CSV rows from any reader.
///
/// The first row is handed to [`Schema::detect`]; it is consumed as a header
/// in both layouts. Every following row is trimmed and parsed; failures are
/// collected instead of propagated.
pub fn read_records<R: Read>(reader: R, mode: SchemaMode) -> Result<ParsedSource> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = csv_reader.records();
    let mut parsed = ParsedSource {
        records: Vec::new(),
        row_errors: Vec::new(),
        schema: None,
    };

    let header = match rows.next() {
        None => return Ok(parsed),
        Some(Ok(row)) => row.iter().map(str::to_string).collect::<Vec<_>>(),
        Some(Err(e)) => return Err(DwellError::Csv(e.to_string())),
    };
    let schema = Schema::detect(&header, mode)?;

    for (offset, row) in rows.enumerate() {
        // Header is line 1; fall back to the row index when csv has no position.
        let fallback_line = offset as u64 + 2;
        match row {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                // Blank lines are skipped by csv; a lone empty field is noise too.
                if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
                    continue;
                }
                let fields: Vec<&str> = record.iter().collect();
                match parse_row(&fields, &schema, line) {
                    Ok(rec) => parsed.records.push(rec),
                    Err(err) => parsed.row_errors.push(err),
                }
            }
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                parsed.row_errors.push(RowError::Unreadable {
                    line,
                    reason: e.to_string(),
                });
            }
        }
    }

    parsed.schema = Some(schema);
    Ok(parsed)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Emit one summary warning for the batch plus the first few details.
fn report_row_errors(errors: &[RowError]) {
    if errors.is_empty() {
        return;
    }
    warn!("Skipped {} malformed rows", errors.len());
    for err in errors.iter().take(PREVIEW_ROWS) {
        debug!("skipped: {}", err);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
