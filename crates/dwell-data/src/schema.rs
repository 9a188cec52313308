//! Column layouts understood by the record parser.
//!
//! Two layouts are supported: the fixed 24-column network log (positions are
//! implied, the header row is discarded) and a generic header-named layout
//! that must carry `date`, `time`, `session_id` and `misc`.

use std::collections::HashMap;

use dwell_core::error::{DwellError, Result};
use dwell_core::models::SchemaMode;
use serde::Serialize;

/// Column names of the fixed network-log layout, in file order.
pub const NETWORK_COLUMNS: [&str; 24] = [
    "date",
    "time",
    "session_id",
    "session_id_2",
    "connection_id_1",
    "connection_id_2",
    "protocol_hex",
    "packet_size",
    "protocol",
    "tcp_flags",
    "src_ip",
    "src_port",
    "dst_ip",
    "dst_port",
    "sequence_number",
    "ack_number",
    "window_size",
    "http_method",
    "http_url",
    "http_protocol",
    "unknown_1",
    "unknown_2",
    "unknown_3",
    "unknown_4",
];

/// Columns a generic file cannot be analysed without.
pub const GENERIC_REQUIRED: [&str; 4] = ["date", "time", "session_id", "misc"];

/// Reserved network-log columns scanned as free-text metadata.
const NETWORK_METADATA_COLUMNS: [&str; 4] = ["unknown_1", "unknown_2", "unknown_3", "unknown_4"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Network,
    Generic,
}

/// Resolved positions of every column the parser reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    kind: SchemaKind,
    width: usize,
    pub date: usize,
    pub time: usize,
    pub session_id: usize,
    pub protocol: Option<usize>,
    pub src_ip: Option<usize>,
    pub src_port: Option<usize>,
    pub dst_ip: Option<usize>,
    pub dst_port: Option<usize>,
    pub packet_size: Option<usize>,
    pub http_method: Option<usize>,
    pub http_url: Option<usize>,
    /// Columns concatenated (space-separated) into the metadata text.
    pub metadata: Vec<usize>,
}

impl Schema {
    /// The fixed 24-column network-log layout.
    pub fn network_log() -> Self {
        let names: Vec<String> = NETWORK_COLUMNS.iter().map(|s| s.to_string()).collect();
        let index = column_index(&names);
        let pos = |name: &str| index.get(name).copied();

        Self {
            kind: SchemaKind::Network,
            width: NETWORK_COLUMNS.len(),
            date: 0,
            time: 1,
            session_id: 2,
            protocol: pos("protocol"),
            src_ip: pos("src_ip"),
            src_port: pos("src_port"),
            dst_ip: pos("dst_ip"),
            dst_port: pos("dst_port"),
            packet_size: pos("packet_size"),
            http_method: pos("http_method"),
            http_url: pos("http_url"),
            metadata: NETWORK_METADATA_COLUMNS
                .iter()
                .filter_map(|name| pos(name))
                .collect(),
        }
    }

    /// Build a generic layout from a header row.
    ///
    /// Header names are matched after trimming, case-insensitively. Fails
    /// with [`DwellError::MissingColumn`] naming the first required column
    /// that is absent.
    pub fn from_header(header: &[String]) -> Result<Self> {
        let index = column_index(header);
        for required in GENERIC_REQUIRED {
            if !index.contains_key(required) {
                return Err(DwellError::MissingColumn(required.to_string()));
            }
        }
        let pos = |name: &str| index.get(name).copied();
        let req = |name: &str| index[name];

        Ok(Self {
            kind: SchemaKind::Generic,
            width: header.len(),
            date: req("date"),
            time: req("time"),
            session_id: req("session_id"),
            protocol: pos("protocol"),
            src_ip: pos("src_ip"),
            src_port: pos("src_port"),
            dst_ip: pos("dst_ip"),
            dst_port: pos("dst_port"),
            packet_size: pos("packet_size"),
            http_method: pos("http_method"),
            http_url: pos("http_url"),
            metadata: vec![req("misc")],
        })
    }

    /// Pick the layout for a file given its first row.
    ///
    /// In `Auto` mode a header naming `misc` selects the generic layout, a
    /// 24-field first row selects the network layout, and anything else is
    /// validated as a generic header so a missing `session_id` surfaces as an
    /// error rather than as a file full of malformed rows.
    pub fn detect(header: &[String], mode: SchemaMode) -> Result<Self> {
        match mode {
            SchemaMode::Network => Ok(Self::network_log()),
            SchemaMode::Generic => Self::from_header(header),
            SchemaMode::Auto => {
                let names = normalise(header);
                if names.iter().any(|n| n == "misc") {
                    Self::from_header(header)
                } else if header.len() == NETWORK_COLUMNS.len() {
                    Ok(Self::network_log())
                } else {
                    Self::from_header(header)
                }
            }
        }
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Number of fields every data row must have.
    pub fn width(&self) -> usize {
        self.width
    }
}

fn normalise(header: &[String]) -> Vec<String> {
    header.iter().map(|h| h.trim().to_lowercase()).collect()
}

/// Map normalised header names to positions; the first duplicate wins.
fn column_index(header: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, name) in normalise(header).into_iter().enumerate() {
        index.entry(name).or_insert(i);
    }
    index
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_network_log_positions() {
        let schema = Schema::network_log();
        assert_eq!(schema.kind(), SchemaKind::Network);
        assert_eq!(schema.width(), 24);
        assert_eq!(schema.session_id, 2);
        assert_eq!(schema.packet_size, Some(7));
        assert_eq!(schema.protocol, Some(8));
        assert_eq!(schema.http_url, Some(18));
        assert_eq!(schema.metadata, vec![20, 21, 22, 23]);
    }

    #[test]
    fn test_from_header_generic() {
        let schema =
            Schema::from_header(&header(&[" Date ", "time", "SESSION_ID", "protocol", "misc"]))
                .unwrap();
        assert_eq!(schema.kind(), SchemaKind::Generic);
        assert_eq!(schema.width(), 5);
        assert_eq!(schema.date, 0);
        assert_eq!(schema.session_id, 2);
        assert_eq!(schema.protocol, Some(3));
        assert_eq!(schema.metadata, vec![4]);
        assert!(schema.src_ip.is_none());
    }

    #[test]
    fn test_from_header_missing_session_id() {
        let err = Schema::from_header(&header(&["date", "time", "misc"])).unwrap_err();
        assert!(matches!(err, DwellError::MissingColumn(ref c) if c == "session_id"));
    }

    #[test]
    fn test_detect_auto_prefers_generic_with_misc() {
        let schema =
            Schema::detect(&header(&["date", "time", "session_id", "misc"]), SchemaMode::Auto)
                .unwrap();
        assert_eq!(schema.kind(), SchemaKind::Generic);
    }

    #[test]
    fn test_detect_auto_network_by_width() {
        let first_row: Vec<String> = (0..24).map(|i| format!("col{i}")).collect();
        let schema = Schema::detect(&first_row, SchemaMode::Auto).unwrap();
        assert_eq!(schema.kind(), SchemaKind::Network);
    }

    #[test]
    fn test_detect_auto_unknown_header_is_fatal() {
        let err = Schema::detect(&header(&["when", "who", "what"]), SchemaMode::Auto).unwrap_err();
        assert!(matches!(err, DwellError::MissingColumn(_)));
    }

    #[test]
    fn test_detect_forced_network_ignores_header() {
        let schema = Schema::detect(&header(&["a", "b"]), SchemaMode::Network).unwrap();
        assert_eq!(schema.kind(), SchemaKind::Network);
    }
}
