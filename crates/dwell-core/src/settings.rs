use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::{DwellFraming, GroupKey, SchemaMode};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

const VIEWS: [&str; 3] = ["dwell", "summary", "sessions"];
const GROUP_BYS: [&str; 3] = ["url", "domain", "both"];
const FRAMINGS: [&str; 2] = ["next", "previous"];
const SCHEMAS: [&str; 3] = ["auto", "network", "generic"];
const FORMATS: [&str; 2] = ["text", "json"];

/// Session dwell-time analytics for network logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dwell-analyzer",
    about = "Session dwell-time analytics for network logs",
    version
)]
pub struct Settings {
    /// CSV log file, or a directory scanned recursively for *.csv
    pub input: Option<PathBuf>,

    /// Report to produce
    #[arg(long, default_value = "dwell", value_parser = VIEWS)]
    pub view: String,

    /// Session identifier to analyse (all sessions when omitted)
    #[arg(long)]
    pub session: Option<String>,

    /// Grouping key for dwell aggregation
    #[arg(long, default_value = "both", value_parser = GROUP_BYS)]
    pub group_by: String,

    /// Length of the ranked top list (1-50)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=50))]
    pub top_k: u32,

    /// Attribute each interval to the event it starts at ("next") or ends at ("previous")
    #[arg(long, default_value = "next", value_parser = FRAMINGS)]
    pub framing: String,

    /// Input schema
    #[arg(long, default_value = "auto", value_parser = SCHEMAS)]
    pub schema: String,

    /// Protocol allow-list for the summary view (repeatable; all when omitted)
    #[arg(long = "protocol")]
    pub protocols: Vec<String>,

    /// First date included in the summary view (defaults to the earliest date in the data)
    #[arg(long, value_parser = parse_date_arg)]
    pub start_date: Option<NaiveDate>,

    /// Last date included in the summary view (defaults to the latest date in the data)
    #[arg(long, value_parser = parse_date_arg)]
    pub end_date: Option<NaiveDate>,

    /// Output format
    #[arg(long, default_value = "text", value_parser = FORMATS)]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

/// Persisted value, dropped with a warning when it is not one the CLI accepts.
fn allowed_value(key: &str, value: Option<String>, allowed: &[&str]) -> Option<String> {
    let v = value?;
    if allowed.contains(&v.as_str()) {
        Some(v)
    } else {
        tracing::warn!("Ignoring saved {} {:?}: expected one of {:?}", key, v, allowed);
        None
    }
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    crate::time_utils::parse_date(s).map_err(|e| e.to_string())
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.dwell-analyzer/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".dwell-analyzer").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Failed to clear {}: {}", config_path.display(), e);
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. Session selection and filters are never persisted.
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = allowed_value("view", last.view, &VIEWS) {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "group_by") {
            if let Some(v) = allowed_value("group_by", last.group_by, &GROUP_BYS) {
                settings.group_by = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_k") {
            if let Some(v) = last.top_k.filter(|k| (1..=50).contains(k)) {
                settings.top_k = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "framing") {
            if let Some(v) = allowed_value("framing", last.framing, &FRAMINGS) {
                settings.framing = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "schema") {
            if let Some(v) = allowed_value("schema", last.schema, &SCHEMAS) {
                settings.schema = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = allowed_value("format", last.format, &FORMATS) {
                settings.format = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!("Failed to save {}: {}", config_path.display(), e);
        }

        settings
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Grouping keys selected by `--group-by`, URL first.
    pub fn group_keys(&self) -> Vec<GroupKey> {
        match self.group_by.as_str() {
            "url" => vec![GroupKey::Url],
            "domain" => vec![GroupKey::Domain],
            _ => vec![GroupKey::Url, GroupKey::Domain],
        }
    }

    pub fn dwell_framing(&self) -> DwellFraming {
        self.framing.parse().unwrap_or_default()
    }

    pub fn schema_mode(&self) -> SchemaMode {
        self.schema.parse().unwrap_or_default()
    }

    /// Protocol allow-list, `None` when every protocol is allowed.
    pub fn protocol_filter(&self) -> Option<HashSet<String>> {
        if self.protocols.is_empty() {
            None
        } else {
            Some(self.protocols.iter().cloned().collect())
        }
    }

    pub fn json_output(&self) -> bool {
        self.format == "json"
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            view: Some(s.view.clone()),
            group_by: Some(s.group_by.clone()),
            top_k: Some(s.top_k),
            framing: Some(s.framing.clone()),
            schema: Some(s.schema.clone()),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
