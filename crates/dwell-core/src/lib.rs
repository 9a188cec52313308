//! Shared types for the dwell analyzer.
//!
//! Holds the record/timeline/aggregate models, the error type, command-line
//! settings, descriptive-statistics helpers and display formatting used by
//! the data and binary crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod time_utils;

pub use error::{DwellError, Result};
