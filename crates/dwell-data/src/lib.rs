//! Data layer for the dwell analyzer.
//!
//! Responsible for discovering, reading and parsing CSV network logs,
//! building per-session dwell timelines, aggregating and ranking dwell time,
//! computing summary statistics and running the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod parser;
pub mod reader;
pub mod schema;
pub mod summary;
pub mod timeline;

pub use dwell_core as core;
