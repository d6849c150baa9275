//! # pulsecheck-core
//!
//! Core library for pulsecheck - community health reports from archived
//! chat transcripts.
//!
//! This library provides:
//! - A streaming parser for per-channel markdown transcripts
//! - Activity, engagement and contributor metrics with composite scores
//! - TF-IDF topic clustering and week-over-week trend detection
//! - Benchmark classification and rule-based recommendations
//! - Report assembly with markdown and YAML renderings
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Layer 0 (Raw):** Transcript files on disk (never modified)
//! - **Layer 1 (Parsed):** [`ParsedMessage`] values streamed from each file
//! - **Layer 2 (Derived):** Metrics, topics, trends and the [`HealthReport`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulsecheck_core::{generate_report, save_report, Config};
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let options = config.report_options("123", "My Server");
//!
//! let dir = Path::new("transcripts/my-server");
//! let report = generate_report(dir, &options).expect("failed to read transcripts");
//! save_report(&report, dir).expect("failed to write report");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{scan_directory, ScanResult};
pub use report::{
    assemble_report, generate_report, render_markdown, render_yaml, save_report, ReportOptions,
};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod report;
pub mod types;
