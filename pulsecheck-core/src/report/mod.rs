//! Report assembly and persistence
//!
//! [`generate_report`] is the end-to-end entry point: scan a server
//! directory, select the analysis window, run every analytics stage and
//! assemble an immutable [`HealthReport`]. [`assemble_report`] is the pure
//! core, taking already-parsed messages and an explicit "now".
//!
//! Two renderings exist, [`render_markdown`] for people and [`render_yaml`]
//! for tools. [`save_report`] writes both next to each other.

mod markdown;
mod yaml;

pub use markdown::{render_markdown, summary_highlights};
pub use yaml::render_yaml;

use crate::analytics::benchmarks::{compare_to_benchmarks, CustomThresholds};
use crate::analytics::metrics::{
    activity_metrics, contributor_metrics, engagement_metrics, health_scores,
};
use crate::analytics::recommendations::generate_recommendations;
use crate::analytics::topics::{cluster_messages, ClusterConfig};
use crate::analytics::trends::{detect_trends, topic_trend};
use crate::error::Result;
use crate::ingest::scan_directory_with_progress;
use crate::types::{AnalysisPeriod, AnalysisWindow, HealthReport, ParsedMessage};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Markdown report file name.
pub const MARKDOWN_FILE: &str = "health-report.md";
/// Structured report file name.
pub const YAML_FILE: &str = "health-report.yaml";

/// Spans shorter than this many days produce a partial report.
const MIN_RECOMMENDED_DAYS: i64 = 7;

/// Everything needed to produce a report for one server.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub server_id: String,
    pub server_name: String,
    /// Days of history, counted back from today
    pub days: u32,
    /// Benchmark overrides, `None` for the built-in table
    pub custom_thresholds: Option<CustomThresholds>,
    pub clustering: ClusterConfig,
    /// Fixed "now" for reproducible runs; the wall clock when `None`
    pub as_of: Option<DateTime<Utc>>,
}

impl ReportOptions {
    pub fn new(server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            server_name: server_name.into(),
            days: 30,
            custom_thresholds: None,
            clustering: ClusterConfig::default(),
            as_of: None,
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }
}

/// Scan a server directory and build its report.
pub fn generate_report(server_dir: &Path, options: &ReportOptions) -> Result<HealthReport> {
    generate_report_with_progress(server_dir, options, |_, _| {})
}

/// Like [`generate_report`], reporting `(files_done, files_total)` while scanning.
pub fn generate_report_with_progress<F>(
    server_dir: &Path,
    options: &ReportOptions,
    progress: F,
) -> Result<HealthReport>
where
    F: FnMut(usize, usize),
{
    let scan = scan_directory_with_progress(server_dir, progress)?;
    let now = options.as_of.unwrap_or_else(Utc::now);
    Ok(assemble_report(
        scan.messages,
        scan.inaccessible_channels,
        options,
        now,
    ))
}

/// Build a report from parsed messages.
///
/// The window is `[today - days, today]` relative to `now`. When no message
/// falls inside it, every available message is analyzed instead and the
/// report is flagged partial.
pub fn assemble_report(
    messages: Vec<ParsedMessage>,
    inaccessible_channels: Vec<String>,
    options: &ReportOptions,
    now: DateTime<Utc>,
) -> HealthReport {
    let requested = AnalysisWindow::ending_on(now.date_naive(), options.days);
    let mut reasons: Vec<String> = Vec::new();

    let in_window: Vec<ParsedMessage> = messages
        .iter()
        .filter(|m| requested.contains(m.timestamp))
        .cloned()
        .collect();

    let (analyzed, window) = if !in_window.is_empty() {
        (in_window, requested)
    } else if let Some(span) = data_span(&messages) {
        tracing::warn!(
            window = %requested.label(),
            available = messages.len(),
            "No messages in analysis window, falling back to all messages"
        );
        reasons.push(format!(
            "No messages between {}; analyzing all {} available messages from {}",
            requested.label(),
            messages.len(),
            span.label()
        ));
        (messages, span)
    } else {
        reasons.push("No messages found in transcripts".to_string());
        (Vec::new(), requested)
    };

    if let Some(span) = data_span(&analyzed) {
        let covered = span.span_days();
        if covered < MIN_RECOMMENDED_DAYS {
            reasons.push(format!(
                "Only {} days of data available (minimum {} recommended)",
                covered, MIN_RECOMMENDED_DAYS
            ));
        }
    }

    tracing::debug!(messages = analyzed.len(), window = %window.label(), "Computing metrics");
    let activity = activity_metrics(&analyzed, &window);
    let engagement = engagement_metrics(&analyzed, &window);
    let contributors = contributor_metrics(&analyzed, &window);

    tracing::debug!("Clustering topics");
    let mut topics = cluster_messages(&analyzed, &options.clustering);

    let trends = detect_trends(&analyzed, &window, Some(&topics), &options.clustering);
    if let Some(trends) = &trends {
        for topic in &mut topics {
            topic.trend = topic_trend(&topic.label, trends);
        }
    }

    let benchmarks = compare_to_benchmarks(
        &activity,
        &engagement,
        &contributors,
        options.custom_thresholds.as_ref(),
    );
    let scores = health_scores(&activity, &engagement, &contributors);
    let recommendations = generate_recommendations(
        &activity,
        &engagement,
        &contributors,
        Some(&benchmarks),
        trends.as_ref(),
    );

    let partial_reason = if reasons.is_empty() {
        None
    } else {
        Some(reasons.join(". "))
    };

    tracing::info!(
        server = %options.server_id,
        messages = analyzed.len(),
        score = scores.overall,
        partial = partial_reason.is_some(),
        "Health report assembled"
    );

    HealthReport {
        report_id: format!("health-{}-{}", options.server_id, now.format("%Y%m%d%H%M%S")),
        server_id: options.server_id.clone(),
        server_name: options.server_name.clone(),
        generated_at: now,
        analysis_period: AnalysisPeriod {
            start: window.start.format("%Y-%m-%d").to_string(),
            end: window.end.format("%Y-%m-%d").to_string(),
            days: window.span_days().max(0) as u32,
        },
        message_count: analyzed.len(),
        channel_count: activity.channel_count(),
        health_scores: scores,
        activity,
        engagement,
        contributors,
        topics,
        trends,
        benchmarks,
        recommendations,
        partial_report: partial_reason.is_some(),
        partial_reason,
        inaccessible_channels,
    }
}

/// Date range covered by the messages, `None` when there are none.
fn data_span(messages: &[ParsedMessage]) -> Option<AnalysisWindow> {
    let first = messages.iter().map(|m| m.timestamp.date_naive()).min()?;
    let last = messages.iter().map(|m| m.timestamp.date_naive()).max()?;
    Some(AnalysisWindow::new(first, last))
}

/// Write both renderings into `out_dir`, replacing earlier reports.
///
/// Returns `(markdown_path, yaml_path)`.
pub fn save_report(report: &HealthReport, out_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(out_dir)?;

    let markdown = render_markdown(report);
    let yaml = render_yaml(report)?;

    let md_path = out_dir.join(MARKDOWN_FILE);
    let yaml_path = out_dir.join(YAML_FILE);
    write_atomic(&md_path, markdown.as_bytes())?;
    write_atomic(&yaml_path, yaml.as_bytes())?;

    tracing::info!(
        markdown = %md_path.display(),
        yaml = %yaml_path.display(),
        "Report saved"
    );
    Ok((md_path, yaml_path))
}

/// Write via a `.tmp` sibling and rename over the target.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
