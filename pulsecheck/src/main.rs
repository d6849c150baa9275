//! pulsecheck - community health reports from archived chat transcripts
//!
//! Scans a server directory of per-channel transcripts, writes
//! `health-report.md` and `health-report.yaml`, and prints a short summary.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pulsecheck_core::analytics::{compare_reports, ReportComparison};
use pulsecheck_core::format::{format_count, format_decimal, humanize_metric};
use pulsecheck_core::ingest::read_server_identity;
use pulsecheck_core::report::{generate_report_with_progress, summary_highlights};
use pulsecheck_core::{
    save_report, AnalysisPeriod, Config, HealthReport, HealthStatus, ReportOptions,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pulsecheck")]
#[command(about = "Community health report for a directory of chat transcripts")]
#[command(version)]
struct Args {
    /// Server directory holding `<channel>/messages.md` transcripts
    /// (default: `<transcripts root>/<server id>`)
    dir: Option<PathBuf>,

    /// Server identifier (default: directory name)
    #[arg(long)]
    server_id: Option<String>,

    /// Display name (default: transcript metadata, then directory name)
    #[arg(long)]
    server_name: Option<String>,

    /// Days of history to analyze (default: from config, 30)
    #[arg(long)]
    days: Option<u32>,

    /// Directory to write the report files into (default: the server directory)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Second server directory to compare against
    #[arg(long)]
    compare: Option<PathBuf>,

    /// Configuration file (default: ~/.config/pulsecheck/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref());
    let _log_guard = pulsecheck_core::logging::init(&config.logging).ok();

    let dir = match (&args.dir, &args.server_id) {
        (Some(dir), _) => dir.clone(),
        (None, Some(id)) => config.transcripts_root().join(id),
        (None, None) => anyhow::bail!("Provide a server directory or --server-id"),
    };

    let options = report_options(
        &config,
        &args,
        &dir,
        args.server_id.clone(),
        args.server_name.clone(),
    )?;
    let report = build_report(&dir, &options)?;

    let out_dir = args.output.clone().unwrap_or_else(|| dir.clone());
    let (md_path, yaml_path) = save_report(&report, &out_dir)
        .with_context(|| format!("failed to write report to {}", out_dir.display()))?;

    let comparison = match &args.compare {
        Some(other_dir) => {
            let other_options = report_options(&config, &args, other_dir, None, None)?;
            let other = build_report(other_dir, &other_options)?;
            Some(compare_reports(&report, &other))
        }
        None => None,
    };

    match args.format {
        OutputFormat::Json => print_json(&report, &md_path, &yaml_path, comparison.as_ref())?,
        OutputFormat::Text => print_terminal(&report, &md_path, &yaml_path, comparison.as_ref()),
    }

    tracing::info!(
        server = %report.server_id,
        score = report.health_scores.overall,
        "pulsecheck complete"
    );

    Ok(())
}

/// Load the config, falling back to defaults when it is missing or invalid.
fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Warning: {}; using default configuration", e);
        Config::default()
    })
}

fn report_options(
    config: &Config,
    args: &Args,
    dir: &Path,
    server_id: Option<String>,
    server_name: Option<String>,
) -> Result<ReportOptions> {
    let dir_name = directory_name(dir);
    let server_id = server_id.unwrap_or_else(|| dir_name.clone());

    let server_name = match server_name {
        Some(name) => name,
        None => read_server_identity(dir)
            .with_context(|| format!("cannot read transcript directory {}", dir.display()))?
            .map(|meta| meta.server_name)
            .unwrap_or(dir_name),
    };

    let mut options = config.report_options(&server_id, &server_name);
    if let Some(days) = args.days {
        options = options.with_days(days);
    }
    if let Some(date) = args.as_of {
        options = options.with_as_of(date.and_time(NaiveTime::MIN).and_utc());
    }
    Ok(options)
}

/// Final path component, resolving `.` and friends first.
fn directory_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(dir)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "server".to_string())
}

/// Generate a report with a progress bar over the transcript scan.
fn build_report(dir: &Path, options: &ReportOptions) -> Result<HealthReport> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(options.server_name.clone());

    let report = generate_report_with_progress(dir, options, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })
    .with_context(|| format!("cannot read transcript directory {}", dir.display()))?;

    pb.finish_and_clear();
    Ok(report)
}

fn print_terminal(
    report: &HealthReport,
    md_path: &Path,
    yaml_path: &Path,
    comparison: Option<&ReportComparison>,
) {
    let status = HealthStatus::from_score(report.health_scores.overall);
    let period = &report.analysis_period;

    println!();
    println!("Community Health Report: {}", report.server_name);
    println!("{}", "─".repeat(60));
    println!(
        "  Period:   {} to {} ({} days)",
        period.start, period.end, period.days
    );
    println!(
        "  Messages: {} across {} channels",
        format_count(report.message_count as u64),
        report.channel_count
    );
    println!(
        "  Score:    {}/100 {} {}",
        report.health_scores.overall,
        status.emoji(),
        status.label()
    );
    if let Some(reason) = &report.partial_reason {
        println!("  Note:     {}", reason);
    }
    if !report.inaccessible_channels.is_empty() {
        println!(
            "  Skipped:  {}",
            report.inaccessible_channels.join(", ")
        );
    }
    println!();

    println!("Key findings:");
    for highlight in summary_highlights(report) {
        println!("  - {}", highlight);
    }
    println!();

    if let Some(comparison) = comparison {
        println!(
            "{:<24} {:>14} {:>14}",
            "Metric", comparison.first_server, comparison.second_server
        );
        for row in &comparison.rows {
            println!(
                "{:<24} {:>14} {:>14}",
                humanize_metric(&row.metric),
                format_decimal(row.first),
                format_decimal(row.second)
            );
        }
        println!();
    }

    println!("Report written:");
    println!("  {}", md_path.display());
    println!("  {}", yaml_path.display());
}

/// Machine-readable run summary for `--format json`.
#[derive(Serialize)]
struct JsonSummary<'a> {
    report_id: &'a str,
    server_id: &'a str,
    server_name: &'a str,
    analysis_period: &'a AnalysisPeriod,
    message_count: usize,
    channel_count: usize,
    overall_score: u8,
    status: &'static str,
    partial_report: bool,
    partial_reason: Option<&'a str>,
    inaccessible_channels: &'a [String],
    key_findings: Vec<String>,
    recommendations: usize,
    comparison: Option<&'a ReportComparison>,
    files: JsonFiles<'a>,
}

#[derive(Serialize)]
struct JsonFiles<'a> {
    markdown: &'a Path,
    yaml: &'a Path,
}

fn print_json(
    report: &HealthReport,
    md_path: &Path,
    yaml_path: &Path,
    comparison: Option<&ReportComparison>,
) -> Result<()> {
    let summary = JsonSummary {
        report_id: &report.report_id,
        server_id: &report.server_id,
        server_name: &report.server_name,
        analysis_period: &report.analysis_period,
        message_count: report.message_count,
        channel_count: report.channel_count,
        overall_score: report.health_scores.overall,
        status: HealthStatus::from_score(report.health_scores.overall).as_str(),
        partial_report: report.partial_report,
        partial_reason: report.partial_reason.as_deref(),
        inaccessible_channels: &report.inaccessible_channels,
        key_findings: summary_highlights(report),
        recommendations: report.recommendations.len(),
        comparison,
        files: JsonFiles {
            markdown: md_path,
            yaml: yaml_path,
        },
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
