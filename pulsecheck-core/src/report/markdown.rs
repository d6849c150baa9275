//! Markdown rendering of a health report
//!
//! Section order is fixed: summary, scores table, activity, topics, trends,
//! recommendations, benchmarks.

use crate::format::{
    format_change, format_count, format_decimal, format_hours, humanize_metric,
};
use crate::types::{HealthReport, HealthStatus, Priority};
use std::fmt::{self, Write};

const SUMMARY_HIGHLIGHTS: usize = 5;
const CHANNEL_ROWS: usize = 5;
const TREND_HIGHLIGHTS: usize = 5;
const TOPIC_CHANGES: usize = 3;
const RECS_PER_PRIORITY: usize = 3;

/// Render the report as a markdown document.
pub fn render_markdown(report: &HealthReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &HealthReport) -> fmt::Result {
    let period = &report.analysis_period;

    writeln!(out, "---")?;
    writeln!(out, "report_id: \"{}\"", report.report_id)?;
    writeln!(out, "server_id: \"{}\"", report.server_id)?;
    writeln!(out, "server_name: \"{}\"", report.server_name)?;
    writeln!(out, "generated_at: \"{}\"", report.generated_at.to_rfc3339())?;
    writeln!(
        out,
        "analysis_period: \"{} to {} ({} days)\"",
        period.start, period.end, period.days
    )?;
    writeln!(out, "---")?;
    writeln!(out)?;

    writeln!(out, "# Community Health Report: {}", report.server_name)?;
    writeln!(out)?;

    if let Some(reason) = &report.partial_reason {
        writeln!(out, "> **Note**: {}", reason)?;
        writeln!(out)?;
    }
    if !report.inaccessible_channels.is_empty() {
        writeln!(
            out,
            "> **Unreadable channels**: {}",
            report
                .inaccessible_channels
                .iter()
                .map(|c| format!("#{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(out)?;
    }

    write_summary(out, report)?;
    write_scores(out, report)?;
    write_activity(out, report)?;
    write_topics(out, report)?;
    write_trends(out, report)?;
    write_recommendations(out, report)?;
    write_benchmarks(out, report)?;

    writeln!(out, "---")?;
    writeln!(out, "*Generated by pulsecheck*")?;
    Ok(())
}

fn write_summary(out: &mut String, report: &HealthReport) -> fmt::Result {
    let overall = report.health_scores.overall;
    let status = HealthStatus::from_score(overall);

    writeln!(out, "## Executive Summary")?;
    writeln!(out)?;
    writeln!(
        out,
        "**Overall Health Score: {}/100** ({})",
        overall,
        status.label()
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "Your community shows {} messages from {} unique members over the past {} days. Key highlights:",
        format_count(report.message_count as u64),
        format_count(report.engagement.unique_authors as u64),
        report.analysis_period.days
    )?;
    writeln!(out)?;
    for highlight in summary_highlights(report)
        .iter()
        .take(SUMMARY_HIGHLIGHTS)
    {
        writeln!(out, "- {}", highlight)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Headline bullets for the executive summary.
pub fn summary_highlights(report: &HealthReport) -> Vec<String> {
    let mut highlights = Vec::new();
    let engagement = &report.engagement;

    if engagement.daily_active_members_percentage >= 10.0 {
        highlights.push(format!(
            "{} Daily active members ({:.1}%) meet the healthy threshold",
            HealthStatus::Healthy.emoji(),
            engagement.daily_active_members_percentage
        ));
    } else {
        highlights.push(format!(
            "{} Daily active members ({:.1}%) are below the healthy threshold",
            HealthStatus::Warning.emoji(),
            engagement.daily_active_members_percentage
        ));
    }

    if engagement.reply_rate >= 30.0 {
        highlights.push(format!(
            "{} Reply rate ({:.1}%) indicates good engagement",
            HealthStatus::Healthy.emoji(),
            engagement.reply_rate
        ));
    } else {
        highlights.push(format!(
            "{} Reply rate ({:.1}%) needs improvement",
            HealthStatus::Warning.emoji(),
            engagement.reply_rate
        ));
    }

    if let Some(trends) = &report.trends {
        for h in trends.highlights.iter().take(2) {
            highlights.push(format!("{} {}", h.impact.emoji(), h.description));
        }
    }

    let high = report
        .recommendations
        .iter()
        .filter(|r| r.priority == Priority::High)
        .count();
    if high > 0 {
        highlights.push(format!(
            "🔔 {} high-priority recommendation(s) to address",
            high
        ));
    }

    highlights
}

fn write_scores(out: &mut String, report: &HealthReport) -> fmt::Result {
    let scores = &report.health_scores;

    writeln!(out, "## Health Scores")?;
    writeln!(out)?;
    writeln!(out, "| Dimension | Score | Status |")?;
    writeln!(out, "|-----------|-------|--------|")?;
    for (name, score) in [
        ("Activity", scores.activity),
        ("Engagement", scores.engagement),
        ("Responsiveness", scores.responsiveness),
        ("Diversity", scores.diversity),
    ] {
        let status = HealthStatus::from_score(score);
        writeln!(
            out,
            "| {} | {} | {} {} |",
            name,
            score,
            status.emoji(),
            status.label()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_activity(out: &mut String, report: &HealthReport) -> fmt::Result {
    let activity = &report.activity;
    let engagement = &report.engagement;

    writeln!(out, "## Activity Overview")?;
    writeln!(out)?;
    writeln!(out, "### Message Volume")?;
    writeln!(
        out,
        "- **Total messages**: {}",
        format_count(activity.total_messages as u64)
    )?;
    writeln!(
        out,
        "- **Daily average**: {:.1} messages/day (min {}, max {})",
        activity.messages_per_day_average,
        activity.messages_per_day_min,
        activity.messages_per_day_max
    )?;
    if let Some(day) = activity.peak_days.first() {
        writeln!(out, "- **Peak day**: {}", day.day)?;
    }
    if let Some(hour) = activity.peak_hours.first() {
        writeln!(out, "- **Peak hour**: {:02}:00 UTC", hour.hour)?;
    }
    writeln!(
        out,
        "- **Average response time**: {}",
        format_hours(engagement.avg_response_time_hours)
    )?;
    writeln!(out)?;

    if !activity.channel_breakdown.is_empty() {
        writeln!(out, "### Channel Distribution")?;
        writeln!(out)?;
        writeln!(out, "| Channel | Messages | % |")?;
        writeln!(out, "|---------|----------|---|")?;
        for channel in activity.channel_breakdown.iter().take(CHANNEL_ROWS) {
            writeln!(
                out,
                "| #{} | {} | {}% |",
                channel.name,
                format_count(channel.messages as u64),
                channel.percentage
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_topics(out: &mut String, report: &HealthReport) -> fmt::Result {
    if report.topics.is_empty() {
        return Ok(());
    }

    writeln!(out, "## Top Topics")?;
    writeln!(out)?;
    for (i, topic) in report.topics.iter().enumerate() {
        writeln!(
            out,
            "{}. **{}** ({}% of messages, {}) - Keywords: {}",
            i + 1,
            topic.label,
            topic.percentage,
            topic.trend.as_str(),
            topic.keywords.join(", ")
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_trends(out: &mut String, report: &HealthReport) -> fmt::Result {
    let Some(trends) = &report.trends else {
        return Ok(());
    };

    writeln!(out, "## Trends")?;
    writeln!(out)?;
    writeln!(
        out,
        "*{} compared with {}*",
        trends.comparison_period_current, trends.comparison_period_previous
    )?;
    writeln!(out)?;

    if !trends.metric_changes.is_empty() {
        writeln!(out, "| Metric | Previous | Current | Change |")?;
        writeln!(out, "|--------|----------|---------|--------|")?;
        for change in &trends.metric_changes {
            writeln!(
                out,
                "| {} | {} | {} | {} {} |",
                humanize_metric(&change.metric),
                format_decimal(change.previous),
                format_decimal(change.current),
                change.direction.arrow(),
                format_change(change.change_pct)
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "### Significant Changes This Week")?;
    if trends.highlights.is_empty() {
        writeln!(out, "- No significant changes detected")?;
    } else {
        for h in trends.highlights.iter().take(TREND_HIGHLIGHTS) {
            writeln!(out, "- {} **{}**", h.impact.emoji(), h.description)?;
        }
    }
    writeln!(out)?;

    if !trends.emerging_topics.is_empty() {
        writeln!(out, "### Emerging Topics")?;
        for topic in trends.emerging_topics.iter().take(TOPIC_CHANGES) {
            if topic.previous_count == 0 {
                writeln!(
                    out,
                    "- \"{}\" - {} messages (new this week)",
                    topic.label, topic.current_count
                )?;
            } else {
                writeln!(
                    out,
                    "- \"{}\" - {} messages ({})",
                    topic.label,
                    topic.current_count,
                    format_change(topic.change_pct)
                )?;
            }
        }
        writeln!(out)?;
    }

    if !trends.declining_topics.is_empty() {
        writeln!(out, "### Declining Topics")?;
        for topic in trends.declining_topics.iter().take(TOPIC_CHANGES) {
            writeln!(
                out,
                "- \"{}\" - {} messages ({})",
                topic.label,
                topic.current_count,
                format_change(topic.change_pct)
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_recommendations(out: &mut String, report: &HealthReport) -> fmt::Result {
    if report.recommendations.is_empty() {
        return Ok(());
    }

    writeln!(out, "## Recommendations")?;
    writeln!(out)?;
    for priority in [Priority::High, Priority::Medium, Priority::Low] {
        let recs: Vec<_> = report
            .recommendations
            .iter()
            .filter(|r| r.priority == priority)
            .take(RECS_PER_PRIORITY)
            .collect();
        if recs.is_empty() {
            continue;
        }

        writeln!(out, "### {}", priority.label())?;
        for (i, rec) in recs.iter().enumerate() {
            writeln!(out, "{}. **{}**", i + 1, rec.title)?;
            writeln!(out, "   - {}", rec.description)?;
            if priority == Priority::High {
                let actions: Vec<&str> = rec.actions.iter().take(2).map(String::as_str).collect();
                writeln!(out, "   - Actions: {}", actions.join(", "))?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_benchmarks(out: &mut String, report: &HealthReport) -> fmt::Result {
    let benchmarks = &report.benchmarks;

    writeln!(out, "## Benchmark Comparison")?;
    writeln!(out)?;
    writeln!(
        out,
        "Benchmark score: {}/100 ({} thresholds, overall {})",
        benchmarks.score,
        benchmarks.source.as_str(),
        benchmarks.overall_assessment.as_str()
    )?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value | Threshold | Status |")?;
    writeln!(out, "|--------|-------|-----------|--------|")?;
    for result in &benchmarks.comparisons {
        let bound = if result.lower_is_better { "≤" } else { "≥" };
        writeln!(
            out,
            "| {} | {:.1} | {} {:.1} | {} {} |",
            humanize_metric(&result.metric),
            result.value,
            bound,
            result.threshold_healthy,
            result.status.emoji(),
            result.status.label()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::tests::{message, ts};
    use crate::report::{assemble_report, ReportOptions};

    fn sample_report() -> HealthReport {
        let mut messages = Vec::new();
        for day in 1..=28 {
            messages.push(message(
                "alice",
                "general",
                ts(&format!("2026-03-{:02}", day), "09:00"),
                "database migration plan",
            ));
        }
        assemble_report(
            messages,
            vec!["secret".to_string()],
            &ReportOptions::new("7", "Rust Club").with_days(27),
            ts("2026-03-28", "18:00"),
        )
    }

    #[test]
    fn test_sections_in_order() {
        let md = render_markdown(&sample_report());
        let order = [
            "## Executive Summary",
            "## Health Scores",
            "## Activity Overview",
            "## Top Topics",
            "## Trends",
            "## Recommendations",
            "## Benchmark Comparison",
        ];
        let positions: Vec<usize> = order.iter().map(|h| md.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(md.starts_with("---\nreport_id: \"health-7-20260328180000\""));
        assert!(md.trim_end().ends_with("*Generated by pulsecheck*"));
    }

    #[test]
    fn test_notes_and_tables() {
        let md = render_markdown(&sample_report());
        assert!(md.contains("> **Unreadable channels**: #secret"));
        assert!(md.contains("| #general | 28 | 100% |"));
        assert!(md.contains("| Activity |"));
        assert!(md.contains("Keywords: database, migration, plan"));
    }

    #[test]
    fn test_partial_note() {
        let report = assemble_report(
            Vec::new(),
            Vec::new(),
            &ReportOptions::new("1", "Empty"),
            ts("2026-03-28", "18:00"),
        );
        let md = render_markdown(&report);
        assert!(md.contains("> **Note**: No messages found in transcripts"));
        assert!(!md.contains("## Top Topics"));
        assert!(!md.contains("## Trends"));
    }
}
