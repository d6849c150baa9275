//! Week-over-week trend detection
//!
//! The last 7 dates of the analysis window are compared with the 7 dates
//! immediately before them. Activity and engagement metrics are recomputed
//! for each half, and topics are re-clustered on the previous week so topic
//! volume can be compared by label.

use crate::analytics::metrics::{activity_metrics, engagement_metrics};
use crate::analytics::topics::{cluster_messages, ClusterConfig, OTHER_LABEL};
use crate::format::round1;
use crate::types::{
    AnalysisWindow, HighlightKind, Impact, MetricChange, ParsedMessage, TopicChange, TopicCluster,
    TopicTrend, TrendData, TrendDirection, TrendHighlight,
};
use chrono::Duration;
use std::collections::HashMap;

/// Minimum `end - start` span, in days, before trends are computed.
pub const MIN_DAYS_FOR_TRENDS: i64 = 14;
/// Length of each compared period.
pub const COMPARISON_DAYS: i64 = 7;
/// Absolute percent change at which a metric change is significant.
pub const SIGNIFICANCE_THRESHOLD: f64 = 20.0;

/// Messages a brand-new topic needs to count as emerging.
const EMERGING_MIN_MESSAGES: usize = 10;
/// Percent change separating rising/declining topics from stable ones.
const TOPIC_SHIFT_PCT: f64 = 50.0;
const STABLE_TOPICS_LIMIT: usize = 5;

const RESPONSE_TIME: &str = "avg_response_time";

/// Compare the latest week of the window against the week before it.
///
/// Returns `None` when the window spans fewer than 14 days or either week
/// has no messages.
pub fn detect_trends(
    messages: &[ParsedMessage],
    window: &AnalysisWindow,
    current_topics: Option<&[TopicCluster]>,
    cluster_config: &ClusterConfig,
) -> Option<TrendData> {
    if window.span_days() < MIN_DAYS_FOR_TRENDS {
        tracing::debug!(
            span_days = window.span_days(),
            "Window too short for trend detection"
        );
        return None;
    }

    let current_window = AnalysisWindow::new(
        window.end - Duration::days(COMPARISON_DAYS - 1),
        window.end,
    );
    let previous_end = current_window.start - Duration::days(1);
    let previous_window = AnalysisWindow::new(
        previous_end - Duration::days(COMPARISON_DAYS - 1),
        previous_end,
    );

    let current: Vec<ParsedMessage> = messages
        .iter()
        .filter(|m| current_window.contains(m.timestamp))
        .cloned()
        .collect();
    let previous: Vec<ParsedMessage> = messages
        .iter()
        .filter(|m| previous_window.contains(m.timestamp))
        .cloned()
        .collect();

    if current.is_empty() || previous.is_empty() {
        tracing::debug!(
            current = current.len(),
            previous = previous.len(),
            "A comparison week has no messages, skipping trends"
        );
        return None;
    }

    let cur_activity = activity_metrics(&current, &current_window);
    let prev_activity = activity_metrics(&previous, &previous_window);
    let cur_engagement = engagement_metrics(&current, &current_window);
    let prev_engagement = engagement_metrics(&previous, &previous_window);

    let pairs = [
        (
            "message_volume",
            cur_activity.total_messages as f64,
            prev_activity.total_messages as f64,
        ),
        (
            "messages_per_day",
            cur_activity.messages_per_day_average,
            prev_activity.messages_per_day_average,
        ),
        (
            "active_channels",
            cur_activity.active_channels as f64,
            prev_activity.active_channels as f64,
        ),
        (
            "daily_active_members",
            cur_engagement.daily_active_members_average,
            prev_engagement.daily_active_members_average,
        ),
        (
            "unique_authors",
            cur_engagement.unique_authors as f64,
            prev_engagement.unique_authors as f64,
        ),
        (
            "reply_rate",
            cur_engagement.reply_rate,
            prev_engagement.reply_rate,
        ),
        (
            RESPONSE_TIME,
            cur_engagement.avg_response_time_hours,
            prev_engagement.avg_response_time_hours,
        ),
        (
            "total_reactions",
            cur_engagement.total_reactions as f64,
            prev_engagement.total_reactions as f64,
        ),
    ];

    let metric_changes: Vec<MetricChange> = pairs
        .iter()
        .filter_map(|(metric, cur, prev)| metric_change(metric, *cur, *prev))
        .collect();

    let mut emerging_topics = Vec::new();
    let mut declining_topics = Vec::new();
    let mut stable_topics = Vec::new();

    if let Some(current_topics) = current_topics.filter(|t| !t.is_empty()) {
        let previous_topics = cluster_messages(&previous, cluster_config);
        let previous_counts: HashMap<&str, usize> = previous_topics
            .iter()
            .map(|t| (t.label.as_str(), t.message_count))
            .collect();

        for topic in current_topics.iter().filter(|t| t.label != OTHER_LABEL) {
            let prev_count = previous_counts
                .get(topic.label.as_str())
                .copied()
                .unwrap_or(0);
            let count = topic.message_count;

            if prev_count == 0 {
                if count >= EMERGING_MIN_MESSAGES {
                    emerging_topics.push(TopicChange {
                        label: topic.label.clone(),
                        previous_count: 0,
                        current_count: count,
                        change_pct: 100.0,
                    });
                }
                continue;
            }

            let change_pct = (count as f64 - prev_count as f64) / prev_count as f64 * 100.0;
            let change = TopicChange {
                label: topic.label.clone(),
                previous_count: prev_count,
                current_count: count,
                change_pct: round1(change_pct),
            };
            if change_pct > TOPIC_SHIFT_PCT {
                emerging_topics.push(change);
            } else if change_pct < -TOPIC_SHIFT_PCT {
                declining_topics.push(change);
            } else {
                stable_topics.push(change);
            }
        }
        stable_topics.truncate(STABLE_TOPICS_LIMIT);
    }

    let highlights = metric_changes.iter().filter_map(highlight).collect();

    tracing::debug!(
        changes = metric_changes.len(),
        emerging = emerging_topics.len(),
        declining = declining_topics.len(),
        "Trends detected"
    );

    Some(TrendData {
        comparison_period_current: current_window.label(),
        comparison_period_previous: previous_window.label(),
        metric_changes,
        emerging_topics,
        declining_topics,
        stable_topics,
        highlights,
    })
}

/// Percent change between two period values.
///
/// `None` when both are zero. A rise from zero counts as +100%. For response
/// time the direction is inverted, so `Up` always means better.
fn metric_change(metric: &str, current: f64, previous: f64) -> Option<MetricChange> {
    if previous == 0.0 && current == 0.0 {
        return None;
    }

    let change_pct = if previous == 0.0 {
        100.0
    } else {
        (current - previous) / previous * 100.0
    };
    // Shorter response times are an improvement
    let signed = if metric == RESPONSE_TIME {
        -change_pct
    } else {
        change_pct
    };
    let direction = if signed > 0.0 {
        TrendDirection::Up
    } else if signed < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    Some(MetricChange {
        metric: metric.to_string(),
        current: round1(current),
        previous: round1(previous),
        change_pct: round1(change_pct),
        direction,
        significant: change_pct.abs() >= SIGNIFICANCE_THRESHOLD,
    })
}

fn display_name(metric: &str) -> &str {
    match metric {
        "message_volume" => "Message volume",
        "messages_per_day" => "Daily messages",
        "active_channels" => "Active channels",
        "daily_active_members" => "Daily active members",
        "unique_authors" => "Unique contributors",
        "reply_rate" => "Reply rate",
        RESPONSE_TIME => "Response time",
        "total_reactions" => "Total reactions",
        other => other,
    }
}

fn highlight(change: &MetricChange) -> Option<TrendHighlight> {
    if !change.significant {
        return None;
    }

    let name = display_name(&change.metric);
    let magnitude = change.change_pct.abs();
    let is_response_time = change.metric == RESPONSE_TIME;

    let (kind, description, impact) = match (change.direction, is_response_time) {
        (TrendDirection::Stable, _) => return None,
        (TrendDirection::Up, true) => (
            HighlightKind::Improvement,
            format!("{} decreased {:.0}% (faster responses)", name, magnitude),
            Impact::Positive,
        ),
        (TrendDirection::Down, true) => (
            HighlightKind::Decline,
            format!("{} increased {:.0}% (slower responses)", name, magnitude),
            Impact::Warning,
        ),
        (TrendDirection::Up, false) => (
            HighlightKind::Spike,
            format!("{} increased {:.0}%", name, magnitude),
            Impact::Positive,
        ),
        (TrendDirection::Down, false) => (
            HighlightKind::Decline,
            format!("{} decreased {:.0}%", name, magnitude),
            Impact::Warning,
        ),
    };

    Some(TrendHighlight {
        kind,
        description,
        impact,
    })
}

/// Trend tag for a current topic, given the detected topic changes.
pub fn topic_trend(label: &str, trends: &TrendData) -> TopicTrend {
    if let Some(change) = trends.emerging_topics.iter().find(|c| c.label == label) {
        if change.previous_count == 0 {
            TopicTrend::New
        } else {
            TopicTrend::Rising
        }
    } else if trends.declining_topics.iter().any(|c| c.label == label) {
        TopicTrend::Declining
    } else {
        TopicTrend::Stable
    }
}
