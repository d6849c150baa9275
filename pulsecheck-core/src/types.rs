//! Core domain types for pulsecheck
//!
//! These types form the data model shared by every pipeline stage, from the
//! parsed transcript message up to the assembled [`HealthReport`].
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Transcript** | One text file per channel of date-grouped, timestamped messages |
//! | **Analysis window** | Inclusive calendar-date range being analyzed |
//! | **Contributor** | Any author who posted at least one message in the analyzed set |
//! | **Benchmark** | A healthy/warning threshold pair used to classify a metric |
//! | **Significant change** | A period-over-period change of at least 20% |
//!
//! Every enum here is closed: formatting goes through an exhaustive `match`
//! (`as_str`, `label`) rather than lookup tables.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================
// Transcript input
// ============================================

/// A single message recovered from a transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMessage {
    /// Absolute timestamp (date section + time of day)
    pub timestamp: DateTime<Utc>,
    pub author_id: String,
    pub author_name: String,
    pub channel_name: String,
    /// Body text, lines joined with `\n`
    pub content: String,
    pub is_reply: bool,
    /// Name of the replied-to author, when this is a reply
    pub reply_to_author: Option<String>,
    /// Reaction emoji -> count
    pub reactions: BTreeMap<String, u32>,
    /// Sum of all reaction counts
    pub total_reactions: u32,
    pub has_attachment: bool,
    pub has_embed: bool,
    /// Date section the message appeared under (`YYYY-MM-DD`)
    pub date_str: String,
}

/// Metadata block from the head of a transcript file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMetadata {
    pub channel_id: String,
    pub channel_name: String,
    pub server_id: String,
    pub server_name: String,
    pub last_sync: String,
}

// ============================================
// Analysis window
// ============================================

/// Inclusive calendar-date range under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    /// Create a window, swapping the bounds if given in reverse.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Window of `days` days back from `end` (`[end - days, end]`).
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self::new(end - Duration::days(i64::from(days)), end)
    }

    /// Number of calendar dates in the window (at least 1).
    pub fn day_count(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(1) as usize
    }

    /// Whole days between start and end.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Every date in the window, oldest first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.day_count() as i64).map(move |offset| start + Duration::days(offset))
    }

    /// Whether a timestamp falls on a date inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let date = ts.date_naive();
        self.start <= date && date <= self.end
    }

    /// Display label, e.g. `2026-01-01 to 2026-01-07`.
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// ============================================
// Activity
// ============================================

/// Message count for one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelActivity {
    pub name: String,
    pub messages: usize,
    pub percentage: f64,
}

/// Message count for one hour of the day (0-23).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakHour {
    pub hour: u32,
    pub messages: usize,
}

/// Message count for one weekday.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDay {
    pub day: String,
    pub messages: usize,
}

/// Quantitative measurements of community activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityMetrics {
    pub total_messages: usize,
    pub messages_per_day_average: f64,
    pub messages_per_day_min: usize,
    pub messages_per_day_max: usize,
    pub active_channels: usize,
    pub inactive_channels: usize,
    /// Top 10 channels by message count
    pub channel_breakdown: Vec<ChannelActivity>,
    /// Top 3 hours of the day
    pub peak_hours: Vec<PeakHour>,
    /// Top 3 weekdays
    pub peak_days: Vec<PeakDay>,
}

impl ActivityMetrics {
    /// Active plus inactive channels.
    pub fn channel_count(&self) -> usize {
        self.active_channels + self.inactive_channels
    }
}

// ============================================
// Engagement
// ============================================

/// Aggregate count for one reaction emoji.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionStat {
    pub emoji: String,
    pub count: u32,
}

/// Measurements of member engagement and interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementMetrics {
    pub unique_authors: usize,
    pub daily_active_members_average: f64,
    pub daily_active_members_percentage: f64,
    pub messages_per_author_average: f64,
    pub messages_per_author_median: f64,
    /// Percentage of messages that are replies
    pub reply_rate: f64,
    /// Mean gap before a reply, see `analytics::metrics` for the heuristic
    pub avg_response_time_hours: f64,
    pub total_reactions: u64,
    pub messages_with_reactions: usize,
    pub avg_reactions_per_message: f64,
    /// Top 5 reactions by aggregate count
    pub top_reactions: Vec<ReactionStat>,
}

// ============================================
// Contributors
// ============================================

/// One contributor's share of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopContributor {
    pub author_id: String,
    pub author_name: String,
    pub message_count: usize,
    pub percentage: f64,
    /// Reactions received on this author's messages
    pub engagement_received: u64,
}

/// Share of all messages written by the top 1/10/50% of contributors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorDistribution {
    pub top_1_pct: f64,
    pub top_10_pct: f64,
    pub top_50_pct: f64,
}

/// Analysis of community contributors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContributorMetrics {
    pub total_unique: usize,
    pub top_contributors: Vec<TopContributor>,
    pub new_contributors_count: usize,
    pub new_contributors_retention_rate: f64,
    /// None when there were no messages
    pub distribution: Option<ContributorDistribution>,
}

/// Composite 0-100 scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthScores {
    pub overall: u8,
    pub activity: u8,
    pub engagement: u8,
    pub responsiveness: u8,
    pub diversity: u8,
}

// ============================================
// Topics
// ============================================

/// Topic sentiment. Clustering never infers sentiment, so topics are neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    #[default]
    Neutral,
}

/// How a topic moved relative to the previous week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicTrend {
    Rising,
    #[default]
    Stable,
    Declining,
    New,
}

impl TopicTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicTrend::Rising => "rising",
            TopicTrend::Stable => "stable",
            TopicTrend::Declining => "declining",
            TopicTrend::New => "new",
        }
    }
}

/// A group of messages sharing a dominant keyword.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicCluster {
    pub id: usize,
    pub label: String,
    pub keywords: Vec<String>,
    pub message_count: usize,
    pub percentage: f64,
    pub channels: Vec<String>,
    pub top_contributors: Vec<TopContributor>,
    /// Up to 3 excerpts, each at most 100 characters plus an ellipsis
    pub sample_messages: Vec<String>,
    pub sentiment: Sentiment,
    pub trend: TopicTrend,
}

// ============================================
// Trends
// ============================================

/// Direction of a metric change. For response time, `Up` means faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Up => "↑",
            TrendDirection::Down => "↓",
            TrendDirection::Stable => "→",
        }
    }
}

/// Change in one metric between the previous and current week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChange {
    pub metric: String,
    pub current: f64,
    pub previous: f64,
    pub change_pct: f64,
    pub direction: TrendDirection,
    /// `|change_pct| >= 20`
    pub significant: bool,
}

/// Topic volume in the previous and current week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicChange {
    pub label: String,
    pub previous_count: usize,
    pub current_count: usize,
    pub change_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    Spike,
    Decline,
    Improvement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Positive,
    Warning,
}

impl Impact {
    pub fn emoji(&self) -> &'static str {
        match self {
            Impact::Positive => "📈",
            Impact::Warning => "📉",
        }
    }
}

/// Human-readable summary of a significant change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendHighlight {
    pub kind: HighlightKind,
    pub description: String,
    pub impact: Impact,
}

/// Week-over-week comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendData {
    pub comparison_period_current: String,
    pub comparison_period_previous: String,
    pub metric_changes: Vec<MetricChange>,
    pub emerging_topics: Vec<TopicChange>,
    pub declining_topics: Vec<TopicChange>,
    pub stable_topics: Vec<TopicChange>,
    pub highlights: Vec<TrendHighlight>,
}

// ============================================
// Benchmarks
// ============================================

/// Health classification of a metric or of the whole community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Warning => "Warning",
            HealthStatus::Critical => "Critical",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✅",
            HealthStatus::Warning => "⚠️",
            HealthStatus::Critical => "❌",
        }
    }

    /// Points contributed to the aggregate benchmark score.
    pub fn points(&self) -> u32 {
        match self {
            HealthStatus::Healthy => 100,
            HealthStatus::Warning => 50,
            HealthStatus::Critical => 20,
        }
    }

    /// Status band for a 0-100 score.
    pub fn from_score(score: u8) -> Self {
        if score >= 60 {
            HealthStatus::Healthy
        } else if score >= 40 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

/// Whether thresholds came from the built-in table or the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkSource {
    Default,
    Custom,
}

impl BenchmarkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkSource::Default => "default",
            BenchmarkSource::Custom => "custom",
        }
    }
}

/// One metric compared against its thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub metric: String,
    pub value: f64,
    pub threshold_healthy: f64,
    pub threshold_warning: f64,
    pub lower_is_better: bool,
    pub status: HealthStatus,
}

/// All metrics compared against their thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkComparison {
    pub source: BenchmarkSource,
    pub comparisons: Vec<BenchmarkResult>,
    pub overall_assessment: HealthStatus,
    /// 0-100
    pub score: u8,
}

// ============================================
// Recommendations
// ============================================

/// Recommendation priority. Ordering is High < Medium < Low so a plain
/// sort puts the most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High Priority",
            Priority::Medium => "Medium Priority",
            Priority::Low => "Low Priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Engagement,
    Activity,
    Content,
    Moderation,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Engagement => "engagement",
            Category::Activity => "activity",
            Category::Content => "content",
            Category::Moderation => "moderation",
        }
    }
}

/// Actionable suggestion derived from the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: usize,
    pub priority: Priority,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub metric_reference: String,
    pub current_value: f64,
    pub target_value: f64,
    pub actions: Vec<String>,
}

// ============================================
// Report
// ============================================

/// Analysis period as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPeriod {
    /// ISO date
    pub start: String,
    /// ISO date
    pub end: String,
    pub days: u32,
}

/// The assembled community health report.
///
/// Built once by `report::assemble_report` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub report_id: String,
    pub server_id: String,
    pub server_name: String,
    pub generated_at: DateTime<Utc>,
    pub analysis_period: AnalysisPeriod,
    pub message_count: usize,
    pub channel_count: usize,

    pub health_scores: HealthScores,
    pub activity: ActivityMetrics,
    pub engagement: EngagementMetrics,
    pub contributors: ContributorMetrics,

    pub topics: Vec<TopicCluster>,
    pub trends: Option<TrendData>,
    pub benchmarks: BenchmarkComparison,
    pub recommendations: Vec<Recommendation>,

    pub partial_report: bool,
    pub partial_reason: Option<String>,
    /// Channels whose transcript could not be read
    pub inaccessible_channels: Vec<String>,
}

/// Full English weekday name.
pub fn weekday_name(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}
