//! Benchmark comparison
//!
//! Each derived metric is classified against a healthy/warning threshold
//! pair. Defaults come from [`DEFAULT_BENCHMARKS`]; callers may override
//! individual metrics with [`CustomThresholds`], typically loaded from the
//! `[benchmarks]` table of the config file:
//!
//! ```toml
//! [benchmarks.daily_active_pct]
//! healthy = 15
//! warning = 8
//! ```

use crate::format::round2;
use crate::types::{
    ActivityMetrics, BenchmarkComparison, BenchmarkResult, BenchmarkSource, ContributorMetrics,
    EngagementMetrics, HealthReport, HealthStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// A healthy/warning threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Threshold {
    pub healthy: f64,
    pub warning: f64,
    /// When set, values at or below `healthy` are healthy
    pub lower_is_better: bool,
}

impl Threshold {
    const fn higher(healthy: f64, warning: f64) -> Self {
        Self {
            healthy,
            warning,
            lower_is_better: false,
        }
    }

    const fn lower(healthy: f64, warning: f64) -> Self {
        Self {
            healthy,
            warning,
            lower_is_better: true,
        }
    }

    /// Classify a value against this pair.
    pub fn status(&self, value: f64) -> HealthStatus {
        if self.lower_is_better {
            if value <= self.healthy {
                HealthStatus::Healthy
            } else if value <= self.warning {
                HealthStatus::Warning
            } else {
                HealthStatus::Critical
            }
        } else if value >= self.healthy {
            HealthStatus::Healthy
        } else if value >= self.warning {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }

    /// Whether the healthy bound sits on the right side of the warning bound.
    fn is_ordered(&self) -> bool {
        if self.lower_is_better {
            self.healthy <= self.warning
        } else {
            self.healthy >= self.warning
        }
    }
}

/// Built-in thresholds, in report order.
pub const DEFAULT_BENCHMARKS: [(&str, Threshold); 8] = [
    ("daily_active_pct", Threshold::higher(10.0, 5.0)),
    ("response_rate", Threshold::higher(30.0, 15.0)),
    ("avg_response_time_hours", Threshold::lower(4.0, 24.0)),
    ("messages_per_active_member", Threshold::higher(2.0, 1.0)),
    ("messages_per_day", Threshold::higher(50.0, 10.0)),
    ("active_channel_ratio", Threshold::higher(0.5, 0.3)),
    ("contributor_diversity", Threshold::lower(50.0, 70.0)),
    ("new_member_retention", Threshold::higher(50.0, 30.0)),
];

/// Default threshold for a metric name.
pub fn default_threshold(metric: &str) -> Option<Threshold> {
    DEFAULT_BENCHMARKS
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, threshold)| *threshold)
}

/// Validated per-metric threshold overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomThresholds {
    overrides: BTreeMap<String, Threshold>,
}

impl CustomThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override one metric.
    ///
    /// Rejects unknown metrics, non-finite values and inverted pairs.
    pub fn insert(&mut self, metric: &str, threshold: Threshold) -> bool {
        if default_threshold(metric).is_none() {
            tracing::warn!(metric, "Ignoring threshold for unknown metric");
            return false;
        }
        if !threshold.healthy.is_finite() || !threshold.warning.is_finite() {
            tracing::warn!(metric, "Ignoring non-finite threshold");
            return false;
        }
        if !threshold.is_ordered() {
            tracing::warn!(
                metric,
                healthy = threshold.healthy,
                warning = threshold.warning,
                "Ignoring inverted threshold pair"
            );
            return false;
        }
        self.overrides.insert(metric.to_string(), threshold);
        true
    }

    /// Read overrides from a `[benchmarks]` TOML table.
    ///
    /// Malformed entries are dropped with a warning and the default is kept.
    /// Missing keys inherit from the default threshold.
    pub fn from_toml(table: &toml::Table) -> Self {
        let mut thresholds = Self::new();

        for (metric, value) in table {
            let Some(default) = default_threshold(metric) else {
                tracing::warn!(metric = %metric, "Ignoring threshold for unknown metric");
                continue;
            };
            let Some(entry) = value.as_table() else {
                tracing::warn!(metric = %metric, "Benchmark override must be a table");
                continue;
            };

            let healthy = match read_number(entry, "healthy") {
                Ok(v) => v.unwrap_or(default.healthy),
                Err(()) => {
                    tracing::warn!(metric = %metric, "Non-numeric healthy threshold");
                    continue;
                }
            };
            let warning = match read_number(entry, "warning") {
                Ok(v) => v.unwrap_or(default.warning),
                Err(()) => {
                    tracing::warn!(metric = %metric, "Non-numeric warning threshold");
                    continue;
                }
            };
            let lower_is_better = match entry.get("lower_is_better") {
                None => default.lower_is_better,
                Some(toml::Value::Boolean(b)) => *b,
                Some(_) => {
                    tracing::warn!(metric = %metric, "lower_is_better must be a boolean");
                    continue;
                }
            };

            thresholds.insert(
                metric,
                Threshold {
                    healthy,
                    warning,
                    lower_is_better,
                },
            );
        }

        thresholds
    }

    pub fn get(&self, metric: &str) -> Option<&Threshold> {
        self.overrides.get(metric)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// `Ok(None)` when absent, `Err` when present but not a usable number.
fn read_number(table: &toml::Table, key: &str) -> Result<Option<f64>, ()> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(toml::Value::Float(f)) if f.is_finite() => Ok(Some(*f)),
        Some(_) => Err(()),
    }
}

/// Derived metric values in [`DEFAULT_BENCHMARKS`] order.
fn derived_metrics(
    activity: &ActivityMetrics,
    engagement: &EngagementMetrics,
    contributors: &ContributorMetrics,
) -> [(&'static str, f64); 8] {
    let channel_count = activity.channel_count();
    let active_channel_ratio = if channel_count > 0 {
        activity.active_channels as f64 / channel_count as f64
    } else {
        0.0
    };
    let messages_per_active_member = if engagement.daily_active_members_average > 0.0 {
        activity.messages_per_day_average / engagement.daily_active_members_average
    } else {
        0.0
    };
    let contributor_diversity = contributors
        .distribution
        .as_ref()
        .map(|d| d.top_10_pct)
        .unwrap_or(50.0);

    [
        ("daily_active_pct", engagement.daily_active_members_percentage),
        ("response_rate", engagement.reply_rate),
        ("avg_response_time_hours", engagement.avg_response_time_hours),
        ("messages_per_active_member", messages_per_active_member),
        ("messages_per_day", activity.messages_per_day_average),
        ("active_channel_ratio", active_channel_ratio),
        ("contributor_diversity", contributor_diversity),
        (
            "new_member_retention",
            contributors.new_contributors_retention_rate,
        ),
    ]
}

/// Classify every derived metric against its threshold.
pub fn compare_to_benchmarks(
    activity: &ActivityMetrics,
    engagement: &EngagementMetrics,
    contributors: &ContributorMetrics,
    custom: Option<&CustomThresholds>,
) -> BenchmarkComparison {
    let custom = custom.filter(|c| !c.is_empty());

    let comparisons: Vec<BenchmarkResult> = derived_metrics(activity, engagement, contributors)
        .into_iter()
        .filter_map(|(metric, value)| {
            let threshold = custom
                .and_then(|c| c.get(metric).copied())
                .or_else(|| default_threshold(metric))?;
            Some(BenchmarkResult {
                metric: metric.to_string(),
                value: round2(value),
                threshold_healthy: threshold.healthy,
                threshold_warning: threshold.warning,
                lower_is_better: threshold.lower_is_better,
                status: threshold.status(value),
            })
        })
        .collect();

    let overall_assessment = overall_assessment(&comparisons);
    let score = benchmark_score(&comparisons);

    BenchmarkComparison {
        source: if custom.is_some() {
            BenchmarkSource::Custom
        } else {
            BenchmarkSource::Default
        },
        comparisons,
        overall_assessment,
        score,
    }
}

/// Any critical makes the whole critical; a warning majority makes it warning.
fn overall_assessment(comparisons: &[BenchmarkResult]) -> HealthStatus {
    let critical = comparisons
        .iter()
        .filter(|c| c.status == HealthStatus::Critical)
        .count();
    let warning = comparisons
        .iter()
        .filter(|c| c.status == HealthStatus::Warning)
        .count();

    if critical > 0 {
        HealthStatus::Critical
    } else if warning * 2 > comparisons.len() {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

fn benchmark_score(comparisons: &[BenchmarkResult]) -> u8 {
    if comparisons.is_empty() {
        return 50;
    }
    let total: u32 = comparisons.iter().map(|c| c.status.points()).sum();
    (total / comparisons.len() as u32) as u8
}

/// One metric side by side for two servers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: String,
    pub first: f64,
    pub second: f64,
}

/// Side-by-side headline metrics for two reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportComparison {
    pub first_server: String,
    pub second_server: String,
    pub rows: Vec<ComparisonRow>,
}

/// Compare headline metrics of two servers.
pub fn compare_reports(first: &HealthReport, second: &HealthReport) -> ReportComparison {
    let row = |metric: &str, a: f64, b: f64| ComparisonRow {
        metric: metric.to_string(),
        first: a,
        second: b,
    };

    ReportComparison {
        first_server: first.server_name.clone(),
        second_server: second.server_name.clone(),
        rows: vec![
            row(
                "total_messages",
                first.activity.total_messages as f64,
                second.activity.total_messages as f64,
            ),
            row(
                "messages_per_day",
                first.activity.messages_per_day_average,
                second.activity.messages_per_day_average,
            ),
            row(
                "unique_authors",
                first.engagement.unique_authors as f64,
                second.engagement.unique_authors as f64,
            ),
            row(
                "daily_active_pct",
                first.engagement.daily_active_members_percentage,
                second.engagement.daily_active_members_percentage,
            ),
            row(
                "reply_rate",
                first.engagement.reply_rate,
                second.engagement.reply_rate,
            ),
            row(
                "avg_response_time",
                first.engagement.avg_response_time_hours,
                second.engagement.avg_response_time_hours,
            ),
            row(
                "overall_score",
                f64::from(first.health_scores.overall),
                f64::from(second.health_scores.overall),
            ),
        ],
    }
}
