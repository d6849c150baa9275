//! Recommendation rules
//!
//! A fixed, ordered list of rules inspects the metrics, benchmark results
//! and trend data. Every rule that fires adds one recommendation; ids follow
//! rule order and the final list is stably sorted by priority, so equal
//! priorities keep rule order. Overlapping rules are not de-duplicated.

use crate::format::humanize_metric;
use crate::types::{
    ActivityMetrics, BenchmarkComparison, Category, ContributorMetrics, EngagementMetrics,
    HealthStatus, Priority, Recommendation, TrendData, TrendDirection,
};

const LOW_ACTIVITY_PER_DAY: f64 = 10.0;
const ACTIVITY_TARGET_PER_DAY: f64 = 50.0;
const INACTIVE_CHANNEL_RATIO: f64 = 0.5;
const DAILY_ACTIVE_TARGET_PCT: f64 = 10.0;
const REPLY_RATE_TARGET: f64 = 30.0;
const SLOW_RESPONSE_HOURS: f64 = 24.0;
const RESPONSE_TARGET_HOURS: f64 = 4.0;
const CONCENTRATION_LIMIT_PCT: f64 = 80.0;
const CONCENTRATION_TARGET_PCT: f64 = 50.0;
const TOP_CONTRIBUTOR_LIMIT_PCT: f64 = 10.0;
const TOP_CONTRIBUTOR_TARGET_PCT: f64 = 5.0;
const RETENTION_LIMIT_PCT: f64 = 50.0;
const RETENTION_TARGET_PCT: f64 = 70.0;

#[allow(clippy::too_many_arguments)]
fn recommendation(
    priority: Priority,
    category: Category,
    title: String,
    description: String,
    metric_reference: &str,
    current_value: f64,
    target_value: f64,
    actions: &[&str],
) -> Recommendation {
    Recommendation {
        id: 0,
        priority,
        category,
        title,
        description,
        metric_reference: metric_reference.to_string(),
        current_value,
        target_value,
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

/// Evaluate every rule and return recommendations, most urgent first.
pub fn generate_recommendations(
    activity: &ActivityMetrics,
    engagement: &EngagementMetrics,
    contributors: &ContributorMetrics,
    benchmarks: Option<&BenchmarkComparison>,
    trends: Option<&TrendData>,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if activity.messages_per_day_average < LOW_ACTIVITY_PER_DAY {
        recs.push(recommendation(
            Priority::High,
            Category::Activity,
            "Increase overall community activity".to_string(),
            format!(
                "The community averages {:.1} messages per day. Regular prompts and events can lift baseline activity.",
                activity.messages_per_day_average
            ),
            "messages_per_day_average",
            activity.messages_per_day_average,
            ACTIVITY_TARGET_PER_DAY,
            &[
                "Post weekly discussion prompts",
                "Host events such as AMAs or show-and-tell sessions",
                "Invite new members to introduce themselves",
                "Revisit the channel layout so conversations have an obvious home",
            ],
        ));
    }

    let channel_count = activity.channel_count();
    if activity.inactive_channels > 0 && channel_count > 0 {
        let inactive_ratio = activity.inactive_channels as f64 / channel_count as f64;
        if inactive_ratio > INACTIVE_CHANNEL_RATIO {
            recs.push(recommendation(
                Priority::Medium,
                Category::Content,
                "Address inactive channels".to_string(),
                format!(
                    "{} of {} channels see little activity. Consolidating or refreshing them keeps discussion focused.",
                    activity.inactive_channels, channel_count
                ),
                "inactive_channels",
                activity.inactive_channels as f64,
                (activity.inactive_channels / 2).max(1) as f64,
                &[
                    "Archive channels nobody uses",
                    "Merge overlapping low-traffic channels",
                    "Seed underused channels with relevant content",
                ],
            ));
        }
    }

    if engagement.daily_active_members_percentage < DAILY_ACTIVE_TARGET_PCT {
        recs.push(recommendation(
            Priority::High,
            Category::Engagement,
            "Improve member engagement rate".to_string(),
            format!(
                "Only {:.1}% of members are active on a typical day, below the 10% target.",
                engagement.daily_active_members_percentage
            ),
            "daily_active_members_percentage",
            engagement.daily_active_members_percentage,
            DAILY_ACTIVE_TARGET_PCT,
            &[
                "Greet new members personally",
                "Schedule recurring community activities",
                "Recognize members who help others",
                "Mention quieter members in relevant threads",
            ],
        ));
    }

    if engagement.reply_rate < REPLY_RATE_TARGET {
        recs.push(recommendation(
            Priority::Medium,
            Category::Engagement,
            "Increase conversation reply rate".to_string(),
            format!(
                "{:.1}% of messages are replies. More back-and-forth signals healthier discussion.",
                engagement.reply_rate
            ),
            "reply_rate",
            engagement.reply_rate,
            REPLY_RATE_TARGET,
            &[
                "Have moderators sweep for unanswered questions",
                "Collect common questions into an FAQ channel",
                "Ask follow-up questions on new posts",
            ],
        ));
    }

    if engagement.avg_response_time_hours > SLOW_RESPONSE_HOURS {
        recs.push(recommendation(
            Priority::High,
            Category::Engagement,
            "Reduce response time".to_string(),
            format!(
                "Replies take {:.1} hours on average. Faster answers keep members around.",
                engagement.avg_response_time_hours
            ),
            "avg_response_time_hours",
            engagement.avg_response_time_hours,
            RESPONSE_TARGET_HOURS,
            &[
                "Spread moderator coverage across time zones",
                "Alert moderators about questions left unanswered",
                "Encourage experienced members to help newcomers",
            ],
        ));
    }

    if let Some(distribution) = &contributors.distribution {
        if distribution.top_10_pct > CONCENTRATION_LIMIT_PCT {
            recs.push(recommendation(
                Priority::Medium,
                Category::Engagement,
                "Encourage broader participation".to_string(),
                format!(
                    "The top 10% of members write {:.1}% of all messages. Conversation depends on a few voices.",
                    distribution.top_10_pct
                ),
                "top_10_pct_contribution",
                distribution.top_10_pct,
                CONCENTRATION_TARGET_PCT,
                &[
                    "Highlight first-time contributors",
                    "Create low-effort ways to join in, like polls",
                    "Run member spotlights",
                ],
            ));
        }
    }

    if let Some(top) = contributors.top_contributors.first() {
        if top.percentage > TOP_CONTRIBUTOR_LIMIT_PCT {
            recs.push(recommendation(
                Priority::Low,
                Category::Moderation,
                "Recognize top contributors".to_string(),
                format!(
                    "{} wrote {:.1}% of messages. Dedicated members deserve recognition.",
                    top.author_name, top.percentage
                ),
                "top_contributor_percentage",
                top.percentage,
                TOP_CONTRIBUTOR_TARGET_PCT,
                &[
                    "Start a contributor recognition program",
                    "Offer roles or badges to consistent helpers",
                    "Consider top contributors for moderation roles",
                ],
            ));
        }
    }

    if contributors.new_contributors_count > 0
        && contributors.new_contributors_retention_rate < RETENTION_LIMIT_PCT
    {
        recs.push(recommendation(
            Priority::High,
            Category::Engagement,
            "Improve new member retention".to_string(),
            format!(
                "Only {:.1}% of new members kept posting after their first week.",
                contributors.new_contributors_retention_rate
            ),
            "new_contributors_retention_rate",
            contributors.new_contributors_retention_rate,
            RETENTION_TARGET_PCT,
            &[
                "Streamline onboarding with a short welcome guide",
                "Pair newcomers with a mentor",
                "Follow up with members who went quiet",
            ],
        ));
    }

    if let Some(benchmarks) = benchmarks {
        for result in &benchmarks.comparisons {
            let name = humanize_metric(&result.metric);
            match result.status {
                HealthStatus::Critical => recs.push(recommendation(
                    Priority::High,
                    Category::Activity,
                    format!("Address critical {}", name),
                    format!(
                        "{} is at a critical level ({:.1} against a warning threshold of {:.1}).",
                        name, result.value, result.threshold_warning
                    ),
                    &result.metric,
                    result.value,
                    result.threshold_healthy,
                    &[
                        "Review what drives this metric",
                        "Compare with communities that do well here",
                        "Set a concrete improvement plan",
                    ],
                )),
                HealthStatus::Warning => recs.push(recommendation(
                    Priority::Medium,
                    Category::Activity,
                    format!("Improve {}", name),
                    format!(
                        "{} is below the healthy threshold ({:.1} against {:.1}).",
                        name, result.value, result.threshold_healthy
                    ),
                    &result.metric,
                    result.value,
                    result.threshold_healthy,
                    &[
                        "Track this metric week over week",
                        "Identify contributing factors",
                    ],
                )),
                HealthStatus::Healthy => {}
            }
        }
    }

    if let Some(trends) = trends {
        for change in &trends.metric_changes {
            if !change.significant || change.direction != TrendDirection::Down {
                continue;
            }
            let name = humanize_metric(&change.metric);
            recs.push(recommendation(
                Priority::High,
                Category::Activity,
                format!("Investigate {} decline", name),
                format!(
                    "{} moved {:.1}% for the worse this week. Sharp declines need attention.",
                    name,
                    change.change_pct.abs()
                ),
                &change.metric,
                change.current,
                change.previous,
                &[
                    "Review recent changes that may explain the drop",
                    "Check for outside events affecting the community",
                    "Ask members for feedback",
                ],
            ));
        }
    }

    for (idx, rec) in recs.iter_mut().enumerate() {
        rec.id = idx + 1;
    }
    // Stable: equal priorities keep rule order
    recs.sort_by_key(|r| r.priority);

    tracing::debug!(count = recs.len(), "Recommendations generated");
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BenchmarkResult, BenchmarkSource, ContributorDistribution, MetricChange, TopContributor};

    fn thriving() -> (ActivityMetrics, EngagementMetrics, ContributorMetrics) {
        (
            ActivityMetrics {
                total_messages: 3000,
                messages_per_day_average: 100.0,
                active_channels: 5,
                inactive_channels: 1,
                ..Default::default()
            },
            EngagementMetrics {
                unique_authors: 50,
                daily_active_members_percentage: 25.0,
                reply_rate: 45.0,
                avg_response_time_hours: 1.5,
                ..Default::default()
            },
            ContributorMetrics {
                total_unique: 50,
                new_contributors_count: 4,
                new_contributors_retention_rate: 75.0,
                distribution: Some(ContributorDistribution {
                    top_1_pct: 5.0,
                    top_10_pct: 35.0,
                    top_50_pct: 80.0,
                }),
                top_contributors: vec![TopContributor {
                    author_id: "1".into(),
                    author_name: "alice".into(),
                    message_count: 150,
                    percentage: 5.0,
                    engagement_received: 0,
                }],
            },
        )
    }

    #[test]
    fn test_healthy_community_gets_nothing() {
        let (a, e, c) = thriving();
        assert!(generate_recommendations(&a, &e, &c, None, None).is_empty());
    }

    #[test]
    fn test_empty_community_rules() {
        let recs = generate_recommendations(
            &ActivityMetrics::default(),
            &EngagementMetrics::default(),
            &ContributorMetrics::default(),
            None,
            None,
        );
        let titles: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Increase overall community activity",
                "Improve member engagement rate",
                "Increase conversation reply rate",
            ]
        );
        assert_eq!(recs[0].target_value, 50.0);
    }

    #[test]
    fn test_priority_sort_is_stable_and_ids_follow_rules() {
        let (mut a, mut e, c) = thriving();
        a.messages_per_day_average = 4.0; // rule 1, high
        e.reply_rate = 10.0; // rule 4, medium
        e.avg_response_time_hours = 30.0; // rule 5, high

        let recs = generate_recommendations(&a, &e, &c, None, None);
        let summary: Vec<(usize, Priority)> = recs.iter().map(|r| (r.id, r.priority)).collect();
        assert_eq!(
            summary,
            vec![(1, Priority::High), (3, Priority::High), (2, Priority::Medium)]
        );
    }

    #[test]
    fn test_inactive_channels_target() {
        let (mut a, e, c) = thriving();
        a.active_channels = 1;
        a.inactive_channels = 5;
        let recs = generate_recommendations(&a, &e, &c, None, None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].category, Category::Content);
        assert_eq!(recs[0].target_value, 2.0);
    }

    #[test]
    fn test_benchmark_and_trend_rules() {
        let (a, e, c) = thriving();
        let benchmarks = BenchmarkComparison {
            source: BenchmarkSource::Default,
            comparisons: vec![
                BenchmarkResult {
                    metric: "messages_per_day".into(),
                    value: 5.0,
                    threshold_healthy: 50.0,
                    threshold_warning: 10.0,
                    lower_is_better: false,
                    status: HealthStatus::Critical,
                },
                BenchmarkResult {
                    metric: "response_rate".into(),
                    value: 20.0,
                    threshold_healthy: 30.0,
                    threshold_warning: 15.0,
                    lower_is_better: false,
                    status: HealthStatus::Warning,
                },
            ],
            overall_assessment: HealthStatus::Critical,
            score: 35,
        };
        let trends = TrendData {
            comparison_period_current: String::new(),
            comparison_period_previous: String::new(),
            metric_changes: vec![MetricChange {
                metric: "unique_authors".into(),
                current: 6.0,
                previous: 10.0,
                change_pct: -40.0,
                direction: TrendDirection::Down,
                significant: true,
            }],
            emerging_topics: vec![],
            declining_topics: vec![],
            stable_topics: vec![],
            highlights: vec![],
        };

        let recs = generate_recommendations(&a, &e, &c, Some(&benchmarks), Some(&trends));
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].title, "Address critical Messages Per Day");
        assert_eq!(recs[0].target_value, 50.0);
        assert_eq!(recs[1].title, "Investigate Unique Authors decline");
        assert_eq!(recs[1].target_value, 10.0);
        assert_eq!(recs[2].priority, Priority::Medium);
        assert!(recs.iter().all(|r| (2..=4).contains(&r.actions.len())));
    }

    #[test]
    fn test_retention_and_concentration() {
        let (a, e, mut c) = thriving();
        c.new_contributors_retention_rate = 20.0;
        c.distribution = Some(ContributorDistribution {
            top_1_pct: 40.0,
            top_10_pct: 90.0,
            top_50_pct: 99.0,
        });
        c.top_contributors[0].percentage = 40.0;

        let recs = generate_recommendations(&a, &e, &c, None, None);
        let refs: Vec<&str> = recs.iter().map(|r| r.metric_reference.as_str()).collect();
        assert_eq!(
            refs,
            vec![
                "new_contributors_retention_rate",
                "top_10_pct_contribution",
                "top_contributor_percentage",
            ]
        );
    }
}
