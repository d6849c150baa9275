//! Activity, engagement and contributor metrics
//!
//! Every function here is total: an empty message slice yields a zeroed
//! structure, never an error, and no ratio divides by zero.

use crate::format::{percentage, round1, round2};
use crate::types::{
    weekday_name, ActivityMetrics, AnalysisWindow, ChannelActivity, ContributorDistribution,
    ContributorMetrics, EngagementMetrics, HealthScores, ParsedMessage, PeakDay, PeakHour,
    ReactionStat, TopContributor,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Channels listed in the activity breakdown.
const CHANNEL_BREAKDOWN_LIMIT: usize = 10;
/// Hours and weekdays listed as peaks.
const PEAK_LIMIT: usize = 3;
/// Reactions listed in the engagement summary.
const TOP_REACTIONS_LIMIT: usize = 5;
/// Contributors listed in the contributor summary.
const TOP_CONTRIBUTORS_LIMIT: usize = 10;
/// Fraction of window days a channel needs in messages to count as active.
const ACTIVE_CHANNEL_RATIO: f64 = 0.1;
/// Reply gaps at or beyond this are not counted as responses.
const MAX_RESPONSE_GAP_HOURS: f64 = 168.0;
/// Leading days of the window in which a first message marks a newcomer.
pub const NEW_CONTRIBUTOR_DAYS: i64 = 7;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Activity metrics over the window.
pub fn activity_metrics(messages: &[ParsedMessage], window: &AnalysisWindow) -> ActivityMetrics {
    if messages.is_empty() {
        return ActivityMetrics::default();
    }

    let total_days = window.day_count();
    let total_messages = messages.len();

    // Zero-filled per-day series over every window date
    let mut daily: BTreeMap<NaiveDate, usize> = window.dates().map(|d| (d, 0)).collect();
    for msg in messages {
        *daily.entry(msg.timestamp.date_naive()).or_insert(0) += 1;
    }
    let min = daily.values().copied().min().unwrap_or(0);
    let max = daily.values().copied().max().unwrap_or(0);

    let mut channel_counts: HashMap<&str, usize> = HashMap::new();
    for msg in messages {
        *channel_counts.entry(msg.channel_name.as_str()).or_insert(0) += 1;
    }
    let mut channels: Vec<(&str, usize)> = channel_counts.into_iter().collect();
    channels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let active_threshold = total_days as f64 * ACTIVE_CHANNEL_RATIO;
    let active_channels = channels
        .iter()
        .filter(|(_, count)| *count as f64 >= active_threshold)
        .count();
    let inactive_channels = channels.len() - active_channels;

    let channel_breakdown = channels
        .iter()
        .take(CHANNEL_BREAKDOWN_LIMIT)
        .map(|(name, count)| ChannelActivity {
            name: name.to_string(),
            messages: *count,
            percentage: round1(percentage(*count, total_messages)),
        })
        .collect();

    let mut hour_counts = [0usize; 24];
    let mut weekday_counts = [0usize; 7];
    for msg in messages {
        hour_counts[msg.timestamp.hour() as usize] += 1;
        weekday_counts[msg.timestamp.weekday().num_days_from_monday() as usize] += 1;
    }

    let peak_hours = top_indices(&hour_counts, PEAK_LIMIT)
        .into_iter()
        .map(|(hour, messages)| PeakHour {
            hour: hour as u32,
            messages,
        })
        .collect();

    let peak_days = top_indices(&weekday_counts, PEAK_LIMIT)
        .into_iter()
        .map(|(idx, messages)| PeakDay {
            day: weekday_name(WEEKDAYS[idx]).to_string(),
            messages,
        })
        .collect();

    ActivityMetrics {
        total_messages,
        messages_per_day_average: round1(total_messages as f64 / total_days as f64),
        messages_per_day_min: min,
        messages_per_day_max: max,
        active_channels,
        inactive_channels,
        channel_breakdown,
        peak_hours,
        peak_days,
    }
}

/// Highest non-zero buckets, ties broken by lower index.
fn top_indices(counts: &[usize], limit: usize) -> Vec<(usize, usize)> {
    let mut ranked: Vec<(usize, usize)> = counts
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, count)| *count > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Engagement metrics over the window.
pub fn engagement_metrics(
    messages: &[ParsedMessage],
    window: &AnalysisWindow,
) -> EngagementMetrics {
    if messages.is_empty() {
        return EngagementMetrics::default();
    }

    let total_days = window.day_count();

    let mut author_counts: HashMap<&str, usize> = HashMap::new();
    let mut daily_authors: HashMap<NaiveDate, HashSet<&str>> = HashMap::new();
    for msg in messages {
        *author_counts.entry(msg.author_id.as_str()).or_insert(0) += 1;
        daily_authors
            .entry(msg.timestamp.date_naive())
            .or_default()
            .insert(msg.author_id.as_str());
    }
    let unique_authors = author_counts.len();

    let daily_active_sum: usize = daily_authors.values().map(HashSet::len).sum();
    let daily_active_average = daily_active_sum as f64 / total_days as f64;
    let daily_active_percentage = if unique_authors > 0 {
        daily_active_average / unique_authors as f64 * 100.0
    } else {
        0.0
    };

    let mut per_author: Vec<usize> = author_counts.values().copied().collect();
    per_author.sort_unstable();
    let per_author_average = messages.len() as f64 / unique_authors as f64;
    let per_author_median = median(&per_author);

    let replies = messages.iter().filter(|m| m.is_reply).count();
    let reply_rate = percentage(replies, messages.len());

    let avg_response_time_hours = average_response_time_hours(messages);

    let total_reactions: u64 = messages.iter().map(|m| u64::from(m.total_reactions)).sum();
    let messages_with_reactions = messages.iter().filter(|m| m.total_reactions > 0).count();

    let mut emoji_totals: HashMap<&str, u32> = HashMap::new();
    for msg in messages {
        for (emoji, count) in &msg.reactions {
            *emoji_totals.entry(emoji.as_str()).or_insert(0) += count;
        }
    }
    let mut top_reactions: Vec<ReactionStat> = emoji_totals
        .into_iter()
        .map(|(emoji, count)| ReactionStat {
            emoji: emoji.to_string(),
            count,
        })
        .collect();
    top_reactions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.emoji.cmp(&b.emoji)));
    top_reactions.truncate(TOP_REACTIONS_LIMIT);

    EngagementMetrics {
        unique_authors,
        daily_active_members_average: round1(daily_active_average),
        daily_active_members_percentage: round1(daily_active_percentage),
        messages_per_author_average: round1(per_author_average),
        messages_per_author_median: round1(per_author_median),
        reply_rate: round1(reply_rate),
        avg_response_time_hours: round1(avg_response_time_hours),
        total_reactions,
        messages_with_reactions,
        avg_reactions_per_message: round2(total_reactions as f64 / messages.len() as f64),
        top_reactions,
    }
}

/// Median of a sorted slice.
fn median(sorted: &[usize]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

/// Mean gap between a reply and the message right before it in its channel.
///
/// This approximates response time: the preceding message is not
/// necessarily the one being replied to. Gaps of a week or more are ignored.
fn average_response_time_hours(messages: &[ParsedMessage]) -> f64 {
    let mut by_channel: HashMap<&str, Vec<&ParsedMessage>> = HashMap::new();
    for msg in messages {
        by_channel
            .entry(msg.channel_name.as_str())
            .or_default()
            .push(msg);
    }

    let mut samples = Vec::new();
    for channel_messages in by_channel.values_mut() {
        channel_messages.sort_by_key(|m| m.timestamp);
        for pair in channel_messages.windows(2) {
            let (prev, msg) = (pair[0], pair[1]);
            if !msg.is_reply {
                continue;
            }
            let gap = (msg.timestamp - prev.timestamp).num_seconds() as f64 / 3600.0;
            if gap < MAX_RESPONSE_GAP_HOURS {
                samples.push(gap);
            }
        }
    }

    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

#[derive(Debug)]
struct AuthorTally<'a> {
    author_id: &'a str,
    author_name: &'a str,
    messages: usize,
    reactions: u64,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Contributor metrics over the window.
pub fn contributor_metrics(
    messages: &[ParsedMessage],
    window: &AnalysisWindow,
) -> ContributorMetrics {
    if messages.is_empty() {
        return ContributorMetrics::default();
    }

    let mut tallies: HashMap<&str, AuthorTally> = HashMap::new();
    for msg in messages {
        let tally = tallies
            .entry(msg.author_id.as_str())
            .or_insert_with(|| AuthorTally {
                author_id: &msg.author_id,
                author_name: &msg.author_name,
                messages: 0,
                reactions: 0,
                first_seen: msg.timestamp,
                last_seen: msg.timestamp,
            });
        tally.messages += 1;
        tally.reactions += u64::from(msg.total_reactions);
        tally.author_name = &msg.author_name;
        tally.first_seen = tally.first_seen.min(msg.timestamp);
        tally.last_seen = tally.last_seen.max(msg.timestamp);
    }

    let total_messages = messages.len();
    let mut ranked: Vec<&AuthorTally> = tallies.values().collect();
    ranked.sort_by(|a, b| {
        b.messages
            .cmp(&a.messages)
            .then_with(|| a.author_name.cmp(b.author_name))
            .then_with(|| a.author_id.cmp(b.author_id))
    });

    let top_contributors = ranked
        .iter()
        .take(TOP_CONTRIBUTORS_LIMIT)
        .map(|t| TopContributor {
            author_id: t.author_id.to_string(),
            author_name: t.author_name.to_string(),
            message_count: t.messages,
            percentage: round1(percentage(t.messages, total_messages)),
            engagement_received: t.reactions,
        })
        .collect();

    let newcomer_cutoff = window.start + Duration::days(NEW_CONTRIBUTOR_DAYS);
    let newcomers: Vec<&&AuthorTally> = ranked
        .iter()
        .filter(|t| t.first_seen.date_naive() < newcomer_cutoff)
        .collect();
    let retained = newcomers
        .iter()
        .filter(|t| t.last_seen.date_naive() >= newcomer_cutoff)
        .count();

    let counts: Vec<usize> = ranked.iter().map(|t| t.messages).collect();
    let distribution = ContributorDistribution {
        top_1_pct: round1(top_share(&counts, 1, total_messages)),
        top_10_pct: round1(top_share(&counts, 10, total_messages)),
        top_50_pct: round1(top_share(&counts, 50, total_messages)),
    };

    ContributorMetrics {
        total_unique: tallies.len(),
        top_contributors,
        new_contributors_count: newcomers.len(),
        new_contributors_retention_rate: round1(percentage(retained, newcomers.len())),
        distribution: Some(distribution),
    }
}

/// Share of messages written by the top `pct`% of authors.
///
/// `counts` must be sorted descending. The author count is rounded up and
/// never below one.
fn top_share(counts: &[usize], pct: usize, total_messages: usize) -> f64 {
    let n = (counts.len() * pct).div_ceil(100).max(1);
    let top: usize = counts.iter().take(n).sum();
    percentage(top, total_messages)
}

/// Composite 0-100 scores derived from the three metric groups.
pub fn health_scores(
    activity: &ActivityMetrics,
    engagement: &EngagementMetrics,
    contributors: &ContributorMetrics,
) -> HealthScores {
    let activity_score = if activity.messages_per_day_average > 0.0 {
        let volume = (activity.messages_per_day_average * 2.0).min(100.0);
        let channels = (activity.active_channels as f64 * 10.0).min(100.0);
        volume * 0.7 + channels * 0.3
    } else {
        0.0
    };

    let engagement_score = if engagement.unique_authors > 0 {
        let active = (engagement.daily_active_members_percentage * 5.0).min(100.0);
        let replies = (engagement.reply_rate * 2.0).min(100.0);
        let reactions = (engagement.avg_reactions_per_message * 100.0).min(100.0);
        active * 0.4 + replies * 0.4 + reactions * 0.2
    } else {
        0.0
    };

    let responsiveness = responsiveness_score(engagement.avg_response_time_hours);
    let diversity = diversity_score(contributors.distribution.as_ref());

    let overall = activity_score.trunc() * 0.3
        + engagement_score.trunc() * 0.3
        + responsiveness * 0.2
        + diversity * 0.2;

    HealthScores {
        overall: clamp_score(overall),
        activity: clamp_score(activity_score),
        engagement: clamp_score(engagement_score),
        responsiveness: clamp_score(responsiveness),
        diversity: clamp_score(diversity),
    }
}

fn responsiveness_score(hours: f64) -> f64 {
    if hours <= 4.0 {
        100.0
    } else if hours <= 8.0 {
        80.0
    } else if hours <= 24.0 {
        60.0
    } else {
        (100.0 - hours).max(20.0)
    }
}

fn diversity_score(distribution: Option<&ContributorDistribution>) -> f64 {
    let Some(distribution) = distribution else {
        return 50.0;
    };
    match distribution.top_10_pct {
        share if share < 40.0 => 100.0,
        share if share < 50.0 => 80.0,
        share if share < 60.0 => 60.0,
        share if share < 80.0 => 40.0,
        _ => 20.0,
    }
}

/// Truncate into the 0-100 score range.
fn clamp_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).trunc() as u8
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap;

    pub(crate) fn ts(date: &str, time: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    pub(crate) fn message(
        author: &str,
        channel: &str,
        at: DateTime<Utc>,
        content: &str,
    ) -> ParsedMessage {
        ParsedMessage {
            timestamp: at,
            author_id: format!("id-{}", author),
            author_name: author.to_string(),
            channel_name: channel.to_string(),
            content: content.to_string(),
            is_reply: false,
            reply_to_author: None,
            reactions: BTreeMap::new(),
            total_reactions: 0,
            has_attachment: false,
            has_embed: false,
            date_str: at.format("%Y-%m-%d").to_string(),
        }
    }

    fn window(start: &str, end: &str) -> AnalysisWindow {
        AnalysisWindow::new(
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        )
    }

    /// 50 messages spread over January 2026, no replies.
    fn fifty_messages() -> Vec<ParsedMessage> {
        (0..50)
            .map(|i| {
                let day = 1 + (i % 30);
                let at = ts(&format!("2026-01-{:02}", day), "10:00");
                let author = format!("user{}", i % 5);
                let channel = if i % 2 == 0 { "general" } else { "help" };
                message(&author, channel, at, "hello there")
            })
            .collect()
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let w = window("2026-01-01", "2026-01-30");
        let activity = activity_metrics(&[], &w);
        let engagement = engagement_metrics(&[], &w);
        let contributors = contributor_metrics(&[], &w);

        assert_eq!(activity.total_messages, 0);
        assert_eq!(activity.messages_per_day_average, 0.0);
        assert_eq!(engagement.unique_authors, 0);
        assert_eq!(engagement.reply_rate, 0.0);
        assert!(contributors.distribution.is_none());

        let scores = health_scores(&activity, &engagement, &contributors);
        assert_eq!(scores.activity, 0);
        assert_eq!(scores.engagement, 0);
        assert_eq!(scores.responsiveness, 100);
        assert_eq!(scores.diversity, 50);
        assert_eq!(scores.overall, 30);
    }

    #[test]
    fn test_fifty_messages_over_thirty_days() {
        let w = window("2026-01-01", "2026-01-30");
        let messages = fifty_messages();

        let activity = activity_metrics(&messages, &w);
        assert_eq!(activity.total_messages, 50);
        assert_eq!(activity.messages_per_day_average, 1.7);
        assert_eq!(activity.messages_per_day_min, 1);
        assert_eq!(activity.messages_per_day_max, 2);

        let engagement = engagement_metrics(&messages, &w);
        assert_eq!(engagement.reply_rate, 0.0);
        assert_eq!(engagement.avg_response_time_hours, 0.0);
        assert_eq!(engagement.unique_authors, 5);
    }

    #[test]
    fn test_channel_breakdown_percentages() {
        let w = window("2026-01-01", "2026-01-30");
        let messages = fifty_messages();
        let activity = activity_metrics(&messages, &w);

        let total: usize = activity.channel_breakdown.iter().map(|c| c.messages).sum();
        let pct: f64 = activity.channel_breakdown.iter().map(|c| c.percentage).sum();
        assert_eq!(total, 50);
        assert!(pct <= 100.0 + f64::EPSILON);
        assert_eq!(activity.channel_breakdown[0].name, "general");
        assert_eq!(activity.active_channels, 2);
    }

    #[test]
    fn test_inactive_channel_threshold() {
        let w = window("2026-01-01", "2026-01-30");
        let mut messages = fifty_messages();
        messages.push(message("quiet", "lonely", ts("2026-01-05", "12:00"), "anyone?"));
        let activity = activity_metrics(&messages, &w);
        // 30 days * 0.1 = 3 messages needed
        assert_eq!(activity.active_channels, 2);
        assert_eq!(activity.inactive_channels, 1);
    }

    #[test]
    fn test_peak_hours_and_days() {
        let w = window("2026-01-05", "2026-01-11");
        let messages = vec![
            message("a", "c", ts("2026-01-05", "09:00"), "x"),
            message("a", "c", ts("2026-01-05", "09:30"), "x"),
            message("b", "c", ts("2026-01-06", "14:00"), "x"),
        ];
        let activity = activity_metrics(&messages, &w);
        assert_eq!(activity.peak_hours[0].hour, 9);
        assert_eq!(activity.peak_hours[0].messages, 2);
        // 2026-01-05 is a Monday
        assert_eq!(activity.peak_days[0].day, "Monday");
        assert_eq!(activity.peak_days[1].day, "Tuesday");
    }

    #[test]
    fn test_response_time_uses_preceding_message() {
        let w = window("2026-01-01", "2026-01-07");
        let first = message("a", "c", ts("2026-01-01", "10:00"), "question");
        let mut reply = message("b", "c", ts("2026-01-01", "12:00"), "answer");
        reply.is_reply = true;
        let mut stale = message("c", "c", ts("2026-01-20", "12:00"), "late");
        stale.is_reply = true;

        let engagement = engagement_metrics(&[first, reply, stale], &w);
        assert_eq!(engagement.avg_response_time_hours, 2.0);
        assert_eq!(engagement.reply_rate, 66.7);
    }

    #[test]
    fn test_reaction_totals() {
        let w = window("2026-01-01", "2026-01-07");
        let mut a = message("a", "c", ts("2026-01-01", "10:00"), "x");
        a.reactions.insert("heart".into(), 3);
        a.reactions.insert("rocket".into(), 1);
        a.total_reactions = 4;
        let mut b = message("b", "c", ts("2026-01-02", "10:00"), "y");
        b.reactions.insert("rocket".into(), 5);
        b.total_reactions = 5;
        let c = message("c", "c", ts("2026-01-03", "10:00"), "z");

        let engagement = engagement_metrics(&[a, b, c], &w);
        assert_eq!(engagement.total_reactions, 9);
        assert_eq!(engagement.messages_with_reactions, 2);
        assert_eq!(engagement.avg_reactions_per_message, 3.0);
        assert_eq!(engagement.top_reactions[0].emoji, "rocket");
        assert_eq!(engagement.top_reactions[0].count, 6);
    }

    #[test]
    fn test_newcomer_retention() {
        let w = window("2026-01-01", "2026-01-30");
        let messages = vec![
            message("stays", "c", ts("2026-01-02", "10:00"), "hi"),
            message("stays", "c", ts("2026-01-20", "10:00"), "back"),
            message("leaves", "c", ts("2026-01-03", "10:00"), "hi"),
            message("late", "c", ts("2026-01-15", "10:00"), "hi"),
        ];
        let contributors = contributor_metrics(&messages, &w);
        assert_eq!(contributors.total_unique, 3);
        assert_eq!(contributors.new_contributors_count, 2);
        assert_eq!(contributors.new_contributors_retention_rate, 50.0);
    }

    #[test]
    fn test_pareto_rounds_author_count_up() {
        let w = window("2026-01-01", "2026-01-07");
        let mut messages = Vec::new();
        for _ in 0..6 {
            messages.push(message("loud", "c", ts("2026-01-01", "10:00"), "x"));
        }
        for _ in 0..4 {
            messages.push(message("quiet", "c", ts("2026-01-01", "11:00"), "x"));
        }
        let contributors = contributor_metrics(&messages, &w);
        let dist = contributors.distribution.unwrap();
        // ceil(2 * 0.1) = 1 author
        assert_eq!(dist.top_10_pct, 60.0);
        assert_eq!(dist.top_50_pct, 60.0);
        assert_eq!(contributors.top_contributors[0].author_name, "loud");
        assert_eq!(contributors.top_contributors[0].percentage, 60.0);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(responsiveness_score(0.0), 100.0);
        assert_eq!(responsiveness_score(4.0), 100.0);
        assert_eq!(responsiveness_score(8.0), 80.0);
        assert_eq!(responsiveness_score(24.0), 60.0);
        assert_eq!(responsiveness_score(30.0), 70.0);
        assert_eq!(responsiveness_score(150.0), 20.0);

        let share = |top_10_pct| ContributorDistribution {
            top_1_pct: 0.0,
            top_10_pct,
            top_50_pct: 0.0,
        };
        assert_eq!(diversity_score(Some(&share(39.9))), 100.0);
        assert_eq!(diversity_score(Some(&share(45.0))), 80.0);
        assert_eq!(diversity_score(Some(&share(79.9))), 40.0);
        assert_eq!(diversity_score(Some(&share(80.0))), 20.0);
    }
}
