//! Keyword-based topic clustering
//!
//! Topics are discovered with a plain TF-IDF ranking, no statistical
//! libraries involved:
//!
//! 1. Tokenize each message (URLs, mentions, `:emoji:` codes and stopwords
//!    removed, tokens shorter than 3 characters dropped)
//! 2. Rank every term by its TF-IDF summed over all messages
//! 3. Take the top-ranked terms as seeds and give each message to the first
//!    seed it contains
//! 4. Emit seed groups large enough to stand alone as topics, everything
//!    else lands in "Other"
//!
//! The result is deterministic: ranking ties are broken alphabetically and
//! every map that feeds output is ordered.

use crate::format::{capitalize, percentage, round1, truncate_chars};
use crate::types::{ParsedMessage, Sentiment, TopContributor, TopicCluster, TopicTrend};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

/// Label of the catch-all cluster.
pub const OTHER_LABEL: &str = "Other";

const OTHER_KEYWORD: &str = "miscellaneous";
const MIN_TOKEN_LEN: usize = 3;
const RELATED_KEYWORDS: usize = 4;
const RELATED_CANDIDATES: usize = 20;
const TOPIC_CONTRIBUTORS: usize = 5;
const TOPIC_CHANNELS: usize = 5;
const SAMPLE_MESSAGES: usize = 3;
const SAMPLE_CHARS: usize = 100;

/// Clustering parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Maximum topics, not counting "Other"
    pub max_topics: usize,
    /// Messages a seed group needs to become a topic
    pub min_messages: usize,
    /// Number of top-ranked terms used as seeds
    pub seed_keywords: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_topics: 10,
            min_messages: 10,
            seed_keywords: 50,
        }
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "before", "after", "above", "below",
    "between", "under", "again", "further", "then", "once", "here", "there", "when", "where",
    "why", "how", "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor",
    "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just", "don",
    "should", "now", "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your",
    "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers",
    "herself", "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what",
    "which", "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were",
    "be", "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "would",
    "could", "ought", "im", "youre", "hes", "shes", "theyre", "ive", "youve", "weve", "theyve",
    "id", "youd", "hed", "shed", "wed", "theyd", "ill", "youll", "hell", "shell", "well",
    "theyll", "isnt", "arent", "wasnt", "werent", "hasnt", "havent", "hadnt", "doesnt", "dont",
    "didnt", "wont", "wouldnt", "shouldnt", "cant", "couldnt", "mustnt", "lets", "thats", "whos",
    "whats", "heres", "theres", "whens", "wheres", "whys", "hows", "because", "as", "until",
    "while", "against", "although", "otherwise", "however", "thus", "since", "unless",
    "meanwhile", "yet", "still", "also", "already", "always", "never", "ever", "maybe",
    "perhaps", "probably", "actually", "really", "basically", "literally", "definitely",
    "certainly", "obviously", "lol", "lmao", "yeah", "yes", "ok", "okay", "hey", "hi", "hello",
    "thanks", "thank", "please", "sorry", "oh", "um", "uh", "hmm", "like", "get", "got", "go",
    "going", "gone", "come", "coming", "came", "see", "seeing", "saw", "seen", "know", "knowing",
    "knew", "known", "think", "thinking", "thought", "make", "making", "made", "take", "taking",
    "took", "taken", "give", "giving", "gave", "given", "find", "finding", "found", "tell",
    "telling", "told", "ask", "asking", "asked", "use", "using", "used", "try", "trying",
    "tried", "need", "needing", "needed", "want", "wanting", "wanted", "look", "looking",
    "looked", "one", "two", "three", "four", "five", "first", "second", "third", "last", "next",
    "new", "old", "good", "bad", "great", "right", "left", "bit", "way", "thing", "things",
    "stuff", "lot", "lots", "kind", "sort", "type", "much", "many", "something", "anything",
    "nothing", "everything", "someone", "anyone", "everyone", "nobody", "everybody", "people",
    "person", "time", "day", "days", "week", "weeks", "month", "months", "year", "years",
    "today", "tomorrow", "yesterday",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn noise_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+|@\w+|:\w+:").expect("valid noise regex"))
}

/// Lowercased content tokens with noise and stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = noise_pattern().replace_all(text, " ");
    let cleaned: String = cleaned
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| word.len() >= MIN_TOKEN_LEN && !stopwords().contains(word))
        .map(str::to_string)
        .collect()
}

/// Rank terms by TF-IDF summed over documents, best first.
///
/// TF is the term's count over the document length; IDF is
/// `ln(N / (1 + df))`. Ties are broken alphabetically.
fn rank_terms<D: AsRef<[String]>>(documents: &[D], top_n: usize) -> Vec<(String, f64)> {
    let n_docs = documents.len();
    if n_docs == 0 {
        return Vec::new();
    }

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for doc in documents {
        let unique: HashSet<&str> = doc.as_ref().iter().map(String::as_str).collect();
        for term in unique {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let mut scores: HashMap<&str, f64> = HashMap::new();
    for doc in documents {
        let doc = doc.as_ref();
        if doc.is_empty() {
            continue;
        }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for term in doc {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
        for (term, count) in counts {
            let tf = count as f64 / doc.len() as f64;
            let df = doc_freq.get(term).copied().unwrap_or(0);
            let idf = (n_docs as f64 / (1 + df) as f64).ln();
            *scores.entry(term).or_insert(0.0) += tf * idf;
        }
    }

    let mut ranked: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(term, score)| (term.to_string(), score))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

/// Top `top_n` keywords of a message set with their TF-IDF scores.
pub fn extract_keywords(messages: &[ParsedMessage], top_n: usize) -> Vec<(String, f64)> {
    let documents: Vec<Vec<String>> = messages.iter().map(|m| tokenize(&m.content)).collect();
    rank_terms(&documents, top_n)
}

/// Partition messages into keyword topics plus a trailing "Other" cluster.
///
/// Every message lands in exactly one cluster, so cluster message counts
/// always sum to `messages.len()`. Returns an empty list for no messages.
pub fn cluster_messages(messages: &[ParsedMessage], config: &ClusterConfig) -> Vec<TopicCluster> {
    if messages.is_empty() {
        return Vec::new();
    }

    let total = messages.len();
    let documents: Vec<Vec<String>> = messages.iter().map(|m| tokenize(&m.content)).collect();
    let seeds: Vec<String> = rank_terms(&documents, config.seed_keywords)
        .into_iter()
        .map(|(term, _)| term)
        .collect();

    // Seed index -> member message indices
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); seeds.len()];
    let mut unassigned: Vec<usize> = Vec::new();
    for (idx, doc) in documents.iter().enumerate() {
        let tokens: HashSet<&str> = doc.iter().map(String::as_str).collect();
        match seeds.iter().position(|seed| tokens.contains(seed.as_str())) {
            Some(seed_idx) => groups[seed_idx].push(idx),
            None => unassigned.push(idx),
        }
    }

    let mut topics = Vec::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut emitted = vec![false; seeds.len()];

    for (seed_idx, seed) in seeds.iter().enumerate() {
        if topics.len() >= config.max_topics {
            break;
        }
        if used.contains(seed) || groups[seed_idx].len() < config.min_messages {
            continue;
        }

        let members = &groups[seed_idx];
        let member_docs: Vec<&Vec<String>> = members.iter().map(|&i| &documents[i]).collect();
        let related: Vec<String> = rank_terms(&member_docs, RELATED_CANDIDATES)
            .into_iter()
            .map(|(term, _)| term)
            .filter(|term| term != seed && !used.contains(term))
            .take(RELATED_KEYWORDS)
            .collect();

        let mut keywords = Vec::with_capacity(related.len() + 1);
        keywords.push(seed.clone());
        keywords.extend(related.iter().cloned());

        let label = topic_label(&keywords);
        let member_messages: Vec<&ParsedMessage> = members.iter().map(|&i| &messages[i]).collect();

        tracing::debug!(
            topic = %label,
            messages = members.len(),
            "Topic cluster formed"
        );

        topics.push(build_cluster(
            topics.len() + 1,
            label,
            keywords,
            &member_messages,
            total,
        ));

        used.insert(seed.clone());
        used.extend(related);
        emitted[seed_idx] = true;
    }

    let mut other: Vec<usize> = unassigned;
    for (seed_idx, members) in groups.iter().enumerate() {
        if !emitted[seed_idx] {
            other.extend(members.iter().copied());
        }
    }
    if !other.is_empty() {
        other.sort_unstable();
        let other_messages: Vec<&ParsedMessage> = other.iter().map(|&i| &messages[i]).collect();
        topics.push(build_cluster(
            topics.len() + 1,
            OTHER_LABEL.to_string(),
            vec![OTHER_KEYWORD.to_string()],
            &other_messages,
            total,
        ));
    }

    topics
}

/// First one or two keywords, capitalized.
fn topic_label(keywords: &[String]) -> String {
    match keywords {
        [] => "General Discussion".to_string(),
        [only] => capitalize(only),
        [first, second, ..] => format!("{} {}", capitalize(first), capitalize(second)),
    }
}

fn build_cluster(
    id: usize,
    label: String,
    keywords: Vec<String>,
    members: &[&ParsedMessage],
    corpus_total: usize,
) -> TopicCluster {
    let message_count = members.len();

    let channels: Vec<String> = members
        .iter()
        .filter(|m| !m.channel_name.is_empty())
        .map(|m| m.channel_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(TOPIC_CHANNELS)
        .collect();

    let mut authors: HashMap<&str, (&str, usize, u64)> = HashMap::new();
    for msg in members {
        let entry = authors
            .entry(msg.author_id.as_str())
            .or_insert((msg.author_name.as_str(), 0, 0));
        entry.0 = msg.author_name.as_str();
        entry.1 += 1;
        entry.2 += u64::from(msg.total_reactions);
    }
    let mut ranked: Vec<(&str, (&str, usize, u64))> = authors.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .1.cmp(&a.1 .1).then_with(|| a.0.cmp(b.0)));
    let top_contributors = ranked
        .into_iter()
        .take(TOPIC_CONTRIBUTORS)
        .map(|(id, (name, count, reactions))| TopContributor {
            author_id: id.to_string(),
            author_name: name.to_string(),
            message_count: count,
            percentage: round1(percentage(count, message_count)),
            engagement_received: reactions,
        })
        .collect();

    let sample_messages = members
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .take(SAMPLE_MESSAGES)
        .map(|m| truncate_chars(&m.content, SAMPLE_CHARS))
        .collect();

    TopicCluster {
        id,
        label,
        keywords,
        message_count,
        percentage: round1(percentage(message_count, corpus_total)),
        channels,
        top_contributors,
        sample_messages,
        sentiment: Sentiment::Neutral,
        trend: TopicTrend::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::tests::{message, ts};

    fn corpus(deploy: usize, chatter: usize) -> Vec<ParsedMessage> {
        let mut messages = Vec::new();
        for i in 0..deploy {
            let channel = if i % 2 == 0 { "ops" } else { "general" };
            messages.push(message(
                &format!("dev{}", i % 3),
                channel,
                ts("2026-01-10", "10:00"),
                "the deploy failed",
            ));
        }
        for i in 0..chatter {
            messages.push(message(
                &format!("member{}", i % 4),
                "general",
                ts("2026-01-10", "11:00"),
                "ok thanks, hello everyone!",
            ));
        }
        messages
    }

    #[test]
    fn test_tokenize_strips_noise() {
        let tokens = tokenize("Check https://example.com @alice :rocket: the Deploy-pipeline is OK");
        assert_eq!(tokens, vec!["check", "deploy", "pipeline"]);
    }

    #[test]
    fn test_tokenize_drops_short_and_stopwords() {
        assert!(tokenize("ok hi to be or not").is_empty());
        assert_eq!(tokenize("db migration"), vec!["migration"]);
    }

    #[test]
    fn test_extract_keywords_ranks_and_breaks_ties() {
        let messages = corpus(12, 28);
        let keywords = extract_keywords(&messages, 10);
        let terms: Vec<&str> = keywords.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["deploy", "failed"]);
        assert!(keywords[0].1 > 0.0);
    }

    #[test]
    fn test_deploy_topic_and_other() {
        let messages = corpus(12, 28);
        let topics = cluster_messages(&messages, &ClusterConfig::default());

        assert_eq!(topics.len(), 2);
        let deploy = &topics[0];
        assert!(deploy.label.starts_with("Deploy"));
        assert_eq!(deploy.message_count, 12);
        assert_eq!(deploy.keywords[0], "deploy");
        assert_eq!(deploy.channels, vec!["general", "ops"]);
        assert_eq!(deploy.percentage, 30.0);
        assert_eq!(deploy.sample_messages.len(), 3);

        let other = &topics[1];
        assert_eq!(other.label, OTHER_LABEL);
        assert_eq!(other.message_count, 28);
        assert_eq!(other.keywords, vec!["miscellaneous"]);
        assert_eq!(other.percentage, 70.0);
    }

    #[test]
    fn test_clusters_partition_messages() {
        let mut messages = corpus(15, 10);
        for i in 0..7 {
            messages.push(message(
                "tester",
                "qa",
                ts("2026-01-11", "09:00"),
                &format!("flaky integration suite run {}", i),
            ));
        }
        let topics = cluster_messages(&messages, &ClusterConfig::default());
        let sum: usize = topics.iter().map(|t| t.message_count).sum();
        assert_eq!(sum, messages.len());
        assert_eq!(topics.iter().filter(|t| t.label == OTHER_LABEL).count(), 1);
    }

    #[test]
    fn test_small_groups_fold_into_other() {
        let messages = corpus(9, 5);
        let topics = cluster_messages(&messages, &ClusterConfig::default());
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].label, OTHER_LABEL);
        assert_eq!(topics[0].message_count, 14);
        assert_eq!(topics[0].percentage, 100.0);
    }

    #[test]
    fn test_max_topics_respected() {
        let mut messages = Vec::new();
        for word in ["alpha", "bravo", "charlie"] {
            for _ in 0..3 {
                messages.push(message("a", "c", ts("2026-01-10", "10:00"), word));
            }
        }
        let config = ClusterConfig {
            max_topics: 2,
            min_messages: 3,
            seed_keywords: 50,
        };
        let topics = cluster_messages(&messages, &config);
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0].label, "Alpha");
        assert_eq!(topics[1].label, "Bravo");
        assert_eq!(topics[2].label, OTHER_LABEL);
        assert_eq!(topics[2].message_count, 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_messages(&[], &ClusterConfig::default()).is_empty());
    }

    #[test]
    fn test_sample_truncation() {
        let long = "x".repeat(150);
        let messages = vec![message("a", "c", ts("2026-01-10", "10:00"), &long)];
        let topics = cluster_messages(&messages, &ClusterConfig::default());
        assert_eq!(topics[0].sample_messages[0].chars().count(), 103);
    }
}
