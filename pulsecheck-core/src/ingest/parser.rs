//! Transcript parser
//!
//! Turns one channel transcript into a lazy sequence of [`ParsedMessage`]s.
//! The file is read line by line, so memory stays bounded by the largest
//! single message rather than the file size.
//!
//! ## Transcript grammar
//!
//! ```text
//! ---
//! channel_name: general
//! server_name: Example
//! ---
//!
//! ## 2026-01-15
//!
//! ### 10:30 AM - @alice (123456789)
//! ↳ replying to @bob:
//! Message body, possibly
//! spanning lines. [attachment: screenshot.png]
//! > [embed] Link preview
//! Reactions: heart 3 | rocket 5
//! ```
//!
//! ## Design Principles
//!
//! 1. **Resilience**: a malformed line is skipped or recovered, never fatal
//! 2. **Streaming**: one pending message is held at a time
//! 3. **Lossy decoding**: invalid UTF-8 is replaced, not rejected

use crate::error::Result;
use crate::types::{ChannelMetadata, ParsedMessage};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

/// Bytes inspected when looking for a frontmatter block.
const FRONTMATTER_PROBE_BYTES: u64 = 1024;

fn date_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^## (\d{4}-\d{2}-\d{2})\s*$").expect("valid regex"))
}

fn message_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^### (\d{1,2}:\d{2} [AaPp][Mm]) - @?(.+?) \((\d+)\)\s*$")
            .expect("valid regex")
    })
}

fn reply_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^↳ replying to @?([^:]+):").expect("valid regex"))
}

fn reactions_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Reactions: (.+)$").expect("valid regex"))
}

fn single_reaction() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+) (\d+)$").expect("valid regex"))
}

fn attachment_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[attachment: [^\]]*\]").expect("valid regex"))
}

fn embed_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^> \[embed\]").expect("valid regex"))
}

/// Where the reader is within the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Before the first date header
    Outside,
    /// After a date header, no message open
    InDateSection,
    /// A message is open and collecting body lines
    InMessage,
    /// Inside the quoted payload of an embed
    InEmbed,
}

/// Message being accumulated until the next header or EOF.
#[derive(Debug)]
struct PendingMessage {
    date_str: String,
    time_str: String,
    author_name: String,
    author_id: String,
    lines: Vec<String>,
    is_reply: bool,
    reply_to_author: Option<String>,
    reactions: BTreeMap<String, u32>,
    has_attachment: bool,
    has_embed: bool,
}

impl PendingMessage {
    fn has_content(&self) -> bool {
        self.lines.iter().any(|line| !line.trim().is_empty())
    }

    fn finish(self, channel_name: &str) -> ParsedMessage {
        let timestamp = parse_timestamp(&self.date_str, &self.time_str);

        let first = self.lines.iter().position(|l| !l.trim().is_empty());
        let last = self.lines.iter().rposition(|l| !l.trim().is_empty());
        let content = match (first, last) {
            (Some(first), Some(last)) => self.lines[first..=last].join("\n"),
            _ => String::new(),
        };

        let total_reactions = self.reactions.values().sum();

        ParsedMessage {
            timestamp,
            author_id: self.author_id,
            author_name: self.author_name,
            channel_name: channel_name.to_string(),
            content,
            is_reply: self.is_reply,
            reply_to_author: self.reply_to_author,
            reactions: self.reactions,
            total_reactions,
            has_attachment: self.has_attachment,
            has_embed: self.has_embed,
            date_str: self.date_str,
        }
    }
}

/// Combine a date section and a `H:MM AM` time into a UTC timestamp.
///
/// Falls back to the current time when either half is unparseable.
fn parse_timestamp(date_str: &str, time_str: &str) -> DateTime<Utc> {
    let combined = format!("{} {}", date_str, time_str.to_uppercase());
    match NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %I:%M %p") {
        Ok(naive) => naive.and_utc(),
        Err(e) => {
            tracing::warn!(
                date = date_str,
                time = time_str,
                error = %e,
                "Unparseable message timestamp, using current time"
            );
            Utc::now()
        }
    }
}

/// Parse `heart 3 | rocket 5` into an emoji -> count map.
///
/// Pairs that do not look like `<emoji> <count>` are skipped.
fn parse_reactions(list: &str) -> BTreeMap<String, u32> {
    let mut reactions = BTreeMap::new();
    for part in list.split('|') {
        let part = part.trim();
        if let Some(caps) = single_reaction().captures(part) {
            if let Ok(count) = caps[2].parse::<u32>() {
                *reactions.entry(caps[1].to_string()).or_insert(0) += count;
            }
        }
    }
    reactions
}

/// Streaming parser over one transcript.
///
/// Yields messages in file order. The iterator is finite and, once
/// exhausted, stays exhausted.
pub struct TranscriptReader<R> {
    reader: R,
    channel_name: String,
    state: ParserState,
    current_date: String,
    pending: Option<PendingMessage>,
    /// A `---` line and the blank lines after it, until the next line decides
    /// whether it closed the message or belongs to the body
    held_rule: Option<Vec<String>>,
    buf: Vec<u8>,
    line_number: usize,
    finished: bool,
}

impl<R: BufRead> TranscriptReader<R> {
    pub fn new(reader: R, channel_name: impl Into<String>) -> Self {
        Self {
            reader,
            channel_name: channel_name.into(),
            state: ParserState::Outside,
            current_date: String::new(),
            pending: None,
            held_rule: None,
            buf: Vec::new(),
            line_number: 0,
            finished: false,
        }
    }

    fn flush(&mut self) -> Option<ParsedMessage> {
        self.held_rule = None;
        self.pending
            .take()
            .map(|pending| pending.finish(&self.channel_name))
    }

    /// Read the next line, without its line terminator.
    ///
    /// Returns `None` at EOF or on a read error (logged).
    fn read_line(&mut self) -> Option<String> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(String::from_utf8_lossy(&self.buf).into_owned())
            }
            Err(e) => {
                tracing::warn!(
                    channel = %self.channel_name,
                    line = self.line_number,
                    error = %e,
                    "Transcript read failed, stopping early"
                );
                None
            }
        }
    }

    /// Feed one line through the state machine.
    ///
    /// Returns a message when the line closed one.
    fn step(&mut self, line: &str) -> Option<ParsedMessage> {
        if let Some(caps) = date_header().captures(line) {
            let flushed = self.flush();
            self.current_date = caps[1].to_string();
            self.state = ParserState::InDateSection;
            return flushed;
        }

        if let Some(caps) = message_header().captures(line) {
            let flushed = self.flush();
            self.pending = Some(PendingMessage {
                date_str: self.current_date.clone(),
                time_str: caps[1].to_string(),
                author_name: caps[2].trim().to_string(),
                author_id: caps[3].to_string(),
                lines: Vec::new(),
                is_reply: false,
                reply_to_author: None,
                reactions: BTreeMap::new(),
                has_attachment: false,
                has_embed: false,
            });
            self.state = ParserState::InMessage;
            return flushed;
        }

        match self.state {
            ParserState::Outside | ParserState::InDateSection => None,
            ParserState::InMessage | ParserState::InEmbed => self.message_line(line),
        }
    }

    fn message_line(&mut self, line: &str) -> Option<ParsedMessage> {
        if let Some(mut held) = self.held_rule.take() {
            if line.trim().is_empty() {
                held.push(line.to_string());
                self.held_rule = Some(held);
                return None;
            }
            if line.starts_with('#') {
                // Section separator: the rule closed the message
                let flushed = self.flush();
                self.state = ParserState::InDateSection;
                return flushed;
            }
            if let Some(pending) = self.pending.as_mut() {
                pending.lines.extend(held);
            }
            self.state = ParserState::InMessage;
        }

        if line.trim() == "---" {
            self.held_rule = Some(vec![line.to_string()]);
            return None;
        }

        let Some(pending) = self.pending.as_mut() else {
            self.state = ParserState::InDateSection;
            return None;
        };

        if let Some(caps) = reactions_line().captures(line) {
            pending.reactions = parse_reactions(&caps[1]);
            self.state = ParserState::InMessage;
            return None;
        }

        if self.state == ParserState::InEmbed {
            if line.starts_with('>') {
                return None;
            }
            self.state = ParserState::InMessage;
        }

        if embed_marker().is_match(line) {
            pending.has_embed = true;
            self.state = ParserState::InEmbed;
            return None;
        }

        if !pending.is_reply && !pending.has_content() {
            if let Some(caps) = reply_line().captures(line) {
                pending.is_reply = true;
                pending.reply_to_author = Some(caps[1].trim().to_string());
                return None;
            }
        }

        if attachment_marker().is_match(line) {
            pending.has_attachment = true;
            let stripped = attachment_marker().replace_all(line, "");
            let stripped = stripped.trim();
            if !stripped.is_empty() {
                pending.lines.push(stripped.to_string());
            }
            return None;
        }

        pending.lines.push(line.to_string());
        None
    }
}

impl<R: BufRead> Iterator for TranscriptReader<R> {
    type Item = ParsedMessage;

    fn next(&mut self) -> Option<ParsedMessage> {
        if self.finished {
            return None;
        }

        while let Some(line) = self.read_line() {
            if let Some(message) = self.step(&line) {
                return Some(message);
            }
        }

        self.finished = true;
        tracing::debug!(
            channel = %self.channel_name,
            lines = self.line_number,
            "Transcript fully read"
        );
        self.flush()
    }
}

/// Open a transcript for streaming.
///
/// Only opening the file can fail; everything after that is recovered.
pub fn parse_file(path: &Path, channel_name: &str) -> Result<TranscriptReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(TranscriptReader::new(BufReader::new(file), channel_name))
}

/// Count message headers without building messages.
pub fn count_messages(path: &Path) -> Result<usize> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if message_header().is_match(line.trim_end_matches(['\r', '\n'])) {
            count += 1;
        }
    }

    Ok(count)
}

/// Read the `---`-delimited metadata block at the head of a transcript.
///
/// Returns `Ok(None)` when the file has no frontmatter.
pub fn read_metadata(path: &Path) -> Result<Option<ChannelMetadata>> {
    let mut head = Vec::new();
    File::open(path)?
        .take(FRONTMATTER_PROBE_BYTES)
        .read_to_end(&mut head)?;
    Ok(parse_frontmatter(&String::from_utf8_lossy(&head)))
}

fn parse_frontmatter(head: &str) -> Option<ChannelMetadata> {
    let mut lines = head.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut metadata = ChannelMetadata::default();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "channel_id" => metadata.channel_id = value,
            "channel_name" => metadata.channel_name = value,
            "server_id" => metadata.server_id = value,
            "server_name" => metadata.server_name = value,
            "last_sync" => metadata.last_sync = value,
            _ => {}
        }
    }

    closed.then_some(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const SAMPLE: &str = "---
channel_id: 42
channel_name: general
server_id: 7
server_name: Example Server
last_sync: 2026-01-16T00:00:00Z
---

## 2026-01-15

### 10:30 AM - @alice (111)
Hello everyone!

Second line.
Reactions: heart 3 | rocket 5

### 2:05 PM - @bob (222)
↳ replying to @alice:
Welcome! [attachment: screenshot.png]
> [embed] Link preview
> more preview

## 2026-01-16

### 9:00 AM - @carol (333)
Morning.
";

    fn parse(text: &str) -> Vec<ParsedMessage> {
        TranscriptReader::new(Cursor::new(text.as_bytes().to_vec()), "general").collect()
    }

    #[test]
    fn test_recovers_every_message() {
        let messages = parse(SAMPLE);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].author_name, "alice");
        assert_eq!(messages[0].author_id, "111");
        assert_eq!(messages[0].channel_name, "general");
        assert_eq!(messages[2].date_str, "2026-01-16");
    }

    #[test]
    fn test_content_joins_body_lines() {
        let messages = parse(SAMPLE);
        assert_eq!(messages[0].content, "Hello everyone!\n\nSecond line.");
    }

    #[test]
    fn test_reactions_are_summed() {
        let messages = parse(SAMPLE);
        assert_eq!(messages[0].reactions.get("heart"), Some(&3));
        assert_eq!(messages[0].reactions.get("rocket"), Some(&5));
        assert_eq!(messages[0].total_reactions, 8);
        assert_eq!(messages[1].total_reactions, 0);
    }

    #[test]
    fn test_reply_attachment_and_embed() {
        let messages = parse(SAMPLE);
        let reply = &messages[1];
        assert!(reply.is_reply);
        assert_eq!(reply.reply_to_author.as_deref(), Some("alice"));
        assert!(reply.has_attachment);
        assert!(reply.has_embed);
        assert_eq!(reply.content, "Welcome!");
    }

    #[test]
    fn test_timestamp_combines_date_and_time() {
        let messages = parse(SAMPLE);
        let expected = NaiveDateTime::parse_from_str("2026-01-15 14:05", "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc();
        assert_eq!(messages[1].timestamp, expected);
    }

    #[test]
    fn test_reply_line_after_content_is_plain_text() {
        let text = "## 2026-01-15\n### 10:30 AM - @alice (1)\nhi\n↳ replying to @bob:\n";
        let messages = parse(text);
        assert!(!messages[0].is_reply);
        assert_eq!(messages[0].content, "hi\n↳ replying to @bob:");
    }

    #[test]
    fn test_separator_closes_message() {
        let text = "## 2026-01-15\n### 10:30 AM - @alice (1)\nhi\n---\n\n# Footer\nstray footer\n";
        let messages = parse(text);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");

        let at_eof = parse("## 2026-01-15\n### 10:30 AM - @alice (1)\nhi\n---\n\n");
        assert_eq!(at_eof[0].content, "hi");
    }

    #[test]
    fn test_separator_before_date_header_closes_message() {
        let text = "## 2026-01-15\n### 10:30 AM - @alice (1)\nhi\n\n---\n\n## 2026-01-16\n### 9:00 AM - @bob (2)\nmorning\n";
        let messages = parse(text);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].content, "morning");
    }

    #[test]
    fn test_rule_inside_body_is_kept() {
        let text = "## 2026-01-15\n### 10:30 AM - @alice (1)\nintro\n---\nrest of the post\n";
        let messages = parse(text);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "intro\n---\nrest of the post");
    }

    #[test]
    fn test_malformed_reaction_pairs_skipped() {
        let text = "## 2026-01-15\n### 10:30 AM - @alice (1)\nhi\nReactions: heart 2 | broken | fire x\n";
        let messages = parse(text);
        assert_eq!(messages[0].reactions.len(), 1);
        assert_eq!(messages[0].total_reactions, 2);
    }

    #[test]
    fn test_message_without_date_falls_back() {
        let text = "### 10:30 AM - @alice (1)\nhi\n";
        let messages = parse(text);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].date_str, "");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut bytes = b"## 2026-01-15\n### 10:30 AM - @alice (1)\nbad ".to_vec();
        bytes.push(0xff);
        bytes.push(b'\n');
        let messages: Vec<_> = TranscriptReader::new(Cursor::new(bytes), "c").collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("bad "));
    }

    #[test]
    fn test_iterator_stays_exhausted() {
        let mut reader = TranscriptReader::new(Cursor::new(SAMPLE.as_bytes().to_vec()), "c");
        assert_eq!(reader.by_ref().count(), 3);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_file_helpers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.md");
        std::fs::write(&path, SAMPLE).unwrap();

        assert_eq!(count_messages(&path).unwrap(), 3);
        assert_eq!(parse_file(&path, "general").unwrap().count(), 3);

        let metadata = read_metadata(&path).unwrap().unwrap();
        assert_eq!(metadata.channel_id, "42");
        assert_eq!(metadata.server_name, "Example Server");
        assert_eq!(metadata.last_sync, "2026-01-16T00:00:00Z");
    }

    #[test]
    fn test_no_frontmatter() {
        assert!(parse_frontmatter("## 2026-01-15\n").is_none());
        assert!(parse_frontmatter("---\nchannel_name: x\n").is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(parse_file(&dir.path().join("nope.md"), "c").is_err());
    }
}
