//! Ingestion layer for reading channel transcripts
//!
//! A server directory holds one subdirectory per channel, each with a
//! `messages.md` transcript:
//!
//! ```text
//! server_dir/
//! ├── general/messages.md
//! ├── help/messages.md
//! └── announcements/messages.md
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pulsecheck_core::ingest::scan_directory;
//!
//! let scan = scan_directory(Path::new("servers/1234"))?;
//! println!("{} messages, {} unreadable channels",
//!     scan.messages.len(), scan.inaccessible_channels.len());
//! ```
//!
//! Only failure to open `server_dir` itself is an error. An unreadable
//! transcript is logged, skipped and reported in
//! [`ScanResult::inaccessible_channels`].

mod parser;

pub use parser::{count_messages, parse_file, read_metadata, TranscriptReader};

use crate::error::{Error, Result};
use crate::types::{ChannelMetadata, ParsedMessage};
use std::path::{Path, PathBuf};

/// File name of a channel transcript.
pub const TRANSCRIPT_FILE: &str = "messages.md";

/// Everything recovered from one server directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Messages from every readable transcript, channel by channel
    pub messages: Vec<ParsedMessage>,
    /// Channels whose transcript could not be opened
    pub inaccessible_channels: Vec<String>,
}

/// A discovered transcript and the channel it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFile {
    pub channel_name: String,
    pub path: PathBuf,
}

/// Find `*/messages.md` under a server directory, sorted by path.
pub fn discover_transcripts(server_dir: &Path) -> Result<Vec<TranscriptFile>> {
    std::fs::read_dir(server_dir).map_err(|source| Error::TranscriptDir {
        path: server_dir.to_path_buf(),
        source,
    })?;

    let pattern = server_dir.join("*").join(TRANSCRIPT_FILE);
    let pattern = pattern.to_string_lossy();

    let mut files = Vec::new();
    match glob::glob(&pattern) {
        Ok(paths) => {
            for entry in paths {
                match entry {
                    Ok(path) => {
                        let Some(channel_name) = channel_name_for(&path) else {
                            continue;
                        };
                        files.push(TranscriptFile { channel_name, path });
                    }
                    Err(e) => {
                        // glob reports unreadable directories here
                        let channel = e.path().file_name().map(|n| n.to_string_lossy().to_string());
                        tracing::warn!(path = %e.path().display(), error = %e.error(), "Cannot read channel directory");
                        if let Some(channel_name) = channel {
                            files.push(TranscriptFile {
                                channel_name,
                                path: e.path().join(TRANSCRIPT_FILE),
                            });
                        }
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid transcript glob pattern");
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}

fn channel_name_for(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().to_string())
}

/// Parse every transcript under a server directory.
pub fn scan_directory(server_dir: &Path) -> Result<ScanResult> {
    scan_directory_with_progress(server_dir, |_, _| {})
}

/// Parse every transcript, reporting `(files_done, files_total)` after each.
pub fn scan_directory_with_progress<F>(server_dir: &Path, mut progress: F) -> Result<ScanResult>
where
    F: FnMut(usize, usize),
{
    let files = discover_transcripts(server_dir)?;
    let total = files.len();

    tracing::info!(
        dir = %server_dir.display(),
        transcripts = total,
        "Scanning transcripts"
    );

    let mut result = ScanResult::default();

    for (idx, file) in files.iter().enumerate() {
        match parse_file(&file.path, &file.channel_name) {
            Ok(reader) => {
                let before = result.messages.len();
                result.messages.extend(reader);
                tracing::debug!(
                    channel = %file.channel_name,
                    messages = result.messages.len() - before,
                    "Parsed transcript"
                );
            }
            Err(e) => {
                tracing::warn!(
                    channel = %file.channel_name,
                    path = %file.path.display(),
                    error = %e,
                    "Skipping unreadable transcript"
                );
                result.inaccessible_channels.push(file.channel_name.clone());
            }
        }
        progress(idx + 1, total);
    }

    Ok(result)
}

/// First transcript metadata block naming a server.
///
/// Transcripts without frontmatter or without a server name are skipped.
pub fn read_server_identity(server_dir: &Path) -> Result<Option<ChannelMetadata>> {
    for file in discover_transcripts(server_dir)? {
        match read_metadata(&file.path) {
            Ok(Some(metadata)) if !metadata.server_name.is_empty() => return Ok(Some(metadata)),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %file.path.display(), error = %e, "No metadata read");
            }
        }
    }
    Ok(None)
}
