//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pulsecheck/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pulsecheck/` (~/.config/pulsecheck/)
//! - Data: `$XDG_DATA_HOME/pulsecheck/` (~/.local/share/pulsecheck/)
//! - State/Logs: `$XDG_STATE_HOME/pulsecheck/` (~/.local/state/pulsecheck/)
//!
//! A loaded [`Config`] is a plain value. It is handed to the report entry
//! point through [`Config::report_options`]; nothing in the library caches it.

use crate::analytics::benchmarks::CustomThresholds;
use crate::analytics::topics::ClusterConfig;
use crate::error::{Error, Result};
use crate::report::ReportOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analysis window and clustering settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Per-metric benchmark overrides, keyed by metric name.
    ///
    /// Kept as a raw table so a malformed entry never fails the whole load;
    /// see [`CustomThresholds::from_toml`].
    #[serde(default)]
    pub benchmarks: toml::Table,

    /// Where synced transcripts live
    #[serde(default)]
    pub transcripts: TranscriptsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analysis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Days of history to analyze
    #[serde(default = "default_days")]
    pub days: u32,

    /// Maximum number of topics (excluding "Other")
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,

    /// Minimum messages for a keyword group to become a topic
    #[serde(default = "default_min_topic_messages")]
    pub min_topic_messages: usize,

    /// Number of top-ranked keywords used as cluster seeds
    #[serde(default = "default_seed_keywords")]
    pub seed_keywords: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            max_topics: default_max_topics(),
            min_topic_messages: default_min_topic_messages(),
            seed_keywords: default_seed_keywords(),
        }
    }
}

impl AnalysisConfig {
    /// Clustering parameters derived from this config.
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            max_topics: self.max_topics,
            min_messages: self.min_topic_messages,
            seed_keywords: self.seed_keywords,
        }
    }
}

fn default_days() -> u32 {
    30
}

fn default_max_topics() -> usize {
    10
}

fn default_min_topic_messages() -> usize {
    10
}

fn default_seed_keywords() -> usize {
    50
}

/// Transcript location
#[derive(Debug, Deserialize, Default)]
pub struct TranscriptsConfig {
    /// Root holding one directory per server (defaults to the data dir)
    pub root: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Benchmark overrides with malformed entries dropped.
    pub fn custom_thresholds(&self) -> CustomThresholds {
        CustomThresholds::from_toml(&self.benchmarks)
    }

    /// Build report options for one server from this config.
    pub fn report_options(&self, server_id: &str, server_name: &str) -> ReportOptions {
        let thresholds = self.custom_thresholds();
        ReportOptions {
            server_id: server_id.to_string(),
            server_name: server_name.to_string(),
            days: self.analysis.days,
            custom_thresholds: if thresholds.is_empty() {
                None
            } else {
                Some(thresholds)
            },
            clustering: self.analysis.cluster_config(),
            as_of: None,
        }
    }

    /// Returns the directory holding per-server transcript directories.
    pub fn transcripts_root(&self) -> PathBuf {
        self.transcripts
            .root
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("servers"))
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pulsecheck/config.toml` (~/.config/pulsecheck/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pulsecheck").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/pulsecheck/` (~/.local/share/pulsecheck/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("pulsecheck")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pulsecheck/` (~/.local/state/pulsecheck/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pulsecheck")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.days, 30);
        assert_eq!(config.analysis.max_topics, 10);
        assert_eq!(config.analysis.min_topic_messages, 10);
        assert_eq!(config.analysis.seed_keywords, 50);
        assert_eq!(config.logging.level, "info");
        assert!(config.benchmarks.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analysis]
days = 14
max_topics = 5

[benchmarks.daily_active_pct]
healthy = 15
warning = 8

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analysis.days, 14);
        assert_eq!(config.analysis.max_topics, 5);
        assert_eq!(config.analysis.min_topic_messages, 10);
        assert_eq!(config.logging.level, "debug");

        let thresholds = config.custom_thresholds();
        assert_eq!(thresholds.len(), 1);
    }

    #[test]
    fn test_malformed_benchmarks_do_not_fail_load() {
        let toml = r#"
[benchmarks]
daily_active_pct = "lots"

[benchmarks.reply_speed]
healthy = 1
warning = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.custom_thresholds().is_empty());

        let options = config.report_options("123", "Test Server");
        assert!(options.custom_thresholds.is_none());
        assert_eq!(options.days, 30);
    }

    #[test]
    fn test_report_options_carry_clustering() {
        let toml = r#"
[analysis]
min_topic_messages = 3
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let options = config.report_options("1", "One");
        assert_eq!(options.clustering.min_messages, 3);
        assert_eq!(options.clustering.max_topics, 10);
        assert_eq!(options.server_name, "One");
    }
}
