//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for connected services, watched sources, recipient groups and schedules.
//! The parsed `AppConfig` is immutable and handed to every component at construction.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub recipients: RecipientsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

impl AppConfig {
    /// Reads and parses the YAML configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config YAML")
    }
}

/// Configuration for various connected services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub social: SocialConfig,
}

/// Specific configuration for the Matrix service.
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    pub username: String,
    pub password: String,
    pub homeserver: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Social API access. Bearer tokens are rotated in the order given:
/// inline `tokens` first, then the values of the `token_env` variables.
#[derive(Debug, Deserialize, Clone)]
pub struct SocialConfig {
    #[serde(default = "default_social_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub token_env: Vec<String>, // e.g. "TWITTER_BEARER_TOKEN_1"
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            base_url: default_social_base_url(),
            tokens: Vec::new(),
            token_env: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl SocialConfig {
    /// Collects the configured bearer tokens. Unset or blank env vars are skipped.
    pub fn resolve_tokens(&self) -> Vec<String> {
        self.resolve_tokens_with(|name| std::env::var(name).ok())
    }

    fn resolve_tokens_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .tokens
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        for name in &self.token_env {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => tokens.push(value.trim().to_string()),
                _ => tracing::debug!("Token env var {} not set", name),
            }
        }
        tokens
    }
}

/// The content sources being watched.
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Handle of the official account, without the leading `@`.
    pub official_handle: String,
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Channel whose posts are forwarded to the team.
    #[serde(default)]
    pub source_channel: Option<String>,
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
    #[serde(default)]
    pub roster: RosterConfig,
}

/// Where the tracked-account roster comes from.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct RosterConfig {
    /// CSV export URL; the first column holds one account per row after a header row.
    #[serde(default)]
    pub url: Option<String>,
    /// Inline rows, used when no `url` is set.
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// A named notification destination (a chat room).
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub room: String,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RecipientsConfig {
    /// Receive official posts, live events, articles and channel posts.
    #[serde(default)]
    pub team: Vec<Recipient>,
    /// Receive tracked-account posts, one manager per post.
    #[serde(default)]
    pub managers: Vec<Recipient>,
}

impl RecipientsConfig {
    pub fn is_manager_room(&self, room: &str) -> bool {
        self.managers.iter().any(|m| m.room == room)
    }
}

/// Job intervals in minutes.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_official_minutes")]
    pub official_minutes: u64,
    #[serde(default = "default_feed_minutes")]
    pub feed_minutes: u64,
    #[serde(default = "default_tracked_minutes")]
    pub tracked_minutes: u64,
    #[serde(default = "default_roster_minutes")]
    pub roster_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            official_minutes: default_official_minutes(),
            feed_minutes: default_feed_minutes(),
            tracked_minutes: default_tracked_minutes(),
            roster_minutes: default_roster_minutes(),
        }
    }
}

/// System-level tuning knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default)]
    pub state_file: Option<String>,
    /// Tracked accounts checked per run (the first N of the roster).
    #[serde(default = "default_tracked_batch_cap")]
    pub tracked_batch_cap: usize,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_identity_batch_size")]
    pub identity_batch_size: usize,
    #[serde(default = "default_identity_batch_delay_ms")]
    pub identity_batch_delay_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_feed_max_entries")]
    pub feed_max_entries: usize,
    #[serde(default = "default_summary_limit")]
    pub summary_limit: usize,
    #[serde(default = "default_timeout")]
    pub feed_timeout_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            tracked_batch_cap: default_tracked_batch_cap(),
            request_delay_ms: default_request_delay_ms(),
            identity_batch_size: default_identity_batch_size(),
            identity_batch_delay_ms: default_identity_batch_delay_ms(),
            page_size: default_page_size(),
            feed_max_entries: default_feed_max_entries(),
            summary_limit: default_summary_limit(),
            feed_timeout_secs: default_timeout(),
        }
    }
}

fn default_social_base_url() -> String {
    "https://api.x.com/2".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_channel_prefix() -> String {
    "-100".to_string()
}
fn default_official_minutes() -> u64 {
    180
}
fn default_feed_minutes() -> u64 {
    30
}
fn default_tracked_minutes() -> u64 {
    360
}
fn default_roster_minutes() -> u64 {
    720
}
fn default_tracked_batch_cap() -> usize {
    50
}
fn default_request_delay_ms() -> u64 {
    500
}
fn default_identity_batch_size() -> usize {
    100
}
fn default_identity_batch_delay_ms() -> u64 {
    1000
}
fn default_page_size() -> u32 {
    5
}
fn default_feed_max_entries() -> usize {
    5
}
fn default_summary_limit() -> usize {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
services:
  matrix:
    username: watcher
    password: secret
    homeserver: https://matrix.example.org
  social:
    tokens: ["aaa", "  "]
    token_env: ["LOOKOUT_TEST_TOKEN_1", "LOOKOUT_TEST_TOKEN_2"]
sources:
  official_handle: example_official
  feed_url: https://medium.com/feed/@example
  source_channel: "-1001234"
recipients:
  team:
    - { name: Mika, room: "!team1:example.org" }
  managers:
    - { name: Igor, room: "!mgr1:example.org" }
    - { name: Roman, room: "!mgr2:example.org" }
schedule:
  feed_minutes: 10
"#;

    #[test]
    fn test_parse_sample_with_defaults() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.services.matrix.username, "watcher");
        assert_eq!(config.services.social.base_url, "https://api.x.com/2");
        assert_eq!(config.sources.channel_prefix, "-100");
        assert_eq!(config.schedule.feed_minutes, 10);
        assert_eq!(config.schedule.official_minutes, 180);
        assert_eq!(config.system.tracked_batch_cap, 50);
        assert_eq!(config.system.identity_batch_size, 100);
        assert_eq!(config.recipients.managers.len(), 2);
        assert!(config.recipients.is_manager_room("!mgr2:example.org"));
        assert!(!config.recipients.is_manager_room("!team1:example.org"));
    }

    #[test]
    fn test_resolve_tokens_keeps_order_and_skips_blank() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        let tokens = config.services.social.resolve_tokens_with(|name| match name {
            "LOOKOUT_TEST_TOKEN_2" => Some("bbb".to_string()),
            _ => None,
        });
        assert_eq!(tokens, vec!["aaa".to_string(), "bbb".to_string()]);
    }

    #[test]
    fn test_missing_sources_is_an_error() {
        let yaml = "services:\n  matrix:\n    username: a\n    password: b\n    homeserver: c\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }
}
