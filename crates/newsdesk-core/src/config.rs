use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::Source;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub poll: PollConfig,
    /// Feeds polled when no sources are given on the command line
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of feeds fetched at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Responses larger than this are rejected
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// HTTP proxy URL for feed fetching (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            max_body_bytes: default_max_body_bytes(),
            proxy_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between poll cycles (never less than 1)
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// A `[[sources]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&SourceConfig> for Source {
    fn from(entry: &SourceConfig) -> Self {
        Source::new(entry.url.clone())
            .with_name(entry.name.clone())
            .with_tags(entry.tags.clone())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_concurrency() -> usize {
    8
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_poll_interval() -> u64 {
    300 // 5 minutes
}

impl AppConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/newsdesk/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("newsdesk")
            .join("config.toml")
    }

    /// Sources declared in the `[[sources]]` tables
    pub fn sources(&self) -> Vec<Source> {
        self.sources.iter().map(Source::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.poll.interval_secs, 300);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_sources_table() {
        let config = AppConfig::from_toml(
            r#"
[fetch]
concurrency = 2

[[sources]]
url = "https://example.com/feed.xml"
name = "Example"
tags = ["tech", "daily"]

[[sources]]
url = "https://example.org/atom.xml"
"#,
        )
        .unwrap();

        assert_eq!(config.fetch.concurrency, 2);
        let sources = config.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name.as_deref(), Some("Example"));
        assert_eq!(sources[0].tags, vec!["tech", "daily"]);
        assert!(sources[1].name.is_none());
        assert!(sources[1].tags.is_empty());
    }

    #[test]
    fn test_poll_interval_floor() {
        let poll = PollConfig { interval_secs: 0 };
        assert_eq!(poll.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[fetch\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
