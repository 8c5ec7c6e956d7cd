//! Configuration file parser for ~/.config/newsdeck/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted and logged as warnings so typos are visible in
//! the log without breaking startup.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// How feed sources are turned into articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Ask the conversion endpoint to turn the feed into a JSON item list.
    Converter,
    /// Fetch the feed directly and parse RSS/Atom locally.
    Direct,
}

/// Settings for the video downloader worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Downloader executable name or path.
    pub downloader: String,
    /// Maximum video height in pixels.
    pub max_height: u32,
    /// File size ceiling in downloader notation ("100M").
    pub max_filesize: String,
    /// Where finished videos are saved. `None` picks `~/Downloads`.
    pub save_dir: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            downloader: "yt-dlp".to_string(),
            max_height: 720,
            max_filesize: "100M".to_string(),
            save_dir: None,
        }
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint that converts a feed URL into a JSON item list.
    pub feed_converter_url: String,

    /// Converter endpoint or local feed parsing.
    pub feed_mode: FeedMode,

    /// Feed sources loaded at startup.
    pub default_feeds: Vec<String>,

    /// Keep user-added feed sources across runs. Off by default: the source
    /// list resets to `default_feeds` on every start.
    pub persist_feeds: bool,

    /// Chat completion endpoint (OpenAI-compatible).
    pub completion_url: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Relay endpoint for proxied fetches.
    pub proxy_url: String,

    /// Completion API key. `OPENROUTER_API_KEY` takes precedence, and a key
    /// saved from the dashboard takes precedence over both.
    pub api_key: Option<String>,

    pub video: VideoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_converter_url: "https://api.rss2json.com/api.json".to_string(),
            feed_mode: FeedMode::Converter,
            default_feeds: vec![
                "https://feeds.bbci.co.uk/news/rss.xml".to_string(),
                "https://rss.cnn.com/rss/edition.rss".to_string(),
                "https://feeds.reuters.com/reuters/topNews".to_string(),
            ],
            persist_feeds: false,
            completion_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "anthropic/claude-3-haiku".to_string(),
            proxy_url: "https://your-proxy.your-subdomain.workers.dev".to_string(),
            api_key: None,
            video: VideoConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_converter_url", &self.feed_converter_url)
            .field("feed_mode", &self.feed_mode)
            .field("default_feeds", &self.default_feeds)
            .field("persist_feeds", &self.persist_feeds)
            .field("completion_url", &self.completion_url)
            .field("model", &self.model)
            .field("proxy_url", &self.proxy_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("video", &self.video)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "feed_converter_url",
        "feed_mode",
        "default_feeds",
        "persist_feeds",
        "completion_url",
        "model",
        "proxy_url",
        "api_key",
        "video",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.default_feeds.len(),
            model = %config.model,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Credential from the environment or the config file, env first.
    pub fn fallback_api_key(&self) -> Option<String> {
        std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("newsdeck_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feed_mode, FeedMode::Converter);
        assert_eq!(config.default_feeds.len(), 3);
        assert!(!config.persist_feeds);
        assert_eq!(config.model, "anthropic/claude-3-haiku");
        assert_eq!(config.video.max_height, 720);
        assert_eq!(config.video.max_filesize, "100M");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/newsdeck_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.model, "anthropic/claude-3-haiku");
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_feeds.len(), 3);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "model = \"openai/gpt-4o-mini\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert_eq!(config.feed_mode, FeedMode::Converter);
        assert_eq!(config.video.downloader, "yt-dlp");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
feed_converter_url = "https://convert.example.com/api.json"
feed_mode = "direct"
default_feeds = ["https://example.com/rss.xml"]
persist_feeds = true
completion_url = "https://llm.example.com/v1/chat/completions"
model = "meta/llama"
proxy_url = "https://relay.example.dev"
api_key = "sk-test-123"

[video]
downloader = "/usr/local/bin/yt-dlp"
max_height = 480
max_filesize = "50M"
save_dir = "/tmp/videos"
"#;
        let (dir, path) = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_mode, FeedMode::Direct);
        assert_eq!(config.default_feeds, vec!["https://example.com/rss.xml"]);
        assert!(config.persist_feeds);
        assert_eq!(config.proxy_url, "https://relay.example.dev");
        assert_eq!(config.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(config.video.max_height, 480);
        assert_eq!(config.video.save_dir, Some(PathBuf::from("/tmp/videos")));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_feed_mode_rejected() {
        let (dir, path) = write_config("bad_mode", "feed_mode = \"carrier-pigeon\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "model = \"m\"\ntotally_fake_key = 42\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.model, "m");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config {
            api_key: Some("super-secret-key-12345".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
