//! Application configuration for lyricsmith.
//!
//! User config lives at `~/.lyricsmith/lyricsmith.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored; the config names the env vars that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LyricsmithError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lyricsmith.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lyricsmith";

// ---------------------------------------------------------------------------
// Config structs (matching lyricsmith.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model used for identification, extraction, interspersion and
    /// language detection.
    #[serde(default = "CompletionConfig::default_analyst")]
    pub completion: CompletionConfig,

    /// Model used for translation and fact extraction.
    #[serde(default = "CompletionConfig::default_translator")]
    pub translation: CompletionConfig,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Encyclopedia settings.
    #[serde(default)]
    pub encyclopedia: EncyclopediaConfig,

    /// Search result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default_analyst(),
            translation: CompletionConfig::default_translator(),
            search: SearchConfig::default(),
            encyclopedia: EncyclopediaConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// `[completion]` / `[translation]` sections: an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the chat completions API (without `/chat/completions`).
    pub base_url: String,
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionConfig {
    fn default_analyst() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".into(),
            api_key_env: "DEEPSEEK_API_KEY".into(),
            model: "deepseek-chat".into(),
            timeout_secs: default_completion_timeout(),
            max_tokens: Some(8192),
        }
    }

    fn default_translator() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            model: "gpt-4o".into(),
            timeout_secs: default_completion_timeout(),
            max_tokens: Some(8000),
        }
    }
}

fn default_completion_timeout() -> u64 {
    60
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search API.
    #[serde(default = "default_search_url")]
    pub base_url: String,
    /// Name of the env var holding the API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    /// Results requested per lyrics search.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            api_key_env: default_search_key_env(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_url() -> String {
    "https://api.tavily.com".into()
}
fn default_search_key_env() -> String {
    "TAVILY_API_KEY".into()
}
fn default_max_results() -> u32 {
    5
}
fn default_search_timeout() -> u64 {
    30
}

/// `[encyclopedia]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncyclopediaConfig {
    /// Base URL of the MediaWiki site.
    #[serde(default = "default_encyclopedia_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_encyclopedia_timeout")]
    pub timeout_secs: u64,
}

impl Default for EncyclopediaConfig {
    fn default() -> Self {
        Self {
            base_url: default_encyclopedia_url(),
            timeout_secs: default_encyclopedia_timeout(),
        }
    }
}

fn default_encyclopedia_url() -> String {
    "https://en.wikipedia.org".into()
}
fn default_encyclopedia_timeout() -> u64 {
    15
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether search results are cached at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database file (a leading `~` expands to the home directory).
    #[serde(default = "default_cache_path")]
    pub path: String,
    /// Entry lifetime in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_cache_path() -> String {
    "~/.lyricsmith/cache.db".into()
}
fn default_cache_ttl() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lyricsmith/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LyricsmithError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lyricsmith/lyricsmith.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| LyricsmithError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LyricsmithError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LyricsmithError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LyricsmithError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LyricsmithError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LyricsmithError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that every API key env var named by the config is set and non-empty.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    let required = [
        ("completion", &config.completion.api_key_env),
        ("translation", &config.translation.api_key_env),
        ("search", &config.search.api_key_env),
    ];

    for (section, var_name) in required {
        match std::env::var(var_name) {
            Ok(val) if !val.trim().is_empty() => {}
            _ => {
                return Err(LyricsmithError::config(format!(
                    "API key for [{section}] not found. Set the {var_name} environment variable."
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[completion]"));
        assert!(toml_str.contains("TAVILY_API_KEY"));
        assert!(toml_str.contains("ttl_secs = 3600"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.completion.model, "deepseek-chat");
        assert_eq!(parsed.translation.model, "gpt-4o");
        assert_eq!(parsed.search.max_results, 5);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[cache]
ttl_secs = 60

[search]
max_results = 8
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
        assert_eq!(config.search.max_results, 8);
        assert_eq!(config.search.api_key_env, "TAVILY_API_KEY");
        assert_eq!(config.encyclopedia.base_url, "https://en.wikipedia.org");
        assert_eq!(config.completion.api_key_env, "DEEPSEEK_API_KEY");
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/cache/lyrics.db").unwrap(),
            PathBuf::from("/var/cache/lyrics.db")
        );
        let expanded = expand_home("~/cache.db").unwrap();
        assert!(expanded.ends_with("cache.db"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.completion.api_key_env = "LS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_keys(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("LS_TEST_NONEXISTENT_KEY_12345")
        );
    }
}
