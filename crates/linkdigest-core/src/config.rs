use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Minimum text length (chars) for a tier to count as successful
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    /// Extracted text is truncated to this many chars
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Byte budget for reader-mode and mobile-agent requests
    #[serde(default = "default_reader_max_bytes")]
    pub reader_max_bytes: usize,
    /// Per-attempt timeout for reader-mode and mobile-agent requests
    #[serde(default = "default_reader_timeout")]
    pub reader_timeout_secs: u64,
    /// Timeout for the disk-streamed download
    #[serde(default = "default_disk_timeout")]
    pub disk_timeout_secs: u64,
    /// Maximum bytes read back from the spooled page
    #[serde(default = "default_disk_read_ceiling")]
    pub disk_read_ceiling: usize,
    /// Directory for spooled pages (defaults to the OS temp dir)
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
    /// HTTP proxy URL (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_content_chars: default_min_content_chars(),
            max_text_chars: default_max_text_chars(),
            reader_max_bytes: default_reader_max_bytes(),
            reader_timeout_secs: default_reader_timeout(),
            disk_timeout_secs: default_disk_timeout(),
            disk_read_ceiling: default_disk_read_ceiling(),
            spool_dir: None,
            proxy_url: None,
        }
    }
}

impl ExtractorConfig {
    /// Directory where the disk-streamed tier spools response bodies
    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider used when a submission does not name one
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Fallback order over configured providers
    #[serde(default = "default_provider_priority")]
    pub provider_priority: Vec<String>,
    /// Input text is truncated to this many chars before prompting
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_claude")]
    pub claude: ProviderConfig,
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,
    #[serde(default = "default_gemini")]
    pub gemini: ProviderConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            provider_priority: default_provider_priority(),
            max_input_chars: default_max_input_chars(),
            claude: default_claude(),
            openai: default_openai(),
            gemini: default_gemini(),
        }
    }
}

impl AiConfig {
    /// Provider settings by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "claude" => Some(&self.claude),
            "openai" => Some(&self.openai),
            "gemini" => Some(&self.gemini),
            _ => None,
        }
    }
}

/// Settings for a single LLM backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider discriminant: "claude", "openai" or "gemini"
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: String,
    /// API base URL override (proxies, self-hosted gateways, tests)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Max tokens for the summary response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(name: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            api_key: None,
            model: model.to_string(),
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_ai_timeout(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Attempts per job before it is left failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before a failed job is retried
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Global delay between jobs in milliseconds
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    /// Priority for submissions that do not set one
    #[serde(default)]
    pub default_priority: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            request_delay_ms: default_request_delay(),
            default_priority: 0,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linkdigest")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_content_chars() -> usize {
    200
}

fn default_max_text_chars() -> usize {
    5000
}

fn default_reader_max_bytes() -> usize {
    50 * 1024
}

fn default_reader_timeout() -> u64 {
    5
}

fn default_disk_timeout() -> u64 {
    30
}

fn default_disk_read_ceiling() -> usize {
    200 * 1024
}

fn default_provider_priority() -> Vec<String> {
    vec!["claude".to_string(), "openai".to_string(), "gemini".to_string()]
}

fn default_max_input_chars() -> usize {
    8000
}

fn default_claude() -> ProviderConfig {
    ProviderConfig::new("claude", "claude-sonnet-4-20250514")
}

fn default_openai() -> ProviderConfig {
    ProviderConfig::new("openai", "gpt-4o-mini")
}

fn default_gemini() -> ProviderConfig {
    ProviderConfig::new("gemini", "gemini-2.0-flash")
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_ai_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_request_delay() -> u64 {
    1000
}

/// Environment variables that override provider API keys
const API_KEY_VARS: &[(&str, &str)] = &[
    ("claude", "ANTHROPIC_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
];

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from file (or defaults), then apply API keys from the environment
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        // Sub-table names are implied by their key
        for (target, default) in [
            (&mut config.ai.claude, default_claude()),
            (&mut config.ai.openai, default_openai()),
            (&mut config.ai.gemini, default_gemini()),
        ] {
            target.name = default.name;
            if target.model.trim().is_empty() {
                target.model = default.model;
            }
        }
        Ok(config)
    }

    /// Override provider API keys from environment-style lookups
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (provider, var) in API_KEY_VARS {
            let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) else {
                continue;
            };
            let target = match *provider {
                "claude" => &mut self.ai.claude,
                "openai" => &mut self.ai.openai,
                _ => &mut self.ai.gemini,
            };
            target.api_key = Some(key);
            tracing::debug!("Using {} from environment for {}", var, provider);
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/linkdigest/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("linkdigest")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("linkdigest.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.extractor.min_content_chars, 200);
        assert_eq!(config.extractor.max_text_chars, 5000);
        assert_eq!(config.extractor.reader_max_bytes, 51200);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.retry_delay_secs, 5);
        assert_eq!(config.queue.request_delay_ms, 1000);
        assert_eq!(config.ai.provider_priority, vec!["claude", "openai", "gemini"]);
        assert!(config.ai.claude.api_key().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [queue]
            max_attempts = 5

            [ai.openai]
            api_key = "sk-test"
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.queue.request_delay_ms, 1000);
        assert_eq!(config.ai.openai.name, "openai");
        assert_eq!(config.ai.openai.api_key(), Some("sk-test"));
        assert_eq!(config.ai.openai.model, "gpt-4o");
        assert_eq!(config.ai.claude.model, "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_provider_table_without_model_uses_default() {
        let config = AppConfig::from_toml(
            r#"
            [ai.gemini]
            api_key = "g-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.ai.gemini.name, "gemini");
        assert_eq!(config.ai.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.ai.gemini.max_tokens, 1000);
    }

    #[test]
    fn test_env_overrides_api_keys() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|var| match var {
            "ANTHROPIC_API_KEY" => Some("sk-ant".to_string()),
            "GEMINI_API_KEY" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.ai.claude.api_key(), Some("sk-ant"));
        assert!(config.ai.openai.api_key().is_none());
        assert!(config.ai.gemini.api_key().is_none());
    }

    #[test]
    fn test_blank_key_is_unset() {
        let provider = ProviderConfig::new("claude", "m").with_api_key("  ");
        assert!(provider.api_key().is_none());
    }
}
