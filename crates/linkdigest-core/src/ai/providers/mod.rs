mod claude_api;
mod gemini_api;
mod openai;

pub use claude_api::ClaudeApiProvider;
pub use gemini_api::GeminiApiProvider;
pub use openai::OpenAiProvider;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::prompt;
use crate::config::ProviderConfig;
use crate::quality::SuggestedAction;
use crate::{Error, Result};

/// Sealed set of supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Claude, ProviderKind::OpenAi, ProviderKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Build a provider of this kind from its settings
    pub fn build(&self, config: &ProviderConfig, max_input_chars: usize) -> Result<Arc<dyn SummaryProvider>> {
        let provider: Arc<dyn SummaryProvider> = match self {
            ProviderKind::Claude => Arc::new(ClaudeApiProvider::new(config, max_input_chars)?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config, max_input_chars)?),
            ProviderKind::Gemini => Arc::new(GeminiApiProvider::new(config, max_input_chars)?),
        };
        Ok(provider)
    }

    /// List the models an API key can use, without registering a provider
    pub async fn list_models(&self, api_key: &str, base_url: Option<&str>) -> Result<Vec<ModelInfo>> {
        let mut config = ProviderConfig::new(self.as_str(), "").with_api_key(api_key);
        config.base_url = base_url.map(str::to_string);

        self.build(&config, prompt::DEFAULT_MAX_INPUT_CHARS)?
            .list_models()
            .await
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "claude_api" | "anthropic" => Ok(ProviderKind::Claude),
            "openai" | "open_ai" | "gpt" => Ok(ProviderKind::OpenAi),
            "gemini" | "gemini_api" | "google" => Ok(ProviderKind::Gemini),
            other => Err(Error::UnknownProvider(other.to_string())),
        }
    }
}

/// Options for a single completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A model offered by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: Option<String>,
}

/// Structured summary produced by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub short_summary: String,
    pub long_summary: String,
    pub tags: Vec<String>,
    pub category: String,
    pub provider: String,
    pub confidence: f64,
    pub quality_score: Option<f64>,
    pub quality_issues: Option<Vec<String>>,
    /// Assessor's verdict, set alongside the quality score
    #[serde(default)]
    pub suggested_action: Option<SuggestedAction>,
    /// Set when the backend call failed; callers must check it
    pub error: Option<String>,
}

impl SummaryResult {
    /// A failed result: no content, zero confidence
    pub fn failed(provider: &str, error: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            confidence: 0.0,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// What to do with extracted text before summarizing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchAction {
    UseCurrent,
    FetchMore,
    MetadataOnly,
}

impl FetchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchAction::UseCurrent => "use_current",
            FetchAction::FetchMore => "fetch_more",
            FetchAction::MetadataOnly => "metadata_only",
        }
    }
}

/// Verdict on whether extracted text is worth summarizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyResult {
    pub sufficient: bool,
    pub confidence: f64,
    pub reason: String,
    pub suggested_action: FetchAction,
}

/// Trait for LLM summarization backends.
///
/// Variants only implement the raw calls; prompting and parsing are shared.
#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn model(&self) -> &str;

    /// Whether credentials are present (not whether they work)
    fn is_configured(&self) -> bool;

    /// Input text is cut to this many chars before prompting
    fn max_input_chars(&self) -> usize {
        prompt::DEFAULT_MAX_INPUT_CHARS
    }

    /// Token budget for the summary response
    fn summary_max_tokens(&self) -> u32 {
        1000
    }

    /// Send a single-turn prompt and return the raw text reply
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String>;

    /// Models available to the configured key
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Check credentials against the live backend
    async fn validate_config(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("{} credentials rejected: {}", self.name(), e);
                false
            }
        }
    }

    async fn summarize(&self, text: &str, url: &str, title: Option<&str>) -> SummaryResult {
        prompt::summarize_with(self, text, url, title).await
    }

    async fn assess_content_sufficiency(&self, text: &str, url: &str, title: Option<&str>) -> SufficiencyResult {
        prompt::assess_sufficiency_with(self, text, url, title).await
    }
}

/// Error for calls made without an API key
pub(crate) fn not_configured(kind: ProviderKind) -> Error {
    Error::AiProvider(format!("{} API key not configured", kind))
}
