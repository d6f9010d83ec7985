use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{not_configured, CompletionOptions, ModelInfo, ProviderKind, SummaryProvider};
use crate::config::ProviderConfig;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Option<Vec<ClaudeContent>>,
    error: Option<ClaudeError>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeError {
    message: String,
}

#[derive(Deserialize)]
struct ClaudeModelList {
    data: Vec<ClaudeModel>,
}

#[derive(Deserialize)]
struct ClaudeModel {
    id: String,
    display_name: Option<String>,
}

/// Claude/Anthropic API provider
pub struct ClaudeApiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    max_input_chars: usize,
}

impl ClaudeApiProvider {
    pub fn new(config: &ProviderConfig, max_input_chars: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::AiProvider(format!("Failed to build Claude HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key().map(str::to_string),
            model: config.model.clone(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            max_tokens: config.max_tokens,
            max_input_chars,
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| not_configured(ProviderKind::Claude))
    }
}

#[async_trait::async_trait]
impl SummaryProvider for ClaudeApiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn summary_max_tokens(&self) -> u32 {
        self.max_tokens
    }

    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        let api_key = self.api_key()?;

        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            messages: vec![ClaudeMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::AiProvider(format!("Claude API request failed: {}", e)))?;

        let status = response.status();
        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| Error::AiProvider(format!("Failed to parse Claude response ({}): {}", status, e)))?;

        if let Some(error) = claude_response.error {
            return Err(Error::AiProvider(format!("Claude API error: {}", error.message)));
        }
        if !status.is_success() {
            return Err(Error::AiProvider(format!("Claude API returned {}", status)));
        }

        let content = claude_response
            .content
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(content)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| Error::AiProvider(format!("Claude API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::AiProvider(format!("Claude model listing returned {}", response.status())));
        }

        let list: ClaudeModelList = response
            .json()
            .await
            .map_err(|e| Error::AiProvider(format!("Failed to parse Claude model list: {}", e)))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                display_name: m.display_name,
            })
            .collect())
    }
}
