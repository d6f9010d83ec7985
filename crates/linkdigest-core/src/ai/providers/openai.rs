use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use std::time::Duration;

use super::{not_configured, CompletionOptions, ModelInfo, ProviderKind, SummaryProvider};
use crate::config::ProviderConfig;
use crate::{Error, Result};

/// OpenAI API provider
pub struct OpenAiProvider {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    max_tokens: u32,
    max_input_chars: usize,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig, max_input_chars: usize) -> Result<Self> {
        let client = match config.api_key() {
            Some(api_key) => {
                let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
                if let Some(base_url) = config.base_url.as_deref() {
                    openai_config = openai_config.with_api_base(base_url.trim_end_matches('/'));
                }

                let http_client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                    .map_err(|e| Error::AiProvider(format!("Failed to build OpenAI HTTP client: {}", e)))?;

                Some(Client::with_config(openai_config).with_http_client(http_client))
            }
            None => None,
        };

        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_input_chars,
        })
    }

    fn client(&self) -> Result<&Client<OpenAIConfig>> {
        self.client.as_ref().ok_or_else(|| not_configured(ProviderKind::OpenAi))
    }
}

#[async_trait::async_trait]
impl SummaryProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn summary_max_tokens(&self) -> u32 {
        self.max_tokens
    }

    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        let client = self.client()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| Error::AiProvider(e.to_string()))?,
            )])
            .max_tokens(options.max_tokens)
            .temperature(options.temperature)
            .build()
            .map_err(|e| Error::AiProvider(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::AiProvider(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let client = self.client()?;

        let response = client
            .models()
            .list()
            .await
            .map_err(|e| Error::AiProvider(format!("OpenAI model listing failed: {}", e)))?;

        Ok(response
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                display_name: None,
            })
            .collect())
    }
}
