use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::prompt::{heuristic_sufficiency, DEFAULT_MAX_INPUT_CHARS};
use super::providers::{ProviderKind, SufficiencyResult, SummaryProvider, SummaryResult};
use crate::config::{AiConfig, ProviderConfig};
use crate::quality::QualityAssessor;
use crate::{Error, Result};

/// Registry of configured providers plus the quality pass over their output
pub struct Summarizer {
    providers: RwLock<HashMap<ProviderKind, Arc<dyn SummaryProvider>>>,
    default_provider: Option<ProviderKind>,
    priority: Vec<ProviderKind>,
    max_input_chars: usize,
    assessor: QualityAssessor,
}

impl Summarizer {
    /// Register every provider in `config` that has an API key
    pub fn new(config: &AiConfig) -> Result<Self> {
        let mut summarizer = Self::empty();
        summarizer.max_input_chars = config.max_input_chars.max(1);
        summarizer.default_provider = match config.default_provider.as_deref() {
            Some(name) if !name.trim().is_empty() => Some(name.parse()?),
            _ => None,
        };

        let priority: Vec<ProviderKind> = config
            .provider_priority
            .iter()
            .filter_map(|name| match name.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    tracing::warn!("Ignoring provider priority entry: {}", e);
                    None
                }
            })
            .collect();
        if !priority.is_empty() {
            summarizer.priority = priority;
        }

        for kind in ProviderKind::ALL {
            let Some(provider_config) = config.provider(kind.as_str()) else {
                continue;
            };
            if provider_config.api_key().is_none() {
                tracing::debug!("{} has no API key, not registering", kind);
                continue;
            }
            let provider = kind.build(provider_config, summarizer.max_input_chars)?;
            summarizer.insert(provider);
        }

        Ok(summarizer)
    }

    /// A registry with no providers
    pub fn empty() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            default_provider: None,
            priority: ProviderKind::ALL.to_vec(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            assessor: QualityAssessor::new(),
        }
    }

    /// Register a ready-made provider, replacing any of the same kind
    pub fn with_provider(self, provider: Arc<dyn SummaryProvider>) -> Self {
        self.insert(provider);
        self
    }

    pub fn with_assessor(mut self, assessor: QualityAssessor) -> Self {
        self.assessor = assessor;
        self
    }

    pub fn with_default_provider(mut self, kind: ProviderKind) -> Self {
        self.default_provider = Some(kind);
        self
    }

    pub fn assessor(&self) -> &QualityAssessor {
        &self.assessor
    }

    fn insert(&self, provider: Arc<dyn SummaryProvider>) {
        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        tracing::info!("Registered {} provider (model {})", provider.name(), provider.model());
        providers.insert(provider.kind(), provider);
    }

    fn lookup(&self, kind: ProviderKind) -> Option<Arc<dyn SummaryProvider>> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers.get(&kind).filter(|p| p.is_configured()).cloned()
    }

    /// Names of registered providers with credentials, in priority order
    pub fn configured_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        let mut kinds: Vec<ProviderKind> = providers
            .values()
            .filter(|p| p.is_configured())
            .map(|p| p.kind())
            .collect();
        kinds.sort_by_key(|kind| self.rank(*kind));
        kinds.into_iter().map(|k| k.as_str().to_string()).collect()
    }

    fn rank(&self, kind: ProviderKind) -> usize {
        self.priority
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(self.priority.len())
    }

    /// Pick a provider: explicit name, then default, then priority order
    pub fn select_provider(&self, name: Option<&str>) -> Result<Arc<dyn SummaryProvider>> {
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            let kind: ProviderKind = name.parse()?;
            return self.lookup(kind).ok_or_else(|| {
                Error::AiProvider(format!("{} provider is not configured", kind))
            });
        }

        if let Some(provider) = self.default_provider.and_then(|kind| self.lookup(kind)) {
            return Ok(provider);
        }

        if let Some(provider) = self.priority.iter().find_map(|kind| self.lookup(*kind)) {
            return Ok(provider);
        }

        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers
            .values()
            .find(|p| p.is_configured())
            .cloned()
            .ok_or(Error::NoProviderConfigured)
    }

    /// Build a provider from `config`, activating it only if the backend accepts it
    pub async fn configure_provider(&self, config: &ProviderConfig) -> Result<bool> {
        let kind: ProviderKind = config.name.parse()?;
        let provider = kind.build(config, self.max_input_chars)?;
        self.configure_with(provider).await
    }

    /// Validate an already-built provider and activate it on success
    pub async fn configure_with(&self, provider: Arc<dyn SummaryProvider>) -> Result<bool> {
        if !provider.validate_config().await {
            tracing::warn!("Rejected {} configuration: validation failed", provider.name());
            return Ok(false);
        }
        self.insert(provider);
        Ok(true)
    }

    /// Check a registered provider's credentials against its backend
    pub async fn validate_provider(&self, name: &str) -> Result<bool> {
        let kind: ProviderKind = name.parse()?;
        match self.lookup(kind) {
            Some(provider) => Ok(provider.validate_config().await),
            None => Ok(false),
        }
    }

    /// Summarize with the selected provider and attach a quality assessment
    pub async fn summarize(&self, provider: Option<&str>, text: &str, url: &str, title: Option<&str>) -> Result<SummaryResult> {
        let provider = self.select_provider(provider)?;
        let mut result = provider.summarize(text, url, title).await;

        if result.is_error() {
            return Ok(result);
        }

        let assessment = self.assessor.assess(&result, text, url);
        tracing::debug!(
            "Quality for {}: score {:.2}, {} issue(s), action {}",
            url,
            assessment.score,
            assessment.issues.len(),
            assessment.suggested_action.as_str()
        );
        result.quality_score = Some(assessment.score);
        result.quality_issues = Some(assessment.issue_descriptions());
        result.suggested_action = Some(assessment.suggested_action);

        Ok(result)
    }

    /// Sufficiency check; falls back to the length heuristic with no provider
    pub async fn assess_content_sufficiency(
        &self,
        provider: Option<&str>,
        text: &str,
        url: &str,
        title: Option<&str>,
    ) -> SufficiencyResult {
        match self.select_provider(provider) {
            Ok(provider) => provider.assess_content_sufficiency(text, url, title).await,
            Err(e) => {
                tracing::debug!("No provider for sufficiency check ({}), using heuristic", e);
                heuristic_sufficiency(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::providers::{CompletionOptions, ModelInfo};
    use crate::quality::SuggestedAction;

    struct FakeProvider {
        kind: ProviderKind,
        reply: String,
        valid: bool,
    }

    #[async_trait::async_trait]
    impl SummaryProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _prompt: &str, _options: CompletionOptions) -> Result<String> {
            Ok(self.reply.clone())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            if self.valid {
                Ok(vec![ModelInfo { id: "fake-model".to_string(), display_name: None }])
            } else {
                Err(Error::AiProvider("401 Unauthorized".to_string()))
            }
        }
    }

    fn fake(kind: ProviderKind, reply: &str) -> Arc<dyn SummaryProvider> {
        Arc::new(FakeProvider { kind, reply: reply.to_string(), valid: true })
    }

    const GOOD_REPLY: &str = r#"{"short_summary": "A practical guide to sourdough starters.",
        "long_summary": "The article walks through feeding schedules, hydration ratios and common mistakes when keeping a sourdough starter alive.",
        "tags": ["baking", "sourdough"], "category": "Food"}"#;

    #[test]
    fn test_selection_order() {
        let summarizer = Summarizer::empty()
            .with_provider(fake(ProviderKind::Gemini, GOOD_REPLY))
            .with_provider(fake(ProviderKind::OpenAi, GOOD_REPLY));

        assert_eq!(summarizer.configured_providers(), vec!["openai", "gemini"]);
        assert_eq!(summarizer.select_provider(None).unwrap().kind(), ProviderKind::OpenAi);
        assert_eq!(summarizer.select_provider(Some("gemini")).unwrap().kind(), ProviderKind::Gemini);
        assert!(summarizer.select_provider(Some("claude")).is_err());

        let with_default = summarizer.with_default_provider(ProviderKind::Gemini);
        assert_eq!(with_default.select_provider(None).unwrap().kind(), ProviderKind::Gemini);
    }

    #[test]
    fn test_no_provider_configured() {
        let summarizer = Summarizer::empty();
        assert!(matches!(summarizer.select_provider(None), Err(Error::NoProviderConfigured)));
        assert!(summarizer.configured_providers().is_empty());
    }

    #[test]
    fn test_new_skips_providers_without_keys() {
        let mut config = AiConfig::default();
        config.openai = config.openai.with_api_key("sk-test");

        let summarizer = Summarizer::new(&config).unwrap();
        assert_eq!(summarizer.configured_providers(), vec!["openai"]);
    }

    #[tokio::test]
    async fn test_summarize_attaches_quality() {
        let summarizer = Summarizer::empty().with_provider(fake(ProviderKind::Claude, GOOD_REPLY));
        let result = summarizer
            .summarize(None, &"Sourdough notes. ".repeat(30), "https://example.com/bread", Some("Bread"))
            .await
            .unwrap();

        assert!(!result.is_error());
        assert_eq!(result.provider, "claude");
        assert_eq!(result.category, "Food");
        assert_eq!(result.quality_score, Some(1.0));
        assert_eq!(result.suggested_action, Some(SuggestedAction::Accept));
        assert_eq!(result.quality_issues, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_configure_requires_validation() {
        let summarizer = Summarizer::empty();
        let rejected = Arc::new(FakeProvider {
            kind: ProviderKind::Claude,
            reply: String::new(),
            valid: false,
        });

        assert!(!summarizer.configure_with(rejected).await.unwrap());
        assert!(summarizer.configured_providers().is_empty());

        assert!(summarizer.configure_with(fake(ProviderKind::Claude, GOOD_REPLY)).await.unwrap());
        assert_eq!(summarizer.configured_providers(), vec!["claude"]);
        assert!(summarizer.validate_provider("claude").await.unwrap());
        assert!(!summarizer.validate_provider("gemini").await.unwrap());
    }

    #[tokio::test]
    async fn test_sufficiency_without_provider_uses_heuristic() {
        let summarizer = Summarizer::empty();
        let verdict = summarizer
            .assess_content_sufficiency(None, "tiny", "https://example.com", None)
            .await;
        assert!(!verdict.sufficient);
    }
}
