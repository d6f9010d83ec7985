use std::sync::Arc;
use std::time::Instant;

use url::Url;

use super::fetcher::PageFetcher;
use super::models::{ExtractionDiagnostics, ExtractionMethod, ExtractionResult, PageContent};
use super::tiers::{content_from_url, DiskStreamedTier, ExtractionTier, MobileAgentTier, ReaderModeTier};
use crate::config::ExtractorConfig;
use crate::text::{collapse_whitespace, truncate_chars};
use crate::Result;

/// Anything that can turn a URL into page text
#[async_trait::async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ExtractionResult;
}

/// Tiered extractor: cheap strategies first, URL-only synthesis last
pub struct ContentExtractor {
    tiers: Vec<Box<dyn ExtractionTier>>,
    min_content_chars: usize,
    max_text_chars: usize,
}

impl ContentExtractor {
    /// Create an extractor with the standard network tiers
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let fetcher = Arc::new(PageFetcher::new(config)?);

        let tiers: Vec<Box<dyn ExtractionTier>> = vec![
            Box::new(ReaderModeTier::new(Arc::clone(&fetcher), config)),
            Box::new(MobileAgentTier::new(Arc::clone(&fetcher), config)),
            Box::new(DiskStreamedTier::new(fetcher, config)),
        ];

        Ok(Self::with_tiers(tiers, config))
    }

    /// Create an extractor over a custom tier list
    pub fn with_tiers(tiers: Vec<Box<dyn ExtractionTier>>, config: &ExtractorConfig) -> Self {
        Self {
            tiers,
            min_content_chars: config.min_content_chars,
            max_text_chars: config.max_text_chars,
        }
    }

    /// Extract page text. Never fails: the URL-only tier always answers.
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        let started = Instant::now();
        let mut diagnostics = ExtractionDiagnostics::default();

        let parsed = match normalize_url(url) {
            Ok(parsed) => parsed,
            Err(message) => {
                tracing::warn!("Cannot fetch '{}': {}", url, message);
                let mut result = self.finish(url, content_from_url(url), ExtractionMethod::UrlOnly, diagnostics, started);
                result.error = Some(message);
                return result;
            }
        };

        for tier in &self.tiers {
            let method = tier.method();
            tracing::debug!("Trying {} extraction for {}", method, parsed);

            let report = tier.attempt(&parsed).await;
            diagnostics.attempts += report.attempts;
            diagnostics.source_bytes = diagnostics.source_bytes.max(report.bytes);

            match report.content {
                Some(content) if content.is_sufficient(self.min_content_chars) => {
                    diagnostics.truncated = report.truncated;
                    tracing::info!("Extracted {} via {} ({} bytes)", parsed, method, report.bytes);
                    return self.finish(parsed.as_str(), content, method, diagnostics, started);
                }
                _ => {
                    tracing::debug!(
                        "{} extraction insufficient for {}: {}",
                        method,
                        parsed,
                        report.error.as_deref().unwrap_or("too little content")
                    );
                    diagnostics.failed_methods.push(method);
                }
            }
        }

        tracing::warn!("All network tiers failed for {}, using URL-only text", parsed);
        self.finish(parsed.as_str(), content_from_url(parsed.as_str()), ExtractionMethod::UrlOnly, diagnostics, started)
    }

    fn finish(
        &self,
        url: &str,
        content: PageContent,
        method: ExtractionMethod,
        mut diagnostics: ExtractionDiagnostics,
        started: Instant,
    ) -> ExtractionResult {
        diagnostics.elapsed_ms = started.elapsed().as_millis() as u64;

        let fallback = content_from_url(url);
        let title = content
            .title
            .filter(|t| !t.trim().is_empty())
            .or(fallback.title)
            .unwrap_or_else(|| url.to_string());

        let text = collapse_whitespace(&content.text);
        let text = if text.is_empty() { fallback.text } else { text };

        ExtractionResult {
            url: url.to_string(),
            title,
            text_content: truncate_chars(&text, self.max_text_chars).to_string(),
            description: content.description,
            method,
            diagnostics,
            error: None,
        }
    }
}

#[async_trait::async_trait]
impl PageExtractor for ContentExtractor {
    async fn extract(&self, url: &str) -> ExtractionResult {
        ContentExtractor::extract(self, url).await
    }
}

/// Parse a bookmark URL, adding https:// when no scheme is present
fn normalize_url(raw: &str) -> std::result::Result<Url, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Empty URL".to_string());
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(format!("Unsupported URL scheme '{}' in '{}'", scheme, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::models::TierReport;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubTier {
        method: ExtractionMethod,
        content: Option<PageContent>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl ExtractionTier for StubTier {
        fn method(&self) -> ExtractionMethod {
            self.method
        }

        async fn attempt(&self, _url: &Url) -> TierReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.content {
                Some(content) => TierReport {
                    content: Some(content.clone()),
                    attempts: 1,
                    bytes: 1024,
                    truncated: false,
                    error: None,
                },
                None => TierReport::failed(2, "timed out"),
            }
        }
    }

    fn good_content() -> PageContent {
        PageContent {
            title: Some("A Good Article".to_string()),
            description: Some("About things".to_string()),
            text: "Meaningful sentence about the topic. ".repeat(10),
        }
    }

    fn stub(method: ExtractionMethod, content: Option<PageContent>) -> (Box<dyn ExtractionTier>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let tier = StubTier { method, content, calls: Arc::clone(&calls) };
        (Box::new(tier), calls)
    }

    #[tokio::test]
    async fn test_first_sufficient_tier_short_circuits() {
        let (reader, reader_calls) = stub(ExtractionMethod::ReaderMode, Some(good_content()));
        let (mobile, mobile_calls) = stub(ExtractionMethod::MobileAgent, Some(good_content()));
        let (disk, disk_calls) = stub(ExtractionMethod::DiskStreamed, Some(good_content()));

        let extractor = ContentExtractor::with_tiers(vec![reader, mobile, disk], &ExtractorConfig::default());
        let result = extractor.extract("https://example.com/post").await;

        assert_eq!(result.method, ExtractionMethod::ReaderMode);
        assert_eq!(result.title, "A Good Article");
        assert_eq!(reader_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mobile_calls.load(Ordering::SeqCst), 0);
        assert_eq!(disk_calls.load(Ordering::SeqCst), 0);
        assert!(result.diagnostics.failed_methods.is_empty());
    }

    #[tokio::test]
    async fn test_tiers_tried_in_order() {
        let thin = PageContent {
            title: Some("Thin".to_string()),
            description: None,
            text: "too short".to_string(),
        };
        let (reader, reader_calls) = stub(ExtractionMethod::ReaderMode, None);
        let (mobile, mobile_calls) = stub(ExtractionMethod::MobileAgent, Some(thin));
        let (disk, disk_calls) = stub(ExtractionMethod::DiskStreamed, Some(good_content()));

        let extractor = ContentExtractor::with_tiers(vec![reader, mobile, disk], &ExtractorConfig::default());
        let result = extractor.extract("https://example.com/post").await;

        assert_eq!(result.method, ExtractionMethod::DiskStreamed);
        assert_eq!(
            result.diagnostics.failed_methods,
            vec![ExtractionMethod::ReaderMode, ExtractionMethod::MobileAgent]
        );
        assert_eq!(result.diagnostics.attempts, 4);
        assert_eq!(result.diagnostics.source_bytes, 1024);
        assert_eq!(reader_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mobile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(disk_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_tiers_fail_falls_back_to_url() {
        let (reader, _) = stub(ExtractionMethod::ReaderMode, None);
        let (mobile, _) = stub(ExtractionMethod::MobileAgent, None);
        let (disk, _) = stub(ExtractionMethod::DiskStreamed, None);

        let extractor = ContentExtractor::with_tiers(vec![reader, mobile, disk], &ExtractorConfig::default());
        let result = extractor.extract("https://news.example.org/world/big-story").await;

        assert_eq!(result.method, ExtractionMethod::UrlOnly);
        assert!(result.is_degraded());
        assert!(result.error.is_none());
        assert!(!result.title.is_empty());
        assert!(!result.text_content.is_empty());
        assert_eq!(result.diagnostics.failed_methods.len(), 3);
    }

    #[tokio::test]
    async fn test_unusable_url_sets_error_but_still_answers() {
        let (reader, reader_calls) = stub(ExtractionMethod::ReaderMode, Some(good_content()));
        let extractor = ContentExtractor::with_tiers(vec![reader], &ExtractorConfig::default());

        for raw in ["", "ftp://files.example.com/a.txt", "javascript:alert(1)"] {
            let result = extractor.extract(raw).await;
            assert_eq!(result.method, ExtractionMethod::UrlOnly);
            assert!(result.error.is_some(), "{:?}", raw);
            assert!(!result.title.is_empty());
            assert!(!result.text_content.is_empty());
        }
        assert_eq!(reader_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com/a").unwrap().as_str(), "https://example.com/a");
        assert_eq!(normalize_url(" http://example.com ").unwrap().as_str(), "http://example.com/");
        assert!(normalize_url("ftp://example.com").is_err());
        assert!(normalize_url("").is_err());
    }
}
