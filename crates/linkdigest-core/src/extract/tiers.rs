use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use url::{Host, Url};

use super::fetcher::{next_user_agent, PageFetcher, MOBILE_USER_AGENT};
use super::models::{ExtractionMethod, PageContent, TierReport};
use super::parser::parse_page;
use super::spool::{read_head, SpoolFile};
use crate::config::ExtractorConfig;
use crate::Result;

/// One strategy in the ordered fallback chain
#[async_trait::async_trait]
pub trait ExtractionTier: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Try to get page content. Failures are reported, never raised.
    async fn attempt(&self, url: &Url) -> TierReport;
}

/// Query and path variants that commonly strip page chrome
pub fn reader_variants(url: &Url) -> Vec<Url> {
    let mut variants = Vec::new();

    for (key, value) in [("amp", "1"), ("print", "1"), ("output", "print"), ("view", "reader")] {
        let mut variant = url.clone();
        variant.query_pairs_mut().append_pair(key, value);
        variants.push(variant);
    }

    let path = url.path().trim_end_matches('/');
    if !path.ends_with("/amp") {
        let mut variant = url.clone();
        variant.set_path(&format!("{}/amp", path));
        // Keep AMP variants next to each other
        variants.insert(1, variant);
    }

    if let Some(Host::Domain(domain)) = url.host() {
        let bare = domain.strip_prefix("www.").unwrap_or(domain);
        if bare.contains('.') && !bare.starts_with("m.") {
            let mut variant = url.clone();
            if variant.set_host(Some(&format!("m.{}", bare))).is_ok() {
                variants.push(variant);
            }
        }
    }

    variants
}

/// Tier 1: reader-friendly URL variants with desktop headers
pub struct ReaderModeTier {
    fetcher: Arc<PageFetcher>,
    max_bytes: usize,
    timeout: Duration,
    max_chars: usize,
    min_chars: usize,
}

impl ReaderModeTier {
    pub fn new(fetcher: Arc<PageFetcher>, config: &ExtractorConfig) -> Self {
        Self {
            fetcher,
            max_bytes: config.reader_max_bytes,
            timeout: Duration::from_secs(config.reader_timeout_secs),
            max_chars: config.max_text_chars,
            min_chars: config.min_content_chars,
        }
    }
}

#[async_trait::async_trait]
impl ExtractionTier for ReaderModeTier {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ReaderMode
    }

    async fn attempt(&self, url: &Url) -> TierReport {
        let mut report = TierReport::default();

        for variant in reader_variants(url) {
            report.attempts += 1;
            match self
                .fetcher
                .fetch_capped(&variant, next_user_agent(), self.max_bytes, self.timeout)
                .await
            {
                Ok(page) => {
                    report.bytes = report.bytes.max(page.bytes);
                    let content = parse_page(&page.body, self.max_chars);
                    if content.is_sufficient(self.min_chars) {
                        tracing::debug!("Reader-mode variant succeeded: {}", variant);
                        report.content = Some(content);
                        report.truncated = page.truncated;
                        report.error = None;
                        return report;
                    }
                    report.error = Some(format!("Too little content at {}", variant));
                }
                Err(e) => {
                    tracing::debug!("Reader-mode variant failed: {}", e);
                    report.error = Some(e.to_string());
                }
            }
        }

        report
    }
}

/// Tier 2: the original URL with a mobile user agent
pub struct MobileAgentTier {
    fetcher: Arc<PageFetcher>,
    max_bytes: usize,
    timeout: Duration,
    max_chars: usize,
}

impl MobileAgentTier {
    pub fn new(fetcher: Arc<PageFetcher>, config: &ExtractorConfig) -> Self {
        Self {
            fetcher,
            max_bytes: config.reader_max_bytes,
            timeout: Duration::from_secs(config.reader_timeout_secs),
            max_chars: config.max_text_chars,
        }
    }
}

#[async_trait::async_trait]
impl ExtractionTier for MobileAgentTier {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::MobileAgent
    }

    async fn attempt(&self, url: &Url) -> TierReport {
        match self
            .fetcher
            .fetch_capped(url, MOBILE_USER_AGENT, self.max_bytes, self.timeout)
            .await
        {
            Ok(page) => TierReport {
                content: Some(parse_page(&page.body, self.max_chars)),
                attempts: 1,
                bytes: page.bytes,
                truncated: page.truncated,
                error: None,
            },
            Err(e) => TierReport::failed(1, e.to_string()),
        }
    }
}

/// Tier 3: spool the whole body to disk, then read back a bounded head
pub struct DiskStreamedTier {
    fetcher: Arc<PageFetcher>,
    spool_dir: PathBuf,
    timeout: Duration,
    read_ceiling: usize,
    max_chars: usize,
}

impl DiskStreamedTier {
    pub fn new(fetcher: Arc<PageFetcher>, config: &ExtractorConfig) -> Self {
        Self {
            fetcher,
            spool_dir: config.spool_dir(),
            timeout: Duration::from_secs(config.disk_timeout_secs),
            read_ceiling: config.disk_read_ceiling,
            max_chars: config.max_text_chars,
        }
    }

    async fn spool_and_parse(&self, url: &Url, spool: &SpoolFile) -> Result<(PageContent, usize)> {
        let mut response = self.fetcher.open(url, next_user_agent(), self.timeout).await?;

        let mut written = 0usize;
        {
            let mut file = tokio::fs::File::create(spool.path()).await?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len();
            }
            file.flush().await?;
        }
        tracing::debug!("Spooled {} bytes for {} to {}", written, url, spool.path().display());

        let head = read_head(spool.path(), self.read_ceiling).await?;
        Ok((parse_page(&head, self.max_chars), written))
    }
}

#[async_trait::async_trait]
impl ExtractionTier for DiskStreamedTier {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::DiskStreamed
    }

    async fn attempt(&self, url: &Url) -> TierReport {
        let spool = match SpoolFile::new(&self.spool_dir, url.as_str()) {
            Ok(spool) => spool,
            Err(e) => return TierReport::failed(0, format!("Cannot create spool file: {}", e)),
        };

        // `spool` is dropped (and the file removed) on every path out of here
        match self.spool_and_parse(url, &spool).await {
            Ok((content, bytes)) => TierReport {
                content: Some(content),
                attempts: 1,
                bytes,
                truncated: false,
                error: None,
            },
            Err(e) => TierReport::failed(1, e.to_string()),
        }
    }
}

/// Tier 4: synthesize a title and description from the URL alone
pub fn content_from_url(raw_url: &str) -> PageContent {
    let raw = raw_url.trim();

    let (domain, segments) = match Url::parse(raw) {
        Ok(url) => {
            let domain = url
                .host_str()
                .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
                .unwrap_or_default();
            let segments: Vec<String> = url
                .path_segments()
                .map(|segments| segments.filter_map(humanize_segment).collect())
                .unwrap_or_default();
            (domain, segments)
        }
        Err(_) => (String::new(), Vec::new()),
    };

    let site = if domain.is_empty() {
        if raw.is_empty() { "unknown site".to_string() } else { raw.to_string() }
    } else {
        domain.clone()
    };

    let title = match segments.last() {
        Some(topic) => format!("{} | {}", capitalize(topic), site),
        None => site.clone(),
    };

    let description = if segments.is_empty() {
        format!("Saved link to {}", site)
    } else {
        format!("Saved link to {} about {}", site, segments.join(" / "))
    };

    let mut text = format!("{}. Website: {}.", description, site);
    if !raw.is_empty() {
        text.push_str(&format!(" Address: {}", raw));
    }

    PageContent {
        title: Some(title),
        description: Some(description),
        text,
    }
}

fn humanize_segment(segment: &str) -> Option<String> {
    let stem = segment
        .rsplit_once('.')
        .filter(|(_, ext)| matches!(*ext, "html" | "htm" | "php" | "asp" | "aspx" | "jsp"))
        .map(|(stem, _)| stem)
        .unwrap_or(segment);

    let words: Vec<&str> = stem
        .split(|c: char| c == '-' || c == '_' || c == '+' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();

    // Bare ids and dates carry no topic
    if words.is_empty() || words.iter().all(|w| w.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    Some(words.join(" ").replace("%20", " "))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_variants_order() {
        let url = Url::parse("https://www.example.com/posts/rust?id=7").unwrap();
        let variants: Vec<String> = reader_variants(&url).iter().map(|u| u.to_string()).collect();

        assert_eq!(
            variants,
            vec![
                "https://www.example.com/posts/rust?id=7&amp=1",
                "https://www.example.com/posts/rust/amp?id=7",
                "https://www.example.com/posts/rust?id=7&print=1",
                "https://www.example.com/posts/rust?id=7&output=print",
                "https://www.example.com/posts/rust?id=7&view=reader",
                "https://m.example.com/posts/rust?id=7",
            ]
        );
    }

    #[test]
    fn test_reader_variants_skip_ip_hosts_and_amp_paths() {
        let url = Url::parse("http://127.0.0.1:8080/story/amp").unwrap();
        let variants = reader_variants(&url);

        assert_eq!(variants.len(), 4);
        assert!(variants.iter().all(|v| v.host_str() == Some("127.0.0.1")));
    }

    #[test]
    fn test_content_from_url() {
        let content = content_from_url("https://www.example.com/blog/2024/understanding-async-rust.html");

        assert_eq!(content.title.as_deref(), Some("Understanding async rust | example.com"));
        assert_eq!(
            content.description.as_deref(),
            Some("Saved link to example.com about blog / understanding async rust")
        );
        assert!(content.text.contains("example.com"));
    }

    #[test]
    fn test_content_from_url_never_empty() {
        for raw in ["", "   ", "not a url", "https://example.com", "mailto:someone"] {
            let content = content_from_url(raw);
            assert!(!content.title.as_deref().unwrap_or("").trim().is_empty(), "{:?}", raw);
            assert!(!content.text.trim().is_empty(), "{:?}", raw);
        }
    }
}
