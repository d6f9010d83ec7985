use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::{Client, Proxy, Response};
use url::Url;

use crate::config::ExtractorConfig;
use crate::{Error, Result};

/// Page bodies are never buffered beyond this, whatever the caller asks for
const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

// Rotating desktop User-Agent pool
static USER_AGENT_INDEX: AtomicUsize = AtomicUsize::new(0);
const USER_AGENTS: &[&str] = &[
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Safari on iPhone
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";

/// Get the next desktop User-Agent in rotation
pub fn next_user_agent() -> &'static str {
    let index = USER_AGENT_INDEX.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
    USER_AGENTS[index]
}

/// A page body read under a byte budget
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: String,
    /// Bytes actually read (at most the budget)
    pub bytes: usize,
    pub truncated: bool,
}

/// HTTP client shared by the network extraction tiers
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Self::build_client(&config.proxy_url)?;
        Ok(Self { client })
    }

    /// Build HTTP client with optional proxy. Timeouts are set per request.
    fn build_client(proxy_url: &Option<String>) -> Result<Client> {
        let mut builder = Client::builder()
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(ref proxy) = proxy_url {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for page fetching");
        }

        builder.build().map_err(Error::Http)
    }

    /// Build browser-like headers for a request
    fn build_headers(user_agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
        if let Ok(ua) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers
    }

    /// Send a GET and reject anything that is not a successful HTML-ish response
    pub async fn open(&self, url: &Url, user_agent: &str, timeout: Duration) -> Result<Response> {
        let response = self
            .client
            .get(url.as_str())
            .headers(Self::build_headers(user_agent))
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let is_cloudflare = response.headers().get("cf-mitigated").is_some()
                || response
                    .headers()
                    .get("server")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.contains("cloudflare"))
                    .unwrap_or(false);
            if is_cloudflare {
                return Err(Error::Extraction(format!(
                    "Cloudflare protection ({}) for URL: {}",
                    status, url
                )));
            }
            return Err(Error::Extraction(format!("HTTP {} for URL: {}", status, url)));
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !is_markup_content_type(content_type) {
                return Err(Error::Extraction(format!(
                    "Unsupported content type '{}' for URL: {}",
                    content_type, url
                )));
            }
        }

        Ok(response)
    }

    /// Fetch a page, reading at most `max_bytes` of its body
    pub async fn fetch_capped(
        &self,
        url: &Url,
        user_agent: &str,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<FetchedPage> {
        let max_bytes = max_bytes.min(MAX_PAGE_BYTES);
        let mut response = self.open(url, user_agent, timeout).await?;

        let mut buf: Vec<u8> = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await? {
            buf.extend_from_slice(&chunk);
            if buf.len() >= max_bytes {
                buf.truncate(max_bytes);
                truncated = true;
                break;
            }
        }

        if is_cloudflare_challenge(&buf) {
            return Err(Error::Extraction(format!(
                "Cloudflare JavaScript challenge detected for URL: {}",
                url
            )));
        }

        Ok(FetchedPage {
            bytes: buf.len(),
            body: String::from_utf8_lossy(&buf).into_owned(),
            truncated,
        })
    }
}

fn is_markup_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("html") || content_type.contains("xml") || content_type.starts_with("text/")
}

/// Check if content is a Cloudflare challenge page
pub fn is_cloudflare_challenge(content: &[u8]) -> bool {
    // Check first 2KB for Cloudflare markers
    let check_len = content.len().min(2048);
    let preview = String::from_utf8_lossy(&content[..check_len]);

    preview.contains("Just a moment...")
        || preview.contains("cf-browser-verification")
        || preview.contains("_cf_chl_opt")
        || preview.contains("challenge-platform")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_rotation() {
        let ua1 = next_user_agent();
        let ua2 = next_user_agent();

        assert!(USER_AGENTS.contains(&ua1));
        assert!(USER_AGENTS.contains(&ua2));
        assert_ne!(ua1, ua2);
        assert!(MOBILE_USER_AGENT.contains("iPhone"));
    }

    #[test]
    fn test_markup_content_types() {
        assert!(is_markup_content_type("text/html; charset=utf-8"));
        assert!(is_markup_content_type("application/xhtml+xml"));
        assert!(is_markup_content_type("text/plain"));
        assert!(!is_markup_content_type("application/pdf"));
        assert!(!is_markup_content_type("image/png"));
    }

    #[test]
    fn test_cloudflare_challenge_detection() {
        assert!(is_cloudflare_challenge(b"<html><title>Just a moment...</title></html>"));
        assert!(!is_cloudflare_challenge(b"<html><title>Hello</title></html>"));
    }
}
