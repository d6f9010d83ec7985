use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy that produced an extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    ReaderMode,
    MobileAgent,
    DiskStreamed,
    UrlOnly,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::ReaderMode => "reader-mode",
            ExtractionMethod::MobileAgent => "mobile-agent",
            ExtractionMethod::DiskStreamed => "disk-streamed",
            ExtractionMethod::UrlOnly => "url-only",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reader-mode" => Ok(ExtractionMethod::ReaderMode),
            "mobile-agent" => Ok(ExtractionMethod::MobileAgent),
            "disk-streamed" => Ok(ExtractionMethod::DiskStreamed),
            "url-only" => Ok(ExtractionMethod::UrlOnly),
            other => Err(crate::Error::Extraction(format!("Unknown extraction method: {}", other))),
        }
    }
}

/// Diagnostics collected while walking the tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDiagnostics {
    /// HTTP requests issued across all tiers
    pub attempts: u32,
    /// Tiers that ran without producing enough content, in order
    pub failed_methods: Vec<ExtractionMethod>,
    pub elapsed_ms: u64,
    /// Size of the largest response body seen
    pub source_bytes: usize,
    /// The winning body was cut at the byte budget
    #[serde(default)]
    pub truncated: bool,
}

/// Best-effort page text for a URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    pub text_content: String,
    pub description: Option<String>,
    pub method: ExtractionMethod,
    pub diagnostics: ExtractionDiagnostics,
    /// Set only when the URL itself cannot be fetched (bad scheme, unparsable)
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn is_degraded(&self) -> bool {
        self.method == ExtractionMethod::UrlOnly
    }
}

/// Title, description and main text recovered from a page's markup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
}

impl PageContent {
    /// Whether this content is good enough to stop trying further tiers
    pub fn is_sufficient(&self, min_chars: usize) -> bool {
        let has_title = self
            .title
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        has_title && self.text.chars().count() > min_chars
    }
}

/// What a single tier produced
#[derive(Debug, Clone, Default)]
pub struct TierReport {
    pub content: Option<PageContent>,
    pub attempts: u32,
    pub bytes: usize,
    /// Body was cut at the byte budget
    pub truncated: bool,
    pub error: Option<String>,
}

impl TierReport {
    pub fn failed(attempts: u32, error: impl Into<String>) -> Self {
        Self {
            content: None,
            attempts,
            bytes: 0,
            truncated: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_str() {
        for method in [
            ExtractionMethod::ReaderMode,
            ExtractionMethod::MobileAgent,
            ExtractionMethod::DiskStreamed,
            ExtractionMethod::UrlOnly,
        ] {
            assert_eq!(method.as_str().parse::<ExtractionMethod>().unwrap(), method);
        }
        assert!("browser".parse::<ExtractionMethod>().is_err());
    }

    #[test]
    fn test_sufficiency_needs_title_and_length() {
        let long_text = "word ".repeat(60);
        let content = PageContent {
            title: Some("A title".to_string()),
            description: None,
            text: long_text.clone(),
        };
        assert!(content.is_sufficient(200));

        let untitled = PageContent {
            title: Some("   ".to_string()),
            ..content.clone()
        };
        assert!(!untitled.is_sufficient(200));

        let exactly_min = PageContent {
            text: "x".repeat(200),
            ..content
        };
        assert!(!exactly_min.is_sufficient(200));
    }
}
