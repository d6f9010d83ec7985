//! Prompt templates and response parsing shared by every provider.

use serde::Deserialize;

use super::providers::{CompletionOptions, FetchAction, SufficiencyResult, SummaryProvider, SummaryResult};
use crate::text::{collapse_whitespace, truncate_chars};

pub const DEFAULT_MAX_INPUT_CHARS: usize = 8000;

pub const MAX_TAGS: usize = 5;
pub const UNCATEGORIZED: &str = "Uncategorized";

const MAX_SHORT_SUMMARY_CHARS: usize = 200;
const MAX_FALLBACK_LONG_CHARS: usize = 2000;
const SUFFICIENCY_INPUT_CHARS: usize = 2000;

/// Confidence for a response that parsed as the requested JSON
const STRUCTURED_CONFIDENCE: f64 = 0.8;
/// Confidence for a free-text response salvaged line by line
const FALLBACK_CONFIDENCE: f64 = 0.3;

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUFFICIENCY_TEMPERATURE: f32 = 0.1;
const SUFFICIENCY_MAX_TOKENS: u32 = 200;

/// Build the summarization prompt
pub fn build_summary_prompt(text: &str, url: &str, title: Option<&str>, max_input_chars: usize) -> String {
    let truncated = truncate_chars(text, max_input_chars);
    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or("(unknown)");

    format!(
        "You are summarizing a saved web page for a bookmark manager.\n\n\
URL: {url}\n\
Title: {title}\n\n\
Page content:\n\"\"\"\n{truncated}\n\"\"\"\n\n\
Respond with ONLY valid JSON (no markdown, no code blocks) with exactly these fields:\n\
{{\"short_summary\": \"one sentence, at most 200 characters\", \
\"long_summary\": \"one to three paragraphs covering the key points\", \
\"tags\": [\"up to {MAX_TAGS} lowercase topic tags\"], \
\"category\": \"one broad category such as Technology, Science, Business, News, Reference, Education, Health, Entertainment, Lifestyle or Other\"}}"
    )
}

/// Build the cheaper prompt that asks whether the text is worth summarizing
pub fn build_sufficiency_prompt(text: &str, url: &str, title: Option<&str>) -> String {
    let truncated = truncate_chars(text, SUFFICIENCY_INPUT_CHARS);
    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or("(unknown)");

    format!(
        "Decide whether the text below, extracted from a web page, is enough to write a meaningful summary.\n\n\
URL: {url}\n\
Title: {title}\n\n\
Extracted text:\n\"\"\"\n{truncated}\n\"\"\"\n\n\
Respond with ONLY valid JSON (no markdown, no code blocks):\n\
{{\"sufficient\": true|false, \"confidence\": 0.0-1.0, \"reason\": \"one sentence\", \
\"action\": \"use_current|fetch_more|metadata_only\"}}"
    )
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default, alias = "shortSummary", alias = "summary")]
    short_summary: String,
    #[serde(default, alias = "longSummary")]
    long_summary: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Summary fields recovered from a provider reply
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSummary {
    pub short_summary: String,
    pub long_summary: String,
    pub tags: Vec<String>,
    pub category: String,
    pub confidence: f64,
    /// Whether the reply was the requested JSON
    pub structured: bool,
}

/// The first `{ ... }` span in a reply, ignoring code fences and chatter
fn json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse a summary reply, salvaging free text when it is not JSON
pub fn parse_summary_response(raw: &str) -> ParsedSummary {
    let parsed = json_object(raw).and_then(|json| serde_json::from_str::<RawSummary>(json).ok());

    match parsed {
        Some(summary) if !summary.short_summary.trim().is_empty() || !summary.long_summary.trim().is_empty() => {
            let long = summary.long_summary.trim().to_string();
            let short = if summary.short_summary.trim().is_empty() {
                first_sentence(&long)
            } else {
                collapse_whitespace(&summary.short_summary)
            };
            let long = if long.is_empty() { short.clone() } else { long };
            let category = collapse_whitespace(&summary.category);

            ParsedSummary {
                short_summary: truncate_chars(&short, MAX_SHORT_SUMMARY_CHARS).to_string(),
                long_summary: long,
                tags: normalize_tags(&summary.tags),
                category: if category.is_empty() { UNCATEGORIZED.to_string() } else { category },
                confidence: summary.confidence.unwrap_or(STRUCTURED_CONFIDENCE).clamp(0.0, 1.0),
                structured: true,
            }
        }
        _ => fallback_summary(raw),
    }
}

/// First line becomes the short summary, the capped body the long one
fn fallback_summary(raw: &str) -> ParsedSummary {
    let first_line = raw
        .lines()
        .map(|line| line.trim().trim_start_matches(['#', '*', '-', '>', ' ']).trim())
        .find(|line| !line.is_empty() && !line.starts_with("```"))
        .unwrap_or_default();

    ParsedSummary {
        short_summary: truncate_chars(first_line, MAX_SHORT_SUMMARY_CHARS).to_string(),
        long_summary: truncate_chars(raw.trim(), MAX_FALLBACK_LONG_CHARS).to_string(),
        tags: Vec::new(),
        category: UNCATEGORIZED.to_string(),
        confidence: FALLBACK_CONFIDENCE,
        structured: false,
    }
}

fn first_sentence(text: &str) -> String {
    let end = text
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(text.len());
    collapse_whitespace(&text[..end])
}

/// Lowercase, trim, dedupe and cap tags
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = collapse_whitespace(tag.trim().trim_start_matches('#')).to_lowercase();
        if tag.is_empty() || tag.len() >= 50 || normalized.contains(&tag) {
            continue;
        }
        normalized.push(tag);
        if normalized.len() == MAX_TAGS {
            break;
        }
    }
    normalized
}

#[derive(Deserialize)]
struct RawSufficiency {
    sufficient: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    action: Option<FetchAction>,
}

/// Parse a sufficiency reply; `None` when it is not the requested JSON
pub fn parse_sufficiency_response(raw: &str) -> Option<SufficiencyResult> {
    let parsed: RawSufficiency = serde_json::from_str(json_object(raw)?).ok()?;

    let suggested_action = parsed.action.unwrap_or(if parsed.sufficient {
        FetchAction::UseCurrent
    } else {
        FetchAction::FetchMore
    });

    Some(SufficiencyResult {
        sufficient: parsed.sufficient,
        confidence: parsed.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        reason: collapse_whitespace(&parsed.reason),
        suggested_action,
    })
}

/// Length-based sufficiency verdict for when no backend can be asked
pub fn heuristic_sufficiency(text: &str) -> SufficiencyResult {
    let chars = text.trim().chars().count();

    if chars < 50 {
        SufficiencyResult {
            sufficient: false,
            confidence: 0.9,
            reason: format!("Only {} characters of text were extracted", chars),
            suggested_action: FetchAction::MetadataOnly,
        }
    } else if chars < 300 {
        SufficiencyResult {
            sufficient: false,
            confidence: 0.7,
            reason: format!("{} characters is likely too little for a meaningful summary", chars),
            suggested_action: FetchAction::FetchMore,
        }
    } else {
        SufficiencyResult {
            sufficient: true,
            confidence: 0.6,
            reason: format!("{} characters of text available", chars),
            suggested_action: FetchAction::UseCurrent,
        }
    }
}

/// Summarize through any provider's raw completion call
pub async fn summarize_with<P: SummaryProvider + ?Sized>(
    provider: &P,
    text: &str,
    url: &str,
    title: Option<&str>,
) -> SummaryResult {
    let name = provider.name();

    if !provider.is_configured() {
        return SummaryResult::failed(name, format!("{} provider is not configured", name));
    }
    if text.trim().is_empty() {
        return SummaryResult::failed(name, "No content to summarize");
    }

    let prompt = build_summary_prompt(text, url, title, provider.max_input_chars());
    let options = CompletionOptions {
        max_tokens: provider.summary_max_tokens(),
        temperature: SUMMARY_TEMPERATURE,
    };

    match provider.complete(&prompt, options).await {
        Ok(raw) if raw.trim().is_empty() => SummaryResult::failed(name, format!("Empty response from {}", name)),
        Ok(raw) => {
            let parsed = parse_summary_response(&raw);
            if !parsed.structured {
                tracing::warn!("{} returned unstructured summary for {}, using fallback parse", name, url);
            }
            SummaryResult {
                short_summary: parsed.short_summary,
                long_summary: parsed.long_summary,
                tags: parsed.tags,
                category: parsed.category,
                provider: name.to_string(),
                confidence: parsed.confidence,
                quality_score: None,
                quality_issues: None,
                suggested_action: None,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!("{} summarization failed for {}: {}", name, url, e);
            SummaryResult::failed(name, e.to_string())
        }
    }
}

/// Ask a provider whether text is adequate, falling back to the length heuristic
pub async fn assess_sufficiency_with<P: SummaryProvider + ?Sized>(
    provider: &P,
    text: &str,
    url: &str,
    title: Option<&str>,
) -> SufficiencyResult {
    if !provider.is_configured() || text.trim().is_empty() {
        return heuristic_sufficiency(text);
    }

    let prompt = build_sufficiency_prompt(text, url, title);
    let options = CompletionOptions {
        max_tokens: SUFFICIENCY_MAX_TOKENS,
        temperature: SUFFICIENCY_TEMPERATURE,
    };

    match provider.complete(&prompt, options).await {
        Ok(raw) => parse_sufficiency_response(&raw).unwrap_or_else(|| {
            tracing::debug!("Unparsable sufficiency reply from {}, using heuristic", provider.name());
            heuristic_sufficiency(text)
        }),
        Err(e) => {
            tracing::warn!("{} sufficiency check failed for {}: {}", provider.name(), url, e);
            heuristic_sufficiency(text)
        }
    }
}
