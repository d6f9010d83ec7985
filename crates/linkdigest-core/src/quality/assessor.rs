use serde::{Deserialize, Serialize};

use super::rules::{builtin_rules, IssueKind, QualityRule, RuleTarget, Severity};
use crate::ai::SummaryResult;

/// What the caller should do with a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Accept,
    RetryDifferentScraping,
    UseMetadataOnly,
    MarkAsFailed,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedAction::Accept => "accept",
            SuggestedAction::RetryDifferentScraping => "retry_different_scraping",
            SuggestedAction::UseMetadataOnly => "use_metadata_only",
            SuggestedAction::MarkAsFailed => "mark_as_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// 0.0 to 1.0, two decimals
    pub score: f64,
    pub issues: Vec<QualityIssue>,
    pub suggested_action: SuggestedAction,
    pub confidence: f64,
}

impl QualityAssessment {
    pub fn is_high_quality(&self) -> bool {
        self.score >= 0.7 && self.issues.is_empty()
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    pub fn issue_descriptions(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.description.clone()).collect()
    }
}

/// Length and confidence floors for the non-pattern checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub min_short_summary_chars: usize,
    pub min_long_summary_chars: usize,
    pub min_confidence: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_short_summary_chars: 20,
            min_long_summary_chars: 80,
            min_confidence: 0.5,
        }
    }
}

/// Scores summaries against a rule table. Stateless between calls.
#[derive(Debug, Clone)]
pub struct QualityAssessor {
    rules: Vec<QualityRule>,
    thresholds: QualityThresholds,
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityAssessor {
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
            thresholds: QualityThresholds::default(),
        }
    }

    pub fn with_rule(mut self, rule: QualityRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_thresholds(mut self, thresholds: QualityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn assess(&self, result: &SummaryResult, original_text: &str, url: &str) -> QualityAssessment {
        let mut issues: Vec<QualityIssue> = Vec::new();
        let mut flag = |kind: IssueKind, description: String| {
            if !issues.iter().any(|i| i.kind == kind) {
                issues.push(QualityIssue {
                    kind,
                    severity: kind.severity(),
                    description,
                });
            }
        };

        let summaries = format!("{}\n{}", result.short_summary, result.long_summary);

        for rule in &self.rules {
            let text = match rule.target {
                RuleTarget::Summaries => summaries.as_str(),
                RuleTarget::SourceText => original_text,
            };
            if rule.matches(text) {
                flag(rule.kind, rule.description.clone());
            }
        }

        if echoes_url(result, url) {
            flag(IssueKind::GenericContent, "Summary only repeats the URL".to_string());
        }

        let short_len = result.short_summary.trim().chars().count();
        if short_len < self.thresholds.min_short_summary_chars {
            flag(
                IssueKind::ShortSummary,
                format!(
                    "Short summary is {} chars (minimum {})",
                    short_len, self.thresholds.min_short_summary_chars
                ),
            );
        }

        let long_len = result.long_summary.trim().chars().count();
        if long_len < self.thresholds.min_long_summary_chars {
            flag(
                IssueKind::ShortLongSummary,
                format!(
                    "Long summary is {} chars (minimum {})",
                    long_len, self.thresholds.min_long_summary_chars
                ),
            );
        }

        if result.confidence < self.thresholds.min_confidence {
            flag(
                IssueKind::LowConfidence,
                format!("Provider confidence {:.2} is below {:.2}", result.confidence, self.thresholds.min_confidence),
            );
        }

        let penalty: f64 = issues.iter().map(|i| i.kind.penalty()).sum();
        let score = round2((1.0 - penalty).max(0.0));

        let confidence = if issues.iter().any(|i| i.severity == Severity::High) {
            0.9
        } else if !issues.is_empty() {
            0.7
        } else {
            0.8
        };

        QualityAssessment {
            score,
            suggested_action: suggest_action(score, &issues),
            issues,
            confidence,
        }
    }
}

/// Action precedence: hard failures first, then score bands
pub fn suggest_action(score: f64, issues: &[QualityIssue]) -> SuggestedAction {
    let has = |kind: IssueKind| issues.iter().any(|i| i.kind == kind);

    if has(IssueKind::ErrorAcknowledgment) || has(IssueKind::AccessBlocked) || has(IssueKind::ScaffoldingOnly) {
        SuggestedAction::RetryDifferentScraping
    } else if score < 0.3 {
        SuggestedAction::MarkAsFailed
    } else if score < 0.6 {
        SuggestedAction::UseMetadataOnly
    } else {
        SuggestedAction::Accept
    }
}

fn echoes_url(result: &SummaryResult, url: &str) -> bool {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return false;
    }
    [&result.short_summary, &result.long_summary]
        .iter()
        .any(|s| s.trim().trim_end_matches('/').eq_ignore_ascii_case(url))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "The city council approved a new budget on Tuesday that expands bus service \
        to the northern suburbs and funds two new libraries over the next three years.";

    fn summary(short: &str, long: &str, confidence: f64) -> SummaryResult {
        SummaryResult {
            short_summary: short.to_string(),
            long_summary: long.to_string(),
            tags: vec!["local".to_string()],
            category: "News".to_string(),
            provider: "claude".to_string(),
            confidence,
            ..SummaryResult::default()
        }
    }

    fn good_summary() -> SummaryResult {
        summary(
            "City council passes budget expanding northern bus routes.",
            "The council approved a three-year budget that extends bus service to the northern \
             suburbs and pays for two new public libraries.",
            0.85,
        )
    }

    #[test]
    fn test_clean_summary_is_accepted() {
        let assessment = QualityAssessor::new().assess(&good_summary(), ARTICLE, "https://news.example.com/budget");

        assert_eq!(assessment.score, 1.0);
        assert!(assessment.issues.is_empty());
        assert_eq!(assessment.suggested_action, SuggestedAction::Accept);
        assert_eq!(assessment.confidence, 0.8);
        assert!(assessment.is_high_quality());
    }

    #[test]
    fn test_apology_is_error_acknowledgment() {
        let result = summary("Unable to summarize", "I apologize, I cannot analyze this content", 0.8);
        let assessment = QualityAssessor::new().assess(&result, ARTICLE, "https://example.com");

        assert!(assessment.has_issue(IssueKind::ErrorAcknowledgment));
        let issue = assessment
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::ErrorAcknowledgment)
            .unwrap();
        assert_eq!(issue.severity, Severity::High);
        assert!(assessment.score <= 0.2);
        assert_eq!(assessment.suggested_action, SuggestedAction::RetryDifferentScraping);
        assert_eq!(assessment.confidence, 0.9);
    }

    #[test]
    fn test_contracted_apologies_are_flagged() {
        let assessor = QualityAssessor::new();
        for long in [
            "I'm sorry, but this page could not be summarized in any meaningful way for you today.",
            "I’m sorry, but this page could not be summarized in any meaningful way for you today.",
            "I'm unable to access the page, so there is nothing meaningful to report about it here.",
            "I can’t access this page, so there is nothing meaningful to report about it here at all.",
        ] {
            let result = summary("A short note about the requested page.", long, 0.8);
            let assessment = assessor.assess(&result, ARTICLE, "https://example.com");

            assert!(assessment.has_issue(IssueKind::ErrorAcknowledgment), "not flagged: {}", long);
            assert_eq!(assessment.suggested_action, SuggestedAction::RetryDifferentScraping);
        }
    }

    #[test]
    fn test_assess_is_deterministic() {
        let assessor = QualityAssessor::new();
        let result = summary("Short", "This page contains various topics.", 0.4);

        let first = assessor.assess(&result, ARTICLE, "https://example.com/x");
        for _ in 0..5 {
            assert_eq!(assessor.assess(&result, ARTICLE, "https://example.com/x"), first);
        }
    }

    #[test]
    fn test_each_kind_penalized_once() {
        // Both the source text and the summary report a block page
        let result = summary(
            "Access denied by the publisher site today.",
            "The page requires a subscription and sits behind a paywall, so access is denied for this article.",
            0.9,
        );
        let assessment = QualityAssessor::new().assess(&result, "Subscribe to continue reading. Access denied.", "https://example.com");

        let blocked = assessment
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::AccessBlocked)
            .count();
        assert_eq!(blocked, 1);
        assert_eq!(assessment.score, 0.3);
        assert_eq!(assessment.suggested_action, SuggestedAction::RetryDifferentScraping);
    }

    #[test]
    fn test_scaffolding_source_text() {
        let chrome = "Skip to content. Main menu. Sign in. Subscribe to our newsletter. \
                      Privacy Policy. Terms of Use. Accept all cookies.";
        let assessment = QualityAssessor::new().assess(&good_summary(), chrome, "https://example.com");

        assert!(assessment.has_issue(IssueKind::ScaffoldingOnly));
        assert_eq!(assessment.score, 0.4);
        assert_eq!(assessment.suggested_action, SuggestedAction::RetryDifferentScraping);
    }

    #[test]
    fn test_length_and_confidence_checks() {
        let result = summary("Budget news", "Council passed a budget.", 0.4);
        let assessment = QualityAssessor::new().assess(&result, ARTICLE, "https://example.com");

        assert!(assessment.has_issue(IssueKind::ShortSummary));
        assert!(assessment.has_issue(IssueKind::ShortLongSummary));
        assert!(assessment.has_issue(IssueKind::LowConfidence));
        assert_eq!(assessment.score, 0.3);
        assert_eq!(assessment.suggested_action, SuggestedAction::UseMetadataOnly);
        assert_eq!(assessment.confidence, 0.7);
        assert!(!assessment.is_high_quality());
    }

    #[test]
    fn test_url_echo_is_generic() {
        let mut result = good_summary();
        result.short_summary = "https://example.com/post/".to_string();
        let assessment = QualityAssessor::new().assess(&result, ARTICLE, "https://example.com/post");

        assert!(assessment.has_issue(IssueKind::GenericContent));
    }

    #[test]
    fn test_score_boundary_at_point_three() {
        assert_eq!(suggest_action(0.29, &[]), SuggestedAction::MarkAsFailed);
        assert_eq!(suggest_action(0.3, &[]), SuggestedAction::UseMetadataOnly);
        assert_eq!(suggest_action(0.59, &[]), SuggestedAction::UseMetadataOnly);
        assert_eq!(suggest_action(0.6, &[]), SuggestedAction::Accept);
    }

    #[test]
    fn test_custom_rule_extends_table() {
        let rule = QualityRule::new(
            IssueKind::GenericContent,
            RuleTarget::Summaries,
            "Mentions the test marker",
            &[r"\bzebra-marker\b"],
        )
        .unwrap();
        let mut result = good_summary();
        result.long_summary.push_str(" zebra-marker");

        let assessment = QualityAssessor::new().with_rule(rule).assess(&result, ARTICLE, "https://example.com");
        assert!(assessment.has_issue(IssueKind::GenericContent));
        assert_eq!(assessment.score, 0.6);
    }
}
