use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Problems a summary can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ErrorAcknowledgment,
    GenericContent,
    ScaffoldingOnly,
    ShortSummary,
    ShortLongSummary,
    LowConfidence,
    AccessBlocked,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::ErrorAcknowledgment => "error_acknowledgment",
            IssueKind::GenericContent => "generic_content",
            IssueKind::ScaffoldingOnly => "scaffolding_only",
            IssueKind::ShortSummary => "short_summary",
            IssueKind::ShortLongSummary => "short_long_summary",
            IssueKind::LowConfidence => "low_confidence",
            IssueKind::AccessBlocked => "access_blocked",
        }
    }

    /// Deducted from the score once per assessment, however many rules fire
    pub fn penalty(&self) -> f64 {
        match self {
            IssueKind::ErrorAcknowledgment => 0.8,
            IssueKind::GenericContent => 0.4,
            IssueKind::ScaffoldingOnly => 0.6,
            IssueKind::ShortSummary => 0.2,
            IssueKind::ShortLongSummary => 0.2,
            IssueKind::LowConfidence => 0.3,
            IssueKind::AccessBlocked => 0.7,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::ErrorAcknowledgment | IssueKind::ScaffoldingOnly | IssueKind::AccessBlocked => Severity::High,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// Which text a rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    /// Short and long summary
    Summaries,
    /// Extracted page text
    SourceText,
}

/// A set of case-insensitive patterns that flag one issue kind
#[derive(Debug, Clone)]
pub struct QualityRule {
    pub kind: IssueKind,
    pub target: RuleTarget,
    pub description: String,
    patterns: Vec<Regex>,
    min_matches: usize,
    max_source_chars: Option<usize>,
}

impl QualityRule {
    /// Compile a rule; fires when one pattern matches
    pub fn new(kind: IssueKind, target: RuleTarget, description: &str, patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::Config(format!("Invalid quality pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind,
            target,
            description: description.to_string(),
            patterns,
            min_matches: 1,
            max_source_chars: None,
        })
    }

    /// Require this many distinct patterns to match
    pub fn with_min_matches(mut self, min_matches: usize) -> Self {
        self.min_matches = min_matches.max(1);
        self
    }

    /// Ignore texts longer than this; chrome words inside a real article are expected
    pub fn with_max_source_chars(mut self, max_chars: usize) -> Self {
        self.max_source_chars = Some(max_chars);
        self
    }

    /// Number of distinct patterns found in `text`
    pub fn match_count(&self, text: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(text)).count()
    }

    pub fn matches(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if let Some(max) = self.max_source_chars {
            if text.chars().count() > max {
                return false;
            }
        }
        self.match_count(text) >= self.min_matches
    }
}

struct RuleSpec {
    kind: IssueKind,
    target: RuleTarget,
    description: &'static str,
    min_matches: usize,
    max_source_chars: Option<usize>,
    patterns: &'static [&'static str],
}

const BUILTIN_RULES: &[RuleSpec] = &[
    RuleSpec {
        kind: IssueKind::ErrorAcknowledgment,
        target: RuleTarget::Summaries,
        description: "Summary apologizes or refuses instead of describing the page",
        min_matches: 1,
        max_source_chars: None,
        patterns: &[
            r"\bI(?: apologi[sz]e| am sorry|['’]m sorry)\b",
            r"\bI(?: cannot| can['’]t| can not| am unable to|['’]m unable to| was unable to| could not| couldn['’]t) (?:access|analy[sz]e|summari[sz]e|read|view|open|process|provide|determine)",
            r"\bunable to (?:access|analy[sz]e|summari[sz]e|retrieve|read) (?:the|this)\b",
            r"\bas an AI\b",
            r"\b(?:no|insufficient|not enough) (?:actual |meaningful |substantive )?content (?:was |is )?(?:provided|available|to (?:analy[sz]e|summari[sz]e))",
            r"\bthe (?:provided )?(?:text|content) (?:appears to be|is) (?:empty|missing|incomplete)\b",
        ],
    },
    RuleSpec {
        kind: IssueKind::GenericContent,
        target: RuleTarget::Summaries,
        description: "Summary uses placeholder phrasing with no page specifics",
        min_matches: 1,
        max_source_chars: None,
        patterns: &[
            r"\bthis (?:web ?page|page|website|site|article|document|link) (?:is about|contains|provides|discusses|covers) (?:various|some|general|miscellaneous)\b",
            r"\b(?:lorem ipsum|placeholder text)\b",
            r"\bno specific (?:details|information)\b",
            r"\bgeneral information about\b",
            r"\bvarious (?:topics|subjects|things)\b",
        ],
    },
    RuleSpec {
        kind: IssueKind::ScaffoldingOnly,
        target: RuleTarget::SourceText,
        description: "Extracted text is page chrome rather than content",
        min_matches: 3,
        max_source_chars: Some(1500),
        patterns: &[
            r"\b(?:accept|manage|reject) (?:all )?cookies\b|\bcookie (?:policy|settings|preferences|consent)\b",
            r"\bsign (?:in|up)\b|\blog ?in\b|\bcreate an account\b",
            r"\bsubscribe\b|\bnewsletter\b",
            r"\bprivacy policy\b|\bterms of (?:service|use)\b",
            r"\bskip to (?:main )?content\b",
            r"\bmain menu\b|\bnavigation\b|\bsite map\b",
            r"\bshare (?:on|this)\b|\bfollow us\b",
            r"\ball rights reserved\b|©",
            r"\benable javascript\b|\bjavascript (?:is )?(?:required|disabled)\b",
        ],
    },
    RuleSpec {
        kind: IssueKind::ScaffoldingOnly,
        target: RuleTarget::Summaries,
        description: "Summary describes page chrome rather than content",
        min_matches: 1,
        max_source_chars: None,
        patterns: &[
            r"\b(?:only|mostly|primarily|mainly) (?:contains?|consists? of|shows?|includes?) (?:navigation|menus?|cookie|headers?|footers?|links|boilerplate)",
            r"\bno (?:main|article|actual|substantive) content\b",
            r"\bcookie (?:consent|banner|notice)\b",
            r"\bnavigation (?:menus?|links|elements) and\b",
        ],
    },
    RuleSpec {
        kind: IssueKind::AccessBlocked,
        target: RuleTarget::Summaries,
        description: "Summary reports a login wall, paywall or block page",
        min_matches: 1,
        max_source_chars: None,
        patterns: &[
            r"\bpaywall\b",
            r"\b(?:requires?|required) (?:a |an )?(?:login|log-in|sign[- ]in|subscription|account|authentication)\b",
            r"\baccess (?:is |was )?(?:denied|restricted|forbidden|blocked)\b",
            r"\b(?:403|401) (?:forbidden|unauthori[sz]ed)\b",
            r"\bcaptcha\b|\bverify (?:you are|you're|that you are) (?:a )?human\b",
        ],
    },
    RuleSpec {
        kind: IssueKind::AccessBlocked,
        target: RuleTarget::SourceText,
        description: "Extracted text is a login wall, paywall or block page",
        min_matches: 1,
        max_source_chars: Some(2000),
        patterns: &[
            r"\bsubscribe (?:now )?to (?:continue|keep) reading\b",
            r"\b(?:please )?(?:log|sign) in to (?:continue|view|read|access)\b",
            r"\baccess denied\b|\b403 forbidden\b",
            r"\bverify (?:you are|you're|that you are) (?:a )?human\b|\bcaptcha\b",
            r"\bchecking your browser\b",
        ],
    },
];

/// The stock rule table
pub fn builtin_rules() -> Vec<QualityRule> {
    BUILTIN_RULES
        .iter()
        .filter_map(|spec| {
            let rule = QualityRule::new(spec.kind, spec.target, spec.description, spec.patterns)
                .map(|rule| rule.with_min_matches(spec.min_matches));
            match (rule, spec.max_source_chars) {
                (Ok(rule), Some(max)) => Some(rule.with_max_source_chars(max)),
                (Ok(rule), None) => Some(rule),
                (Err(e), _) => {
                    tracing::error!("Skipping quality rule {}: {}", spec.kind, e);
                    None
                }
            }
        })
        .collect()
}
