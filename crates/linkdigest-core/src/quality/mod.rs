//! Heuristic scoring of provider summaries.
//!
//! Failures here are signals for the caller (`SuggestedAction`), never errors.

mod assessor;
mod rules;

pub use assessor::{suggest_action, QualityAssessment, QualityAssessor, QualityIssue, QualityThresholds, SuggestedAction};
pub use rules::{builtin_rules, IssueKind, QualityRule, RuleTarget, Severity};
