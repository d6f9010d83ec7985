pub mod providers;
mod prompt;
mod summarizer;

pub use prompt::{heuristic_sufficiency, normalize_tags, parse_summary_response, ParsedSummary, DEFAULT_MAX_INPUT_CHARS};
pub use providers::{
    CompletionOptions, FetchAction, ModelInfo, ProviderKind, SufficiencyResult, SummaryProvider, SummaryResult,
};
pub use summarizer::Summarizer;
