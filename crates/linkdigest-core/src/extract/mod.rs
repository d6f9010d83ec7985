mod extractor;
mod fetcher;
mod models;
mod parser;
mod spool;
mod tiers;

pub use extractor::{ContentExtractor, PageExtractor};
pub use fetcher::PageFetcher;
pub use models::{ExtractionDiagnostics, ExtractionMethod, ExtractionResult, PageContent, TierReport};
pub use parser::parse_page;
pub use tiers::{
    content_from_url, reader_variants, DiskStreamedTier, ExtractionTier, MobileAgentTier, ReaderModeTier,
};
