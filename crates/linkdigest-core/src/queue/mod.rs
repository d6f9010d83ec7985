//! Summary jobs: models, persistence seams and the single-worker orchestrator.

mod models;
mod orchestrator;
mod store;

pub use models::{Bookmark, BookmarkStatus, Job, JobStatus, SummaryRecord};
pub use orchestrator::{Orchestrator, OrchestratorEvent};
pub use store::{BookmarkStore, JobStore};
