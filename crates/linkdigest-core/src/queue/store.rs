use uuid::Uuid;

use super::models::{Bookmark, BookmarkStatus, Job, SummaryRecord};
use crate::Result;

/// Bookmark persistence used by the orchestrator
#[async_trait::async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Bookmark>>;

    async fn set_status(&self, id: Uuid, status: BookmarkStatus) -> Result<()>;

    /// Write every summary field and the `analyzed` status in one update
    async fn apply_summary(&self, id: Uuid, record: &SummaryRecord) -> Result<()>;
}

/// Job persistence used by the orchestrator
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, bookmark_id: Uuid, provider: Option<&str>, priority: i32, max_attempts: u32) -> Result<Job>;

    async fn update(&self, job: &Job) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>>;
}
