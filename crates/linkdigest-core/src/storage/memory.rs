use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::queue::{Bookmark, BookmarkStatus, BookmarkStore, Job, JobStore, SummaryRecord};
use crate::{Error, Result};

/// In-process bookmark and job store, for tests and embedding without SQLite
#[derive(Default)]
pub struct MemoryStore {
    bookmarks: RwLock<HashMap<Uuid, Bookmark>>,
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bookmark(&self, bookmark: Bookmark) -> Uuid {
        let id = bookmark.id;
        self.bookmarks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, bookmark);
        id
    }

    /// All bookmarks, oldest first
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        let mut bookmarks: Vec<Bookmark> = self
            .bookmarks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        bookmarks.sort_by_key(|b| b.created_at);
        bookmarks
    }

    /// All jobs, oldest first
    pub fn jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }
}

#[async_trait::async_trait]
impl BookmarkStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Bookmark>> {
        Ok(self
            .bookmarks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn set_status(&self, id: Uuid, status: BookmarkStatus) -> Result<()> {
        let mut bookmarks = self.bookmarks.write().unwrap_or_else(|e| e.into_inner());
        let bookmark = bookmarks
            .get_mut(&id)
            .ok_or_else(|| Error::BookmarkNotFound(id.to_string()))?;
        bookmark.status = status;
        bookmark.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_summary(&self, id: Uuid, record: &SummaryRecord) -> Result<()> {
        let mut bookmarks = self.bookmarks.write().unwrap_or_else(|e| e.into_inner());
        let bookmark = bookmarks
            .get_mut(&id)
            .ok_or_else(|| Error::BookmarkNotFound(id.to_string()))?;
        bookmark.apply(record);
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, bookmark_id: Uuid, provider: Option<&str>, priority: i32, max_attempts: u32) -> Result<Job> {
        let job = Job::new(bookmark_id, provider, priority, max_attempts);
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(job)
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let stored = jobs
            .get_mut(&job.id)
            .ok_or_else(|| Error::JobNotFound(job.id.to_string()))?;
        *stored = job.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().unwrap_or_else(|e| e.into_inner()).get(&id).cloned())
    }
}
