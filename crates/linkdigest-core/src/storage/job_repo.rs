use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::retry::{execute_with_retry, query_with_retry};
use super::Database;
use crate::queue::{Job, JobStore};
use crate::{Error, Result};

const JOB_COLUMNS: &str = "id, bookmark_id, provider, status, priority, attempts, max_attempts, error, retry_at, \
     created_at, updated_at, started_at, completed_at";

/// SQLite-backed summary job storage
#[derive(Clone)]
pub struct JobRepository {
    db: Database,
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    bookmark_id: String,
    provider: Option<String>,
    status: String,
    priority: i32,
    attempts: u32,
    max_attempts: u32,
    error: Option<String>,
    retry_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Other(format!("Bad id {}: {}", raw, e)))
}

impl TryFrom<JobRow> for Job {
    type Error = Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Job {
            id: parse_id(&row.id)?,
            bookmark_id: parse_id(&row.bookmark_id)?,
            provider: row.provider,
            status: row.status.parse()?,
            priority: row.priority,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            error: row.error,
            retry_at: row.retry_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

impl JobRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Jobs for one bookmark, newest first
    pub async fn find_by_bookmark(&self, bookmark_id: Uuid) -> Result<Vec<Job>> {
        let pool = self.db.pool().clone();
        let sql = format!(
            "SELECT {} FROM summary_jobs WHERE bookmark_id = ? ORDER BY created_at DESC",
            JOB_COLUMNS
        );
        let bookmark_id = bookmark_id.to_string();

        let rows: Vec<JobRow> = query_with_retry(|| {
            sqlx::query_as::<_, JobRow>(&sql).bind(&bookmark_id).fetch_all(&pool)
        })
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }
}

#[async_trait::async_trait]
impl JobStore for JobRepository {
    async fn create(&self, bookmark_id: Uuid, provider: Option<&str>, priority: i32, max_attempts: u32) -> Result<Job> {
        let job = Job::new(bookmark_id, provider, priority, max_attempts);
        let pool = self.db.pool().clone();

        execute_with_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO summary_jobs
                (id, bookmark_id, provider, status, priority, attempts, max_attempts, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(job.id.to_string())
            .bind(job.bookmark_id.to_string())
            .bind(&job.provider)
            .bind(job.status.as_str())
            .bind(job.priority)
            .bind(job.attempts)
            .bind(job.max_attempts)
            .bind(job.created_at)
            .bind(job.updated_at)
            .execute(&pool)
        })
        .await?;

        Ok(job)
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let pool = self.db.pool().clone();
        let id = job.id.to_string();

        let affected = execute_with_retry(|| {
            sqlx::query(
                r#"
                UPDATE summary_jobs
                SET provider = ?,
                    status = ?,
                    priority = ?,
                    attempts = ?,
                    max_attempts = ?,
                    error = ?,
                    retry_at = ?,
                    started_at = ?,
                    completed_at = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&job.provider)
            .bind(job.status.as_str())
            .bind(job.priority)
            .bind(job.attempts)
            .bind(job.max_attempts)
            .bind(&job.error)
            .bind(job.retry_at)
            .bind(job.started_at)
            .bind(job.completed_at)
            .bind(Utc::now())
            .bind(&id)
            .execute(&pool)
        })
        .await?;

        if affected == 0 {
            return Err(Error::JobNotFound(id));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let pool = self.db.pool().clone();
        let sql = format!("SELECT {} FROM summary_jobs WHERE id = ?", JOB_COLUMNS);
        let id = id.to_string();

        let row: Option<JobRow> = query_with_retry(|| {
            sqlx::query_as::<_, JobRow>(&sql).bind(&id).fetch_optional(&pool)
        })
        .await?;

        row.map(Job::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{Bookmark, JobStatus};
    use crate::storage::BookmarkRepository;

    async fn setup() -> (JobRepository, Uuid) {
        let db = Database::in_memory().await.unwrap();
        let bookmark = Bookmark::new("https://example.com/jobs", None, None);
        BookmarkRepository::new(db.clone()).insert(&bookmark).await.unwrap();
        (JobRepository::new(db), bookmark.id)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, bookmark_id) = setup().await;
        let job = repo.create(bookmark_id, Some("openai"), 7, 3).await.unwrap();

        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.bookmark_id, bookmark_id);
        assert_eq!(stored.provider.as_deref(), Some("openai"));
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.priority, 7);
        assert_eq!(stored.max_attempts, 3);
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_persists_retry_state() {
        let (repo, bookmark_id) = setup().await;
        let mut job = repo.create(bookmark_id, None, 0, 3).await.unwrap();

        job.status = JobStatus::Pending;
        job.attempts = 1;
        job.error = Some("timeout".to_string());
        job.retry_at = Some(Utc::now() + chrono::Duration::seconds(5));
        repo.update(&job).await.unwrap();

        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.error.as_deref(), Some("timeout"));
        assert!(stored.retry_at.is_some());
        assert_eq!(repo.find_by_bookmark(bookmark_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_job() {
        let (repo, bookmark_id) = setup().await;
        let ghost = Job::new(bookmark_id, None, 0, 1);
        assert!(matches!(repo.update(&ghost).await, Err(Error::JobNotFound(_))));
    }
}
