use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::retry::{execute_with_retry, query_with_retry};
use super::Database;
use crate::extract::ExtractionMethod;
use crate::queue::{Bookmark, BookmarkStatus, BookmarkStore, SummaryRecord};
use crate::{Error, Result};

const BOOKMARK_COLUMNS: &str = "id, url, title, folder, status, short_summary, long_summary, tags, category, \
     provider, quality_score, quality_issues, extracted_content, extraction_method, created_at, updated_at";

/// SQLite-backed bookmark storage
#[derive(Clone)]
pub struct BookmarkRepository {
    db: Database,
}

#[derive(FromRow)]
struct BookmarkRow {
    id: String,
    url: String,
    title: Option<String>,
    folder: Option<String>,
    status: String,
    short_summary: Option<String>,
    long_summary: Option<String>,
    tags: String,
    category: Option<String>,
    provider: Option<String>,
    quality_score: Option<f64>,
    quality_issues: String,
    extracted_content: Option<String>,
    extraction_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookmarkRow> for Bookmark {
    type Error = Error;

    fn try_from(row: BookmarkRow) -> Result<Self> {
        Ok(Bookmark {
            id: Uuid::parse_str(&row.id).map_err(|e| Error::Other(format!("Bad bookmark id {}: {}", row.id, e)))?,
            url: row.url,
            title: row.title,
            folder: row.folder,
            status: row.status.parse()?,
            short_summary: row.short_summary,
            long_summary: row.long_summary,
            tags: serde_json::from_str(&row.tags)?,
            category: row.category,
            provider: row.provider,
            quality_score: row.quality_score,
            quality_issues: serde_json::from_str(&row.quality_issues)?,
            extracted_content: row.extracted_content,
            extraction_method: row
                .extraction_method
                .as_deref()
                .map(str::parse::<ExtractionMethod>)
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl BookmarkRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, bookmark: &Bookmark) -> Result<()> {
        let pool = self.db.pool().clone();
        let tags = serde_json::to_string(&bookmark.tags)?;
        let issues = serde_json::to_string(&bookmark.quality_issues)?;

        execute_with_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO bookmarks
                (id, url, title, folder, status, short_summary, long_summary, tags, category, provider,
                 quality_score, quality_issues, extracted_content, extraction_method, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(bookmark.id.to_string())
            .bind(&bookmark.url)
            .bind(&bookmark.title)
            .bind(&bookmark.folder)
            .bind(bookmark.status.as_str())
            .bind(&bookmark.short_summary)
            .bind(&bookmark.long_summary)
            .bind(&tags)
            .bind(&bookmark.category)
            .bind(&bookmark.provider)
            .bind(bookmark.quality_score)
            .bind(&issues)
            .bind(&bookmark.extracted_content)
            .bind(bookmark.extraction_method.map(|m| m.as_str()))
            .bind(bookmark.created_at)
            .bind(bookmark.updated_at)
            .execute(&pool)
        })
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Bookmark>> {
        let pool = self.db.pool().clone();
        let sql = format!("SELECT {} FROM bookmarks WHERE id = ?", BOOKMARK_COLUMNS);
        let id = id.to_string();

        let row: Option<BookmarkRow> = query_with_retry(|| {
            sqlx::query_as::<_, BookmarkRow>(&sql).bind(&id).fetch_optional(&pool)
        })
        .await?;

        row.map(Bookmark::try_from).transpose()
    }

    /// All bookmarks, newest first
    pub async fn list(&self, limit: u32) -> Result<Vec<Bookmark>> {
        let pool = self.db.pool().clone();
        let sql = format!(
            "SELECT {} FROM bookmarks ORDER BY created_at DESC LIMIT ?",
            BOOKMARK_COLUMNS
        );

        let rows: Vec<BookmarkRow> = query_with_retry(|| {
            sqlx::query_as::<_, BookmarkRow>(&sql).bind(limit).fetch_all(&pool)
        })
        .await?;

        rows.into_iter().map(Bookmark::try_from).collect()
    }

    /// Bookmarks in one status, oldest first
    pub async fn find_by_status(&self, status: BookmarkStatus) -> Result<Vec<Bookmark>> {
        let pool = self.db.pool().clone();
        let sql = format!(
            "SELECT {} FROM bookmarks WHERE status = ? ORDER BY created_at ASC",
            BOOKMARK_COLUMNS
        );

        let rows: Vec<BookmarkRow> = query_with_retry(|| {
            sqlx::query_as::<_, BookmarkRow>(&sql).bind(status.as_str()).fetch_all(&pool)
        })
        .await?;

        rows.into_iter().map(Bookmark::try_from).collect()
    }

    /// Find a bookmark by URL (ignoring surrounding whitespace)
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Bookmark>> {
        let pool = self.db.pool().clone();
        let sql = format!("SELECT {} FROM bookmarks WHERE url = ? LIMIT 1", BOOKMARK_COLUMNS);
        let url = url.trim().to_string();

        let row: Option<BookmarkRow> = query_with_retry(|| {
            sqlx::query_as::<_, BookmarkRow>(&sql).bind(&url).fetch_optional(&pool)
        })
        .await?;

        row.map(Bookmark::try_from).transpose()
    }
}

#[async_trait::async_trait]
impl BookmarkStore for BookmarkRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Bookmark>> {
        self.find_by_id(id).await
    }

    async fn set_status(&self, id: Uuid, status: BookmarkStatus) -> Result<()> {
        let pool = self.db.pool().clone();
        let id_str = id.to_string();

        let affected = execute_with_retry(|| {
            sqlx::query("UPDATE bookmarks SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now())
                .bind(&id_str)
                .execute(&pool)
        })
        .await?;

        if affected == 0 {
            return Err(Error::BookmarkNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn apply_summary(&self, id: Uuid, record: &SummaryRecord) -> Result<()> {
        let pool = self.db.pool().clone();
        let id_str = id.to_string();
        let tags = serde_json::to_string(&record.tags)?;
        let issues = serde_json::to_string(&record.quality_issues)?;

        // One statement, so the group lands together or not at all
        let affected = execute_with_retry(|| {
            sqlx::query(
                r#"
                UPDATE bookmarks
                SET short_summary = ?,
                    long_summary = ?,
                    tags = ?,
                    category = ?,
                    provider = ?,
                    quality_score = ?,
                    quality_issues = ?,
                    extracted_content = ?,
                    extraction_method = ?,
                    status = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&record.short_summary)
            .bind(&record.long_summary)
            .bind(&tags)
            .bind(&record.category)
            .bind(&record.provider)
            .bind(record.quality_score)
            .bind(&issues)
            .bind(&record.extracted_content)
            .bind(record.extraction_method.as_str())
            .bind(BookmarkStatus::Analyzed.as_str())
            .bind(Utc::now())
            .bind(&id_str)
            .execute(&pool)
        })
        .await?;

        if affected == 0 {
            return Err(Error::BookmarkNotFound(id.to_string()));
        }
        Ok(())
    }
}
