use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ai::SummaryResult;
use crate::extract::{ExtractionMethod, ExtractionResult};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkStatus {
    Pending,
    Processing,
    Analyzed,
    Failed,
}

impl BookmarkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkStatus::Pending => "pending",
            BookmarkStatus::Processing => "processing",
            BookmarkStatus::Analyzed => "analyzed",
            BookmarkStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BookmarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookmarkStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookmarkStatus::Pending),
            "processing" => Ok(BookmarkStatus::Processing),
            "analyzed" => Ok(BookmarkStatus::Analyzed),
            "failed" => Ok(BookmarkStatus::Failed),
            other => Err(Error::Other(format!("Unknown bookmark status: {}", other))),
        }
    }
}

/// A saved link and the analysis written back to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub folder: Option<String>,
    pub status: BookmarkStatus,
    pub short_summary: Option<String>,
    pub long_summary: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub provider: Option<String>,
    pub quality_score: Option<f64>,
    pub quality_issues: Vec<String>,
    pub extracted_content: Option<String>,
    pub extraction_method: Option<ExtractionMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(url: &str, title: Option<&str>, folder: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.trim().to_string(),
            title: title.map(str::to_string),
            folder: folder.map(str::to_string),
            status: BookmarkStatus::Pending,
            short_summary: None,
            long_summary: None,
            tags: Vec::new(),
            category: None,
            provider: None,
            quality_score: None,
            quality_issues: Vec::new(),
            extracted_content: None,
            extraction_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Write the whole summary group and mark the bookmark analyzed
    pub fn apply(&mut self, record: &SummaryRecord) {
        self.short_summary = Some(record.short_summary.clone());
        self.long_summary = Some(record.long_summary.clone());
        self.tags = record.tags.clone();
        self.category = Some(record.category.clone());
        self.provider = Some(record.provider.clone());
        self.quality_score = record.quality_score;
        self.quality_issues = record.quality_issues.clone();
        self.extracted_content = Some(record.extracted_content.clone());
        self.extraction_method = Some(record.extraction_method);
        self.status = BookmarkStatus::Analyzed;
        self.updated_at = Utc::now();
    }
}

/// Fields written to a bookmark in one step when a job completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub short_summary: String,
    pub long_summary: String,
    pub tags: Vec<String>,
    pub category: String,
    pub provider: String,
    pub quality_score: Option<f64>,
    pub quality_issues: Vec<String>,
    pub extracted_content: String,
    pub extraction_method: ExtractionMethod,
}

impl SummaryRecord {
    pub fn new(summary: &SummaryResult, extraction: &ExtractionResult) -> Self {
        Self {
            short_summary: summary.short_summary.clone(),
            long_summary: summary.long_summary.clone(),
            tags: summary.tags.clone(),
            category: summary.category.clone(),
            provider: summary.provider.clone(),
            quality_score: summary.quality_score,
            quality_issues: summary.quality_issues.clone().unwrap_or_default(),
            extracted_content: extraction.text_content.clone(),
            extraction_method: extraction.method,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Other(format!("Unknown job status: {}", other))),
        }
    }
}

/// One summarization request for one bookmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub bookmark_id: Uuid,
    pub provider: Option<String>,
    pub status: JobStatus,
    pub priority: i32,
    pub attempts: u32,
    pub max_attempts: u32,
    pub error: Option<String>,
    /// Not dispatched before this instant
    pub retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(bookmark_id: Uuid, provider: Option<&str>, priority: i32, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bookmark_id,
            provider: provider.map(str::to_string),
            status: JobStatus::Pending,
            priority,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            error: None,
            retry_at: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionDiagnostics;

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("done".parse::<JobStatus>().is_err());
        assert_eq!("analyzed".parse::<BookmarkStatus>().unwrap(), BookmarkStatus::Analyzed);
    }

    #[test]
    fn test_job_attempts() {
        let mut job = Job::new(Uuid::new_v4(), Some("claude"), 0, 0);
        assert_eq!(job.max_attempts, 1);
        assert!(job.has_attempts_left());
        job.attempts = 1;
        assert!(!job.has_attempts_left());
    }

    #[test]
    fn test_apply_writes_whole_group() {
        let mut bookmark = Bookmark::new("https://example.com", None, Some("Reading"));
        let summary = SummaryResult {
            short_summary: "Short".to_string(),
            long_summary: "Long".to_string(),
            tags: vec!["a".to_string()],
            category: "Reference".to_string(),
            provider: "openai".to_string(),
            confidence: 0.8,
            quality_score: Some(0.6),
            quality_issues: Some(vec!["Short summary is 5 chars (minimum 20)".to_string()]),
            suggested_action: None,
            error: None,
        };
        let extraction = ExtractionResult {
            url: "https://example.com/".to_string(),
            title: "Example".to_string(),
            text_content: "Body text".to_string(),
            description: None,
            method: ExtractionMethod::MobileAgent,
            diagnostics: ExtractionDiagnostics::default(),
            error: None,
        };

        bookmark.apply(&SummaryRecord::new(&summary, &extraction));

        assert_eq!(bookmark.status, BookmarkStatus::Analyzed);
        assert_eq!(bookmark.short_summary.as_deref(), Some("Short"));
        assert_eq!(bookmark.category.as_deref(), Some("Reference"));
        assert_eq!(bookmark.provider.as_deref(), Some("openai"));
        assert_eq!(bookmark.quality_score, Some(0.6));
        assert_eq!(bookmark.quality_issues.len(), 1);
        assert_eq!(bookmark.extracted_content.as_deref(), Some("Body text"));
        assert_eq!(bookmark.extraction_method, Some(ExtractionMethod::MobileAgent));
    }
}
