use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{BookmarkStatus, Job, JobStatus, SummaryRecord};
use super::store::{BookmarkStore, JobStore};
use crate::ai::Summarizer;
use crate::config::{ProviderConfig, QueueConfig};
use crate::extract::PageExtractor;
use crate::quality::SuggestedAction;
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 256;

/// Job lifecycle notifications
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    JobQueued { job_id: Uuid, bookmark_id: Uuid },
    JobStarted { job_id: Uuid, attempt: u32 },
    JobCompleted {
        job_id: Uuid,
        quality_score: Option<f64>,
        suggested_action: Option<SuggestedAction>,
    },
    JobRetrying { job_id: Uuid, attempt: u32, error: String },
    JobFailed { job_id: Uuid, error: String },
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    job_id: Uuid,
    priority: i32,
    not_before: Option<Instant>,
}

/// Pending entries, highest priority first, FIFO within a priority
#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<QueueEntry>,
    worker_active: bool,
}

enum Next {
    Ready(QueueEntry),
    WaitUntil(Instant),
    Drained,
}

impl QueueState {
    fn push(&mut self, entry: QueueEntry) {
        let pos = self.entries.partition_point(|e| e.priority >= entry.priority);
        self.entries.insert(pos, entry);
    }

    fn next(&mut self, now: Instant) -> Next {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.not_before.map_or(true, |at| at <= now))
        {
            return Next::Ready(self.entries.remove(pos));
        }

        match self.entries.iter().filter_map(|e| e.not_before).min() {
            Some(at) => Next::WaitUntil(at),
            None => Next::Drained,
        }
    }
}

struct Inner {
    summarizer: Arc<Summarizer>,
    extractor: Arc<dyn PageExtractor>,
    bookmarks: Arc<dyn BookmarkStore>,
    jobs: Arc<dyn JobStore>,
    config: QueueConfig,
    queue: Mutex<QueueState>,
    idle_tx: watch::Sender<bool>,
    event_tx: broadcast::Sender<OrchestratorEvent>,
}

/// Owns the summary job queue and its single worker
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        summarizer: Arc<Summarizer>,
        extractor: Arc<dyn PageExtractor>,
        bookmarks: Arc<dyn BookmarkStore>,
        jobs: Arc<dyn JobStore>,
        config: QueueConfig,
    ) -> Self {
        let (idle_tx, _) = watch::channel(true);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                summarizer,
                extractor,
                bookmarks,
                jobs,
                config,
                queue: Mutex::new(QueueState::default()),
                idle_tx,
                event_tx,
            }),
        }
    }

    /// Subscribe to job lifecycle events
    pub fn events(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Queue a bookmark for summarization at the default priority
    pub async fn submit(&self, bookmark_id: Uuid, provider: Option<&str>) -> Result<Uuid> {
        self.submit_with_priority(bookmark_id, provider, self.inner.config.default_priority)
            .await
    }

    /// Queue a bookmark; higher priorities run first
    pub async fn submit_with_priority(&self, bookmark_id: Uuid, provider: Option<&str>, priority: i32) -> Result<Uuid> {
        let provider = self.inner.summarizer.select_provider(provider)?;

        if self.inner.bookmarks.get(bookmark_id).await?.is_none() {
            return Err(Error::BookmarkNotFound(bookmark_id.to_string()));
        }

        let job = self
            .inner
            .jobs
            .create(bookmark_id, Some(provider.name()), priority, self.inner.config.max_attempts)
            .await?;

        info!(
            "Queued job {} for bookmark {} (provider {}, priority {})",
            job.id,
            bookmark_id,
            provider.name(),
            priority
        );
        self.inner.send_event(OrchestratorEvent::JobQueued {
            job_id: job.id,
            bookmark_id,
        });
        Inner::enqueue(&self.inner, job.id, priority, None);

        Ok(job.id)
    }

    pub async fn job_status(&self, job_id: Uuid) -> Result<Option<Job>> {
        self.inner.jobs.get(job_id).await
    }

    pub fn configured_providers(&self) -> Vec<String> {
        self.inner.summarizer.configured_providers()
    }

    /// Activate a provider after checking its credentials against the backend
    pub async fn configure_provider(&self, config: &ProviderConfig) -> Result<bool> {
        self.inner.summarizer.configure_provider(config).await
    }

    pub async fn validate_provider(&self, name: &str) -> Result<bool> {
        self.inner.summarizer.validate_provider(name).await
    }

    /// Number of jobs waiting to run
    pub fn queued(&self) -> usize {
        self.inner.lock_queue().entries.len()
    }

    /// Resolve once the queue is drained and the worker has exited
    pub async fn wait_for_idle(&self) {
        let mut idle = self.inner.idle_tx.subscribe();
        // The sender lives in `inner`, so this only errors if it was dropped
        let _ = idle.wait_for(|idle| *idle).await;
    }
}

impl Inner {
    fn lock_queue(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn send_event(&self, event: OrchestratorEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn enqueue(inner: &Arc<Inner>, job_id: Uuid, priority: i32, not_before: Option<Instant>) {
        let spawn_worker = {
            let mut queue = inner.lock_queue();
            queue.push(QueueEntry {
                job_id,
                priority,
                not_before,
            });
            if queue.worker_active {
                false
            } else {
                queue.worker_active = true;
                inner.idle_tx.send_replace(false);
                true
            }
        };

        if spawn_worker {
            debug!("Starting queue worker");
            let inner = Arc::clone(inner);
            tokio::spawn(async move { inner.run_worker().await });
        }
    }

    async fn run_worker(self: Arc<Self>) {
        let delay = Duration::from_millis(self.config.request_delay_ms);

        loop {
            let next = self.lock_queue().next(Instant::now());
            let entry = match next {
                Next::Ready(entry) => entry,
                Next::WaitUntil(at) => {
                    debug!("Next job not due yet, sleeping");
                    tokio::time::sleep_until(at).await;
                    continue;
                }
                Next::Drained => {
                    let mut queue = self.lock_queue();
                    // A submit may have raced in since `next` was taken
                    if !queue.entries.is_empty() {
                        continue;
                    }
                    queue.worker_active = false;
                    self.idle_tx.send_replace(true);
                    debug!("Queue drained, worker exiting");
                    return;
                }
            };

            // A panicking collaborator must not take the worker down with it
            if let Err(e) = tokio::spawn(Arc::clone(&self).process(entry)).await {
                error!("Job {} aborted the worker step: {}", entry.job_id, e);
            }

            let more = !self.lock_queue().entries.is_empty();
            if more && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn process(self: Arc<Self>, entry: QueueEntry) {
        let mut job = match self.jobs.get(entry.job_id).await {
            Ok(Some(job)) if !job.status.is_terminal() => job,
            Ok(Some(job)) => {
                debug!("Skipping job {} already {}", job.id, job.status);
                return;
            }
            Ok(None) => {
                warn!("Queued job {} no longer exists", entry.job_id);
                return;
            }
            Err(e) => {
                error!("Failed to load job {}: {}", entry.job_id, e);
                return;
            }
        };

        job.status = JobStatus::Processing;
        job.attempts += 1;
        job.started_at = Some(Utc::now());
        job.retry_at = None;
        if let Err(e) = self.jobs.update(&job).await {
            error!("Failed to mark job {} processing: {}", job.id, e);
        }
        info!("Processing job {} (attempt {}/{})", job.id, job.attempts, job.max_attempts);
        self.send_event(OrchestratorEvent::JobStarted {
            job_id: job.id,
            attempt: job.attempts,
        });

        let attempt = {
            let inner = Arc::clone(&self);
            let job = job.clone();
            tokio::spawn(async move { inner.run_job(&job).await })
        };
        let outcome = match attempt.await {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::Other(format!("Job attempt aborted: {}", e))),
        };

        match outcome {
            Ok((quality_score, suggested_action)) => {
                job.status = JobStatus::Completed;
                job.error = None;
                job.completed_at = Some(Utc::now());
                if let Err(e) = self.jobs.update(&job).await {
                    error!("Failed to mark job {} completed: {}", job.id, e);
                }
                info!("Job {} completed", job.id);
                self.send_event(OrchestratorEvent::JobCompleted {
                    job_id: job.id,
                    quality_score,
                    suggested_action,
                });
            }
            Err(e) => self.record_failure(job, e.to_string()).await,
        }
    }

    /// Extract, summarize and write back; returns the quality verdict
    async fn run_job(&self, job: &Job) -> Result<(Option<f64>, Option<SuggestedAction>)> {
        let bookmark = self
            .bookmarks
            .get(job.bookmark_id)
            .await?
            .ok_or_else(|| Error::BookmarkNotFound(job.bookmark_id.to_string()))?;

        self.bookmarks
            .set_status(bookmark.id, BookmarkStatus::Processing)
            .await?;

        let extraction = self.extractor.extract(&bookmark.url).await;
        if let Some(err) = extraction.error {
            return Err(Error::Extraction(err));
        }
        debug!(
            "Extracted {} chars from {} via {}",
            extraction.text_content.chars().count(),
            bookmark.url,
            extraction.method
        );

        let title = bookmark
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&extraction.title);

        let summary = self
            .summarizer
            .summarize(job.provider.as_deref(), &extraction.text_content, &extraction.url, Some(title))
            .await?;
        if let Some(err) = summary.error {
            return Err(Error::AiProvider(err));
        }

        let record = SummaryRecord::new(&summary, &extraction);
        self.bookmarks.apply_summary(bookmark.id, &record).await?;

        Ok((summary.quality_score, summary.suggested_action))
    }

    async fn record_failure(self: Arc<Self>, mut job: Job, message: String) {
        job.error = Some(message.clone());

        if job.has_attempts_left() {
            let delay = Duration::from_secs(self.config.retry_delay_secs);
            job.status = JobStatus::Pending;
            job.retry_at = chrono::Duration::from_std(delay).ok().map(|d| Utc::now() + d);
            if let Err(e) = self.jobs.update(&job).await {
                error!("Failed to schedule retry for job {}: {}", job.id, e);
            }
            if let Err(e) = self.bookmarks.set_status(job.bookmark_id, BookmarkStatus::Pending).await {
                warn!("Failed to reset bookmark {}: {}", job.bookmark_id, e);
            }

            warn!(
                "Job {} attempt {}/{} failed, retrying in {:?}: {}",
                job.id, job.attempts, job.max_attempts, delay, message
            );
            self.send_event(OrchestratorEvent::JobRetrying {
                job_id: job.id,
                attempt: job.attempts,
                error: message,
            });
            Inner::enqueue(&self, job.id, job.priority, Some(Instant::now() + delay));
        } else {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            if let Err(e) = self.jobs.update(&job).await {
                error!("Failed to mark job {} failed: {}", job.id, e);
            }
            if let Err(e) = self.bookmarks.set_status(job.bookmark_id, BookmarkStatus::Failed).await {
                error!("Failed to mark bookmark {} failed: {}", job.bookmark_id, e);
            }

            error!("Job {} failed after {} attempt(s): {}", job.id, job.attempts, message);
            self.send_event(OrchestratorEvent::JobFailed {
                job_id: job.id,
                error: message,
            });
        }
    }
}
