use std::sync::Arc;

use anyhow::{bail, Result};
use linkdigest_core::ai::Summarizer;
use linkdigest_core::extract::ContentExtractor;
use linkdigest_core::quality::SuggestedAction;
use linkdigest_core::queue::{BookmarkStatus, JobStatus, Orchestrator, OrchestratorEvent};
use linkdigest_core::storage::{BookmarkRepository, Database, JobRepository};
use linkdigest_core::AppConfig;
use uuid::Uuid;

use super::parse_id;

pub async fn run(
    db: &Database,
    config: &AppConfig,
    ids: &[String],
    pending: bool,
    provider: Option<&str>,
    priority: Option<i32>,
) -> Result<()> {
    let bookmarks = BookmarkRepository::new(db.clone());

    let mut targets: Vec<Uuid> = ids.iter().map(|id| parse_id(id)).collect::<Result<_>>()?;
    if pending {
        for bookmark in bookmarks.find_by_status(BookmarkStatus::Pending).await? {
            if !targets.contains(&bookmark.id) {
                targets.push(bookmark.id);
            }
        }
    }

    if targets.is_empty() {
        bail!("Nothing to summarize: pass bookmark ids or --pending");
    }

    let summarizer = Arc::new(Summarizer::new(&config.ai)?);
    let extractor = Arc::new(ContentExtractor::new(&config.extractor)?);
    let orchestrator = Orchestrator::new(
        summarizer,
        extractor,
        Arc::new(bookmarks),
        Arc::new(JobRepository::new(db.clone())),
        config.queue.clone(),
    );

    let mut events = orchestrator.events();
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                OrchestratorEvent::JobStarted { job_id, attempt } => {
                    tracing::debug!("Job {} started (attempt {})", job_id, attempt);
                }
                OrchestratorEvent::JobRetrying { job_id, attempt, error } => {
                    println!("  job {} attempt {} failed, will retry: {}", job_id, attempt, error);
                }
                OrchestratorEvent::JobCompleted {
                    job_id,
                    quality_score,
                    suggested_action: Some(action),
                } if action != SuggestedAction::Accept => {
                    println!(
                        "  job {} done with quality {:.2}, assessor suggests {}",
                        job_id,
                        quality_score.unwrap_or(0.0),
                        action.as_str()
                    );
                }
                _ => {}
            }
        }
    });

    let priority = priority.unwrap_or(config.queue.default_priority);
    let mut submitted = Vec::with_capacity(targets.len());
    for bookmark_id in targets {
        match orchestrator.submit_with_priority(bookmark_id, provider, priority).await {
            Ok(job_id) => submitted.push((bookmark_id, job_id)),
            Err(e) => println!("Skipping {}: {}", bookmark_id, e),
        }
    }

    if submitted.is_empty() {
        reporter.abort();
        bail!("No jobs were queued");
    }

    println!("Summarizing {} bookmark(s)...", submitted.len());
    orchestrator.wait_for_idle().await;
    reporter.abort();

    let mut completed = 0;
    for (bookmark_id, job_id) in &submitted {
        let Some(job) = orchestrator.job_status(*job_id).await? else {
            continue;
        };

        match job.status {
            JobStatus::Completed => {
                completed += 1;
                println!("  done   {}", bookmark_id);
            }
            status => println!(
                "  {:<6} {} ({})",
                status.as_str(),
                bookmark_id,
                job.error.as_deref().unwrap_or("no error recorded")
            ),
        }
    }

    println!("{}/{} summarized.", completed, submitted.len());
    Ok(())
}
