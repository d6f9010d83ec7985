use anyhow::{Context, Result};
use linkdigest_core::queue::JobStore;
use linkdigest_core::storage::{Database, JobRepository};

use super::parse_id;

pub async fn run(db: &Database, job_id: &str) -> Result<()> {
    let id = parse_id(job_id)?;
    let job = JobRepository::new(db.clone())
        .get(id)
        .await?
        .with_context(|| format!("Job not found: {}", id))?;

    println!("Job {}", job.id);
    println!("  bookmark: {}", job.bookmark_id);
    println!("  provider: {}", job.provider.as_deref().unwrap_or("-"));
    println!("  status:   {}", job.status);
    println!("  priority: {}", job.priority);
    println!("  attempts: {}/{}", job.attempts, job.max_attempts);
    if let Some(error) = &job.error {
        println!("  error:    {}", error);
    }
    if let Some(retry_at) = job.retry_at {
        if !job.status.is_terminal() {
            println!("  retry at: {}", retry_at.format("%Y-%m-%d %H:%M:%S"));
        }
    }
    if let Some(completed) = job.completed_at {
        println!("  finished: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}
