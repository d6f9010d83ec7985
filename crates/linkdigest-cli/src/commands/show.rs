use anyhow::{Context, Result};
use linkdigest_core::storage::{BookmarkRepository, Database, JobRepository};

use super::parse_id;

pub async fn run(db: &Database, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let bookmark = BookmarkRepository::new(db.clone())
        .find_by_id(id)
        .await?
        .with_context(|| format!("Bookmark not found: {}", id))?;

    println!("{}", bookmark.title.as_deref().unwrap_or(&bookmark.url));
    println!("  url:      {}", bookmark.url);
    if let Some(folder) = &bookmark.folder {
        println!("  folder:   {}", folder);
    }
    println!("  status:   {}", bookmark.status);
    println!("  saved:    {}", bookmark.created_at.format("%Y-%m-%d %H:%M"));

    if let Some(short) = &bookmark.short_summary {
        println!();
        println!("{}", short);
    }
    if let Some(long) = &bookmark.long_summary {
        println!();
        println!("{}", long);
    }

    if !bookmark.tags.is_empty() || bookmark.category.is_some() {
        println!();
        if let Some(category) = &bookmark.category {
            println!("  category: {}", category);
        }
        if !bookmark.tags.is_empty() {
            println!("  tags:     {}", bookmark.tags.join(", "));
        }
    }

    if let Some(provider) = &bookmark.provider {
        println!("  provider: {}", provider);
    }
    if let Some(method) = bookmark.extraction_method {
        println!("  source:   {}", method);
    }
    if let Some(score) = bookmark.quality_score {
        println!("  quality:  {:.2}", score);
        for issue in &bookmark.quality_issues {
            println!("    - {}", issue);
        }
    }

    let jobs = JobRepository::new(db.clone()).find_by_bookmark(id).await?;
    if let Some(latest) = jobs.first() {
        println!();
        println!(
            "Last job {} is {} after {} attempt(s)",
            latest.id, latest.status, latest.attempts
        );
        if let Some(error) = &latest.error {
            println!("  error: {}", error);
        }
    }

    Ok(())
}
