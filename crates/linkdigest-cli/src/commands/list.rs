use anyhow::Result;
use linkdigest_core::storage::{BookmarkRepository, Database};

pub async fn run(db: &Database, limit: u32) -> Result<()> {
    let repo = BookmarkRepository::new(db.clone());
    let bookmarks = repo.list(limit).await?;

    if bookmarks.is_empty() {
        println!("No bookmarks saved.");
        println!("Use 'linkdigest add <url>' to save one.");
        return Ok(());
    }

    println!("{:<36}  {:<10}  {:<14}  {:>7}  URL", "ID", "STATUS", "CATEGORY", "QUALITY");
    println!("{}", "-".repeat(106));

    for bookmark in bookmarks {
        let quality = bookmark
            .quality_score
            .map(|q| format!("{:.2}", q))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<36}  {:<10}  {:<14}  {:>7}  {}",
            bookmark.id,
            bookmark.status.as_str(),
            bookmark.category.as_deref().unwrap_or("-"),
            quality,
            bookmark.url
        );
        if let Some(short) = &bookmark.short_summary {
            println!("{:<36}  {}", "", short);
        }
    }

    Ok(())
}
