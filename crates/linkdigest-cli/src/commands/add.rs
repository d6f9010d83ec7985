use anyhow::{bail, Result};
use linkdigest_core::queue::Bookmark;
use linkdigest_core::storage::{BookmarkRepository, Database};

pub async fn run(db: &Database, url: &str, title: Option<&str>, folder: Option<&str>) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        bail!("URL must not be empty");
    }

    let repo = BookmarkRepository::new(db.clone());

    if let Some(existing) = repo.find_by_url(url).await? {
        println!("Already saved: {} ({})", existing.id, existing.status);
        return Ok(());
    }

    let bookmark = Bookmark::new(url, title, folder);
    repo.insert(&bookmark).await?;

    println!("Saved {}", url);
    println!("  id: {}", bookmark.id);
    println!("Run 'linkdigest summarize {}' to summarize it.", bookmark.id);

    Ok(())
}
