use anyhow::Result;
use linkdigest_core::extract::ContentExtractor;
use linkdigest_core::AppConfig;

const PREVIEW_CHARS: usize = 600;

pub async fn run(config: &AppConfig, url: &str) -> Result<()> {
    let extractor = ContentExtractor::new(&config.extractor)?;
    let result = extractor.extract(url).await;

    if let Some(error) = &result.error {
        println!("Extraction failed: {}", error);
        return Ok(());
    }

    println!("{}", result.title);
    println!("  method:   {}", result.method);
    println!(
        "  attempts: {} in {} ms ({} bytes read{})",
        result.diagnostics.attempts,
        result.diagnostics.elapsed_ms,
        result.diagnostics.source_bytes,
        if result.diagnostics.truncated { ", page cut at byte budget" } else { "" }
    );
    if !result.diagnostics.failed_methods.is_empty() {
        let failed: Vec<&str> = result.diagnostics.failed_methods.iter().map(|m| m.as_str()).collect();
        println!("  skipped:  {}", failed.join(", "));
    }
    if let Some(description) = &result.description {
        println!("  summary:  {}", description);
    }

    println!();
    let preview: String = result.text_content.chars().take(PREVIEW_CHARS).collect();
    println!("{}", preview);
    if result.text_content.chars().count() > PREVIEW_CHARS {
        println!("... ({} chars total)", result.text_content.chars().count());
    }

    Ok(())
}
