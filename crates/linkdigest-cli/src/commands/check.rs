use anyhow::Result;
use linkdigest_core::ai::Summarizer;
use linkdigest_core::extract::ContentExtractor;
use linkdigest_core::AppConfig;

pub async fn run(config: &AppConfig, url: &str, provider: Option<&str>) -> Result<()> {
    let extractor = ContentExtractor::new(&config.extractor)?;
    let summarizer = Summarizer::new(&config.ai)?;

    let extraction = extractor.extract(url).await;
    if let Some(error) = &extraction.error {
        println!("Extraction failed: {}", error);
        return Ok(());
    }

    println!(
        "Extracted {} chars via {}",
        extraction.text_content.chars().count(),
        extraction.method
    );

    let verdict = summarizer
        .assess_content_sufficiency(provider, &extraction.text_content, url, Some(extraction.title.as_str()))
        .await;

    println!(
        "{} (confidence {:.2})",
        if verdict.sufficient { "Sufficient" } else { "Insufficient" },
        verdict.confidence
    );
    println!("  action: {}", verdict.suggested_action.as_str());
    println!("  reason: {}", verdict.reason);

    Ok(())
}
