use anyhow::{bail, Result};
use linkdigest_core::ai::{ProviderKind, Summarizer};
use linkdigest_core::AppConfig;

pub async fn run(config: &AppConfig, validate: bool) -> Result<()> {
    let summarizer = Summarizer::new(&config.ai)?;
    let configured = summarizer.configured_providers();

    if configured.is_empty() {
        println!("No providers configured.");
        println!("Set an API key in the config file or via ANTHROPIC_API_KEY, OPENAI_API_KEY or GEMINI_API_KEY.");
        return Ok(());
    }

    for name in configured {
        let model = config.ai.provider(&name).map(|p| p.model.as_str()).unwrap_or("-");

        if validate {
            let status = match summarizer.validate_provider(&name).await {
                Ok(true) => "ok".to_string(),
                Ok(false) => "rejected".to_string(),
                Err(e) => format!("error: {}", e),
            };
            println!("{:<8} {:<32} {}", name, model, status);
        } else {
            println!("{:<8} {}", name, model);
        }
    }

    Ok(())
}

pub async fn models(config: &AppConfig, provider: &str) -> Result<()> {
    let kind: ProviderKind = provider.parse()?;
    let settings = config.ai.provider(kind.as_str());

    let Some(api_key) = settings.and_then(|p| p.api_key()) else {
        bail!("No API key configured for {}", kind.as_str());
    };
    let base_url = settings.and_then(|p| p.base_url.as_deref());

    let models = kind.list_models(api_key, base_url).await?;
    if models.is_empty() {
        println!("{} returned no models.", kind.as_str());
        return Ok(());
    }

    for model in models {
        match model.display_name {
            Some(display) if display != model.id => println!("{:<40} {}", model.id, display),
            _ => println!("{}", model.id),
        }
    }

    Ok(())
}
