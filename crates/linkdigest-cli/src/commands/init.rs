use anyhow::Result;
use linkdigest_core::AppConfig;

/// Write a default config file. Keys from the environment are never written.
pub fn run(force: bool) -> Result<()> {
    let path = AppConfig::config_path();

    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to replace it with defaults.");
        return Ok(());
    }

    let config = AppConfig::default();
    config.save()?;
    println!("Wrote {}", path.display());
    println!("Database: {}", config.database_path().display());

    Ok(())
}
