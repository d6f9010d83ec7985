use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkdigest_core::{storage::Database, AppConfig};

mod commands;

#[derive(Parser)]
#[command(name = "linkdigest")]
#[command(author, version, about = "Summarize saved links with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Save a link as a pending bookmark
    Add {
        url: String,
        #[arg(short, long)]
        title: Option<String>,
        /// Folder path, e.g. "Reading/Rust"
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// List bookmarks with status and quality
    List {
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
    /// Show a bookmark in full
    Show { id: String },
    /// Queue bookmarks for summarization and wait for the results
    Summarize {
        /// Bookmark ids
        ids: Vec<String>,
        /// Also queue every pending bookmark
        #[arg(long)]
        pending: bool,
        /// Provider to use (claude, openai, gemini)
        #[arg(short, long)]
        provider: Option<String>,
        /// Higher runs first
        #[arg(long)]
        priority: Option<i32>,
    },
    /// Show a summary job
    Status { job_id: String },
    /// Run the content extractor on a URL
    Extract { url: String },
    /// Extract a URL and ask whether the text is worth summarizing
    Check {
        url: String,
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// List configured providers
    Providers {
        /// Check each provider's credentials against its API
        #[arg(long)]
        validate: bool,
    },
    /// List models available to a provider's API key
    Models { provider: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keys in .env count as environment overrides
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Add { url, title, folder } => {
            let db = Database::new(&config).await?;
            commands::add::run(&db, &url, title.as_deref(), folder.as_deref()).await
        }
        Commands::List { limit } => {
            let db = Database::new(&config).await?;
            commands::list::run(&db, limit).await
        }
        Commands::Show { id } => {
            let db = Database::new(&config).await?;
            commands::show::run(&db, &id).await
        }
        Commands::Summarize {
            ids,
            pending,
            provider,
            priority,
        } => {
            let db = Database::new(&config).await?;
            commands::summarize::run(&db, &config, &ids, pending, provider.as_deref(), priority).await
        }
        Commands::Status { job_id } => {
            let db = Database::new(&config).await?;
            commands::status::run(&db, &job_id).await
        }
        Commands::Extract { url } => commands::extract::run(&config, &url).await,
        Commands::Check { url, provider } => commands::check::run(&config, &url, provider.as_deref()).await,
        Commands::Providers { validate } => commands::providers::run(&config, validate).await,
        Commands::Models { provider } => commands::providers::models(&config, &provider).await,
    }
}
