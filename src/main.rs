use clap::{Parser, Subcommand};
use localrag::commands::{ask, ingest_file, list_documents, search_documents};
use localrag::config::{get_config_dir, run_interactive_config, show_config};
use localrag::generate;
use localrag::retrieve;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "localrag")]
#[command(about = "A local retrieval-augmented question answering pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure embedding and generation model connections
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a document file into the store
    Ingest {
        /// Path to the file (txt, md, or html)
        file: PathBuf,
    },
    /// List all ingested documents
    List,
    /// Search ingested documents by semantic similarity
    Search {
        /// The search query
        query: String,
        /// Maximum number of matches to return
        #[arg(long, default_value_t = retrieve::DEFAULT_TOP_K)]
        limit: usize,
    },
    /// Answer a question using the ingested documents as context
    Ask {
        /// The question to answer
        query: String,
        /// Number of documents to retrieve as context
        #[arg(long, default_value_t = generate::DEFAULT_TOP_K)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            let config_dir = get_config_dir()?;
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { file } => {
            ingest_file(&file).await?;
        }
        Commands::List => {
            list_documents().await?;
        }
        Commands::Search { query, limit } => {
            search_documents(&query, limit).await?;
        }
        Commands::Ask { query, limit } => {
            ask(&query, limit).await?;
        }
    }

    Ok(())
}
