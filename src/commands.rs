use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Config, get_config_dir};
use crate::embeddings::ollama::OllamaClient;
use crate::extract::PlainTextExtractor;
use crate::generate::Generator;
use crate::ingest::Ingestor;
use crate::llm::LlamaClient;
use crate::retrieve::Retriever;
use crate::store::VectorStore;

/// Everything the CLI commands need, wired from the saved configuration
struct Pipeline {
    config: Config,
    ingestor: Ingestor,
    retriever: Retriever,
}

impl Pipeline {
    async fn build() -> Result<Self> {
        let config_dir = get_config_dir()?;
        let config = Config::load(&config_dir).context("Failed to load configuration")?;

        let store = VectorStore::new(&config)
            .await
            .context("Failed to open vector store")?;
        let store = Arc::new(Mutex::new(store));

        let embedder =
            Arc::new(OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?);

        let ingestor = Ingestor::new(
            Arc::clone(&embedder) as _,
            Arc::new(PlainTextExtractor),
            Arc::clone(&store),
        );
        let retriever = Retriever::new(embedder, store);

        Ok(Self {
            config,
            ingestor,
            retriever,
        })
    }
}

/// Ingest a single file into the document store
#[inline]
pub async fn ingest_file(path: &Path) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid file path: {}", path.display()))?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    info!("Ingesting {} ({} bytes)", filename, bytes.len());

    let pipeline = Pipeline::build().await?;
    let document = pipeline.ingestor.ingest(&bytes, filename).await?;

    println!("Ingested document: {} (ID: {})", document.filename, document.id);
    println!("  Type: {}", document.filetype);
    println!("  Extracted: {} chars", document.content.len());

    Ok(())
}

/// List all ingested documents
#[inline]
pub async fn list_documents() -> Result<()> {
    let pipeline = Pipeline::build().await?;
    let documents = pipeline.ingestor.list().await?;

    if documents.is_empty() {
        println!("No documents have been ingested yet.");
        println!("Use 'localrag ingest <file>' to add one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();

    for document in &documents {
        println!("{} (ID: {})", document.title, document.id);
        println!("  File: {} ({})", document.filename, document.filetype);
        println!("  Length: {} chars", document.content.len());
        println!();
    }

    Ok(())
}

/// Search the document store and print ranked matches
#[inline]
pub async fn search_documents(query: &str, limit: usize) -> Result<()> {
    let pipeline = Pipeline::build().await?;
    let matches = pipeline.retriever.search(query, limit).await?;

    if matches.is_empty() {
        println!("No matching documents found.");
        return Ok(());
    }

    println!("Top {} matches:", matches.len());
    println!();

    for (rank, result) in matches.iter().enumerate() {
        println!(
            "{}. {} (score: {:.3})",
            rank + 1,
            result.title,
            result.score
        );
        println!("   File: {} ({})", result.filename, result.filetype);

        let preview: String = result.content.chars().take(200).collect();
        if result.content.chars().count() > 200 {
            println!("   {preview}...");
        } else {
            println!("   {preview}");
        }
        println!();
    }

    Ok(())
}

/// Answer a question from the ingested documents
#[inline]
pub async fn ask(query: &str, limit: usize) -> Result<()> {
    let pipeline = Pipeline::build().await?;

    let model =
        Arc::new(LlamaClient::new(&pipeline.config.llama).context("Failed to create model client")?);
    let generator = Generator::new(pipeline.retriever, model, &pipeline.config.llama);

    let answer = generator.ask(query, limit).await?;

    println!("{answer}");

    Ok(())
}
