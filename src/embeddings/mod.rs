// Embeddings module
// Maps text to fixed-dimension vectors via the configured Ollama model

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;
use async_trait::async_trait;

/// Maps text to a fixed-dimension vector.
///
/// Implementations must be deterministic for a fixed model version and must
/// preserve input order in [`Embedder::embed_batch`]. Handles are constructed
/// once at startup and shared across the pipeline.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Fails with [`crate::RagError::Embedding`] for
    /// empty input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed one or more texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The fixed dimension every returned vector has.
    fn dimension(&self) -> usize;
}
