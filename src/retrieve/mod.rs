// Retrieval pipeline
// Query string -> embedding -> ranked nearest-neighbor matches


use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::embeddings::Embedder;
use crate::store::VectorStore;
use crate::{RagError, Result};

pub const DEFAULT_TOP_K: usize = 5;

/// One ranked retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub title: String,
    pub content: String,
    pub filename: String,
    pub filetype: String,
    /// Similarity score, higher is better
    pub score: f32,
}

/// Turns a query string into a ranked list of matching documents.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<Mutex<VectorStore>>,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<Mutex<VectorStore>>) -> Self {
        Self { embedder, store }
    }

    /// Search for the `top_k` documents most similar to `query`.
    ///
    /// An empty or whitespace-only query fails with
    /// [`RagError::InvalidQuery`]. Results keep the store's ranking, best
    /// match first; no re-sorting happens here.
    #[inline]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchMatch>> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidQuery(
                "Query must not be empty".to_string(),
            ));
        }

        let query_vector = self.embedder.embed(query).await?;

        let results = self.store.lock().await.query(&query_vector, top_k).await?;
        debug!("Query matched {} documents", results.len());

        Ok(results
            .into_iter()
            .map(|result| {
                let title = if result.document.title.is_empty() {
                    result.document.filename.clone()
                } else {
                    result.document.title
                };
                SearchMatch {
                    title,
                    content: result.document.content,
                    filename: result.document.filename,
                    filetype: result.document.filetype,
                    score: result.similarity_score,
                }
            })
            .collect())
    }
}
