// Ingestion pipeline
// Raw file bytes -> extracted text -> embedding -> stored record

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::Result;
use crate::embeddings::Embedder;
use crate::extract::{FileType, TextExtractor};
use crate::store::{DocumentRecord, StoredDocument, VectorStore};

/// A document as returned to callers after ingestion or listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub filename: String,
    pub filetype: String,
}

impl From<StoredDocument> for Document {
    #[inline]
    fn from(stored: StoredDocument) -> Self {
        Self {
            id: stored.id,
            title: stored.title,
            content: stored.content,
            filename: stored.filename,
            filetype: stored.filetype,
        }
    }
}

/// Turns uploaded files into stored, embedded records.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    store: Arc<Mutex<VectorStore>>,
}

impl Ingestor {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        store: Arc<Mutex<VectorStore>>,
    ) -> Self {
        Self {
            embedder,
            extractor,
            store,
        }
    }

    /// Ingest one file: extract its text, embed it, and upsert the record.
    ///
    /// The file type check and the embedding both happen before the store is
    /// touched, so a failure anywhere leaves the store unmodified.
    #[inline]
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> Result<Document> {
        let filetype = FileType::from_filename(filename)?;
        debug!("Ingesting {} as {}", filename, filetype);

        let content = self.extractor.extract(bytes, filetype)?;

        let id = Uuid::new_v4().to_string();
        let title = filename.to_string();

        let vector = self.embedder.embed(&content).await?;

        let record = DocumentRecord {
            id: id.clone(),
            vector,
            title: title.clone(),
            filename: filename.to_string(),
            filetype: filetype.as_str().to_string(),
            content: content.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.store.lock().await.add(record).await?;

        info!("Ingested document {} ({}, {} chars)", id, filename, content.len());

        Ok(Document {
            id,
            title,
            content,
            filename: filename.to_string(),
            filetype: filetype.as_str().to_string(),
        })
    }

    /// List all ingested documents
    #[inline]
    pub async fn list(&self) -> Result<Vec<Document>> {
        let documents = self.store.lock().await.get_all().await?;
        Ok(documents.into_iter().map(Document::from).collect())
    }
}
