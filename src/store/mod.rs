// Vector storage module
// Persists one embedded record per document in LanceDB

pub mod vector_store;

pub use vector_store::{SearchResult, VectorStore};

use serde::{Deserialize, Serialize};

/// The persisted unit: one embedded document keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    /// Unique identifier, the upsert key
    pub id: String,
    /// The embedding vector; length must match the store's fixed dimension
    pub vector: Vec<f32>,
    pub title: String,
    pub filename: String,
    pub filetype: String,
    /// Full extracted text of the document
    pub content: String,
    /// RFC3339 timestamp of ingestion
    pub created_at: String,
}

/// A stored document row read back from the table, without its vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub filetype: String,
    pub content: String,
    pub created_at: String,
}
