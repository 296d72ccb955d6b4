#[cfg(test)]
mod tests;

use super::{DocumentRecord, StoredDocument};
use crate::config::Config;
use crate::{RagError, Result};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Vector database store using LanceDB for similarity search.
///
/// The vector dimension is fixed at construction from configuration; every
/// stored and query vector must match it.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: StoredDocument,
    /// Higher is better; `1.0 - distance`
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the document table under the configured base directory.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config
            .vector_database_path()
            .map_err(|e| RagError::Config(format!("Failed to get vector database path: {e}")))?;
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Store(format!("Failed to create vector database directory: {e}"))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to connect to LanceDB: {e}")))?;

        let store = Self {
            connection,
            table_name: "documents".to_string(),
            dimension: config.ollama.embedding_dimension as usize,
        };

        store.initialize_table().await?;

        info!(
            "Vector store initialized with dimension {}",
            store.dimension
        );
        Ok(store)
    }

    /// Create the document table if it does not exist, otherwise verify that
    /// its vector column matches the configured dimension
    async fn initialize_table(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {e}")))?;

        if !table_names.contains(&self.table_name) {
            self.connection
                .create_empty_table(&self.table_name, self.schema())
                .execute()
                .await
                .map_err(|e| RagError::Store(format!("Failed to create table: {e}")))?;
            debug!("Created table {} ({} dims)", self.table_name, self.dimension);
            return Ok(());
        }

        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Store(format!("Failed to get table schema: {e}")))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    let existing = usize::try_from(*size).unwrap_or_default();
                    if existing != self.dimension {
                        return Err(RagError::DimensionMismatch {
                            expected: self.dimension,
                            actual: existing,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("title", DataType::Utf8, false),
            Field::new("filename", DataType::Utf8, false),
            Field::new("filetype", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open table: {e}")))
    }

    /// Upsert a record keyed by its `id`.
    ///
    /// Re-adding an existing id deterministically leaves the table holding
    /// exactly the last-applied record. Callers serialize access through a
    /// mutex, which makes the delete-then-insert pair atomic per id.
    #[inline]
    pub async fn add(&mut self, record: DocumentRecord) -> Result<()> {
        if record.vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: record.vector.len(),
            });
        }

        let table = self.open_table().await?;

        let predicate = format!("id = '{}'", record.id.replace('\'', "''"));
        table
            .delete(&predicate)
            .await
            .map_err(|e| RagError::Store(format!("Failed to delete existing record: {e}")))?;

        let record_batch = self.create_record_batch(&record)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to insert record: {e}")))?;

        debug!("Stored record {}", record.id);
        Ok(())
    }

    fn create_record_batch(&self, record: &DocumentRecord) -> Result<RecordBatch> {
        let values_array = Float32Array::from(record.vector.clone());
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| RagError::Store(format!("Failed to create vector array: {e}")))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(vec![record.id.as_str()])),
            Arc::new(vector_array),
            Arc::new(StringArray::from(vec![record.title.as_str()])),
            Arc::new(StringArray::from(vec![record.filename.as_str()])),
            Arc::new(StringArray::from(vec![record.filetype.as_str()])),
            Arc::new(StringArray::from(vec![record.content.as_str()])),
            Arc::new(StringArray::from(vec![record.created_at.as_str()])),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| RagError::Store(format!("Failed to create record batch: {e}")))
    }

    /// Return at most `limit` nearest records by vector similarity, best
    /// match first. An empty store yields an empty result, never an error.
    #[inline]
    pub async fn query(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if query_vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;
        let results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Store(format!("Failed to create vector search: {e}")))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute search: {e}")))?;

        let mut search_results = Vec::new();
        let mut stream = results;
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read result stream: {e}")))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        debug!("Found {} search results", search_results.len());
        Ok(search_results)
    }

    /// Total number of stored records
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }

    /// Full scan of all stored documents, for listing
    #[inline]
    pub async fn get_all(&self) -> Result<Vec<StoredDocument>> {
        let table = self.open_table().await?;
        let results = table
            .query()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to scan table: {e}")))?;

        let mut documents = Vec::new();
        let mut stream = results;
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read scan stream: {e}")))?
        {
            for row in 0..batch.num_rows() {
                documents.push(parse_document_row(&batch, row)?);
            }
        }

        Ok(documents)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Store(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Store(format!("Invalid {name} column type")))
}

fn parse_document_row(batch: &RecordBatch, row: usize) -> Result<StoredDocument> {
    Ok(StoredDocument {
        id: string_column(batch, "id")?.value(row).to_string(),
        title: string_column(batch, "title")?.value(row).to_string(),
        filename: string_column(batch, "filename")?.value(row).to_string(),
        filetype: string_column(batch, "filetype")?.value(row).to_string(),
        content: string_column(batch, "content")?.value(row).to_string(),
        created_at: string_column(batch, "created_at")?.value(row).to_string(),
    })
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let document = parse_document_row(batch, row)?;

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(SearchResult {
            document,
            similarity_score: 1.0 - distance,
            distance,
        });
    }

    Ok(results)
}
