use super::*;
use crate::config::{Config, LlamaConfig, OllamaConfig};
use tempfile::TempDir;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        ollama: OllamaConfig {
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        llama: LlamaConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };
    (config, temp_dir)
}

fn test_record(id: &str, content: &str, vector: Vec<f32>) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        vector,
        title: format!("Title for {id}"),
        filename: format!("{id}.txt"),
        filetype: "text".to_string(),
        content: content.to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn vector_store_initialization() {
    let (config, _temp_dir) = create_test_config();

    let store = VectorStore::new(&config)
        .await
        .expect("should initialize VectorStore");
    assert_eq!(store.table_name, "documents");
    assert_eq!(store.dimension, 4);
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn store_and_count() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .add(test_record("doc-1", "first", vec![0.1, 0.2, 0.3, 0.4]))
        .await
        .expect("should store record");
    store
        .add(test_record("doc-2", "second", vec![0.4, 0.3, 0.2, 0.1]))
        .await
        .expect("should store record");

    assert_eq!(store.count().await.expect("should count"), 2);
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .add(test_record("doc-1", "original", vec![0.1, 0.2, 0.3, 0.4]))
        .await
        .expect("should store record");
    store
        .add(test_record("doc-1", "replaced", vec![0.5, 0.6, 0.7, 0.8]))
        .await
        .expect("should replace record");

    assert_eq!(store.count().await.expect("should count"), 1);

    let documents = store.get_all().await.expect("should list documents");
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, "doc-1");
    assert_eq!(documents[0].content, "replaced");
}

#[tokio::test]
async fn dimension_mismatch_on_add() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let err = store
        .add(test_record("doc-1", "bad", vec![0.1, 0.2, 0.3]))
        .await
        .expect_err("3-dim vector must fail a 4-dim store");
    assert!(matches!(
        err,
        crate::RagError::DimensionMismatch {
            expected: 4,
            actual: 3
        }
    ));
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn dimension_mismatch_on_query() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let err = store
        .query(&[0.1, 0.2], 5)
        .await
        .expect_err("2-dim query must fail a 4-dim store");
    assert!(matches!(err, crate::RagError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn query_empty_store_returns_empty() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let results = store
        .query(&[0.1, 0.2, 0.3, 0.4], 5)
        .await
        .expect("empty store query must not error");
    assert!(results.is_empty());
}

#[tokio::test]
async fn query_returns_best_match_first() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .add(test_record("near", "near", vec![1.0, 0.0, 0.0, 0.0]))
        .await
        .expect("should store record");
    store
        .add(test_record("far", "far", vec![0.0, 0.0, 0.0, 1.0]))
        .await
        .expect("should store record");

    let results = store
        .query(&[0.9, 0.1, 0.0, 0.0], 2)
        .await
        .expect("should query");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document.id, "near");
    assert_eq!(results[1].document.id, "far");
    assert!(results[0].distance <= results[1].distance);
    assert!(results[0].similarity_score >= results[1].similarity_score);
}

#[tokio::test]
async fn query_returns_fewer_than_limit() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .add(test_record("only", "only", vec![1.0, 0.0, 0.0, 0.0]))
        .await
        .expect("should store record");

    let results = store
        .query(&[1.0, 0.0, 0.0, 0.0], 10)
        .await
        .expect("should query");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn query_with_zero_limit() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .add(test_record("doc-1", "content", vec![1.0, 0.0, 0.0, 0.0]))
        .await
        .expect("should store record");

    let results = store
        .query(&[1.0, 0.0, 0.0, 0.0], 0)
        .await
        .expect("zero limit should succeed");
    assert!(results.is_empty());
}

#[tokio::test]
async fn reopen_preserves_records() {
    let (config, _temp_dir) = create_test_config();

    {
        let mut store = VectorStore::new(&config)
            .await
            .expect("should create vector store");
        store
            .add(test_record("doc-1", "persisted", vec![0.1, 0.2, 0.3, 0.4]))
            .await
            .expect("should store record");
    }

    let store = VectorStore::new(&config)
        .await
        .expect("should reopen vector store");
    assert_eq!(store.count().await.expect("should count"), 1);
}
