use super::*;
use crate::RagError;
use crate::config::{Config, OllamaConfig};
use crate::extract::PlainTextExtractor;
use async_trait::async_trait;
use tempfile::TempDir;

/// Deterministic stand-in embedder: a normalized byte histogram, so equal
/// text always maps to the same 4-dim vector.
struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::Embedding("Input text is empty".to_string()));
        }
        let mut vector = vec![0.0f32; 4];
        for byte in text.bytes() {
            vector[byte as usize % 4] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        Ok(vector.into_iter().map(|v| v / norm).collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// Embedder that always fails, for exercising the no-partial-write path
struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(RagError::Embedding("model unavailable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        Err(RagError::Embedding("model unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        4
    }
}

async fn create_test_store() -> (Arc<Mutex<VectorStore>>, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        ollama: OllamaConfig {
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");
    (Arc::new(Mutex::new(store)), temp_dir)
}

fn create_ingestor(store: Arc<Mutex<VectorStore>>) -> Ingestor {
    Ingestor::new(
        Arc::new(FakeEmbedder),
        Arc::new(PlainTextExtractor),
        store,
    )
}

#[tokio::test]
async fn ingest_text_file() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = create_ingestor(Arc::clone(&store));

    let document = ingestor
        .ingest(b"The sky is blue.", "sky.txt")
        .await
        .expect("should ingest text file");

    assert!(!document.id.is_empty());
    assert_eq!(document.title, "sky.txt");
    assert_eq!(document.content, "The sky is blue.");
    assert_eq!(document.filename, "sky.txt");
    assert_eq!(document.filetype, "text");

    assert_eq!(store.lock().await.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn ingest_markdown_file() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = create_ingestor(Arc::clone(&store));

    let document = ingestor
        .ingest(b"# Weather\n\nThe sky is **blue**.\n", "weather.md")
        .await
        .expect("should ingest markdown file");

    assert_eq!(document.filetype, "markdown");
    assert!(document.content.contains("The sky is blue."));
    assert!(!document.content.contains('#'));
}

#[tokio::test]
async fn ingest_generates_unique_ids() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = create_ingestor(Arc::clone(&store));

    let first = ingestor
        .ingest(b"same bytes", "a.txt")
        .await
        .expect("should ingest");
    let second = ingestor
        .ingest(b"same bytes", "a.txt")
        .await
        .expect("should ingest");

    assert_ne!(first.id, second.id);
    assert_eq!(store.lock().await.count().await.expect("should count"), 2);
}

#[tokio::test]
async fn unsupported_file_type_fails_before_storing() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = create_ingestor(Arc::clone(&store));

    let err = ingestor
        .ingest(b"%PDF-1.4", "report.pdf")
        .await
        .expect_err("pdf must be rejected");
    assert!(matches!(err, RagError::UnsupportedFileType(_)));

    assert_eq!(store.lock().await.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn extraction_failure_leaves_store_untouched() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = create_ingestor(Arc::clone(&store));

    let err = ingestor
        .ingest(&[0xff, 0xfe], "broken.txt")
        .await
        .expect_err("invalid utf-8 must fail extraction");
    assert!(matches!(err, RagError::Extraction(_)));

    assert_eq!(store.lock().await.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn embedding_failure_leaves_store_untouched() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = Ingestor::new(
        Arc::new(FailingEmbedder),
        Arc::new(PlainTextExtractor),
        Arc::clone(&store),
    );

    let err = ingestor
        .ingest(b"some text", "doc.txt")
        .await
        .expect_err("embedding failure must propagate");
    assert!(matches!(err, RagError::Embedding(_)));

    assert_eq!(store.lock().await.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn list_returns_ingested_documents() {
    let (store, _temp_dir) = create_test_store().await;
    let ingestor = create_ingestor(Arc::clone(&store));

    assert!(ingestor.list().await.expect("should list").is_empty());

    ingestor
        .ingest(b"The sky is blue.", "sky.txt")
        .await
        .expect("should ingest");
    ingestor
        .ingest(b"Grass is green.", "grass.txt")
        .await
        .expect("should ingest");

    let documents = ingestor.list().await.expect("should list");
    assert_eq!(documents.len(), 2);

    let filenames: Vec<&str> = documents.iter().map(|d| d.filename.as_str()).collect();
    assert!(filenames.contains(&"sky.txt"));
    assert!(filenames.contains(&"grass.txt"));
}
