//! End-to-end tests: ingest an export, then search and inspect the catalog.

use crate::embeddings::providers::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::transform::tests::SAMPLE_PAGE;
use crate::{
    clean, config, ingest_with_provider, stats, CourseCatalog, EmbeddingConfig, FieldWeights,
    IngestOptions, MetadataFilter,
};
use advisor_core::config::RetrievalMode;
use advisor_core::{AppError, AppResult};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn workspace_with_export() -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("export");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("1.json"), SAMPLE_PAGE).unwrap();
    (temp, source)
}

/// Provider that fails every request, to exercise batch skipping.
#[derive(Debug)]
struct FailingProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        64
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Catalog("service unavailable".to_string()))
    }
}

/// Provider that answers the first request and fails the rest.
#[derive(Debug)]
struct FlakyProvider {
    inner: MockProvider,
    calls: AtomicUsize,
}

impl FlakyProvider {
    fn new() -> Self {
        Self {
            inner: MockProvider::new(64),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FlakyProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.embed_batch(texts).await
        } else {
            Err(AppError::Catalog("rate limited".to_string()))
        }
    }
}

#[tokio::test]
async fn test_ingest_stores_and_embeds_courses() {
    let (temp, source) = workspace_with_export();
    let provider = Arc::new(MockProvider::new(64));

    let result = ingest_with_provider(temp.path(), IngestOptions::new(&source), provider)
        .await
        .unwrap();

    assert_eq!(result.pages, 1);
    assert_eq!(result.courses, 2);
    assert_eq!(result.meeting_sections, 2);
    assert_eq!(result.embedded_courses, 2);
    assert_eq!(result.failed_batches, 0);

    let catalog_stats = stats(temp.path()).unwrap();
    assert_eq!(catalog_stats.courses, 2);
    assert_eq!(catalog_stats.embedded_courses, 2);
    assert!(catalog_stats.last_ingest_at.is_some());
    assert!(catalog_stats.db_size_bytes > 0);

    let saved = EmbeddingConfig::load(temp.path()).unwrap().unwrap();
    assert_eq!(saved.provider, "mock");
    assert_eq!(saved.dimensions, 64);
}

#[tokio::test]
async fn test_ingest_skips_failed_batches() {
    let (temp, source) = workspace_with_export();
    let options = IngestOptions {
        batch_size: 1,
        ..IngestOptions::new(&source)
    };

    let result = ingest_with_provider(temp.path(), options, Arc::new(FailingProvider))
        .await
        .unwrap();

    assert_eq!(result.courses, 2);
    assert_eq!(result.embedded_courses, 0);
    assert_eq!(result.failed_batches, 2);
}

#[tokio::test]
async fn test_batch_failing_partway_stores_no_vectors() {
    let (temp, source) = workspace_with_export();

    // One batch: the document field succeeds, the name field fails.
    let result = ingest_with_provider(
        temp.path(),
        IngestOptions::new(&source),
        Arc::new(FlakyProvider::new()),
    )
    .await
    .unwrap();

    assert_eq!(result.embedded_courses, 0);
    assert_eq!(result.failed_batches, 1);
    assert_eq!(stats(temp.path()).unwrap().embedded_courses, 0);

    let catalog = CourseCatalog::open(temp.path(), Arc::new(MockProvider::new(64))).unwrap();
    let results = catalog
        .search(
            "machine learning",
            RetrievalMode::Document,
            &FieldWeights::default(),
            None,
            5,
        )
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_ingest_rejects_mixed_dimensions_without_reset() {
    let (temp, source) = workspace_with_export();

    ingest_with_provider(
        temp.path(),
        IngestOptions::new(&source),
        Arc::new(MockProvider::new(64)),
    )
    .await
    .unwrap();

    let err = ingest_with_provider(
        temp.path(),
        IngestOptions::new(&source),
        Arc::new(MockProvider::new(32)),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("--reset"));

    let options = IngestOptions {
        reset: true,
        ..IngestOptions::new(&source)
    };
    let result = ingest_with_provider(temp.path(), options, Arc::new(MockProvider::new(32)))
        .await
        .unwrap();
    assert_eq!(result.embedded_courses, 2);
}

#[tokio::test]
async fn test_search_after_ingest() {
    let (temp, source) = workspace_with_export();
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(384));

    ingest_with_provider(temp.path(), IngestOptions::new(&source), provider.clone())
        .await
        .unwrap();

    let catalog = CourseCatalog::open(temp.path(), provider).unwrap();

    let results = catalog
        .search(
            "machine learning from empirical data",
            RetrievalMode::Document,
            &FieldWeights::default(),
            None,
            1,
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.course_code, "CSC311H1");
    assert_eq!(results[0].record.meeting_sections.len(), 1);

    let weighted = catalog
        .search(
            "machine learning",
            RetrievalMode::Weighted,
            &FieldWeights::default(),
            None,
            5,
        )
        .await
        .unwrap();
    assert_eq!(weighted.len(), 2);

    let filter = MetadataFilter::from_json_str(r#"{"campus": "Mississauga"}"#).unwrap();
    let filtered = catalog
        .search(
            "machine learning",
            RetrievalMode::Document,
            &FieldWeights::default(),
            Some(&filter),
            5,
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].record.course_code, "HIS101H5");
}

#[tokio::test]
async fn test_search_with_failing_embeddings_is_empty() {
    let conn = crate::index::init_in_memory().unwrap();
    let catalog = CourseCatalog::from_parts(conn, Arc::new(FailingProvider));

    let results = catalog
        .search(
            "anything",
            RetrievalMode::Document,
            &FieldWeights::default(),
            None,
            5,
        )
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_open_rejects_other_provider() {
    let (temp, source) = workspace_with_export();
    ingest_with_provider(
        temp.path(),
        IngestOptions::new(&source),
        Arc::new(MockProvider::new(64)),
    )
    .await
    .unwrap();

    let err = CourseCatalog::open(temp.path(), Arc::new(MockProvider::new(128))).unwrap_err();
    assert!(err.to_string().contains("Dimension mismatch"));
}

#[test]
fn test_stats_and_clean_require_index() {
    let temp = TempDir::new().unwrap();
    assert!(stats(temp.path()).is_err());
    assert!(clean(temp.path()).is_err());
    assert!(!config::get_index_path(temp.path()).exists());
}

#[tokio::test]
async fn test_clean_empties_catalog() {
    let (temp, source) = workspace_with_export();
    ingest_with_provider(
        temp.path(),
        IngestOptions::new(&source),
        Arc::new(MockProvider::new(64)),
    )
    .await
    .unwrap();

    clean(temp.path()).unwrap();

    let catalog_stats = stats(temp.path()).unwrap();
    assert_eq!(catalog_stats.courses, 0);
    assert!(catalog_stats.last_ingest_at.is_none());
}
