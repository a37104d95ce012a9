//! Course catalog: ingestion, storage and vector retrieval.
//!
//! Timetable exports are transformed into courses and meeting sections,
//! stored in SQLite next to their embeddings, and searched either by whole
//! course document or by a weighted blend of per-field vectors.

pub mod config;
pub mod document;
pub mod embeddings;
pub mod filter;
pub mod index;
pub mod search;
pub mod transform;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use filter::{Condition, MetadataFilter};
pub use types::{
    CatalogStats, Course, CourseRecord, DivisionCount, EmbeddingField, FieldWeights,
    IngestOptions, IngestStats, MeetingSection, MeetingTime, ScoredCourse,
};

use advisor_core::config::RetrievalMode;
use advisor_core::{AppConfig, AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

const META_LAST_INGEST: &str = "last_ingest_at";
const META_PROVIDER: &str = "embedding_provider";
const META_MODEL: &str = "embedding_model";
const META_DIMENSIONS: &str = "embedding_dimensions";

/// Embedding config for a workspace: the one saved by the last ingest, or
/// one derived from the application config.
pub fn workspace_embedding_config(app: &AppConfig) -> AppResult<EmbeddingConfig> {
    if let Some(saved) = EmbeddingConfig::load(&app.workspace)? {
        return Ok(saved);
    }

    Ok(configured_embedding_config(app))
}

/// Embedding config named by the application config alone.
pub fn configured_embedding_config(app: &AppConfig) -> EmbeddingConfig {
    let provider = app.embedding_provider();
    let entry = app.get_provider_config(&provider);
    EmbeddingConfig::for_provider(
        &provider,
        entry.as_ref().and_then(|p| p.embedding_model()),
        entry.as_ref().and_then(|p| p.endpoint()),
    )
}

/// Build the embedding provider described by the application config.
pub fn provider_from_config(app: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let config = workspace_embedding_config(app)?;
    let api_key = app.resolve_api_key(&config.provider);
    create_provider(&config, api_key.as_deref())
}

/// Ingest a timetable export using the provider named by `config`.
pub async fn ingest(
    workspace: &Path,
    options: IngestOptions,
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<IngestStats> {
    let provider = create_provider(config, api_key)?;
    run_ingest(workspace, options, provider, config.endpoint.clone()).await
}

/// Ingest a timetable export and embed every course.
///
/// Courses and sections are stored first; embeddings follow in batches of
/// `options.batch_size`. A batch the provider rejects is logged and skipped,
/// leaving those courses unembedded.
pub async fn ingest_with_provider(
    workspace: &Path,
    options: IngestOptions,
    provider: Arc<dyn EmbeddingProvider>,
) -> AppResult<IngestStats> {
    let endpoint = EmbeddingConfig::load(workspace)?.and_then(|c| c.endpoint);
    run_ingest(workspace, options, provider, endpoint).await
}

async fn run_ingest(
    workspace: &Path,
    options: IngestOptions,
    provider: Arc<dyn EmbeddingProvider>,
    endpoint: Option<String>,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!("Starting ingest from {:?}", options.source_dir);

    let catalog = transform::load_catalog_dir(&options.source_dir)?;

    let embedding_config = EmbeddingConfig {
        provider: provider.provider_name().to_string(),
        model: provider.model_name().to_string(),
        dimensions: provider.dimensions(),
        batch_size: options.batch_size.max(1),
        endpoint,
    };

    let index_path = config::get_index_path(workspace);
    let mut conn = index::init_index(&index_path)?;

    if options.reset {
        tracing::info!("Resetting catalog");
        index::reset_index(&conn)?;
    } else {
        check_stored_embeddings(&conn, &embedding_config)?;
    }

    index::store_catalog(&mut conn, &catalog.courses, &catalog.meeting_sections)?;

    let mut sections_by_course: HashMap<&str, Vec<MeetingSection>> = HashMap::new();
    for section in &catalog.meeting_sections {
        sections_by_course
            .entry(section.course_id.as_str())
            .or_default()
            .push(section.clone());
    }

    let mut embedded_courses = 0u32;
    let mut failed_batches = 0u32;

    for (batch_number, batch) in catalog
        .courses
        .chunks(embedding_config.batch_size)
        .enumerate()
    {
        let mut rows = Vec::with_capacity(batch.len() * EmbeddingField::ALL.len());
        let mut batch_ok = true;

        for field in EmbeddingField::ALL {
            let texts: Vec<String> = batch
                .iter()
                .map(|course| {
                    let sections = sections_by_course
                        .get(course.course_id.as_str())
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    document::field_text(course, sections, field)
                })
                .collect();

            let vectors = match provider.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => vectors,
                Ok(vectors) => {
                    tracing::warn!(
                        "Batch {} ({}): expected {} embeddings, got {}",
                        batch_number,
                        field.as_str(),
                        batch.len(),
                        vectors.len()
                    );
                    batch_ok = false;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "Batch {} ({}) failed, skipping: {}",
                        batch_number,
                        field.as_str(),
                        e
                    );
                    batch_ok = false;
                    break;
                }
            };

            rows.extend(
                batch
                    .iter()
                    .zip(vectors)
                    .map(|(course, vector)| (course.course_id.clone(), field, vector)),
            );
        }

        // A course is searchable only once all of its field vectors are stored.
        if batch_ok {
            index::store_embeddings(&mut conn, &rows)?;
            embedded_courses += batch.len() as u32;
        } else {
            failed_batches += 1;
        }

        tracing::debug!(
            "Embedded batch {} ({} courses)",
            batch_number,
            batch.len()
        );
    }

    index::set_meta(&conn, META_PROVIDER, &embedding_config.provider)?;
    index::set_meta(&conn, META_MODEL, &embedding_config.model)?;
    index::set_meta(&conn, META_DIMENSIONS, &embedding_config.dimensions.to_string())?;
    index::set_meta(&conn, META_LAST_INGEST, &Utc::now().to_rfc3339())?;
    embedding_config.save(workspace)?;

    let duration = start.elapsed();

    tracing::info!(
        "Ingest completed: {} pages, {} courses, {} sections, {} embedded, {} failed batches in {:.2}s",
        catalog.pages,
        catalog.courses.len(),
        catalog.meeting_sections.len(),
        embedded_courses,
        failed_batches,
        duration.as_secs_f64()
    );

    Ok(IngestStats {
        pages: catalog.pages,
        courses: catalog.courses.len() as u32,
        meeting_sections: catalog.meeting_sections.len() as u32,
        embedded_courses,
        failed_batches,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Refuse to mix vectors from a different provider, model or dimension.
fn check_stored_embeddings(conn: &Connection, expected: &EmbeddingConfig) -> AppResult<()> {
    let (Some(provider), Some(model), Some(dimensions)) = (
        index::get_meta(conn, META_PROVIDER)?,
        index::get_meta(conn, META_MODEL)?,
        index::get_meta(conn, META_DIMENSIONS)?,
    ) else {
        return Ok(());
    };

    let stored = EmbeddingConfig {
        provider,
        model,
        dimensions: dimensions.parse().unwrap_or(0),
        ..expected.clone()
    };

    stored.validate_consistency(expected).map_err(|e| {
        AppError::Catalog(format!(
            "{}. Re-run ingest with --reset to rebuild the catalog.",
            e
        ))
    })
}

/// Clean (reset) the catalog.
pub fn clean(workspace: &Path) -> AppResult<()> {
    tracing::info!("Cleaning course catalog");

    let index_path = config::get_index_path(workspace);
    if !index_path.exists() {
        return Err(AppError::Catalog("Course catalog does not exist".to_string()));
    }

    let conn = index::init_index(&index_path)?;
    index::reset_index(&conn)?;

    tracing::info!("Course catalog cleaned");
    Ok(())
}

/// Get statistics for the catalog.
pub fn stats(workspace: &Path) -> AppResult<CatalogStats> {
    let index_path = config::get_index_path(workspace);
    if !index_path.exists() {
        return Err(AppError::Catalog(
            "Course catalog has no index. Run 'advisor catalog ingest' first.".to_string(),
        ));
    }

    let conn = index::init_index(&index_path)?;
    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
    collect_stats(&conn, db_size_bytes)
}

fn collect_stats(conn: &Connection, db_size_bytes: u64) -> AppResult<CatalogStats> {
    let (courses, meeting_sections, embedded_courses) = index::get_stats(conn)?;
    let last_ingest_at = index::get_meta(conn, META_LAST_INGEST)?
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(CatalogStats {
        courses,
        meeting_sections,
        embedded_courses,
        by_division: index::division_counts(conn)?,
        db_size_bytes,
        last_ingest_at,
    })
}

/// A searchable catalog shared between request handlers.
///
/// Queries are embedded before the store lock is taken, so the lock is
/// never held across an await point.
#[derive(Debug)]
pub struct CourseCatalog {
    conn: Mutex<Connection>,
    provider: Arc<dyn EmbeddingProvider>,
    db_path: Option<PathBuf>,
}

impl CourseCatalog {
    /// Open the workspace catalog.
    pub fn open(workspace: &Path, provider: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let index_path = config::get_index_path(workspace);
        if !index_path.exists() {
            return Err(AppError::Catalog(
                "Course catalog has no index. Run 'advisor catalog ingest' first.".to_string(),
            ));
        }

        let conn = index::init_index(&index_path)?;
        let expected = EmbeddingConfig {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
            ..EmbeddingConfig::default()
        };
        check_stored_embeddings(&conn, &expected)?;

        tracing::info!(
            "Opened course catalog at {:?} ({} / {})",
            index_path,
            provider.provider_name(),
            provider.model_name()
        );

        Ok(Self {
            conn: Mutex::new(conn),
            provider,
            db_path: Some(index_path),
        })
    }

    /// Wrap an existing connection, typically an in-memory store.
    pub fn from_parts(conn: Connection, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            conn: Mutex::new(conn),
            provider,
            db_path: None,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Retrieve the `top_k` best matching courses for a query.
    ///
    /// A query that cannot be embedded yields no courses.
    pub async fn search(
        &self,
        query: &str,
        mode: RetrievalMode,
        weights: &FieldWeights,
        filter: Option<&MetadataFilter>,
        top_k: usize,
    ) -> AppResult<Vec<ScoredCourse>> {
        tracing::info!("Searching catalog ({}): {}", mode.as_str(), query);

        let query_vector = match self.provider.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("Failed to embed query, returning no courses: {}", e);
                return Ok(Vec::new());
            }
        };

        let conn = self.lock()?;
        let results = match mode {
            RetrievalMode::Document => {
                search::rank_by_document(&conn, &query_vector, filter, top_k)?
            }
            RetrievalMode::Weighted => {
                search::rank_by_fields(&conn, &query_vector, weights, filter, top_k)?
            }
        };

        if results.is_empty() {
            tracing::info!("No courses matched the query");
        } else {
            tracing::info!(
                "Retrieved {} courses (best score: {:.3})",
                results.len(),
                results[0].score
            );
        }

        Ok(results)
    }

    /// Current catalog statistics.
    pub fn stats(&self) -> AppResult<CatalogStats> {
        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        let conn = self.lock()?;
        collect_stats(&conn, db_size_bytes)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Catalog("Catalog store lock poisoned".to_string()))
    }
}
