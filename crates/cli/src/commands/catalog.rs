//! Catalog command handler.
//!
//! Handles ingesting a timetable export into the local course store.

use advisor_catalog::types::DEFAULT_BATCH_SIZE;
use advisor_catalog::IngestOptions;
use advisor_core::{config::AppConfig, AppError, AppResult};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Course catalog management
#[derive(Args, Debug)]
pub struct CatalogCommand {
    #[command(subcommand)]
    pub action: CatalogAction,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// Load a timetable export and embed every course
    Ingest(CatalogIngestCommand),
    /// Show catalog statistics
    Stats(CatalogStatsCommand),
    /// Remove all courses and embeddings
    Clean(CatalogCleanCommand),
}

/// Ingest a timetable export
#[derive(Args, Debug)]
pub struct CatalogIngestCommand {
    /// Directory holding the numbered JSON pages (0.json, 1.json, ...)
    pub dir: PathBuf,

    /// Drop the existing catalog first (required to switch embedding models)
    #[arg(long)]
    pub reset: bool,

    /// Courses embedded per provider request
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CatalogIngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing catalog ingest from {:?}", self.dir);

        // A reset may switch models, so the saved config is ignored.
        let embedding_config = if self.reset {
            advisor_catalog::configured_embedding_config(config)
        } else {
            advisor_catalog::workspace_embedding_config(config)?
        };
        let api_key = config.resolve_api_key(&embedding_config.provider);

        let options = IngestOptions {
            source_dir: self.dir.clone(),
            reset: self.reset,
            batch_size: self.batch_size,
        };

        let stats = advisor_catalog::ingest(
            &config.workspace,
            options,
            &embedding_config,
            api_key.as_deref(),
        )
        .await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!(
                "Ingested {} courses and {} sections from {} pages in {:.2}s",
                stats.courses, stats.meeting_sections, stats.pages, stats.duration_secs
            );
            println!(
                "Embedded {} courses with {}/{}",
                stats.embedded_courses, embedding_config.provider, embedding_config.model
            );
            if stats.failed_batches > 0 {
                println!(
                    "Warning: {} embedding batches failed; re-run ingest to fill them in",
                    stats.failed_batches
                );
            }
        }

        Ok(())
    }
}

/// Show catalog statistics
#[derive(Args, Debug)]
pub struct CatalogStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CatalogStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing catalog stats command");

        let stats = advisor_catalog::stats(&config.workspace)?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!("Courses: {}", stats.courses);
            println!("  Meeting sections: {}", stats.meeting_sections);
            println!("  Embedded: {}", stats.embedded_courses);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(last_ingest) = stats.last_ingest_at {
                println!("  Last ingest: {}", last_ingest);
            }
            if !stats.by_division.is_empty() {
                println!("Divisions:");
                for division in &stats.by_division {
                    println!("  {}: {}", division.division, division.courses);
                }
            }
        }

        Ok(())
    }
}

/// Clean the catalog
#[derive(Args, Debug)]
pub struct CatalogCleanCommand {}

impl CatalogCleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing catalog clean command");

        advisor_catalog::clean(&config.workspace)?;
        println!("Catalog cleaned");

        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
    println!("{}", output);
    Ok(())
}

impl CatalogCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            CatalogAction::Ingest(cmd) => cmd.execute(config).await,
            CatalogAction::Stats(cmd) => cmd.execute(config).await,
            CatalogAction::Clean(cmd) => cmd.execute(config).await,
        }
    }
}
