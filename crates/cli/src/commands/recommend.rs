//! Recommend command handler.
//!
//! Runs the recommendation pipeline for a query without an intake
//! conversation.

use advisor_agents::Recommendation;
use advisor_catalog::MetadataFilter;
use advisor_core::{
    config::{AppConfig, RetrievalMode},
    AppError, AppResult,
};
use clap::Args;

/// Recommend courses for a query
#[derive(Args, Debug)]
pub struct RecommendCommand {
    /// What the student is looking for
    pub query: String,

    /// Metadata filter as JSON, e.g. '{"campus": {"$eq": "Mississauga"}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Number of courses to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Retrieval mode (document, weighted)
    #[arg(long)]
    pub mode: Option<String>,

    /// Answer with a single narrative call over the retrieved courses
    #[arg(long)]
    pub narrative: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RecommendCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing recommend command");
        tracing::debug!("Recommend options: {:?}", self);

        if self.top_k == Some(0) {
            return Err(AppError::Config("--top-k must be at least 1".to_string()));
        }

        let filter = self
            .filter
            .as_deref()
            .map(MetadataFilter::from_json_str)
            .transpose()?;

        let client = super::llm_client(config)?;
        let mut pipeline = super::open_pipeline(config, client)?;

        if let Some(ref mode) = self.mode {
            let mode = RetrievalMode::parse(mode).ok_or_else(|| {
                AppError::Config(format!(
                    "Unknown retrieval mode: {}. Supported: document, weighted",
                    mode
                ))
            })?;
            pipeline = pipeline.with_mode(mode);
        }

        let recommendation = if self.narrative {
            pipeline
                .narrate(&self.query, filter.as_ref(), self.top_k)
                .await?
        } else {
            pipeline
                .recommend(&self.query, filter.as_ref(), self.top_k)
                .await?
        };

        if self.json {
            let output = serde_json::to_string_pretty(&recommendation)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", output);
        } else {
            print_recommendation(&recommendation);
        }

        Ok(())
    }
}

fn print_recommendation(recommendation: &Recommendation) {
    println!("{}", recommendation.text);
    println!();
    println!(
        "Retrieved {} courses ({} mode)",
        recommendation.retrieved,
        recommendation.mode.as_str()
    );

    if let Some(weights) = recommendation.weights {
        println!(
            "Weights: name {:.2}, description {:.2}, prerequisites {:.2}",
            weights.name, weights.description, weights.prerequisites
        );
    }
}
