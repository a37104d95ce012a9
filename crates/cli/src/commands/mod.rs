//! Command handlers for the advisor CLI.

pub mod catalog;
pub mod chat;
pub mod prompts;
pub mod recommend;
pub mod serve;
pub mod weights;

pub use catalog::CatalogCommand;
pub use chat::ChatCommand;
pub use prompts::PromptsCommand;
pub use recommend::RecommendCommand;
pub use serve::ServeCommand;
pub use weights::WeightsCommand;

use advisor_agents::AdvisorPipeline;
use advisor_catalog::CourseCatalog;
use advisor_core::{config::AppConfig, AppResult};
use advisor_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Chat client for the active provider.
pub(crate) fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.as_ref().and_then(|pc| pc.endpoint());
    let api_key = config.resolve_api_key(&config.provider);

    tracing::debug!(
        "Creating {} client (endpoint: {:?})",
        config.provider,
        endpoint
    );

    create_client(&config.provider, endpoint, api_key.as_deref())
}

pub(crate) fn intake_model(config: &AppConfig) -> String {
    config
        .advisor
        .intake_model
        .clone()
        .unwrap_or_else(|| config.model.clone())
}

pub(crate) fn recommend_model(config: &AppConfig) -> String {
    config
        .advisor
        .recommend_model
        .clone()
        .unwrap_or_else(|| config.model.clone())
}

/// Open the ingested catalog and wire the recommendation pipeline over it.
pub(crate) fn open_pipeline(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
) -> AppResult<AdvisorPipeline> {
    let provider = advisor_catalog::provider_from_config(config)?;
    let catalog = Arc::new(CourseCatalog::open(&config.workspace, provider)?);

    AdvisorPipeline::load(
        &config.workspace,
        catalog,
        client,
        &recommend_model(config),
        &config.advisor,
    )
}
