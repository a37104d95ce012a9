//! Weights command handler.

use advisor_agents::WeightsDecider;
use advisor_core::{config::AppConfig, AppResult};
use clap::Args;

/// Show how a query would weight the name, description and prerequisite fields
#[derive(Args, Debug)]
pub struct WeightsCommand {
    /// Query to weigh
    pub query: String,
}

impl WeightsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing weights command");

        let client = super::llm_client(config)?;
        let decider =
            WeightsDecider::load(&config.workspace, client, super::recommend_model(config))?;
        let weights = decider.decide(&self.query).await;

        println!("name:          {:.3}", weights.name);
        println!("description:   {:.3}", weights.description);
        println!("prerequisites: {:.3}", weights.prerequisites);

        Ok(())
    }
}
