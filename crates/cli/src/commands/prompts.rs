//! Prompts command handler.

use advisor_core::{config::AppConfig, AppResult};
use advisor_prompt::{list_prompts, load_prompt};
use clap::Args;

/// List the prompt definitions in effect for this workspace
#[derive(Args, Debug)]
pub struct PromptsCommand {}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        for id in list_prompts(&config.workspace)? {
            match load_prompt(&config.workspace, &id) {
                Ok(definition) => println!("{:<22} {}", id, definition.title),
                Err(e) => println!("{:<22} (invalid: {})", id, e),
            }
        }

        Ok(())
    }
}
