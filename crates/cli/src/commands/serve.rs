//! Serve command handler.
//!
//! Runs the HTTP API over the workspace's catalog.

use advisor_agents::IntakeAgent;
use advisor_core::{config::AppConfig, AppResult};
use advisor_server::AppState;
use clap::Args;
use std::sync::Arc;

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let client = super::llm_client(config)?;
        let intake = IntakeAgent::load(
            &config.workspace,
            client.clone(),
            super::intake_model(config),
            &config.advisor,
        )?;

        // Intake still works without a catalog; /recommend then answers 503.
        let pipeline = match super::open_pipeline(config, client) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                tracing::warn!("Recommendations disabled: {}", e);
                None
            }
        };

        let state = Arc::new(AppState::new(
            intake,
            pipeline,
            config.server.cors_origins.clone(),
        ));

        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);

        advisor_server::serve(state, host, port).await
    }
}
