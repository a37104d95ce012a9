//! Course Advisor CLI
//!
//! Main entry point for the `advisor` command-line tool: the HTTP server,
//! a terminal chat, catalog management and one-shot recommendations.

mod commands;

use advisor_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{
    CatalogCommand, ChatCommand, PromptsCommand, RecommendCommand, ServeCommand, WeightsCommand,
};
use std::path::PathBuf;

/// Course Advisor - conversational course recommendations over a local catalog
#[derive(Parser, Debug)]
#[command(name = "advisor")]
#[command(about = "Conversational course recommendations over a local catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ADVISOR_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ADVISOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, groq, ollama)
    #[arg(short, long, global = true, env = "ADVISOR_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "ADVISOR_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Talk to the advisor in the terminal
    Chat(ChatCommand),

    /// Course catalog management
    Catalog(CatalogCommand),

    /// Recommend courses for a query
    Recommend(RecommendCommand),

    /// Show the field weights chosen for a query
    Weights(WeightsCommand),

    /// List prompt definitions
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        config.log_format,
    )?;

    tracing::info!("Course advisor starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_advisor_dir()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Chat(_) => "chat",
        Commands::Catalog(_) => "catalog",
        Commands::Recommend(_) => "recommend",
        Commands::Weights(_) => "weights",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Catalog(cmd) => cmd.execute(&config).await,
        Commands::Recommend(cmd) => cmd.execute(&config).await,
        Commands::Weights(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
