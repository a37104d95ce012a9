//! Chat command handler.
//!
//! Runs the intake conversation in the terminal, then recommends courses
//! for the refined query.

use advisor_agents::{Conversation, IntakeAgent, TurnOutcome};
use advisor_core::{config::AppConfig, AppError, AppResult};
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Talk to the advisor in the terminal
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Resume to share with the advisor (PDF or plain text)
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Stop after printing the refined query
    #[arg(long)]
    pub no_recommend: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let client = super::llm_client(config)?;
        let intake = IntakeAgent::load(
            &config.workspace,
            client.clone(),
            super::intake_model(config),
            &config.advisor,
        )?;

        let mut conversation = intake.start_conversation();
        if let Some(ref path) = self.resume {
            let text = read_resume(path).await?;
            intake.attach_resume(&mut conversation, &text)?;
            println!("Resume attached ({} characters)", text.chars().count());
        }

        println!(
            "Tell me about your interests. Say \"{}\" or type exit when you are ready for recommendations.",
            config
                .advisor
                .end_triggers
                .first()
                .map(String::as_str)
                .unwrap_or("generate")
        );

        let refined_query = match converse(&intake, &mut conversation).await? {
            Some(query) => query,
            None => return Ok(()),
        };

        println!();
        println!("Refined query: {}", refined_query);

        if self.no_recommend {
            return Ok(());
        }

        let pipeline = super::open_pipeline(config, client)?;
        let recommendation = pipeline.recommend(&refined_query, None, None).await?;

        println!();
        println!("{}", recommendation.text);

        Ok(())
    }
}

/// Run turns until the student finishes. `None` means stdin closed first.
async fn converse(
    intake: &IntakeAgent,
    conversation: &mut Conversation,
) -> AppResult<Option<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        if matches!(message.to_lowercase().as_str(), "exit" | "quit") {
            if conversation.user_turns() == 0 {
                return Ok(None);
            }
            return intake.refine(conversation).await.map(Some);
        }

        match intake.respond(conversation, message).await {
            Ok(TurnOutcome::Continue { reply }) => println!("{}\n", reply),
            Ok(TurnOutcome::Finished {
                reply,
                refined_query,
            }) => {
                println!("{}", reply);
                return Ok(Some(refined_query));
            }
            Err(e) => {
                tracing::warn!("Intake turn failed: {}", e);
                eprintln!("The advisor could not answer, please try again.");
            }
        }
    }
}

async fn read_resume(path: &Path) -> AppResult<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        return Ok(tokio::fs::read_to_string(path).await?);
    }

    let bytes = tokio::fs::read(path).await?;
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Other(format!("PDF extraction task failed: {}", e)))?
        .map_err(|e| AppError::Other(format!("Failed to read PDF {:?}: {}", path, e)))
}
