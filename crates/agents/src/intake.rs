//! Intake interview: multi-turn chat that ends in a refined search query.

use crate::conversation::Conversation;
use advisor_core::config::AdvisorSettings;
use advisor_core::{AppError, AppResult};
use advisor_llm::{ChatMessage, LlmClient, LlmRequest};
use advisor_prompt::{build_prompt, load_prompt, render_template, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const INTAKE_PROMPT: &str = "advisor.intake";
pub const REFINE_PROMPT: &str = "advisor.refine";
pub const RESUME_PROMPT: &str = "advisor.resume";

/// Result of one student turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The interview goes on.
    Continue { reply: String },

    /// The student ended the interview; `refined_query` feeds retrieval.
    Finished { reply: String, refined_query: String },
}

impl TurnOutcome {
    pub fn reply(&self) -> &str {
        match self {
            TurnOutcome::Continue { reply } | TurnOutcome::Finished { reply, .. } => reply,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TurnOutcome::Finished { .. })
    }
}

/// Conducts the intake interview.
pub struct IntakeAgent {
    client: Arc<dyn LlmClient>,
    model: String,
    system_prompt: String,
    refine_prompt: String,
    resume_prompt: PromptDefinition,
    end_triggers: Vec<String>,
}

impl IntakeAgent {
    /// Load the intake, refine and resume prompts of a workspace.
    pub fn load(
        workspace: &Path,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: &AdvisorSettings,
    ) -> AppResult<Self> {
        let mut variables = HashMap::new();
        variables.insert("institution".to_string(), settings.institution.clone());

        let system_prompt = build_prompt(&load_prompt(workspace, INTAKE_PROMPT)?, variables.clone())?.user;
        let refine_prompt = build_prompt(&load_prompt(workspace, REFINE_PROMPT)?, variables)?.user;
        let resume_prompt = load_prompt(workspace, RESUME_PROMPT)?;

        Ok(Self {
            client,
            model: model.into(),
            system_prompt,
            refine_prompt,
            resume_prompt,
            end_triggers: settings
                .end_triggers
                .iter()
                .map(|t| t.to_lowercase())
                .filter(|t| !t.trim().is_empty())
                .collect(),
        })
    }

    /// A fresh conversation seeded with the intake system prompt.
    pub fn start_conversation(&self) -> Conversation {
        Conversation::new(self.system_prompt.clone())
    }

    /// Whether a student message ends the interview.
    pub fn is_end_trigger(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.end_triggers.iter().any(|t| lowered.contains(t.as_str()))
    }

    /// Handle one student message.
    ///
    /// On an LLM failure the student message is taken back out of the
    /// conversation so the turn can be retried.
    pub async fn respond(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> AppResult<TurnOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Session("Message is empty".to_string()));
        }

        conversation.push(ChatMessage::user(message));

        let request = LlmRequest::new(conversation.messages().to_vec(), &self.model);
        let reply = match self.client.complete(&request).await {
            Ok(response) => response.content,
            Err(e) => {
                conversation.pop();
                return Err(e);
            }
        };

        conversation.push(ChatMessage::assistant(reply.clone()));
        tracing::debug!("Intake turn {} answered", conversation.user_turns());

        if !self.is_end_trigger(message) {
            return Ok(TurnOutcome::Continue { reply });
        }

        tracing::info!("Intake finished after {} turns", conversation.user_turns());
        let refined_query = match self.refine(conversation).await {
            Ok(query) => query,
            Err(e) => {
                // Drop the reply and the message so a retry starts clean.
                conversation.pop();
                conversation.pop();
                return Err(e);
            }
        };

        Ok(TurnOutcome::Finished {
            reply,
            refined_query,
        })
    }

    /// Condense a conversation into a search query.
    pub async fn refine(&self, conversation: &Conversation) -> AppResult<String> {
        let mut messages = Vec::with_capacity(conversation.messages().len() + 1);
        messages.push(ChatMessage::system(self.refine_prompt.clone()));
        messages.extend(conversation.messages().iter().cloned());

        let response = self
            .client
            .complete(&LlmRequest::new(messages, &self.model))
            .await?;

        tracing::debug!("Refined query: {}", response.content);
        Ok(response.content)
    }

    /// Add the student's resume to the conversation as system context.
    pub fn attach_resume(&self, conversation: &mut Conversation, resume: &str) -> AppResult<()> {
        let resume = resume.trim();
        if resume.is_empty() {
            return Err(AppError::Session("Resume is empty".to_string()));
        }

        let mut variables = HashMap::new();
        variables.insert("resume".to_string(), resume.to_string());
        let text = render_template(&self.resume_prompt.template, &variables)?;

        conversation.push(ChatMessage::system(text.trim()));
        conversation.mark_resume_attached();

        tracing::info!("Attached resume ({} chars)", resume.chars().count());
        Ok(())
    }
}
