//! Recommenders that turn retrieved courses into advice.

use advisor_catalog::CourseRecord;
use advisor_core::config::AdvisorSettings;
use advisor_core::{AppError, AppResult};
use advisor_llm::{estimate_tokens, truncate_to_tokens, ChatMessage, LlmClient, LlmRequest, TokenBudget};
use advisor_prompt::{build_prompt, load_prompt, render_template, BuiltPrompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const JSON_PROMPT: &str = "recommend.json";
pub const TEXT_PROMPT: &str = "recommend.text";
pub const NARRATIVE_PROMPT: &str = "recommend.narrative";

/// Reply when there is nothing to recommend.
pub const NO_RECOMMENDATIONS_MESSAGE: &str =
    "It seems there are no course recommendations available at the moment.";

const EMPTY_JSON: &str = "[]";

/// Shared prompt state of the recommenders.
struct PromptedModel {
    client: Arc<dyn LlmClient>,
    model: String,
    definition: PromptDefinition,
    institution: String,
}

impl PromptedModel {
    fn load(
        workspace: &Path,
        id: &str,
        client: Arc<dyn LlmClient>,
        model: String,
        settings: &AdvisorSettings,
    ) -> AppResult<Self> {
        Ok(Self {
            client,
            model,
            definition: load_prompt(workspace, id)?,
            institution: settings.institution.clone(),
        })
    }

    /// The system prompt alone, used for budgeting.
    fn system_prompt(&self) -> AppResult<String> {
        match &self.definition.system {
            Some(template) => Ok(render_template(template, &self.variables(&[]))?
                .trim()
                .to_string()),
            None => Ok(String::new()),
        }
    }

    fn variables(&self, extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut variables = HashMap::new();
        variables.insert("institution".to_string(), self.institution.clone());
        for (key, value) in extra {
            variables.insert(key.to_string(), value.to_string());
        }
        variables
    }

    fn build(&self, extra: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        build_prompt(&self.definition, self.variables(extra))
    }

    async fn complete(&self, prompt: BuiltPrompt, max_tokens: Option<u32>) -> AppResult<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = prompt.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt.user));

        let request = LlmRequest::new(messages, &self.model).with_generation(
            max_tokens.or(prompt.metadata.max_tokens),
            prompt.metadata.temperature,
        );

        tracing::debug!(
            "Calling {} for {}",
            self.client.provider_name(),
            prompt.metadata.source_prompt_id
        );

        let response = self.client.complete(&request).await?;
        if !response.done {
            tracing::warn!(
                "{} output hit the token limit",
                prompt.metadata.source_prompt_id
            );
        }
        Ok(response.content)
    }
}

fn courses_json(courses: &[CourseRecord]) -> AppResult<String> {
    Ok(serde_json::to_string(courses)?)
}

/// Recommends a subset of the retrieved courses as a JSON array.
pub struct JsonRecommender {
    inner: PromptedModel,
    context_window: usize,
    max_tokens: u32,
}

impl JsonRecommender {
    pub fn load(
        workspace: &Path,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: &AdvisorSettings,
    ) -> AppResult<Self> {
        Ok(Self {
            inner: PromptedModel::load(workspace, JSON_PROMPT, client, model.into(), settings)?,
            context_window: settings.context_window,
            max_tokens: settings.json_max_tokens,
        })
    }

    /// Raw JSON recommendations for a query.
    ///
    /// No courses means `"[]"` without a model call. The query is cut to
    /// whatever the context window leaves after the system prompt, the
    /// courses and the output reservation.
    pub async fn recommend(&self, query: &str, courses: &[CourseRecord]) -> AppResult<String> {
        if courses.is_empty() {
            return Ok(EMPTY_JSON.to_string());
        }

        let system = self.inner.system_prompt()?;
        let courses_text = courses_json(courses)?;

        let remaining = TokenBudget::new(self.context_window, self.max_tokens as usize)
            .remaining(&[&system, &courses_text])
            .map_err(|e| {
                tracing::debug!("{}", e);
                AppError::Llm(
                    "Not enough token budget for system prompt and retrieved courses".to_string(),
                )
            })?;

        let query = truncate_to_tokens(query, remaining);
        tracing::debug!(
            "JSON recommendation budget: {} tokens, query uses {}",
            remaining,
            estimate_tokens(query)
        );

        let prompt = self
            .inner
            .build(&[("query", query), ("courses", &courses_text)])?;
        self.inner.complete(prompt, Some(self.max_tokens)).await
    }
}

/// Turns JSON recommendations into a short point-form summary.
pub struct TextRecommender {
    inner: PromptedModel,
    context_window: usize,
    max_tokens: u32,
}

impl TextRecommender {
    pub fn load(
        workspace: &Path,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: &AdvisorSettings,
    ) -> AppResult<Self> {
        Ok(Self {
            inner: PromptedModel::load(workspace, TEXT_PROMPT, client, model.into(), settings)?,
            context_window: settings.context_window,
            max_tokens: settings.text_max_tokens,
        })
    }

    pub async fn recommend(&self, course_json: &str) -> AppResult<String> {
        if course_json.trim() == EMPTY_JSON {
            return Ok(NO_RECOMMENDATIONS_MESSAGE.to_string());
        }

        let system = self.inner.system_prompt()?;
        let remaining = TokenBudget::new(self.context_window, self.max_tokens as usize)
            .remaining(&[&system, course_json])
            .map_err(|e| {
                tracing::debug!("{}", e);
                AppError::Llm("Not enough token budget for system prompt and course JSON".to_string())
            })?;

        let course_json = truncate_to_tokens(course_json, remaining);
        let prompt = self.inner.build(&[("courses", course_json)])?;
        self.inner.complete(prompt, Some(self.max_tokens)).await
    }
}

/// Writes a single prose recommendation straight from the retrieved courses.
pub struct NarrativeResponder {
    inner: PromptedModel,
}

impl NarrativeResponder {
    pub fn load(
        workspace: &Path,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        settings: &AdvisorSettings,
    ) -> AppResult<Self> {
        Ok(Self {
            inner: PromptedModel::load(workspace, NARRATIVE_PROMPT, client, model.into(), settings)?,
        })
    }

    pub async fn respond(&self, query: &str, courses: &[CourseRecord]) -> AppResult<String> {
        let courses_text = courses_json(courses)?;
        let prompt = self
            .inner
            .build(&[("query", query), ("courses", &courses_text)])?;
        self.inner.complete(prompt, None).await
    }
}

/// Read course records out of model output.
///
/// Takes the text from the first `[` to the last `]`, which drops code
/// fences and stray prose. Anything unparseable yields no courses.
pub fn parse_recommendations(text: &str) -> Vec<CourseRecord> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<CourseRecord>>(&text[start..=end]) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Could not parse recommendations: {}", e);
            Vec::new()
        }
    }
}
