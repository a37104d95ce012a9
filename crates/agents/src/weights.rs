//! LLM-chosen field weights for weighted retrieval.

use advisor_catalog::FieldWeights;
use advisor_core::AppResult;
use advisor_llm::{ChatMessage, LlmClient, LlmRequest};
use advisor_prompt::{build_prompt, load_prompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const WEIGHTS_PROMPT: &str = "retrieval.weights";

const DEFAULT_MAX_TOKENS: u32 = 50;

/// Asks the model how much the name, description and prerequisites of a
/// course should count for a query.
pub struct WeightsDecider {
    client: Arc<dyn LlmClient>,
    model: String,
    definition: PromptDefinition,
}

impl WeightsDecider {
    pub fn load(
        workspace: &Path,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            client,
            model: model.into(),
            definition: load_prompt(workspace, WEIGHTS_PROMPT)?,
        })
    }

    /// Weights for a query. Any failure yields the default weights.
    pub async fn decide(&self, query: &str) -> FieldWeights {
        match self.try_decide(query).await {
            Ok(Some(weights)) => {
                tracing::info!(
                    "Weights for query: name={:.2} description={:.2} prerequisites={:.2}",
                    weights.name,
                    weights.description,
                    weights.prerequisites
                );
                weights
            }
            Ok(None) => {
                tracing::warn!("Model returned unusable weights, using defaults");
                FieldWeights::default()
            }
            Err(e) => {
                tracing::warn!("Failed to decide weights, using defaults: {}", e);
                FieldWeights::default()
            }
        }
    }

    async fn try_decide(&self, query: &str) -> AppResult<Option<FieldWeights>> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        let prompt = build_prompt(&self.definition, variables)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = prompt.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt.user));

        let request = LlmRequest::new(messages, &self.model).with_generation(
            Some(prompt.metadata.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
            prompt.metadata.temperature,
        );

        let response = self.client.complete(&request).await?;
        tracing::debug!("Raw weights response: {}", response.content);

        Ok(parse_weights(&response.content))
    }
}

/// Parse a weights object from model output.
///
/// Code fences and text around the object are ignored. All three keys must
/// be present, no weight may be negative and the sum must be 1.
pub fn parse_weights(text: &str) -> Option<FieldWeights> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let weights: FieldWeights = serde_json::from_str(&text[start..=end]).ok()?;
    weights.is_valid().then_some(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use tempfile::TempDir;

    #[test]
    fn test_parse_plain_object() {
        let weights =
            parse_weights(r#"{"name": 0.2, "description": 0.7, "prerequisites": 0.1}"#).unwrap();
        assert_eq!(weights.description, 0.7);
    }

    #[test]
    fn test_parse_fenced_object() {
        let text = "```json\n{\"name\": 0.5, \"description\": 0.5, \"prerequisites\": 0.0}\n```";
        let weights = parse_weights(text).unwrap();
        assert_eq!(weights.name, 0.5);
        assert_eq!(weights.prerequisites, 0.0);
    }

    #[test]
    fn test_parse_rejects_invalid_weights() {
        // Missing key
        assert!(parse_weights(r#"{"name": 0.5, "description": 0.5}"#).is_none());
        // Does not sum to 1
        assert!(
            parse_weights(r#"{"name": 0.5, "description": 0.5, "prerequisites": 0.5}"#).is_none()
        );
        // Negative
        assert!(
            parse_weights(r#"{"name": 1.2, "description": -0.2, "prerequisites": 0.0}"#).is_none()
        );
        assert!(parse_weights("no json here").is_none());
        assert!(parse_weights("} {").is_none());
    }

    #[test]
    fn test_parse_accepts_rounding_within_tolerance() {
        let weights =
            parse_weights(r#"{"name": 0.3333333, "description": 0.3333333, "prerequisites": 0.3333334}"#);
        assert!(weights.is_some());
    }

    #[tokio::test]
    async fn test_decide_uses_model_weights() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new(vec![
            r#"{"name": 0.1, "description": 0.8, "prerequisites": 0.1}"#,
        ]));
        let decider = WeightsDecider::load(temp.path(), client.clone(), "gpt-4o").unwrap();

        let weights = decider.decide("courses about neural networks").await;
        assert_eq!(weights.description, 0.8);

        let request = &client.requests()[0];
        assert_eq!(request.max_tokens, Some(50));
        assert_eq!(request.messages[0].content, "You are a helpful assistant.");
        assert!(request.messages[1].content.contains("courses about neural networks"));
    }

    #[tokio::test]
    async fn test_decide_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();

        let garbage = Arc::new(ScriptedClient::new(vec!["I think the name matters most."]));
        let decider = WeightsDecider::load(temp.path(), garbage, "m").unwrap();
        assert_eq!(decider.decide("q").await, FieldWeights::default());

        let failing = Arc::new(ScriptedClient::failing());
        let decider = WeightsDecider::load(temp.path(), failing, "m").unwrap();
        assert_eq!(decider.decide("q").await, FieldWeights::default());
    }
}
