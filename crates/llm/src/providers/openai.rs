//! OpenAI-compatible chat-completion provider.
//!
//! Serves both OpenAI and Groq, which expose the same
//! `POST {base}/chat/completions` API behind bearer-token auth.

use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use advisor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI-compatible chat client.
pub struct OpenAiClient {
    /// Provider label reported in logs ("openai", "groq")
    provider: String,

    /// Base URL, without trailing slash
    base_url: String,

    api_key: String,

    client: reqwest::Client,
}

impl OpenAiClient {
    /// Client for api.openai.com.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::with_base_url("openai", OPENAI_BASE_URL, api_key)
    }

    /// Client for Groq's OpenAI-compatible endpoint.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::with_base_url("groq", GROQ_BASE_URL, api_key)
    }

    /// Client for any OpenAI-compatible base URL.
    pub fn with_base_url(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn to_wire_request<'a>(&self, request: &'a LlmRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        }
    }

    fn convert_response(&self, response: ChatCompletionResponse, model: &str) -> AppResult<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm(format!("{} returned no choices", self.provider)))?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let model = if response.model.is_empty() {
            model.to_string()
        } else {
            response.model
        };

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default().trim().to_string(),
            model,
            usage,
            done: choice.finish_reason.as_deref() != Some("length"),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            provider = %self.provider,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_wire_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        let converted = self.convert_response(body, &request.model)?;

        tracing::debug!(
            "Completion from {}: {} prompt / {} completion tokens",
            self.provider,
            converted.usage.prompt_tokens,
            converted.usage.completion_tokens
        );

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_constructors() {
        let openai = OpenAiClient::openai("key");
        assert_eq!(openai.provider_name(), "openai");
        assert_eq!(openai.base_url, OPENAI_BASE_URL);

        let groq = OpenAiClient::groq("key");
        assert_eq!(groq.provider_name(), "groq");
        assert_eq!(groq.base_url, GROQ_BASE_URL);

        let custom = OpenAiClient::with_base_url("openai", "http://localhost:9000/v1/", "k");
        assert_eq!(custom.base_url, "http://localhost:9000/v1");
    }

    #[tokio::test]
    async fn test_complete_sends_transcript_and_trims_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "max_tokens": 50,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-2024-08-06",
                "choices": [{
                    "message": {"role": "assistant", "content": "  Hi there!  \n"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("openai", server.uri(), "sk-test");
        let request = LlmRequest::new(
            vec![ChatMessage::system("be brief"), ChatMessage::user("hello")],
            "gpt-4o",
        )
        .with_max_tokens(50);

        let response = client.complete(&request).await.unwrap();
        assert_eq!(response.content, "Hi there!");
        assert_eq!(response.model, "gpt-4o-2024-08-06");
        assert_eq!(response.usage.total_tokens, 15);
        assert!(response.done);
    }

    #[tokio::test]
    async fn test_complete_reports_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("groq", server.uri(), "k");
        let request = LlmRequest::new(vec![ChatMessage::user("hello")], "llama3");

        let err = client.complete(&request).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("groq API error"));
        assert!(message.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("openai", server.uri(), "k");
        let request = LlmRequest::new(vec![ChatMessage::user("hello")], "gpt-4o");
        assert!(client.complete(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_length_finish_marks_incomplete() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "partial"}, "finish_reason": "length"}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url("openai", server.uri(), "k");
        let request = LlmRequest::new(vec![ChatMessage::user("hello")], "gpt-4o");
        let response = client.complete(&request).await.unwrap();
        assert!(!response.done);
        assert_eq!(response.model, "gpt-4o");
    }
}
