//! LLM provider factory.
//!
//! Resolves a provider name to a concrete client, applying default
//! endpoints and checking that hosted providers have a key.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use advisor_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "groq", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required for OpenAI-compatible providers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key
/// is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let base_url = endpoint.unwrap_or_else(|| provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_base_url(base_url))),
        ProviderType::OpenAI | ProviderType::Groq => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "{} provider requires API key",
                    provider_type.display_name()
                ))
            })?;
            Ok(Arc::new(OpenAiClient::with_base_url(
                provider_type.as_str(),
                base_url,
                key,
            )))
        }
    }
}
