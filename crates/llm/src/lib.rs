//! LLM integration crate for the course advisor.
//!
//! Provides a provider-agnostic chat-completion abstraction with
//! OpenAI-compatible (OpenAI, Groq) and Ollama backends, plus token
//! budgeting helpers used when assembling large prompts.
//!
//! # Example
//! ```no_run
//! use advisor_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use budget::{estimate_tokens, truncate_to_tokens, TokenBudget};
pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage, Role};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
