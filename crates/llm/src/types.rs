//! Provider identification.

use crate::providers::ollama::OLLAMA_BASE_URL;
use crate::providers::openai::{GROQ_BASE_URL, OPENAI_BASE_URL};

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Groq,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "groq" => Some(Self::Groq),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    /// Human-readable name for messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Groq => "Groq",
            Self::Ollama => "Ollama",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => OPENAI_BASE_URL,
            Self::Groq => GROQ_BASE_URL,
            Self::Ollama => OLLAMA_BASE_URL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("openai"), Some(ProviderType::OpenAI));
        assert_eq!(ProviderType::parse("Groq"), Some(ProviderType::Groq));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("claude"), None);
    }

    #[test]
    fn test_default_endpoints() {
        assert_eq!(
            ProviderType::Groq.default_endpoint(),
            "https://api.groq.com/openai/v1"
        );
        assert_eq!(
            ProviderType::Ollama.default_endpoint(),
            "http://localhost:11434"
        );
    }
}
