//! Error types for the course advisor.
//!
//! A single error enum covers configuration, I/O, LLM, catalog, prompt and
//! session failures so every crate in the workspace can share `AppResult`.

use thiserror::Error;

/// Unified error type for the course advisor.
///
/// All fallible functions return `Result<T, AppError>`. Errors are
/// represented and propagated, never panicked on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat-completion provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Course catalog, embedding and retrieval errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Conversation session errors
    #[error("Session error: {0}")]
    Session(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[test]
    fn test_display_includes_category() {
        let err = AppError::Catalog("index missing".to_string());
        assert_eq!(err.to_string(), "Catalog error: index missing");
    }
}
