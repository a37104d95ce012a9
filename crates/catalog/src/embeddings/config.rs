//! Embedding configuration, persisted in `.advisor/catalog/config.yaml`.

use crate::config::catalog_config_path;
use advisor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Embedding configuration for the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama" or "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Custom API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_batch_size() -> usize {
    crate::types::DEFAULT_BATCH_SIZE
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogConfigFile {
    embedding: Option<EmbeddingConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration backed by the trigram provider.
    pub fn mock() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }

    /// Default configuration for a provider name.
    pub fn for_provider(provider: &str, model: Option<&str>, endpoint: Option<&str>) -> Self {
        let base = match provider {
            "mock" | "trigram" => Self::mock(),
            "ollama" => Self {
                provider: "ollama".to_string(),
                model: "nomic-embed-text".to_string(),
                dimensions: 768,
                batch_size: default_batch_size(),
                endpoint: None,
            },
            other => Self {
                provider: other.to_string(),
                ..Self::default()
            },
        };

        Self {
            model: model.map(str::to_string).unwrap_or(base.model.clone()),
            endpoint: endpoint.map(str::to_string),
            ..base
        }
    }

    /// Load the catalog's embedding config, if one was saved.
    pub fn load(workspace: &Path) -> AppResult<Option<Self>> {
        let config_path = catalog_config_path(workspace);

        if !config_path.exists() {
            tracing::debug!("No catalog config at {:?}", config_path);
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Catalog(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let file: CatalogConfigFile = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Catalog(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        Ok(file.embedding)
    }

    /// Save as the catalog's embedding config.
    pub fn save(&self, workspace: &Path) -> AppResult<()> {
        let config_path = catalog_config_path(workspace);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Catalog(format!("Failed to create config directory: {}", e))
            })?;
        }

        let file = CatalogConfigFile {
            embedding: Some(self.clone()),
        };
        let yaml = serde_yaml::to_string(&file)
            .map_err(|e| AppError::Catalog(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, yaml).map_err(|e| {
            AppError::Catalog(format!(
                "Failed to write config to {:?}: {}",
                config_path, e
            ))
        })?;

        tracing::debug!("Saved catalog embedding config");
        Ok(())
    }

    /// Check that vectors produced under `other` can be compared with ours.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::Catalog(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::Catalog(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::Catalog(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}
