//! Configuration management for the course advisor.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - The workspace config file (`.advisor/config.yaml`)
//! - Environment variables (a `.env` file is loaded first when present)
//! - Command-line flags
//!
//! Workspace state (prompt overrides, the course store) lives in `.advisor/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Providers the advisor knows how to talk to.
pub const KNOWN_PROVIDERS: [&str; 3] = ["openai", "groq", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .advisor/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat-completion provider ("openai", "groq", "ollama")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// Explicit API key, overrides the provider's key variable
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Log record format
    pub log_format: LogFormat,

    /// Provider table from config.yaml
    pub llm: Option<LlmConfig>,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Conversation and recommendation settings
    pub advisor: AdvisorSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
///
/// OpenAI-compatible entries (OpenAI, Groq) require `apiKeyEnv`; entries
/// without it are read as Ollama.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAiCompatible {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Chat model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAiCompatible { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Embedding model configured for this provider, if any.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAiCompatible {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Custom endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAiCompatible { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means local development origins
    #[serde(rename = "corsOrigins", default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// How courses are matched against the refined query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// One embedding per rendered course document, cosine similarity
    #[default]
    Document,
    /// LLM-weighted blend of name/description/prerequisite embeddings, L2 distance
    Weighted,
}

impl RetrievalMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" | "doc" => Some(Self::Document),
            "weighted" | "hybrid" => Some(Self::Weighted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Weighted => "weighted",
        }
    }
}

/// Conversation and recommendation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorSettings {
    /// Phrases in a student message that end the intake conversation
    #[serde(rename = "endTriggers", default = "default_end_triggers")]
    pub end_triggers: Vec<String>,

    #[serde(rename = "retrievalMode", default)]
    pub retrieval_mode: RetrievalMode,

    /// Number of courses retrieved per query
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Context window assumed for recommendation prompts, in tokens
    #[serde(rename = "contextWindow", default = "default_context_window")]
    pub context_window: usize,

    #[serde(rename = "jsonMaxTokens", default = "default_json_max_tokens")]
    pub json_max_tokens: u32,

    #[serde(rename = "textMaxTokens", default = "default_text_max_tokens")]
    pub text_max_tokens: u32,

    /// Model override for the intake conversation
    #[serde(rename = "intakeModel", default)]
    pub intake_model: Option<String>,

    /// Model override for the recommenders
    #[serde(rename = "recommendModel", default)]
    pub recommend_model: Option<String>,

    /// Institution named in the advisor prompts
    #[serde(default = "default_institution")]
    pub institution: String,
}

fn default_end_triggers() -> Vec<String> {
    ["done", "that's all", "thank you", "thanks", "generate"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_institution() -> String {
    "the University of Toronto".to_string()
}

fn default_top_k() -> usize {
    10
}

fn default_context_window() -> usize {
    16383
}

fn default_json_max_tokens() -> u32 {
    4096
}

fn default_text_max_tokens() -> u32 {
    1000
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            end_triggers: default_end_triggers(),
            retrieval_mode: RetrievalMode::default(),
            top_k: default_top_k(),
            context_window: default_context_window(),
            json_max_tokens: default_json_max_tokens(),
            text_max_tokens: default_text_max_tokens(),
            intake_model: None,
            recommend_model: None,
            institution: default_institution(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    server: Option<ServerConfig>,
    advisor: Option<AdvisorSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_format: LogFormat::default(),
            llm: None,
            server: ServerConfig::default(),
            advisor: AdvisorSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a `.env` file, environment variables,
    /// the workspace config file and defaults.
    ///
    /// Environment variables:
    /// - `ADVISOR_WORKSPACE`: Override workspace path
    /// - `ADVISOR_CONFIG`: Path to config file
    /// - `ADVISOR_PROVIDER`: Chat provider
    /// - `ADVISOR_MODEL`: Model identifier
    /// - `ADVISOR_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    /// - `ADVISOR_LOG_FORMAT`: `text` or `json`
    ///
    /// # Example
    /// ```no_run
    /// use advisor_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        // A missing .env is normal outside development.
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded environment from .env");
        }

        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("ADVISOR_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("ADVISOR_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".advisor/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("ADVISOR_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("ADVISOR_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("ADVISOR_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        if let Ok(format) = std::env::var("ADVISOR_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format).ok_or_else(|| {
                AppError::Config(format!("Unknown ADVISOR_LOG_FORMAT: {}", format))
            })?;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        if let Some(advisor) = config_file.advisor {
            result.advisor = advisor;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .advisor directory.
    pub fn advisor_dir(&self) -> PathBuf {
        self.workspace.join(".advisor")
    }

    /// Ensure the .advisor directory exists.
    pub fn ensure_advisor_dir(&self) -> AppResult<()> {
        let advisor_dir = self.advisor_dir();
        if !advisor_dir.exists() {
            std::fs::create_dir_all(&advisor_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .advisor directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get a provider's configuration entry.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Name of the provider used for embeddings.
    pub fn embedding_provider(&self) -> String {
        self.llm
            .as_ref()
            .map(|llm| llm.active_embedding_provider.clone())
            .unwrap_or_else(|| self.provider.clone())
    }

    /// Environment variable holding the API key for a provider.
    pub fn api_key_env(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAiCompatible { api_key_env, .. }) => Some(api_key_env),
            Some(ProviderConfig::Ollama { .. }) => None,
            None => match provider {
                "openai" => Some("OPENAI_API_KEY".to_string()),
                "groq" => Some("GROQ_API_KEY".to_string()),
                _ => None,
            },
        }
    }

    /// Resolve the API key for a provider.
    ///
    /// An explicit `ADVISOR_API_KEY` wins over the provider's variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env(provider)
            .and_then(|env_var| std::env::var(env_var).ok())
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.api_key.is_none() {
            if let Some(env_var) = self.api_key_env(provider) {
                if std::env::var(&env_var).is_err() {
                    return Err(AppError::Config(format!(
                        "API key not found in environment variable: {}",
                        env_var
                    )));
                }
            }
        }

        if self.advisor.top_k == 0 {
            return Err(AppError::Config("advisor.topK must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.advisor.top_k, 10);
        assert_eq!(config.advisor.retrieval_mode, RetrievalMode::Document);
        assert!(config
            .advisor
            .end_triggers
            .contains(&"generate".to_string()));
    }

    #[test]
    fn test_advisor_dir() {
        let config = AppConfig::default();
        assert!(config.advisor_dir().ends_with(".advisor"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("groq".to_string()),
            Some("llama-3.1-8b-instant".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "groq");
        assert_eq!(overridden.model, "llama-3.1-8b-instant");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_explicit_key_skips_env() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_api_key("openai"), Some("sk-test".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: groq
  activeEmbeddingProvider: openai
  providers:
    groq:
      apiKeyEnv: MY_GROQ_KEY
      model: llama-3.1-70b-versatile
      endpoint: https://api.groq.com/openai/v1
    openai:
      apiKeyEnv: OPENAI_API_KEY
      model: gpt-4o
      embeddingModel: text-embedding-ada-002
    ollama:
      endpoint: http://localhost:11434
      model: llama3.2
server:
  port: 8080
advisor:
  retrievalMode: weighted
  topK: 5
logging:
  color: false
  format: json
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "groq");
        assert_eq!(merged.model, "llama-3.1-70b-versatile");
        assert_eq!(merged.embedding_provider(), "openai");
        assert_eq!(merged.server.port, 8080);
        assert_eq!(merged.server.host, "127.0.0.1");
        assert_eq!(merged.advisor.retrieval_mode, RetrievalMode::Weighted);
        assert_eq!(merged.advisor.top_k, 5);
        assert_eq!(merged.advisor.context_window, 16383);
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
        assert_eq!(merged.api_key_env("groq"), Some("MY_GROQ_KEY".to_string()));
        assert!(matches!(
            merged.get_provider_config("ollama"),
            Some(ProviderConfig::Ollama { .. })
        ));
        assert_eq!(
            merged
                .get_provider_config("openai")
                .and_then(|p| p.embedding_model().map(String::from)),
            Some("text-embedding-ada-002".to_string())
        );
    }

    #[test]
    fn test_retrieval_mode_parse() {
        assert_eq!(RetrievalMode::parse("hybrid"), Some(RetrievalMode::Weighted));
        assert_eq!(RetrievalMode::parse("Document"), Some(RetrievalMode::Document));
        assert_eq!(RetrievalMode::parse("bm25"), None);
    }
}
