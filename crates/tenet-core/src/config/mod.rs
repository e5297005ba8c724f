//! Configuration system for tenet.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::error::{TenetError, TenetResult};
use crate::traits::LlmConfig;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            config: LlmConfig {
                model: "gpt-4.1-nano-2025-04-14".to_string(),
                ..Default::default()
            },
        }
    }
}

/// Retry policy for detector LLM calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 disables retries)
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2.0_f32,
        }
    }
}

/// Settings for the LLM-backed contradiction detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sampling temperature; kept low for consistent judgments.
    pub temperature: f32,
    /// Completion budget per call.
    pub max_tokens: u32,
    /// Batches up to this size are checked one item at a time.
    pub single_check_max_items: usize,
    /// Backoff for transient LLM failures.
    pub retry: RetryPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 1000,
            single_check_max_items: 2,
            retry: RetryPolicy::default(),
        }
    }
}

/// Settings for the resolution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on existing items compared against a candidate.
    pub max_items_to_check: usize,
    /// Detector calls a group check keeps in flight at once (minimum 1).
    pub max_concurrent_checks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_items_to_check: 20,
            max_concurrent_checks: 4,
        }
    }
}

/// Main tenet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenetConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Detector configuration.
    pub detector: DetectorConfig,
    /// Engine configuration.
    pub engine: EngineConfig,
    /// Path to the knowledge database.
    pub database_path: PathBuf,
}

impl Default for TenetConfig {
    fn default() -> Self {
        let tenet_dir = dirs::home_dir()
            .map(|h| h.join(".tenet"))
            .unwrap_or_else(|| PathBuf::from(".tenet"));

        Self {
            llm: LlmProviderConfig::default(),
            detector: DetectorConfig::default(),
            engine: EngineConfig::default(),
            database_path: tenet_dir.join("knowledge.db"),
        }
    }
}

impl TenetConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TenetResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| TenetError::Configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| TenetError::Configuration(e.to_string()))
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| TenetError::Configuration(e.to_string()))
            }
            _ => Err(TenetError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> TenetResult<Self> {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("TENET_LLM_PROVIDER") {
            config.llm.provider = LlmProvider::from_str(&provider.to_lowercase())
                .map_err(|_| TenetError::invalid_enum("TENET_LLM_PROVIDER", provider))?;
            if config.llm.provider != LlmProvider::OpenAI {
                // The default model only exists on OpenAI
                config.llm.config.model = String::new();
            }
        }
        if let Ok(model) = std::env::var("TENET_LLM_MODEL") {
            config.llm.config.model = model;
        }

        let key_var = match config.llm.provider {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        };
        if let Some(api_key) = key_var.and_then(|var| std::env::var(var).ok()) {
            config.llm.config.api_key = Some(api_key);
        }

        if let Ok(max) = std::env::var("TENET_MAX_ITEMS_TO_CHECK") {
            config.engine.max_items_to_check = max.parse().map_err(|_| {
                TenetError::Configuration(format!("TENET_MAX_ITEMS_TO_CHECK is not a number: {}", max))
            })?;
        }

        if let Ok(path) = std::env::var("TENET_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> TenetConfigBuilder {
        TenetConfigBuilder::default()
    }
}

/// Builder for TenetConfig.
#[derive(Default)]
pub struct TenetConfigBuilder {
    config: TenetConfig,
}

impl TenetConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set detector configuration.
    pub fn detector(mut self, config: DetectorConfig) -> Self {
        self.config.detector = config;
        self
    }

    /// Set engine configuration.
    pub fn engine(mut self, config: EngineConfig) -> Self {
        self.config.engine = config;
        self
    }

    /// Set knowledge database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TenetConfig {
        self.config
    }
}
