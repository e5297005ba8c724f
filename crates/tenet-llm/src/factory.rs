//! Factory for creating LLM providers.

use std::sync::Arc;

use tenet_core::config::{LlmProvider, LlmProviderConfig};
use tenet_core::error::TenetResult;
use tenet_core::traits::{Llm, LlmConfig};

use crate::anthropic::AnthropicLlm;
use crate::ollama::OllamaLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> TenetResult<Arc<dyn Llm>> {
        tracing::debug!(%provider, model = %config.model, "Creating LLM provider");
        match provider {
            LlmProvider::OpenAI => Ok(Arc::new(OpenAIProvider::new(config)?)),
            LlmProvider::Anthropic => Ok(Arc::new(AnthropicLlm::new(config)?)),
            LlmProvider::Ollama => Ok(Arc::new(OllamaLlm::new(config)?)),
        }
    }

    /// Create the provider described by a config section.
    pub fn from_config(config: &LlmProviderConfig) -> TenetResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> TenetResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::OpenAI, Self::model_config(model))
    }

    /// Create an Anthropic LLM provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> TenetResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Anthropic, Self::model_config(model))
    }

    /// Create an Ollama LLM provider with a specific model.
    pub fn ollama_with_model(model: impl Into<String>) -> TenetResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Ollama, Self::model_config(model))
    }

    fn model_config(model: impl Into<String>) -> LlmConfig {
        LlmConfig {
            model: model.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_provider_and_model() {
        let config = LlmProviderConfig {
            provider: LlmProvider::Ollama,
            config: LlmConfig {
                model: "qwen2.5:7b".to_string(),
                ..Default::default()
            },
        };
        let llm = LlmFactory::from_config(&config).unwrap();
        assert_eq!(llm.model_name(), "qwen2.5:7b");
    }

    #[test]
    fn test_missing_key_is_a_configuration_error() {
        let config = LlmConfig {
            base_url: Some("http://localhost:9".to_string()),
            ..Default::default()
        };
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            let err = LlmFactory::create(LlmProvider::Anthropic, config).err().unwrap();
            assert!(matches!(err, tenet_core::TenetError::Configuration(_)));
        }
    }
}
