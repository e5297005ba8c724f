//! tenet-llm - LLM provider implementations for tenet.
//!
//! These providers back [`tenet_core::LlmContradictionDetector`], which asks
//! a model whether a new statement makes older knowledge obsolete.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - GPT-4.1, GPT-4o, etc.
//! - **Anthropic** (feature: `anthropic`) - Claude models over the Messages API
//! - **Ollama** (feature: `ollama`) - Local models via Ollama
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tenet_core::{
//!     ContradictionEngine, LlmContradictionDetector, SqliteKnowledgeStore, TenetConfig,
//! };
//! use tenet_llm::LlmFactory;
//!
//! let config = TenetConfig::from_env()?;
//! let llm = LlmFactory::from_config(&config.llm)?;
//! let store = Arc::new(SqliteKnowledgeStore::from_config(&config)?);
//! let detector = Arc::new(LlmContradictionDetector::with_config(llm, config.detector.clone()));
//! let engine = ContradictionEngine::with_config(store, detector, config.engine);
//! ```

mod anthropic;
mod factory;
mod ollama;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use ollama::OllamaLlm;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use tenet_core::config::{LlmProvider, LlmProviderConfig};
pub use tenet_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
