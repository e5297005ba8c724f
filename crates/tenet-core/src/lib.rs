//! tenet-core - Core library for tenet.
//!
//! This crate keeps a personal knowledge base consistent as a user's life
//! changes. New statements are checked against active knowledge in the same
//! (owner, kind, area) scope; a statement that makes an older one obsolete
//! retires it through an append-only supersession link instead of deleting
//! it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tenet_core::{
//!     ContradictionEngine, KnowledgeKind, KnowledgeWriter, LifeArea, LlmContradictionDetector,
//!     NewKnowledgeItem, SqliteKnowledgeStore, TenetConfig,
//! };
//!
//! let config = TenetConfig::from_env()?;
//! let store = Arc::new(SqliteKnowledgeStore::from_config(&config)?);
//! let detector = Arc::new(LlmContradictionDetector::with_config(llm, config.detector.clone()));
//! let engine = Arc::new(ContradictionEngine::with_config(store, detector, config.engine.clone()));
//!
//! let writer = KnowledgeWriter::new(engine);
//! let outcome = writer
//!     .add(
//!         "user-1",
//!         NewKnowledgeItem::new(KnowledgeKind::Fact, "User is in a relationship")
//!             .with_area(LifeArea::Relationships),
//!     )
//!     .await?;
//! ```

pub mod config;
pub mod consolidation;
pub mod detector;
pub mod error;
pub mod resolution;
pub mod store;
pub mod traits;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::{DetectorConfig, EngineConfig, LlmProvider, LlmProviderConfig, TenetConfig};
pub use consolidation::{DedupPass, DedupReport};
pub use detector::LlmContradictionDetector;
pub use error::{ErrorCode, TenetError, TenetResult};
pub use resolution::{
    CheckBeforeAdd, ContradictionEngine, GroupResolution, ResolveOutcome, TieBreakRule,
};
pub use store::{InMemoryKnowledgeStore, SqliteKnowledgeStore};
pub use traits::{ContradictionDetector, KnowledgeStore, Llm, LlmConfig, SearchParams};
pub use types::{
    BatchContradictionResult, ContradictionCheckResult, ContradictionContext, ExistingItemForCheck,
    KnowledgeItem, KnowledgeKind, KnowledgeSource, LifeArea, Message, MessageRole,
    NewKnowledgeItem, Scope, Supersession, CONTRADICTION_CONFIDENCE_THRESHOLD,
};
pub use writer::{AddOutcome, KnowledgeWriter, SupersededInfo};
