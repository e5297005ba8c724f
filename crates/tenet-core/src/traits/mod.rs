//! Core traits: the LLM seam and the two ports the engine consumes.

mod contradiction_detector;
mod knowledge_store;
mod llm;

pub use contradiction_detector::*;
pub use knowledge_store::*;
pub use llm::*;
