//! LLM-backed contradiction detection.
//!
//! The engine only sees the [`ContradictionDetector`](crate::traits::ContradictionDetector)
//! port; this module provides the production implementation on top of any
//! [`Llm`](crate::traits::Llm).

mod json_parser;
mod llm_detector;
pub mod prompts;

pub use json_parser::{parse_batch_results, parse_check_result, remove_code_blocks};
pub use llm_detector::LlmContradictionDetector;
