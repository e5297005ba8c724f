//! Batch consolidation of existing knowledge.
//!
//! The dedup pass groups an owner's active items by (kind, area), finds
//! contradicted pairs inside each group and retires the losing side.

mod dedup;

pub use dedup::{DedupPass, DedupReport};
