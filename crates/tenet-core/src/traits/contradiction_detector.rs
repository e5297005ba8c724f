//! Contradiction detector port.

use async_trait::async_trait;

use crate::error::TenetResult;
use crate::types::{
    BatchContradictionResult, ContradictionCheckResult, ContradictionContext, ExistingItemForCheck,
};

/// Oracle judging whether a new statement makes existing ones obsolete.
///
/// Implementations own any retry or fallback policy. Errors they return are
/// passed through the engine untouched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContradictionDetector: Send + Sync {
    /// Compare a candidate against a single existing statement.
    async fn check_contradiction(
        &self,
        new_content: &str,
        existing_content: &str,
        context: &ContradictionContext,
    ) -> TenetResult<ContradictionCheckResult>;

    /// Compare a candidate against many existing items in one round trip.
    ///
    /// Returns one result per item, in the order given.
    async fn batch_check_contradictions(
        &self,
        new_content: &str,
        existing: &[ExistingItemForCheck],
        context: &ContradictionContext,
    ) -> TenetResult<Vec<BatchContradictionResult>>;
}
