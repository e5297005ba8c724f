//! The contradiction resolution engine.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

use super::group::{anchor_batches, unique_by_id, PairLedger};
use super::tie_break::{self, TieBreakRule};
use crate::config::EngineConfig;
use crate::error::TenetResult;
use crate::traits::{ContradictionDetector, KnowledgeStore};
use crate::types::{
    BatchContradictionResult, ContradictionContext, ExistingItemForCheck, KnowledgeItem,
    KnowledgeKind, LifeArea,
};

/// Advice returned before a candidate is persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckBeforeAdd {
    /// Existing item the candidate makes obsolete.
    pub should_supersede: Option<KnowledgeItem>,
    /// Detector explanation, present whenever `should_supersede` is.
    pub explanation: Option<String>,
}

impl CheckBeforeAdd {
    /// No qualifying contradiction.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_contradiction(&self) -> bool {
        self.should_supersede.is_some()
    }
}

/// What a call to [`ContradictionEngine::resolve`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The old item is now superseded; carries its updated state.
    Superseded(KnowledgeItem),
    /// Nothing changed: the old item was missing, already superseded, or
    /// the ids were equal.
    AlreadyResolved,
}

impl ResolveOutcome {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded(_))
    }
}

/// One contradicted pair found inside a group, with the loser identified.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResolution {
    pub keep: KnowledgeItem,
    pub supersede: KnowledgeItem,
    pub explanation: String,
    /// Rule that picked `keep` over `supersede`.
    pub rule: TieBreakRule,
}

/// Detects contradictions and retires superseded knowledge.
///
/// The engine holds no state of its own between calls: every decision is
/// made from what the store and the detector report at call time, and
/// errors from either are returned unchanged.
pub struct ContradictionEngine {
    store: Arc<dyn KnowledgeStore>,
    detector: Arc<dyn ContradictionDetector>,
    config: EngineConfig,
}

impl ContradictionEngine {
    pub fn new(store: Arc<dyn KnowledgeStore>, detector: Arc<dyn ContradictionDetector>) -> Self {
        Self::with_config(store, detector, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn KnowledgeStore>,
        detector: Arc<dyn ContradictionDetector>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            detector,
            config,
        }
    }

    /// The store this engine reads from and resolves into.
    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find the existing item a candidate statement would make obsolete.
    ///
    /// Compares the candidate against the most recent active items in the
    /// exact (owner, kind, area) scope with a single batched detector call.
    /// Only flagged results at or above the confidence threshold count; of
    /// those, the most confident wins. Never writes to the store.
    pub async fn check_before_add(
        &self,
        owner_id: &str,
        candidate_content: &str,
        kind: KnowledgeKind,
        area: Option<LifeArea>,
    ) -> TenetResult<CheckBeforeAdd> {
        let mut existing = self
            .store
            .find_active_by_scope(owner_id, kind, area, Some(self.config.max_items_to_check))
            .await?;

        if existing.is_empty() {
            return Ok(CheckBeforeAdd::none());
        }

        tracing::debug!(
            owner_id,
            kind = %kind,
            area = ?area,
            count = existing.len(),
            "Checking existing items for contradictions"
        );

        let for_check: Vec<ExistingItemForCheck> = existing.iter().map(Into::into).collect();
        let results = self
            .detector
            .batch_check_contradictions(
                candidate_content,
                &for_check,
                &ContradictionContext::new(kind, area),
            )
            .await?;

        let Some((index, top)) = strongest_known(&existing, results) else {
            return Ok(CheckBeforeAdd::none());
        };

        let item = existing.swap_remove(index);
        tracing::info!(
            owner_id,
            item_id = %item.id,
            confidence = top.result.confidence,
            explanation = %top.result.explanation,
            "Contradiction detected"
        );

        Ok(CheckBeforeAdd {
            should_supersede: Some(item),
            explanation: Some(top.result.explanation),
        })
    }

    /// Retire `old_item_id` in favor of `new_item_id`.
    ///
    /// Idempotent: when the store reports no change the call succeeds with
    /// [`ResolveOutcome::AlreadyResolved`]. `explanation` is logged only.
    pub async fn resolve(
        &self,
        owner_id: &str,
        old_item_id: &str,
        new_item_id: &str,
        explanation: &str,
    ) -> TenetResult<ResolveOutcome> {
        match self.store.supersede(owner_id, old_item_id, new_item_id).await? {
            Some(updated) => {
                tracing::info!(
                    owner_id,
                    old_item_id,
                    new_item_id,
                    explanation,
                    "Knowledge item superseded"
                );
                Ok(ResolveOutcome::Superseded(updated))
            }
            None => {
                tracing::warn!(
                    owner_id,
                    old_item_id,
                    new_item_id,
                    "Supersede was a no-op, item may already be superseded"
                );
                Ok(ResolveOutcome::AlreadyResolved)
            }
        }
    }

    /// Find contradicted pairs within `items` and decide which side of each
    /// to keep.
    ///
    /// Every unordered pair is evaluated once: item `i` is the candidate in
    /// one batched call against items `i+1..n`, using its own kind and area
    /// as context. At most `max_concurrent_checks` batches are in flight;
    /// results come back in input order. Each pair is decided on its own, without chaining across
    /// pairs. Never writes to the store.
    pub async fn find_contradictions_in_group(
        &self,
        owner_id: &str,
        items: &[KnowledgeItem],
    ) -> TenetResult<Vec<GroupResolution>> {
        let unique = unique_by_id(items);
        if unique.len() < 2 {
            return Ok(Vec::new());
        }

        let requests: Vec<(&KnowledgeItem, &[&KnowledgeItem], Vec<ExistingItemForCheck>)> =
            anchor_batches(&unique)
                .map(|(anchor, rest)| {
                    let for_check = rest.iter().map(|item| ExistingItemForCheck::from(*item)).collect();
                    (anchor, rest, for_check)
                })
                .collect();

        tracing::debug!(
            owner_id,
            items = unique.len(),
            batches = requests.len(),
            "Checking group for contradictions"
        );

        let detector = &self.detector;
        let batches: Vec<Vec<BatchContradictionResult>> =
            stream::iter(requests.iter().map(|(anchor, _, for_check)| {
                let context = ContradictionContext::for_item(anchor);
                async move {
                    detector
                        .batch_check_contradictions(&anchor.content, for_check, &context)
                        .await
                }
            }))
            .buffered(self.config.max_concurrent_checks.max(1))
            .try_collect()
            .await?;

        let mut ledger = PairLedger::default();
        let mut resolutions = Vec::new();

        for ((anchor, rest, _), results) in requests.iter().zip(batches) {
            for result in results.into_iter().filter(|r| r.result.qualifies()) {
                let Some(other) = rest.iter().find(|item| item.id == result.item_id) else {
                    tracing::warn!(
                        owner_id,
                        anchor_id = %anchor.id,
                        item_id = %result.item_id,
                        "Detector returned an item outside the batch, ignoring"
                    );
                    continue;
                };
                if !ledger.record(&anchor.id, &other.id) {
                    continue;
                }

                let decision = tie_break::decide(anchor, other);
                tracing::info!(
                    owner_id,
                    keep = %decision.keep.id,
                    supersede = %decision.supersede.id,
                    rule = %decision.rule,
                    confidence = result.result.confidence,
                    "Contradiction found in group"
                );
                resolutions.push(GroupResolution {
                    keep: decision.keep.clone(),
                    supersede: decision.supersede.clone(),
                    explanation: result.result.explanation,
                    rule: decision.rule,
                });
            }
        }

        Ok(resolutions)
    }
}

/// The highest-confidence qualifying result that names a fetched item,
/// with that item's index. Earlier results win exact ties.
fn strongest_known(
    existing: &[KnowledgeItem],
    results: Vec<BatchContradictionResult>,
) -> Option<(usize, BatchContradictionResult)> {
    let mut best: Option<(usize, BatchContradictionResult)> = None;

    for result in results.into_iter().filter(|r| r.result.qualifies()) {
        let Some(index) = existing.iter().position(|item| item.id == result.item_id) else {
            tracing::warn!(item_id = %result.item_id, "Contradiction names an unknown item, ignoring");
            continue;
        };
        let stronger = best
            .as_ref()
            .map_or(true, |(_, current)| result.result.confidence > current.result.confidence);
        if stronger {
            best = Some((index, result));
        }
    }

    best
}
