//! Deduplication pass over existing knowledge.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TenetResult;
use crate::resolution::{ContradictionEngine, GroupResolution, ResolveOutcome};
use crate::traits::SearchParams;
use crate::types::{KnowledgeItem, KnowledgeKind, LifeArea};

/// Result of a dedup run.
#[derive(Debug, Clone, Default)]
pub struct DedupReport {
    /// Groups with at least two items that were checked.
    pub groups_checked: usize,
    /// Contradicted pairs found across all groups.
    pub contradictions_found: usize,
    /// Supersessions written.
    pub applied: usize,
    /// Decisions the store reported as no-ops.
    pub already_resolved: usize,
    /// The decisions, in the order they were applied.
    pub resolutions: Vec<GroupResolution>,
    /// Timestamp when the run started
    pub started_at: DateTime<Utc>,
    /// Timestamp when the run completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl DedupReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn complete(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Finds and resolves contradictions among an owner's existing items.
pub struct DedupPass {
    engine: Arc<ContradictionEngine>,
}

impl DedupPass {
    pub fn new(engine: Arc<ContradictionEngine>) -> Self {
        Self { engine }
    }

    /// Run over every active item the owner has.
    pub async fn run_for_owner(&self, owner_id: &str) -> TenetResult<DedupReport> {
        let items = self
            .engine
            .store()
            .search(owner_id, &SearchParams::new())
            .await?;
        self.run(owner_id, &items).await
    }

    /// Run over `items`. Items of other owners and inactive items are skipped.
    ///
    /// Groups are processed in (kind, area) order. A detector or store error
    /// stops the run; supersessions already written stay written.
    pub async fn run(&self, owner_id: &str, items: &[KnowledgeItem]) -> TenetResult<DedupReport> {
        let mut report = DedupReport::new();

        let mut groups: BTreeMap<(KnowledgeKind, Option<LifeArea>), Vec<KnowledgeItem>> =
            BTreeMap::new();
        for item in items
            .iter()
            .filter(|item| item.owner_id == owner_id && item.is_active())
        {
            groups
                .entry((item.kind, item.area))
                .or_default()
                .push(item.clone());
        }

        for ((kind, area), group) in groups {
            if group.len() < 2 {
                continue;
            }
            report.groups_checked += 1;

            let resolutions = self
                .engine
                .find_contradictions_in_group(owner_id, &group)
                .await?;
            report.contradictions_found += resolutions.len();

            for resolution in resolutions {
                let outcome = self
                    .engine
                    .resolve(
                        owner_id,
                        &resolution.supersede.id,
                        &resolution.keep.id,
                        &resolution.explanation,
                    )
                    .await?;
                match outcome {
                    ResolveOutcome::Superseded(_) => report.applied += 1,
                    ResolveOutcome::AlreadyResolved => report.already_resolved += 1,
                }
                tracing::debug!(
                    owner_id,
                    kind = %kind,
                    area = ?area,
                    keep = %resolution.keep.id,
                    supersede = %resolution.supersede.id,
                    "Dedup decision applied"
                );
                report.resolutions.push(resolution);
            }
        }

        let report = report.complete();
        tracing::info!(
            owner_id,
            groups = report.groups_checked,
            found = report.contradictions_found,
            applied = report.applied,
            already_resolved = report.already_resolved,
            "Dedup pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKnowledgeStore;
    use crate::traits::{KnowledgeStore, MockContradictionDetector};
    use crate::types::{BatchContradictionResult, ContradictionCheckResult};
    use chrono::TimeZone;

    fn item(id: &str, kind: KnowledgeKind, area: Option<LifeArea>, day: u32) -> KnowledgeItem {
        KnowledgeItem::new("user-1", kind, id)
            .with_id(id)
            .with_area(area)
            .with_created_at(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap())
    }

    fn contradiction(id: &str) -> BatchContradictionResult {
        BatchContradictionResult::new(id, ContradictionCheckResult::new(true, 0.9, "changed"))
    }

    #[tokio::test]
    async fn test_groups_by_kind_and_area() {
        let items = vec![
            item("home-1", KnowledgeKind::Fact, Some(LifeArea::Relationships), 1),
            item("home-2", KnowledgeKind::Fact, Some(LifeArea::Relationships), 2),
            item("money", KnowledgeKind::Fact, Some(LifeArea::Finance), 3),
            item("taste", KnowledgeKind::Preference, Some(LifeArea::Relationships), 4),
        ];

        let mut detector = MockContradictionDetector::new();
        detector
            .expect_batch_check_contradictions()
            .withf(|_, existing, _| existing.len() == 1 && existing[0].id == "home-2")
            .times(1)
            .returning(|_, _, _| Ok(vec![contradiction("home-2")]));

        let store = Arc::new(InMemoryKnowledgeStore::with_items(items.clone()));
        let engine = Arc::new(ContradictionEngine::new(store.clone(), Arc::new(detector)));
        let report = DedupPass::new(engine).run("user-1", &items).await.unwrap();

        assert_eq!(report.groups_checked, 1);
        assert_eq!(report.contradictions_found, 1);
        assert_eq!(report.applied, 1);
        assert!(report.completed_at.is_some());

        // Equal validation and confidence: the newer item wins
        let old = store.find_by_id("user-1", "home-1").await.unwrap().unwrap();
        assert_eq!(old.superseded_by_id(), Some("home-2"));
    }

    #[tokio::test]
    async fn test_counts_already_resolved() {
        let items = vec![
            item("a", KnowledgeKind::Fact, None, 1),
            item("b", KnowledgeKind::Fact, None, 2),
        ];
        let mut detector = MockContradictionDetector::new();
        detector
            .expect_batch_check_contradictions()
            .returning(|_, _, _| Ok(vec![contradiction("b")]));

        // The store already retired "a" elsewhere
        let store = Arc::new(InMemoryKnowledgeStore::with_items(items.clone()));
        store.supersede("user-1", "a", "elsewhere").await.unwrap();

        let engine = Arc::new(ContradictionEngine::new(store, Arc::new(detector)));
        let report = DedupPass::new(engine).run("user-1", &items).await.unwrap();

        assert_eq!(report.contradictions_found, 1);
        assert_eq!(report.applied, 0);
        assert_eq!(report.already_resolved, 1);
    }

    #[tokio::test]
    async fn test_run_for_owner_skips_inactive_items() {
        let items = vec![
            item("a", KnowledgeKind::Insight, None, 1),
            item("b", KnowledgeKind::Insight, None, 2),
        ];
        let mut detector = MockContradictionDetector::new();
        detector.expect_batch_check_contradictions().never();

        let store = Arc::new(InMemoryKnowledgeStore::with_items(items));
        store.soft_delete("user-1", "b").await.unwrap();

        let engine = Arc::new(ContradictionEngine::new(store, Arc::new(detector)));
        let report = DedupPass::new(engine).run_for_owner("user-1").await.unwrap();
        assert_eq!(report.groups_checked, 0);
    }
}
