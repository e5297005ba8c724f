//! Knowledge store port.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::TenetResult;
use crate::types::{KnowledgeItem, KnowledgeKind, KnowledgeSource, LifeArea};

/// Filters for listing an owner's items.
///
/// By default only active items are returned; superseded and soft-deleted
/// items must be asked for explicitly.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Case-insensitive substring match on title or content.
    pub query: Option<String>,
    pub kind: Option<KnowledgeKind>,
    pub area: Option<LifeArea>,
    pub source: Option<KnowledgeSource>,
    pub min_confidence: Option<f32>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub include_superseded: bool,
    pub include_deleted: bool,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn kind(mut self, kind: KnowledgeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn area(mut self, area: LifeArea) -> Self {
        self.area = Some(area);
        self
    }

    pub fn source(mut self, source: KnowledgeSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn min_confidence(mut self, min: f32) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn include_superseded(mut self, include: bool) -> Self {
        self.include_superseded = include;
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Whether `item` passes every filter except ownership and paging.
    pub fn matches(&self, item: &KnowledgeItem) -> bool {
        if !self.include_superseded && item.is_superseded() {
            return false;
        }
        if !self.include_deleted && item.deleted_at.is_some() {
            return false;
        }
        if self.kind.is_some_and(|k| k != item.kind) {
            return false;
        }
        if self.area.is_some() && self.area != item.area {
            return false;
        }
        if self.source.is_some_and(|s| s != item.source) {
            return false;
        }
        if self.min_confidence.is_some_and(|min| item.confidence < min) {
            return false;
        }
        self.matches_query(item)
    }

    /// Case-insensitive substring match of `query` against content or
    /// title. Folding is Unicode-aware; no query matches everything.
    pub fn matches_query(&self, item: &KnowledgeItem) -> bool {
        let Some(query) = &self.query else {
            return true;
        };
        let needle = query.to_lowercase();
        item.content.to_lowercase().contains(&needle) || item.title.to_lowercase().contains(&needle)
    }
}

/// Persistence port for knowledge items.
///
/// Every operation is scoped by owner; an item belonging to another owner is
/// indistinguishable from a missing one.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Persist a new item.
    async fn create(&self, item: KnowledgeItem) -> TenetResult<KnowledgeItem>;

    /// Find an item by id, regardless of its state.
    async fn find_by_id(&self, owner_id: &str, item_id: &str) -> TenetResult<Option<KnowledgeItem>>;

    /// Active (non-superseded, non-deleted) items in the exact
    /// (owner, kind, area) scope, most recent first.
    ///
    /// `area = None` matches only items without an area.
    async fn find_active_by_scope(
        &self,
        owner_id: &str,
        kind: KnowledgeKind,
        area: Option<LifeArea>,
        limit: Option<usize>,
    ) -> TenetResult<Vec<KnowledgeItem>>;

    /// Atomically mark `item_id` as superseded by `superseded_by_id`.
    ///
    /// Returns `None` when nothing changed: the item is missing, already
    /// superseded, or `superseded_by_id` is its own id.
    async fn supersede(
        &self,
        owner_id: &str,
        item_id: &str,
        superseded_by_id: &str,
    ) -> TenetResult<Option<KnowledgeItem>>;

    /// List items matching `params`, most recent first.
    async fn search(&self, owner_id: &str, params: &SearchParams) -> TenetResult<Vec<KnowledgeItem>>;

    /// Superseded items, most recently superseded first.
    async fn find_superseded(
        &self,
        owner_id: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> TenetResult<Vec<KnowledgeItem>>;

    /// Soft delete an item. Returns `false` if it was missing or already deleted.
    async fn soft_delete(&self, owner_id: &str, item_id: &str) -> TenetResult<bool>;

    /// Follow successor ids from `item_id` to the current head.
    ///
    /// The first element is the item itself. The walk stops at an item that
    /// is not superseded, at a successor id that does not resolve, or at an
    /// id already visited.
    async fn supersession_chain(
        &self,
        owner_id: &str,
        item_id: &str,
    ) -> TenetResult<Vec<KnowledgeItem>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(item_id.to_string());

        while let Some(id) = next.take() {
            if !visited.insert(id.clone()) {
                tracing::warn!(owner_id, item_id = %id, "Supersession cycle detected");
                break;
            }
            let Some(item) = self.find_by_id(owner_id, &id).await? else {
                break;
            };
            next = item.superseded_by_id().map(str::to_string);
            chain.push(item);
        }

        Ok(chain)
    }
}
