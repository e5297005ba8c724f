//! In-memory knowledge store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{TenetError, TenetResult};
use crate::traits::{KnowledgeStore, SearchParams};
use crate::types::{KnowledgeItem, KnowledgeKind, LifeArea};

/// Knowledge items held in an id-keyed map.
///
/// Successor links are plain ids resolved by lookup, so supersession chains
/// never form owning references.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    items: RwLock<HashMap<String, KnowledgeItem>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = KnowledgeItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Self {
            items: RwLock::new(items),
        }
    }

    /// Number of stored items in any state.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

/// Most recent first, id as a stable tie-break.
fn sort_recent_first(items: &mut [KnowledgeItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn page(items: Vec<KnowledgeItem>, limit: Option<usize>, offset: usize) -> Vec<KnowledgeItem> {
    items
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn create(&self, item: KnowledgeItem) -> TenetResult<KnowledgeItem> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(TenetError::validation(format!(
                "Knowledge item '{}' already exists",
                item.id
            )));
        }
        items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn find_by_id(&self, owner_id: &str, item_id: &str) -> TenetResult<Option<KnowledgeItem>> {
        let items = self.items.read().await;
        Ok(items
            .get(item_id)
            .filter(|item| item.owner_id == owner_id)
            .cloned())
    }

    async fn find_active_by_scope(
        &self,
        owner_id: &str,
        kind: KnowledgeKind,
        area: Option<LifeArea>,
        limit: Option<usize>,
    ) -> TenetResult<Vec<KnowledgeItem>> {
        let items = self.items.read().await;
        let mut found: Vec<KnowledgeItem> = items
            .values()
            .filter(|item| {
                item.owner_id == owner_id && item.kind == kind && item.area == area && item.is_active()
            })
            .cloned()
            .collect();
        sort_recent_first(&mut found);
        Ok(page(found, limit, 0))
    }

    async fn supersede(
        &self,
        owner_id: &str,
        item_id: &str,
        superseded_by_id: &str,
    ) -> TenetResult<Option<KnowledgeItem>> {
        let mut items = self.items.write().await;
        let Some(item) = items
            .get_mut(item_id)
            .filter(|item| item.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if item.mark_superseded(superseded_by_id, Utc::now()) {
            Ok(Some(item.clone()))
        } else {
            Ok(None)
        }
    }

    async fn search(&self, owner_id: &str, params: &SearchParams) -> TenetResult<Vec<KnowledgeItem>> {
        let items = self.items.read().await;
        let mut found: Vec<KnowledgeItem> = items
            .values()
            .filter(|item| item.owner_id == owner_id && params.matches(item))
            .cloned()
            .collect();
        sort_recent_first(&mut found);
        Ok(page(found, params.limit, params.offset))
    }

    async fn find_superseded(
        &self,
        owner_id: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> TenetResult<Vec<KnowledgeItem>> {
        let items = self.items.read().await;
        let mut found: Vec<KnowledgeItem> = items
            .values()
            .filter(|item| item.owner_id == owner_id && item.is_superseded())
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.superseded_at()
                .cmp(&a.superseded_at())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(page(found, limit, offset))
    }

    async fn soft_delete(&self, owner_id: &str, item_id: &str) -> TenetResult<bool> {
        let mut items = self.items.write().await;
        match items
            .get_mut(item_id)
            .filter(|item| item.owner_id == owner_id && item.deleted_at.is_none())
        {
            Some(item) => {
                item.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
