//! Adding knowledge with contradiction handling.

use serde::Serialize;
use std::sync::Arc;

use crate::error::{TenetError, TenetResult};
use crate::resolution::{ContradictionEngine, ResolveOutcome};
use crate::types::{KnowledgeItem, NewKnowledgeItem};

/// An item retired by an add.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupersededInfo {
    pub item_id: String,
    pub content: String,
    pub reason: String,
}

/// Result of [`KnowledgeWriter::add`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddOutcome {
    /// The stored item.
    pub item: KnowledgeItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<SupersededInfo>,
}

/// Persists new knowledge and retires whatever it makes obsolete.
///
/// The contradiction check runs before the new item is stored and the
/// resolution after, so the successor id always refers to a persisted item.
pub struct KnowledgeWriter {
    engine: Arc<ContradictionEngine>,
}

impl KnowledgeWriter {
    pub fn new(engine: Arc<ContradictionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ContradictionEngine> {
        &self.engine
    }

    /// Add a knowledge item for `owner_id`.
    pub async fn add(&self, owner_id: &str, new_item: NewKnowledgeItem) -> TenetResult<AddOutcome> {
        if new_item.content.trim().is_empty() {
            return Err(TenetError::validation("Knowledge content must not be empty"));
        }

        let item = new_item.into_item(owner_id);
        let check = self
            .engine
            .check_before_add(owner_id, &item.content, item.kind, item.area)
            .await?;

        let item = self.engine.store().create(item).await?;
        tracing::info!(owner_id, item_id = %item.id, title = %item.title, "Knowledge item added");

        let superseded = match (check.should_supersede, check.explanation) {
            (Some(old), explanation) => {
                let reason = explanation.unwrap_or_default();
                match self.engine.resolve(owner_id, &old.id, &item.id, &reason).await? {
                    ResolveOutcome::Superseded(_) => Some(SupersededInfo {
                        item_id: old.id,
                        content: old.content,
                        reason,
                    }),
                    ResolveOutcome::AlreadyResolved => None,
                }
            }
            (None, _) => None,
        };

        Ok(AddOutcome { item, superseded })
    }
}
