//! Knowledge item types.
//!
//! A knowledge item is one atomic fact, preference, memory, insight or person
//! note belonging to a single owner. Items are never deleted by contradiction
//! handling: a retired item keeps its row and gains a [`Supersession`] that
//! points at its successor by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Title length limit, including the kind label.
const TITLE_MAX_CHARS: usize = 95;

/// Default confidence for items created without an explicit value.
pub const DEFAULT_ITEM_CONFIDENCE: f32 = 0.9;

/// Kind of knowledge an item holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KnowledgeKind {
    Fact,
    Preference,
    Memory,
    Insight,
    Person,
}

impl KnowledgeKind {
    /// Human readable label used in titles and detector prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fact => "Fact",
            Self::Preference => "Preference",
            Self::Memory => "Memory",
            Self::Insight => "Insight",
            Self::Person => "Person",
        }
    }
}

/// Life domain an item belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifeArea {
    Health,
    Finance,
    Professional,
    Learning,
    Spiritual,
    Relationships,
}

impl LifeArea {
    /// Human readable label used in detector prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Finance => "Finance",
            Self::Professional => "Professional",
            Self::Learning => "Learning",
            Self::Spiritual => "Spiritual",
            Self::Relationships => "Relationships",
        }
    }
}

/// Where an item came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KnowledgeSource {
    #[default]
    Conversation,
    AiInference,
    UserInput,
}

/// Record of an item being retired in favor of a successor.
///
/// The successor id and the timestamp only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supersession {
    /// Id of the item that replaced this one.
    pub by: String,
    /// When the replacement happened.
    pub at: DateTime<Utc>,
}

/// The (owner, kind, area) tuple bounding contradiction comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub owner_id: String,
    pub kind: KnowledgeKind,
    pub area: Option<LifeArea>,
}

/// A knowledge item stored in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Unique identifier for the item.
    pub id: String,
    /// Owner (user) the item belongs to.
    pub owner_id: String,
    /// Kind of knowledge.
    pub kind: KnowledgeKind,
    /// Life area, if classified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<LifeArea>,
    /// Short title.
    pub title: String,
    /// The knowledge itself.
    pub content: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Origin of the item.
    pub source: KnowledgeSource,
    /// Whether the owner confirmed the item.
    #[serde(default)]
    pub validated_by_user: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set once the item has been superseded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersession: Option<Supersession>,
    /// Soft-delete timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl KnowledgeItem {
    /// Create a new active item with a fresh id.
    pub fn new(
        owner_id: impl Into<String>,
        kind: KnowledgeKind,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            kind,
            area: None,
            title: generate_title(&content, kind),
            content,
            confidence: DEFAULT_ITEM_CONFIDENCE,
            source: KnowledgeSource::default(),
            validated_by_user: false,
            created_at: Utc::now(),
            supersession: None,
            deleted_at: None,
        }
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the life area.
    pub fn with_area(mut self, area: impl Into<Option<LifeArea>>) -> Self {
        self.area = area.into();
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: KnowledgeSource) -> Self {
        self.source = source;
        self
    }

    /// Mark whether the owner validated the item.
    pub fn with_validated_by_user(mut self, validated: bool) -> Self {
        self.validated_by_user = validated;
        self
    }

    /// Set created_at timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// The (owner, kind, area) scope of this item.
    pub fn scope(&self) -> Scope {
        Scope {
            owner_id: self.owner_id.clone(),
            kind: self.kind,
            area: self.area,
        }
    }

    /// Neither superseded nor soft-deleted.
    pub fn is_active(&self) -> bool {
        self.supersession.is_none() && self.deleted_at.is_none()
    }

    pub fn is_superseded(&self) -> bool {
        self.supersession.is_some()
    }

    /// Id of the successor, if superseded.
    pub fn superseded_by_id(&self) -> Option<&str> {
        self.supersession.as_ref().map(|s| s.by.as_str())
    }

    /// When the item was superseded, if it was.
    pub fn superseded_at(&self) -> Option<DateTime<Utc>> {
        self.supersession.as_ref().map(|s| s.at)
    }

    /// Retire this item in favor of `successor_id`.
    ///
    /// Returns `false` and leaves the item untouched when it is already
    /// superseded or when `successor_id` is its own id.
    pub fn mark_superseded(&mut self, successor_id: &str, at: DateTime<Utc>) -> bool {
        if self.supersession.is_some() || successor_id == self.id {
            return false;
        }
        self.supersession = Some(Supersession {
            by: successor_id.to_string(),
            at,
        });
        true
    }
}

/// Input for adding a new item through a writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKnowledgeItem {
    pub kind: KnowledgeKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<LifeArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub source: KnowledgeSource,
    #[serde(default)]
    pub validated_by_user: bool,
}

impl NewKnowledgeItem {
    pub fn new(kind: KnowledgeKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            area: None,
            title: None,
            confidence: None,
            source: KnowledgeSource::default(),
            validated_by_user: false,
        }
    }

    pub fn with_area(mut self, area: LifeArea) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_source(mut self, source: KnowledgeSource) -> Self {
        self.source = source;
        self
    }

    /// Build the item to persist for `owner_id`.
    ///
    /// An empty title counts as absent and is generated from the content.
    pub fn into_item(self, owner_id: impl Into<String>) -> KnowledgeItem {
        let mut item = KnowledgeItem::new(owner_id, self.kind, self.content)
            .with_area(self.area)
            .with_confidence(self.confidence.unwrap_or(DEFAULT_ITEM_CONFIDENCE))
            .with_source(self.source)
            .with_validated_by_user(self.validated_by_user);
        if let Some(title) = self.title.filter(|t| !t.is_empty()) {
            item.title = title;
        }
        item
    }
}

/// Build a title as "<Kind>: <first sentence>", truncated with an ellipsis.
pub fn generate_title(content: &str, kind: KnowledgeKind) -> String {
    let label = kind.label();
    let chars: Vec<char> = content.chars().collect();

    if let Some(end) = chars.iter().position(|c| matches!(c, '.' | '!' | '?')) {
        if end < TITLE_MAX_CHARS {
            let sentence: String = chars[..=end].iter().collect();
            return format!("{}: {}", label, sentence);
        }
    }

    let max_content = TITLE_MAX_CHARS - label.len();
    if chars.len() <= max_content {
        return format!("{}: {}", label, content);
    }
    let truncated: String = chars[..max_content - 3].iter().collect();
    format!("{}: {}...", label, truncated)
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_item_is_active() {
        let item = KnowledgeItem::new("user-1", KnowledgeKind::Fact, "User is single");
        assert!(item.is_active());
        assert!(!item.is_superseded());
        assert_eq!(item.confidence, DEFAULT_ITEM_CONFIDENCE);
        assert_eq!(item.title, "Fact: User is single");
    }

    #[test]
    fn test_mark_superseded_sets_pair_once() {
        let mut item = KnowledgeItem::new("user-1", KnowledgeKind::Fact, "x").with_id("old");
        let at = Utc::now();

        assert!(item.mark_superseded("new", at));
        assert_eq!(item.superseded_by_id(), Some("new"));
        assert_eq!(item.superseded_at(), Some(at));
        assert!(!item.is_active());

        // Terminal: a second successor is refused
        assert!(!item.mark_superseded("newer", Utc::now()));
        assert_eq!(item.superseded_by_id(), Some("new"));
    }

    #[test]
    fn test_mark_superseded_refuses_self() {
        let mut item = KnowledgeItem::new("user-1", KnowledgeKind::Fact, "x").with_id("same");
        assert!(!item.mark_superseded("same", Utc::now()));
        assert!(item.supersession.is_none());
    }

    #[test]
    fn test_soft_deleted_item_is_inactive() {
        let mut item = KnowledgeItem::new("user-1", KnowledgeKind::Memory, "x");
        item.deleted_at = Some(Utc::now());
        assert!(!item.is_active());
        assert!(!item.is_superseded());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let item = KnowledgeItem::new("u", KnowledgeKind::Fact, "x").with_confidence(1.7);
        assert_eq!(item.confidence, 1.0);
        let item = item.with_confidence(-0.2);
        assert_eq!(item.confidence, 0.0);
    }

    #[test]
    fn test_enum_string_forms() {
        assert_eq!(KnowledgeSource::AiInference.to_string(), "ai_inference");
        assert_eq!(LifeArea::from_str("relationships").unwrap(), LifeArea::Relationships);
        assert!(KnowledgeKind::from_str("rumor").is_err());
    }

    #[test]
    fn test_generate_title_first_sentence() {
        let title = generate_title("Lives in Lisbon. Moved in 2023.", KnowledgeKind::Fact);
        assert_eq!(title, "Fact: Lives in Lisbon.");
    }

    #[test]
    fn test_generate_title_truncates_long_content() {
        let content = "a".repeat(200);
        let title = generate_title(&content, KnowledgeKind::Preference);
        assert!(title.starts_with("Preference: "));
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 2);
    }

    #[test]
    fn test_new_knowledge_item_into_item() {
        let item = NewKnowledgeItem::new(KnowledgeKind::Fact, "Works as a nurse")
            .with_area(LifeArea::Professional)
            .with_title("")
            .with_confidence(3.0)
            .into_item("user-1");

        assert_eq!(item.owner_id, "user-1");
        assert_eq!(item.area, Some(LifeArea::Professional));
        assert_eq!(item.title, "Fact: Works as a nurse");
        assert_eq!(item.confidence, 1.0);
    }

    #[test]
    fn test_serialization_omits_empty_supersession() {
        let item = KnowledgeItem::new("u", KnowledgeKind::Insight, "x");
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("supersession"));
        assert!(!json.contains("deleted_at"));
        assert!(json.contains("\"kind\":\"insight\""));
    }
}
