//! Contradiction judgments exchanged with a detector.

use serde::{Deserialize, Serialize};

use super::knowledge_item::{clamp_unit, KnowledgeItem, KnowledgeKind, LifeArea};

/// Minimum detector confidence required to act on a contradiction.
///
/// Results below it are noise, whatever their `is_contradiction` flag says.
pub const CONTRADICTION_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// One detector judgment for a (candidate, existing item) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionCheckResult {
    pub is_contradiction: bool,
    /// Clamped to [0, 1].
    pub confidence: f32,
    pub explanation: String,
}

impl ContradictionCheckResult {
    pub fn new(is_contradiction: bool, confidence: f32, explanation: impl Into<String>) -> Self {
        Self {
            is_contradiction,
            confidence: clamp_unit(confidence),
            explanation: explanation.into(),
        }
    }

    /// A zero-confidence "no contradiction" placeholder.
    pub fn not_analyzed(reason: impl Into<String>) -> Self {
        Self::new(false, 0.0, reason)
    }

    /// Flagged as a contradiction at or above the confidence threshold.
    pub fn qualifies(&self) -> bool {
        self.is_contradiction && self.confidence >= CONTRADICTION_CONFIDENCE_THRESHOLD
    }
}

/// Judgment for one existing item in a batched detector call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchContradictionResult {
    pub item_id: String,
    pub result: ContradictionCheckResult,
}

impl BatchContradictionResult {
    pub fn new(item_id: impl Into<String>, result: ContradictionCheckResult) -> Self {
        Self {
            item_id: item_id.into(),
            result,
        }
    }
}

/// Scope hints passed to the detector alongside the statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContradictionContext {
    pub kind: KnowledgeKind,
    pub area: Option<LifeArea>,
}

impl ContradictionContext {
    pub fn new(kind: KnowledgeKind, area: Option<LifeArea>) -> Self {
        Self { kind, area }
    }

    pub fn for_item(item: &KnowledgeItem) -> Self {
        Self::new(item.kind, item.area)
    }

    pub fn area_label(&self) -> &'static str {
        self.area.map(|a| a.label()).unwrap_or("Unspecified")
    }
}

/// Existing item as presented to the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingItemForCheck {
    pub id: String,
    pub content: String,
    pub title: Option<String>,
}

impl ExistingItemForCheck {
    /// "<title>: <content>" when titled, otherwise the bare content.
    pub fn display_text(&self) -> String {
        match self.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => format!("{}: {}", title, self.content),
            None => self.content.clone(),
        }
    }
}

impl From<&KnowledgeItem> for ExistingItemForCheck {
    fn from(item: &KnowledgeItem) -> Self {
        Self {
            id: item.id.clone(),
            content: item.content.clone(),
            title: Some(item.title.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_never_qualifies() {
        assert!(!ContradictionCheckResult::new(true, 0.69, "close").qualifies());
        assert!(ContradictionCheckResult::new(true, 0.7, "at threshold").qualifies());
        assert!(!ContradictionCheckResult::new(false, 0.99, "confident no").qualifies());
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(ContradictionCheckResult::new(true, 1.4, "").confidence, 1.0);
        assert_eq!(ContradictionCheckResult::new(true, f32::NAN, "").confidence, 0.0);
    }

    #[test]
    fn test_display_text() {
        let with_title = ExistingItemForCheck {
            id: "1".to_string(),
            content: "User is single".to_string(),
            title: Some("Fact: User is single".to_string()),
        };
        assert_eq!(with_title.display_text(), "Fact: User is single: User is single");

        let bare = ExistingItemForCheck {
            title: None,
            ..with_title
        };
        assert_eq!(bare.display_text(), "User is single");
    }

    #[test]
    fn test_context_area_label() {
        let ctx = ContradictionContext::new(KnowledgeKind::Fact, None);
        assert_eq!(ctx.area_label(), "Unspecified");
        let ctx = ContradictionContext::new(KnowledgeKind::Fact, Some(LifeArea::Finance));
        assert_eq!(ctx.area_label(), "Finance");
    }
}
