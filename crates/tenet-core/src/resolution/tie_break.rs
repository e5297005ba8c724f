//! Authority ordering between two conflicting items.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use strum::{Display, IntoStaticStr};

use crate::types::KnowledgeItem;

/// The rule that settled a tie-break, in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TieBreakRule {
    /// A user-validated item outranks an unvalidated one.
    Validation,
    /// Higher item confidence wins.
    Confidence,
    /// The more recently created item wins.
    Recency,
    /// Everything else equal: the greater id wins.
    Identifier,
}

/// Outcome of comparing two conflicting items.
#[derive(Debug, Clone, Copy)]
pub struct TieBreak<'a> {
    pub keep: &'a KnowledgeItem,
    pub supersede: &'a KnowledgeItem,
    pub rule: TieBreakRule,
}

/// Compare `a` against `b` by authority; `Greater` means `a` wins.
///
/// Total over any two distinct ids, so the winner never depends on which
/// item is passed first.
pub fn authority_order(a: &KnowledgeItem, b: &KnowledgeItem) -> (Ordering, TieBreakRule) {
    let steps = [
        (a.validated_by_user.cmp(&b.validated_by_user), TieBreakRule::Validation),
        (
            OrderedFloat(a.confidence).cmp(&OrderedFloat(b.confidence)),
            TieBreakRule::Confidence,
        ),
        (a.created_at.cmp(&b.created_at), TieBreakRule::Recency),
    ];

    steps
        .into_iter()
        .find(|(ordering, _)| ordering.is_ne())
        .unwrap_or((a.id.cmp(&b.id), TieBreakRule::Identifier))
}

/// Decide which of two conflicting items to keep.
pub fn decide<'a>(a: &'a KnowledgeItem, b: &'a KnowledgeItem) -> TieBreak<'a> {
    let (ordering, rule) = authority_order(a, b);
    let (keep, supersede) = if ordering.is_ge() { (a, b) } else { (b, a) };
    TieBreak {
        keep,
        supersede,
        rule,
    }
}
