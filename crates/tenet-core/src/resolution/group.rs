//! Pair bookkeeping for group contradiction checks.

use std::collections::HashSet;

use crate::types::KnowledgeItem;

/// Drop repeated ids, keeping the first occurrence.
pub(crate) fn unique_by_id(items: &[KnowledgeItem]) -> Vec<&KnowledgeItem> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| {
            let fresh = seen.insert(item.id.as_str());
            if !fresh {
                tracing::debug!(item_id = %item.id, "Duplicate item in group ignored");
            }
            fresh
        })
        .collect()
}

/// Split `items` into (anchor, later items) batches.
///
/// Anchor `i` is compared against items `i+1..n`, so each unordered pair
/// appears in exactly one batch. The last item anchors nothing.
pub(crate) fn anchor_batches<'a, 'b>(
    items: &'b [&'a KnowledgeItem],
) -> impl Iterator<Item = (&'a KnowledgeItem, &'b [&'a KnowledgeItem])> + 'b {
    items
        .iter()
        .enumerate()
        .filter(move |(index, _)| index + 1 < items.len())
        .map(move |(index, anchor)| (*anchor, &items[index + 1..]))
}

/// Unordered id pairs already recorded.
#[derive(Debug, Default)]
pub(crate) struct PairLedger {
    pairs: HashSet<(String, String)>,
}

impl PairLedger {
    /// Record the pair; returns `false` if it was already present.
    pub(crate) fn record(&mut self, a: &str, b: &str) -> bool {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.pairs.insert(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnowledgeKind;

    fn item(id: &str) -> KnowledgeItem {
        KnowledgeItem::new("user-1", KnowledgeKind::Fact, id).with_id(id)
    }

    #[test]
    fn test_unique_by_id_keeps_first() {
        let items = vec![item("a"), item("b"), item("a").with_confidence(0.1)];
        let unique = unique_by_id(&items);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].confidence, items[0].confidence);
    }

    #[test]
    fn test_anchor_batches_cover_each_pair_once() {
        let items = vec![item("a"), item("b"), item("c"), item("d")];
        let refs: Vec<&KnowledgeItem> = items.iter().collect();

        let mut ledger = PairLedger::default();
        let mut batches = 0;
        for (anchor, rest) in anchor_batches(&refs) {
            batches += 1;
            for other in rest {
                assert!(ledger.record(&anchor.id, &other.id));
            }
        }
        assert_eq!(batches, 3);
        // n * (n - 1) / 2 pairs, none repeated
        assert_eq!(ledger.pairs.len(), 6);
    }

    #[test]
    fn test_anchor_batches_single_item() {
        let items = vec![item("a")];
        let refs: Vec<&KnowledgeItem> = items.iter().collect();
        assert_eq!(anchor_batches(&refs).count(), 0);
    }

    #[test]
    fn test_ledger_is_unordered() {
        let mut ledger = PairLedger::default();
        assert!(ledger.record("x", "y"));
        assert!(!ledger.record("y", "x"));
    }
}
