use std::collections::HashSet;

use tracing::debug;

/// Hard cap shared by detected and manually added ingredients.
pub const MAX_INGREDIENTS: usize = 15;

/// Ordered, duplicate-free list of ingredient labels for one session.
///
/// Labels compare by exact (case-sensitive) string match. Rejections are
/// silent: the mutators report whether anything changed instead of erroring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientStore {
    labels: Vec<String>,
}

impl IngredientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly detected labels after the existing ones, dropping exact
    /// duplicates and anything past the capacity. Returns how many were added.
    pub fn merge<I, S>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.labels.len();
        let mut seen: HashSet<String> = self.labels.iter().cloned().collect();

        for label in incoming {
            if self.labels.len() >= MAX_INGREDIENTS {
                break;
            }
            let label = label.into();
            if seen.insert(label.clone()) {
                self.labels.push(label);
            }
        }

        let added = self.labels.len() - before;
        debug!("Merged {} new ingredient(s), store now holds {}", added, self.labels.len());
        added
    }

    /// Adds one manually entered label. Whitespace is trimmed; empty labels,
    /// duplicates and additions to a full store are ignored.
    pub fn add(&mut self, label: &str) -> bool {
        let trimmed = label.trim();
        if trimmed.is_empty() || self.is_full() || self.contains(trimmed) {
            debug!("Ignoring ingredient '{}'", trimmed);
            return false;
        }
        self.labels.push(trimmed.to_string());
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<String> {
        if index < self.labels.len() {
            Some(self.labels.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.labels.clone()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.labels.len() >= MAX_INGREDIENTS
    }

    pub fn remaining(&self) -> usize {
        MAX_INGREDIENTS.saturating_sub(self.labels.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(labels: &[&str]) -> IngredientStore {
        let mut store = IngredientStore::new();
        store.merge(labels.iter().copied());
        store
    }

    #[test]
    fn test_merge_collapses_duplicates_in_batch() {
        let mut store = IngredientStore::new();
        let added = store.merge(["A", "B", "A", "C"]);
        assert_eq!(added, 3);
        assert_eq!(store.as_slice(), &["A", "B", "C"]);
    }

    #[test]
    fn test_merge_keeps_existing_first() {
        let mut store = store_of(&["Egg"]);
        store.merge(vec!["Egg".to_string(), "Milk".to_string()]);
        assert_eq!(store.as_slice(), &["Egg", "Milk"]);
    }

    #[test]
    fn test_merge_truncates_to_capacity() {
        let mut store = store_of(&["existing"]);
        let batch: Vec<String> = (0..30).map(|i| format!("item-{i}")).collect();
        let added = store.merge(batch);
        assert_eq!(added, MAX_INGREDIENTS - 1);
        assert_eq!(store.len(), MAX_INGREDIENTS);
        assert_eq!(store.as_slice()[0], "existing");
        assert_eq!(store.as_slice()[1], "item-0");
        assert!(store.is_full());
        assert_eq!(store.merge(["late"]), 0);
    }

    #[test]
    fn test_merge_is_case_sensitive() {
        let store = store_of(&["tomato", "Tomato"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_add_rejects_blank_labels() {
        let mut store = IngredientStore::new();
        assert!(!store.add(""));
        assert!(!store.add("   "));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_trims_and_rejects_duplicates() {
        let mut store = IngredientStore::new();
        assert!(store.add("Tomato"));
        assert!(!store.add("Tomato"));
        assert!(!store.add("  Tomato  "));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_manual_add_shares_dedup_with_detection() {
        let mut store = store_of(&["Onion"]);
        assert!(!store.add("Onion"));
        assert_eq!(store.as_slice(), &["Onion"]);
    }

    #[test]
    fn test_add_stops_at_capacity() {
        let mut store = IngredientStore::new();
        for i in 0..MAX_INGREDIENTS {
            assert!(store.add(&format!("item-{i}")));
        }
        assert!(!store.add("one too many"));
        assert_eq!(store.len(), MAX_INGREDIENTS);
        assert_eq!(store.remaining(), 0);
    }

    #[test]
    fn test_remove_at_and_clear() {
        let mut store = store_of(&["A", "B", "C"]);
        assert_eq!(store.remove_at(1), Some("B".to_string()));
        assert_eq!(store.as_slice(), &["A", "C"]);
        assert_eq!(store.remove_at(7), None);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mixed_operations_hold_invariants() {
        let mut store = IngredientStore::new();
        for round in 0..10 {
            store.merge((0..4).map(|i| format!("label-{}", (round * 3 + i) % 20)));
            store.add(&format!("label-{}", round % 7));
            store.add(&format!(" manual-{} ", round));
            if round % 4 == 0 {
                store.remove_at(0);
            }

            assert!(store.len() <= MAX_INGREDIENTS);
            let unique: HashSet<&String> = store.as_slice().iter().collect();
            assert_eq!(unique.len(), store.len());
        }
    }
}
