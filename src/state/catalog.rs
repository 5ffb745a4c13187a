// src/state/catalog.rs
use std::collections::HashSet;

use crate::ingest::types::Item;

/// Every item ever ingested, in first-seen order. Never shrinks.
///
/// Persisted as a JSON array of items; the id index is rebuilt on load.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    ids: HashSet<String>,
}

impl Catalog {
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut c = Self::default();
        for it in items {
            c.insert(it);
        }
        c
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false (and keeps the first copy) when the id is already known.
    pub fn insert(&mut self, item: Item) -> bool {
        if !self.ids.insert(item.id().to_string()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Number of ids that were actually new.
    pub fn extend<I: IntoIterator<Item = Item>>(&mut self, items: I) -> usize {
        let mut added = 0;
        for it in items {
            if self.insert(it) {
                added += 1;
            }
        }
        added
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
