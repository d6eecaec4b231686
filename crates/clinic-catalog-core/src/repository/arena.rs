//! Working copy of the collection with an id index.

use std::collections::{HashMap, HashSet};

use crate::models::CatalogItem;

/// Items in stored order plus an id -> position index.
///
/// Positions shift on removal, so callers always go through the id
/// helpers and never hold on to an index.
#[derive(Debug, Clone, Default)]
pub struct ItemArena {
    items: Vec<CatalogItem>,
    index: HashMap<String, usize>,
}

impl ItemArena {
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        let mut arena = Self {
            items,
            index: HashMap::new(),
        };
        arena.rebuild_index();
        arena
    }

    /// Rebuild the index. With duplicate ids the first record wins.
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, item) in self.items.iter().enumerate() {
            self.index.entry(item.id.clone()).or_insert(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CatalogItem> {
        match self.index.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    /// Append an item. Returns false (and stores nothing) if the id is taken.
    pub fn insert(&mut self, item: CatalogItem) -> bool {
        if self.index.contains_key(&item.id) {
            return false;
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Remove an item by id, keeping the order of the others.
    pub fn remove(&mut self, id: &str) -> Option<CatalogItem> {
        let pos = self.index.get(id).copied()?;
        let removed = self.items.remove(pos);
        self.rebuild_index();
        Some(removed)
    }

    /// Ids stored more than once.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) && !duplicates.contains(&item.id) {
                duplicates.push(item.id.clone());
            }
        }
        duplicates
    }

    /// Make every family's `variants` list match the variants pointing to it.
    ///
    /// Existing entries keep their order; newly linked variants are appended
    /// in stored order.
    pub fn rebuild_variant_links(&mut self) {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for item in &self.items {
            if let (true, Some(parent_id)) = (item.is_variant, &item.parent_id) {
                children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(item.id.clone());
            }
        }

        for family in self.items.iter_mut().filter(|i| i.is_family) {
            let linked = children.remove(&family.id).unwrap_or_default();
            let mut variants: Vec<String> = family
                .variants
                .iter()
                .filter(|id| linked.contains(id))
                .cloned()
                .collect();
            for id in linked {
                if !variants.contains(&id) {
                    variants.push(id);
                }
            }
            family.variants = variants;
        }
    }
}
