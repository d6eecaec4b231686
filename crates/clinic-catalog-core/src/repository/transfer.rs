//! Bulk import and export.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use super::{find_family, CatalogRepository, ItemArena};
use crate::error::{CatalogResult, ReferentialError, GENERAL_KEY};
use crate::models::{CatalogItem, ExportBundle, ExportFilter, ImportOptions, ImportReport};

/// Accepted import documents: an export bundle or a bare item array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Bundle(ExportBundle),
    Items(Vec<CatalogItem>),
}

impl CatalogRepository {
    /// Stored records matching `filter`, in stored order.
    pub fn export_items(&self, filter: &ExportFilter) -> Vec<CatalogItem> {
        self.store
            .load()
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect()
    }

    /// Export matching records as a JSON bundle.
    pub fn export_json(&self, filter: &ExportFilter) -> CatalogResult<String> {
        Ok(ExportBundle::new(self.export_items(filter)).to_json()?)
    }

    /// Import records one by one; invalid entries are reported, valid ones
    /// are stored in a single write.
    ///
    /// Incoming ids are kept when free and remapped otherwise; variant
    /// `parentId`s follow the remap, and family `variants` lists are rebuilt
    /// from the variants pointing back at them.
    pub fn import_items(
        &mut self,
        batch: Vec<CatalogItem>,
        actor: Option<&str>,
        options: ImportOptions,
    ) -> CatalogResult<ImportReport> {
        let mut arena = if options.overwrite {
            ItemArena::default()
        } else {
            self.load_arena()
        };
        let now = chrono::Utc::now().to_rfc3339();

        // Assign ids first so variants can follow their family's new id.
        let mut remap: HashMap<String, String> = HashMap::new();
        let mut assigned: HashSet<String> = HashSet::new();
        let mut candidates: Vec<CatalogItem> = Vec::with_capacity(batch.len());
        for mut candidate in batch {
            let original = candidate.id.clone();
            if original.trim().is_empty()
                || arena.contains(&original)
                || assigned.contains(&original)
            {
                candidate.id = self.ids.next_id();
                while arena.contains(&candidate.id) || assigned.contains(&candidate.id) {
                    candidate.id = self.ids.next_id();
                }
            }
            if !original.is_empty() {
                remap.entry(original).or_insert_with(|| candidate.id.clone());
            }
            assigned.insert(candidate.id.clone());
            candidates.push(candidate);
        }

        for candidate in &mut candidates {
            if candidate.is_variant {
                candidate.parent_id = candidate
                    .parent_id
                    .take()
                    .map(|parent| remap.get(&parent).cloned().unwrap_or(parent));
            } else {
                candidate.parent_id = None;
                candidate.cleared.clear();
            }
            candidate.variants = Vec::new();
            if candidate.created_at.is_empty() {
                candidate.created_at = now.clone();
            }
            candidate.updated_at = now.clone();
            if candidate.created_by.is_none() {
                candidate.created_by = actor.map(str::to_string);
            }
        }

        // Families before variants, so variants can resolve against them.
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&i| candidates[i].is_variant);

        let mut report = ImportReport::default();
        let mut slots: Vec<Option<CatalogItem>> = candidates.into_iter().map(Some).collect();
        for i in order {
            let Some(candidate) = slots[i].take() else {
                continue;
            };

            if candidate.is_variant && !candidate.is_family {
                if let Some(parent_id) = candidate.parent_id.as_deref() {
                    if let Err(e) = find_family(&arena, parent_id) {
                        report.failed.push((
                            i,
                            BTreeMap::from([(GENERAL_KEY.to_string(), e.code().to_string())]),
                        ));
                        continue;
                    }
                }
            }

            let errors = self.check(&arena, &candidate);
            if !errors.is_empty() {
                report.failed.push((
                    i,
                    errors
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ));
                continue;
            }

            let id = candidate.id.clone();
            if !arena.insert(candidate) {
                report.failed.push((
                    i,
                    BTreeMap::from([(
                        GENERAL_KEY.to_string(),
                        ReferentialError::DuplicateId(id).code().to_string(),
                    )]),
                ));
                continue;
            }
            report.imported.push((i, id));
        }

        arena.rebuild_variant_links();
        report.imported.sort_by_key(|(i, _)| *i);
        report.failed.sort_by_key(|(i, _)| *i);

        self.commit(&arena)?;
        tracing::info!(
            imported = report.imported_count(),
            failed = report.failed_count(),
            overwrite = options.overwrite,
            "catalog import finished"
        );
        Ok(report)
    }

    /// Import an export bundle or a bare JSON array of items.
    pub fn import_json(
        &mut self,
        json: &str,
        actor: Option<&str>,
        options: ImportOptions,
    ) -> CatalogResult<ImportReport> {
        let items = match serde_json::from_str::<ImportDocument>(json)? {
            ImportDocument::Bundle(bundle) => bundle.items,
            ImportDocument::Items(items) => items,
        };
        self.import_items(items, actor, options)
    }
}
