//! Read-side models: search filters, exports, imports and statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::item::{CatalogItem, ItemType};

/// Console search box plus its filter toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Case-insensitive substring over name, description and provenance
    pub text: String,
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub category: Option<String>,
    pub active_only: bool,
    /// When false, variants are only reachable through their family
    pub include_variants: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            item_type: None,
            category: None,
            active_only: true,
            include_variants: true,
        }
    }
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Check whether an (effective) item passes every filter.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if self.active_only && !item.is_active {
            return false;
        }
        if !self.include_variants && item.is_variant {
            return false;
        }
        if let Some(item_type) = self.item_type {
            if item.item_type != item_type {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        let needle = self.text.trim().to_lowercase();
        needle.is_empty() || item.search_text().contains(&needle)
    }
}

/// Selection of records to export. Exports carry stored records, not
/// effective views, so they can be imported back losslessly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportFilter {
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub category: Option<String>,
    pub active_only: bool,
    pub include_variants: bool,
}

impl Default for ExportFilter {
    fn default() -> Self {
        Self {
            item_type: None,
            category: None,
            active_only: false,
            include_variants: true,
        }
    }
}

impl ExportFilter {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        (!self.active_only || item.is_active)
            && (self.include_variants || !item.is_variant)
            && self.item_type.map_or(true, |t| item.item_type == t)
            && self
                .category
                .as_deref()
                .map_or(true, |c| item.category.as_deref() == Some(c))
    }
}

/// Serialized export file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: String,
    pub items: Vec<CatalogItem>,
}

impl ExportBundle {
    pub const VERSION: u32 = 1;

    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            version: Self::VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            items,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Options for a bulk import.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Replace the whole collection with the valid imported items
    pub overwrite: bool,
}

/// Per-entry outcome of a bulk import.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// (batch index, stored id)
    pub imported: Vec<(usize, String)>,
    /// (batch index, field/general -> error code)
    pub failed: Vec<(usize, BTreeMap<String, String>)>,
}

impl ImportReport {
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Catalog dashboard counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub families: usize,
    pub variants: usize,
    pub standalone: usize,
    /// Variants whose family is missing
    pub orphaned: usize,
    pub by_type: BTreeMap<ItemType, usize>,
}

/// Broken structural invariant found by an integrity scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntegrityIssue {
    /// Both family and variant flags are set
    ConflictingFlags { id: String },
    /// Variant's parent is missing or not a family
    OrphanedVariant { id: String, parent_id: Option<String> },
    /// Family lists a variant that does not point back to it
    DanglingVariantLink { family_id: String, variant_id: String },
    /// Variant points to a family that does not list it
    UnlistedVariant { family_id: String, variant_id: String },
    /// Two records share an id
    DuplicateId { id: String },
}
