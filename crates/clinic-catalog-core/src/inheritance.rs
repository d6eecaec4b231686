//! Variant inheritance resolution.
//!
//! A variant stores only what it overrides. Its effective view starts from
//! the family record and overlays every attribute the variant has set:
//!
//! ```text
//!   family  { name, price=12, vatRate=20, provenance="Lab A", dosage=- }
//!      │
//!      ▼  overlay present (non-null, non-empty) variant fields
//!   variant { name="500mg", price=-,  vatRate=-,  dosage=500 }
//!      │
//!      ▼
//!   effective { id/parentId of the variant, price=12, vatRate=20,
//!               provenance="Lab A", dosage=500 }
//! ```
//!
//! "Present" is sparse: an empty string counts as unset, so a variant cannot
//! blank an inherited text just by storing `""`. Fields listed in the
//! variant's `cleared` set are the explicit way to do that.

use crate::models::{CatalogItem, ItemField};

/// Effective view of one item and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Not a variant; returned as stored
    Standalone(CatalogItem),
    /// Variant merged with its family
    Inherited {
        item: CatalogItem,
        family_id: String,
    },
    /// Variant whose family is missing (or is not a family); returned as stored
    Orphaned(CatalogItem),
}

impl Resolution {
    pub fn into_item(self) -> CatalogItem {
        match self {
            Resolution::Standalone(item)
            | Resolution::Inherited { item, .. }
            | Resolution::Orphaned(item) => item,
        }
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(self, Resolution::Orphaned(_))
    }
}

/// Resolve `item`, looking its family up through `find_family`.
pub fn resolve_with<'a, F>(item: &CatalogItem, find_family: F) -> Resolution
where
    F: Fn(&str) -> Option<&'a CatalogItem>,
{
    if !item.is_variant {
        return Resolution::Standalone(item.clone());
    }

    let family = item
        .parent_id
        .as_deref()
        .and_then(|parent_id| find_family(parent_id))
        .filter(|family| family.is_family);

    match family {
        Some(family) => Resolution::Inherited {
            item: merge(item, family),
            family_id: family.id.clone(),
        },
        None => {
            tracing::warn!(
                id = %item.id,
                parent_id = ?item.parent_id,
                "variant has no family, resolving to stored record"
            );
            Resolution::Orphaned(item.clone())
        }
    }
}

/// Overlay a variant onto its family. Neither input is modified.
pub fn merge(variant: &CatalogItem, family: &CatalogItem) -> CatalogItem {
    let mut merged = family.clone();

    // Identity always comes from the variant.
    merged.id = variant.id.clone();
    merged.parent_id = variant.parent_id.clone();
    merged.is_variant = true;
    merged.is_family = false;
    merged.variants = Vec::new();
    merged.created_at = variant.created_at.clone();
    merged.updated_at = variant.updated_at.clone();
    merged.created_by = variant.created_by.clone();

    merged.item_type = variant.item_type;
    merged.is_active = variant.is_active;
    if !variant.name.trim().is_empty() {
        merged.name = variant.name.clone();
    }

    for field in ItemField::ALL {
        if variant.is_cleared(field) {
            merged.clear_field(field);
        } else if variant.field(field).is_present() {
            merged.copy_field_from(variant, field);
        }
    }
    merged.cleared = variant.cleared.clone();

    merged
}
