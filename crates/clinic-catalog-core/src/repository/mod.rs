//! Catalog repository facade.
//!
//! Every operation loads the whole collection into an [`ItemArena`], works
//! on that copy and writes the whole collection back in one save. A failed
//! save drops the copy, so the stored collection is never half-updated.

mod arena;
mod query;
mod transfer;

pub use arena::ItemArena;
pub use query::Suggestion;

use std::path::Path;

use crate::config::{OrphanPolicy, RepositoryConfig};
use crate::error::{CatalogError, CatalogResult, ErrorCode, ReferentialError, ValidationErrors};
use crate::ids::IdGenerator;
use crate::inheritance::{resolve_with, Resolution};
use crate::models::{CatalogItem, ItemDraft, ItemField, ItemPatch, ItemType};
use crate::storage::{BlobStore, ItemStore, MemoryBlobStore, SqliteBlobStore};
use crate::validation::{check_name, validate, ValidationRules};

/// A family together with the variants created alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyWithVariants {
    pub family: CatalogItem,
    pub variants: Vec<CatalogItem>,
}

/// Single-writer catalog engine over one storage slot.
pub struct CatalogRepository {
    store: ItemStore,
    config: RepositoryConfig,
    rules: ValidationRules,
    ids: IdGenerator,
}

impl CatalogRepository {
    /// Create a repository over `backend`.
    pub fn new(backend: impl BlobStore + 'static, config: RepositoryConfig) -> Self {
        let store = ItemStore::new(backend, config.slot.clone());
        let rules = config.rules();
        Self {
            store,
            config,
            rules,
            ids: IdGenerator::new(),
        }
    }

    /// Ephemeral repository with default configuration (for testing).
    pub fn in_memory() -> Self {
        Self::new(MemoryBlobStore::new(), RepositoryConfig::default())
    }

    /// Repository persisted in a SQLite file.
    pub fn open_sqlite<P: AsRef<Path>>(path: P, config: RepositoryConfig) -> CatalogResult<Self> {
        let backend = SqliteBlobStore::open(path)?;
        Ok(Self::new(backend, config))
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn load_arena(&self) -> ItemArena {
        ItemArena::from_items(self.store.load())
    }

    fn commit(&self, arena: &ItemArena) -> CatalogResult<()> {
        self.store.save(arena.items())?;
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Get a stored record by id.
    pub fn get(&self, id: &str) -> Option<CatalogItem> {
        self.load_arena().get(id).cloned()
    }

    /// All stored records, in stored order.
    pub fn list(&self) -> Vec<CatalogItem> {
        self.store.load()
    }

    /// Effective view of an item.
    ///
    /// An orphaned variant resolves to its stored record unless the
    /// repository is configured with [`OrphanPolicy::Reject`].
    pub fn resolve(&self, id: &str) -> CatalogResult<CatalogItem> {
        match self.resolve_detailed(id)? {
            Resolution::Orphaned(_) if self.config.orphan_policy == OrphanPolicy::Reject => {
                Err(ReferentialError::OrphanedVariant(id.to_string()).into())
            }
            resolution => Ok(resolution.into_item()),
        }
    }

    /// Effective view of an item, reporting how it was resolved.
    pub fn resolve_detailed(&self, id: &str) -> CatalogResult<Resolution> {
        let arena = self.load_arena();
        let item = arena
            .get(id)
            .ok_or_else(|| ReferentialError::ItemNotFound(id.to_string()))?;
        Ok(resolve_with(item, |family_id| arena.get(family_id)))
    }

    /// Effective views of a family's variants, in family order.
    pub fn variants_of(&self, family_id: &str) -> CatalogResult<Vec<CatalogItem>> {
        let arena = self.load_arena();
        let family = find_family(&arena, family_id)?;
        Ok(family
            .variants
            .iter()
            .filter_map(|id| arena.get(id))
            .map(|variant| resolve_with(variant, |id| arena.get(id)).into_item())
            .collect())
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create one record. A variant draft is linked to its family in the
    /// same write.
    pub fn create(&mut self, draft: ItemDraft, actor: Option<&str>) -> CatalogResult<CatalogItem> {
        let mut arena = self.load_arena();
        let item = self.insert_new(&mut arena, draft, actor)?;
        self.commit(&arena)?;
        tracing::debug!(id = %item.id, variant = item.is_variant, "catalog item created");
        Ok(item)
    }

    /// Create a family and its variants in one write. Any invalid entry
    /// rejects the whole batch.
    pub fn create_family(
        &mut self,
        family_draft: ItemDraft,
        variant_drafts: Vec<ItemDraft>,
        actor: Option<&str>,
    ) -> CatalogResult<FamilyWithVariants> {
        let mut arena = self.load_arena();

        let mut family_draft = family_draft;
        family_draft.is_family = true;
        family_draft.is_variant = false;
        family_draft.parent_id = None;
        let mut family = self.build_item(family_draft, None, actor);
        self.assign_free_id(&arena, &mut family);

        let mut errors = self.check(&arena, &family);
        let mut variants = Vec::with_capacity(variant_drafts.len());
        for (i, mut draft) in variant_drafts.into_iter().enumerate() {
            draft.is_variant = true;
            draft.is_family = false;
            draft.parent_id = Some(family.id.clone());
            let mut variant = self.build_item(draft, Some(family.item_type), actor);
            self.assign_free_id(&arena, &mut variant);

            let mut variant_errors = ValidationErrors::new();
            check_name(&mut variant_errors, &variant.name);
            let effective = crate::inheritance::merge(&variant, &family);
            variant_errors.extend(validate(&effective, &self.rules).errors().clone());
            errors.extend(variant_errors.prefixed(&format!("variants[{}]", i)));

            family.variants.push(variant.id.clone());
            variants.push(variant);
        }
        if !errors.is_empty() {
            return Err(CatalogError::Validation(errors));
        }

        for item in std::iter::once(&family).chain(&variants) {
            if !arena.insert(item.clone()) {
                return Err(ReferentialError::DuplicateId(item.id.clone()).into());
            }
        }
        self.commit(&arena)?;

        tracing::debug!(id = %family.id, variants = variants.len(), "catalog family created");
        Ok(FamilyWithVariants { family, variants })
    }

    /// Add a variant to an existing family.
    pub fn add_variant(
        &mut self,
        family_id: &str,
        draft: ItemDraft,
        actor: Option<&str>,
    ) -> CatalogResult<CatalogItem> {
        let mut arena = self.load_arena();
        find_family(&arena, family_id)?;

        let mut draft = draft;
        draft.is_variant = true;
        draft.is_family = false;
        draft.parent_id = Some(family_id.to_string());

        let variant = self.insert_new(&mut arena, draft, actor)?;
        self.commit(&arena)?;
        Ok(variant)
    }

    /// Copy an item's effective view into a new standalone record.
    pub fn duplicate(&mut self, id: &str, actor: Option<&str>) -> CatalogResult<CatalogItem> {
        let source = self.resolve_detailed(id)?.into_item();
        let mut draft = ItemDraft::from_item(&source);
        draft.name = format!("{}{}", source.name, self.config.duplicate_suffix);
        self.create(draft, actor)
    }

    /// Apply defaults and structural rules to a draft.
    fn build_item(
        &self,
        draft: ItemDraft,
        family_type: Option<ItemType>,
        actor: Option<&str>,
    ) -> CatalogItem {
        let item_type = family_type.or(draft.item_type).unwrap_or_default();
        let mut item = draft.into_item(self.ids.next_id(), item_type);

        if !item.is_variant {
            item.parent_id = None;
            item.cleared.clear();
            if item.price.is_none() {
                item.price = Some(0.0);
            }
            if item.vat_rate.is_none() {
                item.vat_rate = Some(self.config.default_vat_rate);
            }
        }
        item.variants = Vec::new();
        item.created_by = actor.map(str::to_string);
        item
    }

    /// Build, validate and insert a draft, linking variants to their family.
    fn insert_new(
        &self,
        arena: &mut ItemArena,
        draft: ItemDraft,
        actor: Option<&str>,
    ) -> CatalogResult<CatalogItem> {
        let parent_id = draft
            .parent_id
            .clone()
            .filter(|id| draft.is_variant && !id.is_empty());
        let family_type = match &parent_id {
            Some(parent_id) => Some(find_family(arena, parent_id)?.item_type),
            None => None,
        };

        let mut item = self.build_item(draft, family_type, actor);
        self.assign_free_id(arena, &mut item);
        let errors = self.check(arena, &item);
        if !errors.is_empty() {
            return Err(CatalogError::Validation(errors));
        }

        if !arena.insert(item.clone()) {
            return Err(ReferentialError::DuplicateId(item.id).into());
        }
        if let Some(family) = parent_id.as_deref().and_then(|id| arena.get_mut(id)) {
            family.variants.push(item.id.clone());
            family.touch();
        }
        Ok(item)
    }

    /// Draw new ids until `item` no longer collides with a stored record.
    fn assign_free_id(&self, arena: &ItemArena, item: &mut CatalogItem) {
        while arena.contains(&item.id) {
            item.id = self.ids.next_id();
        }
    }

    /// Validate a record as it would be seen (effective view for variants).
    /// A variant's own name must be valid too, since it never inherits one.
    fn check(&self, arena: &ItemArena, item: &CatalogItem) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let view = if item.is_variant {
            check_name(&mut errors, &item.name);
            resolve_with(item, |id| arena.get(id)).into_item()
        } else {
            item.clone()
        };
        errors.extend(validate(&view, &self.rules).errors().clone());
        if item.is_family && !self.config.allows_family(item.item_type) {
            errors.add("type", ErrorCode::FamilyNotAllowed);
        }
        errors
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Merge `patch` into an item and re-validate the whole merged record.
    ///
    /// When a family's `type`, `category`, `provenance` or `vatRate`
    /// changes, the new value is pushed to every variant that still holds
    /// the family's previous value or holds none.
    pub fn update(&mut self, id: &str, patch: ItemPatch) -> CatalogResult<CatalogItem> {
        let mut arena = self.load_arena();
        let before = arena
            .get(id)
            .cloned()
            .ok_or_else(|| ReferentialError::ItemNotFound(id.to_string()))?;

        let mut updated = before.clone();
        patch.apply_to(&mut updated);
        if !updated.is_variant {
            updated.cleared.clear();
        }
        updated.touch();

        let errors = self.check(&arena, &updated);
        if !errors.is_empty() {
            return Err(CatalogError::Validation(errors));
        }

        if let Some(slot) = arena.get_mut(id) {
            *slot = updated.clone();
        }
        let propagated = if before.is_family {
            propagate(&mut arena, &before, &updated)
        } else {
            0
        };

        self.commit(&arena)?;
        tracing::debug!(id = %id, propagated, "catalog item updated");
        Ok(updated)
    }

    /// Delete an item. Families take their variants with them; a variant is
    /// unlinked from its family first. Returns every removed id.
    pub fn remove(&mut self, id: &str) -> CatalogResult<Vec<String>> {
        let mut arena = self.load_arena();
        let target = arena
            .get(id)
            .cloned()
            .ok_or_else(|| ReferentialError::ItemNotFound(id.to_string()))?;

        let mut removed = Vec::new();
        if target.is_family {
            let mut children = target.variants.clone();
            for item in arena.iter() {
                if item.is_variant
                    && item.parent_id.as_deref() == Some(id)
                    && !children.contains(&item.id)
                {
                    children.push(item.id.clone());
                }
            }
            for child in children {
                if arena.remove(&child).is_some() {
                    removed.push(child);
                }
            }
        } else if target.is_variant {
            if let Some(family) = target.parent_id.as_deref().and_then(|p| arena.get_mut(p)) {
                family.variants.retain(|v| v != id);
                family.touch();
            }
        }

        arena.remove(id);
        removed.push(id.to_string());

        self.commit(&arena)?;
        tracing::debug!(id = %id, removed = removed.len(), "catalog item removed");
        Ok(removed)
    }

    /// Turn a standalone item into an (empty) family.
    pub fn convert_to_family(&mut self, id: &str) -> CatalogResult<CatalogItem> {
        let mut arena = self.load_arena();
        let item = arena
            .get_mut(id)
            .ok_or_else(|| ReferentialError::ItemNotFound(id.to_string()))?;

        if item.is_variant {
            return Err(ReferentialError::VariantCannotBeFamily(id.to_string()).into());
        }
        if item.is_family {
            return Ok(item.clone());
        }
        if !self.config.allows_family(item.item_type) {
            return Err(ReferentialError::TypeCannotBeFamily(item.item_type.to_string()).into());
        }

        item.is_family = true;
        item.variants = Vec::new();
        item.touch();
        let converted = item.clone();

        self.commit(&arena)?;
        Ok(converted)
    }

    /// Flip `isActive` on one item. Variants are left alone.
    pub fn toggle_active(&mut self, id: &str) -> CatalogResult<CatalogItem> {
        let mut arena = self.load_arena();
        let item = arena
            .get_mut(id)
            .ok_or_else(|| ReferentialError::ItemNotFound(id.to_string()))?;
        item.is_active = !item.is_active;
        item.touch();
        let toggled = item.clone();

        self.commit(&arena)?;
        Ok(toggled)
    }
}

/// Look up `id` and require it to be a family.
fn find_family<'a>(arena: &'a ItemArena, id: &str) -> Result<&'a CatalogItem, ReferentialError> {
    let family = arena
        .get(id)
        .ok_or_else(|| ReferentialError::FamilyNotFound(id.to_string()))?;
    if !family.is_family {
        return Err(ReferentialError::NotAFamily(id.to_string()));
    }
    Ok(family)
}

/// Push a family's changed inheritable fields down to variants that have not
/// diverged. Returns the number of variants touched.
fn propagate(arena: &mut ItemArena, before: &CatalogItem, after: &CatalogItem) -> usize {
    let type_changed = before.item_type != after.item_type;
    let changed: Vec<ItemField> = ItemField::PROPAGATED
        .into_iter()
        .filter(|field| before.field(*field) != after.field(*field))
        .collect();
    if !type_changed && changed.is_empty() {
        return 0;
    }

    let mut touched = 0;
    for variant_id in &after.variants {
        let Some(variant) = arena.get_mut(variant_id) else {
            tracing::warn!(family_id = %after.id, variant_id = %variant_id, "family lists a missing variant");
            continue;
        };

        let mut changed_variant = false;
        if type_changed && variant.item_type == before.item_type {
            variant.item_type = after.item_type;
            changed_variant = true;
        }
        for field in &changed {
            if variant.is_cleared(*field) {
                continue;
            }
            let current = variant.field(*field);
            if !current.is_present() || current == before.field(*field) {
                variant.copy_field_from(after, *field);
                changed_variant = true;
            }
        }
        if changed_variant {
            variant.touch();
            touched += 1;
        }
    }
    touched
}
