//! Clinic Catalog Core Library
//!
//! Local catalog engine behind the clinic admin console: medications,
//! treatments and services, with families that own variants.
//!
//! # Architecture
//!
//! ```text
//!   Console forms (create / edit / import / search)
//!                     │
//!                     ▼
//!          ┌─────────────────────┐
//!          │  CatalogRepository  │  load whole collection → ItemArena
//!          │                     │  mutate working copy
//!          │                     │  save whole collection (one write)
//!          └──┬──────┬───────┬───┘
//!             │      │       │
//!             ▼      ▼       ▼
//!      validation  inheritance  ids
//!                     │
//!                     ▼
//!          ┌─────────────────────┐
//!          │      ItemStore      │  checksummed envelope
//!          └──────────┬──────────┘
//!                     │
//!          ┌──────────┴──────────┐
//!          ▼                     ▼
//!   MemoryBlobStore       SqliteBlobStore
//! ```
//!
//! # Core Principle
//!
//! **A record is never half-written.** Every operation reads the whole
//! collection, computes the next collection and stores it in one write, or
//! stores nothing.
//!
//! # Modules
//!
//! - [`repository`]: Facade (create, families, update/propagation, cascade delete, import/export, search)
//! - [`models`]: Domain types (CatalogItem, ItemDraft, ItemPatch, SearchQuery, ...)
//! - [`inheritance`]: Effective view of variants
//! - [`validation`]: Field rules
//! - [`storage`]: Blob stores and the collection codec
//! - [`config`]: Repository configuration

pub mod config;
pub mod error;
pub mod ids;
pub mod inheritance;
pub mod models;
pub mod repository;
pub mod storage;
pub mod validation;

// Re-export commonly used types
pub use config::{OrphanPolicy, RepositoryConfig};
pub use error::{CatalogError, CatalogResult, ErrorCode, ReferentialError, ValidationErrors};
pub use inheritance::Resolution;
pub use models::{
    CatalogItem, CatalogStats, ExportFilter, ImportOptions, ImportReport, IntegrityIssue,
    ItemDraft, ItemField, ItemPatch, ItemType, SearchQuery,
};
pub use repository::{CatalogRepository, FamilyWithVariants};
pub use storage::{BlobStore, ItemStore, MemoryBlobStore, SqliteBlobStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

/// Failures outside the `{success, errors}` contract: bad arguments,
/// unusable storage, poisoned locks.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CatalogFfiError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<storage::StorageError> for CatalogFfiError {
    fn from(e: storage::StorageError) -> Self {
        CatalogFfiError::StorageError(e.to_string())
    }
}

impl From<config::ConfigError> for CatalogFfiError {
    fn from(e: config::ConfigError) -> Self {
        CatalogFfiError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for CatalogFfiError {
    fn from(e: serde_json::Error) -> Self {
        CatalogFfiError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CatalogFfiError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CatalogFfiError::StorageError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a catalog stored in the SQLite file at `path`.
#[uniffi::export]
pub fn open_catalog(path: String) -> Result<Arc<ClinicCatalog>, CatalogFfiError> {
    let backend = SqliteBlobStore::open(&path)?;
    Ok(ClinicCatalog::wrap(CatalogRepository::new(
        backend,
        RepositoryConfig::default(),
    )))
}

/// Open a catalog with a JSON configuration document.
#[uniffi::export]
pub fn open_catalog_with_config(
    path: String,
    config_json: String,
) -> Result<Arc<ClinicCatalog>, CatalogFfiError> {
    let config = RepositoryConfig::from_json_str(&config_json)?;
    let backend = SqliteBlobStore::open(&path)?;
    Ok(ClinicCatalog::wrap(CatalogRepository::new(backend, config)))
}

/// Create an in-memory catalog (for testing).
#[uniffi::export]
pub fn open_catalog_in_memory() -> Arc<ClinicCatalog> {
    ClinicCatalog::wrap(CatalogRepository::in_memory())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe repository wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCatalog {
    repo: Arc<Mutex<CatalogRepository>>,
}

impl ClinicCatalog {
    fn wrap(repo: CatalogRepository) -> Arc<Self> {
        Arc::new(Self {
            repo: Arc::new(Mutex::new(repo)),
        })
    }
}

#[uniffi::export]
impl ClinicCatalog {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a catalog item.
    pub fn create_item(
        &self,
        draft: FfiItemDraft,
        actor: Option<String>,
    ) -> Result<FfiOutcome, CatalogFfiError> {
        let draft = draft.into_draft()?;
        let mut repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.create(draft, actor.as_deref())))
    }

    /// Create a family and its variants in one write.
    pub fn create_family(
        &self,
        family: FfiItemDraft,
        variants: Vec<FfiItemDraft>,
        actor: Option<String>,
    ) -> Result<FfiOutcome, CatalogFfiError> {
        let family = family.into_draft()?;
        let variants = variants
            .into_iter()
            .map(FfiItemDraft::into_draft)
            .collect::<Result<Vec<_>, _>>()?;
        let mut repo = self.repo.lock()?;
        let result = repo.create_family(family, variants, actor.as_deref());
        Ok(match result {
            Ok(created) => {
                let mut outcome = FfiOutcome::success(Some(created.family.clone()));
                outcome.items = std::iter::once(created.family)
                    .chain(created.variants)
                    .map(Into::into)
                    .collect();
                outcome
            }
            Err(e) => FfiOutcome::failure(&e),
        })
    }

    /// Add a variant to an existing family.
    pub fn add_variant(
        &self,
        family_id: String,
        draft: FfiItemDraft,
        actor: Option<String>,
    ) -> Result<FfiOutcome, CatalogFfiError> {
        let draft = draft.into_draft()?;
        let mut repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.add_variant(
            &family_id,
            draft,
            actor.as_deref(),
        )))
    }

    /// Duplicate an item as a new standalone record.
    pub fn duplicate_item(
        &self,
        id: String,
        actor: Option<String>,
    ) -> Result<FfiOutcome, CatalogFfiError> {
        let mut repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.duplicate(&id, actor.as_deref())))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Apply a JSON patch (`null` clears a field, missing keys are kept).
    pub fn update_item(&self, id: String, patch_json: String) -> Result<FfiOutcome, CatalogFfiError> {
        let patch: ItemPatch = match serde_json::from_str(&patch_json) {
            Ok(patch) => patch,
            Err(e) => return Ok(FfiOutcome::failure(&CatalogError::from(e))),
        };
        let mut repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.update(&id, patch)))
    }

    /// Remove an item (families cascade to their variants).
    pub fn remove_item(&self, id: String) -> Result<FfiOutcome, CatalogFfiError> {
        let mut repo = self.repo.lock()?;
        Ok(match repo.remove(&id) {
            Ok(removed) => {
                let mut outcome = FfiOutcome::success(None);
                outcome.removed_ids = removed;
                outcome
            }
            Err(e) => FfiOutcome::failure(&e),
        })
    }

    pub fn convert_to_family(&self, id: String) -> Result<FfiOutcome, CatalogFfiError> {
        let mut repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.convert_to_family(&id)))
    }

    pub fn toggle_active(&self, id: String) -> Result<FfiOutcome, CatalogFfiError> {
        let mut repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.toggle_active(&id)))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a stored record by id.
    pub fn get_item(&self, id: String) -> Result<Option<FfiCatalogItem>, CatalogFfiError> {
        let repo = self.repo.lock()?;
        Ok(repo.get(&id).map(Into::into))
    }

    /// Effective (inherited) view of an item.
    pub fn resolve_item(&self, id: String) -> Result<FfiOutcome, CatalogFfiError> {
        let repo = self.repo.lock()?;
        Ok(FfiOutcome::from_item(repo.resolve(&id)))
    }

    /// Search effective views.
    pub fn search(&self, query: FfiSearchQuery) -> Result<Vec<FfiCatalogItem>, CatalogFfiError> {
        let query = query.into_query()?;
        let repo = self.repo.lock()?;
        Ok(repo.search(&query).into_iter().map(Into::into).collect())
    }

    /// Names close to `text`, for "did you mean" hints.
    pub fn suggest(&self, text: String, limit: u32) -> Result<Vec<FfiSuggestion>, CatalogFfiError> {
        let repo = self.repo.lock()?;
        Ok(repo
            .suggest(&text, limit as usize)
            .into_iter()
            .map(|s| FfiSuggestion {
                id: s.id,
                name: s.name,
                score: s.score,
            })
            .collect())
    }

    pub fn get_stats(&self) -> Result<FfiCatalogStats, CatalogFfiError> {
        let repo = self.repo.lock()?;
        Ok(repo.stats().into())
    }

    /// Integrity issues, one JSON object per issue.
    pub fn check_integrity(&self) -> Result<Vec<String>, CatalogFfiError> {
        let repo = self.repo.lock()?;
        repo.check_integrity()
            .iter()
            .map(|issue| serde_json::to_string(issue).map_err(CatalogFfiError::from))
            .collect()
    }

    // =========================================================================
    // Import / Export
    // =========================================================================

    /// Export stored records as a JSON bundle.
    pub fn export_json(&self, filter_json: Option<String>) -> Result<String, CatalogFfiError> {
        let filter: ExportFilter = match filter_json {
            Some(json) => serde_json::from_str(&json)?,
            None => ExportFilter::default(),
        };
        let repo = self.repo.lock()?;
        repo.export_json(&filter)
            .map_err(|e| CatalogFfiError::SerializationError(e.to_string()))
    }

    /// Import a bundle or a bare item array.
    pub fn import_json(
        &self,
        json: String,
        actor: Option<String>,
        overwrite: bool,
    ) -> Result<FfiImportReport, CatalogFfiError> {
        let mut repo = self.repo.lock()?;
        let result = repo.import_json(&json, actor.as_deref(), ImportOptions { overwrite });
        Ok(match result {
            Ok(report) => report.into(),
            Err(e) => FfiImportReport {
                success: false,
                imported: Vec::new(),
                failed: Vec::new(),
                errors: to_hash_map(e.error_map()),
            },
        })
    }
}

fn to_hash_map(map: std::collections::BTreeMap<String, String>) -> HashMap<String, String> {
    map.into_iter().collect()
}

// =========================================================================
// FFI Types
// =========================================================================

/// Discriminated result of a catalog operation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOutcome {
    pub success: bool,
    pub item: Option<FfiCatalogItem>,
    pub items: Vec<FfiCatalogItem>,
    pub removed_ids: Vec<String>,
    /// Field (or "general") -> error code
    pub errors: HashMap<String, String>,
}

impl FfiOutcome {
    fn success(item: Option<CatalogItem>) -> Self {
        Self {
            success: true,
            item: item.map(Into::into),
            items: Vec::new(),
            removed_ids: Vec::new(),
            errors: HashMap::new(),
        }
    }

    fn failure(error: &CatalogError) -> Self {
        Self {
            success: false,
            item: None,
            items: Vec::new(),
            removed_ids: Vec::new(),
            errors: to_hash_map(error.error_map()),
        }
    }

    fn from_item(result: CatalogResult<CatalogItem>) -> Self {
        match result {
            Ok(item) => Self::success(Some(item)),
            Err(e) => Self::failure(&e),
        }
    }
}

/// FFI-safe catalog item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCatalogItem {
    pub id: String,
    pub parent_id: Option<String>,
    pub item_type: String,
    pub is_family: bool,
    pub is_variant: bool,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub vat_rate: Option<f64>,
    pub is_active: bool,
    pub dosage: Option<f64>,
    pub dosage_unit: Option<String>,
    pub volume: Option<f64>,
    pub provenance: Option<String>,
    pub duration: Option<u32>,
    pub prep_before: Option<String>,
    pub prep_after: Option<String>,
    pub variants: Vec<String>,
    pub cleared: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
}

impl From<CatalogItem> for FfiCatalogItem {
    fn from(item: CatalogItem) -> Self {
        Self {
            id: item.id,
            parent_id: item.parent_id,
            item_type: item.item_type.to_string(),
            is_family: item.is_family,
            is_variant: item.is_variant,
            name: item.name,
            description: item.description,
            category: item.category,
            price: item.price,
            vat_rate: item.vat_rate,
            is_active: item.is_active,
            dosage: item.dosage,
            dosage_unit: item.dosage_unit,
            volume: item.volume,
            provenance: item.provenance,
            duration: item.duration,
            prep_before: item.prep_before,
            prep_after: item.prep_after,
            variants: item.variants,
            cleared: item.cleared.iter().map(|f| f.to_string()).collect(),
            created_at: item.created_at,
            updated_at: item.updated_at,
            created_by: item.created_by,
        }
    }
}

/// FFI-safe item draft (create forms).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItemDraft {
    pub name: String,
    pub item_type: Option<String>,
    pub is_family: bool,
    pub is_variant: bool,
    pub parent_id: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub vat_rate: Option<f64>,
    pub is_active: Option<bool>,
    pub dosage: Option<f64>,
    pub dosage_unit: Option<String>,
    pub volume: Option<f64>,
    pub provenance: Option<String>,
    pub duration: Option<u32>,
    pub prep_before: Option<String>,
    pub prep_after: Option<String>,
}

impl FfiItemDraft {
    fn into_draft(self) -> Result<ItemDraft, CatalogFfiError> {
        let item_type = parse_item_type(self.item_type.as_deref())?;
        Ok(ItemDraft {
            name: self.name,
            item_type,
            is_family: self.is_family,
            is_variant: self.is_variant,
            parent_id: self.parent_id,
            description: self.description,
            category: self.category,
            price: self.price,
            vat_rate: self.vat_rate,
            is_active: self.is_active,
            dosage: self.dosage,
            dosage_unit: self.dosage_unit,
            volume: self.volume,
            provenance: self.provenance,
            duration: self.duration,
            prep_before: self.prep_before,
            prep_after: self.prep_after,
            cleared: Vec::new(),
        })
    }
}

fn parse_item_type(value: Option<&str>) -> Result<Option<ItemType>, CatalogFfiError> {
    value
        .map(|s| s.parse::<ItemType>().map_err(CatalogFfiError::InvalidInput))
        .transpose()
}

/// FFI-safe search query.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchQuery {
    pub text: String,
    pub item_type: Option<String>,
    pub category: Option<String>,
    pub active_only: bool,
    pub include_variants: bool,
}

impl FfiSearchQuery {
    fn into_query(self) -> Result<SearchQuery, CatalogFfiError> {
        Ok(SearchQuery {
            text: self.text,
            item_type: parse_item_type(self.item_type.as_deref())?,
            category: self.category,
            active_only: self.active_only,
            include_variants: self.include_variants,
        })
    }
}

/// FFI-safe suggestion.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSuggestion {
    pub id: String,
    pub name: String,
    pub score: f64,
}

/// FFI-safe catalog statistics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCatalogStats {
    pub total: u32,
    pub active: u32,
    pub inactive: u32,
    pub families: u32,
    pub variants: u32,
    pub standalone: u32,
    pub orphaned: u32,
    pub by_type: HashMap<String, u32>,
}

impl From<CatalogStats> for FfiCatalogStats {
    fn from(stats: CatalogStats) -> Self {
        Self {
            total: stats.total as u32,
            active: stats.active as u32,
            inactive: stats.inactive as u32,
            families: stats.families as u32,
            variants: stats.variants as u32,
            standalone: stats.standalone as u32,
            orphaned: stats.orphaned as u32,
            by_type: stats
                .by_type
                .into_iter()
                .map(|(t, n)| (t.to_string(), n as u32))
                .collect(),
        }
    }
}

/// FFI-safe import failure for one batch entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportFailure {
    pub index: u32,
    pub errors: HashMap<String, String>,
}

/// FFI-safe import report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportReport {
    /// False when the document could not be read or stored at all
    pub success: bool,
    pub imported: Vec<String>,
    pub failed: Vec<FfiImportFailure>,
    pub errors: HashMap<String, String>,
}

impl From<ImportReport> for FfiImportReport {
    fn from(report: ImportReport) -> Self {
        Self {
            success: true,
            imported: report.imported.into_iter().map(|(_, id)| id).collect(),
            failed: report
                .failed
                .into_iter()
                .map(|(index, errors)| FfiImportFailure {
                    index: index as u32,
                    errors: to_hash_map(errors),
                })
                .collect(),
            errors: HashMap::new(),
        }
    }
}
