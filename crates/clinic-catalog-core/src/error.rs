//! Error types returned by repository operations.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Key used for errors that are not tied to a single field.
pub const GENERAL_KEY: &str = "general";

/// Machine-readable error code, rendered as snake_case for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Required,
    TooShort,
    TooLong,
    OutOfRange,
    InvalidNumber,
    NotAllowed,
    Conflict,
    FamilyNotAllowed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::TooShort => "too_short",
            ErrorCode::TooLong => "too_long",
            ErrorCode::OutOfRange => "out_of_range",
            ErrorCode::InvalidNumber => "invalid_number",
            ErrorCode::NotAllowed => "not_allowed",
            ErrorCode::Conflict => "conflict",
            ErrorCode::FamilyNotAllowed => "family_not_allowed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name -> error code, one entry per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, ErrorCode>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first error reported for a field wins.
    pub fn add(&mut self, field: impl Into<String>, code: ErrorCode) {
        self.0.entry(field.into()).or_insert(code);
    }

    pub fn get(&self, field: &str) -> Option<ErrorCode> {
        self.0.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorCode)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Re-key every error under `prefix`, e.g. `variants[1].name`.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(k, v)| (format!("{}.{}", prefix, k), v))
                .collect(),
        )
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, code) in other.0 {
            self.add(field, code);
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Broken or refused family/variant relationship.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferentialError {
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("family not found: {0}")]
    FamilyNotFound(String),

    #[error("item is not a family: {0}")]
    NotAFamily(String),

    #[error("a variant cannot become a family: {0}")]
    VariantCannotBeFamily(String),

    #[error("items of this type cannot be families: {0}")]
    TypeCannotBeFamily(String),

    #[error("variant has no family: {0}")]
    OrphanedVariant(String),

    #[error("id already in use: {0}")]
    DuplicateId(String),
}

impl ReferentialError {
    pub fn code(&self) -> &'static str {
        match self {
            ReferentialError::ItemNotFound(_) => "item_not_found",
            ReferentialError::FamilyNotFound(_) => "family_not_found",
            ReferentialError::NotAFamily(_) => "not_a_family",
            ReferentialError::VariantCannotBeFamily(_) => "variant_cannot_be_family",
            ReferentialError::TypeCannotBeFamily(_) => "type_cannot_be_family",
            ReferentialError::OrphanedVariant(_) => "orphaned_variant",
            ReferentialError::DuplicateId(_) => "duplicate_id",
        }
    }
}

/// Failure of a repository operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Referential(#[from] ReferentialError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid import document: {0}")]
    Format(#[from] serde_json::Error),
}

impl CatalogError {
    /// Flatten into the `{field|general -> code}` map the forms display.
    pub fn error_map(&self) -> BTreeMap<String, String> {
        match self {
            CatalogError::Validation(errors) => errors
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            CatalogError::Referential(e) => {
                BTreeMap::from([(GENERAL_KEY.to_string(), e.code().to_string())])
            }
            CatalogError::Storage(_) => {
                BTreeMap::from([(GENERAL_KEY.to_string(), "storage_error".to_string())])
            }
            CatalogError::Format(_) => {
                BTreeMap::from([(GENERAL_KEY.to_string(), "invalid_format".to_string())])
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }

    pub fn is_referential(&self) -> bool {
        matches!(self, CatalogError::Referential(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, CatalogError::Storage(_))
    }

    /// Field errors, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            CatalogError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        CatalogError::Validation(errors)
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
