//! Repository configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ItemType;
use crate::validation::{ValidationRules, DEFAULT_VAT_RATES};

/// Default storage slot holding the item collection.
pub const DEFAULT_SLOT: &str = "catalog_items";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What to do when a variant's family cannot be found at resolution time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OrphanPolicy {
    /// Return the variant unchanged and log the condition
    #[default]
    Fallback,
    /// Fail with a referential error
    Reject,
}

/// Tunables for a [`crate::CatalogRepository`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryConfig {
    /// Storage slot name
    pub slot: String,
    /// Allowed VAT rates, in percent
    pub vat_rates: Vec<f64>,
    /// VAT applied to new non-variant items that do not specify one
    pub default_vat_rate: f64,
    /// Appended to the name of duplicated items
    pub duplicate_suffix: String,
    /// Item types allowed to own variants
    pub family_types: Vec<ItemType>,
    pub orphan_policy: OrphanPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            slot: DEFAULT_SLOT.to_string(),
            vat_rates: DEFAULT_VAT_RATES.to_vec(),
            default_vat_rate: 20.0,
            duplicate_suffix: " (copy)".to_string(),
            family_types: vec![ItemType::Medication, ItemType::Treatment],
            orphan_policy: OrphanPolicy::Fallback,
        }
    }
}

impl RepositoryConfig {
    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject configurations the repository cannot work with.
    pub fn check(&self) -> ConfigResult<()> {
        if self.slot.trim().is_empty() {
            return Err(ConfigError::Invalid("slot must not be empty".into()));
        }
        if self.vat_rates.is_empty() {
            return Err(ConfigError::Invalid("at least one VAT rate is required".into()));
        }
        if !self.rules().is_allowed_vat(self.default_vat_rate) {
            return Err(ConfigError::Invalid(format!(
                "default VAT rate {} is not in the allowed set",
                self.default_vat_rate
            )));
        }
        Ok(())
    }

    pub fn rules(&self) -> ValidationRules {
        ValidationRules::new(self.vat_rates.clone())
    }

    pub fn allows_family(&self, item_type: ItemType) -> bool {
        self.family_types.contains(&item_type)
    }
}
