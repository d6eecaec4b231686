//! Catalog item models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of catalog item.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Dispensed or administered product
    #[default]
    Medication,
    /// Procedure performed on a patient
    Treatment,
    /// Billable service (consultation, boarding, ...)
    Service,
}

impl ItemType {
    /// All item types, in display order.
    pub const ALL: [ItemType; 3] = [ItemType::Medication, ItemType::Treatment, ItemType::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Medication => "medication",
            ItemType::Treatment => "treatment",
            ItemType::Service => "service",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "medication" => Ok(ItemType::Medication),
            "treatment" => Ok(ItemType::Treatment),
            "service" => Ok(ItemType::Service),
            other => Err(format!("unknown item type: {}", other)),
        }
    }
}

/// Optional attributes a variant may inherit from its family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ItemField {
    Description,
    Category,
    Price,
    VatRate,
    Dosage,
    DosageUnit,
    Volume,
    Provenance,
    Duration,
    PrepBefore,
    PrepAfter,
}

impl ItemField {
    pub const ALL: [ItemField; 11] = [
        ItemField::Description,
        ItemField::Category,
        ItemField::Price,
        ItemField::VatRate,
        ItemField::Dosage,
        ItemField::DosageUnit,
        ItemField::Volume,
        ItemField::Provenance,
        ItemField::Duration,
        ItemField::PrepBefore,
        ItemField::PrepAfter,
    ];

    /// Optional fields a family pushes down to its variants when they change.
    /// `type` is propagated alongside them but is not optional.
    pub const PROPAGATED: [ItemField; 3] =
        [ItemField::Category, ItemField::Provenance, ItemField::VatRate];

    /// Wire name of the field (camelCase, as persisted).
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Description => "description",
            ItemField::Category => "category",
            ItemField::Price => "price",
            ItemField::VatRate => "vatRate",
            ItemField::Dosage => "dosage",
            ItemField::DosageUnit => "dosageUnit",
            ItemField::Volume => "volume",
            ItemField::Provenance => "provenance",
            ItemField::Duration => "duration",
            ItemField::PrepBefore => "prepBefore",
            ItemField::PrepAfter => "prepAfter",
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single item in the clinic catalog.
///
/// The same record shape covers standalone items, families and variants.
/// Variants store only the attributes they override; see
/// [`crate::inheritance`] for how the effective view is computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Unique identifier
    #[serde(default)]
    pub id: String,
    /// Owning family (variants only)
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Item kind
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    /// Whether this item owns variants
    #[serde(default)]
    pub is_family: bool,
    /// Whether this item belongs to a family
    #[serde(default)]
    pub is_variant: bool,
    /// Display name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Category reference id (owned by the remote categories service)
    #[serde(default)]
    pub category: Option<String>,
    /// Unit price, tax excluded
    #[serde(default)]
    pub price: Option<f64>,
    /// VAT rate in percent
    #[serde(default)]
    pub vat_rate: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub dosage: Option<f64>,
    #[serde(default)]
    pub dosage_unit: Option<String>,
    /// Volume in mL
    #[serde(default)]
    pub volume: Option<f64>,
    /// Origin (laboratory, supplier, ...)
    #[serde(default)]
    pub provenance: Option<String>,
    /// Duration in minutes (treatments and services)
    #[serde(default)]
    pub duration: Option<u32>,
    /// Preparation instructions before the act
    #[serde(default)]
    pub prep_before: Option<String>,
    /// Instructions after the act
    #[serde(default)]
    pub prep_after: Option<String>,
    /// Child ids, maintained on families only
    #[serde(default)]
    pub variants: Vec<String>,
    /// Fields a variant deliberately leaves empty instead of inheriting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleared: Vec<ItemField>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Actor who created the record
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_active() -> bool {
    true
}

impl CatalogItem {
    /// Create a standalone item with required fields.
    pub fn new(id: String, name: String, item_type: ItemType) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            parent_id: None,
            item_type,
            is_family: false,
            is_variant: false,
            name,
            description: None,
            category: None,
            price: None,
            vat_rate: None,
            is_active: true,
            dosage: None,
            dosage_unit: None,
            volume: None,
            provenance: None,
            duration: None,
            prep_before: None,
            prep_after: None,
            variants: Vec::new(),
            cleared: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            created_by: None,
        }
    }

    /// Neither a family nor a variant.
    pub fn is_standalone(&self) -> bool {
        !self.is_family && !self.is_variant
    }

    /// Whether the family lists `id` among its variants.
    pub fn has_variant(&self, id: &str) -> bool {
        self.variants.iter().any(|v| v == id)
    }

    /// Whether a variant marked `field` as intentionally empty.
    pub fn is_cleared(&self, field: ItemField) -> bool {
        self.cleared.contains(&field)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Read an optional field as a comparable value.
    pub fn field(&self, field: ItemField) -> FieldValue {
        match field {
            ItemField::Description => FieldValue::text(&self.description),
            ItemField::Category => FieldValue::text(&self.category),
            ItemField::Price => FieldValue::number(self.price),
            ItemField::VatRate => FieldValue::number(self.vat_rate),
            ItemField::Dosage => FieldValue::number(self.dosage),
            ItemField::DosageUnit => FieldValue::text(&self.dosage_unit),
            ItemField::Volume => FieldValue::number(self.volume),
            ItemField::Provenance => FieldValue::text(&self.provenance),
            ItemField::Duration => FieldValue::number(self.duration.map(f64::from)),
            ItemField::PrepBefore => FieldValue::text(&self.prep_before),
            ItemField::PrepAfter => FieldValue::text(&self.prep_after),
        }
    }

    /// Copy one optional field from `source`, leaving everything else alone.
    pub fn copy_field_from(&mut self, source: &CatalogItem, field: ItemField) {
        match field {
            ItemField::Description => self.description = source.description.clone(),
            ItemField::Category => self.category = source.category.clone(),
            ItemField::Price => self.price = source.price,
            ItemField::VatRate => self.vat_rate = source.vat_rate,
            ItemField::Dosage => self.dosage = source.dosage,
            ItemField::DosageUnit => self.dosage_unit = source.dosage_unit.clone(),
            ItemField::Volume => self.volume = source.volume,
            ItemField::Provenance => self.provenance = source.provenance.clone(),
            ItemField::Duration => self.duration = source.duration,
            ItemField::PrepBefore => self.prep_before = source.prep_before.clone(),
            ItemField::PrepAfter => self.prep_after = source.prep_after.clone(),
        }
    }

    /// Reset one optional field to absent.
    pub fn clear_field(&mut self, field: ItemField) {
        match field {
            ItemField::Description => self.description = None,
            ItemField::Category => self.category = None,
            ItemField::Price => self.price = None,
            ItemField::VatRate => self.vat_rate = None,
            ItemField::Dosage => self.dosage = None,
            ItemField::DosageUnit => self.dosage_unit = None,
            ItemField::Volume => self.volume = None,
            ItemField::Provenance => self.provenance = None,
            ItemField::Duration => self.duration = None,
            ItemField::PrepBefore => self.prep_before = None,
            ItemField::PrepAfter => self.prep_after = None,
        }
    }

    /// Text the console search box matches against.
    pub fn search_text(&self) -> String {
        [
            Some(self.name.as_str()),
            self.description.as_deref(),
            self.provenance.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// Snapshot of an optional field, used for presence checks and comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Number(f64),
}

impl FieldValue {
    fn text(value: &Option<String>) -> Self {
        match value {
            Some(s) if !s.is_empty() => FieldValue::Text(s.clone()),
            _ => FieldValue::Absent,
        }
    }

    fn number(value: Option<f64>) -> Self {
        value.map(FieldValue::Number).unwrap_or(FieldValue::Absent)
    }

    /// Non-null and, for text, non-empty.
    pub fn is_present(&self) -> bool {
        !matches!(self, FieldValue::Absent)
    }
}
