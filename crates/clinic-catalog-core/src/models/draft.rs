//! Input models for creating and editing catalog items.

use serde::{Deserialize, Deserializer, Serialize};

use super::item::{CatalogItem, ItemField, ItemType};

/// Candidate for a new catalog item, as submitted by the create/edit forms.
///
/// Everything except the name is optional; the repository fills in defaults
/// before validating.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: Option<ItemType>,
    #[serde(default)]
    pub is_family: bool,
    #[serde(default)]
    pub is_variant: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub vat_rate: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub dosage: Option<f64>,
    #[serde(default)]
    pub dosage_unit: Option<String>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub provenance: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub prep_before: Option<String>,
    #[serde(default)]
    pub prep_after: Option<String>,
    #[serde(default)]
    pub cleared: Vec<ItemField>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_vat_rate(mut self, vat_rate: f64) -> Self {
        self.vat_rate = Some(vat_rate);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }

    pub fn with_dosage(mut self, dosage: f64, unit: impl Into<String>) -> Self {
        self.dosage = Some(dosage);
        self.dosage_unit = Some(unit.into());
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = Some(minutes);
        self
    }

    /// Mark the draft as a variant of `family_id`.
    pub fn variant_of(mut self, family_id: impl Into<String>) -> Self {
        self.is_variant = true;
        self.parent_id = Some(family_id.into());
        self
    }

    /// Build a draft carrying every attribute of an existing record.
    ///
    /// Structural fields (id, family links, timestamps) are not copied.
    pub fn from_item(item: &CatalogItem) -> Self {
        Self {
            name: item.name.clone(),
            item_type: Some(item.item_type),
            is_family: false,
            is_variant: false,
            parent_id: None,
            description: item.description.clone(),
            category: item.category.clone(),
            price: item.price,
            vat_rate: item.vat_rate,
            is_active: Some(item.is_active),
            dosage: item.dosage,
            dosage_unit: item.dosage_unit.clone(),
            volume: item.volume,
            provenance: item.provenance.clone(),
            duration: item.duration,
            prep_before: item.prep_before.clone(),
            prep_after: item.prep_after.clone(),
            cleared: Vec::new(),
        }
    }

    /// Turn the draft into a record. Defaults are applied by the caller.
    pub(crate) fn into_item(self, id: String, item_type: ItemType) -> CatalogItem {
        let mut item = CatalogItem::new(id, self.name, item_type);
        item.is_family = self.is_family;
        item.is_variant = self.is_variant;
        item.parent_id = self.parent_id;
        item.description = self.description;
        item.category = self.category;
        item.price = self.price;
        item.vat_rate = self.vat_rate;
        item.is_active = self.is_active.unwrap_or(true);
        item.dosage = self.dosage;
        item.dosage_unit = self.dosage_unit;
        item.volume = self.volume;
        item.provenance = self.provenance;
        item.duration = self.duration;
        item.prep_before = self.prep_before;
        item.prep_after = self.prep_after;
        item.cleared = self.cleared;
        item
    }
}

/// Partial update of a catalog item.
///
/// Nullable fields are tri-state: absent leaves the stored value alone,
/// `null` clears it, a value replaces it. Structural fields (id, family
/// links, timestamps, author) are not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub dosage: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub dosage_unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub volume: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub prep_before: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub prep_after: Option<Option<String>>,
    /// Replaces the variant's explicit "intentionally empty" markers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared: Option<Vec<ItemField>>,
}

/// Distinguish a missing key (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ItemPatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(Some(price));
        self
    }

    pub fn with_vat_rate(mut self, vat_rate: f64) -> Self {
        self.vat_rate = Some(Some(vat_rate));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(Some(category.into()));
        self
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(Some(provenance.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = Some(Some(minutes));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    /// Check if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == ItemPatch::default()
    }

    /// Merge the patch into `item`. Does not touch timestamps.
    pub fn apply_to(&self, item: &mut CatalogItem) {
        if let Some(item_type) = self.item_type {
            item.item_type = item_type;
        }
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(active) = self.is_active {
            item.is_active = active;
        }
        if let Some(v) = &self.description {
            item.description = v.clone();
        }
        if let Some(v) = &self.category {
            item.category = v.clone();
        }
        if let Some(v) = self.price {
            item.price = v;
        }
        if let Some(v) = self.vat_rate {
            item.vat_rate = v;
        }
        if let Some(v) = self.dosage {
            item.dosage = v;
        }
        if let Some(v) = &self.dosage_unit {
            item.dosage_unit = v.clone();
        }
        if let Some(v) = self.volume {
            item.volume = v;
        }
        if let Some(v) = &self.provenance {
            item.provenance = v.clone();
        }
        if let Some(v) = self.duration {
            item.duration = v;
        }
        if let Some(v) = &self.prep_before {
            item.prep_before = v.clone();
        }
        if let Some(v) = &self.prep_after {
            item.prep_after = v.clone();
        }
        if let Some(cleared) = &self.cleared {
            item.cleared = cleared.clone();
        }
    }
}
