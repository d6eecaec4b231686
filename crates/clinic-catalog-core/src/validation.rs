//! Field-level validation of catalog records.
//!
//! Validation is pure: it looks at one record and reports every failing
//! field. Callers decide which view to validate (the merged record on
//! update, the effective view for variants).

use crate::error::{ErrorCode, ValidationErrors};
use crate::models::CatalogItem;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;
pub const PRICE_MAX: f64 = 999_999.99;
pub const DOSAGE_MAX: f64 = 999_999.0;
pub const VOLUME_MAX: f64 = 10_000.0;
pub const DURATION_MIN: u32 = 5;
pub const DURATION_MAX: u32 = 480;

/// VAT rates accepted when nothing else is configured.
pub const DEFAULT_VAT_RATES: [f64; 6] = [0.0, 2.1, 5.0, 5.5, 10.0, 20.0];

/// Tolerance when comparing a rate against the allowed set.
const VAT_EPSILON: f64 = 1e-9;

/// Configurable part of the rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRules {
    vat_rates: Vec<f64>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::new(DEFAULT_VAT_RATES.to_vec())
    }
}

impl ValidationRules {
    pub fn new(vat_rates: Vec<f64>) -> Self {
        Self { vat_rates }
    }

    pub fn vat_rates(&self) -> &[f64] {
        &self.vat_rates
    }

    pub fn is_allowed_vat(&self, rate: f64) -> bool {
        self.vat_rates.iter().any(|r| (r - rate).abs() < VAT_EPSILON)
    }
}

/// Outcome of validating one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: ValidationErrors,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }
}

/// Check a record against the domain rules.
pub fn validate(item: &CatalogItem, rules: &ValidationRules) -> ValidationReport {
    let mut errors = ValidationErrors::new();

    if item.is_family && item.is_variant {
        errors.add("isVariant", ErrorCode::Conflict);
    }
    if item.is_variant && item.parent_id.as_deref().map_or(true, str::is_empty) {
        errors.add("parentId", ErrorCode::Required);
    }

    check_name(&mut errors, &item.name);

    match item.price {
        None => errors.add("price", ErrorCode::Required),
        Some(price) => check_range(&mut errors, "price", price, 0.0, PRICE_MAX),
    }

    match item.vat_rate {
        None => errors.add("vatRate", ErrorCode::Required),
        Some(rate) if !rate.is_finite() => errors.add("vatRate", ErrorCode::InvalidNumber),
        Some(rate) if !rules.is_allowed_vat(rate) => errors.add("vatRate", ErrorCode::NotAllowed),
        Some(_) => {}
    }

    if let Some(dosage) = item.dosage {
        check_range(&mut errors, "dosage", dosage, 0.0, DOSAGE_MAX);
    }
    if let Some(volume) = item.volume {
        check_range(&mut errors, "volume", volume, 0.0, VOLUME_MAX);
    }
    if let Some(duration) = item.duration {
        if !(DURATION_MIN..=DURATION_MAX).contains(&duration) {
            errors.add("duration", ErrorCode::OutOfRange);
        }
    }

    ValidationReport { errors }
}

/// Name rule on its own. Names are never inherited, so variants run it on
/// their stored record as well as on their effective view.
pub fn check_name(errors: &mut ValidationErrors, name: &str) {
    let name_len = name.trim().chars().count();
    if name_len == 0 {
        errors.add("name", ErrorCode::Required);
    } else if name_len < NAME_MIN_LEN {
        errors.add("name", ErrorCode::TooShort);
    } else if name_len > NAME_MAX_LEN {
        errors.add("name", ErrorCode::TooLong);
    }
}

fn check_range(errors: &mut ValidationErrors, field: &str, value: f64, min: f64, max: f64) {
    if !value.is_finite() {
        errors.add(field, ErrorCode::InvalidNumber);
    } else if value < min || value > max {
        errors.add(field, ErrorCode::OutOfRange);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemType;

    fn valid_item() -> CatalogItem {
        let mut item = CatalogItem::new("id".into(), "Ibuprofen".into(), ItemType::Medication);
        item.price = Some(5.5);
        item.vat_rate = Some(20.0);
        item
    }

    fn errors_of(item: &CatalogItem) -> ValidationErrors {
        validate(item, &ValidationRules::default()).errors().clone()
    }

    #[test]
    fn test_valid_item() {
        assert!(validate(&valid_item(), &ValidationRules::default()).is_valid());
    }

    #[test]
    fn test_name_bounds() {
        let mut item = valid_item();
        item.name = "A".into();
        assert_eq!(errors_of(&item).get("name"), Some(ErrorCode::TooShort));

        item.name = "   ".into();
        assert_eq!(errors_of(&item).get("name"), Some(ErrorCode::Required));

        item.name = "x".repeat(101);
        assert_eq!(errors_of(&item).get("name"), Some(ErrorCode::TooLong));

        item.name = "x".repeat(100);
        assert!(errors_of(&item).is_empty());
    }

    #[test]
    fn test_price_bounds() {
        let mut item = valid_item();
        item.price = Some(-1.0);
        assert_eq!(errors_of(&item).get("price"), Some(ErrorCode::OutOfRange));

        item.price = Some(1_000_000.0);
        assert_eq!(errors_of(&item).get("price"), Some(ErrorCode::OutOfRange));

        item.price = Some(f64::NAN);
        assert_eq!(errors_of(&item).get("price"), Some(ErrorCode::InvalidNumber));

        item.price = None;
        assert_eq!(errors_of(&item).get("price"), Some(ErrorCode::Required));

        item.price = Some(PRICE_MAX);
        assert!(errors_of(&item).is_empty());
    }

    #[test]
    fn test_vat_must_be_allowed() {
        let mut item = valid_item();
        item.vat_rate = Some(19.6);
        assert_eq!(errors_of(&item).get("vatRate"), Some(ErrorCode::NotAllowed));

        item.vat_rate = None;
        assert_eq!(errors_of(&item).get("vatRate"), Some(ErrorCode::Required));

        let rules = ValidationRules::new(vec![19.6]);
        item.vat_rate = Some(19.6);
        assert!(validate(&item, &rules).is_valid());
    }

    #[test]
    fn test_optional_ranges() {
        let mut item = valid_item();
        item.dosage = Some(1_000_000.0);
        item.volume = Some(10_000.5);
        item.duration = Some(4);
        let errors = errors_of(&item);
        assert_eq!(errors.get("dosage"), Some(ErrorCode::OutOfRange));
        assert_eq!(errors.get("volume"), Some(ErrorCode::OutOfRange));
        assert_eq!(errors.get("duration"), Some(ErrorCode::OutOfRange));

        item.dosage = Some(0.0);
        item.volume = Some(10_000.0);
        item.duration = Some(480);
        assert!(errors_of(&item).is_empty());
    }

    #[test]
    fn test_structural_checks() {
        let mut item = valid_item();
        item.is_family = true;
        item.is_variant = true;
        let errors = errors_of(&item);
        assert_eq!(errors.get("isVariant"), Some(ErrorCode::Conflict));
        assert_eq!(errors.get("parentId"), Some(ErrorCode::Required));
    }

    #[test]
    fn test_reports_every_failing_field() {
        let mut item = valid_item();
        item.name = "A".into();
        item.price = Some(-1.0);
        let errors = errors_of(&item);
        assert_eq!(errors.len(), 2);
        assert!(errors.contains("name"));
        assert!(errors.contains("price"));
    }
}
