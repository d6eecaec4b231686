//! Property tests for variant resolution and propagation.

use clinic_catalog_core::inheritance::merge;
use clinic_catalog_core::{CatalogItem, CatalogRepository, ItemDraft, ItemField, ItemPatch, ItemType};
use proptest::prelude::*;

const VAT_RATES: [f64; 6] = [0.0, 2.1, 5.0, 5.5, 10.0, 20.0];

fn opt_text() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[a-z]{1,12}".prop_map(Some),
    ]
}

fn opt_number() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), (0.0f64..1000.0).prop_map(Some)]
}

fn record(is_variant: bool) -> impl Strategy<Value = CatalogItem> {
    (
        (opt_text(), opt_text(), opt_text(), opt_text()),
        (opt_number(), opt_number(), opt_number(), opt_number()),
        prop_oneof![Just(None), (5u32..=480).prop_map(Some)],
        proptest::sample::subsequence(ItemField::ALL.to_vec(), 0..3),
    )
        .prop_map(
            move |((description, category, provenance, dosage_unit), (price, vat, dosage, volume), duration, cleared)| {
                let id = if is_variant { "variant" } else { "family" };
                let mut item = CatalogItem::new(id.into(), format!("{} name", id), ItemType::Medication);
                item.description = description;
                item.category = category;
                item.provenance = provenance;
                item.dosage_unit = dosage_unit;
                item.price = price;
                item.vat_rate = vat;
                item.dosage = dosage;
                item.volume = volume;
                item.duration = duration;
                if is_variant {
                    item.is_variant = true;
                    item.parent_id = Some("family".into());
                    item.cleared = cleared;
                } else {
                    item.is_family = true;
                    item.variants = vec!["variant".into()];
                }
                item
            },
        )
}

proptest! {
    #[test]
    fn prop_present_variant_fields_win(family in record(false), variant in record(true)) {
        let resolved = merge(&variant, &family);

        for field in ItemField::ALL {
            let expected = if variant.is_cleared(field) {
                None
            } else if variant.field(field).is_present() {
                Some(variant.field(field))
            } else {
                Some(family.field(field))
            };
            match expected {
                None => prop_assert!(!resolved.field(field).is_present(), "{} should be cleared", field),
                Some(value) if value.is_present() => prop_assert_eq!(resolved.field(field), value),
                Some(_) => prop_assert!(!resolved.field(field).is_present()),
            }
        }

        prop_assert_eq!(&resolved.id, &variant.id);
        prop_assert_eq!(&resolved.name, &variant.name);
        prop_assert!(resolved.is_variant && !resolved.is_family);
    }

    #[test]
    fn prop_merge_leaves_inputs_untouched(family in record(false), variant in record(true)) {
        let (family_before, variant_before) = (family.clone(), variant.clone());
        let _ = merge(&variant, &family);
        prop_assert_eq!(family, family_before);
        prop_assert_eq!(variant, variant_before);
    }

    #[test]
    fn prop_vat_propagation_is_selective(
        old_rate in proptest::sample::select(VAT_RATES.to_vec()),
        new_rate in proptest::sample::select(VAT_RATES.to_vec()),
        custom_rate in proptest::sample::select(VAT_RATES.to_vec()),
    ) {
        prop_assume!(custom_rate != old_rate);

        let mut repo = CatalogRepository::in_memory();
        let created = repo
            .create_family(
                ItemDraft::new("Paracetamol").with_price(3.0).with_vat_rate(old_rate),
                vec![
                    ItemDraft::new("Paracetamol 500mg"),
                    ItemDraft::new("Paracetamol 1g").with_vat_rate(old_rate),
                    ItemDraft::new("Paracetamol syrup").with_vat_rate(custom_rate),
                ],
                None,
            )
            .unwrap();

        repo.update(&created.family.id, ItemPatch::default().with_vat_rate(new_rate))
            .unwrap();

        let stored: Vec<Option<f64>> = created
            .variants
            .iter()
            .map(|v| repo.get(&v.id).unwrap().vat_rate)
            .collect();
        if new_rate == old_rate {
            prop_assert_eq!(stored, vec![None, Some(old_rate), Some(custom_rate)]);
        } else {
            prop_assert_eq!(stored, vec![Some(new_rate), Some(new_rate), Some(custom_rate)]);
        }
    }
}
