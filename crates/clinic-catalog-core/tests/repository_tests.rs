//! Repository integration tests.
//!
//! End-to-end behavior of the catalog facade over the in-memory and SQLite
//! blob stores.

use clinic_catalog_core::config::DEFAULT_SLOT;
use clinic_catalog_core::{
    CatalogRepository, ExportFilter, ImportOptions, ItemDraft, ItemField, ItemPatch, ItemType,
    MemoryBlobStore, RepositoryConfig, SearchQuery,
};

fn medication(name: &str) -> ItemDraft {
    ItemDraft::new(name)
        .with_type(ItemType::Medication)
        .with_price(5.5)
        .with_vat_rate(20.0)
}

fn paracetamol_family(repo: &mut CatalogRepository) -> (String, String, String) {
    let created = repo
        .create_family(
            ItemDraft::new("Paracetamol")
                .with_type(ItemType::Medication)
                .with_vat_rate(20.0),
            vec![
                ItemDraft::new("Paracetamol 500mg").with_dosage(500.0, "mg"),
                ItemDraft::new("Paracetamol 1000mg").with_dosage(1000.0, "mg"),
            ],
            Some("vet-1"),
        )
        .unwrap();
    (
        created.family.id,
        created.variants[0].id.clone(),
        created.variants[1].id.clone(),
    )
}

#[test]
fn test_create_then_get_round_trip() {
    let mut repo = CatalogRepository::in_memory();
    let draft = medication("Ibuprofen")
        .with_description("NSAID")
        .with_provenance("Lab Beta");

    let created = repo.create(draft.clone(), Some("vet-1")).unwrap();
    let fetched = repo.get(&created.id).unwrap();

    assert_eq!(fetched, created);
    assert!(!created.id.is_empty());
    assert!(!created.created_at.is_empty());
    assert_eq!(fetched.name, draft.name);
    assert_eq!(fetched.price, draft.price);
    assert_eq!(fetched.vat_rate, draft.vat_rate);
    assert_eq!(fetched.description, draft.description);
    assert_eq!(fetched.provenance, draft.provenance);
}

#[test]
fn test_paracetamol_scenario() {
    let mut repo = CatalogRepository::in_memory();
    let (family_id, v500, v1000) = paracetamol_family(&mut repo);

    let family = repo.get(&family_id).unwrap();
    assert!(family.is_family);
    assert_eq!(family.variants, vec![v500.clone(), v1000]);

    let resolved = repo.resolve(&v500).unwrap();
    assert_eq!(resolved.vat_rate, Some(20.0));
    assert_eq!(resolved.dosage, Some(500.0));
    assert_eq!(resolved.dosage_unit.as_deref(), Some("mg"));

    // Stored variant keeps only its own values.
    assert_eq!(repo.get(&v500).unwrap().vat_rate, None);
}

#[test]
fn test_resolution_prefers_variant_values() {
    let mut repo = CatalogRepository::in_memory();
    let created = repo
        .create_family(
            medication("Meloxicam")
                .with_description("Anti-inflammatory")
                .with_category("cat-nsaid"),
            vec![ItemDraft::new("Meloxicam injectable")
                .with_price(18.0)
                .with_description("")],
            None,
        )
        .unwrap();

    let resolved = repo.resolve(&created.variants[0].id).unwrap();
    assert_eq!(resolved.price, Some(18.0));
    assert_eq!(resolved.name, "Meloxicam injectable");
    // Empty text counts as absent and inherits.
    assert_eq!(resolved.description.as_deref(), Some("Anti-inflammatory"));
    assert_eq!(resolved.category.as_deref(), Some("cat-nsaid"));
}

#[test]
fn test_cleared_field_does_not_inherit() {
    let mut repo = CatalogRepository::in_memory();
    let created = repo
        .create_family(
            medication("Amoxicillin").with_description("Broad spectrum antibiotic"),
            vec![ItemDraft::new("Amoxicillin 250mg")],
            None,
        )
        .unwrap();
    let variant_id = &created.variants[0].id;

    let patch = ItemPatch {
        cleared: Some(vec![ItemField::Description]),
        ..ItemPatch::default().clear_description()
    };
    repo.update(variant_id, patch).unwrap();

    let stored = repo.get(variant_id).unwrap();
    assert!(stored.is_cleared(ItemField::Description));
    assert_eq!(repo.resolve(variant_id).unwrap().description, None);
}

#[test]
fn test_remove_family_cascades() {
    let mut repo = CatalogRepository::in_memory();
    let (family_id, v500, v1000) = paracetamol_family(&mut repo);
    let other = repo.create(medication("Ketamine"), None).unwrap();

    let removed = repo.remove(&family_id).unwrap();
    assert_eq!(removed.len(), 3);

    for id in [&family_id, &v500, &v1000] {
        assert!(repo.get(id).is_none());
        let err = repo.resolve(id).unwrap_err();
        assert_eq!(err.error_map()["general"], "item_not_found");
    }
    assert_eq!(repo.list(), vec![other]);
}

#[test]
fn test_remove_variant_unlinks_from_family() {
    let mut repo = CatalogRepository::in_memory();
    let (family_id, v500, v1000) = paracetamol_family(&mut repo);

    let removed = repo.remove(&v500).unwrap();
    assert_eq!(removed, vec![v500.clone()]);

    let family = repo.get(&family_id).unwrap();
    assert_eq!(family.variants, vec![v1000]);
    assert!(repo.check_integrity().is_empty());
}

#[test]
fn test_selective_vat_propagation() {
    let mut repo = CatalogRepository::in_memory();
    let created = repo
        .create_family(
            medication("Paracetamol").with_vat_rate(20.0),
            vec![
                ItemDraft::new("Paracetamol 500mg"),
                ItemDraft::new("Paracetamol 1000mg").with_vat_rate(10.0),
            ],
            None,
        )
        .unwrap();
    let (v1, v2) = (&created.variants[0].id, &created.variants[1].id);

    repo.update(&created.family.id, ItemPatch::default().with_vat_rate(5.0))
        .unwrap();

    let v1_after = repo.get(v1).unwrap();
    let v2_after = repo.get(v2).unwrap();
    assert_eq!(v1_after.vat_rate, Some(5.0));
    assert_eq!(v2_after.vat_rate, Some(10.0));
    assert_eq!(repo.resolve(v2).unwrap().vat_rate, Some(10.0));

    // Only propagated variants are touched.
    assert_ne!(v1_after.updated_at, created.variants[0].updated_at);
    assert_eq!(v2_after.updated_at, created.variants[1].updated_at);
}

#[test]
fn test_remove_standalone_leaves_families_alone() {
    let mut repo = CatalogRepository::in_memory();
    let (family_id, v500, v1000) = paracetamol_family(&mut repo);
    let standalone = repo.create(medication("Ketamine"), None).unwrap();
    let family_before = repo.get(&family_id).unwrap();
    let variants_before = (repo.get(&v500).unwrap(), repo.get(&v1000).unwrap());

    let removed = repo.remove(&standalone.id).unwrap();
    assert_eq!(removed, vec![standalone.id.clone()]);
    assert!(repo.get(&standalone.id).is_none());

    assert_eq!(repo.get(&family_id).unwrap(), family_before);
    assert_eq!(repo.get(&v500).unwrap(), variants_before.0);
    assert_eq!(repo.get(&v1000).unwrap(), variants_before.1);
    assert_eq!(repo.list().len(), 3);
    assert!(repo.check_integrity().is_empty());
}

#[test]
fn test_propagation_updates_variants_holding_old_value() {
    let mut repo = CatalogRepository::in_memory();
    let created = repo
        .create_family(
            medication("Carprofen").with_provenance("Zoetis"),
            vec![
                ItemDraft::new("Carprofen 50mg").with_provenance("Zoetis"),
                ItemDraft::new("Carprofen generic").with_provenance("Generic Labs"),
            ],
            None,
        )
        .unwrap();

    repo.update(
        &created.family.id,
        ItemPatch::default().with_provenance("Zoetis France"),
    )
    .unwrap();

    let same = repo.get(&created.variants[0].id).unwrap();
    let custom = repo.get(&created.variants[1].id).unwrap();
    assert_eq!(same.provenance.as_deref(), Some("Zoetis France"));
    assert_eq!(custom.provenance.as_deref(), Some("Generic Labs"));
}

#[test]
fn test_name_and_price_are_not_propagated() {
    let mut repo = CatalogRepository::in_memory();
    let created = repo
        .create_family(
            medication("Insulin"),
            vec![ItemDraft::new("Insulin 100UI").with_price(30.0)],
            None,
        )
        .unwrap();

    repo.update(
        &created.family.id,
        ItemPatch::default().with_name("Insulin glargine").with_price(42.0),
    )
    .unwrap();

    let variant = repo.get(&created.variants[0].id).unwrap();
    assert_eq!(variant.name, "Insulin 100UI");
    assert_eq!(variant.price, Some(30.0));
}

#[test]
fn test_convert_variant_is_refused() {
    let mut repo = CatalogRepository::in_memory();
    let (_, v500, _) = paracetamol_family(&mut repo);
    let before = repo.get(&v500).unwrap();

    let err = repo.convert_to_family(&v500).unwrap_err();
    assert!(err.is_referential());
    assert_eq!(err.error_map()["general"], "variant_cannot_be_family");
    assert_eq!(repo.get(&v500).unwrap(), before);
}

#[test]
fn test_add_variant_to_non_family_is_refused() {
    let mut repo = CatalogRepository::in_memory();
    let standalone = repo.create(medication("Ibuprofen"), None).unwrap();

    let err = repo
        .add_variant(&standalone.id, ItemDraft::new("Ibuprofen 200mg"), None)
        .unwrap_err();
    assert_eq!(err.error_map()["general"], "not_a_family");

    let err = repo
        .add_variant("missing", ItemDraft::new("Ibuprofen 400mg"), None)
        .unwrap_err();
    assert_eq!(err.error_map()["general"], "family_not_found");
    assert_eq!(repo.list().len(), 1);
}

#[test]
fn test_add_variant_after_conversion() {
    let mut repo = CatalogRepository::in_memory();
    let item = repo.create(medication("Ibuprofen"), None).unwrap();
    repo.convert_to_family(&item.id).unwrap();

    let variant = repo
        .add_variant(&item.id, ItemDraft::new("Ibuprofen 400mg").with_dosage(400.0, "mg"), None)
        .unwrap();

    assert_eq!(variant.parent_id.as_deref(), Some(item.id.as_str()));
    assert_eq!(repo.get(&item.id).unwrap().variants, vec![variant.id.clone()]);
    assert_eq!(repo.resolve(&variant.id).unwrap().price, Some(5.5));
}

#[test]
fn test_validation_boundary() {
    let mut repo = CatalogRepository::in_memory();

    let err = repo
        .create(
            ItemDraft::new("A")
                .with_type(ItemType::Medication)
                .with_price(-1.0)
                .with_vat_rate(20.0),
            None,
        )
        .unwrap_err();
    let map = err.error_map();
    assert!(map.contains_key("price"));
    assert!(map.contains_key("name"));
    assert!(repo.list().is_empty());

    let ok = repo.create(medication("Ibuprofen"), None);
    assert!(ok.is_ok());
}

#[test]
fn test_failed_write_leaves_state_unchanged() {
    let backend = MemoryBlobStore::new();
    let mut repo = CatalogRepository::new(backend.clone(), RepositoryConfig::default());
    let (family_id, v500, _) = paracetamol_family(&mut repo);
    let snapshot = repo.list();

    backend.fail_writes(true);
    let err = repo
        .update(&family_id, ItemPatch::default().with_vat_rate(5.0))
        .unwrap_err();
    assert!(err.is_storage());
    assert_eq!(err.error_map()["general"], "storage_error");

    let err = repo.remove(&family_id).unwrap_err();
    assert!(err.is_storage());
    assert_eq!(repo.list(), snapshot);

    backend.fail_writes(false);
    repo.remove(&v500).unwrap();
    assert_eq!(repo.list().len(), snapshot.len() - 1);
}

#[test]
fn test_corrupt_slot_loads_empty() {
    let backend = MemoryBlobStore::new();
    backend.put_raw(DEFAULT_SLOT, "{not json");
    let mut repo = CatalogRepository::new(backend.clone(), RepositoryConfig::default());

    assert!(repo.list().is_empty());
    repo.create(medication("Ibuprofen"), None).unwrap();
    assert_eq!(repo.list().len(), 1);
    assert!(backend.raw(DEFAULT_SLOT).unwrap().contains("\"checksum\""));
}

#[test]
fn test_search_and_stats() {
    let mut repo = CatalogRepository::in_memory();
    let (family_id, _, _) = paracetamol_family(&mut repo);
    let consult = repo
        .create(
            ItemDraft::new("Consultation")
                .with_type(ItemType::Service)
                .with_price(35.0)
                .with_duration(30),
            None,
        )
        .unwrap();
    repo.toggle_active(&consult.id).unwrap();

    assert_eq!(repo.search(&SearchQuery::text("paracetamol")).len(), 3);
    assert!(repo.search(&SearchQuery::text("consultation")).is_empty());
    let all = SearchQuery {
        active_only: false,
        ..SearchQuery::text("consultation")
    };
    assert_eq!(repo.search(&all).len(), 1);

    let stats = repo.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.families, 1);
    assert_eq!(stats.variants, 2);
    assert_eq!(stats.inactive, 1);
    assert_eq!(repo.variants_of(&family_id).unwrap().len(), 2);
}

#[test]
fn test_export_then_import_into_fresh_catalog() {
    let mut source = CatalogRepository::in_memory();
    let (family_id, v500, _) = paracetamol_family(&mut source);
    let json = source.export_json(&ExportFilter::default()).unwrap();

    let mut target = CatalogRepository::in_memory();
    let report = target
        .import_json(&json, Some("importer"), ImportOptions::default())
        .unwrap();

    assert_eq!(report.imported_count(), 3);
    assert_eq!(target.get(&family_id).unwrap().variants.len(), 2);
    assert_eq!(target.resolve(&v500).unwrap().vat_rate, Some(20.0));
    assert!(target.check_integrity().is_empty());
}

#[test]
fn test_sqlite_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let (family_id, v500) = {
        let mut repo = CatalogRepository::open_sqlite(&path, RepositoryConfig::default()).unwrap();
        let (family_id, v500, _) = paracetamol_family(&mut repo);
        (family_id, v500)
    };

    let mut repo = CatalogRepository::open_sqlite(&path, RepositoryConfig::default()).unwrap();
    assert_eq!(repo.list().len(), 3);
    assert_eq!(repo.resolve(&v500).unwrap().dosage, Some(500.0));

    repo.remove(&family_id).unwrap();
    drop(repo);

    let repo = CatalogRepository::open_sqlite(&path, RepositoryConfig::default()).unwrap();
    assert!(repo.list().is_empty());
}

#[test]
fn test_custom_vat_rates_from_config() {
    let config = RepositoryConfig::from_json_str(r#"{"vatRates": [0, 7.7], "defaultVatRate": 7.7}"#)
        .unwrap();
    let mut repo = CatalogRepository::new(MemoryBlobStore::new(), config);

    let item = repo.create(ItemDraft::new("Swiss tablet"), None).unwrap();
    assert_eq!(item.vat_rate, Some(7.7));

    let err = repo.create(medication("Ibuprofen"), None).unwrap_err();
    assert_eq!(err.error_map()["vatRate"], "not_allowed");
}
