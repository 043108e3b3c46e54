mod common;

use std::collections::BTreeSet;

use car_catalog_core::{
    read_catalog, CatalogStore, Error, RendererKind, SizePolicy, SqliteStore, StoreConfig,
};
use common::{file_count, Workspace};
use image::GenericImageView;

#[test]
fn test_process_renders_catalogs_and_syncs() {
    let ws = Workspace::new();
    ws.add_image("Honda/Civic_2016_red.png", [200, 0, 0], 120, 80);
    ws.add_image("Toyota/Corolla.jpg", [0, 0, 200], 90, 90);
    ws.add_image("loose_1999.png", [0, 200, 0], 40, 60);
    std::fs::write(ws.source().join("notes.txt"), b"not an image").unwrap();

    let store = ws.store();
    let summary = ws
        .catalog()
        .process_with_store(&store, ws.source(), SizePolicy::Fit { width: 250, height: 150 })
        .unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.cataloged, 3);
    assert_eq!(summary.sync.as_ref().unwrap().upserted, 3);

    let catalog = read_catalog(&ws.config.catalog_path).unwrap().unwrap();
    assert_eq!(catalog.total, 3);
    assert_eq!(file_count(&ws.config.output_dir), 3);
    assert_eq!(file_count(&ws.config.thumbnail_dir), 3);
    assert_eq!(store.count().unwrap(), 3);

    for record in &catalog.images {
        let primary = image::open(ws.config.output_dir.join(&record.filename)).unwrap();
        assert_eq!(primary.dimensions(), (250, 150));
        let thumb = image::open(ws.config.thumbnail_dir.join(&record.filename)).unwrap();
        assert_eq!(thumb.dimensions(), (48, 48));
    }

    let civic = catalog
        .images
        .iter()
        .find(|r| r.original_name == "Civic_2016_red.png")
        .unwrap();
    assert_eq!(civic.folder, "Honda");
    let row = store.fetch(&civic.id).unwrap().unwrap();
    assert_eq!(row.make, "Honda");
    assert_eq!(row.model, "Civic");
    assert_eq!(row.year, Some(2016));
    assert_eq!(row.url, civic.direct_url);

    let loose = catalog
        .images
        .iter()
        .find(|r| r.original_name == "loose_1999.png")
        .unwrap();
    assert_eq!(loose.folder, "orphan");
}

#[test]
fn test_rerun_is_idempotent() {
    let ws = Workspace::new();
    ws.add_image("Honda/Civic_2016.png", [200, 0, 0], 64, 64);
    ws.add_image("Honda/Accord.png", [0, 0, 200], 64, 32);
    ws.add_image("Ford/Mustang_1967.png", [0, 200, 0], 32, 64);

    let store = ws.store();
    let catalog = ws.catalog();

    catalog
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();
    let first = read_catalog(&ws.config.catalog_path).unwrap().unwrap();
    let first_primary = std::fs::read(ws.config.output_dir.join(&first.images[0].filename)).unwrap();

    catalog
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();
    let second = read_catalog(&ws.config.catalog_path).unwrap().unwrap();

    assert_eq!(first.images, second.images);
    assert_eq!(first.total, second.total);
    assert_eq!(file_count(&ws.config.output_dir), 3);
    assert_eq!(store.count().unwrap(), 3);

    // Cached primaries are not re-rendered
    let second_primary = std::fs::read(ws.config.output_dir.join(&first.images[0].filename)).unwrap();
    assert_eq!(first_primary, second_primary);
}

#[test]
fn test_identical_content_in_different_folders_is_one_record() {
    let ws = Workspace::new();
    let original = ws.add_image("Honda/Civic_2016.png", [10, 20, 30], 50, 50);
    ws.copy_source(&original, "Toyota/Renamed_2001.png");
    ws.add_image("Toyota/Supra.png", [90, 20, 30], 50, 50);

    let store = ws.store();
    let summary = ws
        .catalog()
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.cataloged, 2);

    let catalog = read_catalog(&ws.config.catalog_path).unwrap().unwrap();
    assert_eq!(catalog.total, 2);
    let hashes: BTreeSet<_> = catalog.images.iter().map(|r| r.hash.clone()).collect();
    assert_eq!(hashes.len(), 2);

    // First occurrence in discovery order wins
    let first = &catalog.images[0];
    assert_eq!(first.original_name, "Civic_2016.png");
    assert_eq!(first.folder, "Honda");

    assert_eq!(file_count(&ws.config.output_dir), 2);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_identifiers_survive_when_content_moves() {
    let ws = Workspace::new();
    let original = ws.add_image("Honda/Civic_2016.png", [1, 2, 3], 30, 30);

    let store = ws.store();
    let catalog = ws.catalog();
    catalog
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();
    let before = read_catalog(&ws.config.catalog_path).unwrap().unwrap();

    let moved = ws.copy_source(&original, "Toyota/Supra_1998.png");
    std::fs::remove_file(&original).unwrap();
    assert!(moved.exists());

    let summary = catalog
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();
    let after = read_catalog(&ws.config.catalog_path).unwrap().unwrap();

    assert_eq!(after.total, 1);
    let id = &after.images[0].id;
    assert_eq!(&before.images[0].id, id);
    assert_eq!(after.images[0].original_name, "Supra_1998.png");
    assert_eq!(after.images[0].folder, "Toyota");

    let sync = summary.sync.unwrap();
    assert!(!sync.is_degraded(), "sync failures: {:?}", sync.failures);
    assert_eq!(sync.upserted, 1);

    // The row is updated in place; its make stays as first inserted
    assert_eq!(store.count().unwrap(), 1);
    let row = store.fetch(id).unwrap().unwrap();
    assert_eq!(row.make, "Honda");
    assert_eq!(row.model, "Supra");
    assert_eq!(row.year, Some(1998));
    assert_eq!(row.url, after.images[0].direct_url);
}

#[test]
fn test_empty_source_publishes_nothing() {
    let ws = Workspace::new();
    std::fs::write(ws.source().join("readme.txt"), b"no images here").unwrap();

    let store = ws.store();
    let summary = ws
        .catalog()
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();

    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.cataloged, 0);
    assert!(summary.sync.is_none());
    assert!(!ws.config.catalog_path.exists());
    // The table was never created, so nothing was written
    assert!(store.count().is_err());
}

#[test]
fn test_missing_source_is_fatal_before_store_is_touched() {
    let mut ws = Workspace::new();
    ws.config.store = StoreConfig {
        database: "/path/that/does/not/exist/cars.db".to_string(),
        ..StoreConfig::default()
    };

    let result = ws.catalog().process(&ws.dir.path().join("nope"), SizePolicy::Original);
    assert!(matches!(result, Err(Error::SourceMissing(_))));
}

#[test]
fn test_unreachable_store_aborts_before_any_work() {
    let mut ws = Workspace::new();
    ws.add_image("Honda/Civic.png", [1, 2, 3], 30, 30);
    ws.config.store = StoreConfig {
        database: "/path/that/does/not/exist/cars.db".to_string(),
        ..StoreConfig::default()
    };

    let result = ws.catalog().process(ws.source(), SizePolicy::Original);
    assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
    assert!(!ws.config.output_dir.exists());
    assert!(!ws.config.catalog_path.exists());
}

#[test]
fn test_process_against_file_backed_store() {
    let mut ws = Workspace::new();
    ws.add_image("Honda/Civic_2016.png", [1, 2, 3], 30, 30);
    ws.config.store = StoreConfig {
        database: ws.dir.path().join("cars.db").to_string_lossy().into_owned(),
        ..StoreConfig::default()
    };

    let summary = ws
        .catalog()
        .process(ws.source(), SizePolicy::Original)
        .unwrap();
    assert_eq!(summary.cataloged, 1);

    let store = SqliteStore::connect(&ws.config.store).unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_broken_file_is_isolated_under_strict_rendering() {
    let mut ws = Workspace::new();
    ws.config.strict_render = true;
    ws.add_image("Honda/Civic.png", [1, 2, 3], 30, 30);
    std::fs::write(ws.source().join("Honda").join("Broken.jpg"), b"DUMMY IMAGE DATA").unwrap();

    let store = ws.store();
    let summary = ws
        .catalog()
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cataloged, 1);
}

#[test]
fn test_missing_renderers_degrade_to_raw_copy() {
    let mut ws = Workspace::new();
    ws.config.renderers = vec![RendererKind::Magick {
        program: "car-catalog-no-such-renderer".to_string(),
    }];
    let source = ws.add_image("Honda/Civic.png", [1, 2, 3], 30, 30);

    let store = ws.store();
    let summary = ws
        .catalog()
        .process_with_store(&store, ws.source(), SizePolicy::Original)
        .unwrap();
    assert_eq!(summary.cataloged, 1);

    let catalog = read_catalog(&ws.config.catalog_path).unwrap().unwrap();
    let primary = ws.config.output_dir.join(&catalog.images[0].filename);
    assert_eq!(std::fs::read(primary).unwrap(), std::fs::read(source).unwrap());
    assert_eq!(file_count(&ws.config.thumbnail_dir), 0);
}
