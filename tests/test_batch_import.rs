mod common;

use common::{init_logging, write_tile, TileFixture};
use s2mosaic::core::{
    BatchImporter, InMemoryCatalog, InMemoryFeatureTable, JsonLinesCatalog, MosaicCatalog,
};
use s2mosaic::types::{Resolution, TileDescriptor, TileError, TileResult};
use std::path::PathBuf;
use tempfile::TempDir;

/// Catalog that refuses one tile, to check per-tile isolation
struct RejectingCatalog {
    reject: &'static str,
    accepted: Vec<PathBuf>,
}

impl MosaicCatalog for RejectingCatalog {
    fn add_item(&mut self, descriptor: TileDescriptor) -> TileResult<()> {
        if descriptor.tile_path.to_string_lossy().contains(self.reject) {
            return Err(TileError::Catalog(format!(
                "Duplicate item {}",
                descriptor.tile_path.display()
            )));
        }
        self.accepted.push(descriptor.tile_path);
        Ok(())
    }
}

#[test]
fn test_import_valid_and_invalid_tiles() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path();

    write_tile(root, "2020/T34TFP", &TileFixture::default());
    write_tile(root, "2020/T34TFQ", &TileFixture::default());
    write_tile(root, "2021/T34TFP", &TileFixture::default());

    // Not an L2A tile
    let l1c = root.join("2021/L1C");
    std::fs::create_dir_all(&l1c).unwrap();
    std::fs::write(l1c.join("metadata.xml"), "<Level-1C_Tile_ID/>").unwrap();

    // Valid tile without viewing geometry for B02
    write_tile(
        root,
        "2022/no_angles",
        &TileFixture {
            angle_bands: vec![0, 2, 3, 7],
            ..TileFixture::default()
        },
    );

    // Valid metadata but no tileInfo.json next to it
    let no_sidecar = write_tile(root, "2022/no_sidecar", &TileFixture::default());
    std::fs::remove_file(root.join("2022/no_sidecar/tileInfo.json"))
        .expect("Failed to remove sidecar");

    let importer = BatchImporter::default();
    let mut catalog = InMemoryCatalog::default();
    let report = importer
        .import_all(root, &mut catalog, Resolution::R10m, None)
        .expect("Failed to import tiles");

    for failure in &report.failed {
        println!("  failed: {} ({})", failure.path.display(), failure.reason);
    }

    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failed.len(), 3);
    assert_eq!(report.total(), 6);
    assert_eq!(catalog.items.len(), 3);
    assert!(report.failed.iter().any(|f| f.path.starts_with(&l1c)));
    assert!(report.failed.iter().any(|f| f.path == no_sidecar));
    assert!(report
        .failed
        .iter()
        .any(|f| f.reason.contains("B02")));
    assert!(catalog.items.iter().all(|d| d.resolution == Resolution::R10m));
}

#[test]
fn test_catalog_failure_is_isolated() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let tiles = vec![
        write_tile(temp_dir.path(), "A", &TileFixture::default()),
        write_tile(temp_dir.path(), "B", &TileFixture::default()),
        write_tile(temp_dir.path(), "C", &TileFixture::default()),
    ];

    let importer = BatchImporter::default();
    let mut catalog = RejectingCatalog {
        reject: "/B/",
        accepted: Vec::new(),
    };
    let report = importer.add_many(&mut catalog, &tiles, Resolution::R10m, None);

    assert_eq!(report.succeeded, vec![tiles[0].clone(), tiles[2].clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, tiles[1]);
    assert!(report.failed[0].reason.contains("Duplicate item"));
    assert_eq!(catalog.accepted.len(), 2);
}

#[test]
fn test_import_with_cloud_masks() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let with_mask = TileFixture {
        with_mask: true,
        ..TileFixture::default()
    };
    write_tile(temp_dir.path(), "T34TFP", &with_mask);
    write_tile(temp_dir.path(), "T34TFQ", &with_mask);
    // Mask document missing: the tile is added to the catalog but reported as failed
    write_tile(temp_dir.path(), "T34TFR", &TileFixture::default());

    let importer = BatchImporter::default();
    let mut catalog = InMemoryCatalog::default();
    let mut table = InMemoryFeatureTable::default();
    let report = importer
        .import_all(temp_dir.path(), &mut catalog, Resolution::R20m, Some(&mut table))
        .expect("Failed to import tiles");

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(catalog.items.len(), 3);
    assert_eq!(table.rows.len(), 4);
    assert!(table.rows.iter().all(|f| f.tile == "T34TFP"));
    assert!(catalog.items.iter().all(|d| d.raster.arguments.len() == 9));
}

#[test]
fn test_provided_sink_receives_cloud_masks() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_tile(
        temp_dir.path(),
        "T34TFP",
        &TileFixture {
            with_mask: true,
            ..TileFixture::default()
        },
    );

    let importer = BatchImporter::default();
    let mut catalog = InMemoryCatalog::default();
    let mut table = InMemoryFeatureTable::default();
    let report = importer
        .import_all(temp_dir.path(), &mut catalog, Resolution::R10m, Some(&mut table))
        .expect("Failed to import tiles");

    assert!(report.is_complete_success());
    assert_eq!(catalog.items.len(), 1);
    assert_eq!(table.rows.len(), 2);
}

#[test]
fn test_without_sink_no_masks_are_read() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    // No mask document: succeeds because no sink asks for one
    write_tile(temp_dir.path(), "T34TFP", &TileFixture::default());

    let report = BatchImporter::default()
        .import_all(temp_dir.path(), &mut InMemoryCatalog::default(), Resolution::R20m, None)
        .expect("Failed to import tiles");
    assert!(report.is_complete_success());
}

#[test]
fn test_one_importer_serves_both_resolutions() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    write_tile(temp_dir.path(), "T34TFP", &TileFixture::default());
    write_tile(temp_dir.path(), "T34TFQ", &TileFixture::default());

    let importer = BatchImporter::default();
    let mut catalog_10m = InMemoryCatalog::default();
    let mut catalog_20m = InMemoryCatalog::default();
    let report_10m = importer
        .import_all(temp_dir.path(), &mut catalog_10m, Resolution::R10m, None)
        .expect("Failed to import 10m tiles");
    let misses_after_first = importer.builder().cache().stats().misses;
    let report_20m = importer
        .import_all(temp_dir.path(), &mut catalog_20m, Resolution::R20m, None)
        .expect("Failed to import 20m tiles");

    assert!(report_10m.is_complete_success());
    assert!(report_20m.is_complete_success());
    assert_eq!(catalog_10m.items.len(), 2);
    assert_eq!(catalog_20m.items.len(), 2);
    assert!(catalog_10m.items.iter().all(|d| d.raster.arguments.len() == 4));
    assert!(catalog_20m.items.iter().all(|d| d.raster.arguments.len() == 9));
    assert!(catalog_20m.items.iter().all(|d| d.resolution == Resolution::R20m));

    let stats = importer.builder().cache().stats();
    println!("  cache after both passes: {} hits, {} misses", stats.hits, stats.misses);
    assert_eq!(stats.misses, misses_after_first);
    assert!(stats.hits > 0);
}

#[test]
fn test_json_lines_catalog_output() {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let tiles_dir = temp_dir.path().join("tiles");
    write_tile(&tiles_dir, "T34TFP", &TileFixture::default());
    write_tile(&tiles_dir, "T34TFQ", &TileFixture::default());

    let output = temp_dir.path().join("items.jsonl");
    let mut catalog = JsonLinesCatalog::create(&output).expect("Failed to create catalog");
    let report = BatchImporter::default()
        .import_all(&tiles_dir, &mut catalog, Resolution::R10m, None)
        .expect("Failed to import tiles");
    catalog.flush().expect("Failed to flush catalog");

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(catalog.written(), 2);

    let text = std::fs::read_to_string(&output).expect("Failed to read catalog");
    let items: Vec<TileDescriptor> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid catalog line"))
        .collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].key_properties.sensor_name, "Sentinel-2");
    assert_eq!(items[0].spatial_reference, 32634);
}
