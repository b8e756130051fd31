//! # s2-import
//!
//! Imports every Sentinel-2 L2A tile found under a folder and writes the
//! resulting mosaic items, and optionally the tiles' cloud mask polygons, as
//! JSON lines.
//!
//! ```bash
//! s2-import /data/tiles --resolution 20m --catalog items.jsonl --cloud-masks masks.jsonl
//! RUST_LOG=debug s2-import /data/tiles
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use s2mosaic::core::{BatchImporter, ImportConfig, InMemoryCatalog, JsonLinesCatalog, MosaicCatalog};
use s2mosaic::io::cloud_mask::FeatureSink;
use s2mosaic::Resolution;
use std::path::PathBuf;

/// Batch-import Sentinel-2 L2A tiles into a mosaic catalog
#[derive(Parser)]
#[command(name = "s2-import", version)]
struct Cli {
    /// Folder searched recursively for metadata.xml files
    folder: PathBuf,

    /// Composite resolution (10m or 20m)
    #[arg(long)]
    resolution: Option<Resolution>,

    /// JSON file with import settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write one descriptor per line to this file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Write cloud mask features per line to this file
    #[arg(long)]
    cloud_masks: Option<PathBuf>,

    /// Number of parsed metadata documents kept in memory
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Follow symbolic links while searching for tiles
    #[arg(long)]
    follow_links: bool,
}

fn load_config(cli: &Cli) -> Result<ImportConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ImportConfig::default(),
    };

    if let Some(resolution) = cli.resolution {
        config.resolution = resolution;
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache_capacity = capacity;
    }
    config.follow_links |= cli.follow_links;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let importer = BatchImporter::new(config);

    let mut memory_catalog = InMemoryCatalog::default();
    let mut file_catalog = match &cli.catalog {
        Some(path) => Some(
            JsonLinesCatalog::create(path)
                .with_context(|| format!("Failed to create catalog {}", path.display()))?,
        ),
        None => None,
    };
    let mut mask_table = match &cli.cloud_masks {
        Some(path) => Some(
            JsonLinesCatalog::create(path)
                .with_context(|| format!("Failed to create mask table {}", path.display()))?,
        ),
        None => None,
    };

    let catalog: &mut dyn MosaicCatalog = match file_catalog.as_mut() {
        Some(catalog) => catalog,
        None => &mut memory_catalog,
    };
    let sink = mask_table.as_mut().map(|t| t as &mut dyn FeatureSink);

    let report = importer
        .import_all(&cli.folder, catalog, importer.config().resolution, sink)
        .with_context(|| format!("Import from {} failed", cli.folder.display()))?;

    if let Some(catalog) = file_catalog.as_mut() {
        catalog.flush()?;
    }
    if let Some(table) = mask_table.as_mut() {
        table.flush()?;
    }

    for failure in &report.failed {
        println!("FAILED {}: {}", failure.path.display(), failure.reason);
    }
    println!(
        "Imported {} of {} tiles at {}",
        report.succeeded.len(),
        report.total(),
        importer.config().resolution
    );

    let stats = importer.builder().cache().stats();
    log::debug!(
        "Metadata cache: {} hits, {} misses, {:.1}% hit rate",
        stats.hits,
        stats.misses,
        stats.hit_rate()
    );
    Ok(())
}
