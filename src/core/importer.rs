//! Batch import of tiles into a mosaic catalog
//!
//! Discovers `metadata.xml` files under a folder, builds one descriptor per
//! tile and hands it to the host catalog. Optionally appends each tile's cloud
//! mask polygons to a feature table. Per-tile failures are collected in an
//! [`ImportReport`] instead of aborting the batch.

use crate::core::descriptor::TileDescriptorBuilder;
use crate::io::cloud_mask::{cloud_mask_path, CloudMaskParser, FeatureSink};
use crate::io::metadata_cache::{MetadataCache, DEFAULT_CACHE_CAPACITY};
use crate::io::sidecar::{is_metadata_file, tile_directory};
use crate::types::{CloudMaskFeature, Resolution, TileDescriptor, TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Host mosaic dataset receiving composite items
pub trait MosaicCatalog {
    fn add_item(&mut self, descriptor: TileDescriptor) -> TileResult<()>;
}

/// Import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Resolution used by callers that do not pick one per call
    pub resolution: Resolution,
    pub cache_capacity: usize,
    pub follow_links: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::R10m,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            follow_links: false,
        }
    }
}

/// A tile that could not be imported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a batch import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<TileFailure>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Every `metadata.xml` (case-insensitive) below `root`, sorted
pub fn list_tiles(root: &Path, follow_links: bool) -> TileResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(TileError::InvalidInput(format!(
            "Tile folder {} is not a directory",
            root.display()
        )));
    }

    let mut tiles = Vec::new();
    for entry in WalkDir::new(root).follow_links(follow_links) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_metadata_file(entry.path()) {
            tiles.push(entry.into_path());
        }
    }

    tiles.sort();
    log::info!("Found {} tiles under {}", tiles.len(), root.display());
    Ok(tiles)
}

pub struct BatchImporter {
    builder: TileDescriptorBuilder,
    config: ImportConfig,
}

impl BatchImporter {
    pub fn new(config: ImportConfig) -> Self {
        let cache = Arc::new(MetadataCache::new(config.cache_capacity));
        Self::with_cache(config, cache)
    }

    /// Importer sharing an existing metadata cache
    pub fn with_cache(config: ImportConfig, cache: Arc<MetadataCache>) -> Self {
        Self {
            builder: TileDescriptorBuilder::new(cache),
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn builder(&self) -> &TileDescriptorBuilder {
        &self.builder
    }

    pub fn list_tiles(&self, root: &Path) -> TileResult<Vec<PathBuf>> {
        list_tiles(root, self.config.follow_links)
    }

    /// Add one tile; with a sink, also append its cloud mask features
    pub fn add_one(
        &self,
        catalog: &mut dyn MosaicCatalog,
        tile_path: &Path,
        resolution: Resolution,
        sink: Option<&mut dyn FeatureSink>,
    ) -> TileResult<()> {
        if !self.builder.identity().is_tile(tile_path) {
            return Err(TileError::NotATile(tile_path.to_path_buf()));
        }

        let descriptor = self.builder.build(tile_path, resolution)?;
        catalog.add_item(descriptor)?;
        log::info!("Added {} tile {}", resolution, tile_path.display());

        if let Some(sink) = sink {
            let mask_path = cloud_mask_path(&tile_directory(tile_path));
            let parser = CloudMaskParser::new(self.builder.cache());
            let count = parser.append_features(&mask_path, sink)?;
            log::debug!("Appended {} cloud mask features from {}", count, mask_path.display());
        }
        Ok(())
    }

    /// Add every tile, isolating failures per tile
    pub fn add_many(
        &self,
        catalog: &mut dyn MosaicCatalog,
        tiles: &[PathBuf],
        resolution: Resolution,
        mut sink: Option<&mut dyn FeatureSink>,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for tile in tiles {
            let tile_sink = sink.as_mut().map(|s| &mut **s as &mut dyn FeatureSink);
            match self.add_one(catalog, tile, resolution, tile_sink) {
                Ok(()) => report.succeeded.push(tile.clone()),
                Err(e) => {
                    log::warn!("Tile {} not imported: {}", tile.display(), e);
                    report.failed.push(TileFailure {
                        path: tile.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Imported {} of {} tiles ({} failed)",
            report.succeeded.len(),
            report.total(),
            report.failed.len()
        );
        report
    }

    /// Discover and add every tile below `root`
    pub fn import_all(
        &self,
        root: &Path,
        catalog: &mut dyn MosaicCatalog,
        resolution: Resolution,
        sink: Option<&mut dyn FeatureSink>,
    ) -> TileResult<ImportReport> {
        let tiles = self.list_tiles(root)?;
        Ok(self.add_many(catalog, &tiles, resolution, sink))
    }
}

impl Default for BatchImporter {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

/// Catalog keeping descriptors in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    pub items: Vec<TileDescriptor>,
}

impl MosaicCatalog for InMemoryCatalog {
    fn add_item(&mut self, descriptor: TileDescriptor) -> TileResult<()> {
        self.items.push(descriptor);
        Ok(())
    }
}

/// Feature table keeping rows in memory
#[derive(Debug, Default)]
pub struct InMemoryFeatureTable {
    pub rows: Vec<CloudMaskFeature>,
}

impl FeatureSink for InMemoryFeatureTable {
    fn insert_features(&mut self, features: &[CloudMaskFeature]) -> TileResult<()> {
        self.rows.extend_from_slice(features);
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesCatalog<W: Write> {
    writer: W,
    written: usize,
}

impl JsonLinesCatalog<BufWriter<File>> {
    pub fn create(path: &Path) -> TileResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesCatalog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> TileResult<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| TileError::Catalog(format!("Failed to write catalog line: {}", e)))?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> TileResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MosaicCatalog for JsonLinesCatalog<W> {
    fn add_item(&mut self, descriptor: TileDescriptor) -> TileResult<()> {
        self.write_line(&descriptor)
    }
}

impl<W: Write> FeatureSink for JsonLinesCatalog<W> {
    fn insert_features(&mut self, features: &[CloudMaskFeature]) -> TileResult<()> {
        for feature in features {
            self.write_line(feature)?;
        }
        Ok(())
    }
}
