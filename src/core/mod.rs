//! Core tile processing modules

pub mod resolution;
pub mod identity;
pub mod descriptor;
pub mod registration;
pub mod importer;

// Re-export main types
pub use resolution::{ResolutionProfile, BAND_SPECS, band_spec};
pub use identity::{TileIdentity, PRODUCT_TYPE, SENSOR_NAME};
pub use descriptor::{TileDescriptorBuilder, parse_epsg};
pub use registration::{
    RasterTypeDefinition, AuxField, FieldType, MosaicDatasetDefinition,
    raster_type_definitions, mosaic_band_definition, mosaic_dataset_definition, cloud_mask_table_fields,
};
pub use importer::{
    BatchImporter, ImportConfig, ImportReport, TileFailure, MosaicCatalog,
    InMemoryCatalog, InMemoryFeatureTable, JsonLinesCatalog, list_tiles,
};
