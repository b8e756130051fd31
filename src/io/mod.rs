//! I/O modules for reading tile metadata, sidecars and mask documents

pub mod xml_tree;
pub mod metadata_cache;
pub mod sidecar;
pub mod band_angles;
pub mod cloud_mask;

pub use metadata_cache::{MetadataCache, CacheStats, DEFAULT_CACHE_CAPACITY};
pub use sidecar::TileSidecar;
pub use cloud_mask::CloudMaskParser;
pub use xml_tree::{XmlDocument, XmlElement};

/// Schema namespace of Sentinel-2 Level-2A tile metadata
pub const L2A_TILE_NAMESPACE: &str =
    "https://psd-12.sentinel2.eo.esa.int/PSD/S2_PDI_Level-2A_Tile_Metadata.xsd";

/// Prefix map for lookups in tile metadata
pub const L2A_NAMESPACES: &[(&str, &str)] = &[("n1", L2A_TILE_NAMESPACE)];
