use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Spatial reference code used when the metadata carries no horizontal CS
pub const UNRESOLVED_EPSG: u32 = 0;

/// Target resolution of a composite build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "10m")]
    R10m,
    #[serde(rename = "20m")]
    R20m,
}

impl Resolution {
    pub const ALL: [Resolution; 2] = [Resolution::R10m, Resolution::R20m];

    /// Text tag used in folder names and host template names
    pub fn tag(&self) -> &'static str {
        match self {
            Resolution::R10m => "10m",
            Resolution::R20m => "20m",
        }
    }

    /// Image sub-folder of a tile, e.g. `R10m`
    pub fn folder_name(&self) -> String {
        format!("R{}", self.tag())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::R10m
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl std::str::FromStr for Resolution {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "10m" => Ok(Resolution::R10m),
            "20m" => Ok(Resolution::R20m),
            other => Err(TileError::InvalidInput(format!(
                "Unsupported resolution '{}' (expected 10m or 20m)",
                other
            ))),
        }
    }
}

/// Static description of one Sentinel-2 MSI band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandSpec {
    pub name: &'static str,
    pub index: usize,
    pub filename: &'static str,
    pub wavelength_min: f64, // nm
    pub wavelength_max: f64, // nm
}

/// Mean viewing incidence angle of one band at tile centre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAngle {
    pub source_band_index: usize,
    pub zenith_angle: f64,
    pub azimuth_angle: f64,
    pub unit: String,
}

/// Footprint vertex in the tile's map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

/// Footprint polygon, implicitly closed (last vertex connects to the first)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub vertices: Vec<Vertex>,
}

impl Footprint {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// One positional argument of the composite raster function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterArgument {
    pub name: String,
    pub path: PathBuf,
}

/// Composite raster function applied to the band images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRaster {
    pub function_template: String,
    pub arguments: Vec<RasterArgument>,
}

/// Per-band attribute row attached to a composite item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BandProperties {
    pub band_name: String,
    pub wavelength_min: f64,
    pub wavelength_max: f64,
    pub source_band_index: usize,
    pub zenith_angle: f64,
    pub azimuth_angle: f64,
    pub unit: String,
}

/// Key/value scene attributes handed to the host with each item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SceneAttributes {
    pub block_name: Option<String>,
    pub sensor_name: String,
    pub product_type: String,
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_coverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vegetation_percentage: Option<f64>,
    pub band_properties: Vec<BandProperties>,
}

impl SceneAttributes {
    /// Sensing time as a UTC timestamp, if it is RFC 3339 formatted
    pub fn acquisition_datetime(&self) -> Option<DateTime<Utc>> {
        let raw = self.acquisition_date.as_deref()?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(time) => Some(time.with_timezone(&Utc)),
            Err(e) => {
                log::warn!("Could not parse sensing time '{}': {}", raw, e);
                None
            }
        }
    }
}

/// Naming the host shows for the item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemNaming {
    pub display_name: Option<String>,
    pub group_name: Option<String>,
}

/// One resolution-specific composite item, ready for catalog ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub tile_path: PathBuf,
    pub resolution: Resolution,
    pub raster: CompositeRaster,
    pub spatial_reference: u32, // EPSG, 0 when unresolved
    pub footprint: Footprint,
    pub item: ItemNaming,
    pub key_properties: SceneAttributes,
}

impl TileDescriptor {
    pub fn band_names(&self) -> Vec<&str> {
        self.key_properties
            .band_properties
            .iter()
            .map(|b| b.band_name.as_str())
            .collect()
    }

    pub fn has_spatial_reference(&self) -> bool {
        self.spatial_reference != UNRESOLVED_EPSG
    }
}

/// Cloud mask polygon extracted from a tile's mask document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudMaskFeature {
    pub id: String,
    pub mask_type: String,
    pub tile: String,
    pub timestamp: NaiveDateTime,
    pub ring: Vec<(i64, i64)>,
}

impl CloudMaskFeature {
    /// True when the ring's last vertex repeats the first
    pub fn is_closed(&self) -> bool {
        self.ring.len() > 1 && self.ring.first() == self.ring.last()
    }
}

/// All features of one mask document plus its spatial reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudMaskDocument {
    pub srs_id: u32,
    pub tile: String,
    pub timestamp: NaiveDateTime,
    pub features: Vec<CloudMaskFeature>,
}

/// Error types for tile processing
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Metadata document could not be parsed: {}", .0.display())]
    ParseFailure(PathBuf),

    #[error("No viewing geometry for band {band} (index {index}) required by the {resolution} profile")]
    MissingBandGeometry {
        band: &'static str,
        index: usize,
        resolution: Resolution,
    },

    #[error("Not a Sentinel-2 L2A tile: {}", .0.display())]
    NotATile(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

/// Result type for tile operations
pub type TileResult<T> = Result<T, TileError>;
