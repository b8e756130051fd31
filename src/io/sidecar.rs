use crate::types::{Footprint, TileError, TileResult, Vertex};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Metadata file name every tile directory carries
pub const METADATA_FILE_NAME: &str = "metadata.xml";

/// Sidecar file name next to `metadata.xml`
pub const SIDECAR_FILE_NAME: &str = "tileInfo.json";

/// `tileInfo.json` published alongside each Sentinel-2 tile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSidecar {
    pub product_name: Option<String>,
    // Numbers in some archives, strings in others
    pub utm_zone: Option<Value>,
    pub latitude_band: Option<Value>,
    pub grid_square: Option<Value>,
    pub tile_data_geometry: Option<TileDataGeometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TileDataGeometry {
    #[serde(default)]
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

fn component_text(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether `path` names a `metadata.xml` file (case-insensitive)
pub fn is_metadata_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.eq_ignore_ascii_case(METADATA_FILE_NAME))
        .unwrap_or(false)
}

/// Tile root directory for a metadata file, a tile directory, or any file inside it
pub fn tile_directory(path: &Path) -> PathBuf {
    if !is_metadata_file(path) && path.is_dir() {
        return path.to_path_buf();
    }
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl TileSidecar {
    pub fn parse_str(content: &str) -> TileResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read the sidecar belonging to `path`; not cached
    pub fn load_for(path: &Path) -> TileResult<Self> {
        let sidecar_path = tile_directory(path).join(SIDECAR_FILE_NAME);
        log::debug!("Reading tile sidecar {}", sidecar_path.display());
        let content = std::fs::read_to_string(&sidecar_path).map_err(|e| {
            TileError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", sidecar_path.display(), e),
            ))
        })?;
        Self::parse_str(&content)
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    /// MGRS tile id, `T{utmZone}{latitudeBand}{gridSquare}`
    pub fn group_name(&self) -> Option<String> {
        let zone = component_text(&self.utm_zone)?;
        let band = component_text(&self.latitude_band)?;
        let square = component_text(&self.grid_square)?;
        Some(format!("T{}{}{}", zone, band, square))
    }

    /// Last two underscore-separated tokens of the product name
    pub fn display_name(&self) -> Option<String> {
        let name = self.product_name.as_deref().filter(|n| !n.is_empty())?;
        let tokens: Vec<&str> = name.split('_').collect();
        if tokens.len() < 2 {
            return None;
        }
        Some(format!("{}_{}", tokens[tokens.len() - 2], tokens[tokens.len() - 1]))
    }

    /// First ring of the data geometry, vertex order as published
    pub fn footprint(&self) -> TileResult<Footprint> {
        let ring = match self
            .tile_data_geometry
            .as_ref()
            .and_then(|g| g.coordinates.first())
        {
            Some(ring) => ring,
            None => {
                log::warn!("Tile sidecar has no tileDataGeometry coordinates");
                return Ok(Footprint::default());
            }
        };

        let vertices = ring
            .iter()
            .enumerate()
            .map(|(i, point)| match point.as_slice() {
                [x, y, ..] => Ok(Vertex { x: *x, y: *y }),
                _ => Err(TileError::InvalidFormat(format!(
                    "Footprint vertex {} has {} coordinates",
                    i,
                    point.len()
                ))),
            })
            .collect::<TileResult<Vec<_>>>()?;

        Ok(Footprint { vertices })
    }
}
