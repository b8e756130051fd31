//! Tile identity and naming
//!
//! Decides whether a path is a Level-2A tile and derives the names the host
//! shows for it. Names come from the `tileInfo.json` sidecar, which is read
//! fresh on every call.

use crate::io::metadata_cache::MetadataCache;
use crate::io::sidecar::TileSidecar;
use crate::io::L2A_TILE_NAMESPACE;
use crate::types::TileResult;
use std::path::Path;
use std::sync::Arc;

/// Root element local name of an L2A tile metadata document
pub const L2A_TILE_ROOT: &str = "Level-2A_Tile_ID";

pub const PRODUCT_TYPE: &str = "Sentinel-2_L2A_Tile";

pub const SENSOR_NAME: &str = "Sentinel-2";

#[derive(Debug, Clone)]
pub struct TileIdentity {
    cache: Arc<MetadataCache>,
}

impl TileIdentity {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self { cache }
    }

    /// True iff the document root is `{L2A namespace}Level-2A_Tile_ID`
    pub fn is_tile(&self, path: &Path) -> bool {
        match self.cache.get(path) {
            Ok(Some(document)) => {
                let root = &document.root;
                let is_tile = root.name == L2A_TILE_ROOT
                    && root.namespace.as_deref() == Some(L2A_TILE_NAMESPACE);
                if !is_tile {
                    log::debug!("{} has root {}", path.display(), root.qualified_name());
                }
                is_tile
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("Cannot open {} as a tile: {}", path.display(), e);
                false
            }
        }
    }

    /// Product type of the tile; every supported tile is an L2A tile
    pub fn product_type(&self, _path: &Path) -> &'static str {
        PRODUCT_TYPE
    }

    pub fn product_name(&self, path: &Path) -> TileResult<Option<String>> {
        Ok(TileSidecar::load_for(path)?.product_name)
    }

    pub fn group_name(&self, path: &Path) -> TileResult<Option<String>> {
        Ok(TileSidecar::load_for(path)?.group_name())
    }

    pub fn display_name(&self, path: &Path) -> TileResult<Option<String>> {
        Ok(TileSidecar::load_for(path)?.display_name())
    }
}
