//! Tile descriptor builder
//!
//! Turns one `metadata.xml` path plus a target resolution into a single
//! composite raster item: band images, footprint, spatial reference, naming,
//! scene attributes and per-band viewing geometry.

use crate::core::identity::{TileIdentity, SENSOR_NAME};
use crate::core::resolution::ResolutionProfile;
use crate::io::band_angles::band_angles;
use crate::io::metadata_cache::{MetadataCache, DEFAULT_CACHE_CAPACITY};
use crate::io::sidecar::{tile_directory, TileSidecar};
use crate::io::xml_tree::XmlDocument;
use crate::io::L2A_NAMESPACES;
use crate::types::{
    BandProperties, CompositeRaster, ItemNaming, RasterArgument, Resolution, SceneAttributes,
    TileDescriptor, TileError, TileResult, UNRESOLVED_EPSG,
};
use std::path::Path;
use std::sync::Arc;

const HORIZONTAL_CS_PATH: &str = "n1:Geometric_Info/Tile_Geocoding/HORIZONTAL_CS_CODE";
const SENSING_TIME_PATH: &str = "n1:General_Info/SENSING_TIME";
const CLOUD_COVERAGE_PATH: &str =
    "n1:Quality_Indicators_Info/L2A_Image_Content_QI/CLOUD_COVERAGE_PERCENTAGE";
const VEGETATION_PATH: &str =
    "n1:Quality_Indicators_Info/L2A_Image_Content_QI/VEGETATION_PERCENTAGE";

/// EPSG code from a horizontal CS string such as `EPSG:32634`
pub fn parse_epsg(code: &str) -> TileResult<u32> {
    let token = code.rsplit(':').next().unwrap_or(code).trim();
    token.parse::<u32>().map_err(|e| {
        TileError::InvalidFormat(format!("Horizontal CS code '{}' is not an EPSG code: {}", code, e))
    })
}

fn spatial_reference(document: &XmlDocument) -> TileResult<u32> {
    match document.find(HORIZONTAL_CS_PATH, L2A_NAMESPACES) {
        Some(element) => parse_epsg(element.text()),
        None => {
            log::warn!("No HORIZONTAL_CS_CODE in {}", document.path.display());
            Ok(UNRESOLVED_EPSG)
        }
    }
}

fn percentage(document: &XmlDocument, path: &str) -> TileResult<Option<f64>> {
    let Some(element) = document.find(path, L2A_NAMESPACES) else {
        return Ok(None);
    };
    element.text().parse::<f64>().map(Some).map_err(|e| {
        TileError::InvalidFormat(format!(
            "{} value '{}' is not a number: {}",
            element.name,
            element.text(),
            e
        ))
    })
}

/// Builds resolution-specific descriptors, reading metadata through a shared cache
#[derive(Debug, Clone)]
pub struct TileDescriptorBuilder {
    cache: Arc<MetadataCache>,
}

impl TileDescriptorBuilder {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self { cache }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Arc::new(MetadataCache::new(capacity)))
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn identity(&self) -> TileIdentity {
        TileIdentity::new(Arc::clone(&self.cache))
    }

    /// Build the composite item for `tile_path` at `resolution`.
    ///
    /// Fails on the first problem; the error is logged before it is returned.
    pub fn build(&self, tile_path: &Path, resolution: Resolution) -> TileResult<TileDescriptor> {
        self.build_descriptor(tile_path, resolution).map_err(|e| {
            log::error!(
                "Failed to build {} descriptor for {}: {}",
                resolution,
                tile_path.display(),
                e
            );
            e
        })
    }

    fn build_descriptor(
        &self,
        tile_path: &Path,
        resolution: Resolution,
    ) -> TileResult<TileDescriptor> {
        if tile_path.as_os_str().is_empty() {
            return Err(TileError::InvalidInput("Empty tile path".to_string()));
        }
        let document = self.cache.require(tile_path)?;
        let profile = resolution.profile();
        let tile_dir = tile_directory(tile_path);

        let spatial_reference = spatial_reference(&document)?;

        let sidecar = TileSidecar::load_for(tile_path)?;
        let footprint = sidecar.footprint()?;
        let item = ItemNaming {
            display_name: sidecar.display_name(),
            group_name: sidecar.group_name(),
        };

        let acquisition_date = document
            .find(SENSING_TIME_PATH, L2A_NAMESPACES)
            .map(|e| e.text().to_string());
        let cloud_coverage = percentage(&document, CLOUD_COVERAGE_PATH)?;
        let vegetation_percentage = percentage(&document, VEGETATION_PATH)?;

        let (raster, band_properties) = Self::composite(&document, profile, &tile_dir)?;

        log::info!(
            "Built {} descriptor for {} ({} bands, EPSG {})",
            resolution,
            tile_path.display(),
            raster.arguments.len(),
            spatial_reference
        );

        Ok(TileDescriptor {
            tile_path: tile_path.to_path_buf(),
            resolution,
            raster,
            spatial_reference,
            footprint,
            key_properties: SceneAttributes {
                block_name: item.group_name.clone(),
                sensor_name: SENSOR_NAME.to_string(),
                product_type: self.identity().product_type(tile_path).to_string(),
                product_name: sidecar.product_name,
                acquisition_date,
                cloud_coverage,
                vegetation_percentage,
                band_properties,
            },
            item,
        })
    }

    /// Composite arguments and band rows in profile order
    fn composite(
        document: &XmlDocument,
        profile: &ResolutionProfile,
        tile_dir: &Path,
    ) -> TileResult<(CompositeRaster, Vec<BandProperties>)> {
        let angles = band_angles(document)?;
        let image_dir = tile_dir.join(profile.resolution.folder_name());

        let mut arguments = Vec::with_capacity(profile.band_count());
        let mut band_properties = Vec::with_capacity(profile.band_count());

        for (position, band) in profile.bands().enumerate() {
            let angle = angles.get(&band.index).ok_or(TileError::MissingBandGeometry {
                band: band.name,
                index: band.index,
                resolution: profile.resolution,
            })?;

            arguments.push(RasterArgument {
                name: format!("Raster{}", position + 1),
                path: image_dir.join(band.filename),
            });
            band_properties.push(BandProperties {
                band_name: band.name.to_string(),
                wavelength_min: band.wavelength_min,
                wavelength_max: band.wavelength_max,
                source_band_index: band.index,
                zenith_angle: angle.zenith_angle,
                azimuth_angle: angle.azimuth_angle,
                unit: angle.unit.clone(),
            });
        }

        Ok((
            CompositeRaster {
                function_template: profile.function_template.to_string(),
                arguments,
            },
            band_properties,
        ))
    }
}

impl Default for TileDescriptorBuilder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}
