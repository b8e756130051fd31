//! Cloud mask (`MSK_CLOUDS_B00.gml`) parsing
//!
//! The mask document's `gml:id` encodes acquisition time and tile id at fixed
//! underscore-separated positions. Those positions follow the current ESA
//! naming scheme and will need revisiting if the scheme changes.

use crate::io::metadata_cache::MetadataCache;
use crate::io::xml_tree::XmlElement;
use crate::types::{CloudMaskDocument, CloudMaskFeature, TileError, TileResult, UNRESOLVED_EPSG};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub const EOP_NAMESPACE: &str = "http://www.opengis.net/eop/2.0";
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";

const MASK_NAMESPACES: &[(&str, &str)] = &[("eop", EOP_NAMESPACE), ("gml", GML_NAMESPACE)];

/// Mask document location relative to the tile root
pub const CLOUD_MASK_RELATIVE_PATH: [&str; 2] = ["qi", "MSK_CLOUDS_B00.gml"];

const TIMESTAMP_SEGMENT: usize = 6;
const TILE_SEGMENT: usize = 8;
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

const POS_LIST_PATH: &str = "eop:extentOf/gml:Polygon/gml:exterior/gml:LinearRing/gml:posList";

/// External table receiving cloud mask rows
pub trait FeatureSink {
    fn insert_features(&mut self, features: &[CloudMaskFeature]) -> TileResult<()>;
}

/// Mask document path for a tile root directory
pub fn cloud_mask_path(tile_dir: &Path) -> PathBuf {
    CLOUD_MASK_RELATIVE_PATH
        .iter()
        .fold(tile_dir.to_path_buf(), |path, part| path.join(part))
}

/// Parser for Sentinel-2 vector cloud masks
pub struct CloudMaskParser<'a> {
    cache: &'a MetadataCache,
}

impl<'a> CloudMaskParser<'a> {
    pub fn new(cache: &'a MetadataCache) -> Self {
        Self { cache }
    }

    /// Parse every `MaskFeature` polygon of a mask document
    pub fn parse_features(&self, mask_path: &Path) -> TileResult<CloudMaskDocument> {
        let document = self.cache.require(mask_path)?;
        let root = &document.root;

        let srs_id = Self::extract_srs_id(root, mask_path)?;

        let identifier = root.attribute(Some(GML_NAMESPACE), "id").ok_or_else(|| {
            TileError::MissingField(format!("gml:id on mask root of {}", mask_path.display()))
        })?;
        let (timestamp, tile) = Self::split_identifier(identifier)?;

        let mut features = Vec::new();
        for element in root.descendants(Some(EOP_NAMESPACE), "MaskFeature") {
            features.push(Self::parse_feature(element, &tile, timestamp)?);
        }

        log::info!(
            "Parsed {} cloud mask features for tile {} from {}",
            features.len(),
            tile,
            mask_path.display()
        );

        Ok(CloudMaskDocument {
            srs_id,
            tile,
            timestamp,
            features,
        })
    }

    /// Parse a mask document and hand its features to `sink`
    pub fn append_features<S: FeatureSink + ?Sized>(
        &self,
        mask_path: &Path,
        sink: &mut S,
    ) -> TileResult<usize> {
        let document = self.parse_features(mask_path)?;
        sink.insert_features(&document.features)?;
        Ok(document.features.len())
    }

    fn extract_srs_id(root: &XmlElement, mask_path: &Path) -> TileResult<u32> {
        let Some(envelope) = root.find("gml:boundedBy/gml:Envelope", MASK_NAMESPACES) else {
            // Cloud-free masks carry gml:Null instead of an envelope
            log::warn!("No bounding envelope in {}", mask_path.display());
            return Ok(UNRESOLVED_EPSG);
        };
        let srs_name = envelope.attribute(None, "srsName").ok_or_else(|| {
            TileError::MissingField(format!("srsName on envelope of {}", mask_path.display()))
        })?;
        let code = srs_name.rsplit(':').next().unwrap_or(srs_name);
        code.trim().parse::<u32>().map_err(|e| {
            TileError::InvalidFormat(format!("srsName '{}' has no EPSG code: {}", srs_name, e))
        })
    }

    /// Timestamp and tile id from the document identifier
    pub fn split_identifier(identifier: &str) -> TileResult<(NaiveDateTime, String)> {
        let segments: Vec<&str> = identifier.split('_').collect();
        if segments.len() <= TILE_SEGMENT {
            return Err(TileError::InvalidFormat(format!(
                "Mask identifier '{}' has {} segments, expected at least {}",
                identifier,
                segments.len(),
                TILE_SEGMENT + 1
            )));
        }
        let timestamp = NaiveDateTime::parse_from_str(segments[TIMESTAMP_SEGMENT], TIMESTAMP_FORMAT)
            .map_err(|e| {
                TileError::InvalidFormat(format!(
                    "Mask timestamp '{}' is not {}: {}",
                    segments[TIMESTAMP_SEGMENT], TIMESTAMP_FORMAT, e
                ))
            })?;
        Ok((timestamp, segments[TILE_SEGMENT].to_string()))
    }

    fn parse_feature(
        element: &XmlElement,
        tile: &str,
        timestamp: NaiveDateTime,
    ) -> TileResult<CloudMaskFeature> {
        let id = element
            .attribute(Some(GML_NAMESPACE), "id")
            .ok_or_else(|| TileError::MissingField("gml:id on MaskFeature".to_string()))?
            .to_string();
        let mask_type = element
            .find("eop:maskType", MASK_NAMESPACES)
            .map(|e| e.text().to_string())
            .ok_or_else(|| TileError::MissingField(format!("eop:maskType on {}", id)))?;
        let pos_list = element
            .find(POS_LIST_PATH, MASK_NAMESPACES)
            .ok_or_else(|| TileError::MissingField(format!("gml:posList on {}", id)))?;

        let ring = parse_pos_list(pos_list.text(), &id)?;

        Ok(CloudMaskFeature {
            id,
            mask_type,
            tile: tile.to_string(),
            timestamp,
            ring,
        })
    }
}

/// Whitespace-separated integer coordinates grouped into (x, y) vertices
pub fn parse_pos_list(text: &str, feature_id: &str) -> TileResult<Vec<(i64, i64)>> {
    let coords = text
        .split_whitespace()
        .map(|c| {
            c.parse::<i64>().map_err(|e| {
                TileError::InvalidFormat(format!(
                    "Coordinate '{}' of {} is not an integer: {}",
                    c, feature_id, e
                ))
            })
        })
        .collect::<TileResult<Vec<i64>>>()?;

    if coords.len() % 2 != 0 {
        log::warn!(
            "posList of {} has an odd number of coordinates ({}), dropping the last",
            feature_id,
            coords.len()
        );
    }

    Ok(coords.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}
