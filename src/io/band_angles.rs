use crate::io::xml_tree::{XmlDocument, XmlElement};
use crate::io::L2A_NAMESPACES;
use crate::types::{BandAngle, TileError, TileResult};
use std::collections::BTreeMap;

const ANGLE_ENTRY_PATH: &str =
    "n1:Geometric_Info/Tile_Angles/Mean_Viewing_Incidence_Angle_List/Mean_Viewing_Incidence_Angle";

/// Unit the L2A schema uses for viewing angles
const DEFAULT_ANGLE_UNIT: &str = "deg";

fn angle_value(entry: &XmlElement, tag: &str, band_id: usize) -> TileResult<f64> {
    let element = entry.child(None, tag).ok_or_else(|| {
        TileError::InvalidFormat(format!("Band {} viewing angle has no {}", band_id, tag))
    })?;
    element.text().parse::<f64>().map_err(|e| {
        TileError::InvalidFormat(format!(
            "Band {} {} '{}' is not a number: {}",
            band_id,
            tag,
            element.text(),
            e
        ))
    })
}

/// Mean viewing incidence angles keyed by source band index.
///
/// Bands without an entry in the metadata are absent from the map; callers
/// decide whether that is fatal.
pub fn band_angles(document: &XmlDocument) -> TileResult<BTreeMap<usize, BandAngle>> {
    let mut angles = BTreeMap::new();

    for entry in document.root.find_all(ANGLE_ENTRY_PATH, L2A_NAMESPACES) {
        let raw_id = entry.attribute(None, "bandId").ok_or_else(|| {
            TileError::InvalidFormat(format!("<{}> without bandId attribute", entry.name))
        })?;
        let band_id = raw_id.trim().parse::<usize>().map_err(|e| {
            TileError::InvalidFormat(format!("bandId '{}' is not an integer: {}", raw_id, e))
        })?;

        let zenith_angle = angle_value(entry, "ZENITH_ANGLE", band_id)?;
        let azimuth_angle = angle_value(entry, "AZIMUTH_ANGLE", band_id)?;
        let unit = entry
            .child(None, "AZIMUTH_ANGLE")
            .and_then(|a| a.attribute(None, "unit"))
            .unwrap_or(DEFAULT_ANGLE_UNIT)
            .to_string();

        angles.insert(
            band_id,
            BandAngle {
                source_band_index: band_id,
                zenith_angle,
                azimuth_angle,
                unit,
            },
        );
    }

    log::debug!(
        "Found viewing angles for {} bands in {}",
        angles.len(),
        document.path.display()
    );
    Ok(angles)
}
