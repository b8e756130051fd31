//! Declarative records a GIS host needs before it can ingest tiles
//!
//! Raster type definitions (one per resolution profile), the mosaic dataset
//! band layout, and the schema of the cloud mask feature table.

use crate::core::identity::PRODUCT_TYPE;
use crate::core::resolution::ResolutionProfile;
use crate::io::sidecar::METADATA_FILE_NAME;
use crate::types::{BandSpec, Resolution};
use chrono::{NaiveTime, Timelike};
use serde::Serialize;

const RASTER_TYPE_DESCRIPTION: &str =
    "Supports reading of Sentinel-2 Level 2A tiles at 10m and 20m resolution from their metadata files";

/// Field data types understood by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    String,
    Text,
    Double,
    Date,
    Polygon,
}

/// Auxiliary attribute field declared with a raster type or table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxField {
    pub name: &'static str,
    pub alias_name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
}

impl AuxField {
    const fn sized(name: &'static str, alias_name: &'static str, field_type: FieldType, length: u32) -> Self {
        Self {
            name,
            alias_name,
            field_type,
            length: Some(length),
            precision: None,
        }
    }

    const fn precise(name: &'static str, alias_name: &'static str, precision: u32) -> Self {
        Self {
            name,
            alias_name,
            field_type: FieldType::Double,
            length: None,
            precision: Some(precision),
        }
    }

    const fn plain(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            alias_name: name,
            field_type,
            length: None,
            precision: None,
        }
    }
}

/// Host template that turns the band images into the composite product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTemplate {
    pub name: &'static str,
    pub enabled: bool,
    pub output_dataset_tag: &'static str,
    pub primary_input_dataset_tag: &'static str,
    pub is_product_template: bool,
    pub function_template: &'static str,
}

/// One raster type the host can register
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterTypeDefinition {
    pub raster_type_name: &'static str,
    pub builder_name: &'static str,
    pub data_source_filter: &'static str,
    pub description: &'static str,
    pub supports_orthorectification: bool,
    pub enable_clip_to_footprint: bool,
    pub is_raster_product: bool,
    pub product_definition_name: &'static str,
    pub processing_templates: Vec<ProcessingTemplate>,
    pub band_properties: Vec<BandSpec>,
    pub fields: Vec<AuxField>,
}

/// Attribute fields attached to every composite item, in declaration order
pub fn scene_aux_fields() -> Vec<AuxField> {
    vec![
        AuxField::sized("SensorName", "Sensor Name", FieldType::String, 50),
        AuxField::sized("ProductName", "Product Name", FieldType::String, 100),
        AuxField::sized("AcquisitionDate", "Acquisition Date", FieldType::Date, 50),
        AuxField::precise("CloudCoverage", "Cloud Coverage", 5),
        AuxField::precise("VegetationPercentage", "Vegetation Percentage", 5),
    ]
}

fn raster_type_definition(profile: &ResolutionProfile) -> RasterTypeDefinition {
    RasterTypeDefinition {
        raster_type_name: profile.raster_type_name,
        builder_name: profile.builder_name,
        data_source_filter: METADATA_FILE_NAME,
        description: RASTER_TYPE_DESCRIPTION,
        supports_orthorectification: false,
        enable_clip_to_footprint: true,
        is_raster_product: true,
        product_definition_name: PRODUCT_TYPE,
        processing_templates: vec![ProcessingTemplate {
            name: profile.processing_template,
            enabled: true,
            output_dataset_tag: profile.output_dataset_tag,
            primary_input_dataset_tag: profile.resolution.tag(),
            is_product_template: true,
            function_template: profile.function_template,
        }],
        band_properties: profile.bands().copied().collect(),
        fields: scene_aux_fields(),
    }
}

/// Raster type records for every supported resolution
pub fn raster_type_definitions() -> Vec<RasterTypeDefinition> {
    Resolution::ALL
        .iter()
        .map(|r| raster_type_definition(r.profile()))
        .collect()
}

/// Band layout string for a custom mosaic dataset, `"B02 458 522;B03 543 577;..."`
pub fn mosaic_band_definition(resolution: Resolution) -> String {
    resolution
        .profile()
        .bands()
        .map(|b| format!("{} {} {}", b.name, b.wavelength_min, b.wavelength_max))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parameters for creating the mosaic dataset that receives the tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MosaicDatasetDefinition {
    pub name: String,
    pub spatial_reference: u32,
    pub band_definition: String,
}

/// Mosaic dataset parameters; without a name one is derived from `now` as `THHMMSS`
pub fn mosaic_dataset_definition(
    name: Option<&str>,
    resolution: Resolution,
    spatial_reference: u32,
    now: NaiveTime,
) -> MosaicDatasetDefinition {
    let name = match name.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("T{:02}{:02}{:02}", now.hour(), now.minute(), now.second()),
    };
    MosaicDatasetDefinition {
        name,
        spatial_reference,
        band_definition: mosaic_band_definition(resolution),
    }
}

/// Schema of the polygon table receiving cloud mask features
pub fn cloud_mask_table_fields() -> Vec<AuxField> {
    vec![
        AuxField::sized("Id", "Id", FieldType::Text, 20),
        AuxField::sized("Type", "Type", FieldType::Text, 20),
        AuxField::sized("Tile", "Tile", FieldType::Text, 20),
        AuxField::plain("Timestamp", FieldType::Date),
        AuxField::plain("Shape", FieldType::Polygon),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mosaic_band_definition() {
        assert_eq!(
            mosaic_band_definition(Resolution::R10m),
            "B02 458 522;B03 543 577;B04 650 680;B08 784 899"
        );
        assert_eq!(
            mosaic_band_definition(Resolution::R20m),
            "B02 458 522;B03 543 577;B04 650 680;B05 698 712;B06 733 747;\
             B07 773 793;B8A 855 875;B11 1565 1655;B12 2100 2280"
        );
    }

    #[test]
    fn test_raster_types_follow_profiles() {
        let definitions = raster_type_definitions();
        assert_eq!(definitions.len(), 2);

        let ten = &definitions[0];
        assert_eq!(ten.raster_type_name, "Sentinel-2-L2A-10mTile");
        assert_eq!(ten.builder_name, "Sentinel210mTileBuilder");
        assert_eq!(ten.data_source_filter, "metadata.xml");
        assert_eq!(ten.product_definition_name, "Sentinel-2_L2A_Tile");
        assert_eq!(ten.processing_templates[0].name, "Composite10mBands");
        assert_eq!(ten.processing_templates[0].output_dataset_tag, "10m-4Band");
        assert_eq!(ten.processing_templates[0].primary_input_dataset_tag, "10m");
        assert_eq!(ten.band_properties.len(), 4);

        let twenty = &definitions[1];
        assert_eq!(twenty.processing_templates[0].function_template, "Composite9Bands.rft.xml");
        assert_eq!(twenty.band_properties.len(), 9);
        assert_eq!(twenty.fields.len(), 5);
    }

    #[test]
    fn test_aux_field_serialization() {
        let json = serde_json::to_value(scene_aux_fields()).unwrap();
        assert_eq!(json[1]["name"], "ProductName");
        assert_eq!(json[1]["type"], "String");
        assert_eq!(json[1]["length"], 100);
        assert_eq!(json[3]["precision"], 5);
        assert!(json[3].get("length").is_none());
    }

    #[test]
    fn test_mosaic_dataset_name() {
        let now = NaiveTime::from_hms_opt(9, 5, 7).unwrap();
        let generated = mosaic_dataset_definition(None, Resolution::R10m, 32634, now);
        assert_eq!(generated.name, "T090507");
        assert_eq!(generated.spatial_reference, 32634);

        let named = mosaic_dataset_definition(Some("S2-10m"), Resolution::R10m, 32634, now);
        assert_eq!(named.name, "S2-10m");
    }

    #[test]
    fn test_cloud_mask_table_fields() {
        let names: Vec<_> = cloud_mask_table_fields().iter().map(|f| f.name).collect();
        assert_eq!(names, ["Id", "Type", "Tile", "Timestamp", "Shape"]);
    }
}
